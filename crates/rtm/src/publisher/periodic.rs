// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-rate publisher driven by `dataport.publisher.push_rate`.
//!
//! The default push policy is `fifo`: one record per tick.

use super::{
    push_period, Delivery, Publisher, PublisherContext, PublisherState, PushPolicy, StateCell,
};
use crate::connector;
use crate::error::{Error, Result};
use crate::ser::ByteData;
use crate::status::DataPortStatus;
use crate::wake::WakeNotifier;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

struct Shared {
    delivery: Delivery,
    state: StateCell,
    /// Only used to cut the sleep short on release
    wake: WakeNotifier,
}

/// Drains the buffer once per period on its own thread.
///
/// Ticks are deadline based: a slow push delays the next tick but the
/// schedule does not drift. Missed ticks are dropped, not replayed.
pub struct PublisherPeriodic {
    shared: Arc<Shared>,
    period: Duration,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PublisherPeriodic {
    pub fn new(ctx: PublisherContext) -> Result<Self> {
        let period = push_period(&ctx.info.properties)?;
        let name = ctx.info.name.clone();
        let shared = Arc::new(Shared {
            delivery: Delivery::new(ctx, PushPolicy::Fifo)?,
            state: StateCell::new(),
            wake: WakeNotifier::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("rtm-pub-periodic".into())
            .spawn(move || run(&worker_shared, period))
            .map_err(Error::ThreadSpawn)?;

        log::debug!(
            "[publisher] periodic publisher for {} every {:?} (policy={:?})",
            name,
            period,
            shared.delivery.policy()
        );
        Ok(Self {
            shared,
            period,
            worker: Mutex::new(Some(handle)),
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

fn run(shared: &Shared, period: Duration) {
    let mut next = Instant::now() + period;
    loop {
        shared.wake.wait_until(next);
        if shared.state.get() == PublisherState::Released {
            break;
        }
        let now = Instant::now();
        if now < next {
            continue;
        }

        if shared.state.get() == PublisherState::Active && !shared.delivery.ctx().buffer.empty() {
            let status = shared.delivery.push();
            if !status.is_ok() {
                log::debug!(
                    "[publisher] periodic push on {} returned {}",
                    shared.delivery.ctx().info.name,
                    status.as_str()
                );
            }
        }

        next += period;
        if next <= now {
            next = now + period;
        }
    }
    log::debug!("[publisher] periodic worker stopped");
}

impl Publisher for PublisherPeriodic {
    fn write(&self, data: ByteData, timeout: Option<Duration>) -> DataPortStatus {
        if let Some(refused) = self.shared.state.refuse() {
            return refused;
        }
        if self.shared.delivery.connection_lost() {
            return DataPortStatus::ConnectionLost;
        }
        let ctx = self.shared.delivery.ctx();
        connector::write_buffer(&*ctx.buffer, &ctx.listeners, &ctx.info, data, timeout).into()
    }

    fn activate(&self) -> DataPortStatus {
        self.shared.state.activate()
    }

    fn deactivate(&self) -> DataPortStatus {
        self.shared.state.deactivate()
    }

    fn state(&self) -> PublisherState {
        self.shared.state.get()
    }

    fn release(&self) {
        if !self.shared.state.release() {
            return;
        }
        self.shared.wake.notify();
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PublisherPeriodic {
    fn drop(&mut self) {
        self.release();
    }
}
