// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Event-driven publisher.
//!
//! `write` buffers the record and wakes a dedicated thread which drains the
//! buffer under the push policy (`new` by default). Several writes landing
//! before the thread runs coalesce into a single drain pass; with the `new`
//! policy only the latest of them is delivered.

use super::{Delivery, Publisher, PublisherContext, PublisherState, PushPolicy, StateCell};
use crate::connector;
use crate::error::{Error, Result};
use crate::ser::ByteData;
use crate::status::DataPortStatus;
use crate::wake::WakeNotifier;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Upper bound on one idle wait; the worker re-checks its state after it.
const IDLE_WAIT: Duration = Duration::from_millis(100);

struct Shared {
    delivery: Delivery,
    state: StateCell,
    wake: WakeNotifier,
}

pub struct PublisherNew {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PublisherNew {
    pub fn new(ctx: PublisherContext) -> Result<Self> {
        let name = ctx.info.name.clone();
        let shared = Arc::new(Shared {
            delivery: Delivery::new(ctx, PushPolicy::New)?,
            state: StateCell::new(),
            wake: WakeNotifier::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("rtm-pub-new".into())
            .spawn(move || run(&worker_shared))
            .map_err(Error::ThreadSpawn)?;

        log::debug!(
            "[publisher] new publisher for {} (policy={:?})",
            name,
            shared.delivery.policy()
        );
        Ok(Self {
            shared,
            worker: Mutex::new(Some(handle)),
        })
    }
}

fn run(shared: &Shared) {
    loop {
        let notified = shared.wake.wait_timeout(IDLE_WAIT);
        match shared.state.get() {
            PublisherState::Released => break,
            PublisherState::Created => continue,
            PublisherState::Active => {}
        }
        if notified {
            let status = shared.delivery.push();
            if !status.is_ok() {
                log::debug!(
                    "[publisher] push on {} returned {}",
                    shared.delivery.ctx().info.name,
                    status.as_str()
                );
            }
        }
    }
    log::debug!("[publisher] new worker stopped");
}

impl Publisher for PublisherNew {
    fn write(&self, data: ByteData, timeout: Option<Duration>) -> DataPortStatus {
        if let Some(refused) = self.shared.state.refuse() {
            return refused;
        }
        if self.shared.delivery.connection_lost() {
            return DataPortStatus::ConnectionLost;
        }
        let ctx = self.shared.delivery.ctx();
        let status = connector::write_buffer(&*ctx.buffer, &ctx.listeners, &ctx.info, data, timeout);
        self.shared.wake.notify();
        status.into()
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

impl Drop for PublisherNew {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::config::keys;
    use std::time::Instant;

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_write_wakes_worker() {
        let consumer = RecordingConsumer::new();
        let publisher = PublisherNew::new(context(&consumer, &[])).unwrap();
        publisher.activate();

        assert_eq!(publisher.write(byte(3), None), DataPortStatus::PortOk);
        assert!(wait_for(|| consumer.values() == vec![3]));
    }

    #[test]
    fn test_fifo_policy_delivers_in_order() {
        let consumer = RecordingConsumer::new();
        let publisher =
            PublisherNew::new(context(&consumer, &[(keys::PUSH_POLICY, "all")])).unwrap();
        publisher.activate();
        for v in 1..=5 {
            publisher.write(byte(v), None);
        }
        assert!(wait_for(|| consumer.values().len() == 5));
        assert_eq!(consumer.values(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_release_joins_and_refuses() {
        let consumer = RecordingConsumer::new();
        let publisher = PublisherNew::new(context(&consumer, &[])).unwrap();
        publisher.activate();
        publisher.release();
        publisher.release();
        assert_eq!(publisher.state(), PublisherState::Released);
        assert_eq!(publisher.write(byte(1), None), DataPortStatus::PreconditionNotMet);
    }
}
