// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution context driven by its own thread at a fixed rate.
//!
//! Each cycle runs the worker and then sleeps for the rest of the period.
//! A cycle that overruns its period is followed immediately by the next one;
//! missed cycles are not replayed.

use super::{ExecutionContext, ExecutionContextBase, ExecutionKind};
use crate::config::{keys, Properties};
use crate::error::{Error, Result, ReturnCode};
use crate::wake::WakeNotifier;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

struct Shared {
    base: ExecutionContextBase,
    /// Stop signal, so `stop()` never waits out a full period
    wake: WakeNotifier,
}

pub struct PeriodicExecutionContext {
    shared: Arc<Shared>,
    cpus: Vec<usize>,
    stack_size: Option<usize>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicExecutionContext {
    /// Reads `exec_cxt.periodic.{rate,cpu_affinity,stack_size}`,
    /// `exec_cxt.sync_transition` (default `YES`) and
    /// `exec_cxt.transition_timeout`. The thread is spawned by `start()`.
    pub fn new(props: &Properties) -> Result<Self> {
        let base = ExecutionContextBase::new(ExecutionKind::Periodic, props, true)?;

        let cpus = props
            .get_list(keys::EC_CPU_AFFINITY)
            .into_iter()
            .map(|cpu| {
                cpu.parse::<usize>().map_err(|_| Error::InvalidProperty {
                    key: keys::EC_CPU_AFFINITY.into(),
                    value: cpu,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let stack_size = match props.get_str(keys::EC_STACK_SIZE) {
            None => None,
            Some(raw) => Some(props.get_usize(keys::EC_STACK_SIZE).ok_or(
                Error::InvalidProperty {
                    key: keys::EC_STACK_SIZE.into(),
                    value: raw,
                },
            )?),
        };

        Ok(Self {
            shared: Arc::new(Shared {
                base,
                wake: WakeNotifier::new(),
            }),
            cpus,
            stack_size,
            thread: Mutex::new(None),
        })
    }

    /// CPUs the cycle thread may be pinned to.
    pub fn cpu_affinity(&self) -> &[usize] {
        &self.cpus
    }

    fn spawn(&self) -> std::io::Result<JoinHandle<()>> {
        let mut builder = thread::Builder::new().name(format!("rtm-ec-{}", self.id()));
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }
        let shared = Arc::clone(&self.shared);
        let cpus = self.cpus.clone();
        builder.spawn(move || run(&shared, &cpus))
    }
}

fn run(shared: &Shared, cpus: &[usize]) {
    pin_to(cpus);
    let base = &shared.base;
    log::debug!("[ec] ec {} cycle thread running at {}Hz", base.id(), base.get_rate());

    while base.is_running() {
        let started = Instant::now();
        base.invoke_worker();

        // Rate changes apply from the next sleep
        let next = started + base.period();
        if Instant::now() < next {
            shared.wake.wait_until(next);
        }
    }
    log::debug!("[ec] ec {} cycle thread stopped", base.id());
}

/// Pin the calling thread to the first available CPU of `cpus`.
fn pin_to(cpus: &[usize]) {
    if cpus.is_empty() {
        return;
    }
    let available = core_affinity::get_core_ids().unwrap_or_default();
    let core = cpus
        .iter()
        .find_map(|cpu| available.iter().find(|c| c.id == *cpu).copied());
    match core {
        Some(core) if core_affinity::set_for_current(core) => {
            log::debug!("[ec] cycle thread pinned to cpu {}", core.id);
        }
        Some(core) => log::warn!("[ec] failed to pin cycle thread to cpu {}", core.id),
        None => log::warn!("[ec] none of cpus {:?} is available, not pinning", cpus),
    }
}

impl ExecutionContext for PeriodicExecutionContext {
    fn base(&self) -> &ExecutionContextBase {
        &self.shared.base
    }

    fn start(&self) -> ReturnCode {
        let mut slot = self.thread.lock();
        if self.is_running() {
            return ReturnCode::PreconditionNotMet;
        }

        // Left behind by a stop() issued from the cycle thread itself
        if let Some(stale) = slot.take() {
            if stale.thread().id() == thread::current().id() {
                // Restarted from within a cycle: the current thread keeps looping
                *slot = Some(stale);
                return self.shared.base.start();
            }
            let _ = stale.join();
        }

        let rc = self.shared.base.start();
        if !rc.is_ok() {
            return rc;
        }
        self.shared.wake.check_and_clear();
        match self.spawn() {
            Ok(handle) => {
                *slot = Some(handle);
                ReturnCode::Ok
            }
            Err(e) => {
                log::error!("[ec] ec {}: {}", self.id(), Error::ThreadSpawn(e));
                self.shared.base.begin_stop();
                self.shared.base.finish_stop();
                ReturnCode::OutOfResources
            }
        }
    }

    fn stop(&self) -> ReturnCode {
        let rc = self.shared.base.begin_stop();
        if !rc.is_ok() {
            return rc;
        }
        self.shared.wake.notify();

        let mut slot = self.thread.lock();
        let own_thread = slot
            .as_ref()
            .is_some_and(|h| h.thread().id() == thread::current().id());
        if !own_thread {
            if let Some(handle) = slot.take() {
                let _ = handle.join();
            }
        }
        drop(slot);

        self.shared.base.finish_stop();
        ReturnCode::Ok
    }
}

impl Drop for PeriodicExecutionContext {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop();
        }
    }
}

impl std::fmt::Debug for PeriodicExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicExecutionContext")
            .field("base", &self.shared.base)
            .field("cpus", &self.cpus)
            .finish()
    }
}
