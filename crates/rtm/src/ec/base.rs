// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! State and bookkeeping shared by every execution context variant.

use super::{ExecutionContextHandle, ExecutionContextProfile, ExecutionContextWorker, ExecutionKind};
use crate::component::RtObject;
use crate::config::{keys, Properties};
use crate::error::{Error, Result, ReturnCode};
use crate::rtobject::{LifeCycleState, RtObjectStateMachine};
use arc_swap::ArcSwap;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

/// Rate used when `exec_cxt.periodic.rate` is not set.
pub const DEFAULT_RATE: f64 = 1000.0;

/// Wait bound used when `exec_cxt.transition_timeout` is not set.
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_millis(500);

static NEXT_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Debug, Clone, Copy)]
enum Request {
    Activate,
    Deactivate,
    Reset,
}

/// Common part of an execution context: profile, participants, rate and
/// synchronous transition handling.
pub struct ExecutionContextBase {
    handle: ExecutionContextHandle,
    worker: ExecutionContextWorker,
    properties: Properties,
    sync_transition: bool,
    transition_timeout: Duration,
    /// Completed cycles, guarded for the transition waiters
    cycles: Mutex<u64>,
    cycle_done: Condvar,
    /// Thread currently driving the cycle
    driver: Mutex<Option<ThreadId>>,
}

impl ExecutionContextBase {
    /// Read `exec_cxt.*` keys from `props`. `sync_default` applies when
    /// `exec_cxt.sync_transition` is unset.
    pub fn new(kind: ExecutionKind, props: &Properties, sync_default: bool) -> Result<Self> {
        let rate = match props.get_str(keys::EC_PERIODIC_RATE) {
            None => DEFAULT_RATE,
            Some(raw) => parse_rate(&raw).ok_or(Error::InvalidProperty {
                key: keys::EC_PERIODIC_RATE.into(),
                value: raw,
            })?,
        };
        let sync_transition = match props.get_str(keys::EC_SYNC_TRANSITION) {
            None => sync_default,
            Some(raw) => props.get_bool(keys::EC_SYNC_TRANSITION).ok_or(
                Error::InvalidProperty {
                    key: keys::EC_SYNC_TRANSITION.into(),
                    value: raw,
                },
            )?,
        };
        let transition_timeout = match props.get_str(keys::EC_TRANSITION_TIMEOUT) {
            None => DEFAULT_TRANSITION_TIMEOUT,
            Some(raw) => props.get_duration(keys::EC_TRANSITION_TIMEOUT).ok_or(
                Error::InvalidProperty {
                    key: keys::EC_TRANSITION_TIMEOUT.into(),
                    value: raw,
                },
            )?,
        };
        let measure = props.get_bool(keys::EC_MEASURE).unwrap_or(false);

        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let properties = props.snapshot();
        let profile = Arc::new(ArcSwap::from_pointee(ExecutionContextProfile {
            kind,
            rate,
            owner: None,
            participants: Vec::new(),
            properties: properties.clone(),
        }));
        let handle = ExecutionContextHandle::new(id, profile);

        log::debug!(
            "[ec] ec {} created: kind={} rate={}Hz sync={} measure={}",
            id,
            kind.as_str(),
            rate,
            sync_transition,
            measure
        );
        Ok(Self {
            worker: ExecutionContextWorker::new(handle.clone(), measure),
            handle,
            properties,
            sync_transition,
            transition_timeout,
            cycles: Mutex::new(0),
            cycle_done: Condvar::new(),
            driver: Mutex::new(None),
        })
    }

    pub fn id(&self) -> u32 {
        self.handle.id()
    }

    pub fn handle(&self) -> &ExecutionContextHandle {
        &self.handle
    }

    pub fn worker(&self) -> &ExecutionContextWorker {
        &self.worker
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    // ========================================================================
    // Start / stop
    // ========================================================================

    /// Mark running and fire `on_startup`. `PreconditionNotMet` if already
    /// running.
    pub fn start(&self) -> ReturnCode {
        if !self.worker.set_running(true) {
            return ReturnCode::PreconditionNotMet;
        }
        self.worker.on_startup();
        log::debug!("[ec] ec {} started", self.id());
        ReturnCode::Ok
    }

    /// Clear the running flag. The caller joins its thread, if any, and then
    /// calls [`ExecutionContextBase::finish_stop`].
    pub fn begin_stop(&self) -> ReturnCode {
        if !self.worker.set_running(false) {
            return ReturnCode::PreconditionNotMet;
        }
        ReturnCode::Ok
    }

    /// Fire `on_shutdown` once the cycle has stopped.
    pub fn finish_stop(&self) {
        self.worker.on_shutdown();
        // Release transition waiters
        self.cycle_done.notify_all();
        log::debug!("[ec] ec {} stopped", self.id());
    }

    // ========================================================================
    // Cycle
    // ========================================================================

    /// Run one cycle on the calling thread.
    pub fn invoke_worker(&self) {
        *self.driver.lock() = Some(thread::current().id());
        self.worker.invoke();
        *self.cycles.lock() += 1;
        self.cycle_done.notify_all();
    }

    /// Completed cycles since creation.
    pub fn cycle_count(&self) -> u64 {
        *self.cycles.lock()
    }

    fn on_driver_thread(&self) -> bool {
        *self.driver.lock() == Some(thread::current().id())
    }

    // ========================================================================
    // Rate / profile
    // ========================================================================

    pub fn get_rate(&self) -> f64 {
        self.handle.rate()
    }

    /// Cycle length derived from the current rate.
    pub fn period(&self) -> Duration {
        rate_period(self.get_rate()).unwrap_or(Duration::from_millis(1))
    }

    /// Takes effect from the next cycle. Fires `on_rate_changed`.
    pub fn set_rate(&self, rate: f64) -> ReturnCode {
        if !valid_rate(rate) {
            log::warn!("[ec] ec {} rejected rate {}", self.id(), rate);
            return ReturnCode::BadParameter;
        }
        self.handle.update(|p| ExecutionContextProfile {
            rate,
            ..p.clone()
        });
        log::debug!("[ec] ec {} rate set to {}Hz", self.id(), rate);
        self.worker.on_rate_changed();
        ReturnCode::Ok
    }

    pub fn get_kind(&self) -> ExecutionKind {
        self.handle.kind()
    }

    /// Stored profile with the participant list filled in.
    pub fn get_profile(&self) -> ExecutionContextProfile {
        let mut profile = (*self.handle.load()).clone();
        profile.participants = self.worker.participant_names();
        profile
    }

    // ========================================================================
    // Components
    // ========================================================================

    pub fn add_component(&self, component: Arc<dyn RtObject>) -> ReturnCode {
        self.worker.add_component(component)
    }

    /// Add `component` and record it as the owner.
    pub fn bind_component(&self, component: Arc<dyn RtObject>) -> Result<()> {
        let name = component.instance_name().to_string();
        if !self.worker.add_component(component).is_ok() {
            return Err(Error::AlreadyBound(name));
        }
        self.handle.update(|p| ExecutionContextProfile {
            owner: Some(name.clone()),
            ..p.clone()
        });
        Ok(())
    }

    pub fn remove_component(&self, component: &dyn RtObject) -> ReturnCode {
        let rc = self.worker.remove_component(component);
        if rc.is_ok() {
            let name = component.instance_name().to_string();
            self.handle.update(|p| ExecutionContextProfile {
                owner: p.owner.clone().filter(|o| *o != name),
                ..p.clone()
            });
        }
        rc
    }

    pub fn get_component_state(&self, component: &dyn RtObject) -> LifeCycleState {
        self.worker.component_state(component)
    }

    pub fn activate_component(&self, component: &dyn RtObject) -> ReturnCode {
        self.request(component, Request::Activate)
    }

    pub fn deactivate_component(&self, component: &dyn RtObject) -> ReturnCode {
        self.request(component, Request::Deactivate)
    }

    pub fn reset_component(&self, component: &dyn RtObject) -> ReturnCode {
        self.request(component, Request::Reset)
    }

    fn request(&self, component: &dyn RtObject, request: Request) -> ReturnCode {
        let Some(sm) = self.worker.find(component) else {
            let err = Error::NotParticipant(component.instance_name().to_string());
            log::warn!("[ec] {:?} on ec {}: {}", request, self.id(), err);
            return err.into();
        };
        let queued_at = self.cycle_count();
        let rc = match request {
            Request::Activate => sm.activate(),
            Request::Deactivate => sm.deactivate(),
            Request::Reset => sm.reset(),
        };
        if !rc.is_ok() || !self.sync_transition {
            return rc;
        }
        self.wait_transition(&sm, queued_at)
    }

    /// Block until a cycle completed after `queued_at` has applied the
    /// request queued on `sm`.
    ///
    /// Returns immediately when stopped or when called from the cycle
    /// thread itself.
    fn wait_transition(&self, sm: &RtObjectStateMachine, queued_at: u64) -> ReturnCode {
        if !self.is_running() || self.on_driver_thread() {
            return ReturnCode::Ok;
        }

        let deadline = Instant::now() + self.transition_timeout;
        let mut cycles = self.cycles.lock();
        while *cycles <= queued_at || sm.has_pending_transition() {
            if !self.is_running() {
                return ReturnCode::Ok;
            }
            if self.cycle_done.wait_until(&mut cycles, deadline).timed_out() {
                if *cycles > queued_at && !sm.has_pending_transition() {
                    break;
                }
                log::warn!(
                    "[ec] ec {}: transition of {} timed out after {:?}",
                    self.id(),
                    sm.name(),
                    self.transition_timeout
                );
                return ReturnCode::Error;
            }
        }
        drop(cycles);

        if sm.state() == LifeCycleState::Error {
            ReturnCode::Error
        } else {
            ReturnCode::Ok
        }
    }
}

/// Positive finite rate in Hz whose period fits a `Duration`.
fn parse_rate(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|r| valid_rate(*r))
}

fn valid_rate(rate: f64) -> bool {
    rate_period(rate).is_some()
}

/// `None` for non-positive rates and rates too small to express as a period.
pub(crate) fn rate_period(rate: f64) -> Option<Duration> {
    if !(rate.is_finite() && rate > 0.0) {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / rate).ok()
}

impl std::fmt::Debug for ExecutionContextBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContextBase")
            .field("id", &self.id())
            .field("rate", &self.get_rate())
            .field("running", &self.is_running())
            .field("sync_transition", &self.sync_transition)
            .finish()
    }
}
