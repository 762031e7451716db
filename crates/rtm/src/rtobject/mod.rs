// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-component lifecycle state machine driven by an execution context.
//!
//! ```text
//!              activate                    deactivate
//!   INACTIVE ──────────────► ACTIVE ──────────────────► INACTIVE
//!      ▲                       │ callback failure
//!      │ reset (on_reset Ok)   ▼
//!      └──────────────────── ERROR
//! ```
//!
//! Requests from other threads only raise a flag. The owning context
//! applies them in [`RtObjectStateMachine::worker_pre_do`], so the state is
//! only ever mutated from the context's own thread.
//!
//! | State | entry | do | post | exit |
//! |-------|-------|----|------|------|
//! | ACTIVE | `on_activated` | `on_execute`, `on_action`, `on_mode_changed` | `on_state_update` | `on_deactivated` |
//! | ERROR | `on_aborting` | `on_error` | | `on_reset` |
//!
//! Callback failures (non-`Ok` return or panic) schedule a move to ERROR.
//! A failure during entry is resolved within the same pre phase, so the do
//! phase of that cycle already runs `on_error`. Failures in the do or post
//! phase take effect in the next cycle's pre phase.

mod measure;

pub use measure::{Statistics, TimeMeasure};

use crate::component::{Capabilities, ComponentRef, RtObject};
use crate::ec::ExecutionContextHandle;
use crate::error::{Error, ReturnCode};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cycles between two statistics reports.
const REPORT_EVERY: u64 = 1000;

/// Bound on exit/entry pairs run by one pre phase.
const MAX_HOPS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifeCycleState {
    /// Not bound to the queried context.
    Created,
    Inactive,
    Active,
    Error,
}

impl LifeCycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Inactive => "INACTIVE",
            Self::Active => "ACTIVE",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for LifeCycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Previous, current and scheduled state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecContextStates {
    pub prev: LifeCycleState,
    pub curr: LifeCycleState,
    pub next: LifeCycleState,
}

impl ExecContextStates {
    fn settled(state: LifeCycleState) -> Self {
        Self {
            prev: state,
            curr: state,
            next: state,
        }
    }
}

/// Lifecycle of one component within one execution context.
pub struct RtObjectStateMachine {
    handle: ExecutionContextHandle,
    component: ComponentRef,
    states: Mutex<ExecContextStates>,
    activation: AtomicBool,
    deactivation: AtomicBool,
    reset: AtomicBool,
    measure: Option<Mutex<TimeMeasure>>,
}

impl RtObjectStateMachine {
    /// Bind `component` to the context behind `handle`. Starts INACTIVE.
    pub fn new(handle: ExecutionContextHandle, component: &Arc<dyn RtObject>) -> Self {
        let component = ComponentRef::bind(component);
        log::debug!(
            "[rtobj] {} bound to ec {} ({:?})",
            component.name(),
            handle.id(),
            component.capabilities()
        );
        Self {
            handle,
            component,
            states: Mutex::new(ExecContextStates::settled(LifeCycleState::Inactive)),
            activation: AtomicBool::new(false),
            deactivation: AtomicBool::new(false),
            reset: AtomicBool::new(false),
            measure: None,
        }
    }

    /// Enable `on_execute` timing.
    #[must_use]
    pub fn with_measure(mut self, enabled: bool) -> Self {
        self.measure = enabled.then(|| Mutex::new(TimeMeasure::new()));
        self
    }

    pub fn component(&self) -> &ComponentRef {
        &self.component
    }

    pub fn name(&self) -> &str {
        self.component.name()
    }

    pub fn handle(&self) -> &ExecutionContextHandle {
        &self.handle
    }

    pub fn capabilities(&self) -> Capabilities {
        self.component.capabilities()
    }

    // ========================================================================
    // State queries
    // ========================================================================

    pub fn states(&self) -> ExecContextStates {
        *self.states.lock()
    }

    /// Current state.
    pub fn state(&self) -> LifeCycleState {
        self.states.lock().curr
    }

    pub fn is_current_state(&self, state: LifeCycleState) -> bool {
        self.state() == state
    }

    pub fn is_next_state(&self, state: LifeCycleState) -> bool {
        self.states.lock().next == state
    }

    /// `true` while a request is queued or a transition is scheduled.
    pub fn has_pending_transition(&self) -> bool {
        // Flags move into `next` under this lock, so both are read together
        let st = self.states.lock();
        st.curr != st.next
            || self.activation.load(Ordering::Acquire)
            || self.deactivation.load(Ordering::Acquire)
            || self.reset.load(Ordering::Acquire)
    }

    // ========================================================================
    // Requests (any thread)
    // ========================================================================

    /// Queue INACTIVE -> ACTIVE.
    pub fn activate(&self) -> ReturnCode {
        self.request(&self.activation, LifeCycleState::Inactive, "activate")
    }

    /// Queue ACTIVE -> INACTIVE.
    pub fn deactivate(&self) -> ReturnCode {
        self.request(&self.deactivation, LifeCycleState::Active, "deactivate")
    }

    /// Queue ERROR -> INACTIVE.
    pub fn reset(&self) -> ReturnCode {
        self.request(&self.reset, LifeCycleState::Error, "reset")
    }

    fn request(&self, flag: &AtomicBool, required: LifeCycleState, what: &str) -> ReturnCode {
        let curr = self.state();
        if curr != required {
            let err = Error::InvalidState(format!(
                "{} requires {}, component is {}",
                what, required, curr
            ));
            log::warn!("[rtobj] {}: {}", self.name(), err);
            return err.into();
        }
        flag.store(true, Ordering::Release);
        ReturnCode::Ok
    }

    /// Schedule `next` unless another transition is already pending.
    fn schedule(st: &mut ExecContextStates, next: LifeCycleState) {
        if st.next == st.curr {
            st.next = next;
        }
    }

    /// Schedule ERROR unconditionally.
    fn fail(&self) {
        self.states.lock().next = LifeCycleState::Error;
    }

    fn commit(&self, next: LifeCycleState) {
        let mut st = self.states.lock();
        st.prev = st.curr;
        st.curr = next;
        st.next = next;
    }

    // ========================================================================
    // Context-level callbacks
    // ========================================================================

    pub fn on_startup(&self) {
        if let Some(c) = self.component.object() {
            self.invoke("on_startup", || c.on_startup(&self.handle));
        }
    }

    pub fn on_shutdown(&self) {
        if let Some(c) = self.component.object() {
            self.invoke("on_shutdown", || c.on_shutdown(&self.handle));
        }
    }

    /// Failure moves the component to ERROR.
    pub fn on_rate_changed(&self) {
        if let Some(c) = self.component.data_flow() {
            if !self.invoke("on_rate_changed", || c.on_rate_changed(&self.handle)) {
                self.fail();
            }
        }
    }

    // ========================================================================
    // Worker phases (owning context thread only)
    // ========================================================================

    /// Run the three phases of one cycle.
    pub fn worker(&self) {
        self.worker_pre_do();
        self.worker_do();
        self.worker_post_do();
    }

    /// Apply queued requests and run exit/entry callbacks.
    pub fn worker_pre_do(&self) {
        {
            let mut st = self.states.lock();
            let curr = st.curr;
            if self.activation.swap(false, Ordering::AcqRel) && curr == LifeCycleState::Inactive {
                Self::schedule(&mut st, LifeCycleState::Active);
            }
            if self.deactivation.swap(false, Ordering::AcqRel) && curr == LifeCycleState::Active {
                Self::schedule(&mut st, LifeCycleState::Inactive);
            }
            if self.reset.swap(false, Ordering::AcqRel) && curr == LifeCycleState::Error {
                Self::schedule(&mut st, LifeCycleState::Inactive);
            }
        }

        for _ in 0..MAX_HOPS {
            let st = self.states();
            if st.curr == st.next {
                return;
            }

            self.exit(st.curr);
            let next = self.states.lock().next;
            if next == st.curr {
                // on_reset failed: stay in ERROR
                return;
            }

            self.commit(next);
            log::debug!("[rtobj] {} {} -> {}", self.name(), st.curr, next);
            self.enter(next);
        }
    }

    fn exit(&self, state: LifeCycleState) {
        let Some(c) = self.component.object() else {
            return;
        };
        match state {
            LifeCycleState::Active => {
                if !self.invoke("on_deactivated", || c.on_deactivated(&self.handle)) {
                    self.fail();
                }
            }
            LifeCycleState::Error => {
                if !self.invoke("on_reset", || c.on_reset(&self.handle)) {
                    self.fail();
                }
            }
            LifeCycleState::Created | LifeCycleState::Inactive => {}
        }
    }

    fn enter(&self, state: LifeCycleState) {
        let Some(c) = self.component.object() else {
            return;
        };
        match state {
            LifeCycleState::Active => {
                if !self.invoke("on_activated", || c.on_activated(&self.handle)) {
                    self.fail();
                }
            }
            LifeCycleState::Error => {
                self.invoke("on_aborting", || c.on_aborting(&self.handle));
            }
            LifeCycleState::Created | LifeCycleState::Inactive => {}
        }
    }

    /// Steady-state callbacks of the current state.
    pub fn worker_do(&self) {
        let st = self.states();
        match st.curr {
            LifeCycleState::Active => {
                if st.next == LifeCycleState::Error {
                    return;
                }
                if let Some(df) = self.component.data_flow() {
                    if let Some(m) = &self.measure {
                        m.lock().tick();
                    }
                    let ok = self.invoke("on_execute", || df.on_execute(&self.handle));
                    if let Some(m) = &self.measure {
                        m.lock().tack();
                    }
                    if !ok {
                        self.fail();
                        return;
                    }
                }
                if let Some(fsm) = self.component.fsm() {
                    if !self.invoke("on_action", || fsm.on_action(&self.handle)) {
                        self.fail();
                        return;
                    }
                }
                if let Some(mode) = self.component.multi_mode() {
                    if !self.invoke("on_mode_changed", || mode.on_mode_changed(&self.handle)) {
                        self.fail();
                    }
                }
            }
            LifeCycleState::Error => {
                if let Some(c) = self.component.object() {
                    self.invoke("on_error", || c.on_error(&self.handle));
                }
            }
            LifeCycleState::Created | LifeCycleState::Inactive => {}
        }
    }

    /// `on_state_update` and statistics.
    pub fn worker_post_do(&self) {
        let st = self.states();
        if st.curr != LifeCycleState::Active || st.next == LifeCycleState::Error {
            return;
        }
        if let Some(df) = self.component.data_flow() {
            if !self.invoke("on_state_update", || df.on_state_update(&self.handle)) {
                self.fail();
            }
        }

        if let Some(m) = &self.measure {
            let m = m.lock();
            if m.count() > 0 && m.count() % REPORT_EVERY == 0 {
                if let Some(s) = m.statistics() {
                    log::debug!(
                        "[rtobj] {} on_execute max={:?} min={:?} mean={:?} stddev={:?}",
                        self.name(),
                        s.max,
                        s.min,
                        s.mean,
                        s.stddev
                    );
                }
            }
        }
    }

    /// `on_execute` timing, `None` when measuring is off or nothing ran yet.
    pub fn statistics(&self) -> Option<Statistics> {
        self.measure.as_ref().and_then(|m| m.lock().statistics())
    }

    /// Run one callback, containing panics. Returns `true` on `Ok`.
    fn invoke(&self, what: &str, f: impl FnOnce() -> ReturnCode) -> bool {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(rc) if rc.is_ok() => true,
            Ok(rc) => {
                log::error!("[rtobj] {} {} returned {}", self.name(), what, rc.as_str());
                false
            }
            Err(_) => {
                log::error!("[rtobj] {} {} panicked", self.name(), what);
                false
            }
        }
    }
}

impl std::fmt::Debug for RtObjectStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtObjectStateMachine")
            .field("component", &self.component)
            .field("states", &self.states())
            .finish()
    }
}
