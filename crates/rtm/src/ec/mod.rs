// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution contexts.
//!
//! An execution context owns an ordered list of participating components
//! and drives their state machines cycle by cycle:
//!
//! | Variant | Driven by | `sync_transition` default |
//! |---------|-----------|---------------------------|
//! | [`PeriodicExecutionContext`] | own thread at `exec_cxt.periodic.rate` | `YES` |
//! | [`ExtTrigExecutionContext`] | caller, one cycle per `tick()` | `NO` |
//!
//! Within a cycle every participant runs its pre phase, then every
//! participant runs its do phase, then every participant runs its post
//! phase, all in binding order.

mod base;
mod ext_trig;
mod periodic;
mod profile;
mod worker;

pub use base::{ExecutionContextBase, DEFAULT_RATE, DEFAULT_TRANSITION_TIMEOUT};
pub(crate) use base::rate_period;
pub use ext_trig::ExtTrigExecutionContext;
pub use periodic::PeriodicExecutionContext;
pub use profile::{ExecutionContextHandle, ExecutionContextProfile, ExecutionKind};
pub use worker::ExecutionContextWorker;

use crate::component::RtObject;
use crate::error::{Result, ReturnCode};
use crate::rtobject::LifeCycleState;
use std::sync::Arc;

/// Operations common to every execution context.
///
/// Implementors provide [`ExecutionContext::base`] plus `start`/`stop`;
/// everything else delegates to the shared base.
pub trait ExecutionContext: Send + Sync {
    fn base(&self) -> &ExecutionContextBase;

    /// Begin cycling and fire `on_startup` on every participant.
    fn start(&self) -> ReturnCode;

    /// Finish the current cycle, stop, and fire `on_shutdown`.
    fn stop(&self) -> ReturnCode;

    /// Run one cycle on the calling thread. Only externally triggered
    /// contexts support it.
    fn tick(&self) -> ReturnCode {
        ReturnCode::Unsupported
    }

    fn id(&self) -> u32 {
        self.base().id()
    }

    fn handle(&self) -> &ExecutionContextHandle {
        self.base().handle()
    }

    fn is_running(&self) -> bool {
        self.base().is_running()
    }

    fn get_rate(&self) -> f64 {
        self.base().get_rate()
    }

    fn set_rate(&self, rate: f64) -> ReturnCode {
        self.base().set_rate(rate)
    }

    fn get_kind(&self) -> ExecutionKind {
        self.base().get_kind()
    }

    fn get_profile(&self) -> ExecutionContextProfile {
        self.base().get_profile()
    }

    fn add_component(&self, component: Arc<dyn RtObject>) -> ReturnCode {
        self.base().add_component(component)
    }

    fn bind_component(&self, component: Arc<dyn RtObject>) -> Result<()> {
        self.base().bind_component(component)
    }

    fn remove_component(&self, component: &dyn RtObject) -> ReturnCode {
        self.base().remove_component(component)
    }

    fn activate_component(&self, component: &dyn RtObject) -> ReturnCode {
        self.base().activate_component(component)
    }

    fn deactivate_component(&self, component: &dyn RtObject) -> ReturnCode {
        self.base().deactivate_component(component)
    }

    fn reset_component(&self, component: &dyn RtObject) -> ReturnCode {
        self.base().reset_component(component)
    }

    fn get_component_state(&self, component: &dyn RtObject) -> LifeCycleState {
        self.base().get_component_state(component)
    }
}
