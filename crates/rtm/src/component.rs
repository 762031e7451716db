// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Component capability traits.
//!
//! Every component implements [`RtObject`] (and therefore
//! [`ComponentAction`]). The optional capabilities are advertised through
//! the `*_action()` accessors, which an execution context queries exactly
//! once when the component is bound:
//!
//! ```
//! use rtm::component::{ComponentAction, DataFlowComponentAction, RtObject};
//! use rtm::ec::ExecutionContextHandle;
//! use rtm::ReturnCode;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//!
//! struct Counter {
//!     ticks: AtomicU64,
//! }
//!
//! impl ComponentAction for Counter {}
//!
//! impl DataFlowComponentAction for Counter {
//!     fn on_execute(&self, _ec: &ExecutionContextHandle) -> ReturnCode {
//!         self.ticks.fetch_add(1, Ordering::Relaxed);
//!         ReturnCode::Ok
//!     }
//! }
//!
//! impl RtObject for Counter {
//!     fn instance_name(&self) -> &str {
//!         "counter0"
//!     }
//!
//!     fn data_flow_action(self: Arc<Self>) -> Option<Arc<dyn DataFlowComponentAction>> {
//!         Some(self)
//!     }
//! }
//! ```

use crate::ec::ExecutionContextHandle;
use crate::error::ReturnCode;
use std::sync::{Arc, Weak};

/// Lifecycle callbacks. Every method defaults to `ReturnCode::Ok`.
///
/// A non-`Ok` return (or a panic) from `on_activated`, `on_deactivated` or
/// `on_reset` moves the component to ERROR.
pub trait ComponentAction: Send + Sync {
    /// The context started.
    fn on_startup(&self, _ec: &ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }

    /// The context stopped.
    fn on_shutdown(&self, _ec: &ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }

    fn on_activated(&self, _ec: &ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }

    fn on_deactivated(&self, _ec: &ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }

    /// Entering ERROR.
    fn on_aborting(&self, _ec: &ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }

    /// Called once per cycle while in ERROR.
    fn on_error(&self, _ec: &ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }

    /// Leaving ERROR. `Ok` returns the component to INACTIVE.
    fn on_reset(&self, _ec: &ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }
}

/// Periodic work while ACTIVE.
pub trait DataFlowComponentAction: Send + Sync {
    fn on_execute(&self, _ec: &ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }

    /// Post phase of the same cycle.
    fn on_state_update(&self, _ec: &ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }

    fn on_rate_changed(&self, _ec: &ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }
}

pub trait FsmParticipantAction: Send + Sync {
    fn on_action(&self, _ec: &ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }
}

pub trait MultiModeComponentAction: Send + Sync {
    fn on_mode_changed(&self, _ec: &ExecutionContextHandle) -> ReturnCode {
        ReturnCode::Ok
    }
}

/// A bindable component.
pub trait RtObject: ComponentAction + 'static {
    fn instance_name(&self) -> &str;

    fn data_flow_action(self: Arc<Self>) -> Option<Arc<dyn DataFlowComponentAction>> {
        None
    }

    fn fsm_participant_action(self: Arc<Self>) -> Option<Arc<dyn FsmParticipantAction>> {
        None
    }

    fn multi_mode_action(self: Arc<Self>) -> Option<Arc<dyn MultiModeComponentAction>> {
        None
    }
}

/// Capability record computed at bind time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub component_action: bool,
    pub data_flow: bool,
    pub fsm: bool,
    pub multi_mode: bool,
}

/// Address of the component's data, used as its identity.
pub(crate) fn identity(component: &dyn RtObject) -> usize {
    component as *const dyn RtObject as *const () as usize
}

/// Weak handle to a bound component with its capabilities resolved once.
///
/// The context never keeps a component alive. Once the owner drops it,
/// every accessor returns `None` and the callbacks are skipped.
#[derive(Clone)]
pub struct ComponentRef {
    name: String,
    addr: usize,
    object: Weak<dyn RtObject>,
    data_flow: Option<Weak<dyn DataFlowComponentAction>>,
    fsm: Option<Weak<dyn FsmParticipantAction>>,
    multi_mode: Option<Weak<dyn MultiModeComponentAction>>,
}

impl ComponentRef {
    pub fn bind(component: &Arc<dyn RtObject>) -> Self {
        let data_flow = Arc::clone(component)
            .data_flow_action()
            .map(|a| Arc::downgrade(&a));
        let fsm = Arc::clone(component)
            .fsm_participant_action()
            .map(|a| Arc::downgrade(&a));
        let multi_mode = Arc::clone(component)
            .multi_mode_action()
            .map(|a| Arc::downgrade(&a));

        Self {
            name: component.instance_name().to_string(),
            addr: identity(component.as_ref()),
            object: Arc::downgrade(component),
            data_flow,
            fsm,
            multi_mode,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            component_action: true,
            data_flow: self.data_flow.is_some(),
            fsm: self.fsm.is_some(),
            multi_mode: self.multi_mode.is_some(),
        }
    }

    /// `true` if `other` is the component this handle was bound to.
    pub fn is(&self, other: &dyn RtObject) -> bool {
        self.addr == identity(other)
    }

    /// `false` once the owner has dropped the component.
    pub fn is_alive(&self) -> bool {
        self.object.strong_count() > 0
    }

    pub fn object(&self) -> Option<Arc<dyn RtObject>> {
        self.object.upgrade()
    }

    pub fn data_flow(&self) -> Option<Arc<dyn DataFlowComponentAction>> {
        self.data_flow.as_ref().and_then(Weak::upgrade)
    }

    pub fn fsm(&self) -> Option<Arc<dyn FsmParticipantAction>> {
        self.fsm.as_ref().and_then(Weak::upgrade)
    }

    pub fn multi_mode(&self) -> Option<Arc<dyn MultiModeComponentAction>> {
        self.multi_mode.as_ref().and_then(Weak::upgrade)
    }
}

impl std::fmt::Debug for ComponentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRef")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities())
            .field("alive", &(self.object.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;
    impl ComponentAction for Plain {}
    impl RtObject for Plain {
        fn instance_name(&self) -> &str {
            "plain"
        }
    }

    struct Full;
    impl ComponentAction for Full {}
    impl DataFlowComponentAction for Full {}
    impl FsmParticipantAction for Full {}
    impl MultiModeComponentAction for Full {}
    impl RtObject for Full {
        fn instance_name(&self) -> &str {
            "full"
        }
        fn data_flow_action(self: Arc<Self>) -> Option<Arc<dyn DataFlowComponentAction>> {
            Some(self)
        }
        fn fsm_participant_action(self: Arc<Self>) -> Option<Arc<dyn FsmParticipantAction>> {
            Some(self)
        }
        fn multi_mode_action(self: Arc<Self>) -> Option<Arc<dyn MultiModeComponentAction>> {
            Some(self)
        }
    }

    #[test]
    fn test_capabilities_resolved() {
        let plain: Arc<dyn RtObject> = Arc::new(Plain);
        let caps = ComponentRef::bind(&plain).capabilities();
        assert!(caps.component_action);
        assert!(!caps.data_flow && !caps.fsm && !caps.multi_mode);

        let full: Arc<dyn RtObject> = Arc::new(Full);
        let caps = ComponentRef::bind(&full).capabilities();
        assert!(caps.data_flow && caps.fsm && caps.multi_mode);
    }

    #[test]
    fn test_weak_only() {
        let full: Arc<dyn RtObject> = Arc::new(Full);
        let r = ComponentRef::bind(&full);
        assert_eq!(Arc::strong_count(&full), 1);
        assert!(r.data_flow().is_some());
        assert!(r.is(full.as_ref()));

        drop(full);
        assert!(r.object().is_none());
        assert!(r.data_flow().is_none());
    }

    #[test]
    fn test_identity_distinguishes_instances() {
        let a: Arc<dyn RtObject> = Arc::new(Full);
        let b: Arc<dyn RtObject> = Arc::new(Full);
        let ra = ComponentRef::bind(&a);
        assert!(ra.is(a.as_ref()));
        assert!(!ra.is(b.as_ref()));
    }
}
