// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution context stepped by the caller.
//!
//! No thread is spawned: every `tick()` runs exactly one cycle on the
//! calling thread. Useful for tests and for hosts that own the schedule.

use super::{ExecutionContext, ExecutionContextBase, ExecutionKind};
use crate::config::Properties;
use crate::error::{Result, ReturnCode};

#[derive(Debug)]
pub struct ExtTrigExecutionContext {
    base: ExecutionContextBase,
}

impl ExtTrigExecutionContext {
    /// `exec_cxt.sync_transition` defaults to `NO`; requests are applied by
    /// the next `tick()`.
    pub fn new(props: &Properties) -> Result<Self> {
        Ok(Self {
            base: ExecutionContextBase::new(ExecutionKind::Periodic, props, false)?,
        })
    }
}

impl ExecutionContext for ExtTrigExecutionContext {
    fn base(&self) -> &ExecutionContextBase {
        &self.base
    }

    fn start(&self) -> ReturnCode {
        self.base.start()
    }

    fn stop(&self) -> ReturnCode {
        let rc = self.base.begin_stop();
        if rc.is_ok() {
            self.base.finish_stop();
        }
        rc
    }

    /// Run one cycle now. `PreconditionNotMet` when stopped.
    fn tick(&self) -> ReturnCode {
        if !self.base.is_running() {
            log::debug!("[ec] tick on stopped ec {}", self.base.id());
            return ReturnCode::PreconditionNotMet;
        }
        self.base.invoke_worker();
        ReturnCode::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentAction, DataFlowComponentAction, RtObject};
    use crate::ec::ExecutionContextHandle;
    use crate::rtobject::LifeCycleState;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<&'static str>>);

    impl ComponentAction for Recorder {
        fn on_activated(&self, _ec: &ExecutionContextHandle) -> ReturnCode {
            self.0.lock().push("activated");
            ReturnCode::Ok
        }
        fn on_deactivated(&self, _ec: &ExecutionContextHandle) -> ReturnCode {
            self.0.lock().push("deactivated");
            ReturnCode::Ok
        }
    }

    impl DataFlowComponentAction for Recorder {
        fn on_execute(&self, _ec: &ExecutionContextHandle) -> ReturnCode {
            self.0.lock().push("execute");
            ReturnCode::Ok
        }
    }

    impl RtObject for Recorder {
        fn instance_name(&self) -> &str {
            "recorder"
        }
        fn data_flow_action(self: Arc<Self>) -> Option<Arc<dyn DataFlowComponentAction>> {
            Some(self)
        }
    }

    #[test]
    fn test_tick_requires_running() {
        let ec = ExtTrigExecutionContext::new(&Properties::new()).unwrap();
        assert_eq!(ec.tick(), ReturnCode::PreconditionNotMet);
        assert_eq!(ec.start(), ReturnCode::Ok);
        assert_eq!(ec.tick(), ReturnCode::Ok);
        assert_eq!(ec.stop(), ReturnCode::Ok);
        assert_eq!(ec.tick(), ReturnCode::PreconditionNotMet);
    }

    #[test]
    fn test_requests_apply_on_next_tick() {
        let ec = ExtTrigExecutionContext::new(&Properties::new()).unwrap();
        let rec = Arc::new(Recorder::default());
        let obj: Arc<dyn RtObject> = rec.clone();
        ec.add_component(Arc::clone(&obj));
        ec.start();

        // Asynchronous by default
        assert_eq!(ec.activate_component(obj.as_ref()), ReturnCode::Ok);
        assert_eq!(ec.get_component_state(obj.as_ref()), LifeCycleState::Inactive);

        ec.tick();
        assert_eq!(ec.get_component_state(obj.as_ref()), LifeCycleState::Active);
        ec.deactivate_component(obj.as_ref());
        ec.tick();
        assert_eq!(ec.get_component_state(obj.as_ref()), LifeCycleState::Inactive);
        ec.tick();

        assert_eq!(*rec.0.lock(), vec!["activated", "execute", "deactivated"]);
        assert_eq!(ec.base().cycle_count(), 3);
    }
}
