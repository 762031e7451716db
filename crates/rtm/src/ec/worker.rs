// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ordered participant list and the per-cycle worker.
//!
//! Additions and removals are queued and applied after the post phase of
//! the running cycle, so every cycle iterates a stable list. While the
//! context is stopped they are applied immediately.

use super::ExecutionContextHandle;
use crate::component::{identity, RtObject};
use crate::error::ReturnCode;
use crate::rtobject::{LifeCycleState, RtObjectStateMachine};
use crossbeam::queue::SegQueue;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct ExecutionContextWorker {
    handle: ExecutionContextHandle,
    /// Execution order
    components: RwLock<Vec<Arc<RtObjectStateMachine>>>,
    /// Every bound component, including queued additions
    bound: DashMap<usize, Arc<RtObjectStateMachine>>,
    added: SegQueue<Arc<RtObjectStateMachine>>,
    removed: SegQueue<Arc<RtObjectStateMachine>>,
    running: AtomicBool,
    measure: bool,
}

impl ExecutionContextWorker {
    pub fn new(handle: ExecutionContextHandle, measure: bool) -> Self {
        Self {
            handle,
            components: RwLock::new(Vec::new()),
            bound: DashMap::new(),
            added: SegQueue::new(),
            removed: SegQueue::new(),
            running: AtomicBool::new(false),
            measure,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Returns `false` if already running.
    pub(crate) fn set_running(&self, running: bool) -> bool {
        self.running.swap(running, Ordering::AcqRel) != running
    }

    // ========================================================================
    // Membership
    // ========================================================================

    /// Create a state machine for `component`. `BadParameter` if already
    /// bound.
    pub fn add_component(&self, component: Arc<dyn RtObject>) -> ReturnCode {
        let addr = identity(component.as_ref());
        if self.live_entry(addr).is_some() {
            log::warn!(
                "[ec] {} already participates in ec {}",
                component.instance_name(),
                self.handle.id()
            );
            return ReturnCode::BadParameter;
        }
        let sm = Arc::new(
            RtObjectStateMachine::new(self.handle.clone(), &component).with_measure(self.measure),
        );
        match self.bound.entry(addr) {
            Entry::Occupied(_) => return ReturnCode::BadParameter,
            Entry::Vacant(v) => {
                v.insert(Arc::clone(&sm));
            }
        }
        self.added.push(sm);

        if !self.is_running() {
            self.update_components();
        }
        ReturnCode::Ok
    }

    /// `BadParameter` if `component` is not bound.
    pub fn remove_component(&self, component: &dyn RtObject) -> ReturnCode {
        let addr = identity(component);
        if self.live_entry(addr).is_none() {
            return ReturnCode::BadParameter;
        }
        let Some((_, sm)) = self.bound.remove(&addr) else {
            return ReturnCode::BadParameter;
        };
        self.removed.push(sm);

        if !self.is_running() {
            self.update_components();
        }
        ReturnCode::Ok
    }

    pub fn find(&self, component: &dyn RtObject) -> Option<Arc<RtObjectStateMachine>> {
        self.live_entry(identity(component))
    }

    /// Entry bound at `addr`. An entry whose component was dropped is
    /// removed instead, since a new component may reuse its address.
    fn live_entry(&self, addr: usize) -> Option<Arc<RtObjectStateMachine>> {
        let sm = self.bound.get(&addr).map(|e| Arc::clone(e.value()))?;
        if sm.component().is_alive() {
            return Some(sm);
        }
        if self.bound.remove_if(&addr, |_, v| Arc::ptr_eq(v, &sm)).is_some() {
            log::debug!("[ec] {} was dropped, leaving ec {}", sm.name(), self.handle.id());
            self.removed.push(sm);
            if !self.is_running() {
                self.update_components();
            }
        }
        None
    }

    /// `CREATED` for components not bound here.
    pub fn component_state(&self, component: &dyn RtObject) -> LifeCycleState {
        self.find(component)
            .map_or(LifeCycleState::Created, |sm| sm.state())
    }

    /// Drain the add / remove queues into the execution list.
    pub fn update_components(&self) {
        if self.added.is_empty() && self.removed.is_empty() {
            return;
        }
        let mut list = self.components.write();
        while let Some(sm) = self.added.pop() {
            log::debug!("[ec] {} joins ec {}", sm.name(), self.handle.id());
            list.push(sm);
        }
        while let Some(gone) = self.removed.pop() {
            if let Some(pos) = list.iter().position(|sm| Arc::ptr_eq(sm, &gone)) {
                list.remove(pos);
                log::debug!("[ec] {} leaves ec {}", gone.name(), self.handle.id());
            }
        }
    }

    /// Current execution list.
    pub fn snapshot(&self) -> Vec<Arc<RtObjectStateMachine>> {
        self.components.read().clone()
    }

    pub fn participant_names(&self) -> Vec<String> {
        self.components
            .read()
            .iter()
            .map(|sm| sm.name().to_string())
            .collect()
    }

    // ========================================================================
    // Cycle
    // ========================================================================

    /// One cycle: every pre phase, then every do phase, then every post
    /// phase, in binding order.
    pub fn invoke(&self) {
        let list = self.snapshot();
        for sm in &list {
            sm.worker_pre_do();
        }
        for sm in &list {
            sm.worker_do();
        }
        for sm in &list {
            sm.worker_post_do();
        }
        self.update_components();
    }

    pub(crate) fn on_startup(&self) {
        self.update_components();
        for sm in self.snapshot() {
            sm.on_startup();
        }
    }

    pub(crate) fn on_shutdown(&self) {
        self.update_components();
        for sm in self.snapshot() {
            sm.on_shutdown();
        }
    }

    pub(crate) fn on_rate_changed(&self) {
        for sm in self.snapshot() {
            sm.on_rate_changed();
        }
    }
}
