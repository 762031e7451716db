// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution context profile and the handle passed to component callbacks.

use crate::config::Properties;
use arc_swap::ArcSwap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionKind {
    Periodic,
    Other,
}

impl ExecutionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Periodic => "PERIODIC",
            Self::Other => "OTHER",
        }
    }
}

/// Snapshot of a context's externally visible settings.
#[derive(Debug, Clone)]
pub struct ExecutionContextProfile {
    pub kind: ExecutionKind,
    /// Hz
    pub rate: f64,
    /// Instance name of the component bound with `bind_component`.
    pub owner: Option<String>,
    /// Instance names in execution order.
    pub participants: Vec<String>,
    pub properties: Properties,
}

/// Cheap handle identifying a context to component callbacks.
///
/// Reading the profile through the handle never blocks the context.
#[derive(Clone)]
pub struct ExecutionContextHandle {
    id: u32,
    profile: Arc<ArcSwap<ExecutionContextProfile>>,
}

impl ExecutionContextHandle {
    pub(crate) fn new(id: u32, profile: Arc<ArcSwap<ExecutionContextProfile>>) -> Self {
        Self { id, profile }
    }

    /// Handle not attached to any context (id 0), for driving a state
    /// machine by hand.
    pub fn detached() -> Self {
        Self::new(
            0,
            Arc::new(ArcSwap::from_pointee(ExecutionContextProfile {
                kind: ExecutionKind::Other,
                rate: 0.0,
                owner: None,
                participants: Vec::new(),
                properties: Properties::new(),
            })),
        )
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn rate(&self) -> f64 {
        self.profile.load().rate
    }

    pub fn kind(&self) -> ExecutionKind {
        self.profile.load().kind
    }

    pub(crate) fn load(&self) -> Arc<ExecutionContextProfile> {
        self.profile.load_full()
    }

    /// Replace the stored profile by `f(current)`.
    pub(crate) fn update(&self, f: impl Fn(&ExecutionContextProfile) -> ExecutionContextProfile) {
        self.profile.rcu(|cur| f(cur));
    }
}

impl std::fmt::Debug for ExecutionContextHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContextHandle")
            .field("id", &self.id)
            .field("rate", &self.rate())
            .finish()
    }
}
