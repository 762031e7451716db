// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Name-keyed factories for buffers, publishers, transports and execution
//! contexts.
//!
//! A registry is an ordinary value: create one, register extra factories,
//! and pass it by reference wherever connections or contexts are built.
//! Names are case-insensitive.
//!
//! ```
//! use rtm::config::keys;
//! use rtm::FactoryRegistry;
//!
//! let registry = FactoryRegistry::with_defaults();
//! assert!(registry.has_transport(keys::DIRECT));
//! assert!(registry.has_publisher("Periodic"));
//! assert!(!registry.has_transport("corba_cdr"));
//! ```

use crate::buffer::{CdrBuffer, RingBuffer};
use crate::config::{keys, Properties};
use crate::ec::{ExecutionContext, ExtTrigExecutionContext, PeriodicExecutionContext};
use crate::error::{Error, Result};
use crate::publisher::{
    Publisher, PublisherContext, PublisherFlush, PublisherNew, PublisherPeriodic,
};
use crate::ser::ByteData;
use crate::transport::{DirectTransport, TransportFactory};
use dashmap::DashMap;
use std::sync::Arc;

pub type BufferFactory = Arc<dyn Fn(&Properties) -> Result<Arc<CdrBuffer>> + Send + Sync>;

pub type PublisherFactory =
    Arc<dyn Fn(PublisherContext) -> Result<Box<dyn Publisher>> + Send + Sync>;

pub type ContextFactory =
    Arc<dyn Fn(&Properties) -> Result<Arc<dyn ExecutionContext>> + Send + Sync>;

/// Execution context type used when `exec_cxt.type` is not set.
pub const DEFAULT_CONTEXT_TYPE: &str = "PeriodicExecutionContext";

#[derive(Default)]
pub struct FactoryRegistry {
    buffers: DashMap<String, BufferFactory>,
    publishers: DashMap<String, PublisherFactory>,
    transports: DashMap<String, Arc<dyn TransportFactory>>,
    contexts: DashMap<String, ContextFactory>,
}

fn norm(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

impl FactoryRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in implementation.
    pub fn with_defaults() -> Self {
        let registry = Self::new();

        registry.register_buffer(
            keys::RING_BUFFER,
            Arc::new(|props: &Properties| -> Result<Arc<CdrBuffer>> {
                let buffer = RingBuffer::<ByteData>::from_properties(props)?;
                Ok(Arc::new(buffer))
            }),
        );

        registry.register_publisher(
            keys::FLUSH,
            Arc::new(|ctx: PublisherContext| -> Result<Box<dyn Publisher>> {
                Ok(Box::new(PublisherFlush::new(ctx)?))
            }),
        );
        registry.register_publisher(
            keys::NEW,
            Arc::new(|ctx: PublisherContext| -> Result<Box<dyn Publisher>> {
                Ok(Box::new(PublisherNew::new(ctx)?))
            }),
        );
        registry.register_publisher(
            keys::PERIODIC,
            Arc::new(|ctx: PublisherContext| -> Result<Box<dyn Publisher>> {
                Ok(Box::new(PublisherPeriodic::new(ctx)?))
            }),
        );

        registry.register_transport(Arc::new(DirectTransport::new()));

        registry.register_context(
            "PeriodicExecutionContext",
            Arc::new(|props: &Properties| -> Result<Arc<dyn ExecutionContext>> {
                Ok(Arc::new(PeriodicExecutionContext::new(props)?))
            }),
        );
        registry.register_context(
            "ExtTrigExecutionContext",
            Arc::new(|props: &Properties| -> Result<Arc<dyn ExecutionContext>> {
                Ok(Arc::new(ExtTrigExecutionContext::new(props)?))
            }),
        );

        registry
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register or replace a buffer factory.
    pub fn register_buffer(&self, name: &str, factory: BufferFactory) {
        log::debug!("[config] buffer factory '{}' registered", name);
        self.buffers.insert(norm(name), factory);
    }

    pub fn register_publisher(&self, name: &str, factory: PublisherFactory) {
        log::debug!("[config] publisher factory '{}' registered", name);
        self.publishers.insert(norm(name), factory);
    }

    /// Register under the factory's own `interface_type()`.
    pub fn register_transport(&self, factory: Arc<dyn TransportFactory>) {
        log::debug!(
            "[config] transport '{}' registered",
            factory.interface_type()
        );
        self.transports.insert(norm(factory.interface_type()), factory);
    }

    pub fn register_context(&self, name: &str, factory: ContextFactory) {
        log::debug!("[config] execution context factory '{}' registered", name);
        self.contexts.insert(norm(name), factory);
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn has_transport(&self, name: &str) -> bool {
        self.transports.contains_key(&norm(name))
    }

    pub fn has_publisher(&self, name: &str) -> bool {
        self.publishers.contains_key(&norm(name))
    }

    pub fn has_buffer(&self, name: &str) -> bool {
        self.buffers.contains_key(&norm(name))
    }

    pub fn has_context(&self, name: &str) -> bool {
        self.contexts.contains_key(&norm(name))
    }

    pub fn transport(&self, name: &str) -> Result<Arc<dyn TransportFactory>> {
        self.transports
            .get(&norm(name))
            .map(|t| Arc::clone(t.value()))
            .ok_or_else(|| Error::Unsupported(format!("interface_type '{}'", name)))
    }

    /// Buffer named by `buffer.type` (default `ring_buffer`), configured from
    /// `props`.
    pub fn create_buffer(&self, props: &Properties) -> Result<Arc<CdrBuffer>> {
        let name = props
            .get_normalized(keys::BUFFER_TYPE)
            .unwrap_or_else(|| keys::RING_BUFFER.to_string());
        // Clone out of the map before calling user code
        let factory = self
            .buffers
            .get(&name)
            .map(|f| Arc::clone(f.value()))
            .ok_or_else(|| Error::Unsupported(format!("buffer type '{}'", name)))?;
        factory(props)
    }

    /// Publisher named by the connection's `dataport.subscription_type`
    /// (default `flush`).
    pub fn create_publisher(&self, ctx: PublisherContext) -> Result<Box<dyn Publisher>> {
        let name = ctx
            .info
            .properties
            .get_normalized(keys::SUBSCRIPTION_TYPE)
            .unwrap_or_else(|| keys::FLUSH.to_string());
        let factory = self
            .publishers
            .get(&name)
            .map(|f| Arc::clone(f.value()))
            .ok_or_else(|| Error::Unsupported(format!("subscription_type '{}'", name)))?;
        factory(ctx)
    }

    /// Execution context named by `exec_cxt.type`.
    pub fn create_context(&self, props: &Properties) -> Result<Arc<dyn ExecutionContext>> {
        let name = props
            .get_str(keys::EC_TYPE)
            .unwrap_or_else(|| DEFAULT_CONTEXT_TYPE.to_string());
        let factory = self
            .contexts
            .get(&norm(&name))
            .map(|f| Arc::clone(f.value()))
            .ok_or_else(|| Error::Unsupported(format!("execution context '{}'", name)))?;
        factory(props)
    }
}

impl std::fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = |keys: Vec<String>| {
            let mut keys = keys;
            keys.sort();
            keys
        };
        f.debug_struct("FactoryRegistry")
            .field("buffers", &names(self.buffers.iter().map(|e| e.key().clone()).collect()))
            .field(
                "publishers",
                &names(self.publishers.iter().map(|e| e.key().clone()).collect()),
            )
            .field(
                "transports",
                &names(self.transports.iter().map(|e| e.key().clone()).collect()),
            )
            .field("contexts", &names(self.contexts.iter().map(|e| e.key().clone()).collect()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;

    #[test]
    fn test_defaults_registered() {
        let r = FactoryRegistry::with_defaults();
        for name in ["flush", "NEW", "periodic"] {
            assert!(r.has_publisher(name), "{}", name);
        }
        assert!(r.has_buffer("Ring_Buffer"));
        assert!(r.has_transport("direct"));
        assert!(r.has_context("periodicexecutioncontext"));
        assert!(r.has_context("ExtTrigExecutionContext"));
        assert!(!FactoryRegistry::new().has_transport("direct"));
    }

    #[test]
    fn test_create_buffer_from_properties() {
        let r = FactoryRegistry::with_defaults();
        let props = Properties::from_pairs([(keys::BUFFER_LENGTH, "3")]);
        assert_eq!(r.create_buffer(&props).unwrap().length(), 3);

        props.set(keys::BUFFER_TYPE, "double_buffer");
        assert!(matches!(r.create_buffer(&props), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_custom_buffer_factory() {
        let r = FactoryRegistry::new();
        r.register_buffer(
            "tiny",
            Arc::new(|_: &Properties| -> Result<Arc<CdrBuffer>> {
                Ok(Arc::new(RingBuffer::<ByteData>::new(1)))
            }),
        );
        let props = Properties::from_pairs([(keys::BUFFER_TYPE, "TINY")]);
        assert_eq!(r.create_buffer(&props).unwrap().length(), 1);
    }

    #[test]
    fn test_unknown_context_type() {
        let r = FactoryRegistry::with_defaults();
        let props = Properties::from_pairs([(keys::EC_TYPE, "RTPreemptEC")]);
        assert!(r.create_context(&props).is_err());
    }

    #[test]
    fn test_create_context_by_type() {
        let r = FactoryRegistry::with_defaults();
        let props = Properties::from_pairs([(keys::EC_TYPE, "ExtTrigExecutionContext")]);
        let ec = r.create_context(&props).unwrap();
        assert!(!ec.is_running());
    }
}
