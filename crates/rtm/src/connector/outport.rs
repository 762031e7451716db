// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! OutPort halves of push and pull links.

use super::{
    validate_interface, write_buffer, ConnectorBase, ConnectorInfo, ConnectorListenerType,
    ConnectorListeners, OutPortConnector,
};
use crate::buffer::CdrBuffer;
use crate::error::Result;
use crate::publisher::{Publisher, PublisherContext};
use crate::registry::FactoryRegistry;
use crate::ser::ByteData;
use crate::status::DataPortStatus;
use crate::transport::{InPortConsumer, OutPortProvider};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ============================================================================
// Push
// ============================================================================

struct PushLink {
    publisher: Box<dyn Publisher>,
    consumer: Arc<dyn InPortConsumer>,
    buffer: Arc<CdrBuffer>,
}

/// Writes go to the publisher, which delivers them through the consumer.
pub struct OutPortPushConnector {
    info: ConnectorInfo,
    listeners: Arc<ConnectorListeners>,
    link: RwLock<Option<PushLink>>,
    active: AtomicBool,
}

impl OutPortPushConnector {
    /// Build buffer and publisher from the connection properties. The
    /// consumer must already be subscribed.
    pub fn new(
        info: ConnectorInfo,
        consumer: Arc<dyn InPortConsumer>,
        listeners: Arc<ConnectorListeners>,
        registry: &FactoryRegistry,
    ) -> Result<Self> {
        validate_interface(&info, registry)?;
        let buffer = registry.create_buffer(&info.properties)?;
        let publisher = registry.create_publisher(PublisherContext {
            info: info.clone(),
            consumer: Arc::clone(&consumer),
            buffer: Arc::clone(&buffer),
            listeners: Arc::clone(&listeners),
        })?;
        publisher.activate();

        log::debug!("[connector] outport push {} ({}) created", info.name, info.id);
        Ok(Self {
            info,
            listeners,
            link: RwLock::new(Some(PushLink {
                publisher,
                consumer,
                buffer,
            })),
            active: AtomicBool::new(true),
        })
    }
}

impl ConnectorBase for OutPortPushConnector {
    fn profile(&self) -> &ConnectorInfo {
        &self.info
    }

    fn disconnect(&self) -> DataPortStatus {
        let Some(link) = self.link.write().take() else {
            return DataPortStatus::PortOk;
        };
        link.publisher.release();
        link.consumer.unsubscribe_interface(&self.info.properties);
        link.buffer.reset();
        self.listeners
            .notify(ConnectorListenerType::OnDisconnect, &self.info);
        log::debug!("[connector] outport push {} disconnected", self.info.name);
        DataPortStatus::PortOk
    }

    fn buffer(&self) -> Option<Arc<CdrBuffer>> {
        self.link.read().as_ref().map(|l| Arc::clone(&l.buffer))
    }

    fn activate(&self) {
        self.active.store(true, Ordering::Release);
        if let Some(link) = self.link.read().as_ref() {
            link.publisher.activate();
        }
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
        if let Some(link) = self.link.read().as_ref() {
            link.publisher.deactivate();
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl OutPortConnector for OutPortPushConnector {
    fn write(&self, data: ByteData) -> DataPortStatus {
        let link = self.link.read();
        match link.as_ref() {
            Some(link) if self.is_active() => link.publisher.write(data, None),
            _ => DataPortStatus::PreconditionNotMet,
        }
    }
}

impl Drop for OutPortPushConnector {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// ============================================================================
// Pull
// ============================================================================

/// Writes land in the local buffer; the remote side fetches them through
/// the provider.
pub struct OutPortPullConnector {
    info: ConnectorInfo,
    listeners: Arc<ConnectorListeners>,
    provider: Arc<dyn OutPortProvider>,
    buffer: RwLock<Option<Arc<CdrBuffer>>>,
    active: AtomicBool,
}

impl OutPortPullConnector {
    /// Hands the buffer and listeners to an initialized provider.
    pub fn new(
        info: ConnectorInfo,
        provider: Arc<dyn OutPortProvider>,
        listeners: Arc<ConnectorListeners>,
        registry: &FactoryRegistry,
    ) -> Result<Self> {
        validate_interface(&info, registry)?;
        let buffer = registry.create_buffer(&info.properties)?;
        provider.set_buffer(Arc::clone(&buffer));
        provider.set_listener(&info, Arc::clone(&listeners));

        log::debug!("[connector] outport pull {} ({}) created", info.name, info.id);
        Ok(Self {
            info,
            listeners,
            provider,
            buffer: RwLock::new(Some(buffer)),
            active: AtomicBool::new(true),
        })
    }
}

impl ConnectorBase for OutPortPullConnector {
    fn profile(&self) -> &ConnectorInfo {
        &self.info
    }

    fn disconnect(&self) -> DataPortStatus {
        let Some(buffer) = self.buffer.write().take() else {
            return DataPortStatus::PortOk;
        };
        self.provider.close();
        buffer.reset();
        self.listeners
            .notify(ConnectorListenerType::OnDisconnect, &self.info);
        log::debug!("[connector] outport pull {} disconnected", self.info.name);
        DataPortStatus::PortOk
    }

    fn buffer(&self) -> Option<Arc<CdrBuffer>> {
        self.buffer.read().clone()
    }

    fn activate(&self) {
        self.active.store(true, Ordering::Release);
    }

    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl OutPortConnector for OutPortPullConnector {
    fn write(&self, data: ByteData) -> DataPortStatus {
        let buffer = self.buffer.read();
        match buffer.as_ref() {
            Some(buffer) if self.is_active() => {
                write_buffer(&**buffer, &self.listeners, &self.info, data, None).into()
            }
            _ => DataPortStatus::PreconditionNotMet,
        }
    }
}

impl Drop for OutPortPullConnector {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{keys, Properties};
    use crate::transport::TransportFactory;
    use parking_lot::Mutex;

    struct Sink(Mutex<Vec<ByteData>>);

    impl InPortConsumer for Sink {
        fn subscribe_interface(&self, _props: &Properties) -> Result<()> {
            Ok(())
        }
        fn unsubscribe_interface(&self, _props: &Properties) {}
        fn put(&self, data: ByteData) -> DataPortStatus {
            self.0.lock().push(data);
            DataPortStatus::PortOk
        }
    }

    fn info(pairs: &[(&str, &str)]) -> ConnectorInfo {
        let props = Properties::from_pairs([(keys::INTERFACE_TYPE, keys::DIRECT)]);
        for (k, v) in pairs {
            props.set(k, v);
        }
        ConnectorInfo::new("c0", "id-0", vec!["out".into(), "in".into()], &props)
    }

    #[test]
    fn test_push_write_and_disconnect() {
        let registry = FactoryRegistry::with_defaults();
        let sink = Arc::new(Sink(Mutex::new(Vec::new())));
        let listeners = Arc::new(ConnectorListeners::new());
        let disconnects = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&disconnects);
        listeners.add_listener(
            ConnectorListenerType::OnDisconnect,
            Arc::new(move |_: ConnectorListenerType, _: &ConnectorInfo| *counter.lock() += 1),
        );

        let conn = OutPortPushConnector::new(
            info(&[]),
            Arc::clone(&sink) as Arc<dyn InPortConsumer>,
            listeners,
            &registry,
        )
        .unwrap();
        assert_eq!(conn.write(ByteData::from(vec![1])), DataPortStatus::PortOk);
        assert_eq!(sink.0.lock().len(), 1);

        assert_eq!(conn.disconnect(), DataPortStatus::PortOk);
        assert_eq!(conn.disconnect(), DataPortStatus::PortOk);
        assert_eq!(*disconnects.lock(), 1);
        assert!(conn.buffer().is_none());
        assert_eq!(
            conn.write(ByteData::from(vec![2])),
            DataPortStatus::PreconditionNotMet
        );
    }

    #[test]
    fn test_push_deactivated_refuses() {
        let registry = FactoryRegistry::with_defaults();
        let sink = Arc::new(Sink(Mutex::new(Vec::new())));
        let conn = OutPortPushConnector::new(
            info(&[]),
            Arc::clone(&sink) as Arc<dyn InPortConsumer>,
            Arc::new(ConnectorListeners::new()),
            &registry,
        )
        .unwrap();
        conn.deactivate();
        assert_eq!(
            conn.write(ByteData::from(vec![1])),
            DataPortStatus::PreconditionNotMet
        );
        conn.activate();
        assert_eq!(conn.write(ByteData::from(vec![1])), DataPortStatus::PortOk);
    }

    #[test]
    fn test_unknown_interface_rejected() {
        let registry = FactoryRegistry::with_defaults();
        let props = Properties::from_pairs([(keys::INTERFACE_TYPE, "corba_cdr")]);
        let sink = Arc::new(Sink(Mutex::new(Vec::new())));
        let result = OutPortPushConnector::new(
            ConnectorInfo::new("c", "id", vec![], &props),
            sink as Arc<dyn InPortConsumer>,
            Arc::new(ConnectorListeners::new()),
            &registry,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_pull_write_fills_buffer() {
        let registry = FactoryRegistry::with_defaults();
        let transport = registry.transport(keys::DIRECT).unwrap();
        let provider = transport.create_outport_provider().unwrap();
        let conn = OutPortPullConnector::new(
            info(&[(keys::BUFFER_LENGTH, "2"), (keys::BUFFER_WRITE_FULL_POLICY, "do_nothing")]),
            Arc::clone(&provider),
            Arc::new(ConnectorListeners::new()),
            &registry,
        )
        .unwrap();

        assert_eq!(conn.write(ByteData::from(vec![1])), DataPortStatus::PortOk);
        assert_eq!(conn.write(ByteData::from(vec![2])), DataPortStatus::PortOk);
        assert_eq!(conn.write(ByteData::from(vec![3])), DataPortStatus::BufferFull);
        assert_eq!(provider.get().unwrap().as_slice(), &[1]);

        conn.disconnect();
        assert_eq!(provider.get().unwrap_err(), DataPortStatus::ConnectionLost);
    }
}
