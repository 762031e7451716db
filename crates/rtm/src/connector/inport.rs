// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! InPort halves of push and pull links.

use super::{
    read_buffer, validate_interface, write_buffer, ConnectorBase, ConnectorInfo,
    ConnectorListenerType, ConnectorListeners, InPortConnector,
};
use crate::buffer::CdrBuffer;
use crate::error::Result;
use crate::registry::FactoryRegistry;
use crate::ser::ByteData;
use crate::status::{BufferStatus, DataPortStatus};
use crate::transport::{InPortProvider, OutPortConsumer};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Buffer and activity flag shared by both InPort connectors.
struct Local {
    info: ConnectorInfo,
    listeners: Arc<ConnectorListeners>,
    buffer: RwLock<Option<Arc<CdrBuffer>>>,
    active: AtomicBool,
}

impl Local {
    fn new(
        info: ConnectorInfo,
        listeners: Arc<ConnectorListeners>,
        registry: &FactoryRegistry,
    ) -> Result<Self> {
        validate_interface(&info, registry)?;
        let buffer = registry.create_buffer(&info.properties)?;
        Ok(Self {
            info,
            listeners,
            buffer: RwLock::new(Some(buffer)),
            active: AtomicBool::new(true),
        })
    }

    fn current(&self) -> Option<Arc<CdrBuffer>> {
        self.buffer.read().clone()
    }

    /// Take the buffer on first call only; fires `OnDisconnect`.
    fn release(&self) -> bool {
        let Some(buffer) = self.buffer.write().take() else {
            return false;
        };
        buffer.reset();
        self.listeners
            .notify(ConnectorListenerType::OnDisconnect, &self.info);
        true
    }

    fn readable_buffer(&self) -> std::result::Result<Arc<CdrBuffer>, DataPortStatus> {
        if !self.active.load(Ordering::Acquire) {
            return Err(DataPortStatus::BufferEmpty);
        }
        self.current().ok_or(DataPortStatus::PreconditionNotMet)
    }
}

// ============================================================================
// Push
// ============================================================================

/// Data arrives through the provider; `read` drains the local buffer.
pub struct InPortPushConnector {
    local: Local,
    provider: Arc<dyn InPortProvider>,
}

impl InPortPushConnector {
    /// Hands the buffer and listeners to an initialized provider.
    pub fn new(
        info: ConnectorInfo,
        provider: Arc<dyn InPortProvider>,
        listeners: Arc<ConnectorListeners>,
        registry: &FactoryRegistry,
    ) -> Result<Self> {
        let local = Local::new(info, listeners, registry)?;
        if let Some(buffer) = local.current() {
            provider.set_buffer(buffer);
        }
        provider.set_listener(&local.info, Arc::clone(&local.listeners));

        log::debug!(
            "[connector] inport push {} ({}) created",
            local.info.name,
            local.info.id
        );
        Ok(Self { local, provider })
    }
}

impl ConnectorBase for InPortPushConnector {
    fn profile(&self) -> &ConnectorInfo {
        &self.local.info
    }

    fn disconnect(&self) -> DataPortStatus {
        if self.local.release() {
            self.provider.close();
            log::debug!("[connector] inport push {} disconnected", self.local.info.name);
        }
        DataPortStatus::PortOk
    }

    fn buffer(&self) -> Option<Arc<CdrBuffer>> {
        self.local.current()
    }

    fn activate(&self) {
        self.local.active.store(true, Ordering::Release);
    }

    fn deactivate(&self) {
        self.local.active.store(false, Ordering::Release);
    }

    fn is_active(&self) -> bool {
        self.local.active.load(Ordering::Acquire)
    }
}

impl InPortConnector for InPortPushConnector {
    fn read(&self) -> std::result::Result<ByteData, DataPortStatus> {
        let buffer = self.local.readable_buffer()?;
        read_buffer(&*buffer, &self.local.listeners, &self.local.info)
    }
}

impl Drop for InPortPushConnector {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// ============================================================================
// Pull
// ============================================================================

/// `read` fetches from the remote OutPort on demand.
///
/// Fetched records pass through the local buffer so that the `readback`
/// empty policy can answer when the remote side has nothing new.
pub struct InPortPullConnector {
    local: Local,
    consumer: Arc<dyn OutPortConsumer>,
}

impl InPortPullConnector {
    /// The consumer must already be subscribed.
    pub fn new(
        info: ConnectorInfo,
        consumer: Arc<dyn OutPortConsumer>,
        listeners: Arc<ConnectorListeners>,
        registry: &FactoryRegistry,
    ) -> Result<Self> {
        let local = Local::new(info, listeners, registry)?;
        if let Some(buffer) = local.current() {
            consumer.set_buffer(buffer);
        }
        consumer.set_listener(&local.info, Arc::clone(&local.listeners));

        log::debug!(
            "[connector] inport pull {} ({}) created",
            local.info.name,
            local.info.id
        );
        Ok(Self { local, consumer })
    }
}

impl ConnectorBase for InPortPullConnector {
    fn profile(&self) -> &ConnectorInfo {
        &self.local.info
    }

    fn disconnect(&self) -> DataPortStatus {
        if self.local.release() {
            self.consumer
                .unsubscribe_interface(&self.local.info.properties);
            log::debug!("[connector] inport pull {} disconnected", self.local.info.name);
        }
        DataPortStatus::PortOk
    }

    fn buffer(&self) -> Option<Arc<CdrBuffer>> {
        self.local.current()
    }

    fn activate(&self) {
        self.local.active.store(true, Ordering::Release);
    }

    fn deactivate(&self) {
        self.local.active.store(false, Ordering::Release);
    }

    fn is_active(&self) -> bool {
        self.local.active.load(Ordering::Acquire)
    }
}

impl InPortConnector for InPortPullConnector {
    fn read(&self) -> std::result::Result<ByteData, DataPortStatus> {
        let buffer = self.local.readable_buffer()?;
        let Local {
            info, listeners, ..
        } = &self.local;

        match self.consumer.get() {
            Ok(data) => {
                let status = write_buffer(&*buffer, listeners, info, data, None);
                if status != BufferStatus::Ok {
                    log::warn!(
                        "[connector] inport pull {}: pulled data dropped ({})",
                        info.name,
                        status
                    );
                    return Err(status.into());
                }
            }
            // Fall through: readback may still answer
            Err(DataPortStatus::BufferEmpty) => {}
            Err(other) => return Err(other),
        }
        read_buffer(&*buffer, listeners, info)
    }

    /// Local data only; no remote round-trip.
    fn is_new(&self) -> bool {
        self.local.current().is_some_and(|b| !b.empty())
    }
}

impl Drop for InPortPullConnector {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::RingBuffer;
    use crate::config::{keys, Properties};
    use crate::transport::OutPortProvider;

    fn info(pairs: &[(&str, &str)]) -> ConnectorInfo {
        let props = Properties::from_pairs([(keys::INTERFACE_TYPE, keys::DIRECT)]);
        for (k, v) in pairs {
            props.set(k, v);
        }
        ConnectorInfo::new("c1", "id-1", vec!["out".into(), "in".into()], &props)
    }

    #[test]
    fn test_push_provider_fills_buffer() {
        let registry = FactoryRegistry::with_defaults();
        let transport = registry.transport(keys::DIRECT).unwrap();
        let provider = transport.create_inport_provider().unwrap();
        let conn = InPortPushConnector::new(
            info(&[]),
            Arc::clone(&provider),
            Arc::new(ConnectorListeners::new()),
            &registry,
        )
        .unwrap();

        assert!(!conn.is_new());
        assert_eq!(provider.put(ByteData::from(vec![4])), DataPortStatus::PortOk);
        assert!(conn.is_new());
        assert_eq!(conn.read().unwrap().as_slice(), &[4]);
        assert_eq!(conn.read().unwrap_err(), DataPortStatus::BufferEmpty);
    }

    #[test]
    fn test_push_disconnect_closes_provider() {
        let registry = FactoryRegistry::with_defaults();
        let transport = registry.transport(keys::DIRECT).unwrap();
        let provider = transport.create_inport_provider().unwrap();
        let conn = InPortPushConnector::new(
            info(&[]),
            Arc::clone(&provider),
            Arc::new(ConnectorListeners::new()),
            &registry,
        )
        .unwrap();

        conn.disconnect();
        conn.disconnect();
        assert_eq!(provider.put(ByteData::from(vec![1])), DataPortStatus::ConnectionLost);
        assert_eq!(conn.read().unwrap_err(), DataPortStatus::PreconditionNotMet);
    }

    #[test]
    fn test_pull_reads_through_consumer() {
        let registry = FactoryRegistry::with_defaults();
        let transport = registry.transport(keys::DIRECT).unwrap();

        // Remote OutPort side
        let remote_props = Properties::new();
        let provider = transport.create_outport_provider().unwrap();
        let remote: Arc<CdrBuffer> = Arc::new(RingBuffer::<ByteData>::new(4));
        let remote_info = ConnectorInfo::new("remote", "id-1", vec![], &remote_props);
        provider.set_buffer(Arc::clone(&remote));
        provider.set_listener(&remote_info, Arc::new(ConnectorListeners::new()));
        provider.publish_interface(&remote_props).unwrap();

        let consumer = transport.create_outport_consumer().unwrap();
        consumer.subscribe_interface(&remote_props).unwrap();

        let conn = InPortPullConnector::new(
            info(&[(keys::BUFFER_READ_EMPTY_POLICY, "readback")]),
            consumer,
            Arc::new(ConnectorListeners::new()),
            &registry,
        )
        .unwrap();

        // Nothing written yet and no history
        assert_eq!(conn.read().unwrap_err(), DataPortStatus::BufferEmpty);

        remote.write(ByteData::from(vec![8]), None);
        assert_eq!(conn.read().unwrap().as_slice(), &[8]);

        // Remote empty: readback repeats the last value
        assert_eq!(conn.read().unwrap().as_slice(), &[8]);
    }

    #[test]
    fn test_pull_reports_rejected_item() {
        let registry = FactoryRegistry::with_defaults();
        let transport = registry.transport(keys::DIRECT).unwrap();

        let remote_props = Properties::new();
        let provider = transport.create_outport_provider().unwrap();
        let remote: Arc<CdrBuffer> = Arc::new(RingBuffer::<ByteData>::new(4));
        let remote_info = ConnectorInfo::new("remote", "id-1", vec![], &remote_props);
        provider.set_buffer(Arc::clone(&remote));
        provider.set_listener(&remote_info, Arc::new(ConnectorListeners::new()));
        provider.publish_interface(&remote_props).unwrap();

        let consumer = transport.create_outport_consumer().unwrap();
        consumer.subscribe_interface(&remote_props).unwrap();

        let conn = InPortPullConnector::new(
            info(&[
                (keys::BUFFER_LENGTH, "1"),
                (keys::BUFFER_WRITE_FULL_POLICY, "do_nothing"),
            ]),
            consumer,
            Arc::new(ConnectorListeners::new()),
            &registry,
        )
        .unwrap();

        // Local buffer already holds an unread item
        conn.buffer().unwrap().write(ByteData::from(vec![1]), None);
        remote.write(ByteData::from(vec![2]), None);
        assert_eq!(conn.read().unwrap_err(), DataPortStatus::BufferFull);

        // The held item is still delivered afterwards
        assert_eq!(conn.read().unwrap().as_slice(), &[1]);
    }
}
