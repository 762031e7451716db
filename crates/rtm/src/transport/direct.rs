// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process transport (`interface_type = "direct"`).
//!
//! Providers register themselves in an endpoint table owned by the
//! [`DirectTransport`] instance (and therefore by the registry that holds
//! it) under a fresh UUID, and publish that id as
//! `dataport.direct.endpoint`. Consumers resolve the id to a `Weak` handle.
//!
//! The consumer never keeps the provider alive: once the remote half is
//! disconnected or dropped, transfers report `CONNECTION_LOST`.

use super::{
    deliver, serve, InPortConsumer, InPortProvider, OutPortConsumer, OutPortProvider,
    TransportFactory,
};
use crate::buffer::CdrBuffer;
use crate::config::{keys, Properties};
use crate::connector::{ConnectorDataListenerType, ConnectorInfo, ConnectorListeners};
use crate::error::{Error, Result};
use crate::ser::ByteData;
use crate::status::DataPortStatus;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use uuid::Uuid;

enum Endpoint {
    InPort(Weak<DirectInPortProvider>),
    OutPort(Weak<DirectOutPortProvider>),
}

type EndpointTable = DashMap<String, Endpoint>;

type ListenerSlot = RwLock<Option<(ConnectorInfo, Arc<ConnectorListeners>)>>;

/// Factory for the in-process binding.
pub struct DirectTransport {
    endpoints: Arc<EndpointTable>,
}

impl DirectTransport {
    pub const INTERFACE_TYPE: &'static str = keys::DIRECT;

    pub fn new() -> Self {
        Self {
            endpoints: Arc::new(DashMap::new()),
        }
    }

    /// Providers currently reachable.
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }
}

impl Default for DirectTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportFactory for DirectTransport {
    fn interface_type(&self) -> &str {
        Self::INTERFACE_TYPE
    }

    fn create_inport_provider(&self) -> Result<Arc<dyn InPortProvider>> {
        let endpoint = Uuid::new_v4().to_string();
        let provider = Arc::new(DirectInPortProvider {
            endpoint: endpoint.clone(),
            table: Arc::downgrade(&self.endpoints),
            buffer: RwLock::new(None),
            listener: RwLock::new(None),
            closed: AtomicBool::new(false),
        });
        self.endpoints
            .insert(endpoint, Endpoint::InPort(Arc::downgrade(&provider)));
        Ok(provider)
    }

    fn create_inport_consumer(&self) -> Result<Arc<dyn InPortConsumer>> {
        Ok(Arc::new(DirectInPortConsumer {
            table: Arc::clone(&self.endpoints),
            target: RwLock::new(None),
        }))
    }

    fn create_outport_provider(&self) -> Result<Arc<dyn OutPortProvider>> {
        let endpoint = Uuid::new_v4().to_string();
        let provider = Arc::new(DirectOutPortProvider {
            endpoint: endpoint.clone(),
            table: Arc::downgrade(&self.endpoints),
            buffer: RwLock::new(None),
            listener: RwLock::new(None),
            closed: AtomicBool::new(false),
        });
        self.endpoints
            .insert(endpoint, Endpoint::OutPort(Arc::downgrade(&provider)));
        Ok(provider)
    }

    fn create_outport_consumer(&self) -> Result<Arc<dyn OutPortConsumer>> {
        Ok(Arc::new(DirectOutPortConsumer {
            table: Arc::clone(&self.endpoints),
            target: RwLock::new(None),
            listener: RwLock::new(None),
        }))
    }
}

fn endpoint_id(props: &Properties) -> Result<String> {
    props.get_str(keys::DIRECT_ENDPOINT).ok_or_else(|| {
        Error::NegotiationFailed(format!("{} not published", keys::DIRECT_ENDPOINT))
    })
}

fn unregister(table: &Weak<EndpointTable>, endpoint: &str) {
    if let Some(table) = table.upgrade() {
        table.remove(endpoint);
    }
}

// ============================================================================
// Push
// ============================================================================

/// InPort side of a direct push link.
pub struct DirectInPortProvider {
    endpoint: String,
    table: Weak<EndpointTable>,
    buffer: RwLock<Option<Arc<CdrBuffer>>>,
    listener: ListenerSlot,
    closed: AtomicBool,
}

impl InPortProvider for DirectInPortProvider {
    fn set_buffer(&self, buffer: Arc<CdrBuffer>) {
        *self.buffer.write() = Some(buffer);
    }

    fn set_listener(&self, info: &ConnectorInfo, listeners: Arc<ConnectorListeners>) {
        *self.listener.write() = Some((info.clone(), listeners));
    }

    fn publish_interface(&self, props: &Properties) -> Result<()> {
        props.set(keys::DIRECT_ENDPOINT, &self.endpoint);
        Ok(())
    }

    fn put(&self, data: ByteData) -> DataPortStatus {
        if self.closed.load(Ordering::Acquire) {
            return DataPortStatus::ConnectionLost;
        }
        let buffer = self.buffer.read().clone();
        let listener = self.listener.read().clone();
        match (buffer, listener) {
            (Some(buffer), Some((info, listeners))) => deliver(&*buffer, &listeners, &info, data),
            (_, listener) => {
                if let Some((info, listeners)) = listener {
                    listeners.notify_data(ConnectorDataListenerType::OnReceiverError, &info, &data);
                }
                log::warn!("[connector] direct provider {} has no buffer", self.endpoint);
                DataPortStatus::PortError
            }
        }
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        unregister(&self.table, &self.endpoint);
        *self.buffer.write() = None;
        *self.listener.write() = None;
        log::debug!("[connector] direct InPort endpoint {} closed", self.endpoint);
    }
}

impl Drop for DirectInPortProvider {
    fn drop(&mut self) {
        unregister(&self.table, &self.endpoint);
    }
}

/// OutPort side of a direct push link.
pub struct DirectInPortConsumer {
    table: Arc<EndpointTable>,
    target: RwLock<Option<Weak<DirectInPortProvider>>>,
}

impl InPortConsumer for DirectInPortConsumer {
    fn subscribe_interface(&self, props: &Properties) -> Result<()> {
        let id = endpoint_id(props)?;
        let target = match self.table.get(&id).as_deref() {
            Some(Endpoint::InPort(w)) => w.clone(),
            Some(Endpoint::OutPort(_)) => {
                return Err(Error::NegotiationFailed(format!(
                    "endpoint {} is not an InPort provider",
                    id
                )))
            }
            None => return Err(Error::NegotiationFailed(format!("unknown endpoint {}", id))),
        };
        *self.target.write() = Some(target);
        Ok(())
    }

    fn unsubscribe_interface(&self, _props: &Properties) {
        *self.target.write() = None;
    }

    fn put(&self, data: ByteData) -> DataPortStatus {
        let target = self.target.read().clone();
        match target {
            Some(weak) => match weak.upgrade() {
                Some(provider) => provider.put(data),
                None => DataPortStatus::ConnectionLost,
            },
            None => DataPortStatus::PreconditionNotMet,
        }
    }
}

// ============================================================================
// Pull
// ============================================================================

/// OutPort side of a direct pull link.
pub struct DirectOutPortProvider {
    endpoint: String,
    table: Weak<EndpointTable>,
    buffer: RwLock<Option<Arc<CdrBuffer>>>,
    listener: ListenerSlot,
    closed: AtomicBool,
}

impl OutPortProvider for DirectOutPortProvider {
    fn set_buffer(&self, buffer: Arc<CdrBuffer>) {
        *self.buffer.write() = Some(buffer);
    }

    fn set_listener(&self, info: &ConnectorInfo, listeners: Arc<ConnectorListeners>) {
        *self.listener.write() = Some((info.clone(), listeners));
    }

    fn publish_interface(&self, props: &Properties) -> Result<()> {
        props.set(keys::DIRECT_ENDPOINT, &self.endpoint);
        Ok(())
    }

    fn get(&self) -> std::result::Result<ByteData, DataPortStatus> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DataPortStatus::ConnectionLost);
        }
        let buffer = self.buffer.read().clone();
        let listener = self.listener.read().clone();
        match (buffer, listener) {
            (Some(buffer), Some((info, listeners))) => serve(&*buffer, &listeners, &info),
            _ => {
                log::warn!("[connector] direct provider {} has no buffer", self.endpoint);
                Err(DataPortStatus::PortError)
            }
        }
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        unregister(&self.table, &self.endpoint);
        *self.buffer.write() = None;
        *self.listener.write() = None;
        log::debug!("[connector] direct OutPort endpoint {} closed", self.endpoint);
    }
}

impl Drop for DirectOutPortProvider {
    fn drop(&mut self) {
        unregister(&self.table, &self.endpoint);
    }
}

/// InPort side of a direct pull link.
pub struct DirectOutPortConsumer {
    table: Arc<EndpointTable>,
    target: RwLock<Option<Weak<DirectOutPortProvider>>>,
    listener: ListenerSlot,
}

impl OutPortConsumer for DirectOutPortConsumer {
    fn set_listener(&self, info: &ConnectorInfo, listeners: Arc<ConnectorListeners>) {
        *self.listener.write() = Some((info.clone(), listeners));
    }

    fn subscribe_interface(&self, props: &Properties) -> Result<()> {
        let id = endpoint_id(props)?;
        let target = match self.table.get(&id).as_deref() {
            Some(Endpoint::OutPort(w)) => w.clone(),
            Some(Endpoint::InPort(_)) => {
                return Err(Error::NegotiationFailed(format!(
                    "endpoint {} is not an OutPort provider",
                    id
                )))
            }
            None => return Err(Error::NegotiationFailed(format!("unknown endpoint {}", id))),
        };
        *self.target.write() = Some(target);
        Ok(())
    }

    fn unsubscribe_interface(&self, _props: &Properties) {
        *self.target.write() = None;
    }

    fn get(&self) -> std::result::Result<ByteData, DataPortStatus> {
        let target = self.target.read().clone();
        let provider = match target {
            Some(weak) => weak.upgrade().ok_or(DataPortStatus::ConnectionLost)?,
            None => return Err(DataPortStatus::PreconditionNotMet),
        };
        let data = provider.get()?;
        if let Some((info, listeners)) = self.listener.read().as_ref() {
            listeners.notify_data(ConnectorDataListenerType::OnReceived, info, &data);
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{Buffer, RingBuffer};

    fn info() -> ConnectorInfo {
        ConnectorInfo::new("direct", "id", vec![], &Properties::new())
    }

    #[test]
    fn test_push_roundtrip_and_loss() {
        let transport = DirectTransport::new();
        let provider = transport.create_inport_provider().expect("provider");
        let buffer: Arc<CdrBuffer> = Arc::new(RingBuffer::<ByteData>::new(4));
        provider.set_buffer(Arc::clone(&buffer));
        provider.set_listener(&info(), Arc::new(ConnectorListeners::new()));

        let props = Properties::new();
        provider.publish_interface(&props).expect("publish");
        assert_eq!(transport.endpoint_count(), 1);

        let consumer = transport.create_inport_consumer().expect("consumer");
        consumer.subscribe_interface(&props).expect("subscribe");

        let data = ByteData::from(vec![1u8, 2, 3]);
        assert_eq!(consumer.put(data.clone()), DataPortStatus::PortOk);
        assert_eq!(buffer.read(), Ok(data));

        provider.close();
        assert_eq!(transport.endpoint_count(), 0);
        assert_eq!(
            consumer.put(ByteData::from(vec![4u8])),
            DataPortStatus::ConnectionLost
        );
    }

    #[test]
    fn test_dropped_provider_is_connection_lost() {
        let transport = DirectTransport::new();
        let provider = transport.create_inport_provider().expect("provider");
        let props = Properties::new();
        provider.publish_interface(&props).expect("publish");

        let consumer = transport.create_inport_consumer().expect("consumer");
        consumer.subscribe_interface(&props).expect("subscribe");
        drop(provider);

        assert_eq!(transport.endpoint_count(), 0);
        assert_eq!(consumer.put(ByteData::default()), DataPortStatus::ConnectionLost);
    }

    #[test]
    fn test_subscribe_rejects_wrong_kind() {
        let transport = DirectTransport::new();
        let provider = transport.create_outport_provider().expect("provider");
        let props = Properties::new();
        provider.publish_interface(&props).expect("publish");

        let consumer = transport.create_inport_consumer().expect("consumer");
        assert!(matches!(
            consumer.subscribe_interface(&props),
            Err(Error::NegotiationFailed(_))
        ));
        assert!(matches!(
            consumer.subscribe_interface(&Properties::new()),
            Err(Error::NegotiationFailed(_))
        ));
    }

    #[test]
    fn test_pull_get() {
        let transport = DirectTransport::new();
        let provider = transport.create_outport_provider().expect("provider");
        let buffer: Arc<CdrBuffer> = Arc::new(RingBuffer::<ByteData>::new(4));
        provider.set_buffer(Arc::clone(&buffer));
        provider.set_listener(&info(), Arc::new(ConnectorListeners::new()));
        let props = Properties::new();
        provider.publish_interface(&props).expect("publish");

        let consumer = transport.create_outport_consumer().expect("consumer");
        consumer.subscribe_interface(&props).expect("subscribe");

        assert_eq!(consumer.get(), Err(DataPortStatus::BufferEmpty));
        buffer.write(ByteData::from(vec![9u8]), None);
        assert_eq!(consumer.get(), Ok(ByteData::from(vec![9u8])));
    }
}
