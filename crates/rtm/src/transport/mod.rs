// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport binding contract.
//!
//! Connectors depend only on the four traits below, never on a concrete
//! transport. A transport registers one [`TransportFactory`] per interface
//! type in the [`crate::FactoryRegistry`].
//!
//! | Trait | Lives on | Role |
//! |-------|----------|------|
//! | [`InPortProvider`] | InPort, push | receives `put` and fills the InPort buffer |
//! | [`InPortConsumer`] | OutPort, push | calls the remote provider's `put` |
//! | [`OutPortProvider`] | OutPort, pull | serves `get` from the OutPort buffer |
//! | [`OutPortConsumer`] | InPort, pull | calls the remote provider's `get` |
//!
//! Negotiation: the provider side writes whatever the consumer needs to
//! reach it into the connection properties (`publish_interface`), then the
//! consumer side reads it back (`subscribe_interface`).

mod direct;

pub use direct::{
    DirectInPortConsumer, DirectInPortProvider, DirectOutPortConsumer, DirectOutPortProvider,
    DirectTransport,
};

use crate::buffer::CdrBuffer;
use crate::config::Properties;
use crate::connector::{self, ConnectorDataListenerType, ConnectorInfo, ConnectorListeners};
use crate::error::Result;
use crate::ser::ByteData;
use crate::status::{BufferStatus, DataPortStatus};
use std::sync::Arc;

/// Receiving end of a push link.
pub trait InPortProvider: Send + Sync {
    fn init(&self, _props: &Properties) -> Result<()> {
        Ok(())
    }

    fn set_buffer(&self, buffer: Arc<CdrBuffer>);

    fn set_listener(&self, info: &ConnectorInfo, listeners: Arc<ConnectorListeners>);

    /// Advertise how to reach this provider.
    fn publish_interface(&self, props: &Properties) -> Result<()>;

    /// Deliver one record into the InPort buffer.
    fn put(&self, data: ByteData) -> DataPortStatus;

    /// Stop accepting data and drop buffer / listener references.
    fn close(&self);
}

/// Sending end of a push link.
pub trait InPortConsumer: Send + Sync {
    fn init(&self, _props: &Properties) -> Result<()> {
        Ok(())
    }

    /// Bind to the provider advertised in `props`.
    fn subscribe_interface(&self, props: &Properties) -> Result<()>;

    fn unsubscribe_interface(&self, props: &Properties);

    /// Push one record. Remote buffer outcomes come back as `BufferFull` /
    /// `BufferTimeout`; an unreachable remote as `ConnectionLost`.
    fn put(&self, data: ByteData) -> DataPortStatus;
}

/// Serving end of a pull link.
pub trait OutPortProvider: Send + Sync {
    fn init(&self, _props: &Properties) -> Result<()> {
        Ok(())
    }

    fn set_buffer(&self, buffer: Arc<CdrBuffer>);

    fn set_listener(&self, info: &ConnectorInfo, listeners: Arc<ConnectorListeners>);

    fn publish_interface(&self, props: &Properties) -> Result<()>;

    /// Hand out the oldest record of the OutPort buffer.
    fn get(&self) -> std::result::Result<ByteData, DataPortStatus>;

    fn close(&self);
}

/// Fetching end of a pull link.
pub trait OutPortConsumer: Send + Sync {
    fn init(&self, _props: &Properties) -> Result<()> {
        Ok(())
    }

    fn set_buffer(&self, _buffer: Arc<CdrBuffer>) {}

    fn set_listener(&self, _info: &ConnectorInfo, _listeners: Arc<ConnectorListeners>) {}

    fn subscribe_interface(&self, props: &Properties) -> Result<()>;

    fn unsubscribe_interface(&self, props: &Properties);

    /// Fetch one record from the remote OutPort.
    fn get(&self) -> std::result::Result<ByteData, DataPortStatus>;
}

/// Creates the four transport objects of one interface type.
pub trait TransportFactory: Send + Sync {
    /// Value matched against `dataport.interface_type`.
    fn interface_type(&self) -> &str;

    fn create_inport_provider(&self) -> Result<Arc<dyn InPortProvider>>;
    fn create_inport_consumer(&self) -> Result<Arc<dyn InPortConsumer>>;
    fn create_outport_provider(&self) -> Result<Arc<dyn OutPortProvider>>;
    fn create_outport_consumer(&self) -> Result<Arc<dyn OutPortConsumer>>;
}

/// Provider-side `put` body: write into the InPort buffer and map the
/// outcome to the status returned to the remote sender.
///
/// Available to any provider implementation so listener semantics stay
/// identical across transports.
pub fn deliver(
    buffer: &CdrBuffer,
    listeners: &ConnectorListeners,
    info: &ConnectorInfo,
    data: ByteData,
) -> DataPortStatus {
    listeners.notify_data(ConnectorDataListenerType::OnReceived, info, &data);
    match connector::write_buffer(buffer, listeners, info, data.clone(), None) {
        BufferStatus::Ok => DataPortStatus::PortOk,
        BufferStatus::Full => {
            listeners.notify_data(ConnectorDataListenerType::OnReceiverFull, info, &data);
            DataPortStatus::BufferFull
        }
        BufferStatus::Timeout => {
            listeners.notify_data(ConnectorDataListenerType::OnReceiverTimeout, info, &data);
            DataPortStatus::BufferTimeout
        }
        BufferStatus::BufferError | BufferStatus::PreconditionNotMet => {
            listeners.notify_data(ConnectorDataListenerType::OnReceiverError, info, &data);
            DataPortStatus::PortError
        }
        BufferStatus::Empty | BufferStatus::NotSupported => {
            listeners.notify_data(ConnectorDataListenerType::OnReceiverError, info, &data);
            DataPortStatus::UnknownError
        }
    }
}

/// Provider-side `get` body for pull links.
pub fn serve(
    buffer: &CdrBuffer,
    listeners: &ConnectorListeners,
    info: &ConnectorInfo,
) -> std::result::Result<ByteData, DataPortStatus> {
    let data = connector::read_buffer(buffer, listeners, info)?;
    listeners.notify_data(ConnectorDataListenerType::OnSend, info, &data);
    Ok(data)
}
