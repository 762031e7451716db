// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connectors: one half of a logical OutPort -> InPort link.
//!
//! ```text
//!  OutPort                                                   InPort
//!  ┌──────────────────────┐                  ┌──────────────────────┐
//!  │ OutPortPushConnector │   push (put)     │ InPortPushConnector  │
//!  │ buffer + publisher ──┼──► consumer ───► │ provider ──► buffer  │
//!  └──────────────────────┘                  └──────────────────────┘
//!  ┌──────────────────────┐   pull (get)     ┌──────────────────────┐
//!  │ OutPortPullConnector │ ◄─── consumer ◄──┼ InPortPullConnector  │
//!  │ buffer ◄── provider  │                  │ buffer               │
//!  └──────────────────────┘                  └──────────────────────┘
//! ```
//!
//! Each connector owns exactly one buffer and one transport object. Both are
//! released by the first `disconnect()`; later calls are no-ops.
//!
//! Transfer failures come back as [`DataPortStatus`] values and are never
//! retried here.

mod inport;
mod listener;
mod outport;

pub use inport::{InPortPullConnector, InPortPushConnector};
pub use listener::{
    ConnectorDataListener, ConnectorDataListenerType, ConnectorListener, ConnectorListenerType,
    ConnectorListeners, ListenerId,
};
pub use outport::{OutPortPullConnector, OutPortPushConnector};

use crate::buffer::{CdrBuffer, WritePolicy};
use crate::config::{keys, Properties};
use crate::error::{Error, Result};
use crate::registry::FactoryRegistry;
use crate::ser::ByteData;
use crate::status::{BufferStatus, DataPortStatus};
use std::sync::Arc;
use std::time::Duration;

/// Immutable description of one connection.
///
/// Both halves of a link carry the same `id`; it is the join key used by
/// `disconnect`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorInfo {
    pub name: String,
    /// UUID v4 string
    pub id: String,
    /// Names of the participating ports, OutPort first.
    pub ports: Vec<String>,
    /// Connection properties (private copy).
    pub properties: Properties,
}

impl ConnectorInfo {
    /// `properties` is deep-copied; later edits of the caller's bag are not
    /// observed.
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        ports: Vec<String>,
        properties: &Properties,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            ports,
            properties: properties.snapshot(),
        }
    }

    /// Value of `dataport.interface_type`, lowercased.
    pub fn interface_type(&self) -> Option<String> {
        self.properties.get_normalized(keys::INTERFACE_TYPE)
    }
}

/// Operations common to every connector.
pub trait ConnectorBase: Send + Sync {
    fn profile(&self) -> &ConnectorInfo;

    fn id(&self) -> &str {
        &self.profile().id
    }

    fn name(&self) -> &str {
        &self.profile().name
    }

    /// Release buffer and transport. Idempotent.
    fn disconnect(&self) -> DataPortStatus;

    /// The owned buffer, `None` once disconnected.
    fn buffer(&self) -> Option<Arc<CdrBuffer>>;

    fn activate(&self);
    fn deactivate(&self);
    fn is_active(&self) -> bool;
}

/// OutPort half of a link.
pub trait OutPortConnector: ConnectorBase {
    fn write(&self, data: ByteData) -> DataPortStatus;
}

/// InPort half of a link.
pub trait InPortConnector: ConnectorBase {
    fn read(&self) -> std::result::Result<ByteData, DataPortStatus>;

    /// `true` if unread data is waiting locally.
    fn is_new(&self) -> bool {
        self.buffer().is_some_and(|b| !b.empty())
    }
}

/// Reject construction when the interface type has no registered transport.
pub(crate) fn validate_interface(info: &ConnectorInfo, registry: &FactoryRegistry) -> Result<()> {
    let itype = info
        .interface_type()
        .ok_or_else(|| Error::Unsupported(format!("{} not set", keys::INTERFACE_TYPE)))?;
    if !registry.has_transport(&itype) {
        return Err(Error::Unsupported(format!("interface_type '{}'", itype)));
    }
    Ok(())
}

/// Buffer write with the matching listener events.
pub(crate) fn write_buffer(
    buffer: &CdrBuffer,
    listeners: &ConnectorListeners,
    info: &ConnectorInfo,
    data: ByteData,
    timeout: Option<Duration>,
) -> BufferStatus {
    let overwriting = timeout.is_none()
        && buffer.write_policy() == WritePolicy::Overwrite
        && buffer.full();
    if overwriting {
        listeners.notify_data(ConnectorDataListenerType::OnBufferOverwrite, info, &data);
    }

    let status = buffer.write(data.clone(), timeout);
    match status {
        BufferStatus::Ok => {
            listeners.notify_data(ConnectorDataListenerType::OnBufferWrite, info, &data);
        }
        BufferStatus::Full => {
            listeners.notify_data(ConnectorDataListenerType::OnBufferFull, info, &data);
        }
        BufferStatus::Timeout => {
            listeners.notify_data(ConnectorDataListenerType::OnBufferWriteTimeout, info, &data);
        }
        _ => {}
    }
    status
}

/// Buffer read with the matching listener events.
pub(crate) fn read_buffer(
    buffer: &CdrBuffer,
    listeners: &ConnectorListeners,
    info: &ConnectorInfo,
) -> std::result::Result<ByteData, DataPortStatus> {
    match buffer.read() {
        Ok(data) => {
            listeners.notify_data(ConnectorDataListenerType::OnBufferRead, info, &data);
            Ok(data)
        }
        Err(BufferStatus::Empty) => {
            listeners.notify(ConnectorListenerType::OnBufferEmpty, info);
            Err(DataPortStatus::BufferEmpty)
        }
        Err(other) => Err(other.into()),
    }
}
