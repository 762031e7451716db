// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed data ports and connection setup.
//!
//! An [`OutPort<T>`] fans every written value out to its connectors; an
//! [`InPort<T>`] reads from whichever of its connectors has data. Both sides
//! of a link are created together by [`connect`], which negotiates the
//! transport through the [`FactoryRegistry`].
//!
//! Connection properties and their defaults:
//!
//! | Key | Default | Values |
//! |-----|---------|--------|
//! | `dataport.interface_type` | `direct` | any registered transport |
//! | `dataport.dataflow_type` | `push` | `push`, `pull` |
//! | `dataport.subscription_type` | `flush` | any registered publisher (push only) |
//! | `dataport.connector_name` | `<out>_<in>` | free text |
//!
//! `buffer.*` and `dataport.publisher.*` keys are passed through to the
//! buffers and publisher of the new connection.

use crate::config::{keys, Properties};
use crate::connector::{
    ConnectorBase, ConnectorInfo, ConnectorListenerType, ConnectorListeners, InPortConnector,
    InPortPullConnector, InPortPushConnector, OutPortConnector, OutPortPullConnector,
    OutPortPushConnector,
};
use crate::error::{Error, Result};
use crate::registry::FactoryRegistry;
use crate::ser::DataCodec;
use crate::status::DataPortStatus;
use crate::transport::TransportFactory;
use parking_lot::RwLock;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Shared connector list
// ============================================================================

/// Connector list plus listener table of one port.
struct PortCore<C: ?Sized> {
    name: String,
    connectors: RwLock<Vec<Arc<C>>>,
    listeners: Arc<ConnectorListeners>,
}

impl<C> PortCore<C>
where
    C: ?Sized + crate::connector::ConnectorBase,
{
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            connectors: RwLock::new(Vec::new()),
            listeners: Arc::new(ConnectorListeners::new()),
        }
    }

    /// Snapshot so that transfers never run under the list lock.
    fn snapshot(&self) -> Vec<Arc<C>> {
        self.connectors.read().clone()
    }

    fn attach(&self, connector: Arc<C>) {
        self.listeners
            .notify(ConnectorListenerType::OnConnect, connector.profile());
        self.connectors.write().push(connector);
    }

    fn disconnect(&self, id: &str) -> Result<()> {
        let removed = {
            let mut list = self.connectors.write();
            let pos = list
                .iter()
                .position(|c| c.id() == id)
                .ok_or_else(|| Error::ConnectorNotFound(id.to_string()))?;
            list.remove(pos)
        };
        removed.disconnect();
        log::debug!("[port] {} disconnected {}", self.name, id);
        Ok(())
    }

    fn disconnect_all(&self) {
        let drained: Vec<_> = self.connectors.write().drain(..).collect();
        for c in drained {
            c.disconnect();
        }
    }

    fn profiles(&self) -> Vec<ConnectorInfo> {
        self.connectors
            .read()
            .iter()
            .map(|c| c.profile().clone())
            .collect()
    }

    fn set_active(&self, active: bool) {
        for c in self.connectors.read().iter() {
            if active {
                c.activate();
            } else {
                c.deactivate();
            }
        }
    }
}

// ============================================================================
// OutPort
// ============================================================================

/// Typed sending port.
pub struct OutPort<T: DataCodec> {
    core: PortCore<dyn OutPortConnector>,
    _marker: PhantomData<fn(&T)>,
}

impl<T: DataCodec> OutPort<T> {
    pub fn new(name: &str) -> Self {
        Self {
            core: PortCore::new(name),
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Encode once and hand the bytes to every connector.
    ///
    /// Returns `PORT_OK` when there are no connectors, otherwise the most
    /// severe status reported by any connector.
    pub fn write(&self, value: &T) -> DataPortStatus {
        let data = value.to_bytes();
        let mut worst = DataPortStatus::PortOk;
        for connector in self.core.snapshot() {
            let status = connector.write(data.clone());
            if !status.is_ok() {
                log::trace!(
                    "[port] {} write on {} returned {}",
                    self.core.name,
                    connector.name(),
                    status.as_str()
                );
            }
            if status.severity() > worst.severity() {
                worst = status;
            }
        }
        worst
    }

    /// Listener table shared by every connector of this port.
    pub fn listeners(&self) -> &Arc<ConnectorListeners> {
        &self.core.listeners
    }

    pub fn connectors(&self) -> Vec<ConnectorInfo> {
        self.core.profiles()
    }

    pub fn disconnect(&self, id: &str) -> Result<()> {
        self.core.disconnect(id)
    }

    pub fn disconnect_all(&self) {
        self.core.disconnect_all();
    }

    pub fn activate_interfaces(&self) {
        self.core.set_active(true);
    }

    pub fn deactivate_interfaces(&self) {
        self.core.set_active(false);
    }
}

impl<T: DataCodec> Drop for OutPort<T> {
    fn drop(&mut self) {
        self.core.disconnect_all();
    }
}

// ============================================================================
// InPort
// ============================================================================

/// Typed receiving port.
pub struct InPort<T: DataCodec> {
    core: PortCore<dyn InPortConnector>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DataCodec> InPort<T> {
    pub fn new(name: &str) -> Self {
        Self {
            core: PortCore::new(name),
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Read one value.
    ///
    /// A connector holding unread data is preferred; otherwise connectors
    /// are tried in connection order, which lets pull links fetch and
    /// `readback` buffers answer.
    pub fn read(&self) -> std::result::Result<T, DataPortStatus> {
        let connectors = self.core.snapshot();
        if connectors.is_empty() {
            return Err(DataPortStatus::PreconditionNotMet);
        }

        if let Some(fresh) = connectors.iter().find(|c| c.is_new()) {
            return self.decode(fresh.read()?);
        }

        let mut worst = DataPortStatus::BufferEmpty;
        for connector in &connectors {
            match connector.read() {
                Ok(data) => return self.decode(data),
                Err(status) if status.severity() > worst.severity() => worst = status,
                Err(_) => {}
            }
        }
        Err(worst)
    }

    fn decode(&self, data: crate::ser::ByteData) -> std::result::Result<T, DataPortStatus> {
        T::from_bytes(&data).map_err(|e| {
            log::warn!("[port] {} dropped undecodable sample: {}", self.core.name, e);
            DataPortStatus::PortError
        })
    }

    /// `true` if any connector holds unread data.
    pub fn is_new(&self) -> bool {
        self.core.connectors.read().iter().any(|c| c.is_new())
    }

    pub fn listeners(&self) -> &Arc<ConnectorListeners> {
        &self.core.listeners
    }

    pub fn connectors(&self) -> Vec<ConnectorInfo> {
        self.core.profiles()
    }

    pub fn disconnect(&self, id: &str) -> Result<()> {
        self.core.disconnect(id)
    }

    pub fn disconnect_all(&self) {
        self.core.disconnect_all();
    }

    pub fn activate_interfaces(&self) {
        self.core.set_active(true);
    }

    pub fn deactivate_interfaces(&self) {
        self.core.set_active(false);
    }
}

impl<T: DataCodec> Drop for InPort<T> {
    fn drop(&mut self) {
        self.core.disconnect_all();
    }
}

// ============================================================================
// Connection setup
// ============================================================================

/// Create both halves of a link between `out` and `inp`.
///
/// Every type named in `props` is checked against `registry` before any
/// transport object is created. If the second half fails to build, the
/// first one is disconnected again and the error is returned.
pub fn connect<T: DataCodec>(
    out: &OutPort<T>,
    inp: &InPort<T>,
    props: Properties,
    registry: &FactoryRegistry,
) -> Result<ConnectorInfo> {
    let props = props.snapshot();
    props.set_default(keys::INTERFACE_TYPE, keys::DIRECT);
    props.set_default(keys::DATAFLOW_TYPE, keys::PUSH);
    props.set_default(keys::SUBSCRIPTION_TYPE, keys::FLUSH);

    let interface = props
        .get_normalized(keys::INTERFACE_TYPE)
        .unwrap_or_else(|| keys::DIRECT.to_string());
    let transport = registry.transport(&interface)?;

    let dataflow = props
        .get_normalized(keys::DATAFLOW_TYPE)
        .unwrap_or_else(|| keys::PUSH.to_string());
    let push = match dataflow.as_str() {
        keys::PUSH => true,
        keys::PULL => false,
        other => return Err(Error::Unsupported(format!("dataflow_type '{}'", other))),
    };
    if push {
        let subscription = props
            .get_normalized(keys::SUBSCRIPTION_TYPE)
            .unwrap_or_else(|| keys::FLUSH.to_string());
        if !registry.has_publisher(&subscription) {
            return Err(Error::Unsupported(format!(
                "subscription_type '{}'",
                subscription
            )));
        }
    }

    let link = Link {
        name: props
            .get_str(keys::CONNECTOR_NAME)
            .unwrap_or_else(|| format!("{}_{}", out.name(), inp.name())),
        id: Uuid::new_v4().to_string(),
        ports: vec![out.name().to_string(), inp.name().to_string()],
        props,
        transport,
    };

    let info = if push {
        connect_push(out, inp, link, registry)?
    } else {
        connect_pull(out, inp, link, registry)?
    };
    log::debug!(
        "[port] connected {} -> {} as {} ({}, {})",
        out.name(),
        inp.name(),
        info.name,
        interface,
        dataflow
    );
    Ok(info)
}

/// Disconnect connection `id` on both ports.
///
/// Succeeds if at least one side knew the id.
pub fn disconnect<T: DataCodec>(out: &OutPort<T>, inp: &InPort<T>, id: &str) -> Result<()> {
    let out_result = out.disconnect(id);
    let in_result = inp.disconnect(id);
    match (out_result, in_result) {
        (Err(e), Err(_)) => Err(e),
        _ => Ok(()),
    }
}

struct Link {
    name: String,
    id: String,
    ports: Vec<String>,
    props: Properties,
    transport: Arc<dyn TransportFactory>,
}

impl Link {
    fn info(&self) -> ConnectorInfo {
        ConnectorInfo::new(&self.name, &self.id, self.ports.clone(), &self.props)
    }
}

/// Provider on the InPort side, consumer on the OutPort side.
fn connect_push<T: DataCodec>(
    out: &OutPort<T>,
    inp: &InPort<T>,
    link: Link,
    registry: &FactoryRegistry,
) -> Result<ConnectorInfo> {
    let provider = link.transport.create_inport_provider()?;
    provider.init(&link.props)?;
    provider.publish_interface(&link.props)?;

    let info = link.info();
    let in_conn = InPortPushConnector::new(
        info.clone(),
        provider,
        Arc::clone(inp.listeners()),
        registry,
    )?;

    let out_conn = match build_push_sender(&info, &link, out, registry) {
        Ok(conn) => conn,
        Err(e) => {
            log::warn!("[port] push connect {} failed: {}", info.name, e);
            in_conn.disconnect();
            return Err(e);
        }
    };

    inp.core.attach(Arc::new(in_conn));
    out.core.attach(Arc::new(out_conn));
    Ok(info)
}

fn build_push_sender<T: DataCodec>(
    info: &ConnectorInfo,
    link: &Link,
    out: &OutPort<T>,
    registry: &FactoryRegistry,
) -> Result<OutPortPushConnector> {
    let consumer = link.transport.create_inport_consumer()?;
    consumer.init(&link.props)?;
    consumer.subscribe_interface(&info.properties)?;
    OutPortPushConnector::new(info.clone(), consumer, Arc::clone(out.listeners()), registry)
}

/// Provider on the OutPort side, consumer on the InPort side.
fn connect_pull<T: DataCodec>(
    out: &OutPort<T>,
    inp: &InPort<T>,
    link: Link,
    registry: &FactoryRegistry,
) -> Result<ConnectorInfo> {
    let provider = link.transport.create_outport_provider()?;
    provider.init(&link.props)?;
    provider.publish_interface(&link.props)?;

    let info = link.info();
    let out_conn = OutPortPullConnector::new(
        info.clone(),
        provider,
        Arc::clone(out.listeners()),
        registry,
    )?;

    let in_conn = match build_pull_receiver(&info, &link, inp, registry) {
        Ok(conn) => conn,
        Err(e) => {
            log::warn!("[port] pull connect {} failed: {}", info.name, e);
            out_conn.disconnect();
            return Err(e);
        }
    };

    out.core.attach(Arc::new(out_conn));
    inp.core.attach(Arc::new(in_conn));
    Ok(info)
}

fn build_pull_receiver<T: DataCodec>(
    info: &ConnectorInfo,
    link: &Link,
    inp: &InPort<T>,
    registry: &FactoryRegistry,
) -> Result<InPortPullConnector> {
    let consumer = link.transport.create_outport_consumer()?;
    consumer.init(&link.props)?;
    consumer.subscribe_interface(&info.properties)?;
    InPortPullConnector::new(info.clone(), consumer, Arc::clone(inp.listeners()), registry)
}
