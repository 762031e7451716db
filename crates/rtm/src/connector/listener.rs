// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connector listeners.
//!
//! Two families of callbacks, both keyed by event type:
//!
//! - [`ConnectorDataListener`]: events that carry the record in flight
//!   (buffer write/read, send, receive, receiver-side failures).
//! - [`ConnectorListener`]: events without data (buffer empty, sender
//!   error, connect / disconnect).
//!
//! # Thread Safety
//!
//! Listeners run on whichever thread produced the event: the writer, a
//! publisher worker, or the reader. They must be `Send + Sync` and should
//! return quickly.

use super::ConnectorInfo;
use crate::ser::ByteData;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Data-carrying connector events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorDataListenerType {
    OnBufferWrite,
    OnBufferFull,
    OnBufferWriteTimeout,
    OnBufferOverwrite,
    OnBufferRead,
    OnSend,
    OnReceived,
    OnReceiverFull,
    OnReceiverTimeout,
    OnReceiverError,
}

impl ConnectorDataListenerType {
    pub const COUNT: usize = 10;

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnBufferWrite => "ON_BUFFER_WRITE",
            Self::OnBufferFull => "ON_BUFFER_FULL",
            Self::OnBufferWriteTimeout => "ON_BUFFER_WRITE_TIMEOUT",
            Self::OnBufferOverwrite => "ON_BUFFER_OVERWRITE",
            Self::OnBufferRead => "ON_BUFFER_READ",
            Self::OnSend => "ON_SEND",
            Self::OnReceived => "ON_RECEIVED",
            Self::OnReceiverFull => "ON_RECEIVER_FULL",
            Self::OnReceiverTimeout => "ON_RECEIVER_TIMEOUT",
            Self::OnReceiverError => "ON_RECEIVER_ERROR",
        }
    }
}

/// Connector events without data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectorListenerType {
    OnBufferEmpty,
    OnSenderError,
    OnConnect,
    OnDisconnect,
}

impl ConnectorListenerType {
    pub const COUNT: usize = 4;

    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnBufferEmpty => "ON_BUFFER_EMPTY",
            Self::OnSenderError => "ON_SENDER_ERROR",
            Self::OnConnect => "ON_CONNECT",
            Self::OnDisconnect => "ON_DISCONNECT",
        }
    }
}

/// Callback for data-carrying events.
pub trait ConnectorDataListener: Send + Sync {
    fn on_data(&self, kind: ConnectorDataListenerType, info: &ConnectorInfo, data: &ByteData);
}

impl<F> ConnectorDataListener for F
where
    F: Fn(ConnectorDataListenerType, &ConnectorInfo, &ByteData) + Send + Sync,
{
    fn on_data(&self, kind: ConnectorDataListenerType, info: &ConnectorInfo, data: &ByteData) {
        self(kind, info, data)
    }
}

/// Callback for events without data.
pub trait ConnectorListener: Send + Sync {
    fn on_event(&self, kind: ConnectorListenerType, info: &ConnectorInfo);
}

impl<F> ConnectorListener for F
where
    F: Fn(ConnectorListenerType, &ConnectorInfo) + Send + Sync,
{
    fn on_event(&self, kind: ConnectorListenerType, info: &ConnectorInfo) {
        self(kind, info)
    }
}

/// Handle returned by `add_*`, used to remove a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Slot<L> = RwLock<Vec<(ListenerId, Arc<L>)>>;

/// Per-port listener table shared by all of the port's connectors.
pub struct ConnectorListeners {
    data: Vec<Slot<dyn ConnectorDataListener>>,
    events: Vec<Slot<dyn ConnectorListener>>,
    next_id: AtomicU64,
}

impl ConnectorListeners {
    pub fn new() -> Self {
        Self {
            data: (0..ConnectorDataListenerType::COUNT)
                .map(|_| RwLock::new(Vec::new()))
                .collect(),
            events: (0..ConnectorListenerType::COUNT)
                .map(|_| RwLock::new(Vec::new()))
                .collect(),
            next_id: AtomicU64::new(1),
        }
    }

    fn alloc_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn add_data_listener(
        &self,
        kind: ConnectorDataListenerType,
        listener: Arc<dyn ConnectorDataListener>,
    ) -> ListenerId {
        let id = self.alloc_id();
        self.data[kind.index()].write().push((id, listener));
        id
    }

    pub fn add_listener(
        &self,
        kind: ConnectorListenerType,
        listener: Arc<dyn ConnectorListener>,
    ) -> ListenerId {
        let id = self.alloc_id();
        self.events[kind.index()].write().push((id, listener));
        id
    }

    /// Remove a listener of either family. Returns `true` if found.
    pub fn remove(&self, id: ListenerId) -> bool {
        for slot in &self.data {
            let mut list = slot.write();
            if let Some(pos) = list.iter().position(|(lid, _)| *lid == id) {
                list.remove(pos);
                return true;
            }
        }
        for slot in &self.events {
            let mut list = slot.write();
            if let Some(pos) = list.iter().position(|(lid, _)| *lid == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Listeners run on a snapshot taken outside the lock, so they may add
    /// or remove listeners themselves.
    pub fn notify_data(&self, kind: ConnectorDataListenerType, info: &ConnectorInfo, data: &ByteData) {
        let list = snapshot(&self.data[kind.index()]);
        if list.is_empty() {
            return;
        }
        log::trace!("[connector] {} on {}", kind.as_str(), info.name);
        for l in list {
            l.on_data(kind, info, data);
        }
    }

    pub fn notify(&self, kind: ConnectorListenerType, info: &ConnectorInfo) {
        let list = snapshot(&self.events[kind.index()]);
        if list.is_empty() {
            return;
        }
        log::trace!("[connector] {} on {}", kind.as_str(), info.name);
        for l in list {
            l.on_event(kind, info);
        }
    }
}

fn snapshot<L: ?Sized>(slot: &Slot<L>) -> Vec<Arc<L>> {
    slot.read().iter().map(|(_, l)| Arc::clone(l)).collect()
}

impl Default for ConnectorListeners {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectorListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data: usize = self.data.iter().map(|s| s.read().len()).sum();
        let events: usize = self.events.iter().map(|s| s.read().len()).sum();
        f.debug_struct("ConnectorListeners")
            .field("data_listeners", &data)
            .field("event_listeners", &events)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Properties;
    use std::sync::atomic::AtomicUsize;

    fn info() -> ConnectorInfo {
        ConnectorInfo::new("c0", "id-0", vec!["out".into(), "in".into()], &Properties::new())
    }

    #[test]
    fn test_dispatch_by_type() {
        let listeners = ConnectorListeners::new();
        let writes = Arc::new(AtomicUsize::new(0));
        let w = Arc::clone(&writes);
        listeners.add_data_listener(
            ConnectorDataListenerType::OnBufferWrite,
            Arc::new(move |_: ConnectorDataListenerType, _: &ConnectorInfo, _: &ByteData| {
                w.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let info = info();
        let data = ByteData::from(vec![1u8]);
        listeners.notify_data(ConnectorDataListenerType::OnBufferWrite, &info, &data);
        listeners.notify_data(ConnectorDataListenerType::OnBufferRead, &info, &data);
        assert_eq!(writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove() {
        let listeners = ConnectorListeners::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let id = listeners.add_listener(
            ConnectorListenerType::OnConnect,
            Arc::new(move |_: ConnectorListenerType, _: &ConnectorInfo| {
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let info = info();
        listeners.notify(ConnectorListenerType::OnConnect, &info);
        assert!(listeners.remove(id));
        assert!(!listeners.remove(id));
        listeners.notify(ConnectorListenerType::OnConnect, &info);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_edits_table_from_callback() {
        let listeners = Arc::new(ConnectorListeners::new());
        let hits = Arc::new(AtomicUsize::new(0));

        // One-shot: removes itself on the first event
        let own_id = Arc::new(parking_lot::Mutex::new(None));
        let table = Arc::downgrade(&listeners);
        let slot = Arc::clone(&own_id);
        let h = Arc::clone(&hits);
        let id = listeners.add_listener(
            ConnectorListenerType::OnDisconnect,
            Arc::new(move |_: ConnectorListenerType, _: &ConnectorInfo| {
                h.fetch_add(1, Ordering::SeqCst);
                if let (Some(table), Some(id)) = (table.upgrade(), *slot.lock()) {
                    assert!(table.remove(id));
                }
            }),
        );
        *own_id.lock() = Some(id);

        // Registers a second data listener from inside its callback
        let table = Arc::downgrade(&listeners);
        listeners.add_data_listener(
            ConnectorDataListenerType::OnReceived,
            Arc::new(move |_: ConnectorDataListenerType, _: &ConnectorInfo, _: &ByteData| {
                if let Some(table) = table.upgrade() {
                    table.add_data_listener(
                        ConnectorDataListenerType::OnReceived,
                        Arc::new(|_: ConnectorDataListenerType, _: &ConnectorInfo, _: &ByteData| {}),
                    );
                }
            }),
        );

        let info = info();
        listeners.notify(ConnectorListenerType::OnDisconnect, &info);
        listeners.notify(ConnectorListenerType::OnDisconnect, &info);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let data = ByteData::from(vec![3u8]);
        listeners.notify_data(ConnectorDataListenerType::OnReceived, &info, &data);
        assert_eq!(
            listeners.data[ConnectorDataListenerType::OnReceived.index()].read().len(),
            2
        );
    }
}
