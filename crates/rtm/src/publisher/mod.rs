// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Publishers: delivery timing of an OutPort push connector.
//!
//! | Subscription | Thread | Delivery |
//! |--------------|--------|----------|
//! | `flush` | none | synchronous `put` inside `write` |
//! | `new` | `rtm-pub-new` | woken by `write`, drains per push policy |
//! | `periodic` | `rtm-pub-periodic` | one pass per tick at `push_rate` Hz |
//!
//! The buffered publishers drain the connector buffer according to
//! `dataport.publisher.push_policy`:
//!
//! - `all`: push everything, stop at the first failure
//! - `fifo`: push the oldest item
//! - `skip`: push one item, then skip `skip_count` items
//! - `new`: discard all but the newest item, push it
//!
//! An item whose push fails stays in the buffer and is retried on the next
//! pass. Once a push reports `CONNECTION_LOST` the status is latched and
//! every later `write` returns it immediately.

mod flush;
mod new;
mod periodic;

pub use flush::PublisherFlush;
pub use new::PublisherNew;
pub use periodic::PublisherPeriodic;

use crate::buffer::CdrBuffer;
use crate::config::{keys, Properties};
use crate::connector::{
    ConnectorDataListenerType, ConnectorInfo, ConnectorListenerType, ConnectorListeners,
};
use crate::ec::rate_period;
use crate::error::{Error, Result};
use crate::ser::ByteData;
use crate::status::{sender_view, DataPortStatus};
use crate::transport::InPortConsumer;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of a publisher. `Released` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublisherState {
    /// Constructed or deactivated; writes are refused.
    Created,
    Active,
    Released,
}

/// Delivery policy of an OutPort push connector.
pub trait Publisher: Send + Sync {
    /// Hand one record to the publisher (the `update` path).
    fn write(&self, data: ByteData, timeout: Option<Duration>) -> DataPortStatus;

    fn activate(&self) -> DataPortStatus;
    fn deactivate(&self) -> DataPortStatus;
    fn state(&self) -> PublisherState;

    fn is_active(&self) -> bool {
        self.state() == PublisherState::Active
    }

    /// Stop and join the worker, if any. Idempotent; the publisher cannot
    /// be reused afterwards.
    fn release(&self);
}

/// Everything a publisher needs from its connector.
#[derive(Clone)]
pub struct PublisherContext {
    pub info: ConnectorInfo,
    pub consumer: Arc<dyn InPortConsumer>,
    pub buffer: Arc<CdrBuffer>,
    pub listeners: Arc<ConnectorListeners>,
}

/// Buffer drain strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushPolicy {
    All,
    Fifo,
    Skip(usize),
    New,
}

impl PushPolicy {
    /// Read `push_policy` / `skip_count`, falling back to `default`.
    pub fn from_properties(props: &Properties, default: PushPolicy) -> Result<Self> {
        let skip = match props.get_str(keys::SKIP_COUNT) {
            Some(raw) => raw.parse::<usize>().map_err(|_| Error::InvalidProperty {
                key: keys::SKIP_COUNT.into(),
                value: raw.clone(),
            })?,
            None => 0,
        };
        match props.get_normalized(keys::PUSH_POLICY).as_deref() {
            None => Ok(default),
            Some(keys::ALL) => Ok(PushPolicy::All),
            Some(keys::FIFO) => Ok(PushPolicy::Fifo),
            Some(keys::SKIP) => Ok(PushPolicy::Skip(skip)),
            Some(keys::NEW) => Ok(PushPolicy::New),
            Some(other) => Err(Error::InvalidProperty {
                key: keys::PUSH_POLICY.into(),
                value: other.into(),
            }),
        }
    }
}

// ============================================================================
// Shared internals
// ============================================================================

const STATE_CREATED: u8 = 0;
const STATE_ACTIVE: u8 = 1;
const STATE_RELEASED: u8 = 2;

#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(STATE_CREATED))
    }

    pub(crate) fn get(&self) -> PublisherState {
        match self.0.load(Ordering::Acquire) {
            STATE_ACTIVE => PublisherState::Active,
            STATE_RELEASED => PublisherState::Released,
            _ => PublisherState::Created,
        }
    }

    fn transition(&self, from: u8, to: u8) -> DataPortStatus {
        match self.0.compare_exchange(from, to, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => DataPortStatus::PortOk,
            Err(STATE_RELEASED) => DataPortStatus::PreconditionNotMet,
            // Already in the target state
            Err(_) => DataPortStatus::PortOk,
        }
    }

    pub(crate) fn activate(&self) -> DataPortStatus {
        self.transition(STATE_CREATED, STATE_ACTIVE)
    }

    pub(crate) fn deactivate(&self) -> DataPortStatus {
        self.transition(STATE_ACTIVE, STATE_CREATED)
    }

    /// Returns `true` for the first caller only.
    pub(crate) fn release(&self) -> bool {
        self.0.swap(STATE_RELEASED, Ordering::AcqRel) != STATE_RELEASED
    }

    /// Status for `write` when the publisher does not accept data.
    pub(crate) fn refuse(&self) -> Option<DataPortStatus> {
        match self.get() {
            PublisherState::Active => None,
            _ => Some(DataPortStatus::PreconditionNotMet),
        }
    }
}

/// Consumer calls, listener events, policy drain and status latching.
pub(crate) struct Delivery {
    ctx: PublisherContext,
    policy: PushPolicy,
    /// Items still to skip under `PushPolicy::Skip`
    skip_left: AtomicUsize,
    retcode: Mutex<DataPortStatus>,
}

impl Delivery {
    pub(crate) fn new(ctx: PublisherContext, default_policy: PushPolicy) -> Result<Self> {
        let policy = PushPolicy::from_properties(&ctx.info.properties, default_policy)?;
        Ok(Self {
            ctx,
            policy,
            skip_left: AtomicUsize::new(0),
            retcode: Mutex::new(DataPortStatus::PortOk),
        })
    }

    #[inline]
    pub(crate) fn ctx(&self) -> &PublisherContext {
        &self.ctx
    }

    pub(crate) fn policy(&self) -> PushPolicy {
        self.policy
    }

    /// Last latched status.
    pub(crate) fn last_status(&self) -> DataPortStatus {
        *self.retcode.lock()
    }

    pub(crate) fn connection_lost(&self) -> bool {
        self.last_status() == DataPortStatus::ConnectionLost
    }

    pub(crate) fn latch(&self, status: DataPortStatus) {
        let mut rc = self.retcode.lock();
        if *rc != DataPortStatus::ConnectionLost {
            *rc = status;
        }
    }

    /// One `put` through the consumer, mapped to the sender's view.
    pub(crate) fn send(&self, data: &ByteData) -> DataPortStatus {
        let PublisherContext {
            info,
            consumer,
            listeners,
            ..
        } = &self.ctx;

        listeners.notify_data(ConnectorDataListenerType::OnSend, info, data);
        let status = sender_view(consumer.put(data.clone()));
        match status {
            DataPortStatus::PortOk => {}
            DataPortStatus::SendFull => {
                listeners.notify_data(ConnectorDataListenerType::OnReceiverFull, info, data);
            }
            DataPortStatus::SendTimeout => {
                listeners.notify_data(ConnectorDataListenerType::OnReceiverTimeout, info, data);
            }
            DataPortStatus::ConnectionLost => {
                listeners.notify_data(ConnectorDataListenerType::OnReceiverError, info, data);
                listeners.notify(ConnectorListenerType::OnSenderError, info);
                log::warn!("[publisher] connection lost on {}", info.name);
            }
            _ => {
                listeners.notify_data(ConnectorDataListenerType::OnReceiverError, info, data);
            }
        }
        status
    }

    /// Drain the buffer once according to the push policy and latch the
    /// outcome.
    pub(crate) fn push(&self) -> DataPortStatus {
        let status = match self.policy {
            PushPolicy::All => self.push_all(),
            PushPolicy::Fifo => self.push_fifo(),
            PushPolicy::Skip(n) => self.push_skip(n),
            PushPolicy::New => self.push_new(),
        };
        self.latch(status);
        status
    }

    /// Send the oldest item and consume it on success.
    fn push_head(&self) -> Option<DataPortStatus> {
        let data = self.ctx.buffer.peek().ok()?;
        let status = self.send(&data);
        if status.is_ok() {
            self.ctx.buffer.advance_read(1);
            self.ctx.listeners.notify_data(
                ConnectorDataListenerType::OnBufferRead,
                &self.ctx.info,
                &data,
            );
        }
        Some(status)
    }

    fn push_all(&self) -> DataPortStatus {
        while let Some(status) = self.push_head() {
            if !status.is_ok() {
                return status;
            }
        }
        DataPortStatus::PortOk
    }

    fn push_fifo(&self) -> DataPortStatus {
        self.push_head().unwrap_or(DataPortStatus::PortOk)
    }

    fn push_skip(&self, skip: usize) -> DataPortStatus {
        let readable = self.ctx.buffer.readable();
        for _ in 0..readable {
            let left = self.skip_left.load(Ordering::Relaxed);
            if left == 0 {
                match self.push_head() {
                    Some(status) if !status.is_ok() => return status,
                    Some(_) => self.skip_left.store(skip, Ordering::Relaxed),
                    None => break,
                }
            } else {
                self.ctx.buffer.advance_read(1);
                self.skip_left.store(left - 1, Ordering::Relaxed);
            }
        }
        DataPortStatus::PortOk
    }

    fn push_new(&self) -> DataPortStatus {
        let readable = self.ctx.buffer.readable();
        if readable > 1 {
            self.ctx.buffer.advance_read(readable - 1);
        }
        self.push_head().unwrap_or(DataPortStatus::PortOk)
    }
}

/// `dataport.publisher.push_rate` in Hz, 100 when unset.
pub(crate) fn push_period(props: &Properties) -> Result<Duration> {
    const DEFAULT_PUSH_RATE: f64 = 100.0;

    match props.get_str(keys::PUSH_RATE) {
        None => Ok(Duration::from_secs_f64(1.0 / DEFAULT_PUSH_RATE)),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(rate_period)
            .ok_or(Error::InvalidProperty {
                key: keys::PUSH_RATE.into(),
                value: raw,
            }),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn fill(ctx: &PublisherContext, values: impl IntoIterator<Item = u8>) {
        for v in values {
            ctx.buffer.write(byte(v), None);
        }
    }

    #[test]
    fn test_push_policy_parse() {
        let props = Properties::from_pairs([(keys::PUSH_POLICY, "SKIP"), (keys::SKIP_COUNT, "2")]);
        assert_eq!(
            PushPolicy::from_properties(&props, PushPolicy::Fifo).unwrap(),
            PushPolicy::Skip(2)
        );
        assert_eq!(
            PushPolicy::from_properties(&Properties::new(), PushPolicy::New).unwrap(),
            PushPolicy::New
        );
        let bad = Properties::from_pairs([(keys::PUSH_POLICY, "lifo")]);
        assert!(PushPolicy::from_properties(&bad, PushPolicy::Fifo).is_err());
    }

    #[test]
    fn test_push_all() {
        let consumer = RecordingConsumer::new();
        let ctx = context(&consumer, &[(keys::PUSH_POLICY, "all")]);
        fill(&ctx, 1..=4);
        let d = Delivery::new(ctx.clone(), PushPolicy::Fifo).unwrap();
        assert_eq!(d.push(), DataPortStatus::PortOk);
        assert_eq!(consumer.values(), vec![1, 2, 3, 4]);
        assert!(ctx.buffer.empty());
    }

    #[test]
    fn test_push_fifo_one_per_pass() {
        let consumer = RecordingConsumer::new();
        let ctx = context(&consumer, &[]);
        fill(&ctx, 1..=3);
        let d = Delivery::new(ctx.clone(), PushPolicy::Fifo).unwrap();
        d.push();
        d.push();
        assert_eq!(consumer.values(), vec![1, 2]);
        assert_eq!(ctx.buffer.readable(), 1);
    }

    #[test]
    fn test_push_skip() {
        let consumer = RecordingConsumer::new();
        let ctx = context(&consumer, &[(keys::PUSH_POLICY, "skip"), (keys::SKIP_COUNT, "2")]);
        fill(&ctx, 1..=7);
        let d = Delivery::new(ctx.clone(), PushPolicy::Fifo).unwrap();
        d.push();
        assert_eq!(consumer.values(), vec![1, 4, 7]);
        assert!(ctx.buffer.empty());

        // Skip state carries over between passes
        fill(&ctx, 8..=10);
        d.push();
        assert_eq!(consumer.values(), vec![1, 4, 7, 10]);
    }

    #[test]
    fn test_push_new_discards_older() {
        let consumer = RecordingConsumer::new();
        let ctx = context(&consumer, &[]);
        fill(&ctx, 1..=5);
        let d = Delivery::new(ctx.clone(), PushPolicy::New).unwrap();
        d.push();
        assert_eq!(consumer.values(), vec![5]);
        assert!(ctx.buffer.empty());
    }

    #[test]
    fn test_failed_push_keeps_item() {
        let consumer = RecordingConsumer::new();
        *consumer.reply.lock() = DataPortStatus::BufferFull;
        let ctx = context(&consumer, &[]);
        fill(&ctx, [1]);
        let d = Delivery::new(ctx.clone(), PushPolicy::Fifo).unwrap();
        assert_eq!(d.push(), DataPortStatus::SendFull);
        assert_eq!(ctx.buffer.readable(), 1);

        *consumer.reply.lock() = DataPortStatus::PortOk;
        assert_eq!(d.push(), DataPortStatus::PortOk);
        assert_eq!(consumer.values(), vec![1]);
    }

    #[test]
    fn test_connection_lost_latches() {
        let consumer = RecordingConsumer::new();
        *consumer.reply.lock() = DataPortStatus::ConnectionLost;
        let ctx = context(&consumer, &[]);
        fill(&ctx, [1]);
        let d = Delivery::new(ctx, PushPolicy::Fifo).unwrap();
        d.push();
        assert!(d.connection_lost());

        d.latch(DataPortStatus::PortOk);
        assert_eq!(d.last_status(), DataPortStatus::ConnectionLost);
    }

    #[test]
    fn test_push_period() {
        assert_eq!(push_period(&Properties::new()).unwrap(), Duration::from_millis(10));
        let p = Properties::from_pairs([(keys::PUSH_RATE, "4")]);
        assert_eq!(push_period(&p).unwrap(), Duration::from_millis(250));
        for bad in ["0", "-5", "fast", "1e-20"] {
            let p = Properties::from_pairs([(keys::PUSH_RATE, bad)]);
            assert!(push_period(&p).is_err());
        }
    }

    #[test]
    fn test_state_cell() {
        let s = StateCell::new();
        assert_eq!(s.refuse(), Some(DataPortStatus::PreconditionNotMet));
        assert_eq!(s.activate(), DataPortStatus::PortOk);
        assert_eq!(s.refuse(), None);
        assert!(s.release());
        assert!(!s.release());
        assert_eq!(s.activate(), DataPortStatus::PreconditionNotMet);
        assert_eq!(s.get(), PublisherState::Released);
    }
}
