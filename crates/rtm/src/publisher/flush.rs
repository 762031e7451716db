// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Synchronous publisher: `write` returns after the consumer's `put`.

use super::{Delivery, Publisher, PublisherContext, PublisherState, PushPolicy, StateCell};
use crate::error::Result;
use crate::ser::ByteData;
use crate::status::DataPortStatus;
use std::time::Duration;

/// Pushes every record from the writer's thread. The connector buffer is
/// bypassed.
pub struct PublisherFlush {
    delivery: Delivery,
    state: StateCell,
}

impl PublisherFlush {
    pub fn new(ctx: PublisherContext) -> Result<Self> {
        log::debug!("[publisher] flush publisher for {}", ctx.info.name);
        Ok(Self {
            delivery: Delivery::new(ctx, PushPolicy::Fifo)?,
            state: StateCell::new(),
        })
    }
}

impl Publisher for PublisherFlush {
    fn write(&self, data: ByteData, _timeout: Option<Duration>) -> DataPortStatus {
        if let Some(refused) = self.state.refuse() {
            return refused;
        }
        if self.delivery.connection_lost() {
            return DataPortStatus::ConnectionLost;
        }
        let status = self.delivery.send(&data);
        self.delivery.latch(status);
        status
    }

    fn activate(&self) -> DataPortStatus {
        self.state.activate()
    }

    fn deactivate(&self) -> DataPortStatus {
        self.state.deactivate()
    }

    fn state(&self) -> PublisherState {
        self.state.get()
    }

    fn release(&self) {
        self.state.release();
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;

    #[test]
    fn test_write_is_synchronous() {
        let consumer = RecordingConsumer::new();
        let publisher = PublisherFlush::new(context(&consumer, &[])).unwrap();
        publisher.activate();

        assert_eq!(publisher.write(byte(7), None), DataPortStatus::PortOk);
        assert_eq!(consumer.values(), vec![7]);
    }

    #[test]
    fn test_inactive_refuses() {
        let consumer = RecordingConsumer::new();
        let publisher = PublisherFlush::new(context(&consumer, &[])).unwrap();
        assert_eq!(publisher.write(byte(1), None), DataPortStatus::PreconditionNotMet);

        publisher.activate();
        publisher.release();
        assert_eq!(publisher.write(byte(1), None), DataPortStatus::PreconditionNotMet);
        assert!(consumer.values().is_empty());
    }

    #[test]
    fn test_remote_full_reported_as_send_full() {
        let consumer = RecordingConsumer::new();
        *consumer.reply.lock() = DataPortStatus::BufferFull;
        let publisher = PublisherFlush::new(context(&consumer, &[])).unwrap();
        publisher.activate();
        assert_eq!(publisher.write(byte(1), None), DataPortStatus::SendFull);
    }

    #[test]
    fn test_connection_lost_is_sticky() {
        let consumer = RecordingConsumer::new();
        *consumer.reply.lock() = DataPortStatus::ConnectionLost;
        let publisher = PublisherFlush::new(context(&consumer, &[])).unwrap();
        publisher.activate();
        assert_eq!(publisher.write(byte(1), None), DataPortStatus::ConnectionLost);

        *consumer.reply.lock() = DataPortStatus::PortOk;
        assert_eq!(publisher.write(byte(2), None), DataPortStatus::ConnectionLost);
        assert!(consumer.values().is_empty());
    }
}
