// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded buffers owned by connectors.
//!
//! A buffer sits between exactly one producer and one consumer: the OutPort
//! write path and its publisher, or an InPort provider and the port's read
//! path. It owns its own lock, so neither side needs external locking.
//!
//! Only writers may block (under the `block` policy). Reads never block.

mod ring;

pub use ring::{ReadPolicy, RingBuffer, WritePolicy};

use crate::config::Properties;
use crate::error::Result;
use crate::ser::ByteData;
use crate::status::BufferStatus;
use std::time::Duration;

/// Capacity used when `buffer.length` is not set.
pub const DEFAULT_BUFFER_LENGTH: usize = 8;

/// Write timeout used by the `block` policy when `buffer.write.timeout` is
/// not set.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Fixed-capacity FIFO with configurable full / empty behaviour.
pub trait Buffer<T>: Send + Sync {
    /// Reconfigure from `buffer.*` keys. Changing the length discards
    /// buffered items.
    fn init(&self, props: &Properties) -> Result<()>;

    /// Capacity.
    fn length(&self) -> usize;

    /// Drop every buffered item and forget read history.
    fn reset(&self) -> BufferStatus;

    /// Enqueue `item`. `Some(timeout)` forces the blocking policy for this
    /// call only.
    fn write(&self, item: T, timeout: Option<Duration>) -> BufferStatus;

    /// Dequeue the oldest item. Never blocks.
    fn read(&self) -> std::result::Result<T, BufferStatus>;

    /// Oldest item without consuming it.
    fn peek(&self) -> std::result::Result<T, BufferStatus>;

    /// Discard the `n` oldest items. Fails with `PreconditionNotMet` if fewer
    /// than `n` are readable.
    fn advance_read(&self, n: usize) -> BufferStatus;

    fn full(&self) -> bool;
    fn empty(&self) -> bool;

    /// Number of items ready to be read.
    fn readable(&self) -> usize;

    /// Number of free slots.
    fn writable(&self) -> usize;

    /// Policy applied when `write` is called without a timeout.
    fn write_policy(&self) -> WritePolicy;
}

/// Byte-stream buffer used by every connector.
pub type CdrBuffer = dyn Buffer<ByteData>;
