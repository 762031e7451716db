// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Mutex-guarded ring buffer.
//!
//! ```text
//! slots: [ - ][S1][S2][S3][ - ][ - ]
//!              ^           ^
//!              |           |
//!            rpos        wpos        fill = 3
//! ```
//!
//! `fill` never exceeds the capacity: a full ring under `overwrite` drops the
//! slot at `rpos` before writing, so the write cursor never laps the read
//! cursor.

use super::{Buffer, DEFAULT_BUFFER_LENGTH, DEFAULT_WRITE_TIMEOUT};
use crate::config::{keys, Properties};
use crate::error::{Error, Result};
use crate::status::BufferStatus;
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Behaviour of `write` on a full buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Drop the oldest item and write (returns OK).
    #[default]
    Overwrite,
    /// Return FULL without writing.
    DoNothing,
    /// Wait for a free slot up to the write timeout, then TIMEOUT.
    Block,
}

impl WritePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            keys::OVERWRITE => Some(WritePolicy::Overwrite),
            keys::DO_NOTHING => Some(WritePolicy::DoNothing),
            keys::BLOCK => Some(WritePolicy::Block),
            _ => None,
        }
    }
}

/// Behaviour of `read` on an empty buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadPolicy {
    /// Return EMPTY.
    #[default]
    DoNothing,
    /// Return the last item read again, if anything was ever written.
    Readback,
}

impl ReadPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            keys::DO_NOTHING => Some(ReadPolicy::DoNothing),
            keys::READBACK => Some(ReadPolicy::Readback),
            _ => None,
        }
    }
}

struct RingState<T> {
    slots: Vec<Option<T>>,
    rpos: usize,
    wpos: usize,
    fill: usize,
    /// Total successful writes since the last reset
    wcount: u64,
    last_read: Option<T>,
    write_policy: WritePolicy,
    read_policy: ReadPolicy,
    write_timeout: Duration,
}

impl<T> RingState<T> {
    fn with_length(length: usize) -> Self {
        Self {
            slots: (0..length).map(|_| None).collect(),
            rpos: 0,
            wpos: 0,
            fill: 0,
            wcount: 0,
            last_read: None,
            write_policy: WritePolicy::default(),
            read_policy: ReadPolicy::default(),
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.fill == self.capacity()
    }

    fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.rpos = 0;
        self.wpos = 0;
        self.fill = 0;
        self.wcount = 0;
        self.last_read = None;
    }

    fn pop(&mut self) -> Option<T> {
        if self.fill == 0 {
            return None;
        }
        let item = self.slots[self.rpos].take();
        self.rpos = (self.rpos + 1) % self.capacity();
        self.fill -= 1;
        item
    }

    fn push(&mut self, item: T) {
        self.slots[self.wpos] = Some(item);
        self.wpos = (self.wpos + 1) % self.capacity();
        self.fill += 1;
        self.wcount += 1;
    }
}

/// Fixed-capacity ring buffer with overwrite / do-nothing / block policies.
///
/// # Example
///
/// ```
/// use rtm::buffer::{Buffer, RingBuffer, WritePolicy};
/// use rtm::status::BufferStatus;
///
/// let ring = RingBuffer::with_policy(2, WritePolicy::DoNothing);
/// assert_eq!(ring.write(1, None), BufferStatus::Ok);
/// assert_eq!(ring.write(2, None), BufferStatus::Ok);
/// assert_eq!(ring.write(3, None), BufferStatus::Full);
/// assert_eq!(ring.read(), Ok(1));
/// ```
pub struct RingBuffer<T> {
    state: Mutex<RingState<T>>,
    not_full: Condvar,
}

impl<T: Clone + Send> RingBuffer<T> {
    /// Ring of `length` slots (0 is treated as 1) with default policies.
    pub fn new(length: usize) -> Self {
        Self {
            state: Mutex::new(RingState::with_length(length.max(1))),
            not_full: Condvar::new(),
        }
    }

    pub fn with_policy(length: usize, policy: WritePolicy) -> Self {
        let ring = Self::new(length);
        ring.state.lock().write_policy = policy;
        ring
    }

    /// Build from `buffer.*` keys.
    pub fn from_properties(props: &Properties) -> Result<Self> {
        let ring = Self::new(DEFAULT_BUFFER_LENGTH);
        ring.configure(props)?;
        Ok(ring)
    }

    pub fn read_policy(&self) -> ReadPolicy {
        self.state.lock().read_policy
    }

    pub fn write_timeout(&self) -> Duration {
        self.state.lock().write_timeout
    }

    fn configure(&self, props: &Properties) -> Result<()> {
        let length = match props.get_str(keys::BUFFER_LENGTH) {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    return Err(Error::InvalidProperty {
                        key: keys::BUFFER_LENGTH.into(),
                        value: raw,
                    })
                }
            },
            None => None,
        };
        let write_policy = parse_key(props, keys::BUFFER_WRITE_FULL_POLICY, WritePolicy::parse)?;
        let read_policy = parse_key(props, keys::BUFFER_READ_EMPTY_POLICY, ReadPolicy::parse)?;
        let write_timeout = match props.get_str(keys::BUFFER_WRITE_TIMEOUT) {
            Some(raw) => Some(props.get_duration(keys::BUFFER_WRITE_TIMEOUT).ok_or(
                Error::InvalidProperty {
                    key: keys::BUFFER_WRITE_TIMEOUT.into(),
                    value: raw,
                },
            )?),
            None => None,
        };

        let mut st = self.state.lock();
        if let Some(n) = length {
            if n != st.capacity() {
                st.slots = (0..n).map(|_| None).collect();
                st.clear();
                // Writers blocked on the old ring now see free slots
                self.not_full.notify_all();
            }
        }
        if let Some(p) = write_policy {
            st.write_policy = p;
        }
        if let Some(p) = read_policy {
            st.read_policy = p;
        }
        if let Some(t) = write_timeout {
            st.write_timeout = t;
        }
        log::debug!(
            "[buffer] ring configured: length={} write={:?} read={:?} timeout={:?}",
            st.capacity(),
            st.write_policy,
            st.read_policy,
            st.write_timeout
        );
        Ok(())
    }
}

fn parse_key<P>(props: &Properties, key: &str, parse: fn(&str) -> Option<P>) -> Result<Option<P>> {
    match props.get_str(key) {
        Some(raw) => parse(&raw).map(Some).ok_or(Error::InvalidProperty {
            key: key.into(),
            value: raw,
        }),
        None => Ok(None),
    }
}

impl<T: Clone + Send> Default for RingBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_LENGTH)
    }
}

impl<T: Clone + Send> Buffer<T> for RingBuffer<T> {
    fn init(&self, props: &Properties) -> Result<()> {
        self.configure(props)
    }

    #[inline]
    fn length(&self) -> usize {
        self.state.lock().capacity()
    }

    fn reset(&self) -> BufferStatus {
        self.state.lock().clear();
        self.not_full.notify_all();
        BufferStatus::Ok
    }

    fn write(&self, item: T, timeout: Option<Duration>) -> BufferStatus {
        let mut st = self.state.lock();
        let policy = if timeout.is_some() {
            WritePolicy::Block
        } else {
            st.write_policy
        };

        if st.is_full() {
            match policy {
                WritePolicy::Overwrite => {
                    st.pop();
                    log::trace!("[buffer] full, oldest item overwritten");
                }
                WritePolicy::DoNothing => return BufferStatus::Full,
                WritePolicy::Block => {
                    let deadline = Instant::now() + timeout.unwrap_or(st.write_timeout);
                    while st.is_full() {
                        if self.not_full.wait_until(&mut st, deadline).timed_out() && st.is_full()
                        {
                            log::debug!("[buffer] blocking write timed out");
                            return BufferStatus::Timeout;
                        }
                    }
                }
            }
        }

        st.push(item);
        BufferStatus::Ok
    }

    fn read(&self) -> std::result::Result<T, BufferStatus> {
        let mut st = self.state.lock();
        match st.pop() {
            Some(item) => {
                st.last_read = Some(item.clone());
                drop(st);
                self.not_full.notify_one();
                Ok(item)
            }
            None => match (st.read_policy, &st.last_read) {
                (ReadPolicy::Readback, Some(last)) if st.wcount > 0 => Ok(last.clone()),
                _ => Err(BufferStatus::Empty),
            },
        }
    }

    fn peek(&self) -> std::result::Result<T, BufferStatus> {
        let st = self.state.lock();
        if st.fill == 0 {
            return Err(BufferStatus::Empty);
        }
        st.slots[st.rpos].clone().ok_or(BufferStatus::BufferError)
    }

    fn advance_read(&self, n: usize) -> BufferStatus {
        let mut st = self.state.lock();
        if n > st.fill {
            return BufferStatus::PreconditionNotMet;
        }
        for _ in 0..n {
            if let Some(item) = st.pop() {
                st.last_read = Some(item);
            }
        }
        drop(st);
        if n > 0 {
            self.not_full.notify_all();
        }
        BufferStatus::Ok
    }

    #[inline]
    fn full(&self) -> bool {
        self.state.lock().is_full()
    }

    #[inline]
    fn empty(&self) -> bool {
        self.state.lock().fill == 0
    }

    #[inline]
    fn readable(&self) -> usize {
        self.state.lock().fill
    }

    #[inline]
    fn writable(&self) -> usize {
        let st = self.state.lock();
        st.capacity() - st.fill
    }

    fn write_policy(&self) -> WritePolicy {
        self.state.lock().write_policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_overwrite_keeps_last_c_items() {
        for cap in 1..=6usize {
            for extra in 0..=7usize {
                let ring = RingBuffer::with_policy(cap, WritePolicy::Overwrite);
                let total = cap + extra;
                for i in 0..total {
                    assert_eq!(ring.write(i, None), BufferStatus::Ok);
                }
                assert_eq!(ring.length(), cap);
                assert!(ring.full());
                let got: Vec<usize> = std::iter::from_fn(|| ring.read().ok()).collect();
                let want: Vec<usize> = (total - cap..total).collect();
                assert_eq!(got, want, "cap={} extra={}", cap, extra);
            }
        }
    }

    #[test]
    fn test_capacity_one_do_nothing() {
        let ring = RingBuffer::with_policy(1, WritePolicy::DoNothing);
        assert_eq!(ring.write(1, None), BufferStatus::Ok);
        assert_eq!(ring.write(2, None), BufferStatus::Full);
        assert_eq!(ring.write(3, None), BufferStatus::Full);
        assert_eq!(ring.read(), Ok(1));
        assert_eq!(ring.read(), Err(BufferStatus::Empty));
    }

    #[test]
    fn test_capacity_one_overwrite_last_write_wins() {
        let ring = RingBuffer::new(1);
        for v in [1, 2, 3] {
            assert_eq!(ring.write(v, None), BufferStatus::Ok);
        }
        assert_eq!(ring.read(), Ok(3));
    }

    #[test]
    fn test_block_times_out() {
        let ring = RingBuffer::with_policy(1, WritePolicy::Block);
        ring.write(1u8, None);
        let start = Instant::now();
        assert_eq!(
            ring.write(2, Some(Duration::from_millis(30))),
            BufferStatus::Timeout
        );
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(ring.readable(), 1);
    }

    #[test]
    fn test_caller_timeout_forces_block() {
        // Default policy is overwrite, an explicit timeout must not overwrite
        let ring = RingBuffer::new(1);
        ring.write(1u8, None);
        assert_eq!(
            ring.write(2, Some(Duration::from_millis(5))),
            BufferStatus::Timeout
        );
        assert_eq!(ring.read(), Ok(1));
    }

    #[test]
    fn test_blocked_writer_released_by_reader() {
        let ring = Arc::new(RingBuffer::with_policy(1, WritePolicy::Block));
        ring.write(1u32, None);

        let writer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || ring.write(2, Some(Duration::from_secs(5))))
        };
        thread::sleep(Duration::from_millis(20));
        assert_eq!(ring.read(), Ok(1));
        assert_eq!(writer.join().expect("writer panicked"), BufferStatus::Ok);
        assert_eq!(ring.read(), Ok(2));
    }

    #[test]
    fn test_readback() {
        let ring: RingBuffer<u8> = RingBuffer::new(4);
        ring.init(&Properties::from_pairs([(keys::BUFFER_READ_EMPTY_POLICY, "readback")]))
            .expect("valid policy");

        // Nothing ever written
        assert_eq!(ring.read(), Err(BufferStatus::Empty));

        ring.write(7, None);
        assert_eq!(ring.read(), Ok(7));
        assert_eq!(ring.read(), Ok(7));
        assert!(ring.empty());
    }

    #[test]
    fn test_peek_and_advance() {
        let ring = RingBuffer::new(4);
        for v in 1..=3 {
            ring.write(v, None);
        }
        assert_eq!(ring.peek(), Ok(1));
        assert_eq!(ring.readable(), 3);
        assert_eq!(ring.advance_read(2), BufferStatus::Ok);
        assert_eq!(ring.peek(), Ok(3));
        assert_eq!(ring.advance_read(5), BufferStatus::PreconditionNotMet);
        assert_eq!(ring.writable(), 3);
    }

    #[test]
    fn test_init_from_properties() {
        let props = Properties::from_pairs([
            (keys::BUFFER_LENGTH, "3"),
            (keys::BUFFER_WRITE_FULL_POLICY, "BLOCK"),
            (keys::BUFFER_WRITE_TIMEOUT, "0.25"),
        ]);
        let ring: RingBuffer<u8> = RingBuffer::from_properties(&props).expect("valid props");
        assert_eq!(ring.length(), 3);
        assert_eq!(ring.write_policy(), WritePolicy::Block);
        assert_eq!(ring.read_policy(), ReadPolicy::DoNothing);
        assert_eq!(ring.write_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_init_rejects_bad_values() {
        let ring: RingBuffer<u8> = RingBuffer::default();
        for (k, v) in [
            (keys::BUFFER_LENGTH, "0"),
            (keys::BUFFER_LENGTH, "eight"),
            (keys::BUFFER_WRITE_FULL_POLICY, "drop_newest"),
            (keys::BUFFER_READ_EMPTY_POLICY, "block"),
            (keys::BUFFER_WRITE_TIMEOUT, "-1"),
            (keys::BUFFER_WRITE_TIMEOUT, "1e30"),
        ] {
            let err = ring.init(&Properties::from_pairs([(k, v)]));
            assert!(
                matches!(err, Err(Error::InvalidProperty { .. })),
                "{} = {}",
                k,
                v
            );
        }
        assert_eq!(ring.length(), DEFAULT_BUFFER_LENGTH);
    }

    #[test]
    fn test_reset() {
        let ring = RingBuffer::new(2);
        ring.write(1, None);
        ring.write(2, None);
        assert_eq!(ring.reset(), BufferStatus::Ok);
        assert!(ring.empty());
        assert_eq!(ring.writable(), 2);
    }
}
