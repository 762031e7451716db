// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Status codes for buffer and data-port operations.
//!
//! These are returned by value, never raised. A `Full` buffer under the
//! `do_nothing` policy is an expected outcome under backpressure, not a
//! fault, and callers are expected to handle it locally.

use std::fmt;

/// Outcome of a [`crate::buffer::Buffer`] operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferStatus {
    Ok,
    BufferError,
    Full,
    Empty,
    PreconditionNotMet,
    Timeout,
    NotSupported,
}

impl BufferStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BufferStatus::Ok => "BUFFER_OK",
            BufferStatus::BufferError => "BUFFER_ERROR",
            BufferStatus::Full => "BUFFER_FULL",
            BufferStatus::Empty => "BUFFER_EMPTY",
            BufferStatus::PreconditionNotMet => "PRECONDITION_NOT_MET",
            BufferStatus::Timeout => "TIMEOUT",
            BufferStatus::NotSupported => "NOT_SUPPORTED",
        }
    }
}

impl fmt::Display for BufferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a connector, publisher or transport operation.
///
/// `Send*` codes describe the local (OutPort) side of a push, `Recv*` codes
/// describe what the remote receiver reported back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataPortStatus {
    PortOk,
    PortError,
    BufferError,
    BufferFull,
    BufferEmpty,
    BufferTimeout,
    SendFull,
    SendTimeout,
    RecvEmpty,
    RecvTimeout,
    InvalidArgs,
    PreconditionNotMet,
    ConnectionLost,
    UnknownError,
}

impl DataPortStatus {
    #[inline]
    pub fn is_ok(self) -> bool {
        self == DataPortStatus::PortOk
    }

    /// Ranking used when a port fans a single write out to several
    /// connectors and must report one status. Higher is worse.
    pub(crate) fn severity(self) -> u8 {
        match self {
            DataPortStatus::PortOk => 0,
            DataPortStatus::BufferEmpty | DataPortStatus::RecvEmpty => 1,
            DataPortStatus::BufferFull | DataPortStatus::SendFull => 2,
            DataPortStatus::BufferTimeout
            | DataPortStatus::SendTimeout
            | DataPortStatus::RecvTimeout => 3,
            DataPortStatus::PreconditionNotMet | DataPortStatus::InvalidArgs => 4,
            DataPortStatus::BufferError | DataPortStatus::PortError => 5,
            DataPortStatus::UnknownError => 6,
            DataPortStatus::ConnectionLost => 7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataPortStatus::PortOk => "PORT_OK",
            DataPortStatus::PortError => "PORT_ERROR",
            DataPortStatus::BufferError => "BUFFER_ERROR",
            DataPortStatus::BufferFull => "BUFFER_FULL",
            DataPortStatus::BufferEmpty => "BUFFER_EMPTY",
            DataPortStatus::BufferTimeout => "BUFFER_TIMEOUT",
            DataPortStatus::SendFull => "SEND_FULL",
            DataPortStatus::SendTimeout => "SEND_TIMEOUT",
            DataPortStatus::RecvEmpty => "RECV_EMPTY",
            DataPortStatus::RecvTimeout => "RECV_TIMEOUT",
            DataPortStatus::InvalidArgs => "INVALID_ARGS",
            DataPortStatus::PreconditionNotMet => "PRECONDITION_NOT_MET",
            DataPortStatus::ConnectionLost => "CONNECTION_LOST",
            DataPortStatus::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for DataPortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<BufferStatus> for DataPortStatus {
    /// Local buffer outcome as seen by the port layer.
    fn from(status: BufferStatus) -> Self {
        match status {
            BufferStatus::Ok => DataPortStatus::PortOk,
            BufferStatus::BufferError => DataPortStatus::BufferError,
            BufferStatus::Full => DataPortStatus::BufferFull,
            BufferStatus::Empty => DataPortStatus::BufferEmpty,
            BufferStatus::PreconditionNotMet => DataPortStatus::PreconditionNotMet,
            BufferStatus::Timeout => DataPortStatus::BufferTimeout,
            BufferStatus::NotSupported => DataPortStatus::PortError,
        }
    }
}

/// Maps a receiver-side status returned by a remote `put` onto the code the
/// sending publisher reports to its caller.
pub(crate) fn sender_view(remote: DataPortStatus) -> DataPortStatus {
    match remote {
        DataPortStatus::BufferFull => DataPortStatus::SendFull,
        DataPortStatus::BufferTimeout => DataPortStatus::SendTimeout,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_to_port_status() {
        assert_eq!(DataPortStatus::from(BufferStatus::Ok), DataPortStatus::PortOk);
        assert_eq!(
            DataPortStatus::from(BufferStatus::Full),
            DataPortStatus::BufferFull
        );
        assert_eq!(
            DataPortStatus::from(BufferStatus::Timeout),
            DataPortStatus::BufferTimeout
        );
    }

    #[test]
    fn test_sender_view() {
        assert_eq!(
            sender_view(DataPortStatus::BufferFull),
            DataPortStatus::SendFull
        );
        assert_eq!(
            sender_view(DataPortStatus::ConnectionLost),
            DataPortStatus::ConnectionLost
        );
    }

    #[test]
    fn test_severity_ordering() {
        assert!(
            DataPortStatus::ConnectionLost.severity() > DataPortStatus::BufferFull.severity()
        );
        assert!(DataPortStatus::PortOk.severity() < DataPortStatus::BufferEmpty.severity());
    }
}
