// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate error type and the RT-Component return code.
//!
//! Hot-path operations (buffer and connector reads/writes) report plain
//! status codes from [`crate::status`]. [`Error`] is reserved for setup-time
//! failures: connector construction, connection negotiation, configuration
//! loading and component binding.

use std::fmt;

/// Errors returned by setup-time operations.
///
/// # Example
///
/// ```rust
/// use rtm::{Error, FactoryRegistry, Properties};
/// use rtm::port::{connect, InPort, OutPort};
///
/// let registry = FactoryRegistry::with_defaults();
/// let out = OutPort::<i32>::new("out");
/// let inp = InPort::<i32>::new("in");
///
/// let props = Properties::new();
/// props.set("dataport.interface_type", "carrier_pigeon");
///
/// match connect(&out, &inp, props, &registry) {
///     Err(Error::Unsupported(what)) => println!("rejected: {}", what),
///     other => panic!("unexpected: {:?}", other.map(|i| i.id)),
/// }
/// ```
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A property value could not be parsed or is out of range.
    InvalidProperty { key: String, value: String },
    /// Configuration file not found at specified path.
    ConfigFileNotFound(String),
    /// Configuration file could not be parsed.
    ConfigParse(String),

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Requested interface / dataflow / subscription / buffer type is not
    /// registered or not supported by this combination of ports.
    Unsupported(String),
    /// Interface negotiation between the two endpoints failed.
    NegotiationFailed(String),
    /// No connector with the given id exists on this port.
    ConnectorNotFound(String),

    // ========================================================================
    // Execution Context Errors
    // ========================================================================
    /// The component is already bound to this execution context.
    AlreadyBound(String),
    /// The component is not a participant of this execution context.
    NotParticipant(String),
    /// Invalid state for the requested operation.
    InvalidState(String),

    // ========================================================================
    // Other Errors
    // ========================================================================
    /// Typed value could not be encoded or decoded.
    Serialization(String),
    /// Spawning a worker thread failed.
    ThreadSpawn(std::io::Error),
    /// I/O error with underlying cause.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Configuration
            Error::InvalidProperty { key, value } => {
                write!(f, "Invalid property {} = '{}'", key, value)
            }
            Error::ConfigFileNotFound(path) => write!(f, "Config file not found: {}", path),
            Error::ConfigParse(msg) => write!(f, "Config parse error: {}", msg),
            // Connection
            Error::Unsupported(what) => write!(f, "Unsupported: {}", what),
            Error::NegotiationFailed(msg) => write!(f, "Interface negotiation failed: {}", msg),
            Error::ConnectorNotFound(id) => write!(f, "Connector not found: {}", id),
            // Execution context
            Error::AlreadyBound(name) => {
                write!(f, "Component '{}' is already bound to this context", name)
            }
            Error::NotParticipant(name) => {
                write!(f, "Component '{}' is not a participant of this context", name)
            }
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            // Other
            Error::Serialization(msg) => write!(f, "Serialization failed: {}", msg),
            Error::ThreadSpawn(e) => write!(f, "Failed to spawn worker thread: {}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ThreadSpawn(e) | Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// Convenient alias for setup-time results.
pub type Result<T> = core::result::Result<T, Error>;

/// Result of a component callback or an execution-context request.
///
/// Mirrors the standard RT-Component return codes. Anything other than
/// [`ReturnCode::Ok`] returned from a lifecycle callback drives the
/// component into the ERROR state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReturnCode {
    #[default]
    Ok,
    Error,
    BadParameter,
    Unsupported,
    OutOfResources,
    PreconditionNotMet,
}

impl ReturnCode {
    /// `true` for [`ReturnCode::Ok`].
    #[inline]
    pub fn is_ok(self) -> bool {
        self == ReturnCode::Ok
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReturnCode::Ok => "RTC_OK",
            ReturnCode::Error => "RTC_ERROR",
            ReturnCode::BadParameter => "BAD_PARAMETER",
            ReturnCode::Unsupported => "UNSUPPORTED",
            ReturnCode::OutOfResources => "OUT_OF_RESOURCES",
            ReturnCode::PreconditionNotMet => "PRECONDITION_NOT_MET",
        }
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Error> for ReturnCode {
    fn from(e: Error) -> Self {
        match e {
            Error::AlreadyBound(_) | Error::NotParticipant(_) | Error::InvalidProperty { .. } => {
                ReturnCode::BadParameter
            }
            Error::Unsupported(_) => ReturnCode::Unsupported,
            Error::InvalidState(_) => ReturnCode::PreconditionNotMet,
            Error::ThreadSpawn(_) => ReturnCode::OutOfResources,
            _ => ReturnCode::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let e = Error::InvalidProperty {
            key: "buffer.length".into(),
            value: "-3".into(),
        };
        assert_eq!(e.to_string(), "Invalid property buffer.length = '-3'");
        assert_eq!(
            Error::Unsupported("interface_type 'corba_cdr'".into()).to_string(),
            "Unsupported: interface_type 'corba_cdr'"
        );
    }

    #[test]
    fn test_return_code_from_error() {
        assert_eq!(
            ReturnCode::from(Error::NotParticipant("a".into())),
            ReturnCode::BadParameter
        );
        assert_eq!(
            ReturnCode::from(Error::InvalidState("x".into())),
            ReturnCode::PreconditionNotMet
        );
        assert_eq!(
            ReturnCode::from(Error::Serialization("x".into())),
            ReturnCode::Error
        );
        assert!(ReturnCode::default().is_ok());
    }
}
