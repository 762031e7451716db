// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # RTM - RT-Middleware execution core
//!
//! Component lifecycle state machines, execution contexts that drive them,
//! and the buffered data-port connectors that move samples between
//! components.
//!
//! ## Quick Start
//!
//! ```rust
//! use rtm::port::{connect, InPort, OutPort};
//! use rtm::{DataPortStatus, FactoryRegistry, Properties};
//!
//! let registry = FactoryRegistry::with_defaults();
//! let out = OutPort::<f64>::new("speed_out");
//! let inp = InPort::<f64>::new("speed_in");
//!
//! // direct transport, push dataflow, flush subscription
//! let info = connect(&out, &inp, Properties::new(), &registry).unwrap();
//!
//! assert_eq!(out.write(&1.5), DataPortStatus::PortOk);
//! assert_eq!(inp.read(), Ok(1.5));
//! assert_eq!(inp.read(), Err(DataPortStatus::BufferEmpty));
//!
//! rtm::port::disconnect(&out, &inp, &info.id).unwrap();
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |   ExecutionContext (Periodic | ExtTrig)                             |
//! |     ExecutionContextWorker -> RtObjectStateMachine -> RtObject      |
//! +---------------------------------------------------------------------+
//! |   OutPort<T> --encode--> OutPortConnector --> Publisher             |
//! |                                 |  Buffer (ring)                    |
//! |   InPort<T> <--decode--  InPortConnector <--  Transport (direct)    |
//! +---------------------------------------------------------------------+
//! |   FactoryRegistry: buffers | publishers | transports | contexts     |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`rtobject::RtObjectStateMachine`] | CREATED / INACTIVE / ACTIVE / ERROR lifecycle of one component |
//! | [`ec::PeriodicExecutionContext`] | Cycles its participants from a dedicated thread |
//! | [`ec::ExtTrigExecutionContext`] | Cycles its participants on each `tick()` |
//! | [`buffer::RingBuffer`] | Bounded FIFO with overwrite / do_nothing / block policies |
//! | [`port::OutPort`] / [`port::InPort`] | Typed data ports |
//! | [`FactoryRegistry`] | Named factories for every pluggable part |
//!
//! ## Logging
//!
//! Diagnostics go through the [`log`] facade with a bracketed subsystem tag
//! (`[ec]`, `[rtobj]`, `[publisher]`, `[connector]`, `[buffer]`, `[port]`,
//! `[config]`). Install any `log` backend to see them.

pub mod buffer;
pub mod component;
pub mod config;
pub mod connector;
pub mod ec;
pub mod error;
pub mod port;
pub mod publisher;
pub mod registry;
pub mod rtobject;
pub mod ser;
pub mod status;
pub mod transport;
pub mod wake;

pub use config::Properties;
pub use error::{Error, Result, ReturnCode};
pub use registry::FactoryRegistry;
pub use ser::{ByteData, DataCodec};
pub use status::{BufferStatus, DataPortStatus};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
