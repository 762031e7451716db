// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Flat string-keyed configuration shared by buffers, publishers,
//! connectors and execution contexts.
//!
//! # Architecture
//!
//! - **Keys**: dotted paths (`buffer.length`, `exec_cxt.periodic.rate`).
//!   Well-known keys live in [`keys`]; **never hardcode them elsewhere**.
//! - **Store**: `DashMap` behind an `Arc`, so cloning a [`Properties`] is an
//!   Arc counter increment and every clone observes the same entries.
//! - **Snapshots**: [`Properties::snapshot`] produces an independent deep copy
//!   when a consumer needs immutability (e.g. `ConnectorInfo`).
//!
//! # Example
//!
//! ```rust
//! use rtm::config::{keys, Properties};
//!
//! let props = Properties::new();
//! props.set(keys::BUFFER_LENGTH, "16");
//! props.set(keys::BUFFER_WRITE_FULL_POLICY, "block");
//!
//! assert_eq!(props.get_usize(keys::BUFFER_LENGTH), Some(16));
//!
//! // Sub-tree with the prefix stripped
//! let buffer = props.node("buffer");
//! assert_eq!(buffer.get_str("write.full_policy").as_deref(), Some("block"));
//! ```

#[cfg(feature = "config-loaders")]
pub mod loaders;

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Well-known property keys and values.
///
/// Values are compared case-insensitively after trimming.
pub mod keys {
    // === Buffer ===
    pub const BUFFER_TYPE: &str = "buffer.type";
    pub const BUFFER_LENGTH: &str = "buffer.length";
    pub const BUFFER_WRITE_FULL_POLICY: &str = "buffer.write.full_policy";
    pub const BUFFER_WRITE_TIMEOUT: &str = "buffer.write.timeout";
    pub const BUFFER_READ_EMPTY_POLICY: &str = "buffer.read.empty_policy";

    // === Data port / connector ===
    pub const CONNECTOR_NAME: &str = "dataport.connector_name";
    pub const INTERFACE_TYPE: &str = "dataport.interface_type";
    pub const DATAFLOW_TYPE: &str = "dataport.dataflow_type";
    pub const SUBSCRIPTION_TYPE: &str = "dataport.subscription_type";
    pub const PUSH_RATE: &str = "dataport.publisher.push_rate";
    pub const PUSH_POLICY: &str = "dataport.publisher.push_policy";
    pub const SKIP_COUNT: &str = "dataport.publisher.skip_count";
    /// Endpoint id published by the in-process transport.
    pub const DIRECT_ENDPOINT: &str = "dataport.direct.endpoint";

    // === Execution context ===
    pub const EC_TYPE: &str = "exec_cxt.type";
    pub const EC_PERIODIC_RATE: &str = "exec_cxt.periodic.rate";
    pub const EC_CPU_AFFINITY: &str = "exec_cxt.periodic.cpu_affinity";
    pub const EC_STACK_SIZE: &str = "exec_cxt.periodic.stack_size";
    pub const EC_SYNC_TRANSITION: &str = "exec_cxt.sync_transition";
    pub const EC_TRANSITION_TIMEOUT: &str = "exec_cxt.transition_timeout";
    pub const EC_MEASURE: &str = "exec_cxt.measure";

    // ===================================================================
    // Values
    // ===================================================================

    // Buffer write policy
    pub const OVERWRITE: &str = "overwrite";
    pub const DO_NOTHING: &str = "do_nothing";
    pub const BLOCK: &str = "block";

    // Buffer read policy
    pub const READBACK: &str = "readback";

    // Dataflow
    pub const PUSH: &str = "push";
    pub const PULL: &str = "pull";

    // Subscription
    pub const FLUSH: &str = "flush";
    pub const NEW: &str = "new";
    pub const PERIODIC: &str = "periodic";

    // Push policy
    pub const ALL: &str = "all";
    pub const FIFO: &str = "fifo";
    pub const SKIP: &str = "skip";

    // Transport
    pub const DIRECT: &str = "direct";
    pub const RING_BUFFER: &str = "ring_buffer";
}

/// Shared property bag.
///
/// Cloning shares the underlying store (cheap). Use [`Properties::snapshot`]
/// to obtain an independent copy.
#[derive(Clone, Default)]
pub struct Properties {
    entries: Arc<DashMap<Arc<str>, Arc<str>>>,
}

impl Properties {
    /// Create a new empty bag.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Build from `(key, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let props = Self::new();
        for (k, v) in pairs {
            props.set(k.as_ref(), v.as_ref());
        }
        props
    }

    /// Insert or replace a value.
    #[inline]
    pub fn set(&self, key: &str, value: &str) {
        self.entries.insert(Arc::from(key), Arc::from(value));
    }

    /// Insert only if the key is absent. Returns `true` if inserted.
    pub fn set_default(&self, key: &str, value: &str) -> bool {
        if self.entries.contains_key(key) {
            return false;
        }
        self.set(key, value);
        true
    }

    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<str>> {
        self.entries.get(key).map(|v| Arc::clone(&v))
    }

    /// Value trimmed, as an owned `String`.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.trim().to_string())
    }

    /// Value trimmed and lowercased; the form used for policy names.
    #[must_use]
    pub fn get_normalized(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.trim().to_ascii_lowercase())
    }

    /// Boolean in the `YES`/`NO`, `true`/`false`, `1`/`0`, `on`/`off` forms.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get_normalized(key)?.as_str() {
            "yes" | "true" | "1" | "on" => Some(true),
            "no" | "false" | "0" | "off" => Some(false),
            other => {
                log::warn!("[config] '{}' is not a boolean: '{}'", key, other);
                None
            }
        }
    }

    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        let raw = self.get(key)?;
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                log::warn!("[config] '{}' is not a number: '{}'", key, raw);
                None
            }
        }
    }

    #[must_use]
    pub fn get_usize(&self, key: &str) -> Option<usize> {
        let raw = self.get(key)?;
        match raw.trim().parse::<usize>() {
            Ok(v) => Some(v),
            Err(_) => {
                log::warn!("[config] '{}' is not an unsigned integer: '{}'", key, raw);
                None
            }
        }
    }

    /// Duration expressed in (fractional) seconds, e.g. `"0.5"`.
    #[must_use]
    pub fn get_duration(&self, key: &str) -> Option<Duration> {
        let secs = self.get_f64(key)?;
        match Duration::try_from_secs_f64(secs) {
            Ok(d) => Some(d),
            Err(_) => {
                log::warn!("[config] '{}' is not a valid duration: {}", key, secs);
                None
            }
        }
    }

    /// Comma-separated list, entries trimmed, empties dropped.
    #[must_use]
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[inline]
    pub fn remove(&self, key: &str) -> Option<Arc<str>> {
        self.entries.remove(key).map(|(_, v)| v)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries whose key starts with `prefix`, sorted by key.
    pub fn search_prefix(&self, prefix: &str) -> Vec<(Arc<str>, Arc<str>)> {
        let mut out: Vec<_> = self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| (Arc::clone(e.key()), Arc::clone(e.value())))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Independent copy of the sub-tree under `name`, with `name.` stripped.
    #[must_use]
    pub fn node(&self, name: &str) -> Properties {
        let prefix = format!("{}.", name);
        let sub = Properties::new();
        for (k, v) in self.search_prefix(&prefix) {
            sub.set(&k[prefix.len()..], &v);
        }
        sub
    }

    /// Copy every entry of `other` into `self` (other wins on conflict).
    pub fn merge(&self, other: &Properties) {
        for e in other.entries.iter() {
            self.entries.insert(Arc::clone(e.key()), Arc::clone(e.value()));
        }
    }

    /// Copy every entry of `other` under `prefix.`.
    pub fn merge_under(&self, prefix: &str, other: &Properties) {
        for e in other.entries.iter() {
            self.set(&format!("{}.{}", prefix, e.key()), e.value());
        }
    }

    /// Deep copy not sharing storage with `self`.
    #[must_use]
    pub fn snapshot(&self) -> Properties {
        let copy = Properties::new();
        copy.merge(self);
        copy
    }

    /// Sorted `(key, value)` list.
    pub fn to_vec(&self) -> Vec<(Arc<str>, Arc<str>)> {
        self.search_prefix("")
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.to_vec() {
            map.entry(&k, &v);
        }
        map.finish()
    }
}

impl PartialEq for Properties {
    fn eq(&self, other: &Self) -> bool {
        self.to_vec() == other.to_vec()
    }
}
