// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML property loader.
//!
//! Nested mappings are flattened into dotted keys. Scalars keep their YAML
//! text form (`true`, `12.5`, `block`). Sequences are joined with commas, so
//! `cpu_affinity: [0, 2]` becomes `"0,2"`.
//!
//! Two document shapes are accepted:
//!
//! ```yaml
//! # plain
//! exec_cxt:
//!   periodic:
//!     rate: 100
//! buffer:
//!   length: 16
//!   write:
//!     full_policy: block
//!     timeout: 0.5
//! ```
//!
//! ```yaml
//! # named profiles
//! default_profile: control_loop
//! profiles:
//!   control_loop:
//!     exec_cxt: { periodic: { rate: 1000 } }
//!   logging:
//!     exec_cxt: { periodic: { rate: 10 } }
//! ```

use super::Properties;
use crate::error::{Error, Result};
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Root document when the file carries named profiles.
#[derive(Debug, Deserialize)]
pub struct YamlProfileDocument {
    /// Named property profiles.
    pub profiles: BTreeMap<String, Value>,

    /// Profile used when the caller does not name one.
    #[serde(default)]
    pub default_profile: Option<String>,
}

/// YAML property loader.
pub struct YamlLoader;

impl YamlLoader {
    /// Load a YAML file into a new [`Properties`].
    ///
    /// `profile` selects an entry of a `profiles:` document; it is ignored
    /// for plain documents.
    pub fn load_file<P: AsRef<Path>>(path: P, profile: Option<&str>) -> Result<Properties> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ConfigFileNotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        log::debug!("[config] loading properties from {}", path.display());
        Self::parse(&content, profile)
    }

    /// Parse YAML text into a new [`Properties`].
    pub fn parse(content: &str, profile: Option<&str>) -> Result<Properties> {
        let root: Value = serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse YAML: {}", e)))?;

        let is_profile_doc = root
            .as_mapping()
            .is_some_and(|m| m.contains_key(Value::from("profiles")));

        let props = Properties::new();
        if is_profile_doc {
            let doc: YamlProfileDocument = serde_yaml::from_value(root)
                .map_err(|e| Error::ConfigParse(format!("Invalid profile document: {}", e)))?;
            let name = profile
                .map(str::to_string)
                .or(doc.default_profile.clone())
                .ok_or_else(|| {
                    Error::ConfigParse("no profile requested and no default_profile".into())
                })?;
            let selected = doc
                .profiles
                .get(&name)
                .ok_or_else(|| Error::ConfigParse(format!("profile '{}' not found", name)))?;
            flatten_into(&props, "", selected)?;
        } else {
            flatten_into(&props, "", &root)?;
        }
        Ok(props)
    }
}

fn flatten_into(props: &Properties, prefix: &str, value: &Value) -> Result<()> {
    match value {
        Value::Mapping(map) => {
            for (k, v) in map {
                let key = scalar_text(k).ok_or_else(|| {
                    Error::ConfigParse(format!("non-scalar key under '{}'", prefix))
                })?;
                let path = if prefix.is_empty() {
                    key
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(props, &path, v)?;
            }
            Ok(())
        }
        Value::Sequence(items) => {
            let joined: Option<Vec<String>> = items.iter().map(scalar_text).collect();
            let joined = joined.ok_or_else(|| {
                Error::ConfigParse(format!("'{}' must be a list of scalars", prefix))
            })?;
            props.set(prefix, &joined.join(","));
            Ok(())
        }
        Value::Tagged(tagged) => flatten_into(props, prefix, &tagged.value),
        scalar => {
            if prefix.is_empty() {
                return Err(Error::ConfigParse("top-level value must be a mapping".into()));
            }
            props.set(prefix, &scalar_text(scalar).unwrap_or_default());
            Ok(())
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
