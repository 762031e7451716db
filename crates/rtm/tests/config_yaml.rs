// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![cfg(feature = "config-loaders")]
#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests/examples panic on failure
#![allow(clippy::float_cmp)] // Test assertions with constants

//! Properties loaded from YAML configure contexts and connections.

use rtm::buffer::WritePolicy;
use rtm::config::keys;
use rtm::config::loaders::YamlLoader;
use rtm::ec::ExecutionKind;
use rtm::port::{connect, InPort, OutPort};
use rtm::{DataPortStatus, Error, FactoryRegistry};
use std::fs;
use std::path::PathBuf;

const DOCUMENT: &str = r"
exec_cxt:
  type: ExtTrigExecutionContext
  periodic:
    rate: 250
  sync_transition: NO
connection:
  dataport:
    subscription_type: flush
  buffer:
    length: 2
    write:
      full_policy: do_nothing
";

fn scratch_file(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("rtm-{}-{}.yaml", name, uuid::Uuid::new_v4()));
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_context_from_file() {
    let path = scratch_file("ec", DOCUMENT);
    let props = YamlLoader::load_file(&path, None).unwrap();
    fs::remove_file(&path).unwrap();

    let registry = FactoryRegistry::with_defaults();
    let ec = registry.create_context(&props).unwrap();
    assert_eq!(ec.get_rate(), 250.0);
    assert_eq!(ec.get_kind(), ExecutionKind::Periodic);
    assert_eq!(
        ec.get_profile().properties.get_str(keys::EC_TYPE).as_deref(),
        Some("ExtTrigExecutionContext")
    );
}

#[test]
fn test_connection_from_subtree() {
    let props = YamlLoader::parse(DOCUMENT, None).unwrap();
    let connection = props.node("connection");
    assert_eq!(
        connection
            .get_str(keys::BUFFER_WRITE_FULL_POLICY)
            .and_then(|p| WritePolicy::parse(&p)),
        Some(WritePolicy::DoNothing)
    );

    let registry = FactoryRegistry::with_defaults();
    let out = OutPort::<u8>::new("out");
    let inp = InPort::<u8>::new("in");
    connect(&out, &inp, connection, &registry).unwrap();

    assert_eq!(out.write(&1), DataPortStatus::PortOk);
    assert_eq!(out.write(&2), DataPortStatus::PortOk);
    assert_eq!(out.write(&3), DataPortStatus::SendFull);
    assert_eq!(inp.read(), Ok(1));
}

#[test]
fn test_missing_file() {
    let path = std::env::temp_dir().join("rtm-does-not-exist.yaml");
    assert!(matches!(
        YamlLoader::load_file(&path, None),
        Err(Error::ConfigFileNotFound(_))
    ));
}

#[test]
fn test_invalid_document() {
    assert!(matches!(
        YamlLoader::parse("exec_cxt: [unclosed", None),
        Err(Error::ConfigParse(_))
    ));
}
