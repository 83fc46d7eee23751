//! Tests for bridge configuration.

use super::*;

#[test]
fn test_toml_parsing() {
    let toml = r#"
        runtime_version = "3.10"
        bridge_modules = ["solverforge", "my_bootstrap"]
        default_callable_interface = "ToIntFunction"

        [supported_versions]
        min = "3.10"
        max = "3.10"

        [logging]
        filter = "solverforge_interop=debug"
    "#;

    let config = BridgeConfig::from_toml_str(toml).unwrap();
    assert_eq!(config.runtime_version, RuntimeVersion::PY_3_10);
    assert_eq!(config.supported_versions.max, RuntimeVersion::PY_3_10);
    assert_eq!(config.bridge_modules, vec!["solverforge", "my_bootstrap"]);
    assert_eq!(config.default_callable_interface, "ToIntFunction");
    assert_eq!(config.logging.filter, "solverforge_interop=debug");
    assert!(config.marshalling.sync_opaque_fields);
}

#[test]
fn test_yaml_parsing() {
    let yaml = r#"
        runtime_version: "3.11"
        marshalling:
          sync_opaque_fields: false
    "#;

    let config = BridgeConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.runtime_version, RuntimeVersion::PY_3_11);
    assert!(!config.marshalling.sync_opaque_fields);
    assert!(config.is_bridge_module("typing"));
}

#[test]
fn test_defaults_from_empty_document() {
    let config = BridgeConfig::from_toml_str("").unwrap();
    assert_eq!(config.runtime_version, RuntimeVersion::PY_3_11);
    assert_eq!(config.supported_versions, VersionWindow::SUPPORTED);
    assert_eq!(config.default_callable_interface, "PythonLikeFunction");
}

#[test]
fn test_rejects_inverted_window() {
    let toml = r#"
        [supported_versions]
        min = "3.11"
        max = "3.10"
    "#;
    assert!(matches!(
        BridgeConfig::from_toml_str(toml),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_rejects_bad_version_string() {
    assert!(matches!(
        BridgeConfig::from_toml_str(r#"runtime_version = "eleven""#),
        Err(ConfigError::Toml(_))
    ));
}

#[test]
fn test_builder() {
    let config = BridgeConfig::new()
        .with_runtime_version(RuntimeVersion::PY_3_10)
        .with_bridge_module("vendor.glue")
        .with_callable_interface("Predicate");

    assert_eq!(config.runtime_version, RuntimeVersion::PY_3_10);
    assert!(config.is_bridge_module("vendor.glue.inner"));
    assert!(!config.is_bridge_module("vendor"));
    assert_eq!(config.default_callable_interface, "Predicate");
}
