//! Engine configuration loading and model API key resolution
//!
//! Tests touching FERMI_MODEL_API_KEY are #[serial].

use fermi_engine::config::{resolve_model_api_key, ModelConfig, MODEL_API_KEY_ENV_VAR};
use fermi_engine::{CentralTendency, EngineConfig, Estimator};
use serial_test::serial;
use std::env;

#[test]
#[serial]
fn test_env_key_wins_over_toml() {
    env::set_var(MODEL_API_KEY_ENV_VAR, "env-key");
    let config = ModelConfig {
        api_key: Some("toml-key".to_string()),
        ..ModelConfig::default()
    };

    assert_eq!(resolve_model_api_key(&config), Some("env-key".to_string()));
    env::remove_var(MODEL_API_KEY_ENV_VAR);
}

#[test]
#[serial]
fn test_toml_key_used_without_env() {
    env::remove_var(MODEL_API_KEY_ENV_VAR);
    let config = ModelConfig {
        api_key: Some("toml-key".to_string()),
        ..ModelConfig::default()
    };

    assert_eq!(resolve_model_api_key(&config), Some("toml-key".to_string()));
}

#[test]
#[serial]
fn test_blank_keys_are_ignored() {
    env::set_var(MODEL_API_KEY_ENV_VAR, "  ");
    let config = ModelConfig {
        api_key: Some(String::new()),
        ..ModelConfig::default()
    };

    assert_eq!(resolve_model_api_key(&config), None);
    env::remove_var(MODEL_API_KEY_ENV_VAR);
}

#[test]
#[serial]
fn test_enabled_model_without_key_is_skipped() {
    env::remove_var(MODEL_API_KEY_ENV_VAR);
    let mut config = EngineConfig::default();
    config.sources.model.enabled = true;

    let estimator = Estimator::from_config(&config).unwrap();
    assert_eq!(estimator.source_count(), 5);
}

#[test]
#[serial]
fn test_enabled_model_with_key_is_registered() {
    env::remove_var(MODEL_API_KEY_ENV_VAR);
    let mut config = EngineConfig::default();
    config.sources.model.enabled = true;
    config.sources.model.api_key = Some("toml-key".to_string());

    let estimator = Estimator::from_config(&config).unwrap();
    assert_eq!(estimator.source_count(), 6);
}

#[test]
fn test_load_full_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let index_path = dir.path().join("index.json");
    std::fs::write(
        &index_path,
        r#"{"entries": {"saas conversion rate": [
            {"name": "Report", "value": 0.03, "product_type": "digital", "consumer_type": "B2B", "source": "report"}
        ]}}"#,
    )
    .unwrap();

    let config_path = dir.path().join("fermi.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[logging]
level = "debug"

[engine]
max_concurrency = 8
network_timeout_ms = 2000

[aggregation]
central_tendency = "mean"

[sources.benchmark_index]
path = "{}"

[[sources.datasets.records]]
key = "saas conversion rate"
name = "Registry"
value = 0.04
product_type = "digital"
consumer_type = "B2B"
source = "registry"
as_of = "2024-01-01"
"#,
            index_path.display()
        ),
    )
    .unwrap();

    let config = EngineConfig::load(Some(&config_path)).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.engine.max_concurrency, 8);
    assert_eq!(config.engine.in_memory_timeout_ms, 50);
    assert_eq!(config.aggregation.central_tendency, CentralTendency::Mean);

    let estimator = Estimator::from_config(&config).unwrap();
    assert_eq!(estimator.source_count(), 7, "Five rule-based sources plus datasets and index");
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let config = EngineConfig::load(Some(std::path::Path::new("/nonexistent/fermi.toml"))).unwrap();
    assert_eq!(config, EngineConfig::default());
}
