//! Tests for loading the YAML configuration document from disk.

use std::io::Write;

use vllmd_core::{
    AppConfig, ConfigError, DEFAULT_SYSTEM_PROMPT, LogFormat, LogRedirect, LogRotation,
};

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn test_load_full_document() {
    let file = write_config(
        r"
web:
  host: 127.0.0.1
  port: 10002
log:
  level: debug
  ansi: false
vllm:
  enabled: true
  self_manage: true
  host: 127.0.0.1
  port: 8001
  model_name: qwen3
  model_path: /models/Qwen3-8B
  gpu_memory_utilization: 0.85
  tensor_parallel_size: 2
  startup_timeout_secs: 900
  extra_args: [--trust-remote-code]
  env:
    CUDA_VISIBLE_DEVICES: '0,1'
",
    );

    let config = AppConfig::load(file.path()).expect("load config");

    assert_eq!(config.log.level, "debug");
    assert!(!config.log.ansi);
    assert!(config.vllm.owns_process());
    assert_eq!(config.vllm.port, 8001);
    assert_eq!(config.vllm.effective_model_path(), "/models/Qwen3-8B");
    assert_eq!(config.vllm.tensor_parallel_size, 2);
    assert_eq!(config.vllm.extra_args, vec!["--trust-remote-code"]);
    assert_eq!(
        config.vllm.env.get("CUDA_VISIBLE_DEVICES").map(String::as_str),
        Some("0,1")
    );
}

#[test]
fn test_load_rejects_invalid_values() {
    let file = write_config(
        r"
vllm:
  enabled: true
  gpu_memory_utilization: 0
",
    );

    let result = AppConfig::load(file.path());
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = AppConfig::load(&dir.path().join("missing.yaml"));
    assert!(matches!(result, Err(ConfigError::Io { .. })));
}

#[test]
fn test_load_accepts_short_timeout_keys() {
    let file = write_config(
        r"
vllm:
  enabled: true
  auto_start: true
  startup_timeout: 1200
  timeout: 120
",
    );

    let config = AppConfig::load(file.path()).expect("load config");

    assert!(config.vllm.owns_process());
    assert_eq!(config.vllm.startup_timeout_secs, 1200);
    assert_eq!(config.vllm.request_timeout_secs, 120);
}

#[test]
fn test_load_log_output_section() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write_config(&format!(
        r"
log:
  formatter: json
  redirect: both
  filepath: {}
  rotation: daily
  max_count: 7
  max_age: 604800s
",
        dir.path().display()
    ));

    let config = AppConfig::load(file.path()).expect("load config");

    assert_eq!(config.log.format, LogFormat::Json);
    assert_eq!(config.log.redirect, LogRedirect::Both);
    assert!(config.log.redirect.to_stdout() && config.log.redirect.to_file());
    assert_eq!(config.log.filepath, dir.path());
    assert_eq!(config.log.rotation, LogRotation::Daily);
    assert_eq!(config.log.max_count, 7);
}

#[test]
fn test_glog_formatter_reads_as_text() {
    let config = AppConfig::from_yaml_str("log:\n  formatter: glog\n").expect("parse");
    assert_eq!(config.log.format, LogFormat::Text);
    assert_eq!(config.log.redirect, LogRedirect::Stdout);
}

#[test]
fn test_file_logging_needs_retention() {
    let file = write_config("log:\n  redirect: file\n  max_count: 0\n");
    let result = AppConfig::load(file.path());
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_system_prompt_defaults_unless_cleared() {
    let config = AppConfig::from_yaml_str("vllm:\n  enabled: true\n").expect("parse");
    assert_eq!(
        config.vllm.default_system_prompt.as_deref(),
        Some(DEFAULT_SYSTEM_PROMPT)
    );

    let cleared =
        AppConfig::from_yaml_str("vllm:\n  default_system_prompt: null\n").expect("parse");
    assert_eq!(cleared.vllm.default_system_prompt, None);
}
