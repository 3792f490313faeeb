//! `vllmd launch-command`: print the resolved child command line.

use std::fmt::Write;

use vllmd_core::AppConfig;
use vllmd_runtime::LaunchSpec;

/// Render the command line (API key masked) plus extra environment.
pub fn render(config: &AppConfig) -> String {
    let spec = LaunchSpec::from_config(&config.vllm);
    let mut out = String::new();
    for (key, value) in &spec.env {
        let _ = write!(out, "{key}={value} ");
    }
    out.push_str(&spec.display());
    out
}

pub fn execute(config: &AppConfig) {
    if !config.vllm.owns_process() {
        eprintln!("note: vllm is not self-managed with this configuration; vllmd will not launch it");
    }
    println!("{}", render(config));
}
