//! `vllmd check-config`: summarize a validated configuration.

use vllmd_core::AppConfig;

/// Human-readable summary of the effective configuration.
pub fn summary(config: &AppConfig) -> String {
    let vllm = &config.vllm;
    let mode = match (vllm.enabled, vllm.self_manage) {
        (false, _) => "disabled",
        (true, true) => "self-managed",
        (true, false) => "external",
    };

    let mut lines = vec![
        format!("http:     {}:{}", config.web.host, config.web.port),
        format!("log:      {}", config.log.level),
        format!("vllm:     {mode}"),
    ];
    if vllm.enabled {
        lines.push(format!("endpoint: {}", vllm.base_url()));
        lines.push(format!("model:    {}", vllm.model_name));
        lines.push(format!(
            "defaults: max_tokens={} temperature={} top_p={} timeout={}s",
            vllm.max_tokens, vllm.temperature, vllm.top_p, vllm.request_timeout_secs
        ));
    }
    if vllm.owns_process() {
        lines.push(format!("path:     {}", vllm.effective_model_path()));
        lines.push(format!(
            "startup:  timeout={}s poll={}ms grace={}s",
            vllm.startup_timeout_secs, vllm.poll_interval_ms, vllm.grace_period_secs
        ));
    }
    lines.join("\n")
}

/// Validate and print the summary.
pub fn execute(config: &AppConfig) -> anyhow::Result<()> {
    config.validate()?;
    println!("{}", summary(config));
    println!("configuration OK");
    Ok(())
}
