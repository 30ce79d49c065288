pub fn init() {
    // Honor RUST_LOG if set, default to info. Logs go to stderr: in stdio
    // mode stdout carries the protocol.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Log a per-tool measurement and record it in the `gateway_tool_metric`
/// histogram for whichever recorder is installed.
pub fn log_metric(tool: &str, metric: &str, value: f64) {
    tracing::info!(tool = tool, metric = metric, value = value, "metric");
    metrics::histogram!(
        "gateway_tool_metric",
        "tool" => tool.to_owned(),
        "metric" => metric.to_owned()
    )
    .record(value);
}
