use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::decoder::chunk::{StopReason, Usage};

/// Initialize the tracing subscriber with the configured log level.
///
/// Maps config log levels to tracing levels:
/// - "DISABLED" -> no subscriber installed
/// - "WARNING" -> WARN
/// - "CRITICAL" -> ERROR
/// - Others map directly (DEBUG, INFO, ERROR)
pub fn init_tracing(log_level: &str) {
    let level = log_level.to_uppercase();

    if level == "DISABLED" {
        return;
    }

    let tracing_level = match level.as_str() {
        "WARNING" => "WARN",
        "CRITICAL" => "ERROR",
        other => other,
    };

    let filter = EnvFilter::try_new(tracing_level).unwrap_or_else(|_| EnvFilter::new("INFO"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Log the finish of a streamed completion at INFO level.
pub fn log_stream_finish(raw_reason: &str, stop_reason: StopReason, usage: &Usage, elapsed: Duration) {
    info!(
        stop_reason = ?stop_reason,
        provider_stop_reason = raw_reason,
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        total_tokens = usage.total_tokens,
        cache_read_tokens = usage.input_breakdown.cache_read,
        cache_write_tokens = usage.input_breakdown.cache_write,
        duration_seconds = elapsed.as_secs_f64(),
        "stream completed"
    );
}
