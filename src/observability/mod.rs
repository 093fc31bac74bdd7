use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::stream::Termination;

/// Initialize the tracing subscriber with the configured log level.
///
/// Maps config log levels to tracing levels:
/// - "DISABLED" -> no subscriber installed
/// - "WARNING" -> WARN
/// - "CRITICAL" -> ERROR
/// - Others map directly (DEBUG, INFO, ERROR)
pub fn init_tracing(log_level: &str) {
    let Some(directive) = tracing_directive(log_level) else {
        return;
    };

    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("INFO"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn tracing_directive(log_level: &str) -> Option<String> {
    let level = log_level.to_uppercase();
    match level.as_str() {
        "DISABLED" => None,
        "WARNING" => Some("WARN".to_string()),
        "CRITICAL" => Some("ERROR".to_string()),
        _ => Some(level),
    }
}

/// Log the outcome of a finished relay session.
pub fn log_session_complete(
    session_id: u64,
    termination: Termination,
    frames: u64,
    bytes: u64,
    elapsed: Duration,
) {
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    match termination {
        Termination::Done | Termination::Eof => tracing::info!(
            session = session_id,
            reason = %termination,
            frames,
            bytes,
            elapsed_ms,
            "relay session finished"
        ),
        Termination::ReadError | Termination::TimedOut | Termination::Failed => tracing::warn!(
            session = session_id,
            reason = %termination,
            frames,
            bytes,
            elapsed_ms,
            "relay session ended early"
        ),
        Termination::Cancelled => tracing::debug!(
            session = session_id,
            reason = %termination,
            frames,
            bytes,
            elapsed_ms,
            "relay session cancelled by downstream"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_directive_mapping() {
        assert_eq!(tracing_directive("warning").as_deref(), Some("WARN"));
        assert_eq!(tracing_directive("CRITICAL").as_deref(), Some("ERROR"));
        assert_eq!(tracing_directive("debug").as_deref(), Some("DEBUG"));
        assert_eq!(tracing_directive("Disabled"), None);
    }
}
