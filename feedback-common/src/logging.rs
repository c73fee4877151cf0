//! Tracing setup shared by the feedback binaries.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// HTTP transport crates whose debug output drowns out request logs.
const TRANSPORT_MODULES: [&str; 5] = ["hyper", "hyper_util", "h2", "reqwest", "rustls"];

/// Filter for `level` with transport crates held at `warn`. `RUST_LOG` wins when set.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = TRANSPORT_MODULES
            .iter()
            .fold(level.to_string(), |acc, module| format!("{acc},{module}=warn"));
        EnvFilter::new(directives)
    })
}

/// Install the global subscriber. `log_format` of `"json"` selects JSON lines,
/// anything else the human-readable format. Later calls are no-ops.
pub fn init_logging(log_level: &str, log_format: &str) {
    let registry = tracing_subscriber::registry().with(env_filter(log_level));

    let installed = if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if installed.is_ok() {
        tracing::debug!(log_level, log_format, "Logging initialized");
    }
}

/// Fresh id correlating the log lines of one review submission.
pub fn generate_trace_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Info span carrying a `trace_id` plus any extra fields.
///
/// ```ignore
/// let span = request_span!("submit_review", trace_id, rating = input.rating);
/// ```
#[macro_export]
macro_rules! request_span {
    ($name:expr, $trace_id:expr) => {
        tracing::info_span!($name, trace_id = %$trace_id)
    };
    ($name:expr, $trace_id:expr, $($field:tt)*) => {
        tracing::info_span!($name, trace_id = %$trace_id, $($field)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_ids_are_unique_uuids() {
        let first = generate_trace_id();
        assert_ne!(first, generate_trace_id());
        assert!(uuid::Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging("info", "pretty");
        init_logging("debug", "json");
    }
}
