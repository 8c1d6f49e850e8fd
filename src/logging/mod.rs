//! Structured JSON logging
//!
//! The subscriber is installed once in `main`. Everything a log line needs to
//! identify the run (environment, application, hostname, run id) lives on a
//! [`LogContext`] that is handed to the components doing the work; they enter
//! its span instead of reading process-wide settings.

use anyhow::anyhow;
use tracing::{Level, Span};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Crates whose output is only shown at debug level
const NOISY_TARGETS: [&str; 4] = ["aws_config", "aws_sdk_s3", "aws_smithy_runtime", "hyper"];

/// Parse a log level name (case-insensitive, Python-style names accepted)
pub fn parse_level(level: &str) -> Option<Level> {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Some(Level::TRACE),
        "DEBUG" => Some(Level::DEBUG),
        "INFO" => Some(Level::INFO),
        "WARN" | "WARNING" => Some(Level::WARN),
        "ERROR" | "CRITICAL" => Some(Level::ERROR),
        _ => None,
    }
}

/// Filter directives for `level`
pub fn filter_directives(level: Level) -> String {
    let base = level.as_str().to_ascii_lowercase();
    if level >= Level::DEBUG {
        // Verbose levels include the storage client's own logging
        return base;
    }

    let mut directives = vec![base];
    directives.extend(NOISY_TARGETS.iter().map(|target| format!("{}=warn", target)));
    directives.join(",")
}

/// Install the JSON subscriber on stdout
///
/// `RUST_LOG` takes precedence over `log_level` when set.
pub fn init_subscriber(log_level: &str) -> anyhow::Result<()> {
    let level =
        parse_level(log_level).ok_or_else(|| anyhow!("unknown log level '{}'", log_level))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(level)));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(true)
        .with_span_list(false)
        .with_thread_ids(true)
        .with_writer(std::io::stdout)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {}", e))
}

/// Per-run logging context
#[derive(Debug, Clone)]
pub struct LogContext {
    pub environment: String,
    pub application: String,
    pub hostname: String,
    pub run_id: Uuid,
    span: Span,
}

impl LogContext {
    /// Create the context for this run
    ///
    /// Must be called after [`init_subscriber`]; a span created before a
    /// subscriber exists stays disabled.
    pub fn new(environment: impl Into<String>, application: impl Into<String>) -> Self {
        let environment = environment.into();
        let application = application.into();
        let hostname = local_hostname();
        let run_id = Uuid::new_v4();

        let span = tracing::info_span!(
            "run",
            %run_id,
            environment = %environment,
            application = %application,
            hostname = %hostname,
        );

        Self {
            environment,
            application,
            hostname,
            run_id,
            span,
        }
    }

    /// Span every unit of work for this run executes in
    pub fn span(&self) -> &Span {
        &self.span
    }
}

fn local_hostname() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("info"), Some(Level::INFO));
        assert_eq!(parse_level("WARNING"), Some(Level::WARN));
        assert_eq!(parse_level(" Debug "), Some(Level::DEBUG));
        assert_eq!(parse_level("verbose"), None);
    }

    #[test]
    fn test_filter_directives() {
        assert_eq!(filter_directives(Level::DEBUG), "debug");
        let info = filter_directives(Level::INFO);
        assert!(info.starts_with("info,"));
        assert!(info.contains("aws_sdk_s3=warn"));
    }

    #[test]
    fn test_context_fields() {
        let a = LogContext::new("dev", "tagger");
        let b = LogContext::new("dev", "tagger");
        assert_eq!(a.environment, "dev");
        assert_eq!(a.application, "tagger");
        assert!(!a.hostname.is_empty());
        assert_ne!(a.run_id, b.run_id);
    }
}
