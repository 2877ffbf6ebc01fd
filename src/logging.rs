use crate::advisory::{Advisory, AdvisorySeverity, AdvisorySink};
use crate::error::UnprotectError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
pub const VALID_ROTATIONS: [&str; 3] = ["daily", "hourly", "never"];

/// Target of simulated-mutation records; enabled at every level
pub const DRY_RUN_TARGET: &str = "dryrun";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable file logging in addition to stderr
    pub file_logging: bool,
    /// Log file directory
    pub log_dir: PathBuf,
    /// Log file name prefix
    pub file_prefix: String,
    /// Log rotation (daily, hourly, never)
    pub rotation: String,
    /// Write the file log as JSON lines
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: false,
            log_dir: PathBuf::from("logs"),
            file_prefix: "asg-unprotect".to_string(),
            rotation: "daily".to_string(),
            json_format: false,
        }
    }
}

/// Initialize logging system.
///
/// Console output goes to stderr; stdout carries only instance IDs. The returned guard must be
/// held until exit or buffered file records are lost.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let mut layers = Vec::new();

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(build_filter(&config.level)?);
    layers.push(console_layer.boxed());

    let mut guard = None;
    if config.file_logging {
        std::fs::create_dir_all(&config.log_dir)?;

        let file_appender = match config.rotation.as_str() {
            "daily" => rolling::daily(&config.log_dir, &config.file_prefix),
            "hourly" => rolling::hourly(&config.log_dir, &config.file_prefix),
            _ => rolling::never(&config.log_dir, format!("{}.log", config.file_prefix)),
        };

        let (writer, file_guard) = non_blocking(file_appender);
        guard = Some(file_guard);

        let file_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(build_filter(&config.level)?)
                .boxed()
        } else {
            fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(build_filter(&config.level)?)
                .boxed()
        };

        layers.push(file_layer);
    }

    tracing_subscriber::registry().with(layers).init();

    Ok(guard)
}

/// `RUST_LOG` when set, `level` otherwise
fn build_filter(level: &str) -> Result<EnvFilter, Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    with_dry_run_records(filter)
}

/// Dry-run records are the output of a simulation and pass whatever the level
fn with_dry_run_records(filter: EnvFilter) -> Result<EnvFilter, Box<dyn std::error::Error>> {
    Ok(filter.add_directive(format!("{}=trace", DRY_RUN_TARGET).parse()?))
}

/// Forwards advisory records to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAdvisorySink;

impl AdvisorySink for TracingAdvisorySink {
    fn emit(&self, advisory: Advisory) {
        StructuredLogger::log_advisory(&advisory);
    }
}

/// Logger utility for structured logging
pub struct StructuredLogger;

impl StructuredLogger {
    /// Log an advisory with its instance and target group as fields
    pub fn log_advisory(advisory: &Advisory) {
        let instance_id = advisory.instance_id.as_deref();
        let target_group = advisory.target_group.as_deref();

        match advisory.severity {
            AdvisorySeverity::Debug => {
                tracing::debug!(instance_id = ?instance_id, target_group = ?target_group, "{}", advisory.message);
            }
            AdvisorySeverity::Info => {
                tracing::info!(instance_id = ?instance_id, target_group = ?target_group, "{}", advisory.message);
            }
            AdvisorySeverity::Warn => {
                tracing::warn!(instance_id = ?instance_id, target_group = ?target_group, "{}", advisory.message);
            }
            AdvisorySeverity::DryRun => {
                tracing::info!(
                    target: DRY_RUN_TARGET,
                    dry_run = true,
                    instance_id = ?instance_id,
                    target_group = ?target_group,
                    "[DRYRUN] {}",
                    advisory.message
                );
            }
        }
    }

    /// Log a fatal error with its severity
    pub fn log_error(error: &UnprotectError, operation: &str) {
        tracing::error!(
            operation = %operation,
            severity = %error.severity().as_str(),
            "{}",
            error
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_default_logging_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(!config.file_logging);
        assert!(VALID_ROTATIONS.contains(&config.rotation.as_str()));
    }

    #[test]
    fn test_partial_logging_config_uses_defaults() {
        let config: LoggingConfig = serde_json::from_str(r#"{"level": "debug"}"#).unwrap();
        assert_eq!(config.level, "debug");
        assert_eq!(config.file_prefix, "asg-unprotect");
    }

    #[test]
    fn test_tracing_sink_accepts_every_severity() {
        let sink = TracingAdvisorySink;
        for severity in [
            AdvisorySeverity::Debug,
            AdvisorySeverity::Info,
            AdvisorySeverity::Warn,
            AdvisorySeverity::DryRun,
        ] {
            sink.emit(Advisory::new(severity, "message").with_instance("i-1"));
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_dry_run_records_pass_a_warn_filter() {
        let buffer = SharedBuffer::default();
        let writer = buffer.clone();
        let filter = with_dry_run_records(EnvFilter::new("warn")).unwrap();
        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(move || writer.clone())
                .with_filter(filter),
        );

        tracing::subscriber::with_default(subscriber, || {
            StructuredLogger::log_advisory(&Advisory::info("removed protection for 3 instances"));
            StructuredLogger::log_advisory(
                &Advisory::dry_run("would remove instance protection on instanceId i-1")
                    .with_instance("i-1"),
            );
        });

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("[DRYRUN] would remove instance protection on instanceId i-1"));
        assert!(!output.contains("removed protection for 3 instances"));
    }
}
