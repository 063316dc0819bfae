//! Logging types: the [`Log`] trait, the tracing-backed [`Logger`], and
//! subscriber initialisation.
//!
//! All output goes through [`tracing`] so the console format and verbosity
//! are controlled in one place ([`init_subscriber`]). The [`Logger`]
//! additionally collects one [`ConfigEntry`] per processed build
//! configuration for the end-of-run summary.

use std::sync::Mutex;

/// Result of one processed build configuration, for summary reporting.
#[derive(Debug, Clone)]
pub struct ConfigEntry {
    /// Configuration name as written in the settings file.
    pub name: String,
    /// Final status of the configuration.
    pub status: ConfigStatus,
    /// Optional detail message (e.g., error description).
    pub message: Option<String>,
}

/// Status of a processed build configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStatus {
    /// Configure (and build, when requested) completed successfully.
    Ok,
    /// The command lines were assembled and logged but not executed.
    DryRun,
    /// A configure or build step failed.
    Failed,
}

/// Abstraction over logging backends.
///
/// Production code uses [`Logger`]; tests can substitute a recording
/// implementation so assertions can be made about emitted messages without
/// capturing console output.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (suppressed on console unless verbose).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record a configuration result for the summary.
    fn record_config(&self, name: &str, status: ConfigStatus, message: Option<&str>);
}

/// Tracing-backed logger with dry-run awareness and summary collection.
#[derive(Debug, Default)]
pub struct Logger {
    entries: Mutex<Vec<ConfigEntry>>,
}

impl Logger {
    /// Create a new logger with an empty summary.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Return a clone of all recorded configuration entries.
    #[must_use]
    pub fn entries(&self) -> Vec<ConfigEntry> {
        self.entries
            .lock()
            .map_or_else(|_| Vec::new(), |g| g.clone())
    }

    /// Whether any recorded configuration failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.entries()
            .iter()
            .any(|e| e.status == ConfigStatus::Failed)
    }

    /// Print the per-configuration summary collected during the run.
    pub fn print_summary(&self) {
        let entries = self.entries();
        if entries.is_empty() {
            return;
        }
        tracing::info!("");
        tracing::info!("Summary:");
        for entry in &entries {
            let status = match entry.status {
                ConfigStatus::Ok => "ok",
                ConfigStatus::DryRun => "dry-run",
                ConfigStatus::Failed => "FAILED",
            };
            match &entry.message {
                Some(message) => tracing::info!("  [{status}] {} — {message}", entry.name),
                None => tracing::info!("  [{status}] {}", entry.name),
            }
        }
    }
}

impl Log for Logger {
    fn stage(&self, msg: &str) {
        tracing::info!(target: "cmakesettings::stage", "== {msg} ==");
    }

    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    fn dry_run(&self, msg: &str) {
        tracing::info!("[dry-run] {msg}");
    }

    fn record_config(&self, name: &str, status: ConfigStatus, message: Option<&str>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(ConfigEntry {
                name: name.to_string(),
                status,
                message: message.map(ToString::to_string),
            });
        }
    }
}

/// Install the global tracing subscriber for console output.
///
/// The default level is `INFO`, lowered to `DEBUG` with `verbose`; the
/// `RUST_LOG` environment variable overrides both. Repeated calls (as happen
/// across tests in one binary) are harmless: later installs are ignored.
pub fn init_subscriber(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .try_init();
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn record_config_collects_entries() {
        let log = Logger::new();
        log.record_config("Linux Debug", ConfigStatus::Ok, None);
        log.record_config("Linux Release", ConfigStatus::Failed, Some("exit 1"));
        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Linux Debug");
        assert_eq!(entries[1].status, ConfigStatus::Failed);
        assert_eq!(entries[1].message.as_deref(), Some("exit 1"));
    }

    #[test]
    fn has_failures_reflects_entries() {
        let log = Logger::new();
        assert!(!log.has_failures());
        log.record_config("a", ConfigStatus::Ok, None);
        assert!(!log.has_failures());
        log.record_config("b", ConfigStatus::Failed, None);
        assert!(log.has_failures());
    }

    #[test]
    fn dry_run_entries_are_not_failures() {
        let log = Logger::new();
        log.record_config("a", ConfigStatus::DryRun, None);
        assert!(!log.has_failures());
    }

    #[test]
    fn config_status_equality() {
        assert_eq!(ConfigStatus::Ok, ConfigStatus::Ok);
        assert_ne!(ConfigStatus::Ok, ConfigStatus::Failed);
        assert_ne!(ConfigStatus::DryRun, ConfigStatus::Failed);
    }
}
