//! Domain-specific error types for the runner.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Internal modules return typed errors (e.g., [`ConfigError`],
//! [`ToolError`]) while command handlers at the CLI boundary convert them to
//! [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! RunnerError
//! ├── Config(ConfigError) — settings file loading, parsing, filtering
//! ├── Eval(EvalError)     — property-expression resolution
//! └── Tool(ToolError)     — external tool lookup and invocation
//! ```

use thiserror::Error;

/// Top-level error type for the runner.
///
/// Aggregates domain-specific sub-errors and is convertible to
/// [`anyhow::Error`] for use at CLI command boundaries.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Settings-file related error (I/O, parsing, filtering).
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Property-expression evaluation error.
    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    /// External tool lookup or invocation error.
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),
}

/// Errors that arise from loading and selecting build configurations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The settings file does not exist.
    #[error("settings file not found: {path}")]
    NotFound {
        /// Path that was probed.
        path: String,
    },

    /// An I/O error occurred while reading the settings file.
    #[error("IO error reading settings file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The settings file is not valid JSON after comment stripping.
    #[error("invalid JSON in {path}: {message}")]
    Parse {
        /// Path to the offending file.
        path: String,
        /// Parser diagnostic.
        message: String,
    },

    /// The configuration-name filter is not a valid regular expression.
    #[error("invalid configuration filter '{pattern}': {message}")]
    InvalidFilter {
        /// The pattern as supplied on the command line.
        pattern: String,
        /// Regex compiler diagnostic.
        message: String,
    },

    /// No configuration name matched the filter.
    #[error("no configuration matches the filter '{pattern}'")]
    NoMatchingConfiguration {
        /// The filter that matched nothing.
        pattern: String,
    },

    /// An argument template could not be parsed into a token list.
    #[error("invalid argument template '{template}': {message}")]
    InvalidArguments {
        /// The offending template text.
        template: String,
        /// What was wrong with it.
        message: String,
    },
}

/// Errors that arise during property-expression evaluation.
#[derive(Error, Debug)]
pub enum EvalError {
    /// The fixed-point expansion did not converge within the pass limit.
    ///
    /// Raised for self-referential variable definitions; an expression that
    /// merely contains unresolvable tokens is *not* an error (the tokens are
    /// left literal).
    #[error("variable resolution cycle while expanding '{expression}'")]
    ResolutionCycle {
        /// The expression that failed to converge.
        expression: String,
    },
}

/// Errors that arise from external tool lookup and invocation.
#[derive(Error, Debug)]
pub enum ToolError {
    /// A required tool is not on `PATH`.
    #[error("required tool '{tool}' not found on PATH")]
    NotFound {
        /// Name of the missing tool.
        tool: String,
    },

    /// The tool process could not be spawned.
    #[error("failed to execute '{tool}': {source}")]
    Spawn {
        /// Name of the tool that failed to start.
        tool: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The tool ran but returned a non-zero exit code.
    #[error("'{tool}' failed with exit code {code}")]
    NonZeroExit {
        /// Name of the failed tool.
        tool: String,
        /// The exit code (or `-1` when terminated by a signal).
        code: i32,
    },
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    // -----------------------------------------------------------------------
    // ConfigError
    // -----------------------------------------------------------------------

    #[test]
    fn config_error_not_found_display() {
        let e = ConfigError::NotFound {
            path: "/src/CMakeSettings.json".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "settings file not found: /src/CMakeSettings.json"
        );
    }

    #[test]
    fn config_error_io_has_source() {
        use std::error::Error as StdError;
        let e = ConfigError::Io {
            path: "/src/CMakeSettings.json".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("/src/CMakeSettings.json"));
    }

    #[test]
    fn config_error_no_matching_configuration_display() {
        let e = ConfigError::NoMatchingConfiguration {
            pattern: "Linux.*".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "no configuration matches the filter 'Linux.*'"
        );
    }

    #[test]
    fn config_error_invalid_filter_display() {
        let e = ConfigError::InvalidFilter {
            pattern: "[".to_string(),
            message: "unclosed character class".to_string(),
        };
        assert!(e.to_string().contains("invalid configuration filter '['"));
    }

    // -----------------------------------------------------------------------
    // EvalError / ToolError
    // -----------------------------------------------------------------------

    #[test]
    fn eval_error_resolution_cycle_display() {
        let e = EvalError::ResolutionCycle {
            expression: "${a}".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "variable resolution cycle while expanding '${a}'"
        );
    }

    #[test]
    fn tool_error_non_zero_exit_display() {
        let e = ToolError::NonZeroExit {
            tool: "cmake".to_string(),
            code: 2,
        };
        assert_eq!(e.to_string(), "'cmake' failed with exit code 2");
    }

    #[test]
    fn runner_error_wraps_config_error() {
        let e = RunnerError::from(ConfigError::NoMatchingConfiguration {
            pattern: "x".to_string(),
        });
        assert!(e.to_string().starts_with("Configuration error:"));
    }
}
