//! Process execution behind the [`Executor`] trait.
//!
//! The runner never spawns processes directly: it hands a fully assembled
//! [`Invocation`] — program, arguments, working directory, and the resolved
//! environment overlay — to an [`Executor`]. Production code uses
//! [`SystemExecutor`]; unit tests use the generated `MockExecutor`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Command, Output};

use crate::error::ToolError;

/// A fully assembled tool invocation.
///
/// The environment map is an *overlay*: entries are added on top of the
/// inherited process environment rather than replacing it, matching how
/// build tools expect `PATH` and friends to remain visible.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Absolute path of the program to run.
    pub program: PathBuf,
    /// Arguments, one token per element (no shell interpretation).
    pub args: Vec<String>,
    /// Working directory for the child process.
    pub cwd: PathBuf,
    /// Environment overlay applied to the child process.
    pub env: BTreeMap<String, String>,
}

impl Invocation {
    /// Render the invocation as a single display line for logging.
    ///
    /// Arguments containing whitespace are quoted. This is for humans only;
    /// execution always passes tokens individually.
    #[must_use]
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(char::is_whitespace) {
                line.push('"');
                line.push_str(arg);
                line.push('"');
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

/// Result of a command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Raw exit code, if the process exited normally.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Abstraction over external tool lookup and execution.
///
/// Implement this trait to swap in a mock during tests, keeping the
/// orchestration logic independent of the real system.
#[cfg_attr(test, mockall::automock)]
pub trait Executor: Send + Sync {
    /// Locate `program` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotFound`] if the program is not on `PATH`.
    fn which(&self, program: &str) -> Result<PathBuf, ToolError>;

    /// Run the invocation to completion, capturing output.
    ///
    /// A non-zero exit code is *not* an error at this layer — callers decide
    /// whether to treat it as fatal (see [`ExecResult::success`]).
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Spawn`] if the process cannot be started.
    fn run(&self, invocation: &Invocation) -> Result<ExecResult, ToolError>;
}

/// Production [`Executor`] that uses `PATH` lookup and [`std::process`].
#[derive(Debug, Default)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn which(&self, program: &str) -> Result<PathBuf, ToolError> {
        which::which(program).map_err(|_| ToolError::NotFound {
            tool: program.to_string(),
        })
    }

    fn run(&self, invocation: &Invocation) -> Result<ExecResult, ToolError> {
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .envs(&invocation.env)
            .output()
            .map_err(|source| ToolError::Spawn {
                tool: invocation.program.display().to_string(),
                source,
            })?;
        Ok(ExecResult::from(output))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn invocation(program: &str, args: &[&str]) -> Invocation {
        Invocation {
            program: PathBuf::from(program),
            args: args.iter().map(ToString::to_string).collect(),
            cwd: std::env::temp_dir(),
            env: BTreeMap::new(),
        }
    }

    #[test]
    fn command_line_quotes_whitespace_args() {
        let inv = invocation("/usr/bin/cmake", &["-GUnix Makefiles", "-DFOO=1"]);
        assert_eq!(
            inv.command_line(),
            "/usr/bin/cmake \"-GUnix Makefiles\" -DFOO=1"
        );
    }

    #[test]
    fn run_captures_stdout() {
        #[cfg(windows)]
        let inv = invocation("cmd", &["/C", "echo hello"]);
        #[cfg(not(windows))]
        let inv = invocation("echo", &["hello"]);
        let result = SystemExecutor.run(&inv).unwrap();
        assert!(result.success);
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[test]
    fn run_reports_non_zero_exit_without_error() {
        #[cfg(windows)]
        let inv = invocation("cmd", &["/C", "exit 1"]);
        #[cfg(not(windows))]
        let inv = invocation("false", &[]);
        let result = SystemExecutor.run(&inv).unwrap();
        assert!(!result.success, "non-zero exit should set success=false");
        assert_eq!(result.code, Some(1));
    }

    #[test]
    fn run_env_overlay_reaches_child() {
        let mut inv = invocation("sh", &["-c", "echo $CMAKESETTINGS_TEST_VAR"]);
        #[cfg(windows)]
        {
            inv = invocation("cmd", &["/C", "echo %CMAKESETTINGS_TEST_VAR%"]);
        }
        inv.env
            .insert("CMAKESETTINGS_TEST_VAR".to_string(), "overlay".to_string());
        let result = SystemExecutor.run(&inv).unwrap();
        assert_eq!(result.stdout.trim(), "overlay");
    }

    #[test]
    fn which_missing_program_is_not_found() {
        let err = SystemExecutor
            .which("this-program-does-not-exist-12345")
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound { .. }));
    }
}
