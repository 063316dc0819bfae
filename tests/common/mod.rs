// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed settings fixture and a recording
// fake executor so each integration test can drive the full runner pipeline
// without spawning real tools.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use cmakesettings_runner::error::ToolError;
use cmakesettings_runner::exec::{ExecResult, Executor, Invocation};
use cmakesettings_runner::logging::{Log, Logger};
use cmakesettings_runner::operations::SystemFileSystemOps;
use cmakesettings_runner::runner::Context;

/// An [`Executor`] that records every invocation instead of spawning
/// processes.
///
/// `which` resolves any tool to `/usr/bin/<name>` unless the name was
/// registered as missing; `run` succeeds unless a failure exit code was
/// configured.
#[derive(Debug, Default)]
pub struct FakeExecutor {
    invocations: Mutex<Vec<Invocation>>,
    missing_tools: Vec<String>,
    fail_with_code: Option<i32>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `which(tool)` fail with [`ToolError::NotFound`].
    #[must_use]
    pub fn with_missing_tool(mut self, tool: &str) -> Self {
        self.missing_tools.push(tool.to_string());
        self
    }

    /// Make every `run` report a non-zero exit with `code`.
    #[must_use]
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.fail_with_code = Some(code);
        self
    }

    /// All recorded invocations, in call order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .map_or_else(|_| Vec::new(), |g| g.clone())
    }
}

impl Executor for FakeExecutor {
    fn which(&self, program: &str) -> Result<PathBuf, ToolError> {
        if self.missing_tools.iter().any(|t| t == program) {
            return Err(ToolError::NotFound {
                tool: program.to_string(),
            });
        }
        Ok(Path::new("/usr/bin").join(program))
    }

    fn run(&self, invocation: &Invocation) -> Result<ExecResult, ToolError> {
        if let Ok(mut invocations) = self.invocations.lock() {
            invocations.push(invocation.clone());
        }
        match self.fail_with_code {
            Some(code) => Ok(ExecResult {
                stdout: String::new(),
                stderr: format!("fake failure (exit {code})"),
                success: false,
                code: Some(code),
            }),
            None => Ok(ExecResult {
                stdout: "fake ok".to_string(),
                stderr: String::new(),
                success: true,
                code: Some(0),
            }),
        }
    }
}

/// A settings fixture on disk, plus the collaborators wired into a
/// [`Context`].
pub struct TestHarness {
    pub dir: tempfile::TempDir,
    pub settings_path: PathBuf,
    pub executor: Arc<FakeExecutor>,
    pub log: Arc<Logger>,
}

impl TestHarness {
    /// Write `contents` as `CMakeSettings.json` inside a fresh temp dir.
    pub fn new(contents: &str) -> Self {
        Self::with_executor(contents, FakeExecutor::new())
    }

    /// Same, with a pre-configured executor.
    pub fn with_executor(contents: &str, executor: FakeExecutor) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let settings_path = dir.path().join("CMakeSettings.json");
        std::fs::write(&settings_path, contents).expect("write CMakeSettings.json");
        Self {
            dir,
            settings_path,
            executor: Arc::new(executor),
            log: Arc::new(Logger::new()),
        }
    }

    /// Workspace root (the temp dir itself).
    pub fn workspace_root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Build a [`Context`] around the harness collaborators.
    pub fn context(&self, dry_run: bool) -> Context {
        Context::new(
            Arc::clone(&self.log) as Arc<dyn Log>,
            Arc::clone(&self.executor) as Arc<dyn Executor>,
            Arc::new(SystemFileSystemOps),
            dry_run,
        )
    }
}
