//! Sequential orchestration: filter, evaluate, and build configurations.
//!
//! Configurations are processed strictly one at a time, in file order.
//! Each gets its own resolved-environment overlay, so nothing leaks from one
//! configuration into the next; a failing configure or build step aborts the
//! remaining batch (fail-fast).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use regex::Regex;

use crate::error::{ConfigError, ToolError};
use crate::exec::{Executor, Invocation};
use crate::logging::{ConfigStatus, Log};
use crate::operations::FileSystemOps;
use crate::settings::CMakeSettings;
use crate::settings::arglist::parse_arg_list;
use crate::settings::configuration::Configuration;
use crate::settings::environment::EnvironmentMap;
use crate::settings::evaluator::PropertyEvaluator;

/// Shared collaborators for a run.
pub struct Context {
    /// Logger for output and summary recording.
    pub log: Arc<dyn Log>,
    /// Tool lookup and process execution.
    pub executor: Arc<dyn Executor>,
    /// Filesystem access (injectable for testing).
    pub fs_ops: Arc<dyn FileSystemOps>,
    /// Whether to log commands instead of executing them.
    pub dry_run: bool,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("log", &"<dyn Log>")
            .field("executor", &"<dyn Executor>")
            .field("fs_ops", &self.fs_ops)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Context {
    /// Create a new run context.
    #[must_use]
    pub fn new(
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
        fs_ops: Arc<dyn FileSystemOps>,
        dry_run: bool,
    ) -> Self {
        Self {
            log,
            executor,
            fs_ops,
            dry_run,
        }
    }
}

/// Drives cmake configure/build for every configuration matching the filter.
#[derive(Debug)]
pub struct CMakeSettingsRunner {
    settings_path: PathBuf,
    workspace_root: PathBuf,
    filter: Regex,
    build_dir_override: Option<PathBuf>,
    do_build: bool,
}

impl CMakeSettingsRunner {
    /// Create a runner.
    ///
    /// `workspace_root` defaults to the settings file's directory. When
    /// `build_dir_override` is given it is used as a *parent*: each
    /// configuration builds in `<override>/<configuration name>` so that
    /// several configurations never share one build tree.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidFilter`] when `filter_pattern` is not a
    /// valid regular expression.
    pub fn new(
        settings_path: PathBuf,
        workspace_root: Option<PathBuf>,
        filter_pattern: &str,
        build_dir_override: Option<PathBuf>,
        do_build: bool,
    ) -> Result<Self, ConfigError> {
        let settings_path = dunce::canonicalize(&settings_path).unwrap_or(settings_path);
        let workspace_root = workspace_root.unwrap_or_else(|| {
            settings_path
                .parent()
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        });
        let filter =
            Regex::new(filter_pattern).map_err(|e| ConfigError::InvalidFilter {
                pattern: filter_pattern.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            settings_path,
            workspace_root,
            filter,
            build_dir_override,
            do_build,
        })
    }

    /// Load the settings file and process every matching configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be loaded, no configuration
    /// matches the filter (raised before any tool invocation), expression
    /// expansion detects a cycle, or a configure/build step fails.
    pub fn run(&self, ctx: &Context) -> Result<()> {
        ctx.log
            .stage(&format!("Loading {}", self.settings_path.display()));
        let settings =
            CMakeSettings::load(ctx.fs_ops.as_ref(), &self.settings_path, &self.workspace_root)?;

        let total = settings.configurations.len();
        let selected: Vec<&Configuration> = settings
            .configurations
            .iter()
            .filter(|configuration| self.filter.is_match(&configuration.name))
            .collect();
        if selected.is_empty() {
            return Err(ConfigError::NoMatchingConfiguration {
                pattern: self.filter.as_str().to_string(),
            }
            .into());
        }
        ctx.log.info(&format!(
            "{} of {total} configurations match the filter '{}'",
            selected.len(),
            self.filter.as_str()
        ));

        for configuration in selected {
            match self.run_configuration(ctx, configuration, &settings.environments) {
                Ok(status) => ctx.log.record_config(&configuration.name, status, None),
                Err(e) => {
                    ctx.log.record_config(
                        &configuration.name,
                        ConfigStatus::Failed,
                        Some(&e.to_string()),
                    );
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Process one configuration: evaluate, resolve the environment,
    /// assemble arguments, configure, and optionally build.
    fn run_configuration(
        &self,
        ctx: &Context,
        configuration: &Configuration,
        global: &EnvironmentMap,
    ) -> Result<ConfigStatus> {
        ctx.log
            .stage(&format!("Configuration '{}'", configuration.name));

        let evaluator = PropertyEvaluator::new(configuration, global, ctx.log.as_ref());
        let mut evaluated = configuration.evaluate(&evaluator)?;
        if let Some(parent) = &self.build_dir_override {
            evaluated.override_build_dir(parent.join(&evaluated.name).display().to_string());
        }
        let environment = evaluated.resolved_environment(global);
        let build_dir = PathBuf::from(&evaluated.build_dir);
        let source_dir = evaluated
            .settings_path
            .parent()
            .map_or_else(|| self.workspace_root.clone(), Path::to_path_buf);

        let cmake = ctx.executor.which("cmake")?;
        let mut configure_args = self.assemble_configure_args(ctx, &evaluated, &environment)?;
        configure_args.push(source_dir.display().to_string());
        let configure = Invocation {
            program: cmake.clone(),
            args: configure_args,
            cwd: build_dir.clone(),
            env: environment.clone(),
        };

        let build = if self.do_build {
            let mut build_args = vec!["--build".to_string(), ".".to_string()];
            build_args.extend(evaluated.generator_build_args());
            let make_args = parse_arg_list(&evaluated.make_args, &environment)?;
            if !make_args.is_empty() {
                build_args.push("--".to_string());
                build_args.extend(make_args);
            }
            Some(Invocation {
                program: cmake,
                args: build_args,
                cwd: build_dir.clone(),
                env: environment,
            })
        } else {
            None
        };

        if ctx.dry_run {
            ctx.log.dry_run(&configure.command_line());
            if let Some(build) = &build {
                ctx.log.dry_run(&build.command_line());
            }
            return Ok(ConfigStatus::DryRun);
        }

        ctx.fs_ops
            .create_dir_all(&build_dir)
            .with_context(|| format!("creating build directory {}", build_dir.display()))?;

        exec_logged(ctx, "cmake", &configure)?;
        if let Some(build) = &build {
            exec_logged(ctx, "cmake", build)?;
        }
        Ok(ConfigStatus::Ok)
    }

    /// Assemble the configure-step arguments for an evaluated configuration.
    fn assemble_configure_args(
        &self,
        ctx: &Context,
        evaluated: &Configuration,
        environment: &BTreeMap<String, String>,
    ) -> Result<Vec<String>> {
        let mut args = evaluated.generator_args();

        // Ninja is rarely on the default generator search path of cmake on
        // all platforms; pin the program explicitly.
        if evaluated.generator.contains("Ninja") {
            let ninja = ctx.executor.which("ninja")?;
            args.push(format!("-DCMAKE_MAKE_PROGRAM={}", ninja.display()));
        }

        if !evaluated.is_multi_config() && !evaluated.configuration_type.is_empty() {
            args.push(format!(
                "-DCMAKE_BUILD_TYPE={}",
                evaluated.configuration_type
            ));
        }

        args.extend(parse_arg_list(&evaluated.cmake_args, environment)?);

        for variable in &evaluated.variables {
            args.push(format!(
                "-D{}:{}={}",
                variable.name, variable.var_type, variable.value
            ));
        }

        let vcpkg_root = environment
            .get("RUNVCPKG_VCPKG_ROOT")
            .cloned()
            .or_else(|| std::env::var("RUNVCPKG_VCPKG_ROOT").ok())
            .filter(|root| !root.is_empty());
        if let Some(root) = vcpkg_root {
            let toolchain = Path::new(&root)
                .join("scripts")
                .join("buildsystems")
                .join("vcpkg.cmake");
            args.push(format!("-DCMAKE_TOOLCHAIN_FILE={}", toolchain.display()));
            if !evaluated.cmake_toolchain.is_empty() {
                args.push(format!(
                    "-DVCPKG_CHAINLOAD_TOOLCHAIN_FILE={}",
                    evaluated.cmake_toolchain
                ));
            }
        } else if !evaluated.cmake_toolchain.is_empty() {
            args.push(format!(
                "-DCMAKE_TOOLCHAIN_FILE={}",
                evaluated.cmake_toolchain
            ));
        }

        Ok(args)
    }
}

/// Run an invocation, forwarding captured output to the log and mapping a
/// non-zero exit to [`ToolError::NonZeroExit`].
fn exec_logged(ctx: &Context, tool: &str, invocation: &Invocation) -> Result<()> {
    ctx.log.info(&invocation.command_line());
    let result = ctx.executor.run(invocation)?;
    for line in result.stdout.lines() {
        ctx.log.debug(line);
    }
    for line in result.stderr.lines() {
        ctx.log.warn(line);
    }
    if !result.success {
        return Err(ToolError::NonZeroExit {
            tool: tool.to_string(),
            code: result.code.unwrap_or(-1),
        }
        .into());
    }
    Ok(())
}
