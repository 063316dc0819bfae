//! Property-expression evaluation: scoped `${var}` resolution.
//!
//! Each configuration gets its own evaluator, bound to the configuration,
//! the document-global environment map, and a logger. Resolution walks a
//! fixed tier order — synthetic locals, inherited locals, the local ambient
//! environment, inherited globals, the global ambient environment, then the
//! real process environment for `env.`-prefixed names — and expression
//! expansion repeats until a full pass substitutes nothing (fixed point).
//! Unresolvable tokens are left literal by design; definitions that never
//! converge are reported as a cycle error instead of looping.

use std::sync::LazyLock;

use md5::{Digest, Md5};
use regex::Regex;

use crate::error::EvalError;
use crate::logging::Log;

use super::configuration::Configuration;
use super::environment::{Environment, EnvironmentMap, EnvironmentName, Variable};

/// `${name}` occurrences; braces cannot nest.
#[allow(clippy::expect_used)]
static VAR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^{}]+)\}").expect("token pattern is valid"));

/// Upper bound on fixed-point passes before a definition is declared cyclic.
const MAX_PASSES: usize = 64;

/// Per-configuration `${var}` resolver.
pub struct PropertyEvaluator<'a> {
    configuration: &'a Configuration,
    global_environments: &'a EnvironmentMap,
    /// Synthetic bindings derived from the configuration and its file path.
    /// Namespace-free and never visible to `inheritEnvironments`.
    local: Environment,
    log: &'a dyn Log,
}

impl std::fmt::Debug for PropertyEvaluator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyEvaluator")
            .field("configuration", &self.configuration.name)
            .field("local", &self.local)
            .finish_non_exhaustive()
    }
}

impl<'a> PropertyEvaluator<'a> {
    /// Bind an evaluator to one configuration and the global environments.
    #[must_use]
    pub fn new(
        configuration: &'a Configuration,
        global_environments: &'a EnvironmentMap,
        log: &'a dyn Log,
    ) -> Self {
        let mut local = Environment::new(EnvironmentName::Ambient);
        let settings_dir = configuration
            .settings_path
            .parent()
            .map_or_else(std::path::PathBuf::new, std::path::Path::to_path_buf);
        let project_dir_name = settings_dir
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().to_string());

        local.add_variable(Variable::new("name", configuration.name.clone()));
        local.add_variable(Variable::new("generator", configuration.generator.clone()));
        local.add_variable(Variable::new(
            "workspaceRoot",
            configuration.workspace_root.display().to_string(),
        ));
        local.add_variable(Variable::new(
            "thisFile",
            configuration.settings_path.display().to_string(),
        ));
        local.add_variable(Variable::new(
            "projectFile",
            settings_dir.join("CMakeLists.txt").display().to_string(),
        ));
        local.add_variable(Variable::new(
            "projectDir",
            settings_dir.display().to_string(),
        ));
        local.add_variable(Variable::new("projectDirName", project_dir_name));
        local.add_variable(Variable::new(
            "workspaceHash",
            path_hash(&configuration.settings_path),
        ));

        Self {
            configuration,
            global_environments,
            local,
            log,
        }
    }

    /// Resolve a single variable name through the tier order; `None` means
    /// unresolved (distinct from an empty value).
    #[must_use]
    pub fn evaluate_variable(&self, name: &str) -> Option<String> {
        if let Some(value) = self.local.lookup(name) {
            self.log.debug(&format!("'{name}' resolved from local bindings"));
            return Some(value.to_string());
        }
        for environment_name in &self.configuration.inherit_environments {
            if let Some(value) = self
                .configuration
                .environments
                .get(environment_name)
                .and_then(|environment| environment.lookup(name))
            {
                self.log.debug(&format!(
                    "'{name}' resolved from local environment '{environment_name}'"
                ));
                return Some(value.to_string());
            }
        }
        if let Some(value) = self
            .configuration
            .environments
            .ambient()
            .and_then(|environment| environment.lookup(name))
        {
            self.log
                .debug(&format!("'{name}' resolved from the local ambient environment"));
            return Some(value.to_string());
        }
        for environment_name in &self.configuration.inherit_environments {
            if let Some(value) = self
                .global_environments
                .get(environment_name)
                .and_then(|environment| environment.lookup(name))
            {
                self.log.debug(&format!(
                    "'{name}' resolved from global environment '{environment_name}'"
                ));
                return Some(value.to_string());
            }
        }
        if let Some(value) = self
            .global_environments
            .ambient()
            .and_then(|environment| environment.lookup(name))
        {
            self.log
                .debug(&format!("'{name}' resolved from the global ambient environment"));
            return Some(value.to_string());
        }
        if let Some(rest) = name.strip_prefix("env.") {
            if let Ok(value) = std::env::var(rest) {
                self.log
                    .debug(&format!("'{name}' resolved from the process environment"));
                return Some(value);
            }
        }
        None
    }

    /// Expand every resolvable `${name}` token in `expr`, re-scanning until
    /// a pass substitutes nothing. Unresolvable tokens stay literal in the
    /// output.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ResolutionCycle`] when the expansion keeps
    /// substituting past the pass limit, which only happens for
    /// self-referential definitions.
    pub fn evaluate_expression(&self, expr: &str) -> Result<String, EvalError> {
        let mut result = expr.to_string();
        for _ in 0..MAX_PASSES {
            let names: Vec<String> = {
                let mut seen = Vec::new();
                for captures in VAR_TOKEN.captures_iter(&result) {
                    if let Some(name) = captures.get(1) {
                        let name = name.as_str().to_string();
                        if !seen.contains(&name) {
                            seen.push(name);
                        }
                    }
                }
                seen
            };
            if names.is_empty() {
                return Ok(result);
            }
            let mut substituted = false;
            for name in &names {
                if let Some(value) = self.evaluate_variable(name) {
                    result = result.replace(&format!("${{{name}}}"), &value);
                    substituted = true;
                }
            }
            if !substituted {
                // Fixed point: whatever tokens remain are unresolvable and
                // stay visible for debugging.
                return Ok(result);
            }
        }
        Err(EvalError::ResolutionCycle {
            expression: expr.to_string(),
        })
    }
}

/// Stable hex digest of a settings-file path, used to build unique
/// per-workspace cache directories.
fn path_hash(path: &std::path::Path) -> String {
    let mut hasher = Md5::new();
    hasher.update(path.display().to_string().as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::logging::Logger;
    use crate::settings::environment::{RawEnvironment, parse_environments};
    use serde_json::json;
    use std::path::PathBuf;

    fn raw_env(value: serde_json::Value) -> RawEnvironment {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn configuration_with(
        inherit: &[&str],
        local: EnvironmentMap,
    ) -> Configuration {
        Configuration {
            name: "Linux Release".to_string(),
            environments: local,
            build_dir: String::new(),
            cmake_args: String::new(),
            make_args: String::new(),
            generator: "Ninja".to_string(),
            configuration_type: "Release".to_string(),
            workspace_root: PathBuf::from("/ws"),
            settings_path: PathBuf::from("/ws/project/CMakeSettings.json"),
            cmake_toolchain: String::new(),
            variables: Vec::new(),
            inherit_environments: inherit.iter().map(|n| EnvironmentName::parse(n)).collect(),
        }
    }

    // -----------------------------------------------------------------------
    // Synthetic local bindings
    // -----------------------------------------------------------------------

    #[test]
    fn synthetic_bindings_resolve() {
        let global = EnvironmentMap::new();
        let configuration = configuration_with(&[], EnvironmentMap::new());
        let log = Logger::new();
        let evaluator = PropertyEvaluator::new(&configuration, &global, &log);
        assert_eq!(
            evaluator.evaluate_variable("name").as_deref(),
            Some("Linux Release")
        );
        assert_eq!(evaluator.evaluate_variable("generator").as_deref(), Some("Ninja"));
        assert_eq!(
            evaluator.evaluate_variable("workspaceRoot").as_deref(),
            Some("/ws")
        );
        assert_eq!(
            evaluator.evaluate_variable("thisFile").as_deref(),
            Some("/ws/project/CMakeSettings.json")
        );
        assert_eq!(
            evaluator.evaluate_variable("projectFile").as_deref(),
            Some("/ws/project/CMakeLists.txt")
        );
        assert_eq!(
            evaluator.evaluate_variable("projectDir").as_deref(),
            Some("/ws/project")
        );
        assert_eq!(
            evaluator.evaluate_variable("projectDirName").as_deref(),
            Some("project")
        );
    }

    #[test]
    fn workspace_hash_is_stable_md5_hex() {
        let global = EnvironmentMap::new();
        let configuration = configuration_with(&[], EnvironmentMap::new());
        let log = Logger::new();
        let evaluator = PropertyEvaluator::new(&configuration, &global, &log);
        let hash = evaluator.evaluate_variable("workspaceHash").unwrap();
        assert_eq!(hash.len(), 32);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        // Same path, same digest.
        let again = PropertyEvaluator::new(&configuration, &global, &log)
            .evaluate_variable("workspaceHash")
            .unwrap();
        assert_eq!(hash, again);
    }

    // -----------------------------------------------------------------------
    // Search-order tiers
    // -----------------------------------------------------------------------

    #[test]
    fn local_inherited_wins_over_global_inherited() {
        let global =
            parse_environments(&[raw_env(json!({"environment": "tools", "Flag": "global"}))]);
        let local =
            parse_environments(&[raw_env(json!({"environment": "tools", "Flag": "local"}))]);
        let configuration = configuration_with(&["tools"], local);
        let log = Logger::new();
        let evaluator = PropertyEvaluator::new(&configuration, &global, &log);
        assert_eq!(
            evaluator.evaluate_variable("env.Flag").as_deref(),
            Some("local")
        );
    }

    #[test]
    fn local_ambient_wins_over_global_tiers() {
        let global = parse_environments(&[raw_env(json!({"X": "global-ambient"}))]);
        let local = parse_environments(&[raw_env(json!({"X": "local-ambient"}))]);
        let configuration = configuration_with(&[], local);
        let log = Logger::new();
        let evaluator = PropertyEvaluator::new(&configuration, &global, &log);
        assert_eq!(
            evaluator.evaluate_variable("env.X").as_deref(),
            Some("local-ambient")
        );
    }

    #[test]
    fn inherited_environments_search_in_list_order() {
        let global = parse_environments(&[
            raw_env(json!({"environment": "first", "V": "1"})),
            raw_env(json!({"environment": "second", "V": "2"})),
        ]);
        let configuration = configuration_with(&["second", "first"], EnvironmentMap::new());
        let log = Logger::new();
        let evaluator = PropertyEvaluator::new(&configuration, &global, &log);
        assert_eq!(evaluator.evaluate_variable("env.V").as_deref(), Some("2"));
    }

    #[test]
    fn uninherited_global_environment_is_invisible() {
        let global =
            parse_environments(&[raw_env(json!({"environment": "hidden", "V": "x"}))]);
        let configuration = configuration_with(&[], EnvironmentMap::new());
        let log = Logger::new();
        let evaluator = PropertyEvaluator::new(&configuration, &global, &log);
        assert_eq!(evaluator.evaluate_variable("env.V"), None);
    }

    #[test]
    fn env_prefix_falls_back_to_process_environment() {
        let global = EnvironmentMap::new();
        let configuration = configuration_with(&[], EnvironmentMap::new());
        let log = Logger::new();
        let evaluator = PropertyEvaluator::new(&configuration, &global, &log);
        // PATH exists in any reasonable test environment.
        assert!(evaluator.evaluate_variable("env.PATH").is_some());
        assert_eq!(
            evaluator.evaluate_variable("env.CMAKESETTINGS_SURELY_UNSET_12345"),
            None
        );
    }

    #[test]
    fn miss_is_distinct_from_empty_value() {
        let global = parse_environments(&[raw_env(json!({"Empty": ""}))]);
        let configuration = configuration_with(&[], EnvironmentMap::new());
        let log = Logger::new();
        let evaluator = PropertyEvaluator::new(&configuration, &global, &log);
        assert_eq!(evaluator.evaluate_variable("env.Empty").as_deref(), Some(""));
        assert_eq!(evaluator.evaluate_variable("env.Missing"), None);
    }

    // -----------------------------------------------------------------------
    // Expression expansion
    // -----------------------------------------------------------------------

    #[test]
    fn resolvable_tokens_substitute() {
        let global = parse_environments(&[raw_env(json!({"BuildDir": "/tmp/build"}))]);
        let configuration = configuration_with(&[], EnvironmentMap::new());
        let log = Logger::new();
        let evaluator = PropertyEvaluator::new(&configuration, &global, &log);
        assert_eq!(
            evaluator
                .evaluate_expression("${env.BuildDir}/${name}")
                .unwrap(),
            "/tmp/build/Linux Release"
        );
    }

    #[test]
    fn transitive_references_expand_to_fixed_point() {
        let global = parse_environments(&[raw_env(json!({
            "Root": "/data",
            "Cache": "${env.Root}/cache",
            "Out": "${env.Cache}/out"
        }))]);
        let configuration = configuration_with(&[], EnvironmentMap::new());
        let log = Logger::new();
        let evaluator = PropertyEvaluator::new(&configuration, &global, &log);
        assert_eq!(
            evaluator.evaluate_expression("${env.Out}").unwrap(),
            "/data/cache/out"
        );
    }

    #[test]
    fn unresolvable_tokens_stay_literal() {
        let global = parse_environments(&[raw_env(json!({"Known": "v"}))]);
        let configuration = configuration_with(&[], EnvironmentMap::new());
        let log = Logger::new();
        let evaluator = PropertyEvaluator::new(&configuration, &global, &log);
        assert_eq!(
            evaluator
                .evaluate_expression("${env.Known}-${env.Unknown}")
                .unwrap(),
            "v-${env.Unknown}"
        );
    }

    #[test]
    fn evaluation_is_idempotent_for_fully_resolvable_expressions() {
        let global = parse_environments(&[raw_env(json!({"A": "alpha"}))]);
        let configuration = configuration_with(&[], EnvironmentMap::new());
        let log = Logger::new();
        let evaluator = PropertyEvaluator::new(&configuration, &global, &log);
        let once = evaluator.evaluate_expression("x-${env.A}").unwrap();
        let twice = evaluator.evaluate_expression(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn self_referential_definition_is_a_cycle_error() {
        let global = parse_environments(&[raw_env(json!({"Loop": "${env.Loop}/again"}))]);
        let configuration = configuration_with(&[], EnvironmentMap::new());
        let log = Logger::new();
        let evaluator = PropertyEvaluator::new(&configuration, &global, &log);
        let err = evaluator.evaluate_expression("${env.Loop}").unwrap_err();
        assert!(matches!(err, EvalError::ResolutionCycle { .. }));
    }

    #[test]
    fn mutually_recursive_definitions_are_a_cycle_error() {
        let global = parse_environments(&[raw_env(json!({
            "A": "${env.B}",
            "B": "${env.A}"
        }))]);
        let configuration = configuration_with(&[], EnvironmentMap::new());
        let log = Logger::new();
        let evaluator = PropertyEvaluator::new(&configuration, &global, &log);
        let err = evaluator.evaluate_expression("${env.A}").unwrap_err();
        assert!(matches!(err, EvalError::ResolutionCycle { .. }));
    }

    #[test]
    fn expression_without_tokens_passes_through() {
        let global = EnvironmentMap::new();
        let configuration = configuration_with(&[], EnvironmentMap::new());
        let log = Logger::new();
        let evaluator = PropertyEvaluator::new(&configuration, &global, &log);
        assert_eq!(
            evaluator.evaluate_expression("-DFOO=bar").unwrap(),
            "-DFOO=bar"
        );
    }
}
