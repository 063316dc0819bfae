//! Build configurations parsed from `CMakeSettings.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::EvalError;

use super::environment::{EnvironmentMap, EnvironmentName, parse_environments};
use super::evaluator::PropertyEvaluator;
use super::{RawConfiguration, RawVariable};

/// Architecture tokens recognised at the end of a Visual Studio generator
/// name, in match priority order. `ARM64` must precede `ARM` because it is a
/// superstring; `Win64` maps to the `x64` platform name.
const VS_ARCHITECTURES: &[(&str, &str)] = &[
    ("x64", "x64"),
    ("Win32", "Win32"),
    ("Win64", "x64"),
    ("ARM64", "ARM64"),
    ("ARM", "ARM"),
];

/// One `-D` cache entry from a configuration's `variables` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CMakeVariable {
    /// Cache variable name.
    pub name: String,
    /// Cache variable value.
    pub value: String,
    /// Cache variable type (`string` when the file omits it).
    pub var_type: String,
}

impl CMakeVariable {
    /// Create a variable, defaulting the type to `string`.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>, var_type: Option<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            var_type: var_type.unwrap_or_else(|| "string".to_string()),
        }
    }
}

impl From<&RawVariable> for CMakeVariable {
    fn from(raw: &RawVariable) -> Self {
        Self::new(raw.name.clone(), raw.value.clone(), raw.var_type.clone())
    }
}

/// One build configuration entry.
///
/// Immutable after parsing, with one exception: the orchestrator may apply a
/// late build-directory override via [`Configuration::override_build_dir`].
/// [`Configuration::evaluate`] returns a *new* configuration rather than
/// mutating the receiver.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Configuration name as written in the settings file.
    pub name: String,
    /// Environments declared inside this configuration.
    pub environments: EnvironmentMap,
    /// Build directory (expression until evaluated).
    pub build_dir: String,
    /// Extra arguments for the configure step (template text).
    pub cmake_args: String,
    /// Extra arguments for the build step (template text).
    pub make_args: String,
    /// CMake generator name.
    pub generator: String,
    /// Build/configuration type (`Debug`, `Release`, ...).
    pub configuration_type: String,
    /// Resolved workspace root directory.
    pub workspace_root: PathBuf,
    /// Path of the settings file this configuration came from.
    pub settings_path: PathBuf,
    /// Toolchain file passed via `-DCMAKE_TOOLCHAIN_FILE`.
    pub cmake_toolchain: String,
    /// `-D` cache entries.
    pub variables: Vec<CMakeVariable>,
    /// Global environments to pull in, in list order.
    pub inherit_environments: Vec<EnvironmentName>,
}

impl Configuration {
    /// Replace the build directory after evaluation (orchestrator only).
    pub fn override_build_dir(&mut self, build_dir: String) {
        self.build_dir = build_dir;
    }

    /// Pass every expression-valued field through `evaluator`, returning a
    /// new configuration. Structural fields — `environments`,
    /// `workspace_root`, `settings_path`, `inherit_environments` — are
    /// carried over untouched.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ResolutionCycle`] if any field's expansion does
    /// not converge.
    pub fn evaluate(&self, evaluator: &PropertyEvaluator<'_>) -> Result<Self, EvalError> {
        let mut variables = Vec::with_capacity(self.variables.len());
        for variable in &self.variables {
            variables.push(CMakeVariable {
                name: variable.name.clone(),
                value: evaluator.evaluate_expression(&variable.value)?,
                var_type: variable.var_type.clone(),
            });
        }
        Ok(Self {
            name: evaluator.evaluate_expression(&self.name)?,
            environments: self.environments.clone(),
            build_dir: evaluator.evaluate_expression(&self.build_dir)?,
            cmake_args: evaluator.evaluate_expression(&self.cmake_args)?,
            make_args: evaluator.evaluate_expression(&self.make_args)?,
            generator: evaluator.evaluate_expression(&self.generator)?,
            configuration_type: evaluator.evaluate_expression(&self.configuration_type)?,
            workspace_root: self.workspace_root.clone(),
            settings_path: self.settings_path.clone(),
            cmake_toolchain: evaluator.evaluate_expression(&self.cmake_toolchain)?,
            variables,
            inherit_environments: self.inherit_environments.clone(),
        })
    }

    /// Build the process-environment overlay for this configuration.
    ///
    /// Applied in order, later writes winning: ambient global variables,
    /// then each inherited global environment in list order (names missing
    /// from the global map are silently skipped), then every
    /// configuration-local environment unconditionally. Keys are stripped
    /// of their namespace prefix.
    #[must_use]
    pub fn resolved_environment(&self, global: &EnvironmentMap) -> BTreeMap<String, String> {
        let mut resolved = BTreeMap::new();
        if let Some(ambient) = global.ambient() {
            for variable in ambient.variables() {
                resolved.insert(variable.stripped_name().to_string(), variable.value.clone());
            }
        }
        for name in &self.inherit_environments {
            if name.is_ambient() {
                continue; // already applied above
            }
            if let Some(environment) = global.get(name) {
                for variable in environment.variables() {
                    resolved.insert(variable.stripped_name().to_string(), variable.value.clone());
                }
            }
        }
        for environment in self.environments.iter() {
            for variable in environment.variables() {
                resolved.insert(variable.stripped_name().to_string(), variable.value.clone());
            }
        }
        resolved
    }

    /// Generator selection arguments for the configure step.
    ///
    /// Visual Studio generators carry the target architecture in their name;
    /// CMake wants it split out via `-A`. Architecture tokens are matched in
    /// [`VS_ARCHITECTURES`] priority order. All other generators pass
    /// through unchanged.
    #[must_use]
    pub fn generator_args(&self) -> Vec<String> {
        if self.generator.contains("Visual Studio") {
            for (token, architecture) in VS_ARCHITECTURES {
                if self.generator.contains(token) {
                    let name = self.generator.replace(token, "");
                    return vec![
                        format!("-G{}", name.trim()),
                        format!("-A{architecture}"),
                    ];
                }
            }
        }
        vec![format!("-G{}", self.generator)]
    }

    /// Build-step arguments required by multi-config generators.
    ///
    /// Visual Studio and `Ninja Multi-Config` select the configuration type
    /// at build time via `--config`; single-config generators return an
    /// empty list and get `-DCMAKE_BUILD_TYPE` at configure time instead.
    #[must_use]
    pub fn generator_build_args(&self) -> Vec<String> {
        if self.is_multi_config() && !self.configuration_type.is_empty() {
            vec!["--config".to_string(), self.configuration_type.clone()]
        } else {
            Vec::new()
        }
    }

    /// Whether the generator selects the configuration type at build time.
    #[must_use]
    pub fn is_multi_config(&self) -> bool {
        self.generator.contains("Visual Studio") || self.generator.contains("Ninja Multi-Config")
    }
}

/// Transform raw configuration objects into [`Configuration`] values,
/// order-preserving.
///
/// The build directory comes from `remoteBuildRoot` when `remoteMachineName`
/// is present (the remote-build divergence of the source format) and from
/// `buildRoot` otherwise.
#[must_use]
pub fn parse_configurations(
    raw: &[RawConfiguration],
    settings_path: &Path,
    workspace_root: &Path,
) -> Vec<Configuration> {
    raw.iter()
        .map(|configuration| {
            let build_dir = if configuration.remote_machine_name.is_some() {
                configuration.remote_build_root.clone().unwrap_or_default()
            } else {
                configuration.build_root.clone()
            };
            Configuration {
                name: configuration.name.clone(),
                environments: parse_environments(&configuration.environments),
                build_dir,
                cmake_args: configuration.cmake_command_args.clone(),
                make_args: configuration.build_command_args.clone(),
                generator: configuration.generator.clone(),
                configuration_type: configuration.configuration_type.clone(),
                workspace_root: workspace_root.to_path_buf(),
                settings_path: settings_path.to_path_buf(),
                cmake_toolchain: configuration.cmake_toolchain.clone(),
                variables: configuration.variables.iter().map(CMakeVariable::from).collect(),
                inherit_environments: configuration
                    .inherit_environments
                    .iter()
                    .map(|name| EnvironmentName::parse(name))
                    .collect(),
            }
        })
        .collect()
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
    use crate::settings::environment::RawEnvironment;
    use serde_json::json;

    fn minimal(name: &str, generator: &str, configuration_type: &str) -> Configuration {
        Configuration {
            name: name.to_string(),
            environments: EnvironmentMap::new(),
            build_dir: String::new(),
            cmake_args: String::new(),
            make_args: String::new(),
            generator: generator.to_string(),
            configuration_type: configuration_type.to_string(),
            workspace_root: PathBuf::from("/ws"),
            settings_path: PathBuf::from("/ws/CMakeSettings.json"),
            cmake_toolchain: String::new(),
            variables: Vec::new(),
            inherit_environments: Vec::new(),
        }
    }

    fn raw_env(value: serde_json::Value) -> RawEnvironment {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    // -----------------------------------------------------------------------
    // Generator arguments
    // -----------------------------------------------------------------------

    #[test]
    fn visual_studio_x64_is_split_into_g_and_a() {
        let configuration = minimal("c", "Visual Studio 16 2019 x64", "Debug");
        assert_eq!(
            configuration.generator_args(),
            vec!["-GVisual Studio 16 2019", "-Ax64"]
        );
    }

    #[test]
    fn arm64_wins_over_arm() {
        let configuration = minimal("c", "Visual Studio 16 2019 ARM64", "Debug");
        assert_eq!(
            configuration.generator_args(),
            vec!["-GVisual Studio 16 2019", "-AARM64"]
        );
    }

    #[test]
    fn win64_maps_to_x64_platform() {
        let configuration = minimal("c", "Visual Studio 15 2017 Win64", "Debug");
        assert_eq!(
            configuration.generator_args(),
            vec!["-GVisual Studio 15 2017", "-Ax64"]
        );
    }

    #[test]
    fn visual_studio_without_architecture_passes_through() {
        let configuration = minimal("c", "Visual Studio 17 2022", "Debug");
        assert_eq!(
            configuration.generator_args(),
            vec!["-GVisual Studio 17 2022"]
        );
    }

    #[test]
    fn non_visual_studio_generators_pass_through() {
        let configuration = minimal("c", "Unix Makefiles", "Debug");
        assert_eq!(configuration.generator_args(), vec!["-GUnix Makefiles"]);
    }

    // -----------------------------------------------------------------------
    // Build arguments (multi-config vs single-config)
    // -----------------------------------------------------------------------

    #[test]
    fn multi_config_generators_take_config_at_build_time() {
        for generator in ["Visual Studio 16 2019 x64", "Ninja Multi-Config"] {
            let configuration = minimal("c", generator, "RelWithDebInfo");
            assert_eq!(
                configuration.generator_build_args(),
                vec!["--config", "RelWithDebInfo"],
                "generator: {generator}"
            );
        }
    }

    #[test]
    fn single_config_generators_have_no_build_args() {
        for generator in ["Unix Makefiles", "Ninja"] {
            let configuration = minimal("c", generator, "Release");
            assert!(
                configuration.generator_build_args().is_empty(),
                "generator: {generator}"
            );
        }
    }

    // -----------------------------------------------------------------------
    // Resolved environment
    // -----------------------------------------------------------------------

    #[test]
    fn inherited_environments_apply_and_unused_do_not() {
        let global = parse_environments(&[
            raw_env(json!({"environment": "used", "FromUsed": "yes"})),
            raw_env(json!({"environment": "unused", "FromUnused": "no"})),
            raw_env(json!({"Ambient": "always"})),
        ]);
        let mut configuration = minimal("c", "Ninja", "Debug");
        configuration.inherit_environments = vec![EnvironmentName::parse("used")];
        let resolved = configuration.resolved_environment(&global);
        assert_eq!(resolved.get("FromUsed").map(String::as_str), Some("yes"));
        assert!(!resolved.contains_key("FromUnused"));
        assert_eq!(resolved.get("Ambient").map(String::as_str), Some("always"));
    }

    #[test]
    fn local_variables_override_inherited_ones() {
        let global = parse_environments(&[raw_env(
            json!({"environment": "linux", "BuildType": "Release"}),
        )]);
        let mut configuration = minimal("c", "Ninja", "Debug");
        configuration.inherit_environments = vec![EnvironmentName::parse("linux")];
        configuration.environments =
            parse_environments(&[raw_env(json!({"BuildType": "Debug"}))]);
        let resolved = configuration.resolved_environment(&global);
        assert_eq!(resolved.get("BuildType").map(String::as_str), Some("Debug"));
    }

    #[test]
    fn local_environments_apply_even_when_named() {
        // Local environments are applied unconditionally, inheritance lists
        // only gate the global map.
        let mut configuration = minimal("c", "Ninja", "Debug");
        configuration.environments = parse_environments(&[raw_env(
            json!({"environment": "notInherited", "LocalVar": "1"}),
        )]);
        let resolved = configuration.resolved_environment(&EnvironmentMap::new());
        assert_eq!(resolved.get("LocalVar").map(String::as_str), Some("1"));
    }

    #[test]
    fn missing_inherited_environment_is_silently_skipped() {
        let mut configuration = minimal("c", "Ninja", "Debug");
        configuration.inherit_environments = vec![EnvironmentName::parse("ghost")];
        let resolved = configuration.resolved_environment(&EnvironmentMap::new());
        assert!(resolved.is_empty());
    }

    #[test]
    fn namespace_prefix_is_stripped_from_keys() {
        let mut configuration = minimal("c", "Ninja", "Debug");
        configuration.environments =
            parse_environments(&[raw_env(json!({"VERBOSE": "1"}))]);
        let resolved = configuration.resolved_environment(&EnvironmentMap::new());
        // Parsed as env.VERBOSE, exported as VERBOSE.
        assert_eq!(resolved.get("VERBOSE").map(String::as_str), Some("1"));
    }

    // -----------------------------------------------------------------------
    // parse_configurations
    // -----------------------------------------------------------------------

    fn raw_configuration(value: serde_json::Value) -> RawConfiguration {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn build_root_selects_local_or_remote() {
        let local = raw_configuration(json!({
            "name": "Local",
            "generator": "Ninja",
            "buildRoot": "/b/local",
            "remoteBuildRoot": "/b/remote"
        }));
        let remote = raw_configuration(json!({
            "name": "Remote",
            "generator": "Ninja",
            "buildRoot": "/b/local",
            "remoteMachineName": "devbox",
            "remoteBuildRoot": "/b/remote"
        }));
        let configurations = parse_configurations(
            &[local, remote],
            Path::new("/ws/CMakeSettings.json"),
            Path::new("/ws"),
        );
        assert_eq!(configurations[0].build_dir, "/b/local");
        assert_eq!(configurations[1].build_dir, "/b/remote");
    }

    #[test]
    fn variable_type_defaults_to_string() {
        let configuration = raw_configuration(json!({
            "name": "c",
            "generator": "Ninja",
            "buildRoot": "/b",
            "variables": [
                {"name": "A", "value": "1"},
                {"name": "B", "value": "ON", "type": "BOOL"}
            ]
        }));
        let parsed = parse_configurations(
            &[configuration],
            Path::new("/ws/CMakeSettings.json"),
            Path::new("/ws"),
        );
        assert_eq!(parsed[0].variables[0].var_type, "string");
        assert_eq!(parsed[0].variables[1].var_type, "BOOL");
    }

    #[test]
    fn evaluate_does_not_mutate_the_receiver() {
        let global = parse_environments(&[raw_env(json!({"Flavor": "Release"}))]);
        let mut configuration = minimal("c", "Ninja", "${env.Flavor}");
        configuration.environments = EnvironmentMap::new();
        let log = crate::logging::Logger::new();
        let evaluator = PropertyEvaluator::new(&configuration, &global, &log);
        let evaluated = configuration.evaluate(&evaluator).unwrap();
        assert_eq!(evaluated.configuration_type, "Release");
        assert_eq!(configuration.configuration_type, "${env.Flavor}");
    }

    #[test]
    fn evaluate_preserves_structural_fields() {
        let global = EnvironmentMap::new();
        let mut configuration = minimal("c", "Ninja", "Debug");
        configuration.inherit_environments = vec![EnvironmentName::parse("linux")];
        configuration.environments = parse_environments(&[raw_env(json!({"K": "${v}"}))]);
        let log = crate::logging::Logger::new();
        let evaluator = PropertyEvaluator::new(&configuration, &global, &log);
        let evaluated = configuration.evaluate(&evaluator).unwrap();
        assert_eq!(evaluated.inherit_environments, configuration.inherit_environments);
        // Local environment variables stay unevaluated (structural).
        assert_eq!(
            evaluated.environments.ambient().unwrap().lookup("env.K"),
            Some("${v}")
        );
        assert_eq!(evaluated.workspace_root, configuration.workspace_root);
        assert_eq!(evaluated.settings_path, configuration.settings_path);
    }

    #[test]
    fn override_build_dir_replaces_value() {
        let mut configuration = minimal("c", "Ninja", "Debug");
        configuration.override_build_dir("/elsewhere".to_string());
        assert_eq!(configuration.build_dir, "/elsewhere");
    }
}
