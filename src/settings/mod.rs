//! `CMakeSettings.json` parsing and the typed settings model.
//!
//! The raw serde structures here mirror the file format; the typed model
//! ([`EnvironmentMap`], [`Configuration`]) lives in the submodules. Loading
//! is: read → strip `//` comments → parse JSON → transform.

pub mod arglist;
pub mod comments;
pub mod configuration;
pub mod environment;
pub mod evaluator;

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::operations::FileSystemOps;

use configuration::{Configuration, parse_configurations};
use environment::{EnvironmentMap, RawEnvironment, parse_environments};

/// Top-level raw document: optional global environments, required
/// configurations. Unknown keys (intellisense settings and friends) are
/// ignored.
#[derive(Debug, Deserialize)]
pub struct RawSettings {
    /// Global environment blocks, in file order.
    #[serde(default)]
    pub environments: Vec<RawEnvironment>,
    /// Build configuration entries, in file order.
    pub configurations: Vec<RawConfiguration>,
}

/// One raw configuration object as written in the file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConfiguration {
    /// Configuration name (the only required key).
    pub name: String,
    /// CMake generator name.
    #[serde(default)]
    pub generator: String,
    /// Build type (`Debug`, `Release`, ...).
    #[serde(default)]
    pub configuration_type: String,
    /// Build directory for local builds.
    #[serde(default)]
    pub build_root: String,
    /// Remote host name; its presence switches to `remote_build_root`.
    #[serde(default)]
    pub remote_machine_name: Option<String>,
    /// Build directory used when `remote_machine_name` is present.
    #[serde(default)]
    pub remote_build_root: Option<String>,
    /// Argument template for the configure step.
    #[serde(default)]
    pub cmake_command_args: String,
    /// Argument template for the build step.
    #[serde(default)]
    pub build_command_args: String,
    /// Toolchain file path.
    #[serde(default)]
    pub cmake_toolchain: String,
    /// `-D` cache entries.
    #[serde(default)]
    pub variables: Vec<RawVariable>,
    /// Names of global environments to inherit, in order.
    #[serde(default)]
    pub inherit_environments: Vec<String>,
    /// Environment blocks local to this configuration.
    #[serde(default)]
    pub environments: Vec<RawEnvironment>,
}

/// One raw entry of a configuration's `variables` list.
#[derive(Debug, Deserialize)]
pub struct RawVariable {
    /// Cache variable name.
    pub name: String,
    /// Cache variable value.
    pub value: String,
    /// Cache variable type; defaults to `string` when absent.
    #[serde(rename = "type")]
    pub var_type: Option<String>,
}

/// A fully parsed settings document.
#[derive(Debug)]
pub struct CMakeSettings {
    /// Document-global environments.
    pub environments: EnvironmentMap,
    /// Configurations in file order.
    pub configurations: Vec<Configuration>,
}

impl CMakeSettings {
    /// Load and parse a settings file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the file is missing, unreadable, or
    /// not valid JSON after comment stripping.
    pub fn load(
        fs_ops: &dyn FileSystemOps,
        settings_path: &Path,
        workspace_root: &Path,
    ) -> Result<Self, ConfigError> {
        if !fs_ops.exists(settings_path) {
            return Err(ConfigError::NotFound {
                path: settings_path.display().to_string(),
            });
        }
        let text = fs_ops
            .read_to_string(settings_path)
            .map_err(|source| ConfigError::Io {
                path: settings_path.display().to_string(),
                source,
            })?;
        let stripped = comments::strip_comments(&text);
        let raw: RawSettings =
            serde_json::from_str(&stripped).map_err(|e| ConfigError::Parse {
                path: settings_path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            environments: parse_environments(&raw.environments),
            configurations: parse_configurations(&raw.configurations, settings_path, workspace_root),
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::operations::MockFileSystemOps;
    use std::path::PathBuf;

    const SETTINGS: &str = r#"
// Machine-generated by Visual Studio
{
  "environments": [
    { "BuildDir": "${workspaceRoot}/build" },
    { "environment": "linux", "BuildType": "Release" }
  ],
  "configurations": [
    {
      "name": "Linux Release", // the good one
      "generator": "Unix Makefiles",
      "configurationType": "Release",
      "inheritEnvironments": ["linux"],
      "buildRoot": "${env.BuildDir}/${name}",
      "cmakeCommandArgs": "-Wdev",
      "variables": [{ "name": "ENABLE_TESTS", "value": "ON", "type": "BOOL" }]
    }
  ]
}
"#;

    #[test]
    fn load_parses_comments_environments_and_configurations() {
        let path = PathBuf::from("/ws/CMakeSettings.json");
        let fs = MockFileSystemOps::new().with_file(&path, SETTINGS);
        let settings = CMakeSettings::load(&fs, &path, Path::new("/ws")).unwrap();
        assert!(!settings.environments.is_empty());
        assert_eq!(settings.configurations.len(), 1);
        let configuration = &settings.configurations[0];
        assert_eq!(configuration.name, "Linux Release");
        assert_eq!(configuration.build_dir, "${env.BuildDir}/${name}");
        assert_eq!(configuration.variables[0].var_type, "BOOL");
        assert_eq!(configuration.workspace_root, PathBuf::from("/ws"));
        assert_eq!(configuration.settings_path, path);
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let fs = MockFileSystemOps::new();
        let err = CMakeSettings::load(&fs, Path::new("/absent.json"), Path::new("/ws"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn load_invalid_json_is_a_parse_error() {
        let path = PathBuf::from("/ws/CMakeSettings.json");
        let fs = MockFileSystemOps::new().with_file(&path, "{ not json ");
        let err = CMakeSettings::load(&fs, &path, Path::new("/ws")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn unknown_keys_are_tolerated() {
        let path = PathBuf::from("/ws/CMakeSettings.json");
        let fs = MockFileSystemOps::new().with_file(
            &path,
            r#"{ "configurations": [ { "name": "c", "intelliSenseMode": "linux-gcc-x64" } ] }"#,
        );
        let settings = CMakeSettings::load(&fs, &path, Path::new("/ws")).unwrap();
        assert_eq!(settings.configurations.len(), 1);
    }
}
