//! Environments: named bags of variables, inheritable by name.
//!
//! A `CMakeSettings.json` document declares environments at the top level
//! (global) and inside each configuration (local). Reserved names — the
//! empty string, `env`, and the `unnamed` sentinel — denote the *ambient*
//! environment, which applies to every configuration without being listed in
//! `inheritEnvironments`. That distinction is resolved once at parse time
//! into [`EnvironmentName`] rather than re-compared as strings later.

use serde_json::Value;

/// Ordered key/value object as it appears in the raw JSON document.
pub type RawEnvironment = serde_json::Map<String, Value>;

/// Name under which an environment is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentName {
    /// Applied to every configuration, regardless of inheritance lists.
    Ambient,
    /// Applied only when listed in a configuration's `inheritEnvironments`.
    Named(String),
}

impl EnvironmentName {
    /// Parse a raw environment name, collapsing the reserved spellings
    /// (empty, `env`, `unnamed`; case-insensitive) into [`Self::Ambient`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() || raw.eq_ignore_ascii_case("env") || raw.eq_ignore_ascii_case("unnamed")
        {
            Self::Ambient
        } else {
            Self::Named(raw.to_string())
        }
    }

    /// Whether this is the ambient (always-applied) environment.
    #[must_use]
    pub const fn is_ambient(&self) -> bool {
        matches!(self, Self::Ambient)
    }
}

impl std::fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ambient => f.write_str("unnamed"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// A single name/value pair belonging to an environment.
///
/// The name may carry a dotted namespace prefix (`env.PATH`); the prefix is
/// significant for `${...}` lookup but stripped when the variable is written
/// into a resolved process-environment overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Full variable name, possibly namespace-prefixed.
    pub name: String,
    /// Literal value (expressions inside values are expanded lazily by the
    /// evaluator, not here).
    pub value: String,
}

impl Variable {
    /// Create a new variable.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The name with everything up to and including the first `.` removed.
    ///
    /// Names without a dot are returned unchanged.
    #[must_use]
    pub fn stripped_name(&self) -> &str {
        match self.name.split_once('.') {
            Some((_, rest)) => rest,
            None => &self.name,
        }
    }
}

/// A named, ordered collection of [`Variable`]s.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Name under which the environment is registered.
    pub name: EnvironmentName,
    variables: Vec<Variable>,
}

impl Environment {
    /// Create an empty environment.
    #[must_use]
    pub const fn new(name: EnvironmentName) -> Self {
        Self {
            name,
            variables: Vec::new(),
        }
    }

    /// Append a variable. Duplicate names are kept; lookup returns the
    /// first hit.
    pub fn add_variable(&mut self, variable: Variable) {
        self.variables.push(variable);
    }

    /// Read-only ordered view of the variables.
    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Exact-name lookup, first hit wins.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.value.as_str())
    }
}

/// Insertion-ordered mapping from [`EnvironmentName`] to [`Environment`].
///
/// Parsing the same name twice appends to the existing entry instead of
/// replacing it.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentMap {
    entries: Vec<Environment>,
}

impl EnvironmentMap {
    /// Create an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Look up an environment by name.
    #[must_use]
    pub fn get(&self, name: &EnvironmentName) -> Option<&Environment> {
        self.entries.iter().find(|e| &e.name == name)
    }

    /// The ambient environment, if any block declared one.
    #[must_use]
    pub fn ambient(&self) -> Option<&Environment> {
        self.get(&EnvironmentName::Ambient)
    }

    /// Iterate environments in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Environment> {
        self.entries.iter()
    }

    /// Whether the map holds no environments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append `variables` to the environment registered under `name`,
    /// creating it when absent.
    pub fn add_variables(&mut self, name: EnvironmentName, variables: Vec<Variable>) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.name == name) {
            for variable in variables {
                existing.add_variable(variable);
            }
            return;
        }
        let mut environment = Environment::new(name);
        for variable in variables {
            environment.add_variable(variable);
        }
        self.entries.push(environment);
    }
}

/// Render a raw JSON value as a variable value.
///
/// Strings are taken verbatim; anything else keeps its JSON rendering
/// (numbers and booleans show up in real settings files).
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse an ordered sequence of raw environment objects into an
/// [`EnvironmentMap`].
///
/// Within one object, the key `environment` names the environment (default:
/// the unnamed sentinel, i.e. ambient) and the key `namespace` sets the
/// prefix applied to subsequent bare keys (default `env`; an empty namespace
/// disables prefixing). Keys that already contain a dot are never prefixed.
/// Objects resolving to the same name merge by appending.
#[must_use]
pub fn parse_environments(raw: &[RawEnvironment]) -> EnvironmentMap {
    let mut map = EnvironmentMap::new();
    for object in raw {
        let mut namespace = "env".to_string();
        let mut name = EnvironmentName::Ambient;
        let mut variables = Vec::new();
        for (key, value) in object {
            match key.as_str() {
                "environment" => name = EnvironmentName::parse(&value_to_string(value)),
                "namespace" => namespace = value_to_string(value),
                _ => {
                    let variable_name = if key.contains('.') || namespace.is_empty() {
                        key.clone()
                    } else {
                        format!("{namespace}.{key}")
                    };
                    variables.push(Variable::new(variable_name, value_to_string(value)));
                }
            }
        }
        map.add_variables(name, variables);
    }
    map
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
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawEnvironment {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    // -----------------------------------------------------------------------
    // EnvironmentName
    // -----------------------------------------------------------------------

    #[test]
    fn reserved_names_are_ambient() {
        assert!(EnvironmentName::parse("").is_ambient());
        assert!(EnvironmentName::parse("env").is_ambient());
        assert!(EnvironmentName::parse("Env").is_ambient());
        assert!(EnvironmentName::parse("unnamed").is_ambient());
        assert!(EnvironmentName::parse("UNNAMED").is_ambient());
        assert!(!EnvironmentName::parse("linux").is_ambient());
    }

    // -----------------------------------------------------------------------
    // Variable
    // -----------------------------------------------------------------------

    #[test]
    fn stripped_name_removes_first_namespace_segment() {
        assert_eq!(Variable::new("env.PATH", "").stripped_name(), "PATH");
        assert_eq!(Variable::new("PATH", "").stripped_name(), "PATH");
        assert_eq!(Variable::new("a.b.c", "").stripped_name(), "b.c");
    }

    // -----------------------------------------------------------------------
    // Environment lookup
    // -----------------------------------------------------------------------

    #[test]
    fn lookup_is_exact_and_first_hit() {
        let mut env = Environment::new(EnvironmentName::Ambient);
        env.add_variable(Variable::new("env.A", "first"));
        env.add_variable(Variable::new("env.A", "second"));
        assert_eq!(env.lookup("env.A"), Some("first"));
        assert_eq!(env.lookup("A"), None, "lookup must not strip namespaces");
    }

    // -----------------------------------------------------------------------
    // parse_environments
    // -----------------------------------------------------------------------

    #[test]
    fn default_namespace_prefixes_bare_keys() {
        let map = parse_environments(&[raw(json!({"BuildDir": "/tmp/build"}))]);
        let ambient = map.ambient().unwrap();
        assert_eq!(ambient.lookup("env.BuildDir"), Some("/tmp/build"));
    }

    #[test]
    fn dotted_keys_are_never_prefixed() {
        let map = parse_environments(&[raw(json!({"custom.Key": "v"}))]);
        assert_eq!(map.ambient().unwrap().lookup("custom.Key"), Some("v"));
    }

    #[test]
    fn explicit_namespace_applies_to_later_keys() {
        let map = parse_environments(&[raw(
            json!({"environment": "linux", "namespace": "linux", "BuildType": "Release"}),
        )]);
        let linux = map
            .get(&EnvironmentName::Named("linux".to_string()))
            .unwrap();
        assert_eq!(linux.lookup("linux.BuildType"), Some("Release"));
    }

    #[test]
    fn empty_namespace_disables_prefixing() {
        let map = parse_environments(&[raw(json!({"namespace": "", "VERBOSE": "1"}))]);
        assert_eq!(map.ambient().unwrap().lookup("VERBOSE"), Some("1"));
    }

    #[test]
    fn same_name_environments_merge_in_input_order() {
        let map = parse_environments(&[
            raw(json!({"environment": "linux", "A": "1"})),
            raw(json!({"environment": "linux", "B": "2"})),
        ]);
        let linux = map
            .get(&EnvironmentName::Named("linux".to_string()))
            .unwrap();
        let names: Vec<&str> = linux.variables().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["env.A", "env.B"]);
    }

    #[test]
    fn reserved_name_blocks_merge_into_ambient() {
        let map = parse_environments(&[
            raw(json!({"A": "1"})),
            raw(json!({"environment": "env", "B": "2"})),
            raw(json!({"environment": "unnamed", "C": "3"})),
        ]);
        let ambient = map.ambient().unwrap();
        assert_eq!(ambient.variables().len(), 3);
        assert_eq!(ambient.lookup("env.C"), Some("3"));
    }

    #[test]
    fn non_string_values_keep_json_rendering() {
        let map = parse_environments(&[raw(json!({"Jobs": 8, "Fast": true}))]);
        let ambient = map.ambient().unwrap();
        assert_eq!(ambient.lookup("env.Jobs"), Some("8"));
        assert_eq!(ambient.lookup("env.Fast"), Some("true"));
    }
}
