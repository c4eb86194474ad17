//! Generator configuration.
//!
//! Parsed from the host parameter string, e.g.
//! `target=rust,target=ts,split_files=true,ts.module_path=web/gen`.

use std::collections::BTreeMap;

use crate::diagnostic::{Diagnostic, Diagnostics};

/// Default suffix appended to identifiers that are reserved words.
pub const DEFAULT_ESCAPE_SUFFIX: &str = "_";
/// Package name used when the schema has no package.
pub const DEFAULT_PACKAGE_NAME: &str = "dmxp";

/// Settings as written, before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq)]
struct Settings {
    module_path: Option<String>,
    package_name: Option<String>,
    split_files: Option<bool>,
    escape_suffix: Option<String>,
}

impl Settings {
    /// Layers `other` on top of `self`.
    fn merged(&self, other: Option<&Settings>) -> Settings {
        let Some(other) = other else {
            return self.clone();
        };
        Settings {
            module_path: other.module_path.clone().or_else(|| self.module_path.clone()),
            package_name: other.package_name.clone().or_else(|| self.package_name.clone()),
            split_files: other.split_files.or(self.split_files),
            escape_suffix: other.escape_suffix.clone().or_else(|| self.escape_suffix.clone()),
        }
    }
}

/// Resolved configuration of one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    pub target: String,
    /// Output directory, `/`-separated, empty for the output root.
    pub module_path: String,
    /// Base name of generated files (and the Go package clause).
    pub package_name: String,
    /// One types file plus one bindings file per proto file, instead of a
    /// single file.
    pub split_files: bool,
    pub escape_suffix: String,
}

impl TargetConfig {
    /// Defaults for a schema in `package`.
    pub fn defaults(target: &str, package: &str) -> Self {
        Self {
            target: target.to_string(),
            module_path: package.replace('.', "/"),
            package_name: package
                .rsplit('.')
                .next()
                .filter(|s| !s.is_empty())
                .unwrap_or(DEFAULT_PACKAGE_NAME)
                .to_string(),
            split_files: false,
            escape_suffix: DEFAULT_ESCAPE_SUFFIX.to_string(),
        }
    }

    /// Joins `file` onto the module path.
    pub fn path(&self, file: &str) -> String {
        if self.module_path.is_empty() {
            file.to_string()
        } else {
            format!("{}/{}", self.module_path, file)
        }
    }
}

/// Requested targets plus their settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratorConfig {
    /// Canonical target tags in request order, without duplicates.
    pub targets: Vec<String>,
    shared: Settings,
    overrides: BTreeMap<String, Settings>,
}

impl GeneratorConfig {
    /// Parses a comma-separated `key=value` parameter string.
    ///
    /// Unknown keys are warnings; values that cannot be interpreted are
    /// errors and leave the setting at its default.
    pub fn parse(parameter: &str, diagnostics: &mut Diagnostics) -> Self {
        let mut config = Self::default();
        if parameter.trim().is_empty() {
            diagnostics.push(Diagnostic::warning(
                "dmxp::config::no_target",
                "no target requested; pass target=<rust|go|python|typescript>",
            ));
            return config;
        }

        for pair in parameter.split(',').map(str::trim) {
            if pair.is_empty() {
                diagnostics.push(Diagnostic::warning(
                    "dmxp::config::empty_pair",
                    "ignoring empty entry in parameter string",
                ));
                continue;
            }
            let Some((key, value)) = pair.split_once('=') else {
                diagnostics.push(Diagnostic::warning(
                    "dmxp::config::missing_value",
                    format!("ignoring parameter '{}' without a value", pair),
                ));
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            if key == "target" {
                if value.is_empty() {
                    diagnostics.push(Diagnostic::error("dmxp::config::invalid_value", "target must not be empty"));
                    continue;
                }
                let target = canonical_target(value);
                if !config.targets.contains(&target) {
                    config.targets.push(target);
                }
                continue;
            }

            let (scope, setting) = match key.split_once('.') {
                Some((scope, setting)) => (Some(canonical_target(scope)), setting),
                None => (None, key),
            };
            let settings = match &scope {
                Some(scope) => config.overrides.entry(scope.clone()).or_default(),
                None => &mut config.shared,
            };
            apply(settings, key, setting, value, diagnostics);
        }

        for scope in config.overrides.keys() {
            if !config.targets.contains(scope) {
                diagnostics.push(Diagnostic::warning(
                    "dmxp::config::unused_override",
                    format!("settings for '{}' are ignored because that target is not requested", scope),
                ));
            }
        }
        if config.targets.is_empty() {
            diagnostics.push(Diagnostic::warning(
                "dmxp::config::no_target",
                "no target requested; pass target=<rust|go|python|typescript>",
            ));
        }

        tracing::debug!(targets = ?config.targets, "parsed generator parameters");
        config
    }

    /// Config with the given targets and default settings.
    pub fn for_targets<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::default();
        for target in targets {
            let target = canonical_target(target.as_ref());
            if !config.targets.contains(&target) {
                config.targets.push(target);
            }
        }
        config
    }

    /// Resolves the settings of `target` for a schema in `package`.
    pub fn target_config(&self, target: &str, package: &str) -> TargetConfig {
        let settings = self.shared.merged(self.overrides.get(target));
        let defaults = TargetConfig::defaults(target, package);
        TargetConfig {
            target: target.to_string(),
            module_path: settings
                .module_path
                .map(|p| normalize_module_path(&p))
                .unwrap_or(defaults.module_path),
            package_name: settings.package_name.unwrap_or(defaults.package_name),
            split_files: settings.split_files.unwrap_or(defaults.split_files),
            escape_suffix: settings.escape_suffix.unwrap_or(defaults.escape_suffix),
        }
    }
}

/// Lowercases a target tag and expands aliases.
pub fn canonical_target(tag: &str) -> String {
    match tag.trim().to_ascii_lowercase().as_str() {
        "ts" => "typescript".to_string(),
        "py" => "python".to_string(),
        "golang" => "go".to_string(),
        other => other.to_string(),
    }
}

fn apply(settings: &mut Settings, key: &str, setting: &str, value: &str, diagnostics: &mut Diagnostics) {
    let invalid = |reason: &str| {
        Diagnostic::error(
            "dmxp::config::invalid_value",
            format!("invalid value '{}' for '{}': {}", value, key, reason),
        )
    };

    match setting {
        "module_path" => {
            if value.is_empty() {
                diagnostics.push(invalid("use '.' for the output root"));
            } else if !is_contained_module_path(value) {
                diagnostics.push(invalid("path segments must be non-empty and must not be '.' or '..'"));
            } else {
                settings.module_path = Some(value.to_string());
            }
        }
        "package_name" => {
            if is_identifier(value) {
                settings.package_name = Some(value.to_string());
            } else {
                diagnostics.push(invalid("expected an identifier"));
            }
        }
        "split_files" => match value {
            "true" => settings.split_files = Some(true),
            "false" => settings.split_files = Some(false),
            _ => diagnostics.push(invalid("expected 'true' or 'false'")),
        },
        "escape_suffix" => {
            if !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                settings.escape_suffix = Some(value.to_string());
            } else {
                diagnostics.push(invalid("expected letters, digits or underscores"));
            }
        }
        _ => diagnostics.push(Diagnostic::warning(
            "dmxp::config::unknown_key",
            format!("ignoring unknown parameter '{}'", key),
        )),
    }
}

fn normalize_module_path(path: &str) -> String {
    if path == "." {
        return String::new();
    }
    let path = if path.contains('/') {
        path.to_string()
    } else {
        path.replace('.', "/")
    };
    path.trim_matches('/').to_string()
}

/// True when the path stays below the output root.
fn is_contained_module_path(path: &str) -> bool {
    if path == "." {
        return true;
    }
    let normalized = normalize_module_path(path);
    !normalized.is_empty()
        && normalized
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(parameter: &str) -> (GeneratorConfig, Diagnostics) {
        let mut diags = Diagnostics::new();
        let config = GeneratorConfig::parse(parameter, &mut diags);
        (config, diags)
    }

    #[test]
    fn test_targets_are_canonical_and_deduplicated() {
        let (config, diags) = parse("target=rust,target=ts,target=typescript,target=Go");
        assert!(diags.is_empty());
        assert_eq!(config.targets, vec!["rust", "typescript", "go"]);
    }

    #[test]
    fn test_defaults_follow_package() {
        let (config, _) = parse("target=go");
        let go = config.target_config("go", "acme.sensors.v1");
        assert_eq!(go.module_path, "acme/sensors/v1");
        assert_eq!(go.package_name, "v1");
        assert!(!go.split_files);
        assert_eq!(go.escape_suffix, "_");

        let bare = config.target_config("go", "");
        assert_eq!(bare.module_path, "");
        assert_eq!(bare.package_name, "dmxp");
    }

    #[test]
    fn test_scoped_keys_override_shared_ones() {
        let (config, diags) =
            parse("target=rust,target=ts,split_files=true,module_path=gen,ts.module_path=web.gen,ts.split_files=false");
        assert!(diags.is_empty());

        let rust = config.target_config("rust", "shop");
        assert_eq!(rust.module_path, "gen");
        assert!(rust.split_files);

        let ts = config.target_config("typescript", "shop");
        assert_eq!(ts.module_path, "web/gen");
        assert!(!ts.split_files);
        assert_eq!(ts.path("shop.ts"), "web/gen/shop.ts");
    }

    #[test]
    fn test_unknown_keys_warn_and_bad_values_error() {
        let (config, diags) = parse("target=rust,colour=blue,,split_files=maybe");
        let codes: Vec<_> = diags.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec!["dmxp::config::unknown_key", "dmxp::config::empty_pair", "dmxp::config::invalid_value"]
        );
        assert_eq!(diags.error_count(), 1);
        assert!(!config.target_config("rust", "").split_files);
    }

    #[test]
    fn test_no_target_is_a_warning() {
        let (config, diags) = parse("split_files=true");
        assert!(config.targets.is_empty());
        assert!(!diags.has_errors());
        assert_eq!(diags.iter().next().map(|d| d.code), Some("dmxp::config::no_target"));
    }

    #[test]
    fn test_override_for_unrequested_target_warns() {
        let (_, diags) = parse("target=go,python.package_name=svc");
        assert_eq!(diags.iter().next().map(|d| d.code), Some("dmxp::config::unused_override"));
    }

    #[test]
    fn test_module_path_cannot_leave_output_root() {
        for value in ["../x", "rust.module_path=../../etc", "gen/./v1", "a//b", "..", "gen/.."] {
            let parameter = if value.contains('=') {
                format!("target=rust,{}", value)
            } else {
                format!("target=rust,module_path={}", value)
            };
            let (config, diags) = parse(&parameter);
            let codes: Vec<_> = diags.iter().map(|d| d.code).collect();
            assert_eq!(codes, vec!["dmxp::config::invalid_value"], "{}", parameter);
            assert_eq!(config.target_config("rust", "shop").module_path, "shop", "{}", parameter);
        }
    }

    #[test]
    fn test_root_module_path_and_escape_suffix() {
        let (config, diags) = parse("target=python,module_path=.,escape_suffix=_kw");
        assert!(diags.is_empty());
        let py = config.target_config("python", "shop");
        assert_eq!(py.module_path, "");
        assert_eq!(py.escape_suffix, "_kw");
        assert_eq!(py.path("shop.py"), "shop.py");
    }
}
