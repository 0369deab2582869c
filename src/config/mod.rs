use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default rule file looked up in the working directory.
pub const DEFAULT_CONFIG: &str = ".holefix.yml";

/// Contents of a `.holefix.yml` rule file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolvedConfig {
    /// File extensions (without the dot) picked up from directories.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Globs excluded from directory walks.
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub rewrite: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "default_severity")]
    pub severity: String,
    /// Hole name -> capture kind name (`any`, `identifier`).
    #[serde(default, rename = "where")]
    pub constraints: BTreeMap<String, String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl RuleConfig {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            rewrite: None,
            message: None,
            severity: default_severity(),
            constraints: BTreeMap::new(),
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["go".to_string(), "gno".to_string()]
}

fn default_severity() -> String {
    "warning".to_string()
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude: Vec::new(),
            rules: Vec::new(),
            config_path: None,
        }
    }
}

impl ResolvedConfig {
    /// Where the rules were read from, if a file was found.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn global_excludes(&self) -> &[String] {
        &self.exclude
    }

    pub fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }
}

/// Load rules from `path`, or from `.holefix.yml` in the current directory.
///
/// A missing default file yields an empty config; a missing explicit file is
/// an error.
pub fn load_config(path: Option<&Path>) -> Result<ResolvedConfig> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG);
            if !default.exists() {
                return Ok(ResolvedConfig::default());
            }
            default
        }
    };

    let contents = std::fs::read_to_string(&config_path)
        .with_context(|| format!("failed to read config {}", config_path.display()))?;
    let mut config = parse_config(&contents)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    config.config_path = Some(config_path);
    Ok(config)
}

pub fn parse_config(contents: &str) -> Result<ResolvedConfig> {
    if contents.trim().is_empty() {
        return Ok(ResolvedConfig::default());
    }
    Ok(serde_yml::from_str(contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_explicit_config_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/.holefix.yml"))).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read config"));
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse_config("\n").unwrap();
        assert_eq!(config.extensions, vec!["go", "gno"]);
        assert!(config.rules.is_empty());
        assert!(config.global_excludes().is_empty());
    }

    #[test]
    fn full_rule_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG);
        fs::write(
            &path,
            r#"
extensions: [go]
exclude:
  - "vendor/**"
rules:
  - name: errorf
    pattern: "errors.New(fmt.Sprintf(:[[args]]))"
    rewrite: "fmt.Errorf(:[[args]])"
    message: use fmt.Errorf
    severity: convention
    include: ["**/*.go"]
  - name: self-compare
    pattern: ":[x] == :[x]"
    where:
      x: identifier
"#,
        )
        .unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.config_path(), Some(path.as_path()));
        assert_eq!(config.extensions, vec!["go"]);
        assert_eq!(config.global_excludes(), &["vendor/**".to_string()]);
        assert_eq!(config.rules.len(), 2);

        let errorf = &config.rules[0];
        assert_eq!(errorf.rewrite.as_deref(), Some("fmt.Errorf(:[[args]])"));
        assert_eq!(errorf.severity, "convention");
        assert_eq!(errorf.include, vec!["**/*.go"]);

        let self_compare = &config.rules[1];
        assert_eq!(self_compare.severity, "warning");
        assert!(self_compare.message.is_none());
        assert_eq!(
            self_compare.constraints.get("x").map(String::as_str),
            Some("identifier")
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_config("rules:\n  - name: a\n    pattern: x\n    severty: error\n");
        assert!(err.is_err());
    }

    #[test]
    fn rule_requires_pattern() {
        assert!(parse_config("rules:\n  - name: a\n").is_err());
    }

    #[test]
    fn extension_filter() {
        let config = ResolvedConfig::default();
        assert!(config.has_extension(Path::new("a/b.go")));
        assert!(config.has_extension(Path::new("pkg.gno")));
        assert!(!config.has_extension(Path::new("main.rs")));
        assert!(!config.has_extension(Path::new("Makefile")));
    }
}
