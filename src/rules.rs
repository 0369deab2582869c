//! Compiled rules and the `--list-rules` listing.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;

use crate::config::{ResolvedConfig, RuleConfig};
use crate::diagnostic::Severity;
use crate::query::{CaptureKind, Matcher, PatternNode, compile, unbound_holes};

#[derive(Debug)]
pub struct Rule {
    pub name: String,
    pub pattern: PatternNode,
    pub matcher: Matcher,
    pub rewrite: Option<PatternNode>,
    pub message: String,
    pub severity: Severity,
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl Rule {
    pub fn compile(config: &RuleConfig) -> Result<Self> {
        let mut pattern = compile(&config.pattern)
            .with_context(|| format!("invalid pattern `{}`", config.pattern))?;

        for (hole, kind_name) in &config.constraints {
            let Some(kind) = CaptureKind::from_name(kind_name) else {
                bail!("unknown capture kind `{kind_name}` for hole `{hole}`");
            };
            if !pattern.hole_names().contains(&hole.as_str()) {
                bail!("`where` names hole `{hole}`, which the pattern does not contain");
            }
            pattern = pattern.with_capture_kind(hole, kind);
        }

        let rewrite = match &config.rewrite {
            Some(text) => {
                let template =
                    compile(text).with_context(|| format!("invalid rewrite `{text}`"))?;
                if let Some(hole) = unbound_holes(&template, &pattern).first() {
                    bail!(
                        "rewrite uses hole `{}` (offset {}) that the pattern never binds",
                        hole.name(),
                        hole.position
                    );
                }
                Some(template)
            }
            None => None,
        };

        let Some(severity) = Severity::from_str(&config.severity) else {
            bail!("unknown severity `{}`", config.severity);
        };

        let message = config
            .message
            .clone()
            .unwrap_or_else(|| format!("matches `{}`", config.pattern));

        Ok(Self {
            name: config.name.clone(),
            matcher: Matcher::new(&pattern),
            pattern,
            rewrite,
            message,
            severity,
            include: build_globs(&config.include)?,
            exclude: build_globs(&config.exclude)?,
        })
    }

    /// Include/exclude globs, matched against the path with any leading `./`
    /// removed. No include globs means every file.
    pub fn applies_to(&self, path: &Path) -> bool {
        let path = path.strip_prefix(".").unwrap_or(path);
        if let Some(include) = &self.include {
            if !include.is_match(path) {
                return false;
            }
        }
        !self.exclude.as_ref().is_some_and(|exclude| exclude.is_match(path))
    }
}

fn build_globs(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("invalid glob `{pattern}`"))?);
    }
    Ok(Some(builder.build().context("failed to build glob set")?))
}

#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Compile every rule in `config`, failing on the first bad one.
    pub fn compile(config: &ResolvedConfig) -> Result<Self> {
        let mut rules = Vec::with_capacity(config.rules.len());
        for rule_config in &config.rules {
            let rule = Rule::compile(rule_config)
                .with_context(|| format!("rule `{}`", rule_config.name))?;
            rules.push(rule);
        }

        let mut seen: HashMap<&PatternNode, &str> = HashMap::new();
        for rule in &rules {
            if let Some(first) = seen.insert(&rule.pattern, &rule.name) {
                log::warn!(
                    "rules `{first}` and `{}` have identical patterns",
                    rule.name
                );
            }
        }

        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Debug, Serialize)]
pub struct RuleEntry {
    pub name: String,
    pub severity: String,
    pub pattern: String,
    pub rewrite: Option<String>,
    pub holes: Vec<String>,
}

pub fn build_entries(rules: &RuleSet) -> Vec<RuleEntry> {
    rules
        .rules()
        .iter()
        .map(|rule| RuleEntry {
            name: rule.name.clone(),
            severity: rule.severity.name().to_string(),
            pattern: rule.pattern.to_source(),
            rewrite: rule.rewrite.as_ref().map(|t| t.to_source()),
            holes: rule
                .pattern
                .hole_names()
                .into_iter()
                .map(String::from)
                .collect(),
        })
        .collect()
}

pub fn print_table(entries: &[RuleEntry]) {
    println!("{:<24} {:<10} {:<6} Pattern", "Name", "Severity", "Fix");
    println!("{}", "-".repeat(72));
    for entry in entries {
        let fix_mark = if entry.rewrite.is_some() { "yes" } else { "-" };
        println!(
            "{:<24} {:<10} {:<6} {}",
            entry.name,
            entry.severity,
            fix_mark,
            entry.pattern.replace('\n', "\\n")
        );
    }
    println!();
    let fixable = entries.iter().filter(|e| e.rewrite.is_some()).count();
    println!("{} rules, {fixable} with rewrites", entries.len());
}

pub fn print_json(entries: &[RuleEntry]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(entries)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::query::Target;

    fn rule(name: &str, pattern: &str) -> RuleConfig {
        RuleConfig::new(name, pattern)
    }

    #[test]
    fn compiles_pattern_rewrite_and_defaults() {
        let mut config = rule("errorf", "errors.New(fmt.Sprintf(:[[args]]))");
        config.rewrite = Some("fmt.Errorf(:[[args]])".to_string());
        let compiled = Rule::compile(&config).unwrap();
        assert_eq!(compiled.severity, Severity::Warning);
        assert_eq!(
            compiled.message,
            "matches `errors.New(fmt.Sprintf(:[[args]]))`"
        );
        assert!(compiled.rewrite.is_some());
    }

    #[test]
    fn rejects_rewrite_with_unbound_hole() {
        let mut config = rule("bad", "foo(:[a])");
        config.rewrite = Some("bar(:[b])".to_string());
        let err = Rule::compile(&config).unwrap_err();
        assert!(format!("{err:#}").contains("`b`"));
    }

    #[test]
    fn rejects_invalid_pattern() {
        let err = Rule::compile(&rule("bad", "f(:[x")).unwrap_err();
        assert!(format!("{err:#}").contains("unterminated hole"));
        assert!(Rule::compile(&rule("bad", "}")).is_err());
    }

    #[test]
    fn rejects_unknown_severity_and_kind() {
        let mut config = rule("a", ":[x]");
        config.severity = "loud".to_string();
        assert!(Rule::compile(&config).is_err());

        let mut config = rule("a", ":[x]");
        config.constraints.insert("x".to_string(), "number".to_string());
        assert!(Rule::compile(&config).is_err());

        let mut config = rule("a", ":[x]");
        config.constraints.insert("y".to_string(), "identifier".to_string());
        assert!(Rule::compile(&config).is_err());
    }

    #[test]
    fn where_clause_sets_capture_kind() {
        let mut config = rule("a", ":[x] + 1");
        config.constraints.insert("x".to_string(), "identifier".to_string());
        let compiled = Rule::compile(&config).unwrap();
        let target = Target::tokenize("f(2) + 1; n + 1").unwrap();
        let found: Vec<_> = compiled.matcher.find_iter(&target).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("x"), Some("n"));
    }

    #[test]
    fn include_and_exclude_globs() {
        let mut config = rule("tests-only", "t.Fatal(:[[a]])");
        config.include = vec!["**/*_test.go".to_string()];
        config.exclude = vec!["vendor/**".to_string()];
        let compiled = Rule::compile(&config).unwrap();
        assert!(compiled.applies_to(Path::new("pkg/a_test.go")));
        assert!(compiled.applies_to(Path::new("./a_test.go")));
        assert!(!compiled.applies_to(Path::new("pkg/a.go")));
        assert!(!compiled.applies_to(Path::new("vendor/x/a_test.go")));

        let open = Rule::compile(&rule("all", "x")).unwrap();
        assert!(open.applies_to(Path::new("anything.gno")));
    }

    #[test]
    fn rule_set_reports_failing_rule_name() {
        let config =
            parse_config("rules:\n  - name: good\n    pattern: a\n  - name: broken\n    pattern: \"{\"\n")
                .unwrap();
        let err = RuleSet::compile(&config).unwrap_err();
        assert!(format!("{err:#}").contains("rule `broken`"));
    }

    #[test]
    fn duplicate_patterns_still_compile() {
        let config = parse_config(
            "rules:\n  - name: one\n    pattern: \"a  b\"\n  - name: two\n    pattern: \"a b\"\n",
        )
        .unwrap();
        let set = RuleSet::compile(&config).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.rules()[0].pattern, set.rules()[1].pattern);
    }

    #[test]
    fn entries_describe_rules() {
        let mut config = ResolvedConfig::default();
        let mut fix = rule("fix", "len(:[s]) == 0");
        fix.rewrite = Some(":[s] == \"\"".to_string());
        config.rules.push(fix);
        config.rules.push(rule("plain", "panic(:[[m]])"));
        let entries = build_entries(&RuleSet::compile(&config).unwrap());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].holes, vec!["s"]);
        assert_eq!(entries[0].rewrite.as_deref(), Some(":[s] == \"\""));
        assert_eq!(entries[1].severity, "warning");
        assert!(entries[1].rewrite.is_none());
    }
}
