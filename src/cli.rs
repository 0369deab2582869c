use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;

use crate::config::RuleConfig;
use crate::linter::LintOptions;
use crate::query::MatchOptions;

/// Name given to the rule built from `--pattern`.
pub const ADHOC_RULE: &str = "pattern";

#[derive(Parser, Debug)]
#[command(
    name = "holefix",
    version,
    about = "Structural search and rewrite with hole patterns"
)]
pub struct Args {
    /// Files or directories to search
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Path to the rule file [default: .holefix.yml]
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Ad-hoc pattern, e.g. 'errors.New(fmt.Sprintf(:[[args]]))'
    #[arg(short, long, value_name = "PATTERN")]
    pub pattern: Option<String>,

    /// Rewrite template for --pattern
    #[arg(short, long, value_name = "TEMPLATE", requires = "pattern")]
    pub rewrite: Option<String>,

    /// Capture kind for a --pattern hole, as NAME=KIND (repeatable)
    #[arg(short, long = "where", value_name = "NAME=KIND", requires = "pattern")]
    pub where_: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Write rewrites back to the files
    #[arg(long)]
    pub fix: bool,

    /// Report overlapping matches
    #[arg(long)]
    pub overlapping: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Read source from stdin, use PATH for display and rule globs
    #[arg(long, value_name = "PATH")]
    pub stdin: Option<PathBuf>,

    /// List the configured rules, then exit
    #[arg(long)]
    pub list_rules: bool,
}

impl Args {
    pub fn lint_options(&self) -> LintOptions {
        LintOptions {
            matching: MatchOptions {
                overlapping: self.overlapping,
            },
            fix: self.fix,
        }
    }

    /// The rule described by `--pattern`, `--rewrite` and `--where`.
    pub fn adhoc_rule(&self) -> Result<Option<RuleConfig>> {
        let Some(pattern) = &self.pattern else {
            return Ok(None);
        };
        let mut rule = RuleConfig::new(ADHOC_RULE, pattern.as_str());
        rule.rewrite = self.rewrite.clone();
        for clause in &self.where_ {
            let Some((name, kind)) = clause.split_once('=') else {
                bail!("--where expects NAME=KIND, got `{clause}`");
            };
            rule.constraints
                .insert(name.trim().to_string(), kind.trim().to_string());
        }
        Ok(Some(rule))
    }
}
