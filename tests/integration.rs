//! Integration tests for the holefix pipeline.
//!
//! Library-level tests write real files to a temp directory and drive
//! `discover_files` + `run_linter`; CLI tests run the built binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use holefix::config::{ResolvedConfig, RuleConfig, load_config};
use holefix::fs::discover_files;
use holefix::linter::{LintOptions, run_linter};
use holefix::query::{Matcher, Target, compile, rewrite_all};
use holefix::rules::RuleSet;

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Temp dirs default to a dot prefix, which the walker would treat as hidden.
fn temp_dir() -> tempfile::TempDir {
    tempfile::Builder::new().prefix("holefix").tempdir().unwrap()
}

fn holefix(dir: &Path, args: &[&str], stdin: Option<&str>) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_holefix"))
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start holefix");
    {
        use std::io::Write;
        let mut pipe = child.stdin.take().unwrap();
        if let Some(input) = stdin {
            pipe.write_all(input.as_bytes()).unwrap();
        }
    }
    child.wait_with_output().expect("Failed to wait for holefix")
}

const RULES: &str = r#"
rules:
  - name: errorf
    pattern: "errors.New(fmt.Sprintf(:[[args]]))"
    rewrite: "fmt.Errorf(:[[args]])"
    message: use fmt.Errorf
  - name: self-compare
    pattern: ":[x] == :[x]"
    severity: error
    where:
      x: identifier
"#;

const MAIN_GO: &str = r#"package main

import (
	"errors"
	"fmt"
)

func check(n int) error {
	if n == n {
		return errors.New(fmt.Sprintf("bad %d", n))
	}
	return nil
}
"#;

// ---------- Library pipeline ----------

#[test]
fn pipeline_reports_each_rule() {
    let dir = temp_dir();
    let config_path = write_file(dir.path(), ".holefix.yml", RULES);
    write_file(dir.path(), "main.go", MAIN_GO);
    write_file(dir.path(), "notes.txt", "n == n");

    let config = load_config(Some(&config_path)).unwrap();
    let rules = RuleSet::compile(&config).unwrap();
    let files = discover_files(&[dir.path().to_path_buf()], &config).unwrap();
    assert_eq!(files.len(), 1);

    let result = run_linter(&files, &rules, LintOptions::default());
    let found: Vec<(&str, usize)> = result
        .diagnostics
        .iter()
        .map(|d| (d.rule_name.as_str(), d.location.line))
        .collect();
    assert_eq!(found, vec![("self-compare", 9), ("errorf", 10)]);
    assert_eq!(result.diagnostics[0].captures["x"], "n");
    assert_eq!(result.corrected_count, 0);
    assert_eq!(fs::read_to_string(&files[0]).unwrap(), MAIN_GO);
}

#[test]
fn pipeline_fix_rewrites_in_place() {
    let dir = temp_dir();
    let file = write_file(dir.path(), "pkg/main.go", MAIN_GO);
    let mut config = ResolvedConfig::default();
    let mut rule = RuleConfig::new("errorf", "errors.New(fmt.Sprintf(:[[args]]))");
    rule.rewrite = Some("fmt.Errorf(:[[args]])".to_string());
    config.rules.push(rule);
    let rules = RuleSet::compile(&config).unwrap();

    let options = LintOptions {
        fix: true,
        ..LintOptions::default()
    };
    let result = run_linter(&[file.clone()], &rules, options);
    assert_eq!(result.corrected_count, 1);
    let fixed = fs::read_to_string(&file).unwrap();
    assert!(fixed.contains("\t\treturn fmt.Errorf(\"bad %d\", n)\n"));

    // A second run finds nothing left to fix.
    let again = run_linter(&[file.clone()], &rules, options);
    assert!(again.diagnostics.is_empty());
    assert_eq!(fs::read_to_string(&file).unwrap(), fixed);
}

#[test]
fn pipeline_skips_unbalanced_file() {
    let dir = temp_dir();
    let broken = write_file(dir.path(), "broken.go", "func f() {\n\treturn n == n\n");
    let fine = write_file(dir.path(), "fine.go", "var ok = n == n\n");
    let config = holefix::config::parse_config(RULES).unwrap();
    let rules = RuleSet::compile(&config).unwrap();

    let result = run_linter(&[broken.clone(), fine], &rules, LintOptions::default());
    assert_eq!(result.skipped, vec![broken]);
    assert_eq!(result.diagnostics.len(), 1);
}

#[test]
fn query_api_end_to_end() {
    let pattern = compile("for :[i] := 0; :[i] < len(:[xs]); :[i]++ {:[[body]]}").unwrap();
    let template = compile("for :[i] := range :[xs] {:[[body]]}").unwrap();
    let source = "for j := 0; j < len(items); j++ {\n\tuse(items[j])\n}\nfor k := 0; j < len(a); k++ {}\n";
    let target = Target::tokenize(source).unwrap();
    let found: Vec<_> = Matcher::new(&pattern).find_iter(&target).collect();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("xs"), Some("items"));
    let out = rewrite_all(source, &template, &found).unwrap();
    assert!(out.starts_with("for j := range items {\n\tuse(items[j])\n}\n"));
    assert!(out.ends_with("for k := 0; j < len(a); k++ {}\n"));
}

// ---------- CLI ----------

#[test]
fn cli_adhoc_pattern_exit_codes() {
    let dir = temp_dir();
    write_file(dir.path(), "main.go", MAIN_GO);

    let hit = holefix(dir.path(), &["-p", "errors.New(:[[x]])", "."], None);
    let stdout = String::from_utf8_lossy(&hit.stdout);
    assert_eq!(hit.status.code(), Some(1), "stdout: {stdout}");
    assert!(stdout.contains("main.go:10:9: W: pattern:"), "got: {stdout}");
    assert!(stdout.contains("1 file inspected, 1 match found"));

    let miss = holefix(dir.path(), &["-p", "panic(:[[x]])", "."], None);
    assert_eq!(miss.status.code(), Some(0));
}

#[test]
fn cli_errors_exit_three() {
    let dir = temp_dir();
    write_file(dir.path(), "main.go", MAIN_GO);

    let bad_pattern = holefix(dir.path(), &["-p", "f(:[x"], None);
    assert_eq!(bad_pattern.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&bad_pattern.stderr);
    assert!(stderr.contains("error:"), "got: {stderr}");
    assert!(stderr.contains("unterminated hole"), "got: {stderr}");

    let no_rules = holefix(dir.path(), &["."], None);
    assert_eq!(no_rules.status.code(), Some(3));

    let missing_config = holefix(dir.path(), &["-c", "nope.yml", "-p", "x"], None);
    assert_eq!(missing_config.status.code(), Some(3));
}

#[test]
fn cli_json_output_with_config() {
    let dir = temp_dir();
    write_file(dir.path(), ".holefix.yml", RULES);
    write_file(dir.path(), "main.go", MAIN_GO);

    let output = holefix(dir.path(), &["--format", "json"], None);
    assert_eq!(output.status.code(), Some(1));
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["metadata"]["files_inspected"], 1);
    assert_eq!(parsed["metadata"]["match_count"], 2);
    let errorf = &parsed["matches"][1];
    assert_eq!(errorf["rule"], "errorf");
    assert_eq!(errorf["captures"]["args"], "\"bad %d\", n");
    assert_eq!(errorf["replacement"], "fmt.Errorf(\"bad %d\", n)");
}

#[test]
fn cli_stdin_fix_acts_as_filter() {
    let dir = temp_dir();
    let output = holefix(
        dir.path(),
        &["--stdin", "x.go", "--fix", "-p", "len(:[s]) == 0", "-r", ":[s] == \"\""],
        Some("if len(name) == 0 {\n}\n"),
    );
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "if name == \"\" {\n}\n");
}

#[test]
fn cli_stdin_report() {
    let dir = temp_dir();
    let output = holefix(
        dir.path(),
        &["--stdin", "pkg/x.go", "-p", ":[a] == :[a]"],
        Some("ok := v == v\n"),
    );
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("pkg/x.go:1:6: W: pattern:"), "got: {stdout}");
}

#[test]
fn cli_list_rules() {
    let dir = temp_dir();
    write_file(dir.path(), ".holefix.yml", RULES);
    let output = holefix(dir.path(), &["--list-rules", "--format", "json"], None);
    assert_eq!(output.status.code(), Some(0));
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = parsed
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["errorf", "self-compare"]);
}
