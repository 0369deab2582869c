pub mod cli;
pub mod config;
pub mod correction;
pub mod diagnostic;
pub mod formatter;
pub mod fs;
pub mod linter;
pub mod parse;
pub mod query;
pub mod rules;

use std::io::{Read, Write};

use anyhow::{Context, Result, bail};

use cli::Args;
use config::load_config;
use formatter::create_formatter;
use fs::discover_files;
use linter::{lint_source, matched_rules, run_linter};
use parse::source::SourceFile;
use rules::RuleSet;

/// Run holefix. Returns the exit code: 0 = no matches, 1 = matches found.
pub fn run(args: Args) -> Result<i32> {
    let config_start = std::time::Instant::now();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(rule) = args.adhoc_rule()? {
        config.rules.push(rule);
    }
    let rules = RuleSet::compile(&config)?;

    match config.config_path() {
        Some(path) => log::debug!("rules loaded from: {}", path.display()),
        None => log::debug!("no rule file found"),
    }
    log::debug!(
        "{} rules compiled in {:.0?}",
        rules.len(),
        config_start.elapsed()
    );
    log::debug!("global excludes: {:?}", config.global_excludes());

    // --list-rules: print the compiled rules and exit
    if args.list_rules {
        let entries = rules::build_entries(&rules);
        if args.format == "json" {
            rules::print_json(&entries)?;
        } else {
            rules::print_table(&entries);
        }
        return Ok(0);
    }

    if rules.is_empty() {
        bail!("no rules to run: pass --pattern or add rules to {}", config::DEFAULT_CONFIG);
    }

    let options = args.lint_options();
    let formatter = create_formatter(&args.format);

    // --stdin: match a single source read from stdin
    if let Some(ref display_path) = args.stdin {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("failed to read stdin")?;
        let source = SourceFile::from_string(display_path.clone(), input);
        let result = lint_source(&source, &rules, options)?;
        if args.fix {
            // With --fix the rewritten source goes to stdout, like a filter.
            let bytes = result.fixed.as_deref().unwrap_or(source.as_bytes());
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        } else {
            formatter.print(&result.diagnostics, 1)?;
        }
        return Ok(exit_code(result.diagnostics.len()));
    }

    let files = discover_files(&args.paths, &config)?;
    log::debug!("{} files to search", files.len());

    let result = run_linter(&files, &rules, options);
    log::debug!(
        "{} of {} rules matched",
        matched_rules(&result.diagnostics).len(),
        rules.len()
    );
    if !result.skipped.is_empty() {
        log::warn!("{} files skipped", result.skipped.len());
    }
    if result.corrected_count > 0 {
        log::info!("applied {} rewrites", result.corrected_count);
    }
    formatter.print(&result.diagnostics, result.file_count)?;

    Ok(exit_code(result.diagnostics.len()))
}

fn exit_code(match_count: usize) -> i32 {
    if match_count == 0 { 0 } else { 1 }
}
