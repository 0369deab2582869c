use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use rayon::prelude::*;

use crate::correction::{Edit, EditSet};
use crate::diagnostic::Diagnostic;
use crate::parse::source::SourceFile;
use crate::query::{MatchOptions, Target, rewrite_match};
use crate::rules::RuleSet;

/// Thread-safe phase timing counters (nanoseconds), collected under debug logging.
struct PhaseTimers {
    read_ns: AtomicU64,
    tokenize_ns: AtomicU64,
    match_ns: AtomicU64,
}

impl PhaseTimers {
    fn new() -> Self {
        Self {
            read_ns: AtomicU64::new(0),
            tokenize_ns: AtomicU64::new(0),
            match_ns: AtomicU64::new(0),
        }
    }

    fn add(counter: &AtomicU64, since: Instant) {
        counter.fetch_add(since.elapsed().as_nanos() as u64, Ordering::Relaxed);
    }

    fn log_summary(&self, total: Duration, file_count: usize) {
        let read = Duration::from_nanos(self.read_ns.load(Ordering::Relaxed));
        let tokenize = Duration::from_nanos(self.tokenize_ns.load(Ordering::Relaxed));
        let matching = Duration::from_nanos(self.match_ns.load(Ordering::Relaxed));
        log::debug!("--- phase breakdown ({file_count} files, summed across threads) ---");
        log::debug!("  file I/O:   {read:.0?}");
        log::debug!("  tokenize:   {tokenize:.0?}");
        log::debug!("  matching:   {matching:.0?}");
        log::debug!("  wall clock: {total:.0?}");
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LintOptions {
    pub matching: MatchOptions,
    /// Apply rewrites.
    pub fix: bool,
}

pub struct LintResult {
    pub diagnostics: Vec<Diagnostic>,
    pub file_count: usize,
    pub corrected_count: usize,
    /// Files that could not be read, decoded or tokenized.
    pub skipped: Vec<PathBuf>,
}

/// Outcome for one in-memory source.
pub struct SourceResult {
    pub diagnostics: Vec<Diagnostic>,
    /// Rewritten content when fixing changed something.
    pub fixed: Option<Vec<u8>>,
}

/// Run every applicable rule over one source.
pub fn lint_source(
    source: &SourceFile,
    rules: &RuleSet,
    options: LintOptions,
) -> Result<SourceResult> {
    lint_source_inner(source, rules, options, None)
}

fn lint_source_inner(
    source: &SourceFile,
    rules: &RuleSet,
    options: LintOptions,
    timers: Option<&PhaseTimers>,
) -> Result<SourceResult> {
    let text = source.text()?;

    let tokenize_start = Instant::now();
    let target = Target::tokenize(text)?;
    if let Some(t) = timers {
        PhaseTimers::add(&t.tokenize_ns, tokenize_start);
    }

    let match_start = Instant::now();
    let mut diagnostics = Vec::new();
    // (start offset, rule index) per diagnostic, to mark corrections later.
    let mut origins = Vec::new();
    let mut edits = Vec::new();

    for (rule_index, rule) in rules.rules().iter().enumerate() {
        if !rule.applies_to(&source.path) {
            continue;
        }
        for m in rule.matcher.find_iter_with(&target, options.matching) {
            let replacement = match &rule.rewrite {
                Some(template) => match rewrite_match(template, &m) {
                    Ok(text) => Some(text),
                    Err(e) => {
                        log::warn!("{}: rule `{}`: {e}", source.path_str(), rule.name);
                        None
                    }
                },
                None => None,
            };
            if let Some(text) = &replacement {
                edits.push(Edit {
                    start: m.span.start,
                    end: m.span.end,
                    replacement: text.clone(),
                    rule_index,
                });
            }
            origins.push((m.span.start, rule_index));
            diagnostics.push(Diagnostic {
                path: source.path_str().to_string(),
                location: source.location(m.span.start),
                severity: rule.severity,
                rule_name: rule.name.clone(),
                message: rule.message.clone(),
                matched: target.slice(m.span).to_string(),
                captures: m.bindings(),
                replacement,
                corrected: false,
            });
        }
    }

    let mut fixed = None;
    if options.fix && !edits.is_empty() {
        let set = EditSet::from_vec(edits);
        for (d, &(start, rule_index)) in diagnostics.iter_mut().zip(&origins) {
            d.corrected = d.replacement.is_some() && set.contains(start, rule_index);
        }
        let bytes = set.apply(source.as_bytes());
        if bytes != source.as_bytes() {
            fixed = Some(bytes);
        }
    }

    if let Some(t) = timers {
        PhaseTimers::add(&t.match_ns, match_start);
    }

    diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    Ok(SourceResult { diagnostics, fixed })
}

/// Lint `files` in parallel, writing fixes back when `options.fix` is set.
pub fn run_linter(files: &[PathBuf], rules: &RuleSet, options: LintOptions) -> LintResult {
    let wall_start = Instant::now();
    let timers = log::log_enabled!(log::Level::Debug).then(PhaseTimers::new);
    let total_corrected = AtomicUsize::new(0);

    let outcomes: Vec<Result<Vec<Diagnostic>, PathBuf>> = files
        .par_iter()
        .map(|path| lint_file(path, rules, options, timers.as_ref(), &total_corrected))
        .collect();

    let mut diagnostics = Vec::new();
    let mut skipped = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(found) => diagnostics.extend(found),
            Err(path) => skipped.push(path),
        }
    }
    diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    if let Some(ref t) = timers {
        t.log_summary(wall_start.elapsed(), files.len());
    }

    LintResult {
        diagnostics,
        file_count: files.len(),
        corrected_count: total_corrected.load(Ordering::Relaxed),
        skipped,
    }
}

fn lint_file(
    path: &Path,
    rules: &RuleSet,
    options: LintOptions,
    timers: Option<&PhaseTimers>,
    total_corrected: &AtomicUsize,
) -> Result<Vec<Diagnostic>, PathBuf> {
    let read_start = Instant::now();
    let source = match SourceFile::from_path(path) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("skipping {}: {e:#}", path.display());
            return Err(path.to_path_buf());
        }
    };
    if let Some(t) = timers {
        PhaseTimers::add(&t.read_ns, read_start);
    }

    let mut result = match lint_source_inner(&source, rules, options, timers) {
        Ok(result) => result,
        Err(e) => {
            log::warn!("skipping {}: {e:#}", path.display());
            return Err(path.to_path_buf());
        }
    };

    if let Some(bytes) = &result.fixed {
        if let Err(e) = std::fs::write(path, bytes) {
            log::error!("failed to write corrected file {}: {e}", path.display());
            for d in &mut result.diagnostics {
                d.corrected = false;
            }
        } else {
            let count = result.diagnostics.iter().filter(|d| d.corrected).count();
            total_corrected.fetch_add(count, Ordering::Relaxed);
            log::debug!("fixed {count} matches in {}", path.display());
        }
    }

    Ok(result.diagnostics)
}

/// Names of rules that matched at least once.
pub fn matched_rules(diagnostics: &[Diagnostic]) -> HashSet<&str> {
    diagnostics.iter().map(|d| d.rule_name.as_str()).collect()
}
