//! Benchmark holefix on a synthetic Go corpus.
//!
//! Usage:
//!   cargo run --release --bin bench_holefix                  # compile + match, report to stdout
//!   cargo run --release --bin bench_holefix -- --files 2000  # larger corpus
//!   cargo run --release --bin bench_holefix -- --output bench/results.md

use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;

use holefix::config::{ResolvedConfig, RuleConfig};
use holefix::linter::{LintOptions, run_linter};
use holefix::query::{Matcher, Target, compile};
use holefix::rules::RuleSet;

// --- CLI ---

#[derive(Parser)]
#[command(about = "Benchmark holefix pattern compilation and matching on generated Go files.")]
struct Args {
    /// Number of generated files
    #[arg(long, default_value_t = 500)]
    files: usize,

    /// Functions per generated file
    #[arg(long, default_value_t = 40)]
    functions: usize,

    /// Timed runs per scenario (the best run is reported)
    #[arg(long, default_value_t = 3)]
    runs: u32,

    /// Write the markdown report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

// --- Scenarios ---

static PATTERNS: &[(&str, &str, Option<&str>)] = &[
    (
        "errorf",
        "errors.New(fmt.Sprintf(:[[args]]))",
        Some("fmt.Errorf(:[[args]])"),
    ),
    ("self-compare", ":[x] == :[x]", None),
    ("empty-len", "len(:[s]) == 0", Some(":[s] == \"\"")),
    (
        "range-loop",
        "for :[i] := 0; :[i] < len(:[xs]); :[i]++ {:[[body]]}",
        Some("for :[i] := range :[xs] {:[[body]]}"),
    ),
    ("if-err", "if err != nil { return :[[rest]] }", None),
];

fn corpus_dir() -> PathBuf {
    std::env::temp_dir().join("holefix-bench-corpus")
}

fn generate_function(file: usize, n: usize) -> String {
    match n % 4 {
        0 => format!(
            "func f{file}_{n}(v int) error {{\n\tif v == v {{\n\t\treturn errors.New(fmt.Sprintf(\"bad %d\", v))\n\t}}\n\treturn nil\n}}\n\n"
        ),
        1 => format!(
            "func g{file}_{n}(items []string) {{\n\tfor i := 0; i < len(items); i++ {{\n\t\tuse(items[i])\n\t}}\n}}\n\n"
        ),
        2 => format!(
            "func h{file}_{n}(s string) (bool, error) {{\n\terr := check(s)\n\tif err != nil {{ return false, err }}\n\treturn len(s) == 0, nil\n}}\n\n"
        ),
        _ => format!(
            "// k{n} is plain.\nfunc k{file}_{n}(a, b int) int {{\n\tx := a * (b + {n})\n\treturn x\n}}\n\n"
        ),
    }
}

fn generate_corpus(dir: &Path, files: usize, functions: usize) -> usize {
    let _ = fs::remove_dir_all(dir);
    fs::create_dir_all(dir).expect("failed to create corpus dir");
    let mut bytes = 0;
    for file in 0..files {
        let mut source = String::from("package bench\n\n");
        for n in 0..functions {
            source.push_str(&generate_function(file, n));
        }
        bytes += source.len();
        fs::write(dir.join(format!("f{file:05}.go")), source).expect("failed to write corpus file");
    }
    bytes
}

fn rule_set() -> RuleSet {
    let mut config = ResolvedConfig::default();
    for (name, pattern, rewrite) in PATTERNS {
        let mut rule = RuleConfig::new(*name, *pattern);
        rule.rewrite = rewrite.map(String::from);
        config.rules.push(rule);
    }
    RuleSet::compile(&config).expect("bench patterns should compile")
}

fn best_of<T>(runs: u32, mut f: impl FnMut() -> T) -> (f64, T) {
    let mut best = f64::INFINITY;
    let mut last = None;
    for _ in 0..runs.max(1) {
        let start = Instant::now();
        let value = f();
        best = best.min(start.elapsed().as_secs_f64());
        last = Some(value);
    }
    (best, last.expect("at least one run"))
}

fn format_time(seconds: f64) -> String {
    if seconds < 0.001 {
        format!("{:.0}us", seconds * 1_000_000.0)
    } else if seconds < 1.0 {
        format!("{:.1}ms", seconds * 1000.0)
    } else {
        format!("{seconds:.2}s")
    }
}

fn main() {
    let args = Args::parse();
    let dir = corpus_dir();

    eprintln!(
        "Generating {} files x {} functions in {}...",
        args.files,
        args.functions,
        dir.display()
    );
    let bytes = generate_corpus(&dir, args.files, args.functions);
    let mut files: Vec<PathBuf> = fs::read_dir(&dir)
        .expect("failed to list corpus")
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    files.sort();

    eprintln!("Compiling patterns...");
    let (compile_secs, _) = best_of(args.runs, || {
        for _ in 0..1000 {
            for (_, pattern, _) in PATTERNS {
                let _ = compile(pattern);
            }
        }
    });

    let sample = fs::read_to_string(&files[0]).expect("failed to read sample file");
    eprintln!("Tokenizing one file...");
    let (tokenize_secs, token_count) = best_of(args.runs, || {
        Target::tokenize(&sample).map(|t| t.len()).unwrap_or(0)
    });

    let mut per_pattern = Vec::new();
    let target = Target::tokenize(&sample).expect("generated source is balanced");
    for (name, pattern, _) in PATTERNS {
        let matcher = Matcher::new(&compile(pattern).expect("bench pattern"));
        let (secs, count) = best_of(args.runs, || matcher.find_iter(&target).count());
        per_pattern.push((*name, secs, count));
    }

    let rules = rule_set();
    eprintln!("Matching {} rules over the corpus...", rules.len());
    let (corpus_secs, result) = best_of(args.runs, || {
        run_linter(&files, &rules, LintOptions::default())
    });

    let mut md = String::new();
    writeln!(md, "# holefix Benchmark").unwrap();
    writeln!(md).unwrap();
    writeln!(
        md,
        "**Corpus:** {} files, {} functions each, {:.1} MiB",
        result.file_count,
        args.functions,
        bytes as f64 / (1024.0 * 1024.0)
    )
    .unwrap();
    writeln!(md, "**Runs:** best of {}", args.runs).unwrap();
    writeln!(md).unwrap();
    writeln!(md, "| Scenario | Time | Result |").unwrap();
    writeln!(md, "|----------|-----:|-------:|").unwrap();
    writeln!(
        md,
        "| compile {} patterns x1000 | {} | - |",
        PATTERNS.len(),
        format_time(compile_secs)
    )
    .unwrap();
    writeln!(
        md,
        "| tokenize one file | {} | {token_count} tokens |",
        format_time(tokenize_secs)
    )
    .unwrap();
    for (name, secs, count) in &per_pattern {
        writeln!(md, "| match `{name}` on one file | {} | {count} matches |", format_time(*secs)).unwrap();
    }
    writeln!(
        md,
        "| all rules, whole corpus (parallel) | {} | {} matches |",
        format_time(corpus_secs),
        result.diagnostics.len()
    )
    .unwrap();

    match args.output {
        Some(path) => {
            fs::write(&path, &md).expect("failed to write report");
            eprintln!("\nWrote {}", path.display());
        }
        None => print!("{md}"),
    }

    let _ = fs::remove_dir_all(&dir);
}
