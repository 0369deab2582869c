use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::Serialize;

use crate::diagnostic::Diagnostic;
use crate::formatter::Formatter;

pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonOutput<'a> {
    metadata: Metadata,
    matches: Vec<Match<'a>>,
}

#[derive(Serialize)]
struct Metadata {
    files_inspected: usize,
    match_count: usize,
    corrected_count: usize,
}

#[derive(Serialize)]
struct Match<'a> {
    path: &'a str,
    line: usize,
    column: usize,
    severity: &'static str,
    rule: &'a str,
    message: &'a str,
    matched: &'a str,
    captures: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    replacement: Option<&'a str>,
    corrected: bool,
}

impl Formatter for JsonFormatter {
    fn format_to(
        &self,
        diagnostics: &[Diagnostic],
        file_count: usize,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        let output = JsonOutput {
            metadata: Metadata {
                files_inspected: file_count,
                match_count: diagnostics.len(),
                corrected_count: diagnostics.iter().filter(|d| d.corrected).count(),
            },
            matches: diagnostics
                .iter()
                .map(|d| Match {
                    path: &d.path,
                    line: d.location.line,
                    column: d.location.column,
                    severity: d.severity.name(),
                    rule: &d.rule_name,
                    message: &d.message,
                    matched: &d.matched,
                    captures: &d.captures,
                    replacement: d.replacement.as_deref(),
                    corrected: d.corrected,
                })
                .collect(),
        };
        serde_json::to_writer_pretty(&mut *out, &output)?;
        writeln!(out)
    }
}
