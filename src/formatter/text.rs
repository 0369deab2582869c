use std::io::{self, Write};

use crate::diagnostic::Diagnostic;
use crate::formatter::Formatter;

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_to(
        &self,
        diagnostics: &[Diagnostic],
        file_count: usize,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        for d in diagnostics {
            if d.corrected {
                writeln!(out, "{d} [fixed]")?;
            } else {
                writeln!(out, "{d}")?;
            }
        }
        let match_word = if diagnostics.len() == 1 {
            "match"
        } else {
            "matches"
        };
        let file_word = if file_count == 1 { "file" } else { "files" };
        write!(
            out,
            "\n{file_count} {file_word} inspected, {} {match_word} found",
            diagnostics.len(),
        )?;
        let corrected = diagnostics.iter().filter(|d| d.corrected).count();
        if corrected > 0 {
            write!(out, ", {corrected} fixed")?;
        }
        writeln!(out)
    }
}
