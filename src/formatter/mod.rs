pub mod json;
pub mod text;

use std::io::{self, Write};

use crate::diagnostic::Diagnostic;

pub trait Formatter {
    fn format_to(
        &self,
        diagnostics: &[Diagnostic],
        file_count: usize,
        out: &mut dyn Write,
    ) -> io::Result<()>;

    fn print(&self, diagnostics: &[Diagnostic], file_count: usize) -> io::Result<()> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.format_to(diagnostics, file_count, &mut lock)?;
        lock.flush()
    }
}

pub fn create_formatter(format: &str) -> Box<dyn Formatter> {
    match format {
        "json" => Box::new(json::JsonFormatter),
        _ => Box::new(text::TextFormatter),
    }
}
