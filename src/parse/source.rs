use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::diagnostic::Location;

/// A file's bytes plus the offsets where its lines start.
#[derive(Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: Vec<u8>,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Self::from_bytes(path, content))
    }

    /// In-memory source (stdin); `path` is only used for display and globs.
    pub fn from_string(path: PathBuf, content: String) -> Self {
        Self::from_bytes(&path, content.into_bytes())
    }

    pub fn from_bytes(path: &Path, content: Vec<u8>) -> Self {
        let line_starts = std::iter::once(0)
            .chain(
                content
                    .iter()
                    .enumerate()
                    .filter(|&(i, &b)| b == b'\n' && i + 1 < content.len())
                    .map(|(i, _)| i + 1),
            )
            .collect();
        Self {
            path: path.to_path_buf(),
            content,
            line_starts,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.content
    }

    /// The content as text; matching only runs on valid UTF-8.
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.content)
            .with_context(|| format!("{} is not valid UTF-8", self.path.display()))
    }

    pub fn path_str(&self) -> &str {
        self.path.to_str().unwrap_or("<non-utf8 path>")
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// 1-indexed line and 0-indexed character column of `byte_offset`.
    pub fn location(&self, byte_offset: usize) -> Location {
        let line_idx = self
            .line_starts
            .partition_point(|&start| start <= byte_offset)
            .saturating_sub(1);
        let start = self.line_starts[line_idx];
        let end = byte_offset.min(self.content.len());
        // UTF-8 continuation bytes are 0b10xxxxxx
        let column = self.content[start..end]
            .iter()
            .filter(|&&b| b & 0xC0 != 0x80)
            .count();
        Location {
            line: line_idx + 1,
            column,
        }
    }
}
