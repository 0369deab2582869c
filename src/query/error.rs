//! Error taxonomy for pattern compilation, matching and rewriting.
//!
//! "No match" is never an error: it is an empty `Matches` iterator.

use thiserror::Error;

/// Malformed hole syntax in pattern text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    /// `:[` not closed before end of input, or closed after an illegal character.
    #[error("unterminated hole at offset {offset}")]
    UnterminatedHole { offset: usize },
    /// `:[]` or `:[[]]`.
    #[error("empty hole name at offset {offset}")]
    EmptyHoleName { offset: usize },
}

impl LexError {
    pub fn offset(&self) -> usize {
        match self {
            LexError::UnterminatedHole { offset } | LexError::EmptyHoleName { offset } => *offset,
        }
    }
}

/// Unbalanced or unterminated block structure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unmatched `}}` at offset {offset}")]
    UnbalancedBrace { offset: usize },
    /// `offset` points at the `{` that was never closed.
    #[error("block opened at offset {offset} is never closed")]
    UnterminatedBlock { offset: usize },
}

impl ParseError {
    pub fn offset(&self) -> usize {
        match self {
            ParseError::UnbalancedBrace { offset } | ParseError::UnterminatedBlock { offset } => {
                *offset
            }
        }
    }
}

/// Either failure of `compile`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl QueryError {
    /// Byte offset into the pattern where compilation failed.
    pub fn offset(&self) -> usize {
        match self {
            QueryError::Lex(e) => e.offset(),
            QueryError::Parse(e) => e.offset(),
        }
    }
}

/// The target token stream cannot be matched against.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("malformed target at offset {offset}: {reason}")]
    MalformedTarget { offset: usize, reason: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    #[error("template hole `{name}` at offset {offset} has no binding")]
    UnboundHole { name: String, offset: usize },
}
