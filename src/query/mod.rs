//! Hole pattern language: lexer, parser, matcher and rewriter.
//!
//! `compile` turns pattern text into a `PatternNode`; a `Matcher` built from
//! it finds matches in a `Target`, and `rewrite` fills a template from the
//! bindings of a match.

pub mod ast;
pub mod error;
pub mod hole;
pub mod lexer;
pub mod matcher;
pub mod parser;
pub mod rewrite;
pub mod target;

pub use ast::{BlockNode, HoleNode, Node, NodeKind, PatternNode, Step, TextNode};
pub use error::{LexError, MatchError, ParseError, QueryError, RewriteError};
pub use hole::{CaptureKind, CaptureStrategy, HoleConfig, Quantifier};
pub use lexer::{Lexer, Token, TokenKind, lex};
pub use matcher::{Bindings, Capture, MatchOptions, MatchResult, Matcher, Matches};
pub use parser::{Parser, compile, parse};
pub use rewrite::{rewrite, rewrite_all, rewrite_match, unbound_holes};
pub use target::{Delim, Span, Target, TargetKind, TargetToken};
