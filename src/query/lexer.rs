//! Pattern lexer.
//!
//! Tokenizes pattern strings like `if :[cond] {:[[body]]}`. Hole syntax is
//! recognized eagerly: a literal `:[` cannot be written as plain text.

use super::error::LexError;
use super::hole::{HoleConfig, Quantifier, is_valid_hole_name};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Text,
    Hole(HoleConfig),
    LeftBrace,
    RightBrace,
    Whitespace,
    EndOfInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Exact source text of the token (empty for `EndOfInput`).
    pub value: String,
    /// Byte offset into the pattern.
    pub offset: usize,
}

impl Token {
    pub fn hole_config(&self) -> Option<&HoleConfig> {
        match &self.kind {
            TokenKind::Hole(config) => Some(config),
            _ => None,
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn bytes(&self) -> &'a [u8] {
        self.input.as_bytes()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn at_hole_start(&self) -> bool {
        self.bytes()[self.pos..].starts_with(b":[")
    }

    fn read_while(&mut self, pred: impl Fn(&Self) -> bool) -> &'a str {
        let input = self.input;
        let start = self.pos;
        while self.pos < input.len() && pred(&*self) {
            self.pos += 1;
        }
        &input[start..self.pos]
    }

    fn push(&self, tokens: &mut Vec<Token>, kind: TokenKind, start: usize) {
        tokens.push(Token {
            kind,
            value: self.input[start..self.pos].to_string(),
            offset: start,
        });
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek() {
            let start = self.pos;
            match ch {
                b'{' => {
                    self.pos += 1;
                    self.push(&mut tokens, TokenKind::LeftBrace, start);
                }
                b'}' => {
                    self.pos += 1;
                    self.push(&mut tokens, TokenKind::RightBrace, start);
                }
                _ if ch.is_ascii_whitespace() => {
                    self.read_while(|l| l.bytes()[l.pos].is_ascii_whitespace());
                    self.push(&mut tokens, TokenKind::Whitespace, start);
                }
                b':' if self.at_hole_start() => {
                    let config = self.read_hole()?;
                    self.push(&mut tokens, TokenKind::Hole(config), start);
                }
                _ => {
                    // Text stops at braces, whitespace, and the start of a hole.
                    // Multi-byte UTF-8 sequences never contain ASCII bytes, so
                    // byte-wise scanning keeps `pos` on a char boundary.
                    self.read_while(|l| {
                        let b = l.bytes()[l.pos];
                        !(b == b'{' || b == b'}' || b.is_ascii_whitespace() || l.at_hole_start())
                    });
                    self.push(&mut tokens, TokenKind::Text, start);
                }
            }
        }

        tokens.push(Token {
            kind: TokenKind::EndOfInput,
            value: String::new(),
            offset: self.input.len(),
        });
        Ok(tokens)
    }

    /// Consume `:[name]` or `:[[name]]` starting at the current `:`.
    fn read_hole(&mut self) -> Result<HoleConfig, LexError> {
        let start = self.pos;
        self.pos += 2;
        let quantifier = if self.peek() == Some(b'[') {
            self.pos += 1;
            Quantifier::Block
        } else {
            Quantifier::One
        };

        let name = self.read_while(|l| {
            let b = l.bytes()[l.pos];
            b.is_ascii_alphanumeric() || b == b'_'
        });

        let close = quantifier.close().as_bytes();
        if !self.bytes()[self.pos..].starts_with(close) {
            return Err(LexError::UnterminatedHole { offset: start });
        }
        if name.is_empty() {
            return Err(LexError::EmptyHoleName { offset: start });
        }
        if !is_valid_hole_name(name) {
            return Err(LexError::UnterminatedHole { offset: start });
        }
        self.pos += close.len();
        Ok(HoleConfig::new(name, quantifier))
    }
}

/// Tokenize a whole pattern string.
pub fn lex(pattern: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(pattern).tokenize()
}
