//! Target token stream.
//!
//! The matcher works on a sequence of token spans that tile the target
//! source, plus the bracket structure between them. Callers with their own
//! tokenizer build a `Target` with `Target::new`; `Target::tokenize` uses the
//! built-in scanner for C-family source (Go, C, Java, Rust). Regex literals
//! are not recognized, so JavaScript with bracket characters inside a `/../`
//! literal needs a caller-supplied tokenizer.

use super::error::MatchError;

/// Byte range `[start, end)` in a source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delim {
    Paren,
    Bracket,
    Brace,
}

impl Delim {
    fn from_open(b: u8) -> Option<Delim> {
        match b {
            b'(' => Some(Delim::Paren),
            b'[' => Some(Delim::Bracket),
            b'{' => Some(Delim::Brace),
            _ => None,
        }
    }

    fn from_close(b: u8) -> Option<Delim> {
        match b {
            b')' => Some(Delim::Paren),
            b']' => Some(Delim::Bracket),
            b'}' => Some(Delim::Brace),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Whitespace,
    /// Identifier, keyword or number.
    Word,
    /// String, char or raw-string literal.
    Literal,
    Comment,
    /// Any other single character.
    Punct,
    Open(Delim),
    Close(Delim),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetToken {
    pub kind: TargetKind,
    pub start: usize,
    pub end: usize,
}

impl TargetToken {
    pub const fn new(kind: TargetKind, start: usize, end: usize) -> Self {
        Self { kind, start, end }
    }
}

/// A validated target: tokens tile `source` and brackets balance.
#[derive(Debug)]
pub struct Target<'s> {
    source: &'s str,
    tokens: Vec<TargetToken>,
    /// For brackets, the index of the matching bracket. Unused otherwise.
    partner: Vec<usize>,
    /// Index of the closer of the innermost group containing each token
    /// (the token itself for closers, `tokens.len()` at top level).
    scope_end: Vec<usize>,
}

fn malformed(offset: usize, reason: &'static str) -> MatchError {
    MatchError::MalformedTarget { offset, reason }
}

impl<'s> Target<'s> {
    pub fn new(source: &'s str, tokens: Vec<TargetToken>) -> Result<Self, MatchError> {
        let mut expected = 0;
        for tok in &tokens {
            if tok.start != expected {
                return Err(malformed(expected, "tokens do not tile the source"));
            }
            if tok.end <= tok.start || tok.end > source.len() {
                return Err(malformed(tok.start, "token span is empty or out of bounds"));
            }
            if !source.is_char_boundary(tok.end) {
                return Err(malformed(tok.end, "token ends inside a character"));
            }
            expected = tok.end;
        }
        if expected != source.len() {
            return Err(malformed(expected, "tokens do not cover the source"));
        }

        let mut partner = vec![0; tokens.len()];
        let mut open: Vec<(usize, Delim)> = Vec::new();
        for (i, tok) in tokens.iter().enumerate() {
            match tok.kind {
                TargetKind::Open(delim) => open.push((i, delim)),
                TargetKind::Close(delim) => match open.pop() {
                    Some((j, d)) if d == delim => {
                        partner[i] = j;
                        partner[j] = i;
                    }
                    Some(_) => return Err(malformed(tok.start, "mismatched closing bracket")),
                    None => return Err(malformed(tok.start, "unmatched closing bracket")),
                },
                _ => {}
            }
        }
        if let Some(&(j, _)) = open.last() {
            return Err(malformed(tokens[j].start, "unclosed bracket"));
        }

        let mut scope_end = vec![tokens.len(); tokens.len()];
        let mut enclosing: Vec<usize> = Vec::new();
        for (i, tok) in tokens.iter().enumerate() {
            match tok.kind {
                TargetKind::Close(_) => {
                    scope_end[i] = i;
                    enclosing.pop();
                }
                _ => {
                    if let Some(&opener) = enclosing.last() {
                        scope_end[i] = partner[opener];
                    }
                    if let TargetKind::Open(_) = tok.kind {
                        enclosing.push(i);
                    }
                }
            }
        }

        Ok(Self {
            source,
            tokens,
            partner,
            scope_end,
        })
    }

    /// Build a target with the built-in C-family tokenizer.
    pub fn tokenize(source: &'s str) -> Result<Self, MatchError> {
        Self::new(source, tokenize(source))
    }

    pub fn source(&self) -> &'s str {
        self.source
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn slice(&self, span: Span) -> &'s str {
        &self.source[span.start..span.end]
    }

    pub(crate) fn kind(&self, index: usize) -> TargetKind {
        self.tokens[index].kind
    }

    /// Byte offset where token `index` starts; the source length past the end.
    pub(crate) fn offset_of(&self, index: usize) -> usize {
        self.tokens
            .get(index)
            .map_or(self.source.len(), |t| t.start)
    }

    /// Token index starting exactly at `offset`, if `offset` is a boundary.
    pub(crate) fn boundary_at(&self, offset: usize) -> Option<usize> {
        if offset == self.source.len() {
            return Some(self.tokens.len());
        }
        self.tokens.binary_search_by_key(&offset, |t| t.start).ok()
    }

    pub(crate) fn partner(&self, index: usize) -> usize {
        self.partner[index]
    }

    pub(crate) fn scope_end(&self, index: usize) -> usize {
        self.scope_end.get(index).copied().unwrap_or(self.tokens.len())
    }

    pub(crate) fn span_between(&self, from: usize, to: usize) -> Span {
        Span::new(self.offset_of(from), self.offset_of(to))
    }
}

struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Scanner<'_> {
    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.input.get(self.pos + ahead).copied()
    }

    fn skip_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.pos < self.input.len() && pred(self.input[self.pos]) {
            self.pos += 1;
        }
    }

    /// Quoted literal; stops after the closing quote or before a newline.
    fn skip_quoted(&mut self, quote: u8) {
        self.pos += 1;
        while let Some(b) = self.peek_at(0) {
            match b {
                b'\\' => self.pos = (self.pos + 2).min(self.input.len()),
                b'\n' => return,
                _ if b == quote => {
                    self.pos += 1;
                    return;
                }
                _ => self.pos += 1,
            }
        }
    }

    /// `'x'` and `'\n'` are literals; `'a` with no closing quote right after
    /// one character is a Rust lifetime or loop label.
    fn skip_char_or_lifetime(&mut self) -> TargetKind {
        let Some(next) = self.peek_at(1) else {
            self.pos += 1;
            return TargetKind::Literal;
        };
        let width = utf8_width(next);
        if next != b'\\' && self.peek_at(1 + width) == Some(b'\'') {
            self.pos += width + 2;
            return TargetKind::Literal;
        }
        if next != b'\\' && is_word_byte(next) {
            self.pos += 1;
            self.skip_while(is_word_byte);
            return TargetKind::Word;
        }
        self.skip_quoted(b'\'');
        TargetKind::Literal
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        while self.pos < self.input.len() {
            if self.input[self.pos..].starts_with(b"*/") {
                self.pos += 2;
                return;
            }
            self.pos += 1;
        }
    }
}

fn utf8_width(lead: u8) -> usize {
    match lead {
        0xF0.. => 4,
        0xE0.. => 3,
        0xC0.. => 2,
        _ => 1,
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

/// Split C-family source text into target tokens.
pub fn tokenize(source: &str) -> Vec<TargetToken> {
    let mut s = Scanner {
        input: source.as_bytes(),
        pos: 0,
    };
    let mut tokens = Vec::new();

    while let Some(b) = s.peek_at(0) {
        let start = s.pos;
        let kind = match b {
            _ if b.is_ascii_whitespace() => {
                s.skip_while(|c| c.is_ascii_whitespace());
                TargetKind::Whitespace
            }
            b'/' if s.peek_at(1) == Some(b'/') => {
                s.skip_while(|c| c != b'\n');
                TargetKind::Comment
            }
            b'/' if s.peek_at(1) == Some(b'*') => {
                s.skip_block_comment();
                TargetKind::Comment
            }
            b'"' => {
                s.skip_quoted(b);
                TargetKind::Literal
            }
            b'\'' => s.skip_char_or_lifetime(),
            b'`' => {
                s.pos += 1;
                s.skip_while(|c| c != b'`');
                s.pos = (s.pos + 1).min(s.input.len());
                TargetKind::Literal
            }
            _ if is_word_byte(b) => {
                s.skip_while(is_word_byte);
                TargetKind::Word
            }
            _ => {
                s.pos += 1;
                if let Some(delim) = Delim::from_open(b) {
                    TargetKind::Open(delim)
                } else if let Some(delim) = Delim::from_close(b) {
                    TargetKind::Close(delim)
                } else {
                    TargetKind::Punct
                }
            }
        };
        tokens.push(TargetToken::new(kind, start, s.pos));
    }

    tokens
}
