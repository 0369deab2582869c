//! Matcher and binder.
//!
//! A `PatternNode` is flattened into a linear program (text, hole, block
//! open/close) and aligned against a `Target` starting at every token offset,
//! leftmost first. Exactly-one holes take one balanced unit; block holes are
//! greedy and backtrack by shrinking one atom at a time. A word glued to a
//! call (`foo(x)`) is tried as the whole call first, then as the bare word.
//!
//! Backtracking keeps a stack of immutable state snapshots. Bindings are a
//! persistent list, so forking a state copies a pointer, not the captures.
//! The search is exponential in the number of block holes in the worst case;
//! patterns are small, so no memoization is attempted.

use std::collections::BTreeMap;
use std::rc::Rc;

use super::ast::{PatternNode, Step};
use super::hole::{HoleConfig, Quantifier};
use super::target::{Delim, Span, Target, TargetKind};

/// Hole name -> captured text, the input to the rewriter.
pub type Bindings = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Restart one token after each match start instead of after its end.
    pub overlapping: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub span: Span,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// Byte span of the whole match in the target source.
    pub span: Span,
    pub captures: BTreeMap<String, Capture>,
}

impl MatchResult {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.captures.get(name).map(|c| c.text.as_str())
    }

    pub fn bindings(&self) -> Bindings {
        self.captures
            .iter()
            .map(|(name, capture)| (name.clone(), capture.text.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// One or more whitespace bytes.
    Space,
}

#[derive(Debug, Clone)]
enum Instr {
    Text(Vec<Segment>),
    Hole(HoleConfig),
    Open,
    Close,
}

fn segments(content: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut literal = String::new();
    for ch in content.chars() {
        if ch.is_ascii_whitespace() {
            if !literal.is_empty() {
                out.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            if out.last() != Some(&Segment::Space) {
                out.push(Segment::Space);
            }
        } else {
            literal.push(ch);
        }
    }
    if !literal.is_empty() {
        out.push(Segment::Literal(literal));
    }
    out
}

struct Binding<'p> {
    name: &'p str,
    span: Span,
    prev: Option<Rc<Binding<'p>>>,
}

#[derive(Clone)]
struct State<'p> {
    pc: usize,
    pos: usize,
    /// Closing-brace token indices of the pattern blocks entered so far.
    scopes: Vec<usize>,
    bindings: Option<Rc<Binding<'p>>>,
}

impl<'p> State<'p> {
    fn new(pos: usize) -> Self {
        Self {
            pc: 0,
            pos,
            scopes: Vec::new(),
            bindings: None,
        }
    }

    fn limit(&self, target: &Target<'_>) -> usize {
        self.scopes.last().copied().unwrap_or(target.len())
    }

    fn lookup(&self, name: &str) -> Option<Span> {
        let mut cursor = self.bindings.as_deref();
        while let Some(binding) = cursor {
            if binding.name == name {
                return Some(binding.span);
            }
            cursor = binding.prev.as_deref();
        }
        None
    }

    fn bind(&mut self, name: &'p str, span: Span) {
        self.bindings = Some(Rc::new(Binding {
            name,
            span,
            prev: self.bindings.take(),
        }));
    }
}

/// A compiled pattern, reusable across targets and threads.
#[derive(Debug, Clone)]
pub struct Matcher {
    program: Vec<Instr>,
    /// Whether a match may start on a whitespace token.
    leading_space: bool,
}

impl Matcher {
    pub fn new(pattern: &PatternNode) -> Self {
        let program: Vec<Instr> = pattern
            .walk()
            .map(|step| match step {
                Step::Text(t) => Instr::Text(segments(&t.content)),
                Step::Hole(h) => Instr::Hole(h.config.clone()),
                Step::Enter(_) => Instr::Open,
                Step::Exit(_) => Instr::Close,
            })
            .collect();
        let leading_space = matches!(
            program.first(),
            Some(Instr::Text(segs)) if segs.first() == Some(&Segment::Space)
        );
        Self {
            program,
            leading_space,
        }
    }

    /// Lazily find non-overlapping matches, leftmost first.
    pub fn find_iter<'m, 't>(&'m self, target: &'t Target<'t>) -> Matches<'m, 't> {
        self.find_iter_with(target, MatchOptions::default())
    }

    pub fn find_iter_with<'m, 't>(
        &'m self,
        target: &'t Target<'t>,
        options: MatchOptions,
    ) -> Matches<'m, 't> {
        Matches {
            matcher: self,
            target,
            next: 0,
            options,
        }
    }

    /// Resume scanning at token index `start`, e.g. from `Matches::position`.
    pub fn find_iter_from<'m, 't>(
        &'m self,
        target: &'t Target<'t>,
        start: usize,
        options: MatchOptions,
    ) -> Matches<'m, 't> {
        Matches {
            matcher: self,
            target,
            next: start,
            options,
        }
    }

    pub fn is_match(&self, target: &Target<'_>) -> bool {
        (0..target.len()).any(|start| {
            self.can_start_at(target, start)
                && self
                    .align(target, start)
                    .is_some_and(|(_, end)| end > start)
        })
    }

    fn can_start_at(&self, target: &Target<'_>, start: usize) -> bool {
        self.leading_space || target.kind(start) != TargetKind::Whitespace
    }

    /// First successful alignment at `start`, with the token index it ends at.
    fn align(&self, target: &Target<'_>, start: usize) -> Option<(MatchResult, usize)> {
        let mut pending = vec![State::new(start)];
        while let Some(mut state) = pending.pop() {
            if self.run(target, &mut state, &mut pending) {
                let result = finish(target, start, &state);
                return Some((result, state.pos));
            }
        }
        None
    }

    /// Advance `state` until it matches (true), fails (false) or reaches an
    /// unbound hole, whose alternatives are pushed onto `pending` (false).
    fn run<'p>(
        &'p self,
        target: &Target<'_>,
        state: &mut State<'p>,
        pending: &mut Vec<State<'p>>,
    ) -> bool {
        while let Some(instr) = self.program.get(state.pc) {
            let limit = state.limit(target);
            match instr {
                Instr::Text(segs) => match match_segments(target, segs, state.pos, limit) {
                    Some(end) => state.pos = end,
                    None => return false,
                },
                Instr::Open => {
                    if state.pos >= limit
                        || target.kind(state.pos) != TargetKind::Open(Delim::Brace)
                    {
                        return false;
                    }
                    state.scopes.push(target.partner(state.pos));
                    state.pos += 1;
                }
                Instr::Close => {
                    if state.scopes.last() != Some(&state.pos) {
                        return false;
                    }
                    state.scopes.pop();
                    state.pos += 1;
                }
                Instr::Hole(config) => {
                    if let Some(bound) = state.lookup(&config.name) {
                        let literal = [Segment::Literal(target.slice(bound).to_string())];
                        match match_segments(target, &literal, state.pos, limit) {
                            Some(end) => state.pos = end,
                            None => return false,
                        }
                    } else {
                        let limit = limit.min(target.scope_end(state.pos));
                        let ends = match config.quantifier {
                            Quantifier::One => unit_ends(target, state.pos, limit),
                            Quantifier::Block => atom_ends(target, state.pos, limit),
                        };
                        // Ascending, so the longest candidate is popped first.
                        for end in ends {
                            let span = target.span_between(state.pos, end);
                            if !config.kind.accepts(target.slice(span)) {
                                continue;
                            }
                            let mut alt = state.clone();
                            alt.bind(&config.name, span);
                            alt.pos = end;
                            alt.pc += 1;
                            pending.push(alt);
                        }
                        return false;
                    }
                }
            }
            state.pc += 1;
        }
        true
    }
}

fn finish(target: &Target<'_>, start: usize, state: &State<'_>) -> MatchResult {
    let mut captures = BTreeMap::new();
    let mut cursor = state.bindings.as_deref();
    while let Some(binding) = cursor {
        captures
            .entry(binding.name.to_string())
            .or_insert_with(|| Capture {
                span: binding.span,
                text: target.slice(binding.span).to_string(),
            });
        cursor = binding.prev.as_deref();
    }
    MatchResult {
        span: target.span_between(start, state.pos),
        captures,
    }
}

/// Match literal/whitespace segments at token `pos`; the match must end on
/// a token boundary no later than token `limit`.
fn match_segments(
    target: &Target<'_>,
    segs: &[Segment],
    pos: usize,
    limit: usize,
) -> Option<usize> {
    let src = target.source().as_bytes();
    let end = target.offset_of(limit);
    let mut at = target.offset_of(pos);
    for seg in segs {
        match seg {
            Segment::Space => {
                let n = src[at..end]
                    .iter()
                    .take_while(|b| b.is_ascii_whitespace())
                    .count();
                if n == 0 {
                    return None;
                }
                at += n;
            }
            Segment::Literal(text) => {
                if !src[at..end].starts_with(text.as_bytes()) {
                    return None;
                }
                at += text.len();
            }
        }
    }
    target.boundary_at(at)
}

/// Candidate ends for an exactly-one hole at `pos`, ascending: a bracket
/// group, a single punctuation or comment token, or a word/literal followed
/// by zero or more bracket groups glued directly after it (`bar(baz)`).
fn unit_ends(target: &Target<'_>, pos: usize, limit: usize) -> Vec<usize> {
    if pos >= limit {
        return Vec::new();
    }
    match target.kind(pos) {
        TargetKind::Whitespace | TargetKind::Close(_) => Vec::new(),
        TargetKind::Open(_) => vec![target.partner(pos) + 1],
        TargetKind::Comment | TargetKind::Punct => vec![pos + 1],
        TargetKind::Word | TargetKind::Literal => {
            let mut ends = vec![pos + 1];
            let mut end = pos + 1;
            while end < limit && matches!(target.kind(end), TargetKind::Open(_)) {
                end = target.partner(end) + 1;
                ends.push(end);
            }
            ends
        }
    }
}

/// Every atom boundary from `pos` (empty capture) up to `limit`, ascending.
fn atom_ends(target: &Target<'_>, pos: usize, limit: usize) -> Vec<usize> {
    let mut ends = vec![pos];
    let mut p = pos;
    while p < limit {
        p = match target.kind(p) {
            TargetKind::Open(_) => target.partner(p) + 1,
            _ => p + 1,
        };
        ends.push(p);
    }
    ends
}

/// Lazy, restartable sequence of matches over one target.
pub struct Matches<'m, 't> {
    matcher: &'m Matcher,
    target: &'t Target<'t>,
    next: usize,
    options: MatchOptions,
}

impl Matches<'_, '_> {
    /// Token index the next search starts from.
    pub fn position(&self) -> usize {
        self.next
    }
}

impl Iterator for Matches<'_, '_> {
    type Item = MatchResult;

    fn next(&mut self) -> Option<MatchResult> {
        while self.next < self.target.len() {
            let start = self.next;
            self.next += 1;
            if !self.matcher.can_start_at(self.target, start) {
                continue;
            }
            let Some((result, end)) = self.matcher.align(self.target, start) else {
                continue;
            };
            // Empty matches carry no text to report or rewrite.
            if end == start {
                continue;
            }
            if !self.options.overlapping {
                self.next = end;
            }
            return Some(result);
        }
        None
    }
}
