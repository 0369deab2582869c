//! Template substitution.
//!
//! A rewrite template is parsed with the same grammar as a match pattern.
//! Holes are replaced by the text bound to their name, text is emitted
//! verbatim and blocks re-emit their braces.

use super::ast::{HoleNode, PatternNode, Step};
use super::error::RewriteError;
use super::matcher::{Bindings, MatchResult};

pub fn rewrite(template: &PatternNode, bindings: &Bindings) -> Result<String, RewriteError> {
    let mut out = String::new();
    for step in template.walk() {
        match step {
            Step::Hole(h) => match bindings.get(h.name()) {
                Some(text) => out.push_str(text),
                None => {
                    return Err(RewriteError::UnboundHole {
                        name: h.name().to_string(),
                        offset: h.position,
                    });
                }
            },
            Step::Text(t) => out.push_str(&t.content),
            Step::Enter(_) => out.push('{'),
            Step::Exit(_) => out.push('}'),
        }
    }
    Ok(out)
}

pub fn rewrite_match(template: &PatternNode, m: &MatchResult) -> Result<String, RewriteError> {
    rewrite(template, &m.bindings())
}

/// Replace every match in `source` with its rewrite. Matches must be in
/// source order; one starting inside an earlier match is left untouched.
pub fn rewrite_all<'a>(
    source: &str,
    template: &PatternNode,
    matches: impl IntoIterator<Item = &'a MatchResult>,
) -> Result<String, RewriteError> {
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for m in matches {
        if m.span.start < cursor {
            continue;
        }
        out.push_str(&source[cursor..m.span.start]);
        out.push_str(&rewrite_match(template, m)?);
        cursor = m.span.end;
    }
    out.push_str(&source[cursor..]);
    Ok(out)
}

/// Template holes whose names `pattern` never binds.
pub fn unbound_holes<'t>(template: &'t PatternNode, pattern: &PatternNode) -> Vec<&'t HoleNode> {
    let bound = pattern.hole_names();
    template
        .holes()
        .filter(|h| !bound.contains(&h.name()))
        .collect()
}
