//! Hole semantics: capture kind strategies and quantifiers.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use regex::Regex;

/// How much target content a hole may consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    /// `:[name]`: exactly one balanced unit.
    One,
    /// `:[[name]]`: a greedy run of units up to the enclosing closer.
    Block,
}

impl Quantifier {
    pub fn open(self) -> &'static str {
        match self {
            Quantifier::One => ":[",
            Quantifier::Block => ":[[",
        }
    }

    pub fn close(self) -> &'static str {
        match self {
            Quantifier::One => "]",
            Quantifier::Block => "]]",
        }
    }
}

/// A constraint on what captured text a hole accepts.
///
/// Implementations are shared across matcher threads, so they must be
/// `Send + Sync`. New kinds plug in here without touching the matcher.
pub trait CaptureStrategy: Send + Sync + fmt::Debug {
    /// Stable name used in rule files and for equality.
    ///
    /// Names identify strategies: two strategies sharing a name are treated
    /// as the same kind by `CaptureKind` equality and hashing, and so by
    /// pattern equality. Give every strategy a distinct name.
    fn name(&self) -> &'static str;

    fn accepts(&self, captured: &str) -> bool;
}

/// Unconstrained capture, the default.
#[derive(Debug)]
pub struct AnySpan;

impl CaptureStrategy for AnySpan {
    fn name(&self) -> &'static str {
        "any"
    }

    fn accepts(&self, _captured: &str) -> bool {
        true
    }
}

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// A single identifier such as `foo` or `_tmp1`.
#[derive(Debug)]
pub struct Identifier;

impl CaptureStrategy for Identifier {
    fn name(&self) -> &'static str {
        "identifier"
    }

    fn accepts(&self, captured: &str) -> bool {
        IDENTIFIER_RE.is_match(captured)
    }
}

/// Handle to a capture strategy. Two kinds are equal when their names are.
///
/// Strategies are usually zero-sized, so their addresses carry no identity;
/// the name is the only key. `custom` strategies must not reuse `any`,
/// `identifier` or each other's names.
#[derive(Clone, Copy)]
pub struct CaptureKind(&'static dyn CaptureStrategy);

impl CaptureKind {
    pub const ANY: CaptureKind = CaptureKind(&AnySpan);
    pub const IDENTIFIER: CaptureKind = CaptureKind(&Identifier);

    /// Wrap a caller-provided strategy.
    pub const fn custom(strategy: &'static dyn CaptureStrategy) -> Self {
        CaptureKind(strategy)
    }

    /// Look up a built-in kind by name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "any" => Some(Self::ANY),
            "identifier" | "ident" => Some(Self::IDENTIFIER),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    pub fn accepts(&self, captured: &str) -> bool {
        self.0.accepts(captured)
    }
}

impl Default for CaptureKind {
    fn default() -> Self {
        Self::ANY
    }
}

impl PartialEq for CaptureKind {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for CaptureKind {}

impl Hash for CaptureKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl fmt::Debug for CaptureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CaptureKind({})", self.name())
    }
}

impl fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration carried by every hole token and node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HoleConfig {
    pub name: String,
    pub kind: CaptureKind,
    pub quantifier: Quantifier,
}

impl HoleConfig {
    pub fn new(name: impl Into<String>, quantifier: Quantifier) -> Self {
        Self {
            name: name.into(),
            kind: CaptureKind::ANY,
            quantifier,
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: CaptureKind) -> Self {
        self.kind = kind;
        self
    }

    /// Pattern syntax for this hole. Capture kinds have no syntax of their own.
    pub fn to_source(&self) -> String {
        format!(
            "{}{}{}",
            self.quantifier.open(),
            self.name,
            self.quantifier.close()
        )
    }
}

impl fmt::Display for HoleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == CaptureKind::ANY && self.quantifier == Quantifier::One {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}:{}:{:?}", self.name, self.kind, self.quantifier)
        }
    }
}

/// Whether `name` is a legal hole name: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_hole_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
