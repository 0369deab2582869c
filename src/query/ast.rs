//! Pattern AST.
//!
//! Nodes are built once by the parser and are read-only afterwards. Equality
//! and hashing are structural: positions are ignored and whitespace runs in
//! text compare as a single space, so `a  b` and `a b` are the same pattern.
//!
//! Block nesting depth is bounded only by memory. Every traversal here
//! (walking, equality, hashing, cloning, dropping, formatting) runs on an
//! explicit stack, for the root and for any node taken out of it.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::hole::{CaptureKind, HoleConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Pattern,
    Hole,
    Text,
    Block,
}

#[derive(Debug, Clone)]
pub struct HoleNode {
    pub config: HoleConfig,
    pub position: usize,
}

impl HoleNode {
    pub fn name(&self) -> &str {
        &self.config.name
    }
}

#[derive(Debug, Clone)]
pub struct TextNode {
    /// Coalesced literal text and whitespace, verbatim.
    pub content: String,
    pub position: usize,
}

impl TextNode {
    /// True when the node is nothing but whitespace.
    pub fn is_whitespace(&self) -> bool {
        !self.content.is_empty() && self.content.bytes().all(|b| b.is_ascii_whitespace())
    }
}

/// `{ ... }` in the pattern. The braces are structural, not part of `content`.
pub struct BlockNode {
    pub content: Vec<Node>,
    pub position: usize,
}

impl Clone for BlockNode {
    fn clone(&self) -> Self {
        Self {
            content: clone_nodes(&self.content),
            position: self.position,
        }
    }
}

impl Drop for BlockNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.content);
        while let Some(node) = pending.pop() {
            if let Node::Block(mut block) = node {
                pending.append(&mut block.content);
            }
        }
    }
}

impl fmt::Debug for BlockNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockNode({} children):", self.content.len())?;
        write_tree(f, &self.content)
    }
}

#[derive(Clone)]
pub enum Node {
    Hole(HoleNode),
    Text(TextNode),
    Block(BlockNode),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Hole(_) => NodeKind::Hole,
            Node::Text(_) => NodeKind::Text,
            Node::Block(_) => NodeKind::Block,
        }
    }

    pub fn position(&self) -> usize {
        match self {
            Node::Hole(h) => h.position,
            Node::Text(t) => t.position,
            Node::Block(b) => b.position,
        }
    }

    pub fn walk(&self) -> Walk<'_> {
        Walk::new(std::slice::from_ref(self))
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        walks_equal(self.walk(), other.walk())
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Hole(h) => write!(f, "HoleNode({})", h.config),
            Node::Text(t) => write!(f, "TextNode({})", t.content.escape_debug()),
            Node::Block(b) => fmt::Debug::fmt(b, f),
        }
    }
}

/// Root of a parsed query. Never nested inside another node.
pub struct PatternNode {
    pub children: Vec<Node>,
    pub position: usize,
}

impl PatternNode {
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            children,
            position: 0,
        }
    }

    pub fn kind(&self) -> NodeKind {
        NodeKind::Pattern
    }

    /// Pre-order traversal with explicit block enter/exit steps.
    pub fn walk(&self) -> Walk<'_> {
        Walk::new(&self.children)
    }

    pub fn holes(&self) -> impl Iterator<Item = &HoleNode> {
        self.walk().filter_map(|step| match step {
            Step::Hole(h) => Some(h),
            _ => None,
        })
    }

    /// Distinct hole names in order of first appearance.
    pub fn hole_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for hole in self.holes() {
            if !names.contains(&hole.name()) {
                names.push(hole.name());
            }
        }
        names
    }

    /// Re-serialize to pattern syntax. Parsing the result yields an equal tree.
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        for step in self.walk() {
            match step {
                Step::Hole(h) => out.push_str(&h.config.to_source()),
                Step::Text(t) => out.push_str(&t.content),
                Step::Enter(_) => out.push('{'),
                Step::Exit(_) => out.push('}'),
            }
        }
        out
    }

    /// Copy of this pattern with every hole passed through `f`.
    pub fn map_holes(&self, f: impl Fn(&HoleConfig) -> HoleConfig) -> PatternNode {
        let mut builder = TreeBuilder::default();
        for step in self.walk() {
            match step {
                Step::Hole(h) => builder.push(Node::Hole(HoleNode {
                    config: f(&h.config),
                    position: h.position,
                })),
                Step::Text(t) => builder.push(Node::Text(t.clone())),
                Step::Enter(b) => builder.open(b.position),
                Step::Exit(_) => {
                    builder.close();
                }
            }
        }
        let mut pattern = builder.finish();
        pattern.position = self.position;
        pattern
    }

    /// Copy of this pattern where every hole called `name` uses `kind`.
    pub fn with_capture_kind(&self, name: &str, kind: CaptureKind) -> PatternNode {
        self.map_holes(|config| {
            if config.name == name {
                config.clone().with_kind(kind)
            } else {
                config.clone()
            }
        })
    }
}

impl Clone for PatternNode {
    fn clone(&self) -> Self {
        Self {
            children: clone_nodes(&self.children),
            position: self.position,
        }
    }
}

impl PartialEq for PatternNode {
    fn eq(&self, other: &Self) -> bool {
        walks_equal(self.walk(), other.walk())
    }
}

impl Eq for PatternNode {}

impl Hash for PatternNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for step in self.walk() {
            match step {
                Step::Hole(h) => {
                    0u8.hash(state);
                    h.config.hash(state);
                }
                Step::Text(t) => {
                    1u8.hash(state);
                    collapse_whitespace(&t.content).hash(state);
                }
                Step::Enter(_) => 2u8.hash(state),
                Step::Exit(_) => 3u8.hash(state),
            }
        }
    }
}

impl fmt::Display for PatternNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PatternNode({} children):", self.children.len())?;
        write_tree(f, &self.children)
    }
}

impl fmt::Debug for PatternNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// One indented line per node, children numbered within their block.
fn write_tree(f: &mut fmt::Formatter<'_>, nodes: &[Node]) -> fmt::Result {
    let mut indices = vec![0usize];
    for step in Walk::new(nodes) {
        if let Step::Exit(_) = step {
            indices.pop();
            continue;
        }
        let indent = "  ".repeat(indices.len());
        let Some(index) = indices.last_mut() else {
            break;
        };
        let i = *index;
        *index += 1;
        match step {
            Step::Hole(h) => write!(f, "\n{indent}{i}: HoleNode({})", h.config)?,
            Step::Text(t) => {
                write!(f, "\n{indent}{i}: TextNode({})", t.content.escape_debug())?
            }
            Step::Enter(b) => {
                write!(f, "\n{indent}{i}: BlockNode({} children):", b.content.len())?;
                indices.push(0);
            }
            Step::Exit(_) => {}
        }
    }
    Ok(())
}

fn clone_nodes(nodes: &[Node]) -> Vec<Node> {
    let mut builder = TreeBuilder::default();
    for step in Walk::new(nodes) {
        match step {
            Step::Hole(h) => builder.push(Node::Hole(h.clone())),
            Step::Text(t) => builder.push(Node::Text(t.clone())),
            Step::Enter(b) => builder.open(b.position),
            Step::Exit(_) => {
                builder.close();
            }
        }
    }
    builder.into_nodes()
}

/// One step of a pre-order traversal.
#[derive(Debug, Clone, Copy)]
pub enum Step<'a> {
    Hole(&'a HoleNode),
    Text(&'a TextNode),
    Enter(&'a BlockNode),
    Exit(&'a BlockNode),
}

impl Step<'_> {
    fn same_shape(&self, other: &Step<'_>) -> bool {
        match (self, other) {
            (Step::Hole(a), Step::Hole(b)) => a.config == b.config,
            (Step::Text(a), Step::Text(b)) => {
                collapse_whitespace(&a.content) == collapse_whitespace(&b.content)
            }
            (Step::Enter(_), Step::Enter(_)) | (Step::Exit(_), Step::Exit(_)) => true,
            _ => false,
        }
    }
}

pub struct Walk<'a> {
    frames: Vec<(std::slice::Iter<'a, Node>, Option<&'a BlockNode>)>,
}

impl<'a> Walk<'a> {
    pub fn new(nodes: &'a [Node]) -> Self {
        Self {
            frames: vec![(nodes.iter(), None)],
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = Step<'a>;

    fn next(&mut self) -> Option<Step<'a>> {
        loop {
            let (iter, _) = self.frames.last_mut()?;
            match iter.next() {
                Some(Node::Hole(h)) => return Some(Step::Hole(h)),
                Some(Node::Text(t)) => return Some(Step::Text(t)),
                Some(Node::Block(b)) => {
                    self.frames.push((b.content.iter(), Some(b)));
                    return Some(Step::Enter(b));
                }
                None => {
                    if let Some((_, Some(block))) = self.frames.pop() {
                        return Some(Step::Exit(block));
                    }
                }
            }
        }
    }
}

fn walks_equal(mut a: Walk<'_>, mut b: Walk<'_>) -> bool {
    loop {
        match (a.next(), b.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) if x.same_shape(&y) => {}
            _ => return false,
        }
    }
}

/// Collapse every run of ASCII whitespace to a single space.
pub fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_space = false;
    for ch in s.chars() {
        if ch.is_ascii_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

/// Incremental tree construction with an explicit stack of open blocks.
///
/// Adjacent text pushed through `push_text` is coalesced into one node.
#[derive(Default)]
pub(crate) struct TreeBuilder {
    root: Vec<Node>,
    open: Vec<BlockNode>,
}

impl TreeBuilder {
    fn current(&mut self) -> &mut Vec<Node> {
        match self.open.last_mut() {
            Some(block) => &mut block.content,
            None => &mut self.root,
        }
    }

    pub fn push(&mut self, node: Node) {
        self.current().push(node);
    }

    pub fn push_text(&mut self, text: &str, position: usize) {
        let current = self.current();
        if let Some(Node::Text(last)) = current.last_mut() {
            last.content.push_str(text);
        } else {
            current.push(Node::Text(TextNode {
                content: text.to_string(),
                position,
            }));
        }
    }

    pub fn open(&mut self, position: usize) {
        self.open.push(BlockNode {
            content: Vec::new(),
            position,
        });
    }

    /// Close the innermost block. Returns false when no block is open.
    pub fn close(&mut self) -> bool {
        let Some(block) = self.open.pop() else {
            return false;
        };
        self.push(Node::Block(block));
        true
    }

    /// Position of the innermost block still open.
    pub fn open_position(&self) -> Option<usize> {
        self.open.last().map(|b| b.position)
    }

    /// Finish the tree, closing any block left open.
    pub fn finish(self) -> PatternNode {
        PatternNode::new(self.into_nodes())
    }

    fn into_nodes(mut self) -> Vec<Node> {
        while self.close() {}
        self.root
    }
}
