//! Pattern parser.
//!
//! Turns the token stream from the lexer into a `PatternNode`. Single pass,
//! one token of lookahead; open blocks live on the builder's explicit stack
//! so adversarially deep nesting cannot exhaust the call stack.

use super::ast::{HoleNode, Node, PatternNode, TreeBuilder};
use super::error::{ParseError, QueryError};
use super::lexer::{Token, TokenKind, lex};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(tok)
    }

    pub fn parse(&mut self) -> Result<PatternNode, ParseError> {
        let mut builder = TreeBuilder::default();

        loop {
            let at_end = self
                .peek()
                .is_none_or(|tok| tok.kind == TokenKind::EndOfInput);
            if at_end {
                if let Some(offset) = builder.open_position() {
                    return Err(ParseError::UnterminatedBlock { offset });
                }
                return Ok(builder.finish());
            }

            let Some(tok) = self.advance() else {
                continue;
            };
            match &tok.kind {
                TokenKind::Text | TokenKind::Whitespace => builder.push_text(&tok.value, tok.offset),
                TokenKind::Hole(config) => builder.push(Node::Hole(HoleNode {
                    config: config.clone(),
                    position: tok.offset,
                })),
                TokenKind::LeftBrace => builder.open(tok.offset),
                TokenKind::RightBrace => {
                    let offset = tok.offset;
                    if !builder.close() {
                        return Err(ParseError::UnbalancedBrace { offset });
                    }
                }
                TokenKind::EndOfInput => {}
            }
        }
    }
}

/// Parse an already-lexed token stream.
pub fn parse(tokens: Vec<Token>) -> Result<PatternNode, ParseError> {
    Parser::new(tokens).parse()
}

/// Lex and parse a pattern string.
pub fn compile(pattern: &str) -> Result<PatternNode, QueryError> {
    Ok(parse(lex(pattern)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::NodeKind;
    use crate::query::error::LexError;
    use crate::query::hole::{HoleConfig, Quantifier};

    #[test]
    fn test_parser_simple_call() {
        let ast = compile("foo(:[a])").unwrap();
        assert_eq!(ast.children.len(), 3);
        assert!(matches!(&ast.children[0], Node::Text(t) if t.content == "foo("));
        match &ast.children[1] {
            Node::Hole(h) => {
                assert_eq!(h.config, HoleConfig::new("a", Quantifier::One));
                assert_eq!(h.position, 4);
            }
            other => panic!("expected hole, got {other:?}"),
        }
        assert!(matches!(&ast.children[2], Node::Text(t) if t.content == ")"));
    }

    #[test]
    fn test_parser_coalesces_text_and_whitespace() {
        let ast = compile("return  x ;").unwrap();
        assert_eq!(ast.children.len(), 1);
        assert!(matches!(&ast.children[0], Node::Text(t) if t.content == "return  x ;" && t.position == 0));
    }

    #[test]
    fn test_parser_block() {
        let ast = compile("if :[c] { :[[body]] }").unwrap();
        assert_eq!(ast.children.len(), 4);
        match &ast.children[3] {
            Node::Block(block) => {
                assert_eq!(block.position, 8);
                let kinds: Vec<NodeKind> = block.content.iter().map(Node::kind).collect();
                assert_eq!(kinds, vec![NodeKind::Text, NodeKind::Hole, NodeKind::Text]);
            }
            other => panic!("expected block, got {other:?}"),
        }
    }

    #[test]
    fn test_parser_nested_blocks() {
        let ast = compile("{a{b{c}}d}").unwrap();
        assert_eq!(ast.children.len(), 1);
        assert_eq!(ast.to_source(), "{a{b{c}}d}");
        let Node::Block(outer) = &ast.children[0] else {
            panic!("expected block");
        };
        assert_eq!(outer.content.len(), 3);
        assert_eq!(outer.content[1].kind(), NodeKind::Block);
    }

    #[test]
    fn test_parser_empty_pattern() {
        let ast = compile("").unwrap();
        assert!(ast.children.is_empty());
        assert_eq!(ast.kind(), NodeKind::Pattern);
    }

    #[test]
    fn test_parser_unbalanced_brace() {
        assert_eq!(
            compile("a } b").unwrap_err(),
            QueryError::Parse(ParseError::UnbalancedBrace { offset: 2 })
        );
        assert_eq!(
            compile("{}}").unwrap_err(),
            QueryError::Parse(ParseError::UnbalancedBrace { offset: 2 })
        );
    }

    #[test]
    fn test_parser_unterminated_block() {
        assert_eq!(
            compile("x { { y }").unwrap_err(),
            QueryError::Parse(ParseError::UnterminatedBlock { offset: 2 })
        );
        assert_eq!(
            compile("{").unwrap_err(),
            QueryError::Parse(ParseError::UnterminatedBlock { offset: 0 })
        );
    }

    #[test]
    fn test_parser_lex_errors_propagate() {
        assert_eq!(
            compile("f(:[x").unwrap_err(),
            QueryError::Lex(LexError::UnterminatedHole { offset: 2 })
        );
    }

    #[test]
    fn test_parser_without_end_token() {
        let mut tokens = lex("a {b}").unwrap();
        tokens.pop();
        let ast = parse(tokens).unwrap();
        assert_eq!(ast, compile("a {b}").unwrap());
    }

    #[test]
    fn test_parser_whitespace_variants_are_equal() {
        assert_eq!(compile("a  b").unwrap(), compile("a b").unwrap());
        assert_eq!(
            compile("if :[c] {\n    :[[b]]\n}").unwrap(),
            compile("if :[c] { :[[b]] }").unwrap()
        );
    }

    #[test]
    fn test_parser_deep_nesting() {
        let depth = 100_000;
        let pattern = format!("{}x{}", "{".repeat(depth), "}".repeat(depth));
        let ast = compile(&pattern).unwrap();
        assert_eq!(ast.walk().count(), depth * 2 + 1);
        let unbalanced = format!("{}x{}", "{".repeat(depth), "}".repeat(depth - 1));
        assert_eq!(
            compile(&unbalanced).unwrap_err(),
            QueryError::Parse(ParseError::UnterminatedBlock { offset: 0 })
        );
    }

    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        fn piece() -> impl Strategy<Value = String> {
            prop_oneof![
                "[a-z(),;=.+*]{1,4}",
                "[ \t\n]{1,3}",
                "[a-z_][a-z0-9_]{0,3}".prop_map(|n| format!(":[{n}]")),
                "[a-z_][a-z0-9_]{0,3}".prop_map(|n| format!(":[[{n}]]")),
                Just("{".to_string()),
                Just("}".to_string()),
            ]
        }

        fn pattern_text() -> impl Strategy<Value = String> {
            prop::collection::vec(piece(), 0..20).prop_map(|v| v.concat())
        }

        proptest! {
            #[test]
            fn compile_is_total(input in ".{0,60}") {
                let _ = compile(&input);
            }

            #[test]
            fn compile_is_deterministic(input in pattern_text()) {
                match (compile(&input), compile(&input)) {
                    (Ok(a), Ok(b)) => prop_assert!(a == b),
                    (Err(a), Err(b)) => prop_assert_eq!(a, b),
                    _ => prop_assert!(false, "nondeterministic result for {:?}", input),
                }
            }

            #[test]
            fn round_trip_through_source(input in pattern_text()) {
                if let Ok(ast) = compile(&input) {
                    let reparsed = compile(&ast.to_source());
                    prop_assert!(reparsed.is_ok(), "re-parse failed for {:?}", ast.to_source());
                    prop_assert!(reparsed.unwrap() == ast);
                }
            }

            #[test]
            fn unbalanced_braces_never_parse(input in pattern_text()) {
                let mut depth: i64 = 0;
                let mut balanced = true;
                for b in input.bytes() {
                    match b {
                        b'{' => depth += 1,
                        b'}' => {
                            depth -= 1;
                            if depth < 0 {
                                balanced = false;
                            }
                        }
                        _ => {}
                    }
                }
                if !balanced || depth != 0 {
                    prop_assert!(compile(&input).is_err());
                }
            }
        }
    }
}
