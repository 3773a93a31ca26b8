//! Tree-Sitter based parser for JavaScript/JSX sources
//!
//! Thin wrapper around `tree_sitter` with the `tree-sitter-javascript`
//! grammar. Owns syntax-error reporting and the node helpers (text, span,
//! string-literal extraction) shared by the analyzer, resolver and injector.

use tree_sitter::{Language, Node, Parser, Tree};

use crate::error::{TransformError, TransformResult};
use crate::ir::Span;

/// Parser for the JavaScript sources the transform reads and rewrites
pub struct JsParser {
    parser: Parser,
}

impl JsParser {
    /// Create a new JavaScript parser
    pub fn new() -> TransformResult<Self> {
        let mut parser = Parser::new();
        let language: Language = tree_sitter_javascript::LANGUAGE.into();
        parser
            .set_language(&language)
            .map_err(|e| TransformError::Language(e.to_string()))?;
        Ok(Self { parser })
    }

    /// Parse JavaScript source into a syntax tree
    pub fn parse(&mut self, source: &str) -> TransformResult<Tree> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| TransformError::Parse("failed to parse source".to_string()))?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(TransformError::Parse(format_syntax_error(&root, source)));
        }

        Ok(tree)
    }
}

/// Text covered by a node
pub fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

/// Span covered by a node
pub fn node_span(node: Node) -> Span {
    Span::from_node(&node)
}

/// Named children of a node, in source order, comments excluded
pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// Extract the value of a string literal node.
///
/// Handles `string` nodes (single or double quoted, with escapes) and
/// `template_string` nodes without substitutions. Returns `None` for any
/// other node kind or for templates with interpolation.
pub fn string_literal_value(node: Node, source: &str) -> Option<String> {
    match node.kind() {
        "string" => {
            let text = node_text(node, source);
            unescape_string(text).ok()
        }
        "template_string" => {
            let mut cursor = node.walk();
            if node
                .named_children(&mut cursor)
                .any(|child| child.kind() == "template_substitution")
            {
                return None;
            }
            let text = node_text(node, source);
            unescape_string(text).ok()
        }
        _ => None,
    }
}

/// Format a syntax error message from the parse tree
fn format_syntax_error(node: &Node, source: &str) -> String {
    let mut cursor = node.walk();
    if find_error_node(&mut cursor) {
        let error_node = cursor.node();
        let start = error_node.start_position();
        let error_text = &source[error_node.start_byte()..error_node.end_byte()];

        return format!(
            "syntax error at line {}, column {}: unexpected '{}'",
            start.row + 1,
            start.column + 1,
            error_text
        );
    }

    "syntax error in source code".to_string()
}

/// Find the first ERROR node in the tree
fn find_error_node(cursor: &mut tree_sitter::TreeCursor) -> bool {
    if cursor.node().is_error() || cursor.node().is_missing() {
        return true;
    }

    if cursor.goto_first_child() {
        loop {
            if find_error_node(cursor) {
                return true;
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
        cursor.goto_parent();
    }

    false
}

/// Unescape a quoted string literal (strip delimiters and process escapes)
fn unescape_string(s: &str) -> Result<String, String> {
    let quote = s.chars().next().ok_or("empty string literal")?;
    if !matches!(quote, '"' | '\'' | '`') || !s.ends_with(quote) || s.len() < 2 {
        return Err(format!("invalid string literal: {}", s));
    }

    let inner = &s[1..s.len() - 1];
    let mut result = String::new();
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some('\'') => result.push('\''),
                Some('`') => result.push('`'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => return Err("unterminated escape sequence".to_string()),
            }
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Tree {
        JsParser::new().unwrap().parse(source).unwrap()
    }

    #[test]
    fn test_parse_simple_module() {
        let tree = parse("import { useEffect } from 'react'\nexport default function f() {}");
        assert_eq!(tree.root_node().kind(), "program");
        let children = named_children(tree.root_node());
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].kind(), "import_statement");
        assert_eq!(children[1].kind(), "export_statement");
    }

    #[test]
    fn test_parse_reports_syntax_error_location() {
        let err = JsParser::new().unwrap().parse("function (((").unwrap_err();
        match err {
            TransformError::Parse(msg) => assert!(msg.contains("syntax error"), "{}", msg),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_string_literal_value() {
        let source = r#"f('./hook.jsx', "a\nb", `tpl`, `bad${x}`)"#;
        let tree = parse(source);
        let call = tree
            .root_node()
            .named_child(0)
            .unwrap()
            .named_child(0)
            .unwrap();
        let args = named_children(call.child_by_field_name("arguments").unwrap());
        assert_eq!(
            string_literal_value(args[0], source),
            Some("./hook.jsx".to_string())
        );
        assert_eq!(string_literal_value(args[1], source), Some("a\nb".to_string()));
        assert_eq!(string_literal_value(args[2], source), Some("tpl".to_string()));
        assert_eq!(string_literal_value(args[3], source), None);
    }

    #[test]
    fn test_dynamic_import_callee_kind() {
        let source = "const p = import('./x.js')";
        let tree = parse(source);
        let mut found = false;
        let mut stack = vec![tree.root_node()];
        while let Some(node) = stack.pop() {
            if node.kind() == "call_expression" {
                let callee = node.child_by_field_name("function").unwrap();
                assert_eq!(callee.kind(), "import");
                found = true;
            }
            for i in 0..node.child_count() {
                stack.push(node.child(i).unwrap());
            }
        }
        assert!(found);
    }
}
