//! Static-Value codec
//!
//! Bidirectional mapping between a restricted literal-value grammar and its
//! syntax-tree representation. `encode` reads a Tree-Sitter node into a
//! [`StaticValue`]; `decode` renders a stored value back to JavaScript
//! literal source text. Anything outside the grammar (identifiers bound to
//! unknown values, call expressions, spreads, interpolated templates) is not
//! statically known: `encode` reports that as `None`, never as an error.

use itertools::Itertools;
use tree_sitter::Node;

use crate::tree_sitter_parser::{named_children, node_text, string_literal_value};

/// A literal value reconstructible at build time without evaluating code
#[derive(Debug, Clone, PartialEq)]
pub enum StaticValue {
    Number(f64),
    Bool(bool),
    Str(String),
    Null,
    Undefined,
    NaN,
    Infinity,
    /// Object literal; key order is preserved
    Object(Vec<(String, StaticValue)>),
    Array(Vec<StaticValue>),
}

/// Read a syntax-tree node into a `StaticValue`.
///
/// Returns `None` for any shape outside the grammar; callers treat this as
/// "not statically known", not as a fatal condition.
pub fn encode(node: Node, source: &str) -> Option<StaticValue> {
    match node.kind() {
        "number" => parse_number(node_text(node, source)).map(StaticValue::Number),
        "true" => Some(StaticValue::Bool(true)),
        "false" => Some(StaticValue::Bool(false)),
        "string" | "template_string" => string_literal_value(node, source).map(StaticValue::Str),
        "null" => Some(StaticValue::Null),
        "undefined" => Some(StaticValue::Undefined),
        "identifier" => match node_text(node, source) {
            "NaN" => Some(StaticValue::NaN),
            "Infinity" => Some(StaticValue::Infinity),
            _ => None,
        },
        // A signed numeric literal parses as a unary expression; fold the
        // sign into the number. All other unary expressions are not static.
        "unary_expression" => {
            let operator = node.child_by_field_name("operator")?;
            let argument = node.child_by_field_name("argument")?;
            if argument.kind() != "number" {
                return None;
            }
            let value = parse_number(node_text(argument, source))?;
            match node_text(operator, source) {
                "-" => Some(StaticValue::Number(-value)),
                "+" => Some(StaticValue::Number(value)),
                _ => None,
            }
        }
        "parenthesized_expression" => {
            let inner = named_children(node);
            encode(*inner.first()?, source)
        }
        "object" => {
            let mut properties = Vec::new();
            for member in named_children(node) {
                if member.kind() != "pair" {
                    return None;
                }
                let key = object_key(member.child_by_field_name("key")?, source)?;
                let value = encode(member.child_by_field_name("value")?, source)?;
                properties.push((key, value));
            }
            Some(StaticValue::Object(properties))
        }
        "array" => {
            let mut elements = Vec::new();
            for element in named_children(node) {
                elements.push(encode(element, source)?);
            }
            Some(StaticValue::Array(elements))
        }
        _ => None,
    }
}

/// Render a `StaticValue` back to JavaScript literal source text.
///
/// Exact inverse of [`encode`] up to evaluated value: parsing the output and
/// encoding the resulting node yields the same `StaticValue`.
pub fn decode(value: &StaticValue) -> String {
    match value {
        StaticValue::Number(n) => format_number(*n),
        StaticValue::Bool(b) => b.to_string(),
        StaticValue::Str(s) => quote_string(s),
        StaticValue::Null => "null".to_string(),
        StaticValue::Undefined => "undefined".to_string(),
        StaticValue::NaN => "NaN".to_string(),
        StaticValue::Infinity => "Infinity".to_string(),
        StaticValue::Object(properties) => {
            if properties.is_empty() {
                "{}".to_string()
            } else {
                let body = properties
                    .iter()
                    .map(|(key, value)| format!("{}: {}", object_key_literal(key), decode(value)))
                    .join(", ");
                format!("{{ {} }}", body)
            }
        }
        StaticValue::Array(elements) => {
            if elements.is_empty() {
                "[]".to_string()
            } else {
                format!("[{}]", elements.iter().map(decode).join(", "))
            }
        }
    }
}

/// Parse a JavaScript numeric literal (decimal, hex, octal, binary)
fn parse_number(text: &str) -> Option<f64> {
    let text = text.replace('_', "");
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok().map(|n| n as f64);
    }
    if let Some(oct) = text.strip_prefix("0o").or_else(|| text.strip_prefix("0O")) {
        return i64::from_str_radix(oct, 8).ok().map(|n| n as f64);
    }
    if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        return i64::from_str_radix(bin, 2).ok().map(|n| n as f64);
    }
    text.parse::<f64>().ok()
}

/// Format a number the way JavaScript would print it
fn format_number(n: f64) -> String {
    if n == n.trunc() && n.abs() < 9e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Double-quote a string with the escapes needed to round-trip
fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Extract an object key: bare identifier, quoted string or numeric literal
fn object_key(node: Node, source: &str) -> Option<String> {
    match node.kind() {
        "property_identifier" | "number" => Some(node_text(node, source).to_string()),
        "string" => string_literal_value(node, source),
        _ => None,
    }
}

/// Render an object key, quoting it unless it is a valid bare identifier
fn object_key_literal(key: &str) -> String {
    let mut chars = key.chars();
    let bare = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    };
    if bare {
        key.to_string()
    } else {
        quote_string(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree_sitter_parser::JsParser;

    /// Parse `expr` as the initializer of a declaration and encode it
    fn encode_expr(expr: &str) -> Option<StaticValue> {
        let source = format!("const x = {}", expr);
        let tree = JsParser::new().unwrap().parse(&source).unwrap();
        let declarator = tree
            .root_node()
            .named_child(0)
            .unwrap()
            .named_child(0)
            .unwrap();
        let value = declarator.child_by_field_name("value").unwrap();
        encode(value, &source)
    }

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode_expr("1"), Some(StaticValue::Number(1.0)));
        assert_eq!(encode_expr("-1"), Some(StaticValue::Number(-1.0)));
        assert_eq!(encode_expr("3.14"), Some(StaticValue::Number(3.14)));
        assert_eq!(encode_expr("true"), Some(StaticValue::Bool(true)));
        assert_eq!(encode_expr("false"), Some(StaticValue::Bool(false)));
        assert_eq!(
            encode_expr("'hello'"),
            Some(StaticValue::Str("hello".to_string()))
        );
        assert_eq!(encode_expr("null"), Some(StaticValue::Null));
        assert_eq!(encode_expr("undefined"), Some(StaticValue::Undefined));
        assert_eq!(encode_expr("NaN"), Some(StaticValue::NaN));
        assert_eq!(encode_expr("Infinity"), Some(StaticValue::Infinity));
    }

    #[test]
    fn test_encode_template_string() {
        assert_eq!(encode_expr("`hi`"), Some(StaticValue::Str("hi".to_string())));
        assert_eq!(encode_expr("``"), Some(StaticValue::Str(String::new())));
        assert_eq!(encode_expr("`hi ${name}`"), None);
    }

    #[test]
    fn test_encode_containers() {
        assert_eq!(encode_expr("{}"), Some(StaticValue::Object(vec![])));
        assert_eq!(encode_expr("[]"), Some(StaticValue::Array(vec![])));
        assert_eq!(
            encode_expr("[1, 'a', null]"),
            Some(StaticValue::Array(vec![
                StaticValue::Number(1.0),
                StaticValue::Str("a".to_string()),
                StaticValue::Null,
            ]))
        );
        assert_eq!(
            encode_expr("{ a: { b: [1] }, 'weird-prop': false }"),
            Some(StaticValue::Object(vec![
                (
                    "a".to_string(),
                    StaticValue::Object(vec![(
                        "b".to_string(),
                        StaticValue::Array(vec![StaticValue::Number(1.0)]),
                    )])
                ),
                ("weird-prop".to_string(), StaticValue::Bool(false)),
            ]))
        );
    }

    #[test]
    fn test_encode_rejects_non_static_shapes() {
        assert_eq!(encode_expr("someVariable"), None);
        assert_eq!(encode_expr("f()"), None);
        assert_eq!(encode_expr("[...xs]"), None);
        assert_eq!(encode_expr("[1, f()]"), None);
        assert_eq!(encode_expr("{ a: b }"), None);
        assert_eq!(encode_expr("{ ...rest }"), None);
        assert_eq!(encode_expr("!0"), None);
        assert_eq!(encode_expr("-x"), None);
    }

    #[test]
    fn test_decode_literals() {
        assert_eq!(decode(&StaticValue::Number(1.0)), "1");
        assert_eq!(decode(&StaticValue::Number(-2.5)), "-2.5");
        assert_eq!(decode(&StaticValue::Str("a\"b".to_string())), r#""a\"b""#);
        assert_eq!(decode(&StaticValue::Object(vec![])), "{}");
        assert_eq!(
            decode(&StaticValue::Object(vec![
                ("a".to_string(), StaticValue::Number(1.0)),
                ("weird-prop".to_string(), StaticValue::Null),
            ])),
            r#"{ a: 1, "weird-prop": null }"#
        );
        assert_eq!(
            decode(&StaticValue::Array(vec![
                StaticValue::Bool(true),
                StaticValue::Undefined,
            ])),
            "[true, undefined]"
        );
    }

    #[test]
    fn test_round_trip() {
        let values = [
            "0",
            "-17",
            "3.14",
            "true",
            "'hello world'",
            "null",
            "undefined",
            "NaN",
            "Infinity",
            "{}",
            "[]",
            "[1, 2, { d: 1, e: 'coucou' }]",
            "{ a: { b: [1, 2, { d: 1 }] }, c: false, 'weird-prop': 1 }",
        ];
        for expr in values {
            let encoded = encode_expr(expr).unwrap_or_else(|| panic!("{} must encode", expr));
            let rendered = decode(&encoded);
            let re_encoded = encode_expr(&rendered)
                .unwrap_or_else(|| panic!("decoded text {} must re-encode", rendered));
            assert_eq!(re_encoded, encoded, "round trip failed for {}", expr);
        }
    }
}
