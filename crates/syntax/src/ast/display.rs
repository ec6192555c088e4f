//! Ruby s-expression rendering.
//!
//! Nodes print the way `Ripper.sexp(...).inspect` would show them, so an error
//! quoting a node reads the same as what a Ruby user sees in `irb`.

use std::fmt;

use super::{Node, Payload, Sexp};

const OPERATOR_SYMBOLS: &[&str] = &[
    "+", "-", "*", "/", "%", "**", "==", "!=", "<", "<=", ">", ">=", "<=>", "===", "=~", "!~",
    "<<", ">>", "&", "|", "^", "!", "~", "-@", "+@", "[]", "[]=", "`",
];

/// Render `name` as a Ruby symbol literal, quoting it when the bare form would
/// not parse.
pub fn symbol_to_string(name: &str) -> String {
    if is_plain_symbol(name) {
        format!(":{name}")
    } else {
        format!(":{}", ruby_string(name))
    }
}

fn is_plain_symbol(name: &str) -> bool {
    if OPERATOR_SYMBOLS.contains(&name) {
        return true;
    }
    let body = name
        .strip_prefix("@@")
        .or_else(|| name.strip_prefix('@'))
        .or_else(|| name.strip_prefix('$'))
        .unwrap_or(name);
    let body = body
        .strip_suffix(['?', '!', '='])
        .filter(|_| !name.starts_with(['@', '$']))
        .unwrap_or(body);
    let mut chars = body.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => chars.all(|c| c.is_alphanumeric() || c == '_'),
        _ => false,
    }
}

/// Render `text` as a double-quoted Ruby string literal.
pub fn ruby_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{1b}' => out.push_str("\\e"),
            '#' if matches!(chars.peek(), Some('{' | '$' | '@')) => out.push_str("\\#"),
            c if c.is_control() => out.push_str(&format!("\\x{:02X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", symbol_to_string(self.tag().name()))?;
        match self.payload() {
            Payload::Token { text, pos } => {
                write!(f, ", {}, [{}, {}]", ruby_string(text), pos.line, pos.column)?;
            }
            Payload::Children(children) => {
                for child in children {
                    write!(f, ", {child}")?;
                }
            }
        }
        f.write_str("]")
    }
}

impl fmt::Display for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexp::Nil => f.write_str("nil"),
            Sexp::Bool(value) => write!(f, "{value}"),
            Sexp::Int(value) => write!(f, "{value}"),
            Sexp::Atom(atom) => f.write_str(&symbol_to_string(atom)),
            Sexp::Node(node) => write!(f, "{node}"),
            Sexp::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Position, Tag};

    #[test]
    fn test_binary_matches_ripper_inspect() {
        let node = Node::new(
            Tag::Binary,
            vec![
                Node::token(Tag::Int, "1", Position::new(1, 0)).into(),
                Sexp::Atom("+".to_string()),
                Node::token(Tag::Int, "1", Position::new(1, 4)).into(),
            ],
        );
        assert_eq!(
            node.to_string(),
            r#"[:binary, [:@int, "1", [1, 0]], :+, [:@int, "1", [1, 4]]]"#
        );
    }

    #[test]
    fn test_symbols() {
        assert_eq!(symbol_to_string("program"), ":program");
        assert_eq!(symbol_to_string("@tstring_content"), ":@tstring_content");
        assert_eq!(symbol_to_string("<=>"), ":<=>");
        assert_eq!(symbol_to_string("empty?"), ":empty?");
        assert_eq!(symbol_to_string("."), r#":".""#);
        assert_eq!(symbol_to_string("&."), r#":"&.""#);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(ruby_string("a\"b\\c\n"), r#""a\"b\\c\n""#);
        assert_eq!(ruby_string("#{x}"), r##""\#{x}""##);
        assert_eq!(ruby_string("# ok"), r##""# ok""##);
    }

    #[test]
    fn test_nested_lists_and_scalars() {
        let node = Node::new(
            Tag::ArgsAddBlock,
            vec![Sexp::List(vec![]), Sexp::Bool(false)],
        );
        assert_eq!(node.to_string(), "[:args_add_block, [], false]");
        assert_eq!(Sexp::List(vec![Sexp::Int(1), Sexp::Nil]).to_string(), "[1, nil]");
    }
}
