//! Loader for the JSON rendering of `Ripper.sexp`.
//!
//! `to_json` turns Ruby symbols into strings, so the shape is recovered
//! positionally: an array headed by a string is a node, any other array is a
//! list, and a string anywhere else is an atom.

use serde_json::Value;

use crate::ast::{Node, Position, Sexp, Tag};
use crate::error::{LoadError, LoadResult};

/// Parse a Ripper JSON document whose top level is a node (normally `program`).
pub fn load_json(input: &str) -> LoadResult<Node> {
    let value: Value = serde_json::from_str(input)?;
    node_from_value(&value)
}

pub fn node_from_value(value: &Value) -> LoadResult<Node> {
    match sexp_from_value(value)? {
        Sexp::Node(node) => Ok(node),
        other => Err(LoadError::NotANode(other.to_string())),
    }
}

pub fn sexp_from_value(value: &Value) -> LoadResult<Sexp> {
    match value {
        Value::Null => Ok(Sexp::Nil),
        Value::Bool(b) => Ok(Sexp::Bool(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(Sexp::Int)
            .ok_or_else(|| LoadError::UnsupportedValue(n.to_string())),
        Value::String(s) => Ok(Sexp::Atom(s.clone())),
        Value::Array(items) => match items.split_first() {
            Some((Value::String(head), rest)) => node_from_parts(head, rest).map(Sexp::Node),
            _ => items.iter().map(sexp_from_value).collect::<LoadResult<Vec<_>>>().map(Sexp::List),
        },
        Value::Object(_) => Err(LoadError::UnsupportedValue(value.to_string())),
    }
}

fn node_from_parts(head: &str, rest: &[Value]) -> LoadResult<Node> {
    let tag = Tag::from_name(head);
    if tag.is_scanner_event() {
        return token_from_parts(tag, rest);
    }
    let children = rest.iter().map(sexp_from_value).collect::<LoadResult<Vec<_>>>()?;
    Ok(Node::new(tag, children))
}

fn token_from_parts(tag: Tag, rest: &[Value]) -> LoadResult<Node> {
    let malformed = |reason: &str| LoadError::MalformedToken {
        tag: tag.name().to_string(),
        reason: reason.to_string(),
    };
    let [text, pos] = rest else {
        return Err(malformed("expected text and position"));
    };
    let text = text.as_str().ok_or_else(|| malformed("token text is not a string"))?;
    let pos = match pos.as_array().map(Vec::as_slice) {
        Some([line, column]) => {
            let coord = |v: &Value| v.as_u64().and_then(|n| u32::try_from(n).ok());
            match (coord(line), coord(column)) {
                (Some(line), Some(column)) => Position::new(line, column),
                _ => return Err(malformed("position must be two non-negative integers")),
            }
        }
        _ => return Err(malformed("position must be [line, column]")),
    };
    Ok(Node::token(tag, text, pos))
}
