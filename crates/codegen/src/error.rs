//! Codegen error types

use gorbe_syntax::{Node, Sexp};
use thiserror::Error;

pub const REPORT_URL: &str = "https://github.com/okamotoyuki/gorbe/issues";

#[derive(Debug, Error)]
pub enum CodegenError {
    /// The node does not have the shape its tag promises.
    #[error("Node: {node} - {message}")]
    Structural { node: String, message: String },

    /// Well-formed input that cannot be given a meaning.
    #[error("Node: {node} - {message}")]
    Semantic { node: String, message: String },

    #[error("AST node '{tag}' is currently not supported yet. Please report it at {REPORT_URL}.")]
    Unsupported { tag: String, node: String },
}

impl CodegenError {
    pub fn structural(node: &Node, message: impl Into<String>) -> Self {
        CodegenError::Structural { node: node.to_string(), message: message.into() }
    }

    /// Shape error for a child that is not a node at all.
    pub fn malformed(sexp: &Sexp, message: impl Into<String>) -> Self {
        CodegenError::Structural { node: sexp.to_string(), message: message.into() }
    }

    pub fn semantic(node: &Node, message: impl Into<String>) -> Self {
        CodegenError::Semantic { node: node.to_string(), message: message.into() }
    }

    pub fn unsupported(node: &Node) -> Self {
        CodegenError::Unsupported { tag: node.tag().name().to_string(), node: node.to_string() }
    }

    /// Arity check shared by every lowering: Ruby array length, tag included.
    pub fn expect_arity(node: &Node, size: usize) -> CodegenResult<()> {
        if node.arity() == size {
            Ok(())
        } else {
            Err(Self::structural(node, format!("Node size must be {size}.")))
        }
    }

    /// The offending node in Ruby sexp notation.
    pub fn node_text(&self) -> &str {
        match self {
            CodegenError::Structural { node, .. }
            | CodegenError::Semantic { node, .. }
            | CodegenError::Unsupported { node, .. } => node,
        }
    }
}

pub type CodegenResult<T> = Result<T, CodegenError>;

#[cfg(test)]
mod tests {
    use super::*;
    use gorbe_syntax::{Position, Tag};

    #[test]
    fn test_structural_message_quotes_node() {
        let node = Node::new(Tag::Assign, vec![Sexp::Nil]);
        let err = CodegenError::expect_arity(&node, 3).unwrap_err();
        assert_eq!(err.to_string(), "Node: [:assign, nil] - Node size must be 3.");
    }

    #[test]
    fn test_unsupported_names_tag() {
        let node = Node::token(Tag::from_name("@CHAR"), "?a", Position::new(1, 0));
        let err = CodegenError::unsupported(&node);
        assert_eq!(
            err.to_string(),
            "AST node '@CHAR' is currently not supported yet. Please report it at https://github.com/okamotoyuki/gorbe/issues."
        );
        assert_eq!(err.node_text(), r#"[:@CHAR, "?a", [1, 0]]"#);
    }
}
