//! Shape checks over Ripper nodes.

use gorbe_syntax::{Node, Sexp, Tag};

use crate::error::{CodegenError, CodegenResult};

pub trait NodeShape {
    fn expect_arity(&self, size: usize) -> CodegenResult<()>;
    fn child(&self, index: usize) -> CodegenResult<&Sexp>;
    fn child_node(&self, index: usize) -> CodegenResult<&Node>;
    fn token_text(&self) -> CodegenResult<&str>;
    /// Operator at `index`: a bare symbol, or an `@op`/`@period` token.
    fn operator_at(&self, index: usize) -> CodegenResult<&str>;
}

impl NodeShape for Node {
    fn expect_arity(&self, size: usize) -> CodegenResult<()> {
        CodegenError::expect_arity(self, size)
    }

    fn child(&self, index: usize) -> CodegenResult<&Sexp> {
        self.get(index)
            .ok_or_else(|| CodegenError::structural(self, format!("Node has no element {index}.")))
    }

    fn child_node(&self, index: usize) -> CodegenResult<&Node> {
        self.child(index)?
            .as_node()
            .ok_or_else(|| {
                CodegenError::structural(self, format!("Element {index} must be a node."))
            })
    }

    fn token_text(&self) -> CodegenResult<&str> {
        self.text().ok_or_else(|| CodegenError::structural(self, "Node must be a scanner token."))
    }

    fn operator_at(&self, index: usize) -> CodegenResult<&str> {
        match self.child(index)? {
            Sexp::Atom(op) => Ok(op),
            Sexp::Node(token) if token.is_token() => token.token_text(),
            _ => {
                let message = format!("Element {index} must be an operator.");
                Err(CodegenError::structural(self, message))
            }
        }
    }
}

/// Nil, `false` and `[]` all mean "nothing here" in Ripper output.
pub fn is_absent(sexp: &Sexp) -> bool {
    match sexp {
        Sexp::List(items) => items.is_empty(),
        other => other.is_absent(),
    }
}

/// Positional arguments of a call, index, `return` or `when` clause.
pub fn argument_list(sexp: &Sexp) -> CodegenResult<Vec<&Sexp>> {
    match sexp {
        Sexp::Nil | Sexp::Bool(false) => Ok(Vec::new()),
        Sexp::List(items) => Ok(items.iter().collect()),
        Sexp::Node(node) => match node.tag() {
            Tag::ArgParen => {
                node.expect_arity(2)?;
                argument_list(node.child(1)?)
            }
            Tag::ArgsAddBlock => {
                node.expect_arity(3)?;
                if !is_absent(node.child(2)?) {
                    return Err(CodegenError::unsupported(node));
                }
                argument_list(node.child(1)?)
            }
            _ => Ok(vec![sexp]),
        },
        other => Err(CodegenError::malformed(other, "Expected an argument list.")),
    }
}

/// Statements of a body: a list, a single modifier-form statement, or nothing.
pub fn statement_list(sexp: &Sexp) -> Vec<&Sexp> {
    match sexp {
        Sexp::List(items) => items.iter().collect(),
        Sexp::Node(_) => vec![sexp],
        _ => Vec::new(),
    }
}

/// Whether lowering `sexp` may store into a local of the current method.
/// `def` and `class` count since they bind their own name.
pub fn rebinds_locals(sexp: &Sexp) -> bool {
    match sexp {
        Sexp::Node(node) => match node.tag() {
            Tag::Assign | Tag::OpAssign | Tag::Def | Tag::Class => true,
            _ => node.children().iter().any(rebinds_locals),
        },
        Sexp::List(items) => items.iter().any(rebinds_locals),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gorbe_syntax::Position;

    fn int(text: &str) -> Sexp {
        Node::token(Tag::Int, text, Position::new(1, 0)).into()
    }

    #[test]
    fn test_argument_list_unwraps_containers() {
        let block = Node::new(
            Tag::ArgsAddBlock,
            vec![Sexp::List(vec![int("1"), int("2")]), Sexp::Bool(false)],
        );
        let paren: Sexp = Node::new(Tag::ArgParen, vec![block.into()]).into();
        assert_eq!(argument_list(&paren).unwrap().len(), 2);
        assert!(argument_list(&Sexp::Nil).unwrap().is_empty());
        assert_eq!(argument_list(&int("3")).unwrap().len(), 1);
    }

    #[test]
    fn test_block_argument_is_unsupported() {
        let block = Node::new(
            Tag::ArgsAddBlock,
            vec![Sexp::List(vec![]), Node::token(Tag::Ident, "blk", Position::new(1, 0)).into()],
        );
        let err = argument_list(&block.into()).unwrap_err();
        assert!(
            matches!(err, CodegenError::Unsupported { ref tag, .. } if tag == "args_add_block")
        );
    }

    #[test]
    fn test_operator_forms() {
        let call = Node::new(
            Tag::Call,
            vec![
                int("1"),
                Node::token(Tag::Period, ".", Position::new(1, 1)).into(),
                Sexp::Atom("+".into()),
            ],
        );
        assert_eq!(call.operator_at(2).unwrap(), ".");
        assert_eq!(call.operator_at(3).unwrap(), "+");
        assert!(call.operator_at(1).is_err());
    }

    #[test]
    fn test_rebinds_locals_looks_through_nesting() {
        let x = Node::token(Tag::Ident, "x", Position::new(1, 0));
        let x = Node::new(Tag::VarField, vec![x.into()]);
        let assign: Sexp = Node::new(Tag::Assign, vec![x.into(), int("5")]).into();
        let paren: Sexp = Node::new(Tag::Paren, vec![Sexp::List(vec![assign])]).into();
        assert!(rebinds_locals(&paren));
        let sum: Sexp =
            Node::new(Tag::Binary, vec![int("1"), Sexp::Atom("+".into()), int("2")]).into();
        assert!(!rebinds_locals(&sum));
        assert!(!rebinds_locals(&Sexp::Nil));
    }
}
