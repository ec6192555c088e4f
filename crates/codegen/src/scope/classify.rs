//! Variable classification pre-pass.
//!
//! Before a function body is lowered, every name it can bind is recorded:
//! parameters first, then assignment targets and nested definitions in the
//! order they appear. The first occurrence of a name decides its kind.
//! Nested `def` and `class` bodies are not entered; they get their own pass.

use gorbe_syntax::{Node, Sexp, Tag};
use indexmap::IndexMap;

use crate::error::{CodegenError, CodegenResult};
use crate::scope::variable::{VarKind, Variable};

#[derive(Debug, Default)]
pub struct VariableClassifier {
    vars: IndexMap<String, Variable>,
}

impl VariableClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_parameter(&mut self, node: &Node, name: &str, index: usize) -> CodegenResult<()> {
        if self.vars.contains_key(name) {
            return Err(CodegenError::semantic(node, format!("duplicated argument name '{name}'.")));
        }
        self.vars.insert(name.to_string(), Variable::new(name, VarKind::Parameter(index)));
        Ok(())
    }

    pub fn add_local(&mut self, name: &str) {
        if !self.vars.contains_key(name) {
            self.vars.insert(name.to_string(), Variable::new(name, VarKind::Local));
        }
    }

    pub fn add_global(&mut self, node: &Node, name: &str) -> CodegenResult<()> {
        match self.vars.get(name).map(|var| var.kind) {
            None => {
                self.vars.insert(name.to_string(), Variable::new(name, VarKind::Global));
                Ok(())
            }
            Some(VarKind::Global) => Ok(()),
            Some(VarKind::Parameter(_)) => {
                Err(CodegenError::semantic(node, format!("name '{name}' is parameter and global.")))
            }
            Some(VarKind::Local) => Err(CodegenError::semantic(
                node,
                format!("name '{name}' is assigned to before global declaration."),
            )),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.vars.get(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Record every binding made by `body` (a statement list or a single node).
    pub fn scan(&mut self, body: &Sexp) -> CodegenResult<()> {
        match body {
            Sexp::Node(node) => self.scan_node(node),
            Sexp::List(items) => items.iter().try_for_each(|item| self.scan(item)),
            _ => Ok(()),
        }
    }

    fn scan_node(&mut self, node: &Node) -> CodegenResult<()> {
        match node.tag() {
            Tag::Def => {
                if let Some(name) = node.node(1).and_then(Node::text) {
                    self.add_local(name);
                }
                Ok(())
            }
            Tag::Class => {
                if let Some(name) = node.node(1).and_then(|r| r.node(1)).and_then(Node::text) {
                    self.add_local(name);
                }
                Ok(())
            }
            Tag::Assign | Tag::OpAssign => {
                if let Some(field) = node.node(1).filter(|n| n.tag() == &Tag::VarField) {
                    self.scan_target(field)?;
                }
                node.children().iter().try_for_each(|child| self.scan(child))
            }
            _ => node.children().iter().try_for_each(|child| self.scan(child)),
        }
    }

    fn scan_target(&mut self, field: &Node) -> CodegenResult<()> {
        let Some(token) = field.node(1) else {
            return Ok(());
        };
        match (token.tag(), token.text()) {
            (Tag::Ident | Tag::Const, Some(name)) => {
                self.add_local(name);
                Ok(())
            }
            (Tag::GVar, Some(name)) => self.add_global(field, name),
            _ => Ok(()),
        }
    }

    pub fn finish(self) -> IndexMap<String, Variable> {
        self.vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gorbe_syntax::Position;

    fn ident(tag: Tag, name: &str) -> Sexp {
        Node::token(tag, name, Position::new(1, 0)).into()
    }

    fn assign(tag: Tag, name: &str) -> Sexp {
        Node::new(
            Tag::Assign,
            vec![Node::new(Tag::VarField, vec![ident(tag, name)]).into(), ident(Tag::Int, "1")],
        )
        .into()
    }

    #[test]
    fn test_first_occurrence_wins() {
        let mut classifier = VariableClassifier::new();
        let body = Sexp::List(vec![assign(Tag::Ident, "x"), assign(Tag::Ident, "x")]);
        classifier.scan(&body).unwrap();
        assert_eq!(classifier.len(), 1);
        assert_eq!(classifier.get("x").map(|v| v.kind), Some(VarKind::Local));
    }

    #[test]
    fn test_parameter_keeps_kind_when_assigned() {
        let mut classifier = VariableClassifier::new();
        let def = Node::new(Tag::Def, vec![]);
        classifier.add_parameter(&def, "a", 0).unwrap();
        classifier.scan(&assign(Tag::Ident, "a")).unwrap();
        assert_eq!(classifier.get("a").map(|v| v.kind), Some(VarKind::Parameter(0)));
    }

    #[test]
    fn test_duplicate_parameter() {
        let mut classifier = VariableClassifier::new();
        let def = Node::new(Tag::Def, vec![]);
        classifier.add_parameter(&def, "a", 0).unwrap();
        let err = classifier.add_parameter(&def, "a", 1).unwrap_err();
        assert!(err.to_string().contains("duplicated argument name 'a'"));
    }

    #[test]
    fn test_global_conflicts() {
        let def = Node::new(Tag::Def, vec![]);
        let mut classifier = VariableClassifier::new();
        classifier.add_parameter(&def, "a", 0).unwrap();
        classifier.add_local("b");
        assert!(classifier.add_global(&def, "a").is_err());
        assert!(classifier.add_global(&def, "b").is_err());
        assert!(classifier.add_global(&def, "c").is_ok());
        assert!(classifier.add_global(&def, "c").is_ok());
    }

    #[test]
    fn test_gvar_target_is_global() {
        let mut classifier = VariableClassifier::new();
        classifier.scan(&assign(Tag::GVar, "$count")).unwrap();
        assert!(classifier.get("$count").is_some_and(Variable::is_global));
    }

    #[test]
    fn test_nested_def_is_not_entered() {
        let inner = Node::new(
            Tag::Def,
            vec![
                ident(Tag::Ident, "helper"),
                Node::new(Tag::Params, vec![Sexp::Nil; 7]).into(),
                Node::new(Tag::BodyStmt, vec![Sexp::List(vec![assign(Tag::Ident, "hidden")])])
                    .into(),
            ],
        );
        let mut classifier = VariableClassifier::new();
        classifier.scan(&Sexp::List(vec![inner.into()])).unwrap();
        let vars = classifier.finish();
        let names: Vec<&str> = vars.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["helper"]);
    }
}
