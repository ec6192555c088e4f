//! Ripper s-expression tree.
//!
//! A [`Node`] is a Ripper event: its [`Tag`] plus either the text and position
//! of a scanner token, or the ordered children of a parser event. Children are
//! [`Sexp`] values, because Ripper freely mixes nodes with plain lists, `nil`,
//! booleans and operator symbols.
//!
//! Child indices follow Ripper's own numbering: index 0 is the tag itself, so
//! the first child of `[:binary, lhs, :+, rhs]` is `node.get(1)`.

pub mod display;
pub mod tag;

pub use tag::Tag;

use serde::Serialize;

/// A line/column pair as reported by Ripper. Lines are 1-based, columns 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Payload {
    /// Scanner token: `[:@ident, "x", [1, 0]]`.
    Token { text: String, pos: Position },
    /// Parser event children.
    Children(Vec<Sexp>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    tag: Tag,
    payload: Payload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sexp {
    Nil,
    Bool(bool),
    Int(i64),
    /// A bare symbol such as the operator in `[:binary, lhs, :+, rhs]`.
    Atom(String),
    Node(Node),
    List(Vec<Sexp>),
}

impl Node {
    pub fn new(tag: Tag, children: Vec<Sexp>) -> Self {
        Self { tag, payload: Payload::Children(children) }
    }

    pub fn token(tag: Tag, text: impl Into<String>, pos: Position) -> Self {
        Self { tag, payload: Payload::Token { text: text.into(), pos } }
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub(crate) fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn is_token(&self) -> bool {
        matches!(self.payload, Payload::Token { .. })
    }

    /// Children of a parser event; empty for tokens.
    pub fn children(&self) -> &[Sexp] {
        match &self.payload {
            Payload::Children(children) => children,
            Payload::Token { .. } => &[],
        }
    }

    /// Child at Ripper index `index` (1-based; 0 is the tag).
    pub fn get(&self, index: usize) -> Option<&Sexp> {
        index.checked_sub(1).and_then(|i| self.children().get(i))
    }

    /// Child at `index` if it is a node.
    pub fn node(&self, index: usize) -> Option<&Node> {
        self.get(index).and_then(Sexp::as_node)
    }

    /// Element count of the node as Ruby sees the array, tag included.
    pub fn arity(&self) -> usize {
        match &self.payload {
            Payload::Token { .. } => 3,
            Payload::Children(children) => children.len() + 1,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Token { text, .. } => Some(text),
            Payload::Children(_) => None,
        }
    }

    /// Position of the token, or of the first token found depth-first below a
    /// parser event.
    pub fn position(&self) -> Option<Position> {
        match &self.payload {
            Payload::Token { pos, .. } => Some(*pos),
            Payload::Children(children) => children.iter().find_map(Sexp::position),
        }
    }

    pub fn line(&self) -> Option<u32> {
        self.position().map(|pos| pos.line)
    }
}

impl Sexp {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Sexp::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Sexp]> {
        match self {
            Sexp::List(items) => Some(items),
            _ => None,
        }
    }

    /// Nil and `false` both mean "absent" in Ripper output.
    pub fn is_absent(&self) -> bool {
        matches!(self, Sexp::Nil | Sexp::Bool(false))
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            Sexp::Node(node) => node.position(),
            Sexp::List(items) => items.iter().find_map(Sexp::position),
            _ => None,
        }
    }
}

impl From<Node> for Sexp {
    fn from(node: Node) -> Self {
        Sexp::Node(node)
    }
}
