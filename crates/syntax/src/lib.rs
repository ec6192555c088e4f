//! # Gorbe Syntax
//!
//! The Ruby AST consumed by the Gorbe compiler. Gorbe does not parse Ruby itself:
//! the tree is produced by Ruby's own `Ripper.sexp` and handed over as JSON.
//!
//! ```text
//! ruby -rripper -rjson -e 'puts Ripper.sexp(ARGF.read).to_json' hello.rb > hello.json
//! ```
//!
//! This crate provides:
//! - [`Node`], [`Sexp`] and [`Tag`]: the tagged-union tree, with scanner tokens
//!   carrying their text and [`Position`]
//! - [`load_json`]: conversion from Ripper's JSON rendering
//! - `Display` impls that print a tree back in Ruby s-expression notation,
//!   which is how compile errors quote the offending node
//! - [`SourceLines`]: the original source keyed by line number, used to
//!   annotate generated code
//!
//! ## Usage
//!
//! ```rust
//! use gorbe_syntax::{Tag, load_json};
//!
//! let program = load_json(r#"["program", [["@int", "1", [1, 0]]]]"#).unwrap();
//! assert_eq!(program.tag(), &Tag::Program);
//! assert_eq!(program.to_string(), r#"[:program, [[:@int, "1", [1, 0]]]]"#);
//! ```

pub mod ast;
pub mod error;
pub mod json;
pub mod source;

pub use ast::{Node, Position, Sexp, Tag};
pub use error::{LoadError, LoadResult};
pub use json::{load_json, node_from_value, sexp_from_value};
pub use source::SourceLines;
