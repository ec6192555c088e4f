//! Compiler orchestration
//!
//! Lowers the Ruby AST to Go source, statement by statement.

pub mod class;
pub mod context;
pub mod control_flow;
pub mod expr;
pub mod function;
pub mod module;
pub mod shape;
pub mod stmt;
pub mod value;
