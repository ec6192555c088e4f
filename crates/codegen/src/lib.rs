//! # Gorbe Code Generation
//!
//! Compiles Ruby programs, given as Ripper s-expressions, into Go source for
//! the Grumpy runtime. Every Ruby value becomes a boxed `*πg.Object` and every
//! runtime operation that can fail returns an exception instead of panicking.
//!
//! ## Architecture
//!
//! 1. **Input**: a `program` node from [`gorbe_syntax`]
//! 2. **Scopes**: a stack of top-level, method and class scopes tracks
//!    variables, temporaries and labels
//! 3. **Lowering**: statements and expressions are written as checked runtime
//!    calls; control flow becomes labels and `goto`s
//! 4. **Dispatch**: each unit body runs inside a checkpoint loop, so errors,
//!    `return`, `break` and `next` all unwind by `continue`
//! 5. **Output**: one Go file registering a module with the runtime
//!
//! ## Usage
//!
//! ```rust
//! use gorbe_codegen::{CompileOptions, compile};
//! use gorbe_syntax::load_json;
//!
//! let program = load_json(r#"["program", [["assign",
//!     ["var_field", ["@ident", "x", [1, 0]]],
//!     ["@int", "42", [1, 4]]]]]"#).unwrap();
//! let unit = compile(&program, CompileOptions::default()).unwrap();
//! assert!(unit.go_source.contains("SetItem(πF, ßx.ToObject(), πg.NewInt(42).ToObject())"));
//! ```

pub mod compiler;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod options;
pub mod runtime;
pub mod scope;

pub use compiler::module::ModuleCompiler;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{CodegenError, CodegenResult};
pub use options::{CompileOptions, CompiledUnit};

/// Compile a Ruby `program` node into a Go source unit.
pub fn compile(
    program: &gorbe_syntax::Node,
    options: CompileOptions,
) -> CodegenResult<CompiledUnit> {
    ModuleCompiler::compile(program, options)
}
