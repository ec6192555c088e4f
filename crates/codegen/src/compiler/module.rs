//! Module compilation: one Ruby program to one Go file

use gorbe_syntax::{Node, Tag};

use crate::compiler::context::CompilationContext;
use crate::compiler::shape::NodeShape;
use crate::compiler::stmt::StmtCompiler;
use crate::emit::Writer;
use crate::emit::go::go_str;
use crate::error::{CodegenError, CodegenResult};
use crate::options::{CompileOptions, CompiledUnit};
use crate::runtime;

pub struct ModuleCompiler {
    options: CompileOptions,
}

impl ModuleCompiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Compile a `program` node with the given options.
    pub fn compile(program: &Node, options: CompileOptions) -> CodegenResult<CompiledUnit> {
        Self::new(options).compile_program(program)
    }

    pub fn compile_program(&self, program: &Node) -> CodegenResult<CompiledUnit> {
        if program.tag() != &Tag::Program {
            return Err(CodegenError::structural(program, "Root node must be :program."));
        }
        program.expect_arity(2)?;
        tracing::debug!(
            module = %self.options.module,
            package = %self.options.package,
            "compile module"
        );

        let mut ctx = CompilationContext::new(self.options.clone());
        let ((), body) = ctx.capture(|ctx| {
            if ctx.options.prelude {
                ctx.writer.write_checked_call1("πrb.InitGlobalsForRuby(πF)");
            }
            StmtCompiler::compile_body(ctx, program.child(1)?)
        })?;

        let mut w = Writer::new();
        w.write(&format!("package {}", self.options.package));
        w.newline();
        if self.options.prelude {
            w.write("import (\n\tπg \"grumpy\"\n\tπrb \"gorbe\"\n)");
        } else {
            w.write("import πg \"grumpy\"");
        }
        w.newline();
        w.write("var Code *πg.Code");
        w.newline();
        w.write("func init() {");
        w.indent();
        w.write(&format!(
            "Code = πg.NewCode(\"<module>\", {}, nil, 0, {} {{",
            go_str(&self.options.script),
            runtime::BODY_FUNC,
        ));
        w.indent();
        w.write("var πR *πg.Object; _ = πR");
        w.write("var πE *πg.BaseException; _ = πE");
        for decl in ctx.scopes.interner().declarations() {
            w.write(&decl);
        }
        let root = ctx.scopes.root();
        w.write_temp_decls(&root.temps().declarations());
        w.write_block(&root.checkpoints(), &body);
        w.write("return nil, πE");
        w.dedent();
        w.write("})");
        w.write(&format!("πg.RegisterModule({}, Code)", go_str(&self.options.module)));
        w.dedent();
        w.write("}");

        let go_source = w.into_string();
        tracing::debug!(
            bytes = go_source.len(),
            interned = ctx.scopes.interner().len(),
            diagnostics = ctx.diagnostics.len(),
            "module compiled"
        );
        Ok(CompiledUnit { go_source, diagnostics: ctx.diagnostics.into_vec() })
    }
}
