//! Class definition lowering

use gorbe_syntax::{Node, Tag};

use crate::compiler::context::CompilationContext;
use crate::compiler::expr::ExprCompiler;
use crate::compiler::function::body_statements;
use crate::compiler::shape::{NodeShape, is_absent};
use crate::compiler::stmt::StmtCompiler;
use crate::compiler::value::ValueHandle;
use crate::emit::go::go_str;
use crate::error::{CodegenError, CodegenResult};
use crate::runtime;
use crate::scope::{ScopeKind, SlotType, VariableClassifier};

pub struct ClassCompiler;

impl ClassCompiler {
    /// Evaluate the class body into a fresh dict, then build the type with
    /// `type(name, bases, dict)` and bind it.
    pub fn compile_class(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<()> {
        node.expect_arity(4)?;
        if ctx.scopes.enclosing_function().is_some() {
            return Err(CodegenError::semantic(node, "class definition in method body."));
        }
        let const_ref = node.child_node(1)?;
        if const_ref.tag() != &Tag::ConstRef {
            return Err(CodegenError::unsupported(const_ref));
        }
        const_ref.expect_arity(2)?;
        let name = const_ref.child_node(1)?.token_text()?;
        let stmts = body_statements(node.child_node(3)?)?;
        tracing::debug!(name, "lower class");

        let superclass = node.child(2)?;
        let base = if is_absent(superclass) {
            let message = format!("class {name} has no superclass; deriving from object");
            ctx.diagnostics.note(node.line(), message);
            ValueHandle::Literal(runtime::OBJECT_TYPE.to_string())
        } else {
            ExprCompiler::compile_sexp(ctx, superclass)?
        };

        let dict = ctx.alloc_temp(SlotType::Dict);
        let bases = ctx.alloc_temp(SlotType::Args);
        ctx.writer.write(&format!("{dict} = πg.NewDict()"));
        ctx.writer.write(&format!("{bases} = make([]*πg.Object, 1)"));
        ctx.writer.write(&format!("{bases}[0] = {base}"));
        ctx.release(base);

        let mut classifier = VariableClassifier::new();
        classifier.scan(stmts)?;

        ctx.scopes.push(ScopeKind::Class, name);
        for var in classifier.finish().into_values().filter(|var| var.is_global()) {
            ctx.scopes.current_mut().declare_class_global(&var.name);
        }
        let lowered = ctx.capture(|ctx| StmtCompiler::compile_body(ctx, stmts));
        let scope = ctx.scopes.pop();
        let ((), body) = lowered?;
        let Some(scope) = scope else {
            return Err(CodegenError::structural(node, "Class scope was not open."));
        };

        let w = &mut ctx.writer;
        w.write(&format!(
            "_, πE = πg.NewCode({}, {}, nil, 0, {} {{",
            go_str(name),
            go_str(&ctx.options.script),
            runtime::BODY_FUNC,
        ));
        w.indent();
        w.write(&format!("πClass := {dict}"));
        w.write("_ = πClass");
        w.write_temp_decls(&scope.temps().declarations());
        w.write("var πR *πg.Object; _ = πR");
        w.write("var πE *πg.BaseException; _ = πE");
        w.write_block(&scope.checkpoints(), &body);
        w.write("return nil, πE");
        w.dedent();
        w.write("}).Eval(πF, πF.Globals(), nil, nil)");
        w.write("if πE != nil {\n\tcontinue\n}");

        let result = ctx.alloc_temp(SlotType::Object);
        let type_args = format!(
            "πg.NewStr({}).ToObject(), πg.NewTuple({bases}...).ToObject(), {dict}.ToObject()",
            go_str(name)
        );
        ctx.writer.write_checked_call2(
            &result,
            &format!("πg.TypeType.ToObject().Call(πF, []*πg.Object{{{type_args}}}, nil)"),
        );
        ctx.free_temp(&dict);
        ctx.free_temp(&bases);

        let result = ValueHandle::Temp(result);
        ctx.bind_var(name, &result)?;
        ctx.release(result);
        Ok(())
    }
}
