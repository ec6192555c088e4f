//! Statement lowering

use gorbe_syntax::{Node, Sexp, Tag};

use crate::compiler::class::ClassCompiler;
use crate::compiler::context::CompilationContext;
use crate::compiler::control_flow::ControlFlowCompiler;
use crate::compiler::expr::ExprCompiler;
use crate::compiler::function::FunctionCompiler;
use crate::compiler::shape::{NodeShape, argument_list, statement_list};
use crate::compiler::value::ValueHandle;
use crate::error::{CodegenError, CodegenResult};
use crate::runtime;
use crate::scope::{ScopeKind, SlotType};

pub struct StmtCompiler;

impl StmtCompiler {
    pub fn compile_sexp(ctx: &mut CompilationContext, sexp: &Sexp) -> CodegenResult<()> {
        match sexp {
            Sexp::Node(node) => Self::compile(ctx, node),
            Sexp::List(_) => Self::compile_body(ctx, sexp),
            other => Err(CodegenError::malformed(other, "Expected a statement node.")),
        }
    }

    pub fn compile(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<()> {
        tracing::trace!(tag = node.tag().name(), line = ?node.line(), "lower statement");
        if node.tag() != &Tag::VoidStmt {
            ctx.write_line_context(node);
        }
        match node.tag() {
            Tag::VoidStmt => Ok(()),
            Tag::Assign | Tag::OpAssign => {
                let value = Self::lower_assign(ctx, node)?;
                ctx.release(value);
                Ok(())
            }
            Tag::If | Tag::Unless | Tag::IfMod | Tag::UnlessMod => {
                ControlFlowCompiler::compile_if(ctx, node, false)
            }
            Tag::Case => ControlFlowCompiler::compile_case(ctx, node, false),
            Tag::While | Tag::Until | Tag::WhileMod | Tag::UntilMod => {
                ControlFlowCompiler::compile_loop(ctx, node)
            }
            Tag::Break => ControlFlowCompiler::compile_break(ctx, node),
            Tag::Next => ControlFlowCompiler::compile_next(ctx, node),
            Tag::Return | Tag::Return0 => Self::compile_return(ctx, node),
            Tag::Def => FunctionCompiler::compile_def(ctx, node),
            Tag::Class => ClassCompiler::compile_class(ctx, node),
            _ => {
                let value = ExprCompiler::compile(ctx, node)?;
                ctx.release(value);
                Ok(())
            }
        }
    }

    /// Lower a statement sequence in order.
    pub fn compile_body(ctx: &mut CompilationContext, body: &Sexp) -> CodegenResult<()> {
        let stmts = statement_list(body);
        Self::warn_unreachable(ctx, &stmts);
        for stmt in stmts {
            Self::compile_sexp(ctx, stmt)?;
        }
        Ok(())
    }

    /// Lower a method body, storing the value of a trailing expression in `πR`.
    /// A trailing `if`/`unless`/`case` passes this on to each of its branches.
    pub fn compile_body_returning(ctx: &mut CompilationContext, body: &Sexp) -> CodegenResult<()> {
        let stmts = statement_list(body);
        Self::warn_unreachable(ctx, &stmts);
        let Some((last, init)) = stmts.split_last() else {
            return Ok(());
        };
        for stmt in init {
            Self::compile_sexp(ctx, stmt)?;
        }
        match last.as_node() {
            Some(node) if Self::yields_value(node) => {
                ctx.write_line_context(node);
                let value = ExprCompiler::compile(ctx, node)?;
                ctx.writer.write(&format!("πR = {value}"));
                ctx.release(value);
                Ok(())
            }
            Some(node)
                if matches!(node.tag(), Tag::If | Tag::Unless | Tag::IfMod | Tag::UnlessMod) =>
            {
                ctx.write_line_context(node);
                ControlFlowCompiler::compile_if(ctx, node, true)
            }
            Some(node) if node.tag() == &Tag::Case => {
                ctx.write_line_context(node);
                ControlFlowCompiler::compile_case(ctx, node, true)
            }
            _ => Self::compile_sexp(ctx, last),
        }
    }

    /// Statements whose value is the value of the enclosing body.
    fn yields_value(node: &Node) -> bool {
        !matches!(
            node.tag(),
            Tag::VoidStmt
                | Tag::If
                | Tag::Unless
                | Tag::IfMod
                | Tag::UnlessMod
                | Tag::Case
                | Tag::While
                | Tag::Until
                | Tag::WhileMod
                | Tag::UntilMod
                | Tag::Break
                | Tag::Next
                | Tag::Return
                | Tag::Return0
                | Tag::Def
                | Tag::Class
        )
    }

    fn warn_unreachable(ctx: &mut CompilationContext, stmts: &[&Sexp]) {
        let jump = stmts.iter().position(|stmt| {
            stmt.as_node().is_some_and(|node| {
                matches!(node.tag(), Tag::Return | Tag::Return0 | Tag::Break | Tag::Next)
            })
        });
        let Some(jump) = jump else {
            return;
        };
        let dead = stmts[jump + 1..]
            .iter()
            .filter_map(|stmt| stmt.as_node())
            .find(|node| node.tag() != &Tag::VoidStmt);
        if let Some(dead) = dead {
            ctx.diagnostics.warning(dead.line(), "unreachable statement");
        }
    }

    /// Lower `assign`/`opassign` and return the stored value.
    pub fn lower_assign(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<ValueHandle> {
        match node.tag() {
            Tag::Assign => {
                node.expect_arity(3)?;
                Self::lower_plain_assign(ctx, node.child_node(1)?, node.child(2)?)
            }
            Tag::OpAssign => Self::lower_opassign(ctx, node),
            _ => Err(CodegenError::unsupported(node)),
        }
    }

    /// `target = value`. Receiver and index are evaluated before the value.
    fn lower_plain_assign(
        ctx: &mut CompilationContext,
        target: &Node,
        rhs: &Sexp,
    ) -> CodegenResult<ValueHandle> {
        match target.tag() {
            Tag::VarField => {
                let value = ExprCompiler::compile_sexp(ctx, rhs)?;
                Self::store_var_field(ctx, target, &value)?;
                Ok(value)
            }
            Tag::ArefField => {
                target.expect_arity(3)?;
                let receiver = ExprCompiler::compile_sexp(ctx, target.child(1)?)?;
                let receiver = ctx.pin(receiver, &[target.child(2)?, rhs]);
                let index = ExprCompiler::compile_index(ctx, target, target.child(2)?)?;
                let index = ctx.pin(index, &[rhs]);
                let value = ExprCompiler::compile_sexp(ctx, rhs)?;
                let call = format!("πg.SetItem(πF, {receiver}, {index}, {value})");
                ctx.writer.write_checked_call1(&call);
                ctx.release(receiver);
                ctx.release(index);
                Ok(value)
            }
            Tag::Field => {
                let (receiver, attr) = Self::field_parts(ctx, target)?;
                let receiver = ctx.pin(receiver, &[rhs]);
                let value = ExprCompiler::compile_sexp(ctx, rhs)?;
                let call = format!("πg.SetAttr(πF, {receiver}, {attr}, {value})");
                ctx.writer.write_checked_call1(&call);
                ctx.release(receiver);
                Ok(value)
            }
            _ => Err(CodegenError::unsupported(target)),
        }
    }

    /// `target op= value` through the in-place runtime primitive.
    fn lower_opassign(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<ValueHandle> {
        node.expect_arity(4)?;
        let target = node.child_node(1)?;
        let op = node.operator_at(2)?;
        let Some(func) = runtime::inplace_op(op) else {
            let message = format!("The operator '{op}' is not supported.");
            return Err(CodegenError::semantic(node, message));
        };
        match target.tag() {
            Tag::VarField => {
                let current = Self::load_var_field(ctx, target)?;
                let current = ctx.pin(current, &[node.child(3)?]);
                let rhs = ExprCompiler::compile_sexp(ctx, node.child(3)?)?;
                let result = ctx.alloc_temp(SlotType::Object);
                ctx.writer.write_checked_call2(&result, &runtime::call2(func, &current, &rhs));
                ctx.release(current);
                ctx.release(rhs);
                let result = ValueHandle::Temp(result);
                Self::store_var_field(ctx, target, &result)?;
                Ok(result)
            }
            Tag::ArefField => {
                target.expect_arity(3)?;
                let receiver = ExprCompiler::compile_sexp(ctx, target.child(1)?)?;
                let receiver = ctx.pin(receiver, &[target.child(2)?, node.child(3)?]);
                let index = ExprCompiler::compile_index(ctx, target, target.child(2)?)?;
                let index = ctx.pin(index, &[node.child(3)?]);
                let current = ctx.alloc_temp(SlotType::Object);
                let call = format!("πg.GetItem(πF, {receiver}, {index})");
                ctx.writer.write_checked_call2(&current, &call);
                let rhs = ExprCompiler::compile_sexp(ctx, node.child(3)?)?;
                let result = ctx.alloc_temp(SlotType::Object);
                ctx.writer.write_checked_call2(&result, &runtime::call2(func, &current, &rhs));
                ctx.free_temp(&current);
                ctx.release(rhs);
                let call = format!("πg.SetItem(πF, {receiver}, {index}, {result})");
                ctx.writer.write_checked_call1(&call);
                ctx.release(receiver);
                ctx.release(index);
                Ok(ValueHandle::Temp(result))
            }
            Tag::Field => {
                let (receiver, attr) = Self::field_parts(ctx, target)?;
                let receiver = ctx.pin(receiver, &[node.child(3)?]);
                let current = ctx.alloc_temp(SlotType::Object);
                let call = format!("πg.GetAttr(πF, {receiver}, {attr}, nil)");
                ctx.writer.write_checked_call2(&current, &call);
                let rhs = ExprCompiler::compile_sexp(ctx, node.child(3)?)?;
                let result = ctx.alloc_temp(SlotType::Object);
                ctx.writer.write_checked_call2(&result, &runtime::call2(func, &current, &rhs));
                ctx.free_temp(&current);
                ctx.release(rhs);
                let call = format!("πg.SetAttr(πF, {receiver}, {attr}, {result})");
                ctx.writer.write_checked_call1(&call);
                ctx.release(receiver);
                Ok(ValueHandle::Temp(result))
            }
            _ => Err(CodegenError::unsupported(target)),
        }
    }

    fn load_var_field(ctx: &mut CompilationContext, field: &Node) -> CodegenResult<ValueHandle> {
        field.expect_arity(2)?;
        let token = field.child_node(1)?;
        match token.tag() {
            Tag::Ident | Tag::Const | Tag::GVar => ctx.resolve_name(token.token_text()?),
            Tag::IVar => {
                let name = token.token_text()?.trim_start_matches('@');
                let receiver = ctx.resolve_self(token)?;
                let attr = ctx.intern(name);
                let result = ctx.alloc_temp(SlotType::Object);
                let call = format!("πg.GetAttr(πF, {receiver}, {attr}, nil)");
                ctx.writer.write_checked_call2(&result, &call);
                ctx.release(receiver);
                Ok(ValueHandle::Temp(result))
            }
            _ => Err(CodegenError::unsupported(token)),
        }
    }

    /// Receiver handle and attribute key of `recv.name`.
    fn field_parts(
        ctx: &mut CompilationContext,
        field: &Node,
    ) -> CodegenResult<(ValueHandle, String)> {
        field.expect_arity(4)?;
        let period = field.operator_at(2)?;
        if period != "." && period != "::" {
            let message = format!("The operator '{period}' is not supported.");
            return Err(CodegenError::semantic(field, message));
        }
        let name = field.child_node(3)?.token_text()?;
        let receiver = ExprCompiler::compile_sexp(ctx, field.child(1)?)?;
        let attr = ctx.intern(name);
        Ok((receiver, attr))
    }

    /// Store `value` into a variable, constant, global or instance variable.
    fn store_var_field(
        ctx: &mut CompilationContext,
        target: &Node,
        value: &ValueHandle,
    ) -> CodegenResult<()> {
        target.expect_arity(2)?;
        let token = target.child_node(1)?;
        match token.tag() {
            Tag::Ident | Tag::Const | Tag::GVar => ctx.bind_var(token.token_text()?, value),
            Tag::IVar => {
                let name = token.token_text()?.trim_start_matches('@');
                let receiver = ctx.resolve_self(token)?;
                let attr = ctx.intern(name);
                let call = format!("πg.SetAttr(πF, {receiver}, {attr}, {value})");
                ctx.writer.write_checked_call1(&call);
                ctx.release(receiver);
                Ok(())
            }
            _ => Err(CodegenError::unsupported(token)),
        }
    }

    /// `return [values]`: set `πR` and unwind to the end of the method.
    fn compile_return(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<()> {
        if ctx.scopes.current().kind() != ScopeKind::Function {
            return Err(CodegenError::semantic(node, "'return' outside of a method."));
        }
        let values = match node.tag() {
            Tag::Return => {
                node.expect_arity(2)?;
                argument_list(node.child(1)?)?
            }
            _ => {
                node.expect_arity(1)?;
                Vec::new()
            }
        };
        let value = match values.as_slice() {
            [] => ValueHandle::none(),
            [single] => ExprCompiler::compile_sexp(ctx, single)?,
            many => ExprCompiler::build_list(ctx, many)?,
        };
        ctx.writer.write(&format!("πR = {value}"));
        ctx.release(value);
        ctx.writer.write("continue");
        Ok(())
    }
}
