//! Branch and loop lowering.
//!
//! Branches become conditional `goto`s to per-branch labels followed by the
//! branch bodies, each ending in a jump to one shared end label.
//!
//! Loops are driven by the unit's dispatch loop. The loop pushes a checkpoint
//! at its else label before starting, and another at its start label before
//! each pass through the body, so a bare `continue` re-tests the condition
//! while the loop runs and falls out to the else label once it is done:
//!
//! ```text
//! πF.PushCheckpoint(else)
//! flag = false
//! Label start:
//! if πE != nil || πR != nil { continue }
//! if flag { πF.PopCheckpoint(); goto end }
//! if !test { continue }
//! πF.PushCheckpoint(start)
//! <body>
//! continue
//! Label else:
//! if πE != nil || πR != nil { continue }
//! Label end:
//! ```

use gorbe_syntax::{Node, Sexp, Tag};

use crate::compiler::context::CompilationContext;
use crate::compiler::expr::ExprCompiler;
use crate::compiler::shape::{NodeShape, argument_list, is_absent};
use crate::compiler::stmt::StmtCompiler;
use crate::compiler::value::ValueHandle;
use crate::error::{CodegenError, CodegenResult};
use crate::runtime;
use crate::scope::{Label, LoopContext, SlotType};

const PENDING_GUARD: &str = "if πE != nil || πR != nil {\n\tcontinue\n}";

enum Test<'a> {
    Cond { cond: &'a Sexp, negate: bool },
    When { candidates: Vec<&'a Sexp> },
    Else,
}

struct Branch<'a> {
    test: Test<'a>,
    body: &'a Sexp,
}

pub struct ControlFlowCompiler;

impl ControlFlowCompiler {
    /// `if`/`elsif`/`else`, `unless` and their modifier forms. With `tail`
    /// set, the last statement of each branch body is stored in `πR`.
    pub fn compile_if(ctx: &mut CompilationContext, node: &Node, tail: bool) -> CodegenResult<()> {
        let mut branches = Vec::new();
        match node.tag() {
            Tag::If | Tag::Unless => {
                node.expect_arity(4)?;
                let negate = node.tag() == &Tag::Unless;
                let test = Test::Cond { cond: node.child(1)?, negate };
                branches.push(Branch { test, body: node.child(2)? });
                Self::collect_tail(node.child(3)?, &mut branches)?;
            }
            Tag::IfMod | Tag::UnlessMod => {
                node.expect_arity(3)?;
                let negate = node.tag() == &Tag::UnlessMod;
                let test = Test::Cond { cond: node.child(1)?, negate };
                branches.push(Branch { test, body: node.child(2)? });
            }
            _ => return Err(CodegenError::unsupported(node)),
        }
        Self::emit_branches(ctx, None, &branches, tail)
    }

    /// `elsif` and `else` parts trailing an `if`.
    fn collect_tail<'a>(tail: &'a Sexp, branches: &mut Vec<Branch<'a>>) -> CodegenResult<()> {
        let mut tail = tail;
        loop {
            if is_absent(tail) {
                return Ok(());
            }
            let Some(part) = tail.as_node() else {
                return Err(CodegenError::malformed(tail, "Expected an elsif or else clause."));
            };
            match part.tag() {
                Tag::Elsif => {
                    part.expect_arity(4)?;
                    branches.push(Branch {
                        test: Test::Cond { cond: part.child(1)?, negate: false },
                        body: part.child(2)?,
                    });
                    tail = part.child(3)?;
                }
                Tag::Else => {
                    part.expect_arity(2)?;
                    branches.push(Branch { test: Test::Else, body: part.child(1)? });
                    return Ok(());
                }
                _ => return Err(CodegenError::unsupported(part)),
            }
        }
    }

    /// `case [subject] when ... else ... end`.
    pub fn compile_case(
        ctx: &mut CompilationContext,
        node: &Node,
        tail: bool,
    ) -> CodegenResult<()> {
        node.expect_arity(3)?;
        let mut branches = Vec::new();
        let mut clause = node.child(2)?;
        loop {
            if is_absent(clause) {
                break;
            }
            let Some(part) = clause.as_node() else {
                return Err(CodegenError::malformed(clause, "Expected a when or else clause."));
            };
            match part.tag() {
                Tag::When => {
                    part.expect_arity(4)?;
                    branches.push(Branch {
                        test: Test::When { candidates: argument_list(part.child(1)?)? },
                        body: part.child(2)?,
                    });
                    clause = part.child(3)?;
                }
                Tag::Else => {
                    part.expect_arity(2)?;
                    branches.push(Branch { test: Test::Else, body: part.child(1)? });
                    break;
                }
                _ => return Err(CodegenError::unsupported(part)),
            }
        }

        let subject = node.child(1)?;
        if is_absent(subject) {
            return Self::emit_branches(ctx, None, &branches, tail);
        }
        let subject = ExprCompiler::compile_sexp(ctx, subject)?;
        let candidates: Vec<&Sexp> = branches
            .iter()
            .filter_map(|branch| match &branch.test {
                Test::When { candidates } => Some(candidates),
                _ => None,
            })
            .flatten()
            .copied()
            .collect();
        let subject = ctx.pin(subject, &candidates);
        let result = Self::emit_branches(ctx, Some(&subject), &branches, tail);
        ctx.release(subject);
        result
    }

    fn emit_branches(
        ctx: &mut CompilationContext,
        subject: Option<&ValueHandle>,
        branches: &[Branch<'_>],
        tail: bool,
    ) -> CodegenResult<()> {
        let mut bodies: Vec<(Label, &Sexp)> = Vec::with_capacity(branches.len());
        let mut has_else = false;
        for branch in branches {
            let label = ctx.gen_label(false);
            match &branch.test {
                Test::Cond { cond, negate } => {
                    let cond = ExprCompiler::compile_sexp(ctx, cond)?;
                    Self::jump_if_true(ctx, &cond, *negate, label);
                    ctx.release(cond);
                }
                Test::When { candidates } => {
                    for candidate in candidates {
                        let candidate = ExprCompiler::compile_sexp(ctx, candidate)?;
                        match subject {
                            Some(subject) => {
                                let eq = ctx.alloc_temp(SlotType::Object);
                                let call = runtime::call2("Eq", &candidate, subject);
                                ctx.writer.write_checked_call2(&eq, &call);
                                ctx.release(candidate);
                                let eq = ValueHandle::Temp(eq);
                                Self::jump_if_true(ctx, &eq, false, label);
                                ctx.release(eq);
                            }
                            None => {
                                Self::jump_if_true(ctx, &candidate, false, label);
                                ctx.release(candidate);
                            }
                        }
                    }
                }
                Test::Else => {
                    ctx.writer.write(&format!("goto {label}"));
                    has_else = true;
                }
            }
            bodies.push((label, branch.body));
        }

        let end = ctx.gen_label(false);
        if !has_else {
            ctx.writer.write(&format!("goto {end}"));
        }
        for (label, body) in bodies {
            ctx.writer.write_label(label);
            if tail {
                StmtCompiler::compile_body_returning(ctx, body)?;
            } else {
                StmtCompiler::compile_body(ctx, body)?;
            }
            ctx.writer.write(&format!("goto {end}"));
        }
        ctx.writer.write_label(end);
        Ok(())
    }

    fn jump_if_true(ctx: &mut CompilationContext, value: &ValueHandle, negate: bool, label: Label) {
        let is_true = ctx.alloc_temp(SlotType::Bool);
        ctx.writer.write_checked_call2(&is_true, &runtime::call1("IsTrue", value));
        let not = if negate { "!" } else { "" };
        ctx.writer.write(&format!("if {not}{is_true} {{\n\tgoto {label}\n}}"));
        ctx.free_temp(&is_true);
    }

    /// `while`/`until` and their modifier forms.
    pub fn compile_loop(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<()> {
        node.expect_arity(3)?;
        let until = matches!(node.tag(), Tag::Until | Tag::UntilMod);
        let start = ctx.gen_label(true);
        let orelse = ctx.gen_label(true);
        let end = ctx.gen_label(false);
        let flag = ctx.alloc_temp(SlotType::Bool);
        ctx.scopes.current_mut().push_loop(LoopContext { break_flag: flag.clone() });
        tracing::trace!(start = start.id(), until, "lower loop");

        ctx.writer.write(&format!("πF.PushCheckpoint({})", orelse.id()));
        ctx.writer.write(&format!("{flag} = false"));
        ctx.writer.write_label(start);
        ctx.writer.write(PENDING_GUARD);
        ctx.writer.write(&format!("if {flag} {{\n\tπF.PopCheckpoint()\n\tgoto {end}\n}}"));

        let cond = ExprCompiler::compile_sexp(ctx, node.child(1)?)?;
        let is_true = ctx.alloc_temp(SlotType::Bool);
        ctx.writer.write_checked_call2(&is_true, &runtime::call1("IsTrue", &cond));
        ctx.release(cond);
        let not = if until { "" } else { "!" };
        ctx.writer.write(&format!("if {not}{is_true} {{\n\tcontinue\n}}"));
        ctx.free_temp(&is_true);

        ctx.writer.write(&format!("πF.PushCheckpoint({})", start.id()));
        StmtCompiler::compile_body(ctx, node.child(2)?)?;
        ctx.writer.write("continue");

        ctx.scopes.current_mut().pop_loop();
        ctx.writer.write_label(orelse);
        ctx.writer.write(PENDING_GUARD);
        ctx.writer.write_label(end);
        ctx.free_temp(&flag);
        Ok(())
    }

    pub fn compile_break(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<()> {
        Self::expect_no_value(node, "break")?;
        let flag = ctx.scopes.innermost_loop().map(|context| context.break_flag.clone());
        let Some(flag) = flag else {
            return Err(CodegenError::semantic(node, "'break' outside of a loop."));
        };
        ctx.writer.write(&format!("{flag} = true"));
        ctx.writer.write("continue");
        Ok(())
    }

    pub fn compile_next(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<()> {
        Self::expect_no_value(node, "next")?;
        if ctx.scopes.innermost_loop().is_none() {
            return Err(CodegenError::semantic(node, "'next' outside of a loop."));
        }
        ctx.writer.write("continue");
        Ok(())
    }

    fn expect_no_value(node: &Node, keyword: &str) -> CodegenResult<()> {
        node.expect_arity(2)?;
        if argument_list(node.child(1)?)?.is_empty() {
            Ok(())
        } else {
            Err(CodegenError::semantic(node, format!("'{keyword}' with a value is not supported.")))
        }
    }
}
