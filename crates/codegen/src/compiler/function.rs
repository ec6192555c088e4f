//! Method definition lowering.
//!
//! A `def` becomes a `πg.Function` whose code object wraps a Go closure. The
//! closure body is lowered against its own scope after a classification
//! pre-pass has decided where every name of the body lives.

use gorbe_syntax::{Node, Sexp, Tag};

use crate::compiler::context::CompilationContext;
use crate::compiler::expr::ExprCompiler;
use crate::compiler::shape::{NodeShape, is_absent};
use crate::compiler::stmt::StmtCompiler;
use crate::compiler::value::ValueHandle;
use crate::emit::go::go_str;
use crate::error::{CodegenError, CodegenResult};
use crate::runtime;
use crate::scope::{ScopeKind, SlotType, VarKind, VariableClassifier};

/// Parameters of a `def`, in positional order.
#[derive(Debug, Default)]
pub struct ParamList<'a> {
    pub required: Vec<&'a str>,
    pub optional: Vec<(&'a str, &'a Sexp)>,
    pub rest: Option<&'a str>,
}

impl<'a> ParamList<'a> {
    /// Read a `params` node, optionally wrapped in `paren`.
    pub fn parse(node: &'a Node) -> CodegenResult<Self> {
        let params = if node.tag() == &Tag::Paren {
            node.expect_arity(2)?;
            node.child_node(1)?
        } else {
            node
        };
        if params.tag() != &Tag::Params {
            return Err(CodegenError::unsupported(params));
        }

        let mut list = ParamList::default();
        if let Some(required) = params.get(1).and_then(Sexp::as_list) {
            for param in required {
                list.required.push(Self::param_name(param)?);
            }
        }
        if let Some(optional) = params.get(2).and_then(Sexp::as_list) {
            for pair in optional {
                match pair.as_list() {
                    Some([name, default]) => list.optional.push((Self::param_name(name)?, default)),
                    _ => {
                        let message = "Optional parameter must be [name, default].";
                        return Err(CodegenError::malformed(pair, message));
                    }
                }
            }
        }
        if let Some(rest) = params.get(3).filter(|rest| !is_absent(rest)) {
            let Some(rest_node) = rest.as_node().filter(|n| n.tag() == &Tag::RestParam) else {
                return Err(CodegenError::malformed(rest, "Expected a rest parameter."));
            };
            rest_node.expect_arity(2)?;
            match rest_node.child(1)? {
                name @ Sexp::Node(_) => list.rest = Some(Self::param_name(name)?),
                _ => return Err(CodegenError::unsupported(rest_node)),
            }
        }
        // post-rest, keyword, keyword-rest and block parameters
        for index in 4..=7 {
            if let Some(other) = params.get(index).filter(|p| !is_absent(p)) {
                return Err(match other.as_node() {
                    Some(node) => CodegenError::unsupported(node),
                    None => CodegenError::unsupported(params),
                });
            }
        }
        Ok(list)
    }

    fn param_name(param: &'a Sexp) -> CodegenResult<&'a str> {
        match param.as_node() {
            Some(token) if token.tag() == &Tag::Ident => token.token_text(),
            Some(other) => Err(CodegenError::unsupported(other)),
            None => Err(CodegenError::malformed(param, "Expected a parameter name.")),
        }
    }

    pub fn positional_count(&self) -> usize {
        self.required.len() + self.optional.len()
    }
}

/// Statements of a `bodystmt`; `rescue`, `else` and `ensure` clauses are refused.
pub fn body_statements(body: &Node) -> CodegenResult<&Sexp> {
    if body.tag() != &Tag::BodyStmt {
        return Err(CodegenError::unsupported(body));
    }
    body.expect_arity(5)?;
    for index in 2..=4 {
        let clause = body.child(index)?;
        if !is_absent(clause) {
            return Err(match clause.as_node() {
                Some(node) => CodegenError::unsupported(node),
                None => CodegenError::malformed(clause, "Unexpected clause."),
            });
        }
    }
    body.child(1)
}

pub struct FunctionCompiler;

impl FunctionCompiler {
    pub fn compile_def(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<()> {
        node.expect_arity(4)?;
        let name = node.child_node(1)?.token_text()?;
        let params = ParamList::parse(node.child_node(2)?)?;
        let stmts = body_statements(node.child_node(3)?)?;

        let is_method = ctx.scopes.current().kind() == ScopeKind::Class;
        let bound_name = if is_method { runtime::method_slot(name) } else { name };
        if is_method && name == "initialize" {
            let class_name = ctx.scopes.current().name().to_string();
            let message = format!(
                "method 'initialize' of class {class_name} is registered as constructor '__init__'"
            );
            ctx.diagnostics.note(node.line(), message);
        }
        tracing::debug!(
            name,
            bound_name,
            params = params.positional_count(),
            is_method,
            "lower def"
        );

        // Defaults are evaluated once, when the definition runs.
        let mut defaults = Vec::with_capacity(params.optional.len());
        for (_, default) in &params.optional {
            defaults.push(ExprCompiler::compile_sexp(ctx, default)?);
        }

        let mut names: Vec<&str> = Vec::new();
        if is_method {
            names.push("self");
        }
        names.extend(params.required.iter().copied());
        names.extend(params.optional.iter().map(|(name, _)| *name));

        let table = ctx.alloc_temp(SlotType::Params);
        ctx.writer.write(&format!("{table} = make([]πg.Param, {})", names.len()));
        let first_optional = names.len() - defaults.len();
        for (i, param) in names.iter().enumerate() {
            let default = match i.checked_sub(first_optional) {
                Some(d) => defaults[d].to_string(),
                None => "nil".to_string(),
            };
            let name = go_str(param);
            ctx.writer.write(&format!("{table}[{i}] = πg.Param{{Name: {name}, Def: {default}}}"));
        }
        for default in defaults {
            ctx.release(default);
        }

        let mut classifier = VariableClassifier::new();
        for (i, param) in names.iter().enumerate() {
            classifier.add_parameter(node, param, i)?;
        }
        if let Some(rest) = params.rest {
            classifier.add_parameter(node, rest, names.len())?;
        }
        classifier.scan(stmts)?;

        ctx.scopes.push(ScopeKind::Function, bound_name);
        ctx.scopes.current_mut().set_variables(classifier.finish());
        let lowered = ctx.capture(|ctx| StmtCompiler::compile_body_returning(ctx, stmts));
        let scope = ctx.scopes.pop();
        let ((), body) = lowered?;
        let Some(scope) = scope else {
            return Err(CodegenError::structural(node, "Method scope was not open."));
        };

        let flags = if params.rest.is_some() { runtime::CODE_FLAG_VAR_ARG } else { "0" };
        let result = ctx.alloc_temp(SlotType::Object);
        let w = &mut ctx.writer;
        w.write(&format!(
            "{result} = πg.NewFunction(πg.NewCode({}, {}, {table}, {flags}, {} {{",
            go_str(bound_name),
            go_str(&ctx.options.script),
            runtime::METHOD_FUNC,
        ));
        w.indent();
        for var in scope.variables() {
            let go_name = var.go_name();
            match var.kind {
                VarKind::Parameter(i) => {
                    w.write(&format!("var {go_name} *πg.Object = πArgs[{i}]; _ = {go_name}"))
                }
                VarKind::Local => {
                    let unbound = runtime::UNBOUND_LOCAL;
                    w.write(&format!("var {go_name} *πg.Object = {unbound}; _ = {go_name}"))
                }
                VarKind::Global => {}
            }
        }
        w.write_temp_decls(&scope.temps().declarations());
        w.write("var πR *πg.Object; _ = πR");
        w.write("var πE *πg.BaseException; _ = πE");
        w.write_block(&scope.checkpoints(), &body);
        w.write("if πE != nil {\n\tπR = nil\n} else if πR == nil {\n\tπR = πg.None\n}");
        w.write("return πR, πE");
        w.dedent();
        w.write("}), πF.Globals()).ToObject()");
        ctx.free_temp(&table);

        let result = ValueHandle::Temp(result);
        ctx.bind_var(bound_name, &result)?;
        ctx.release(result);
        Ok(())
    }
}
