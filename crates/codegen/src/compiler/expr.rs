//! Expression lowering.
//!
//! Each expression lowers to a [`ValueHandle`]. Literals produce no code;
//! everything else emits one or more checked runtime calls and returns the
//! temporary holding the result. Operand slots are released only after the
//! call consuming them has been written. A local operand is read in place
//! unless a later operand may reassign it, in which case it is copied into
//! a temporary first.

use gorbe_syntax::{Node, Sexp, Tag};

use crate::compiler::context::CompilationContext;
use crate::compiler::shape::{NodeShape, argument_list, is_absent, statement_list};
use crate::compiler::stmt::StmtCompiler;
use crate::compiler::value::ValueHandle;
use crate::error::{CodegenError, CodegenResult};
use crate::runtime;
use crate::scope::SlotType;

pub struct ExprCompiler;

impl ExprCompiler {
    pub fn compile_sexp(ctx: &mut CompilationContext, sexp: &Sexp) -> CodegenResult<ValueHandle> {
        match sexp {
            Sexp::Node(node) => Self::compile(ctx, node),
            other => Err(CodegenError::malformed(other, "Expected an expression node.")),
        }
    }

    pub fn compile(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<ValueHandle> {
        tracing::trace!(tag = node.tag().name(), line = ?node.line(), "lower expression");
        match node.tag() {
            Tag::Int => Self::compile_int(node),
            Tag::Float => Self::compile_float(node),
            Tag::StringLiteral => Self::compile_string(ctx, node),
            Tag::SymbolLiteral | Tag::DynaSymbol => Self::compile_symbol(ctx, node),
            Tag::Label => Self::compile_label(ctx, node),
            Tag::VarRef => Self::compile_var_ref(ctx, node),
            Tag::VCall => Self::compile_vcall(ctx, node),
            Tag::Binary => Self::compile_binary(ctx, node),
            Tag::Unary => Self::compile_unary(ctx, node),
            Tag::Paren => Self::compile_paren(ctx, node),
            Tag::IfOp => Self::compile_ifop(ctx, node),
            Tag::Array => Self::compile_array(ctx, node),
            Tag::Hash => Self::compile_hash(ctx, node),
            Tag::BareAssocHash => {
                node.expect_arity(2)?;
                Self::compile_assocs(ctx, node.child(1)?)
            }
            Tag::Aref => Self::compile_aref(ctx, node),
            Tag::MethodAddArg => Self::compile_method_add_arg(ctx, node),
            Tag::Command => Self::compile_command(ctx, node),
            Tag::CommandCall => Self::compile_command_call(ctx, node),
            Tag::Call => Self::compile_call(ctx, node),
            Tag::Assign | Tag::OpAssign => StmtCompiler::lower_assign(ctx, node),
            _ => Err(CodegenError::unsupported(node)),
        }
    }

    fn compile_int(node: &Node) -> CodegenResult<ValueHandle> {
        let value = parse_int(node.token_text()?)
            .map_err(|message| CodegenError::semantic(node, message))?;
        Ok(ValueHandle::Literal(format!("πg.NewInt({value}).ToObject()")))
    }

    fn compile_float(node: &Node) -> CodegenResult<ValueHandle> {
        let text: String = node.token_text()?.chars().filter(|c| *c != '_').collect();
        let value: f64 = text
            .parse()
            .map_err(|_| CodegenError::semantic(node, "Invalid float literal."))?;
        if !value.is_finite() {
            return Err(CodegenError::semantic(node, "Float literal is out of range."));
        }
        Ok(ValueHandle::Literal(format!("πg.NewFloat({value:?}).ToObject()")))
    }

    fn str_literal(ctx: &mut CompilationContext, value: &str) -> ValueHandle {
        ValueHandle::Literal(format!("{}.ToObject()", ctx.intern(value)))
    }

    fn compile_string(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<ValueHandle> {
        node.expect_arity(2)?;
        let value = string_content(node.child(1)?)?;
        Ok(Self::str_literal(ctx, &value))
    }

    fn compile_symbol(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<ValueHandle> {
        node.expect_arity(2)?;
        let value = match node.child(1)? {
            Sexp::Node(inner) if inner.tag() == &Tag::Symbol => {
                inner.expect_arity(2)?;
                inner.child_node(1)?.token_text()?.to_string()
            }
            Sexp::Node(inner) if inner.is_token() => inner.token_text()?.to_string(),
            other => string_content(other)?,
        };
        Ok(Self::str_literal(ctx, &value))
    }

    /// `a:` keys of hash literals are symbols.
    fn compile_label(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<ValueHandle> {
        let text = node.token_text()?;
        let name = text.strip_suffix(':').unwrap_or(text);
        Ok(Self::str_literal(ctx, name))
    }

    fn compile_var_ref(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<ValueHandle> {
        node.expect_arity(2)?;
        let token = node.child_node(1)?;
        let name = token.token_text()?;
        match token.tag() {
            Tag::Ident | Tag::Const | Tag::GVar => ctx.resolve_name(name),
            Tag::IVar => Self::compile_ivar_read(ctx, token),
            Tag::Kw => match name {
                "true" => Ok(ValueHandle::Literal(runtime::TRUE.to_string())),
                "false" => Ok(ValueHandle::Literal(runtime::FALSE.to_string())),
                "nil" => Ok(ValueHandle::none()),
                "self" => ctx.resolve_self(token),
                _ => Err(CodegenError::unsupported(token)),
            },
            _ => Err(CodegenError::unsupported(token)),
        }
    }

    /// `@name` reads attribute `name` of `self`.
    fn compile_ivar_read(ctx: &mut CompilationContext, token: &Node) -> CodegenResult<ValueHandle> {
        let name = token.token_text()?.trim_start_matches('@');
        let receiver = ctx.resolve_self(token)?;
        let attr = ctx.intern(name);
        let result = ctx.alloc_temp(SlotType::Object);
        let call = format!("πg.GetAttr(πF, {receiver}, {attr}, nil)");
        ctx.writer.write_checked_call2(&result, &call);
        ctx.release(receiver);
        Ok(ValueHandle::Temp(result))
    }

    fn compile_vcall(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<ValueHandle> {
        node.expect_arity(2)?;
        let name = node.child_node(1)?.token_text()?;
        let callee = ctx.resolve_name(name)?;
        Self::emit_call(ctx, callee, &[])
    }

    fn compile_binary(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<ValueHandle> {
        node.expect_arity(4)?;
        let op = node.operator_at(2)?;
        if let Some(continue_on_true) = runtime::short_circuit(op) {
            return Self::compile_short_circuit(ctx, node, continue_on_true);
        }
        let Some(func) = runtime::binary_op(op) else {
            let message = format!("The operator '{op}' is not supported.");
            return Err(CodegenError::semantic(node, message));
        };
        let lhs = Self::compile_sexp(ctx, node.child(1)?)?;
        let lhs = ctx.pin(lhs, &[node.child(3)?]);
        let rhs = Self::compile_sexp(ctx, node.child(3)?)?;
        let result = ctx.alloc_temp(SlotType::Object);
        ctx.writer.write_checked_call2(&result, &runtime::call2(func, &lhs, &rhs));
        ctx.release(lhs);
        ctx.release(rhs);
        Ok(ValueHandle::Temp(result))
    }

    /// `a && b` / `a || b`: the right operand only runs when the left one
    /// does not decide the outcome.
    fn compile_short_circuit(
        ctx: &mut CompilationContext,
        node: &Node,
        continue_on_true: bool,
    ) -> CodegenResult<ValueHandle> {
        let result = ctx.alloc_temp(SlotType::Object);
        let end = ctx.gen_label(false);

        let lhs = Self::compile_sexp(ctx, node.child(1)?)?;
        ctx.writer.write(&format!("{result} = {lhs}"));
        ctx.release(lhs);
        let is_true = ctx.alloc_temp(SlotType::Bool);
        ctx.writer.write_checked_call2(&is_true, &runtime::call1("IsTrue", &result));
        let negate = if continue_on_true { "!" } else { "" };
        ctx.writer.write(&format!("if {negate}{is_true} {{\n\tgoto {end}\n}}"));
        ctx.free_temp(&is_true);

        let rhs = Self::compile_sexp(ctx, node.child(3)?)?;
        ctx.writer.write(&format!("{result} = {rhs}"));
        ctx.release(rhs);
        ctx.writer.write_label(end);
        Ok(ValueHandle::Temp(result))
    }

    fn compile_unary(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<ValueHandle> {
        node.expect_arity(3)?;
        let op = node.operator_at(1)?;
        let operand = Self::compile_sexp(ctx, node.child(2)?)?;
        let result = ctx.alloc_temp(SlotType::Object);
        if runtime::is_logical_not(op) {
            let is_true = ctx.alloc_temp(SlotType::Bool);
            ctx.writer.write_checked_call2(&is_true, &runtime::call1("IsTrue", &operand));
            ctx.writer.write(&format!("{result} = πg.GetBool(!{is_true}).ToObject()"));
            ctx.free_temp(&is_true);
        } else if let Some(func) = runtime::unary_op(op) {
            ctx.writer.write_checked_call2(&result, &runtime::call1(func, &operand));
        } else {
            let message = format!("The operator '{op}' is not supported.");
            return Err(CodegenError::semantic(node, message));
        }
        ctx.release(operand);
        Ok(ValueHandle::Temp(result))
    }

    /// `(a; b)` evaluates to its last statement.
    fn compile_paren(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<ValueHandle> {
        node.expect_arity(2)?;
        let stmts = statement_list(node.child(1)?);
        let Some((last, init)) = stmts.split_last() else {
            return Ok(ValueHandle::none());
        };
        for stmt in init {
            StmtCompiler::compile_sexp(ctx, stmt)?;
        }
        match last.as_node() {
            Some(stmt) if stmt.tag() == &Tag::VoidStmt => Ok(ValueHandle::none()),
            _ => Self::compile_sexp(ctx, last),
        }
    }

    fn compile_ifop(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<ValueHandle> {
        node.expect_arity(4)?;
        let result = ctx.alloc_temp(SlotType::Object);
        let then_label = ctx.gen_label(false);
        let end = ctx.gen_label(false);

        let cond = Self::compile_sexp(ctx, node.child(1)?)?;
        let is_true = ctx.alloc_temp(SlotType::Bool);
        ctx.writer.write_checked_call2(&is_true, &runtime::call1("IsTrue", &cond));
        ctx.release(cond);
        ctx.writer.write(&format!("if {is_true} {{\n\tgoto {then_label}\n}}"));
        ctx.free_temp(&is_true);

        let otherwise = Self::compile_sexp(ctx, node.child(3)?)?;
        ctx.writer.write(&format!("{result} = {otherwise}"));
        ctx.release(otherwise);
        ctx.writer.write(&format!("goto {end}"));

        ctx.writer.write_label(then_label);
        let then = Self::compile_sexp(ctx, node.child(2)?)?;
        ctx.writer.write(&format!("{result} = {then}"));
        ctx.release(then);
        ctx.writer.write_label(end);
        Ok(ValueHandle::Temp(result))
    }

    fn compile_array(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<ValueHandle> {
        node.expect_arity(2)?;
        let elements = argument_list(node.child(1)?)?;
        Self::build_list(ctx, &elements)
    }

    /// `πg.NewList` over freshly lowered `elements`.
    pub fn build_list(
        ctx: &mut CompilationContext,
        elements: &[&Sexp],
    ) -> CodegenResult<ValueHandle> {
        let store = ctx.alloc_temp(SlotType::Args);
        ctx.writer.write(&format!("{store} = make([]*πg.Object, {})", elements.len()));
        for (i, element) in elements.iter().enumerate() {
            let value = Self::compile_sexp(ctx, element)?;
            ctx.writer.write(&format!("{store}[{i}] = {value}"));
            ctx.release(value);
        }
        let result = ctx.alloc_temp(SlotType::Object);
        ctx.writer.write(&format!("{result} = πg.NewList({store}...).ToObject()"));
        ctx.free_temp(&store);
        Ok(ValueHandle::Temp(result))
    }

    fn compile_hash(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<ValueHandle> {
        node.expect_arity(2)?;
        match node.child(1)? {
            Sexp::Node(list) if list.tag() == &Tag::AssoclistFromArgs => {
                list.expect_arity(2)?;
                Self::compile_assocs(ctx, list.child(1)?)
            }
            other if is_absent(other) => Self::compile_assocs(ctx, &Sexp::List(Vec::new())),
            Sexp::Node(other) => Err(CodegenError::unsupported(other)),
            other => Err(CodegenError::malformed(other, "Expected an association list.")),
        }
    }

    fn compile_assocs(ctx: &mut CompilationContext, assocs: &Sexp) -> CodegenResult<ValueHandle> {
        let Some(assocs) = assocs.as_list() else {
            return Err(CodegenError::malformed(assocs, "Expected a list of associations."));
        };
        let dict = ctx.alloc_temp(SlotType::Dict);
        ctx.writer.write(&format!("{dict} = πg.NewDict()"));
        for assoc in assocs {
            let Some(pair) = assoc.as_node() else {
                return Err(CodegenError::malformed(assoc, "Expected an association."));
            };
            if pair.tag() != &Tag::AssocNew {
                return Err(CodegenError::unsupported(pair));
            }
            pair.expect_arity(3)?;
            let key = Self::compile_sexp(ctx, pair.child(1)?)?;
            let key = ctx.pin(key, &[pair.child(2)?]);
            let value = Self::compile_sexp(ctx, pair.child(2)?)?;
            ctx.writer.write_checked_call1(&format!("{dict}.SetItem(πF, {key}, {value})"));
            ctx.release(key);
            ctx.release(value);
        }
        let result = ctx.alloc_temp(SlotType::Object);
        ctx.writer.write(&format!("{result} = {dict}.ToObject()"));
        ctx.free_temp(&dict);
        Ok(ValueHandle::Temp(result))
    }

    fn compile_aref(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<ValueHandle> {
        node.expect_arity(3)?;
        let receiver = Self::compile_sexp(ctx, node.child(1)?)?;
        let receiver = ctx.pin(receiver, &[node.child(2)?]);
        let index = Self::compile_index(ctx, node, node.child(2)?)?;
        let result = ctx.alloc_temp(SlotType::Object);
        ctx.writer.write_checked_call2(&result, &format!("πg.GetItem(πF, {receiver}, {index})"));
        ctx.release(receiver);
        ctx.release(index);
        Ok(ValueHandle::Temp(result))
    }

    /// The single subscript of `recv[index]`.
    pub fn compile_index(
        ctx: &mut CompilationContext,
        node: &Node,
        args: &Sexp,
    ) -> CodegenResult<ValueHandle> {
        match argument_list(args)?.as_slice() {
            [index] => Self::compile_sexp(ctx, index),
            _ => Err(CodegenError::semantic(node, "Exactly one index is supported.")),
        }
    }

    /// `foo(args)` and `recv.foo(args)`.
    fn compile_method_add_arg(
        ctx: &mut CompilationContext,
        node: &Node,
    ) -> CodegenResult<ValueHandle> {
        node.expect_arity(3)?;
        let target = node.child_node(1)?;
        let callee = match target.tag() {
            Tag::FCall => {
                target.expect_arity(2)?;
                ctx.resolve_name(target.child_node(1)?.token_text()?)?
            }
            Tag::Call => {
                target.expect_arity(4)?;
                Self::compile_method(ctx, target, target.child(1)?, 2, target.child_node(3)?)?
            }
            _ => return Err(CodegenError::unsupported(target)),
        };
        let args = argument_list(node.child(2)?)?;
        Self::emit_call(ctx, callee, &args)
    }

    /// `puts x`.
    fn compile_command(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<ValueHandle> {
        node.expect_arity(3)?;
        let callee = ctx.resolve_name(node.child_node(1)?.token_text()?)?;
        let args = argument_list(node.child(2)?)?;
        Self::emit_call(ctx, callee, &args)
    }

    /// `recv.foo x`.
    fn compile_command_call(
        ctx: &mut CompilationContext,
        node: &Node,
    ) -> CodegenResult<ValueHandle> {
        node.expect_arity(5)?;
        let callee = Self::compile_method(ctx, node, node.child(1)?, 2, node.child_node(3)?)?;
        let args = argument_list(node.child(4)?)?;
        Self::emit_call(ctx, callee, &args)
    }

    /// `recv.foo` without arguments.
    fn compile_call(ctx: &mut CompilationContext, node: &Node) -> CodegenResult<ValueHandle> {
        node.expect_arity(4)?;
        let callee = Self::compile_method(ctx, node, node.child(1)?, 2, node.child_node(3)?)?;
        Self::emit_call(ctx, callee, &[])
    }

    /// Lower the receiver and look up the method on it. `Recv.new` calls the
    /// receiver itself.
    fn compile_method(
        ctx: &mut CompilationContext,
        node: &Node,
        receiver: &Sexp,
        period_index: usize,
        name: &Node,
    ) -> CodegenResult<ValueHandle> {
        let period = node.operator_at(period_index)?;
        if period != "." && period != "::" {
            let message = format!("The operator '{period}' is not supported.");
            return Err(CodegenError::semantic(node, message));
        }
        let name = name.token_text()?;
        let receiver = Self::compile_sexp(ctx, receiver)?;
        if name == "new" {
            return Ok(receiver);
        }
        let attr = ctx.intern(runtime::method_slot(name));
        let method = ctx.alloc_temp(SlotType::Object);
        let call = format!("πg.GetAttr(πF, {receiver}, {attr}, nil)");
        ctx.writer.write_checked_call2(&method, &call);
        ctx.release(receiver);
        Ok(ValueHandle::Temp(method))
    }

    fn emit_call(
        ctx: &mut CompilationContext,
        callee: ValueHandle,
        args: &[&Sexp],
    ) -> CodegenResult<ValueHandle> {
        let callee = ctx.pin(callee, args);
        let result = if args.is_empty() {
            let result = ctx.alloc_temp(SlotType::Object);
            ctx.writer.write_checked_call2(&result, &format!("{callee}.Call(πF, nil, nil)"));
            result
        } else {
            let argv = ctx.alloc_temp(SlotType::Args);
            ctx.writer.write(&format!("{argv} = πF.MakeArgs({})", args.len()));
            for (i, arg) in args.iter().enumerate() {
                let value = Self::compile_sexp(ctx, arg)?;
                ctx.writer.write(&format!("{argv}[{i}] = {value}"));
                ctx.release(value);
            }
            let result = ctx.alloc_temp(SlotType::Object);
            ctx.writer.write_checked_call2(&result, &format!("{callee}.Call(πF, {argv}, nil)"));
            ctx.writer.write(&format!("πF.FreeArgs({argv})"));
            ctx.free_temp(&argv);
            result
        };
        ctx.release(callee);
        Ok(ValueHandle::Temp(result))
    }
}

/// Concatenated text of a `string_content` node, escapes decoded.
fn string_content(sexp: &Sexp) -> CodegenResult<String> {
    let parts: &[Sexp] = match sexp {
        Sexp::Node(node) if node.tag() == &Tag::StringContent => node.children(),
        Sexp::List(items) => items,
        Sexp::Node(node) => return Err(CodegenError::unsupported(node)),
        other => return Err(CodegenError::malformed(other, "Expected string content.")),
    };
    let mut value = String::new();
    for part in parts {
        match part.as_node() {
            Some(token) if token.tag() == &Tag::TStringContent => {
                value.push_str(&unescape(token.token_text()?));
            }
            Some(other) => return Err(CodegenError::unsupported(other)),
            None => return Err(CodegenError::malformed(part, "Expected a string part.")),
        }
    }
    Ok(value)
}

/// Decode the backslash escapes of a double-quoted Ruby string.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escape) = chars.next() else {
            out.push('\\');
            break;
        };
        match escape {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            's' => out.push(' '),
            'e' => out.push('\u{1b}'),
            'a' => out.push('\u{7}'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '\n' => {}
            'x' => {
                let digits = take_while_max(&mut chars, 2, |c| c.is_ascii_hexdigit());
                push_code(&mut out, &digits, 16, 'x');
            }
            'u' if chars.peek() == Some(&'{') => {
                chars.next();
                let digits: String = chars.by_ref().take_while(|c| *c != '}').collect();
                for code in digits.split_whitespace() {
                    push_code(&mut out, code, 16, 'u');
                }
            }
            'u' => {
                let digits = take_while_max(&mut chars, 4, |c| c.is_ascii_hexdigit());
                push_code(&mut out, &digits, 16, 'u');
            }
            '0'..='7' => {
                let mut digits = escape.to_string();
                digits.push_str(&take_while_max(&mut chars, 2, |c| ('0'..='7').contains(&c)));
                push_code(&mut out, &digits, 8, '0');
            }
            other => out.push(other),
        }
    }
    out
}

fn take_while_max(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    max: usize,
    accept: impl Fn(char) -> bool,
) -> String {
    let mut taken = String::new();
    while taken.len() < max {
        match chars.peek() {
            Some(&c) if accept(c) => {
                taken.push(c);
                chars.next();
            }
            _ => break,
        }
    }
    taken
}

fn push_code(out: &mut String, digits: &str, radix: u32, fallback: char) {
    match u32::from_str_radix(digits, radix).ok().and_then(char::from_u32) {
        Some(c) => out.push(c),
        None => {
            out.push(fallback);
            out.push_str(digits);
        }
    }
}

const OUT_OF_RANGE: &str = "Integer literal is out of the 64-bit range.";

/// Ruby integer literal text to a 64-bit value.
pub fn parse_int(text: &str) -> Result<i64, &'static str> {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let cleaned = unsigned
        .chars()
        .filter(|c| *c != '_')
        .collect::<String>()
        .to_ascii_lowercase();
    let (radix, digits) = if let Some(rest) = cleaned.strip_prefix("0x") {
        (16, rest)
    } else if let Some(rest) = cleaned.strip_prefix("0b") {
        (2, rest)
    } else if let Some(rest) = cleaned.strip_prefix("0o") {
        (8, rest)
    } else if let Some(rest) = cleaned.strip_prefix("0d") {
        (10, rest)
    } else if cleaned.len() > 1 && cleaned.starts_with('0') {
        (8, &cleaned[1..])
    } else {
        (10, cleaned.as_str())
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err("Invalid integer literal.");
    }
    let magnitude = u128::from_str_radix(digits, radix).map_err(|_| OUT_OF_RANGE)?;
    let magnitude = i128::try_from(magnitude).map_err(|_| OUT_OF_RANGE)?;
    let value = if negative { -magnitude } else { magnitude };
    i64::try_from(value).map_err(|_| OUT_OF_RANGE)
}
