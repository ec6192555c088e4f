use gorbe_codegen::compiler::context::CompilationContext;
use gorbe_codegen::compiler::expr::ExprCompiler;
use gorbe_codegen::compiler::value::ValueHandle;
use gorbe_codegen::{CodegenError, CodegenResult, CompileOptions, compile};
use gorbe_syntax::node_from_value;
use serde_json::{Value, json};

fn lower_in(ctx: &mut CompilationContext, value: Value) -> CodegenResult<ValueHandle> {
    let node = node_from_value(&value).unwrap();
    ExprCompiler::compile(ctx, &node)
}

fn lower(value: Value) -> CodegenResult<(ValueHandle, String)> {
    let mut ctx = CompilationContext::new(CompileOptions::default());
    let handle = lower_in(&mut ctx, value)?;
    Ok((handle, ctx.writer.into_string()))
}

fn ident(name: &str, col: u32) -> Value {
    json!(["var_ref", ["@ident", name, [1, col]]])
}

fn int(text: &str) -> Value {
    json!(["@int", text, [1, 0]])
}

fn call(receiver: Value, period: &str, name: &str) -> Value {
    json!(["call", receiver, ["@period", period, [1, 3]], ["@ident", name, [1, 4]]])
}

fn string(text: &str) -> Value {
    json!(["string_literal", ["string_content", ["@tstring_content", text, [1, 1]]]])
}

#[test]
fn test_each_binary_operator_is_one_checked_call() {
    let ops = [
        ("+", "Add"),
        ("-", "Sub"),
        ("*", "Mul"),
        ("/", "Div"),
        ("%", "Mod"),
        ("**", "Pow"),
        ("<<", "LShift"),
        (">>", "RShift"),
        ("&", "And"),
        ("|", "Or"),
        ("^", "Xor"),
        ("==", "Eq"),
        ("!=", "NE"),
        ("<", "LT"),
        ("<=", "LE"),
        (">", "GT"),
        (">=", "GE"),
    ];
    for (op, func) in ops {
        let (handle, out) = lower(json!(["binary", int("1"), op, int("2")])).unwrap();
        assert_eq!(handle.to_string(), "πTemp001", "operator {op}");
        assert_eq!(out.matches("πE != nil").count(), 1, "operator {op}");
        assert!(
            out.contains(&format!(
                "if πTemp001, πE = πg.{func}(πF, πg.NewInt(1).ToObject(), πg.NewInt(2).ToObject())"
            )),
            "operator {op}: {out}"
        );
    }
}

#[test]
fn test_binary_result_does_not_reuse_operand_slots() {
    let (handle, out) = lower(json!(["binary", ident("a", 0), "+", ident("b", 4)])).unwrap();
    assert!(out.contains("if πTemp001, πE = πg.ResolveGlobal(πF, ßa)"));
    assert!(out.contains("if πTemp002, πE = πg.ResolveGlobal(πF, ßb)"));
    assert!(out.contains("if πTemp003, πE = πg.Add(πF, πTemp001, πTemp002)"));
    assert_eq!(handle.to_string(), "πTemp003");
}

#[test]
fn test_operands_are_freed_after_the_call() {
    let mut ctx = CompilationContext::new(CompileOptions::default());
    let handle = lower_in(&mut ctx, json!(["binary", ident("a", 0), "*", ident("b", 4)])).unwrap();
    assert_eq!(ctx.scopes.current().temps().used_count(), 1);
    ctx.release(handle);
    assert_eq!(ctx.scopes.current().temps().used_count(), 0);
}

#[test]
fn test_unknown_binary_operator() {
    let err = lower(json!(["binary", int("1"), "<=>", int("2")])).unwrap_err();
    assert!(matches!(err, CodegenError::Semantic { .. }));
    assert!(err.to_string().ends_with("The operator '<=>' is not supported."));
}

#[test]
fn test_logical_and_short_circuits() {
    let (handle, out) = lower(json!(["binary", ident("a", 0), "&&", ident("b", 5)])).unwrap();
    assert_eq!(handle.to_string(), "πTemp001");
    assert!(out.contains("\tπTemp001 = πTemp002\n"));
    assert!(out.contains("if πTemp003, πE = πg.IsTrue(πF, πTemp001)"));
    assert!(out.contains("\tif !πTemp003 {\n\t\tgoto Label1\n\t}\n"));
    assert!(out.ends_with("Label1:\n"));
    assert_eq!(out.matches("πg.IsTrue(").count(), 1);
}

#[test]
fn test_logical_or_short_circuits() {
    let (_, out) = lower(json!(["binary", ident("a", 0), "or", ident("b", 5)])).unwrap();
    assert!(out.contains("\tif πTemp003 {\n\t\tgoto Label1\n\t}\n"));
}

#[test]
fn test_unary_operators() {
    let (handle, out) = lower(json!(["unary", "-@", ident("x", 1)])).unwrap();
    assert!(out.contains("if πTemp002, πE = πg.Neg(πF, πTemp001)"));
    assert_eq!(handle.to_string(), "πTemp002");

    let (_, out) = lower(json!(["unary", "!", ident("x", 1)])).unwrap();
    assert!(out.contains("if πTemp003, πE = πg.IsTrue(πF, πTemp001)"));
    assert!(out.contains("πTemp002 = πg.GetBool(!πTemp003).ToObject()"));
}

#[test]
fn test_numeric_literals_emit_nothing() {
    for (text, expected) in [
        ("42", "πg.NewInt(42).ToObject()"),
        ("0x1F", "πg.NewInt(31).ToObject()"),
        ("0b101", "πg.NewInt(5).ToObject()"),
        ("017", "πg.NewInt(15).ToObject()"),
        ("1_000", "πg.NewInt(1000).ToObject()"),
    ] {
        let (handle, out) = lower(int(text)).unwrap();
        assert_eq!(handle.to_string(), expected);
        assert!(out.is_empty());
    }
    let (handle, _) = lower(json!(["@float", "1.5", [1, 0]])).unwrap();
    assert_eq!(handle.to_string(), "πg.NewFloat(1.5).ToObject()");
}

#[test]
fn test_integer_out_of_range() {
    let err = lower(int("99999999999999999999")).unwrap_err();
    assert!(matches!(err, CodegenError::Semantic { .. }));
}

#[test]
fn test_keyword_literals() {
    let keyword = |kw: &str| lower(json!(["var_ref", ["@kw", kw, [1, 0]]])).unwrap().0.to_string();
    assert_eq!(keyword("true"), "πg.True.ToObject()");
    assert_eq!(keyword("false"), "πg.False.ToObject()");
    assert_eq!(keyword("nil"), "πg.None");
}

#[test]
fn test_self_outside_method() {
    let err = lower(json!(["var_ref", ["@kw", "self", [1, 0]]])).unwrap_err();
    assert!(err.to_string().ends_with("'self' is only available inside a method."));
}

#[test]
fn test_strings_are_interned_or_inlined() {
    let mut ctx = CompilationContext::new(CompileOptions::default());
    let hi = lower_in(&mut ctx, string("hi")).unwrap();
    let spaced = lower_in(&mut ctx, string("hello world")).unwrap();
    let escaped = lower_in(&mut ctx, string("a\\nb")).unwrap();
    assert_eq!(hi.to_string(), "ßhi.ToObject()");
    assert_eq!(spaced.to_string(), "πg.NewStr(\"hello world\").ToObject()");
    assert_eq!(escaped.to_string(), "πg.NewStr(\"a\\nb\").ToObject()");
    assert_eq!(
        ctx.scopes.interner().declarations(),
        vec!["ßhi := πg.InternStr(\"hi\")".to_string()]
    );
}

#[test]
fn test_symbols_lower_like_strings() {
    let symbol = json!(["symbol_literal", ["symbol", ["@ident", "foo", [1, 1]]]]);
    let (handle, _) = lower(symbol).unwrap();
    assert_eq!(handle.to_string(), "ßfoo.ToObject()");
}

#[test]
fn test_interpolation_is_unsupported() {
    let err = lower(json!(["string_literal", ["string_content",
        ["string_embexpr", [["vcall", ["@ident", "x", [1, 3]]]]]]]))
    .unwrap_err();
    assert!(matches!(err, CodegenError::Unsupported { .. }));
    assert!(
        err.to_string()
            .starts_with("AST node 'string_embexpr' is currently not supported yet.")
    );
}

#[test]
fn test_array_literal() {
    let (handle, out) = lower(json!(["array", [int("1"), ident("x", 4)]])).unwrap();
    assert!(out.contains("\tπTemp001 = make([]*πg.Object, 2)\n"));
    assert!(out.contains("\tπTemp001[0] = πg.NewInt(1).ToObject()\n"));
    assert!(out.contains("\tπTemp001[1] = πTemp002\n"));
    assert!(out.ends_with("\tπTemp002 = πg.NewList(πTemp001...).ToObject()\n"));
    assert_eq!(handle.to_string(), "πTemp002");
}

#[test]
fn test_hash_literal() {
    let (handle, out) = lower(json!(["hash", ["assoclist_from_args",
        [["assoc_new", ["@label", "a:", [1, 1]], int("1")]]]]))
    .unwrap();
    assert!(out.contains("\tπTemp001 = πg.NewDict()\n"));
    assert!(out.contains(
        "if πE = πTemp001.SetItem(πF, ßa.ToObject(), πg.NewInt(1).ToObject()); πE != nil"
    ));
    assert!(out.ends_with("\tπTemp002 = πTemp001.ToObject()\n"));
    assert_eq!(handle.to_string(), "πTemp002");
}

#[test]
fn test_function_call_with_arguments() {
    let (handle, out) = lower(json!(["method_add_arg",
        ["fcall", ["@ident", "foo", [1, 0]]],
        ["arg_paren", ["args_add_block", [int("1")], false]]]))
    .unwrap();
    assert!(out.contains("if πTemp001, πE = πg.ResolveGlobal(πF, ßfoo)"));
    assert!(out.contains("\tπTemp002 = πF.MakeArgs(1)\n\tπTemp002[0] = πg.NewInt(1).ToObject()\n"));
    assert!(out.contains("if πTemp003, πE = πTemp001.Call(πF, πTemp002, nil)"));
    assert!(out.ends_with("\tπF.FreeArgs(πTemp002)\n"));
    assert_eq!(handle.to_string(), "πTemp003");
}

#[test]
fn test_command_call() {
    let (_, out) = lower(json!(["command", ["@ident", "puts", [1, 0]],
        ["args_add_block", [string("hi")], false]]))
    .unwrap();
    assert!(out.contains("πTemp002[0] = ßhi.ToObject()"));
    assert!(out.contains("πTemp001.Call(πF, πTemp002, nil)"));
}

#[test]
fn test_method_call_without_arguments() {
    let (handle, out) = lower(call(ident("obj", 0), ".", "size")).unwrap();
    assert!(out.contains("if πTemp002, πE = πg.GetAttr(πF, πTemp001, ßsize, nil)"));
    assert!(out.contains("if πTemp001, πE = πTemp002.Call(πF, nil, nil)"));
    assert!(!out.contains("MakeArgs"));
    assert_eq!(handle.to_string(), "πTemp001");
}

#[test]
fn test_operator_method_uses_runtime_slot() {
    let (_, out) = lower(call(ident("obj", 0), ".", "to_s")).unwrap();
    assert!(out.contains("πg.GetAttr(πF, πTemp001, ß__str__, nil)"));
}

#[test]
fn test_new_calls_the_receiver() {
    let (_, out) = lower(json!(["method_add_arg",
        call(json!(["var_ref", ["@const", "Foo", [1, 0]]]), ".", "new"),
        ["arg_paren", ["args_add_block", [int("1")], false]]]))
    .unwrap();
    assert!(!out.contains("GetAttr"));
    assert!(out.contains("πTemp001.Call(πF, πTemp002, nil)"));
}

#[test]
fn test_safe_navigation_is_rejected() {
    let safe = json!(["call", ident("obj", 0), ["@op", "&.", [1, 3]], ["@ident", "size", [1, 5]]]);
    let err = lower(safe).unwrap_err();
    assert!(err.to_string().ends_with("The operator '&.' is not supported."));
}

#[test]
fn test_block_argument_is_unsupported() {
    let err = lower(json!(["method_add_arg",
        ["fcall", ["@ident", "each", [1, 0]]],
        ["arg_paren", ["args_add_block", [], ["var_ref", ["@ident", "blk", [1, 6]]]]]]))
    .unwrap_err();
    assert!(matches!(err, CodegenError::Unsupported { .. }));
}

#[test]
fn test_index_read() {
    let aref = json!(["aref", ident("h", 0), ["args_add_block", [int("1")], false]]);
    let (handle, out) = lower(aref).unwrap();
    assert!(out.contains("if πTemp002, πE = πg.GetItem(πF, πTemp001, πg.NewInt(1).ToObject())"));
    assert_eq!(handle.to_string(), "πTemp002");
}

#[test]
fn test_ternary() {
    let (handle, out) = lower(json!(["ifop", ident("c", 0), int("1"), int("2")])).unwrap();
    assert_eq!(handle.to_string(), "πTemp001");
    assert!(out.contains(
        "\tif πTemp003 {\n\t\tgoto Label1\n\t}\n\
         \tπTemp001 = πg.NewInt(2).ToObject()\n\tgoto Label2\n"
    ));
    assert!(out.contains("Label1:\n\tπTemp001 = πg.NewInt(1).ToObject()\nLabel2:\n"));
}

#[test]
fn test_unsupported_node_is_named() {
    let params = json!(["params", null, null, null, null, null, null, null]);
    let err = lower(json!(["lambda", params, [["void_stmt"]]])).unwrap_err();
    match err {
        CodegenError::Unsupported { tag, .. } => assert_eq!(tag, "lambda"),
        other => panic!("unexpected error: {other}"),
    }
}

fn method_body_go(param: &str, body: Value) -> String {
    let program = node_from_value(&json!(["program", [
        ["def", ["@ident", "f", [1, 4]],
            ["paren", ["params", [["@ident", param, [1, 6]]], null, null, null, null, null, null]],
            ["bodystmt", [body], null, null, null]]
    ]]))
    .unwrap();
    compile(&program, CompileOptions::default()).unwrap().go_source
}

fn set_local(name: &str, value: Value) -> Value {
    json!(["paren", [["assign", ["var_field", ["@ident", name, [1, 5]]], value]]])
}

#[test]
fn test_local_operand_is_read_before_a_later_operand_reassigns_it() {
    let go = method_body_go("x", json!(["binary", ident("x", 0), "+", set_local("x", int("5"))]));
    let copy = go.find("πTemp001 = µx\n").unwrap();
    let store = go.find("µx = πg.NewInt(5).ToObject()\n").unwrap();
    assert!(copy < store, "{go}");
    assert!(go.contains("if πTemp002, πE = πg.Add(πF, πTemp001, πg.NewInt(5).ToObject()); πE"));
    assert!(!go.contains("πg.Add(πF, µx"));
}

#[test]
fn test_local_operand_is_read_in_place_when_nothing_reassigns_it() {
    let go = method_body_go("x", json!(["binary", ident("x", 0), "+", int("1")]));
    assert!(go.contains("if πTemp001, πE = πg.Add(πF, µx, πg.NewInt(1).ToObject()); πE != nil {"));
    assert!(!go.contains("πTemp001 = µx"));
}

#[test]
fn test_compound_assignment_keeps_the_old_local_value() {
    let go = method_body_go(
        "x",
        json!([
            "opassign",
            ["var_field", ["@ident", "x", [1, 0]]],
            ["@op", "+=", [1, 2]],
            set_local("x", int("5"))
        ]),
    );
    assert!(go.contains("πTemp001 = µx\n"));
    assert!(go.contains("if πTemp002, πE = πg.IAdd(πF, πTemp001, πg.NewInt(5).ToObject()); πE"));
    assert!(go.contains("µx = πTemp002\n"));
}

#[test]
fn test_index_receiver_is_read_before_the_subscript_reassigns_it() {
    let go = method_body_go(
        "h",
        json!(["aref", ident("h", 0), ["args_add_block", [set_local("h", int("1"))], false]]),
    );
    assert!(go.contains("πTemp001 = µh\n"));
    assert!(go.contains("if πTemp002, πE = πg.GetItem(πF, πTemp001, πg.NewInt(1).ToObject())"));
}
