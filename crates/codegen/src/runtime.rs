//! Grumpy runtime vocabulary.
//!
//! Names of the `πg` primitives the generated code calls, and the mapping
//! from Ruby operators and method names onto them.

pub const NONE: &str = "πg.None";
pub const TRUE: &str = "πg.True.ToObject()";
pub const FALSE: &str = "πg.False.ToObject()";
pub const UNBOUND_LOCAL: &str = "πg.UnboundLocal";
pub const OBJECT_TYPE: &str = "πg.ObjectType.ToObject()";
pub const CODE_FLAG_VAR_ARG: &str = "πg.CodeFlagVarArg";

/// Go signature of a module or class body.
pub const BODY_FUNC: &str = "func(πF *πg.Frame, _ []*πg.Object) (*πg.Object, *πg.BaseException)";
/// Go signature of a method body.
pub const METHOD_FUNC: &str =
    "func(πF *πg.Frame, πArgs []*πg.Object) (*πg.Object, *πg.BaseException)";

/// Binary operators with a single runtime primitive, `πg.<Name>(πF, lhs, rhs)`.
const BINARY_OPS: &[(&str, &str)] = &[
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

const UNARY_OPS: &[(&str, &str)] = &[("-@", "Neg"), ("+@", "Pos"), ("~", "Invert")];

/// Compound assignments. Grumpy has no in-place power, so `**=` uses `Pow`.
const INPLACE_OPS: &[(&str, &str)] = &[
    ("+=", "IAdd"),
    ("-=", "ISub"),
    ("*=", "IMul"),
    ("/=", "IDiv"),
    ("%=", "IMod"),
    ("**=", "Pow"),
    ("<<=", "ILShift"),
    (">>=", "IRShift"),
    ("&=", "IAnd"),
    ("|=", "IOr"),
    ("^=", "IXor"),
];

/// Ruby method names that implement a runtime slot when defined in a class.
const METHOD_SLOTS: &[(&str, &str)] = &[
    ("initialize", "__init__"),
    ("to_s", "__str__"),
    ("inspect", "__repr__"),
    ("+", "__add__"),
    ("-", "__sub__"),
    ("*", "__mul__"),
    ("/", "__div__"),
    ("%", "__mod__"),
    ("**", "__pow__"),
    ("<<", "__lshift__"),
    (">>", "__rshift__"),
    ("&", "__and__"),
    ("|", "__or__"),
    ("^", "__xor__"),
    ("==", "__eq__"),
    ("!=", "__ne__"),
    ("<", "__lt__"),
    ("<=", "__le__"),
    (">", "__gt__"),
    (">=", "__ge__"),
    ("-@", "__neg__"),
    ("+@", "__pos__"),
    ("~", "__invert__"),
    ("[]", "__getitem__"),
    ("[]=", "__setitem__"),
];

fn lookup(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(op, _)| *op == key).map(|(_, name)| *name)
}

pub fn binary_op(op: &str) -> Option<&'static str> {
    lookup(BINARY_OPS, op)
}

pub fn unary_op(op: &str) -> Option<&'static str> {
    lookup(UNARY_OPS, op)
}

pub fn inplace_op(op: &str) -> Option<&'static str> {
    lookup(INPLACE_OPS, op)
}

/// `&&`, `and`, `||` and `or` short-circuit instead of calling the runtime.
/// Returns whether the operator continues on a true left operand.
pub fn short_circuit(op: &str) -> Option<bool> {
    match op {
        "&&" | "and" => Some(true),
        "||" | "or" => Some(false),
        _ => None,
    }
}

pub fn is_logical_not(op: &str) -> bool {
    matches!(op, "!" | "not")
}

/// Attribute name a Ruby method is stored under on a class.
pub fn method_slot(name: &str) -> &str {
    lookup(METHOD_SLOTS, name).unwrap_or(name)
}

pub fn call2(func: &str, a: impl std::fmt::Display, b: impl std::fmt::Display) -> String {
    format!("πg.{func}(πF, {a}, {b})")
}

pub fn call1(func: &str, a: impl std::fmt::Display) -> String {
    format!("πg.{func}(πF, {a})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_tables() {
        assert_eq!(binary_op("+"), Some("Add"));
        assert_eq!(binary_op(">="), Some("GE"));
        assert_eq!(binary_op("<=>"), None);
        assert_eq!(unary_op("-@"), Some("Neg"));
        assert_eq!(inplace_op("**="), Some("Pow"));
        assert_eq!(inplace_op("||="), None);
    }

    #[test]
    fn test_short_circuit() {
        assert_eq!(short_circuit("and"), Some(true));
        assert_eq!(short_circuit("||"), Some(false));
        assert_eq!(short_circuit("&"), None);
    }

    #[test]
    fn test_method_slots() {
        assert_eq!(method_slot("initialize"), "__init__");
        assert_eq!(method_slot("+"), "__add__");
        assert_eq!(method_slot("area"), "area");
    }

    #[test]
    fn test_call_templates() {
        assert_eq!(call2("Add", "a", "b"), "πg.Add(πF, a, b)");
        assert_eq!(call1("Neg", "πTemp001"), "πg.Neg(πF, πTemp001)");
    }
}
