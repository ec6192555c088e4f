//! Ripper event names.
//!
//! Every node of a Ripper s-expression starts with the name of the parser or
//! scanner event that produced it. The names the compiler knows about are
//! listed here; anything else is kept verbatim in [`Tag::Other`] so that it can
//! be reported instead of silently dropped.

use std::fmt;

macro_rules! tags {
    ($($variant:ident => $name:literal,)*) => {
        /// The event name heading a Ripper node.
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum Tag {
            $($variant,)*
            /// An event the compiler has no dedicated handling for.
            Other(String),
        }

        impl Tag {
            /// Look up the tag for a Ripper event name.
            pub fn from_name(name: &str) -> Self {
                match name {
                    $($name => Tag::$variant,)*
                    other => Tag::Other(other.to_string()),
                }
            }

            /// The Ripper event name, without the leading colon.
            pub fn name(&self) -> &str {
                match self {
                    $(Tag::$variant => $name,)*
                    Tag::Other(name) => name,
                }
            }
        }
    };
}

tags! {
    // Scanner events
    Int => "@int",
    Float => "@float",
    Ident => "@ident",
    Const => "@const",
    Kw => "@kw",
    GVar => "@gvar",
    IVar => "@ivar",
    CVar => "@cvar",
    Op => "@op",
    Period => "@period",
    Label => "@label",
    TStringContent => "@tstring_content",

    // Program structure
    Program => "program",
    VoidStmt => "void_stmt",
    BodyStmt => "bodystmt",
    Paren => "paren",

    // Variables and assignment
    VarRef => "var_ref",
    VarField => "var_field",
    VCall => "vcall",
    Assign => "assign",
    OpAssign => "opassign",
    ArefField => "aref_field",
    Field => "field",

    // Operators
    Binary => "binary",
    Unary => "unary",
    IfOp => "ifop",

    // Literals
    StringLiteral => "string_literal",
    StringContent => "string_content",
    StringEmbexpr => "string_embexpr",
    SymbolLiteral => "symbol_literal",
    Symbol => "symbol",
    DynaSymbol => "dyna_symbol",
    Array => "array",
    Hash => "hash",
    AssoclistFromArgs => "assoclist_from_args",
    AssocNew => "assoc_new",
    BareAssocHash => "bare_assoc_hash",
    Aref => "aref",

    // Calls
    MethodAddArg => "method_add_arg",
    FCall => "fcall",
    Call => "call",
    Command => "command",
    CommandCall => "command_call",
    ArgParen => "arg_paren",
    ArgsAddBlock => "args_add_block",

    // Branching
    If => "if",
    Unless => "unless",
    Elsif => "elsif",
    Else => "else",
    IfMod => "if_mod",
    UnlessMod => "unless_mod",
    Case => "case",
    When => "when",

    // Looping
    While => "while",
    Until => "until",
    WhileMod => "while_mod",
    UntilMod => "until_mod",
    Break => "break",
    Next => "next",

    // Definitions
    Def => "def",
    Params => "params",
    RestParam => "rest_param",
    Class => "class",
    ConstRef => "const_ref",
    Return => "return",
    Return0 => "return0",
}

impl Tag {
    /// Scanner events carry token text and a position instead of children.
    pub fn is_scanner_event(&self) -> bool {
        self.name().starts_with('@')
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
