use crate::emit::go::local_name;

/// How a name is stored inside a function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// Lives in the module's global namespace.
    Global,
    /// Bound from `πArgs[index]` on entry.
    Parameter(usize),
    /// A Go local initialized to `πg.UnboundLocal`.
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
}

impl Variable {
    pub fn new(name: impl Into<String>, kind: VarKind) -> Self {
        Self { name: name.into(), kind }
    }

    pub fn is_global(&self) -> bool {
        self.kind == VarKind::Global
    }

    /// Go identifier of the slot, `µname`. Meaningless for globals.
    pub fn go_name(&self) -> String {
        local_name(&self.name)
    }
}
