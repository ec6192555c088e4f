use std::fmt;

use crate::runtime;
use crate::scope::Temporary;

/// A lowered expression: the Go expression that yields its `*πg.Object`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueHandle {
    /// Result stored in a pooled slot; must be released once consumed.
    Temp(Temporary),
    /// Side-effect free Go expression, e.g. `πg.NewInt(1).ToObject()`.
    Literal(String),
    /// A function local or parameter, `µname`.
    Local(String),
}

impl ValueHandle {
    pub fn none() -> Self {
        ValueHandle::Literal(runtime::NONE.to_string())
    }

    pub fn temp(&self) -> Option<&Temporary> {
        match self {
            ValueHandle::Temp(temp) => Some(temp),
            _ => None,
        }
    }
}

impl fmt::Display for ValueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueHandle::Temp(temp) => write!(f, "{temp}"),
            ValueHandle::Literal(expr) | ValueHandle::Local(expr) => f.write_str(expr),
        }
    }
}
