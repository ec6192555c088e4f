//! String interning for generated code.
//!
//! Names and short identifier-like strings are declared once per unit as
//! `ßname := πg.InternStr("name")` and referenced by that variable afterwards.
//! Anything that cannot become part of a Go identifier, or is too long to be
//! worth it, is emitted inline with `πg.NewStr`.

use indexmap::IndexSet;

use crate::emit::go::go_str;

const MAX_INTERNED_LEN: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct Interner {
    strings: IndexSet<String>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_internable(value: &str) -> bool {
        value.len() <= MAX_INTERNED_LEN
            && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
    }

    /// Go expression of type `*πg.Str` for `value`.
    pub fn intern(&mut self, value: &str) -> String {
        if Self::is_internable(value) {
            self.strings.insert(value.to_string());
            format!("ß{value}")
        } else {
            format!("πg.NewStr({})", go_str(value))
        }
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// `ßname := πg.InternStr("name")` lines, sorted by name.
    pub fn declarations(&self) -> Vec<String> {
        let mut names: Vec<&String> = self.strings.iter().collect();
        names.sort();
        names.into_iter().map(|name| format!("ß{name} := πg.InternStr({})", go_str(name))).collect()
    }
}
