//! Temporary slot allocation.
//!
//! Every intermediate value of a lowered unit lives in a Go variable named
//! `πTemp001`, `πTemp002`, ... declared once at the top of the unit. Slots are
//! recycled as soon as their value is consumed:
//! - allocation reuses the first free slot of the requested type, scanning in
//!   name order, and only mints a new slot when none is free
//! - freeing never removes a declaration; the pool remembers every slot it
//!   ever handed out
//!
//! Reuse order is fully determined by the allocation sequence, which keeps the
//! generated Go stable across runs.

use std::collections::BTreeMap;
use std::fmt;

/// Go type of a temporary slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum SlotType {
    #[default]
    Object,
    Bool,
    /// Argument vectors and list stores.
    Args,
    Dict,
    /// Parameter tables of function definitions.
    Params,
}

impl SlotType {
    pub fn go_type(self) -> &'static str {
        match self {
            SlotType::Object => "*πg.Object",
            SlotType::Bool => "bool",
            SlotType::Args => "[]*πg.Object",
            SlotType::Dict => "*πg.Dict",
            SlotType::Params => "[]πg.Param",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Temporary {
    index: u32,
    ty: SlotType,
}

impl Temporary {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn ty(&self) -> SlotType {
        self.ty
    }

    pub fn name(&self) -> String {
        format!("πTemp{:03}", self.index)
    }
}

impl fmt::Display for Temporary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "πTemp{:03}", self.index)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TempPool {
    next_index: u32,
    used: BTreeMap<String, Temporary>,
    free: BTreeMap<String, Temporary>,
}

impl TempPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, ty: SlotType) -> Temporary {
        let reusable = self
            .free
            .iter()
            .find(|(_, temp)| temp.ty == ty)
            .map(|(name, _)| name.clone());
        let temp = match reusable.and_then(|name| self.free.remove(&name)) {
            Some(temp) => temp,
            None => {
                self.next_index += 1;
                Temporary { index: self.next_index, ty }
            }
        };
        self.used.insert(temp.name(), temp.clone());
        temp
    }

    pub fn free(&mut self, temp: &Temporary) {
        let name = temp.name();
        match self.used.remove(&name) {
            Some(owned) => {
                self.free.insert(name, owned);
            }
            None => debug_assert!(false, "{name} freed while not in use"),
        }
    }

    pub fn is_used(&self, temp: &Temporary) -> bool {
        self.used.contains_key(&temp.name())
    }

    pub fn used_count(&self) -> usize {
        self.used.len()
    }

    /// Every slot ever allocated, in name order.
    pub fn declarations(&self) -> Vec<Temporary> {
        let mut all: Vec<(&String, &Temporary)> =
            self.used.iter().chain(self.free.iter()).collect();
        all.sort_by(|a, b| a.0.cmp(b.0));
        all.into_iter().map(|(_, temp)| temp.clone()).collect()
    }
}
