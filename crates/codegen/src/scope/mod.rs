//! Lexical scopes of the unit being lowered.
//!
//! Scopes form a chain from the module top level down to the body currently
//! being lowered. The chain is a stack: entering a `def` or `class` body pushes
//! a scope, finishing it pops. Each scope owns its temporaries, labels and loop
//! contexts; the top level additionally owns the string interner.

pub mod classify;
pub mod interner;
pub mod temps;
pub mod variable;

use std::collections::BTreeSet;
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

pub use classify::VariableClassifier;
pub use interner::Interner;
pub use temps::{SlotType, TempPool, Temporary};
pub use variable::{VarKind, Variable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    TopLevel,
    Function,
    Class,
}

/// A jump target inside a dispatch loop, rendered `LabelN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(u32);

impl Label {
    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label{}", self.0)
    }
}

/// The break flag of one active loop.
#[derive(Debug, Clone)]
pub struct LoopContext {
    pub break_flag: Temporary,
}

/// Where a name lives, as seen from the current scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Module globals, through `πF.Globals()`.
    Global,
    /// A Go local of the current or an enclosing function.
    Local { go_name: String },
    /// The attribute namespace of the class body being lowered.
    ClassAttr,
}

#[derive(Debug)]
pub struct Scope {
    kind: ScopeKind,
    name: String,
    parent: Option<usize>,
    temps: TempPool,
    next_label: u32,
    checkpoints: BTreeSet<u32>,
    loops: SmallVec<[LoopContext; 4]>,
    vars: IndexMap<String, Variable>,
    class_globals: IndexSet<String>,
}

impl Scope {
    fn new(kind: ScopeKind, name: impl Into<String>, parent: Option<usize>) -> Self {
        Self {
            kind,
            name: name.into(),
            parent,
            temps: TempPool::new(),
            next_label: 0,
            checkpoints: BTreeSet::new(),
            loops: SmallVec::new(),
            vars: IndexMap::new(),
            class_globals: IndexSet::new(),
        }
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn temps(&self) -> &TempPool {
        &self.temps
    }

    pub fn temps_mut(&mut self) -> &mut TempPool {
        &mut self.temps
    }

    pub fn gen_label(&mut self, checkpoint: bool) -> Label {
        self.next_label += 1;
        if checkpoint {
            self.checkpoints.insert(self.next_label);
        }
        Label(self.next_label)
    }

    /// Checkpoint label ids in increasing order.
    pub fn checkpoints(&self) -> Vec<u32> {
        self.checkpoints.iter().copied().collect()
    }

    pub fn label_count(&self) -> u32 {
        self.next_label
    }

    pub fn push_loop(&mut self, context: LoopContext) {
        self.loops.push(context);
    }

    pub fn pop_loop(&mut self) -> Option<LoopContext> {
        self.loops.pop()
    }

    pub fn innermost_loop(&self) -> Option<&LoopContext> {
        self.loops.last()
    }

    pub fn set_variables(&mut self, vars: IndexMap<String, Variable>) {
        self.vars = vars;
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.vars.values()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.vars.get(name)
    }

    pub fn declare_class_global(&mut self, name: &str) {
        self.class_globals.insert(name.to_string());
    }
}

/// The stack of open scopes. Index 0 is always the top level.
#[derive(Debug)]
pub struct ScopeChain {
    scopes: Vec<Scope>,
    interner: Interner,
}

impl Default for ScopeChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeChain {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::TopLevel, "<module>", None)],
            interner: Interner::new(),
        }
    }

    pub fn push(&mut self, kind: ScopeKind, name: &str) -> usize {
        let parent = self.scopes.len() - 1;
        tracing::debug!(?kind, name, depth = self.scopes.len(), "enter scope");
        self.scopes.push(Scope::new(kind, name, Some(parent)));
        self.scopes.len() - 1
    }

    /// Pop the innermost scope. The top level is never popped.
    pub fn pop(&mut self) -> Option<Scope> {
        if self.scopes.len() <= 1 {
            return None;
        }
        let scope = self.scopes.pop();
        if let Some(scope) = &scope {
            tracing::debug!(
                kind = ?scope.kind,
                name = scope.name(),
                temps = scope.temps.declarations().len(),
                "leave scope"
            );
        }
        scope
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn current(&self) -> &Scope {
        &self.scopes[self.scopes.len() - 1]
    }

    pub fn current_mut(&mut self) -> &mut Scope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    pub fn get(&self, index: usize) -> Option<&Scope> {
        self.scopes.get(index)
    }

    pub fn root(&self) -> &Scope {
        &self.scopes[0]
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    pub fn interner_mut(&mut self) -> &mut Interner {
        &mut self.interner
    }

    /// Innermost enclosing function scope, if any.
    pub fn enclosing_function(&self) -> Option<&Scope> {
        self.scopes.iter().rev().find(|scope| scope.kind == ScopeKind::Function)
    }

    pub fn innermost_loop(&self) -> Option<&LoopContext> {
        self.current().innermost_loop()
    }

    /// Resolve `name` for a read or a write from the current scope.
    ///
    /// Function scopes search their own table, then enclosing function
    /// scopes; the first match wins. A class body only consults its own
    /// namespace. Everything else is a module global, as are `$names`.
    pub fn resolve(&self, name: &str) -> Resolution {
        if name.starts_with('$') {
            return Resolution::Global;
        }
        let current = self.current();
        match current.kind {
            ScopeKind::TopLevel => Resolution::Global,
            ScopeKind::Class => {
                if current.class_globals.contains(name) {
                    Resolution::Global
                } else {
                    Resolution::ClassAttr
                }
            }
            ScopeKind::Function => {
                let functions =
                    self.scopes.iter().rev().take_while(|s| s.kind == ScopeKind::Function);
                for scope in functions {
                    if let Some(var) = scope.vars.get(name) {
                        return match var.kind {
                            VarKind::Global => Resolution::Global,
                            VarKind::Parameter(_) | VarKind::Local => {
                                Resolution::Local { go_name: var.go_name() }
                            }
                        };
                    }
                }
                Resolution::Global
            }
        }
    }
}
