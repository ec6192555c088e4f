//! Compilation context holding state during lowering

use gorbe_syntax::{Node, Sexp};

use crate::compiler::shape::rebinds_locals;
use crate::compiler::value::ValueHandle;
use crate::diagnostics::Diagnostics;
use crate::emit::Writer;
use crate::emit::go::go_str;
use crate::error::{CodegenError, CodegenResult};
use crate::options::CompileOptions;
use crate::scope::{Label, Resolution, ScopeChain, SlotType, Temporary};

#[derive(Debug)]
pub struct CompilationContext {
    pub scopes: ScopeChain,
    pub writer: Writer,
    pub diagnostics: Diagnostics,
    pub options: CompileOptions,
}

impl CompilationContext {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            scopes: ScopeChain::new(),
            writer: Writer::with_indent(1),
            diagnostics: Diagnostics::new(),
            options,
        }
    }

    pub fn alloc_temp(&mut self, ty: SlotType) -> Temporary {
        self.scopes.current_mut().temps_mut().allocate(ty)
    }

    pub fn free_temp(&mut self, temp: &Temporary) {
        self.scopes.current_mut().temps_mut().free(temp);
    }

    /// Give back the slot behind `handle`, if it owns one.
    pub fn release(&mut self, handle: ValueHandle) {
        if let ValueHandle::Temp(temp) = handle {
            self.free_temp(&temp);
        }
    }

    /// Snapshot a local operand into a temporary when one of the operands
    /// lowered after it may reassign that local.
    pub fn pin(&mut self, handle: ValueHandle, later: &[&Sexp]) -> ValueHandle {
        match handle {
            ValueHandle::Local(go_name) if later.iter().any(|sexp| rebinds_locals(sexp)) => {
                let temp = self.alloc_temp(SlotType::Object);
                self.writer.write(&format!("{temp} = {go_name}"));
                ValueHandle::Temp(temp)
            }
            other => other,
        }
    }

    pub fn gen_label(&mut self, checkpoint: bool) -> Label {
        self.scopes.current_mut().gen_label(checkpoint)
    }

    /// Go `*πg.Str` expression for `value`.
    pub fn intern(&mut self, value: &str) -> String {
        self.scopes.interner_mut().intern(value)
    }

    /// Emit a read of `name` and return where its value is.
    pub fn resolve_name(&mut self, name: &str) -> CodegenResult<ValueHandle> {
        match self.scopes.resolve(name) {
            Resolution::Local { go_name } => {
                let check = format!("πg.CheckLocal(πF, {go_name}, {})", go_str(name));
                self.writer.write_checked_call1(&check);
                Ok(ValueHandle::Local(go_name))
            }
            Resolution::Global => {
                let key = self.intern(name);
                let result = self.alloc_temp(SlotType::Object);
                self.writer.write_checked_call2(&result, &format!("πg.ResolveGlobal(πF, {key})"));
                Ok(ValueHandle::Temp(result))
            }
            Resolution::ClassAttr => {
                let key = self.intern(name);
                let result = self.alloc_temp(SlotType::Object);
                let call = format!("πg.ResolveClass(πF, πClass, nil, {key})");
                self.writer.write_checked_call2(&result, &call);
                Ok(ValueHandle::Temp(result))
            }
        }
    }

    /// Emit a store of `value` under `name`.
    pub fn bind_var(&mut self, name: &str, value: &ValueHandle) -> CodegenResult<()> {
        match self.scopes.resolve(name) {
            Resolution::Local { go_name } => self.writer.write(&format!("{go_name} = {value}")),
            Resolution::Global => {
                let key = self.intern(name);
                let call = format!("πF.Globals().SetItem(πF, {key}.ToObject(), {value})");
                self.writer.write_checked_call1(&call);
            }
            Resolution::ClassAttr => {
                let key = self.intern(name);
                let call = format!("πClass.SetItem(πF, {key}.ToObject(), {value})");
                self.writer.write_checked_call1(&call);
            }
        }
        Ok(())
    }

    /// `self` of the enclosing method.
    pub fn resolve_self(&mut self, node: &Node) -> CodegenResult<ValueHandle> {
        match self.scopes.resolve("self") {
            Resolution::Local { .. } => self.resolve_name("self"),
            _ => Err(CodegenError::semantic(node, "'self' is only available inside a method.")),
        }
    }

    /// Annotate the statement at `node` with its source line, when the source is known.
    pub fn write_line_context(&mut self, node: &Node) {
        let Some(line) = node.line() else {
            return;
        };
        let Some(text) = self.options.source.as_ref().and_then(|src| src.get(line)) else {
            return;
        };
        let comment = format!("// line {line}: {}", text.trim());
        self.writer.write(&comment);
        self.writer.write(&format!("πF.SetLineno({line})"));
    }

    /// Run `f` against a fresh body writer and return what it wrote.
    pub fn capture<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> CodegenResult<T>,
    ) -> CodegenResult<(T, String)> {
        let saved = std::mem::replace(&mut self.writer, Writer::with_indent(1));
        let result = f(self);
        let body = std::mem::replace(&mut self.writer, saved).into_string();
        result.map(|value| (value, body))
    }
}
