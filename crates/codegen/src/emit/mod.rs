//! Indentation-aware Go text sink.
//!
//! Lowering never formats control flow by hand: every fallible runtime call
//! goes through [`Writer::write_checked_call1`] or
//! [`Writer::write_checked_call2`], and every unit body is wrapped by
//! [`Writer::write_block`] into the checkpoint dispatch loop.

pub mod go;

use std::fmt::Display;

use crate::scope::Temporary;

#[derive(Debug, Clone, Default)]
pub struct Writer {
    out: String,
    indent: usize,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indent(indent: usize) -> Self {
        Self { out: String::new(), indent }
    }

    pub fn indent_level(&self) -> usize {
        self.indent
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Write `text` line by line at the current indentation. Blank lines are dropped.
    pub fn write(&mut self, text: &str) {
        for line in text.split('\n').filter(|line| !line.is_empty()) {
            for _ in 0..self.indent {
                self.out.push('\t');
            }
            self.out.push_str(line);
            self.out.push('\n');
        }
    }

    pub fn newline(&mut self) {
        self.out.push('\n');
    }

    /// Labels sit one level left of the statements they introduce.
    pub fn write_label(&mut self, label: impl Display) {
        self.dedent();
        self.write(&format!("{label}:"));
        self.indent();
    }

    /// A call that only reports failure.
    pub fn write_checked_call1(&mut self, call: &str) {
        self.write(&format!("if πE = {call}; πE != nil {{\n\tcontinue\n}}"));
    }

    /// A call whose result lands in `result`.
    pub fn write_checked_call2(&mut self, result: impl Display, call: &str) {
        self.write(&format!("if {result}, πE = {call}; πE != nil {{\n\tcontinue\n}}"));
    }

    pub fn write_temp_decls(&mut self, temps: &[Temporary]) {
        for temp in temps {
            self.write(&format!("var {temp} {}; _ = {temp}", temp.ty().go_type()));
        }
    }

    /// Wrap a lowered body in the dispatch loop that resumes at checkpoints.
    pub fn write_block(&mut self, checkpoints: &[u32], body: &str) {
        self.write("for ; πF.State() >= 0; πF.PopCheckpoint() {");
        self.indent();
        self.write("switch πF.State() {");
        self.write("case 0:");
        for checkpoint in checkpoints {
            self.write(&format!("case {checkpoint}: goto Label{checkpoint}"));
        }
        self.write("default: panic(\"unexpected function state\")");
        self.write("}");
        self.dedent();
        self.write(body);
        self.write("}");
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn into_string(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::{SlotType, TempPool};

    #[test]
    fn test_write_indents_each_line() {
        let mut writer = Writer::with_indent(1);
        writer.write("a\n\nb");
        assert_eq!(writer.as_str(), "\ta\n\tb\n");
    }

    #[test]
    fn test_checked_calls() {
        let mut writer = Writer::new();
        writer.write_checked_call2("πTemp001", "πg.Add(πF, a, b)");
        writer.write_checked_call1("πg.CheckLocal(πF, µx, \"x\")");
        assert_eq!(
            writer.into_string(),
            "if πTemp001, πE = πg.Add(πF, a, b); πE != nil {\n\tcontinue\n}\n\
             if πE = πg.CheckLocal(πF, µx, \"x\"); πE != nil {\n\tcontinue\n}\n"
        );
    }

    #[test]
    fn test_label_is_dedented() {
        let mut writer = Writer::with_indent(1);
        writer.write_label("Label1");
        writer.write("x");
        assert_eq!(writer.as_str(), "Label1:\n\tx\n");
    }

    #[test]
    fn test_block_dispatches_checkpoints() {
        let mut writer = Writer::new();
        writer.write_block(&[2], "Label2:\n\tfoo()\n");
        assert_eq!(
            writer.into_string(),
            "for ; πF.State() >= 0; πF.PopCheckpoint() {\n\
             \tswitch πF.State() {\n\
             \tcase 0:\n\
             \tcase 2: goto Label2\n\
             \tdefault: panic(\"unexpected function state\")\n\
             \t}\n\
             Label2:\n\
             \tfoo()\n\
             }\n"
        );
    }

    #[test]
    fn test_temp_decls() {
        let mut pool = TempPool::new();
        pool.allocate(SlotType::Object);
        pool.allocate(SlotType::Bool);
        let mut writer = Writer::new();
        writer.write_temp_decls(&pool.declarations());
        assert_eq!(
            writer.into_string(),
            "var πTemp001 *πg.Object; _ = πTemp001\nvar πTemp002 bool; _ = πTemp002\n"
        );
    }
}
