//! Compile options and output.

use gorbe_syntax::SourceLines;

use crate::diagnostics::Diagnostic;

/// Per-compile settings.
///
/// ```rust
/// use gorbe_codegen::CompileOptions;
///
/// let options = CompileOptions::default().with_package("hello").with_script("hello.rb");
/// assert_eq!(options.module, "__main__");
/// ```
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Go package clause of the generated file.
    pub package: String,
    /// Name the unit registers itself under with `πg.RegisterModule`.
    pub module: String,
    /// File name recorded in every code object.
    pub script: String,
    /// Ruby source; when present each statement is annotated with its line.
    pub source: Option<SourceLines>,
    /// Import the `gorbe` Go package and install Ruby globals (`true`, `false`, `p`) first.
    pub prelude: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            package: "main".to_string(),
            module: "__main__".to_string(),
            script: "<stdin>".to_string(),
            source: None,
            prelude: false,
        }
    }
}

impl CompileOptions {
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = script.into();
        self
    }

    pub fn with_source(mut self, source: SourceLines) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_prelude(mut self, prelude: bool) -> Self {
        self.prelude = prelude;
        self
    }
}

/// A successfully compiled Go unit.
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    pub go_source: String,
    pub diagnostics: Vec<Diagnostic>,
}
