//! Command-line interface for gorbe.

use clap::Parser;
use gorbe_codegen::CompileOptions;
use gorbe_syntax::SourceLines;
use std::path::{Path, PathBuf};

/// Path argument meaning standard input.
pub const STDIN: &str = "-";

/// gorbe - compile Ruby, parsed by Ripper, into Go for the Grumpy runtime
///
/// The AST is the JSON rendering of `Ripper.sexp`, e.g.
/// `ruby -rripper -rjson -e 'puts Ripper.sexp(ARGF.read).to_json' hello.rb`.
#[derive(Parser, Debug)]
#[command(name = "gorbe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Ripper AST as JSON (`-` reads standard input)
    pub ast: PathBuf,

    /// Ruby source the AST was parsed from, for line comments in the output
    #[arg(long, value_name = "FILE")]
    pub source: Option<PathBuf>,

    /// Go package of the generated file
    #[arg(long, default_value = "main")]
    pub package: String,

    /// Name the module registers itself under
    #[arg(long, default_value = "__main__")]
    pub module: String,

    /// File name recorded in the generated code objects
    #[arg(long)]
    pub script: Option<String>,

    /// Write the Go source here instead of standard output
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print diagnostics as JSON lines
    #[arg(long)]
    pub json_diagnostics: bool,

    /// Install the Ruby globals of the `gorbe` Go package before running
    #[arg(long)]
    pub prelude: bool,
}

impl Cli {
    pub fn reads_stdin(&self) -> bool {
        self.ast.as_os_str() == STDIN
    }

    /// The `--script` name, else the Ruby source file, else `<stdin>`.
    pub fn script_name(&self) -> String {
        match (&self.script, &self.source) {
            (Some(script), _) => script.clone(),
            (None, Some(source)) => file_name(source),
            (None, None) => "<stdin>".to_string(),
        }
    }

    pub fn compile_options(&self, source: Option<SourceLines>) -> CompileOptions {
        let options = CompileOptions::default()
            .with_package(self.package.as_str())
            .with_module(self.module.as_str())
            .with_script(self.script_name())
            .with_prelude(self.prelude);
        match source {
            Some(lines) => options.with_source(lines),
            None => options,
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| path.display().to_string())
}
