//! Pipeline for compiling a Ripper AST into a Go unit.
//!
//! Read the AST (and optionally the Ruby source), compile it, write the Go
//! source, then report diagnostics on stderr. Notes and warnings never fail
//! the run; load and compile errors do, with exit code 1.

use gorbe_codegen::{CodegenError, CompileOptions, CompiledUnit, Diagnostic};
use gorbe_syntax::{LoadError, SourceLines, load_json};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::cli::Cli;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Pipeline error type
#[derive(Debug)]
pub enum PipelineError {
    /// File I/O error
    IoError { path: PathBuf, error: io::Error },
    /// The AST is not valid Ripper JSON
    LoadError(LoadError),
    /// The program cannot be compiled
    CodegenError(CodegenError),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::IoError { path, error } => {
                write!(f, "I/O error: {}: {}", path.display(), error)
            }
            PipelineError::LoadError(e) => write!(f, "invalid AST: {}", e),
            PipelineError::CodegenError(e) => write!(f, "compile error: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<LoadError> for PipelineError {
    fn from(error: LoadError) -> Self {
        PipelineError::LoadError(error)
    }
}

impl From<CodegenError> for PipelineError {
    fn from(error: CodegenError) -> Self {
        PipelineError::CodegenError(error)
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> PipelineError + '_ {
    move |error| PipelineError::IoError { path: path.to_path_buf(), error }
}

/// Run the driver for parsed arguments.
pub fn run(cli: &Cli) -> PipelineResult<()> {
    let ast = if cli.reads_stdin() {
        let mut input = String::new();
        io::stdin().read_to_string(&mut input).map_err(io_error(&cli.ast))?;
        input
    } else {
        read_file(&cli.ast)?
    };
    let source = cli
        .source
        .as_deref()
        .map(read_file)
        .transpose()?
        .map(|text| SourceLines::new(&text));

    let unit = compile_json(&ast, cli.compile_options(source))?;
    write_output(cli.output.as_deref(), &unit.go_source)?;

    let mut stderr = io::stderr().lock();
    report_diagnostics(&unit.diagnostics, cli.json_diagnostics, &mut stderr)
        .map_err(io_error(Path::new("<stderr>")))
}

pub fn read_file(path: &Path) -> PipelineResult<String> {
    fs::read_to_string(path).map_err(io_error(path))
}

/// Load Ripper JSON and compile it.
pub fn compile_json(ast: &str, options: CompileOptions) -> PipelineResult<CompiledUnit> {
    let program = load_json(ast)?;
    Ok(gorbe_codegen::compile(&program, options)?)
}

/// Write the Go source to `path`, or to stdout when no path is given.
pub fn write_output(path: Option<&Path>, go_source: &str) -> PipelineResult<()> {
    match path {
        Some(path) => fs::write(path, go_source).map_err(io_error(path)),
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(go_source.as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(io_error(Path::new("<stdout>")))
        }
    }
}

/// One line per diagnostic, as text or as JSON.
pub fn report_diagnostics(
    diagnostics: &[Diagnostic],
    json: bool,
    out: &mut impl Write,
) -> io::Result<()> {
    for diagnostic in diagnostics {
        if json {
            let line = serde_json::to_string(diagnostic).map_err(io::Error::other)?;
            writeln!(out, "{line}")?;
        } else {
            writeln!(out, "{diagnostic}")?;
        }
    }
    Ok(())
}
