use std::fs;
use std::io;
use std::path::Path;

use qd_core::{DramaError, ErrorKind, RoleRegistry, Script};

use crate::directive_lang::compile_directive_source;
use crate::drama_lang::compile_drama_source;
use crate::json_lines::load_json_script;
use crate::CompileOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSyntax {
    /// `.zhif`: `/directive` lines, plain text and `;;` records.
    Directive,
    /// `.qd`: `Role text` lines.
    Drama,
    /// `.json`: structured lines.
    Json,
}

impl SourceSyntax {
    pub fn detect(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("qd") => Self::Drama,
            Some("json") => Self::Json,
            _ => Self::Directive,
        }
    }
}

pub fn compile_source(
    source: &str,
    syntax: SourceSyntax,
    roles: &RoleRegistry,
) -> Result<CompileOutput, DramaError> {
    let output = match syntax {
        SourceSyntax::Directive => compile_directive_source(source),
        SourceSyntax::Drama => compile_drama_source(source, roles),
        SourceSyntax::Json => load_json_script(source)?,
    };
    tracing::info!(
        units = output.script.len(),
        diagnostics = output.diagnostics.len(),
        ?syntax,
        "compiled script"
    );
    Ok(output)
}

pub fn compile_file(path: &Path, roles: &RoleRegistry) -> Result<CompileOutput, DramaError> {
    let source = read_source(path)?;
    compile_source(&source, SourceSyntax::detect(path), roles)
}

pub fn script_to_json(script: &Script) -> Result<String, DramaError> {
    serde_json::to_string_pretty(script).map_err(|error| {
        DramaError::new(
            ErrorKind::InvalidScript,
            format!("Failed to serialize script: {}", error),
        )
    })
}

fn read_source(path: &Path) -> Result<String, DramaError> {
    let bytes = fs::read(path).map_err(|error| match error.kind() {
        io::ErrorKind::NotFound => DramaError::new(
            ErrorKind::NotFound,
            format!("Script file not found: {}", path.display()),
        ),
        _ => DramaError::new(
            ErrorKind::Io,
            format!("Failed to read \"{}\": {}", path.display(), error),
        ),
    })?;
    String::from_utf8(bytes).map_err(|_| {
        DramaError::new(
            ErrorKind::Encoding,
            format!("Script is not valid UTF-8: {}", path.display()),
        )
    })
}
