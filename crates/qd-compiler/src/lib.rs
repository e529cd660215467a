use qd_core::{DramaError, Script};

mod directive_lang;
mod drama_lang;
mod json_lines;
mod pipeline;

pub use directive_lang::compile_directive_source;
pub use drama_lang::compile_drama_source;
pub use json_lines::load_json_script;
pub use pipeline::{compile_file, compile_source, script_to_json, SourceSyntax};

/// Result of a best-effort compilation: the units that compiled plus every line that
/// was reported and dropped.
#[derive(Debug, Clone, Default)]
pub struct CompileOutput {
    pub script: Script,
    pub diagnostics: Vec<DramaError>,
}

impl CompileOutput {
    fn report(&mut self, error: DramaError) {
        match error.line {
            Some(line) => tracing::error!(line, code = error.code(), "{}", error.message),
            None => tracing::error!(code = error.code(), "{}", error.message),
        }
        self.diagnostics.push(error);
    }
}
