use std::collections::BTreeMap;

use qd_core::{Directive, DirectiveKind, DramaError, ErrorKind, LineUnit};
use qd_parser::{lex_directive_line, source_lines, RawLine};

use crate::CompileOutput;

/// Compiles the `/directive` mini-language. Malformed lines are reported and left out;
/// the rest of the script still compiles.
pub fn compile_directive_source(source: &str) -> CompileOutput {
    let mut output = CompileOutput::default();

    for line in source_lines(source) {
        let unit = match lex_directive_line(line.text) {
            RawLine::Skip => continue,
            RawLine::BlankOutput => LineUnit::Text {
                content: "\n".to_string(),
                continues: true,
            },
            RawLine::Text { content, continues } => LineUnit::Text { content, continues },
            RawLine::Directive(tokens) => match compile_directive(tokens, line.number) {
                Ok(directive) => LineUnit::Directive(directive),
                Err(error) => {
                    output.report(error);
                    continue;
                }
            },
            RawLine::Record(fields) => match compile_record(fields, line.number) {
                Ok(unit) => unit,
                Err(error) => {
                    output.report(error);
                    continue;
                }
            },
        };

        tracing::debug!(line = line.number, kind = unit.kind_name(), "compiled line");
        output.script.push(unit);
    }

    output
}

fn compile_directive(tokens: Vec<String>, line: usize) -> Result<Directive, DramaError> {
    let Some(directive) = Directive::from_tokens(tokens) else {
        return Err(DramaError::with_line(
            ErrorKind::MalformedLine,
            "Empty directive after \"/\".",
            line,
        ));
    };

    match DirectiveKind::parse(&directive) {
        Ok(_) => Ok(directive),
        Err(error) if error.kind == ErrorKind::MalformedLine => {
            Err(DramaError::with_line(error.kind, error.message, line))
        }
        Err(error) => {
            // Argument values are checked again when the directive runs.
            tracing::warn!(line, code = error.code(), "{}", error.message);
            Ok(directive)
        }
    }
}

fn compile_record(fields: Vec<(String, String)>, line: usize) -> Result<LineUnit, DramaError> {
    let fields = fields.into_iter().collect::<BTreeMap<_, _>>();
    if !fields.contains_key("text") {
        return Err(DramaError::with_line(
            ErrorKind::MalformedLine,
            "Structured line has no \"text\" field.",
            line,
        ));
    }
    Ok(LineUnit::Record { fields })
}

#[cfg(test)]
mod directive_lang_tests {
    use super::*;

    #[test]
    fn compiles_text_directives_and_blank_output() {
        let output = compile_directive_source(
            "# intro\n\nHello\\nWorld\n/delay 0.05\n/\nPartial line\\\n/color fore red\n",
        );
        assert!(output.diagnostics.is_empty());
        let lines = output.script.lines();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], LineUnit::text("Hello\nWorld"));
        assert_eq!(
            lines[1],
            LineUnit::Directive(Directive::new("delay", vec!["0.05".to_string()]))
        );
        assert_eq!(
            lines[2],
            LineUnit::Text {
                content: "\n".to_string(),
                continues: true
            }
        );
        assert!(lines[3].continues());
        assert_eq!(
            lines[4],
            LineUnit::Directive(Directive::new(
                "color",
                vec!["fore".to_string(), "red".to_string()]
            ))
        );
    }

    #[test]
    fn malformed_directives_are_reported_and_skipped() {
        let output = compile_directive_source("Before\n/frobnicate 1 2\n/ \nAfter\n");
        assert_eq!(output.script.len(), 2);
        assert_eq!(output.diagnostics.len(), 2);
        assert_eq!(output.diagnostics[0].kind, ErrorKind::MalformedLine);
        assert_eq!(output.diagnostics[0].line, Some(2));
        assert_eq!(output.diagnostics[1].line, Some(3));
        assert_eq!(output.script.lines()[1], LineUnit::text("After"));
    }

    #[test]
    fn bad_argument_values_are_kept_for_run_time() {
        let output = compile_directive_source("/delay fast\n/color fore teal\n");
        assert!(output.diagnostics.is_empty());
        assert_eq!(output.script.len(), 2);
    }

    #[test]
    fn records_need_a_text_field() {
        let output = compile_directive_source("role Alice;;text Hi\nrole Bob;;fore red\n");
        assert_eq!(output.script.len(), 1);
        let LineUnit::Record { fields } = &output.script.lines()[0] else {
            panic!("expected record");
        };
        assert_eq!(fields.get("role").map(String::as_str), Some("Alice"));
        assert_eq!(fields.get("text").map(String::as_str), Some("Hi"));
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].line, Some(2));
    }
}
