use qd_core::{LineUnit, RoleRegistry};
use qd_parser::{lex_drama_line, source_lines};

use crate::CompileOutput;

/// Compiles role-prefixed drama text: `Role words...` becomes speech when `Role` is
/// registered, anything else is narration.
pub fn compile_drama_source(source: &str, roles: &RoleRegistry) -> CompileOutput {
    let mut output = CompileOutput::default();

    for line in source_lines(source) {
        let Some(parsed) = lex_drama_line(line.text) else {
            continue;
        };

        let unit = match parsed.rest {
            Some(rest) if roles.contains(&parsed.head) => LineUnit::speech(parsed.head, rest),
            _ => LineUnit::text(parsed.line),
        };

        tracing::debug!(line = line.number, kind = unit.kind_name(), "compiled line");
        output.script.push(unit);
    }

    output
}

#[cfg(test)]
mod drama_lang_tests {
    use super::*;
    use qd_core::Role;

    fn roles(ids: &[&str]) -> RoleRegistry {
        let mut registry = RoleRegistry::new();
        for id in ids {
            registry.insert(
                *id,
                Role {
                    display_name: None,
                    color: None,
                },
            );
        }
        registry
    }

    #[test]
    fn registered_first_token_becomes_speech() {
        let output = compile_drama_source(
            "# act one\nAlice Hello there\nUnknown text here\n\n",
            &roles(&["Alice"]),
        );
        assert!(output.diagnostics.is_empty());
        assert_eq!(
            output.script.lines(),
            &[
                LineUnit::speech("Alice", "Hello there"),
                LineUnit::text("Unknown text here"),
            ]
        );
    }

    #[test]
    fn role_name_alone_is_narration() {
        let output = compile_drama_source("Alice\n  Alice   waves  \n", &roles(&["Alice"]));
        assert_eq!(
            output.script.lines(),
            &[LineUnit::text("Alice"), LineUnit::speech("Alice", "waves")]
        );
    }
}
