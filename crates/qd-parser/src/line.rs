/// A physical source line with its 1-based line number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLine<'a> {
    pub number: usize,
    pub text: &'a str,
}

pub fn source_lines(source: &str) -> impl Iterator<Item = SourceLine<'_>> {
    source
        .lines()
        .enumerate()
        .map(|(index, text)| SourceLine {
            number: index + 1,
            text,
        })
}

/// Lexical shape of one directive-language (`.zhif`) line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawLine {
    Skip,
    BlankOutput,
    Directive(Vec<String>),
    Record(Vec<(String, String)>),
    Text { content: String, continues: bool },
}

/// Lexical shape of one role-prefixed (`.qd`) line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DramaLine {
    pub line: String,
    pub head: String,
    pub rest: Option<String>,
}

pub fn unescape_newlines(text: &str) -> String {
    text.replace("\\n", "\n")
}

pub fn lex_directive_line(raw: &str) -> RawLine {
    let (body, continues) = split_continuation(raw);

    if body.trim().is_empty() || body.trim_start().starts_with('#') {
        return RawLine::Skip;
    }

    if body == "/" {
        return RawLine::BlankOutput;
    }

    if let Some(command) = body.strip_prefix('/') {
        let tokens = command
            .split(' ')
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();
        return RawLine::Directive(tokens);
    }

    if body.contains(";;") {
        let fields = body
            .split(";;")
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once(' ') {
                Some((key, value)) => (key.to_string(), unescape_newlines(value.trim_start())),
                None => (part.to_string(), String::new()),
            })
            .collect();
        return RawLine::Record(fields);
    }

    RawLine::Text {
        content: unescape_newlines(body),
        continues,
    }
}

pub fn lex_drama_line(raw: &str) -> Option<DramaLine> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (head, rest) = match line.split_once(' ') {
        Some((head, rest)) => (head, Some(rest.trim_start().to_string())),
        None => (line, None),
    };

    Some(DramaLine {
        line: line.to_string(),
        head: head.to_string(),
        rest: rest.filter(|rest| !rest.is_empty()),
    })
}

/// A single trailing backslash joins the unit with the next one; `\\` is left alone.
fn split_continuation(raw: &str) -> (&str, bool) {
    match raw.strip_suffix('\\') {
        Some(rest) if !rest.ends_with('\\') => (rest, true),
        _ => (raw, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert_eq!(lex_directive_line(""), RawLine::Skip);
        assert_eq!(lex_directive_line("   "), RawLine::Skip);
        assert_eq!(lex_directive_line("# note"), RawLine::Skip);
        assert_eq!(lex_directive_line("\\"), RawLine::Skip);
    }

    #[test]
    fn lone_slash_is_blank_output() {
        assert_eq!(lex_directive_line("/"), RawLine::BlankOutput);
    }

    #[test]
    fn slash_lines_split_into_tokens() {
        assert_eq!(
            lex_directive_line("/color  fore red"),
            RawLine::Directive(vec![
                "color".to_string(),
                "fore".to_string(),
                "red".to_string()
            ])
        );
        assert_eq!(lex_directive_line("/ "), RawLine::Directive(Vec::new()));
    }

    #[test]
    fn text_lines_unescape_newlines_and_continuations() {
        assert_eq!(
            lex_directive_line("Hello\\nWorld"),
            RawLine::Text {
                content: "Hello\nWorld".to_string(),
                continues: false
            }
        );
        assert_eq!(
            lex_directive_line("Partial line\\"),
            RawLine::Text {
                content: "Partial line".to_string(),
                continues: true
            }
        );
        assert_eq!(
            lex_directive_line("ends with slash\\\\"),
            RawLine::Text {
                content: "ends with slash\\\\".to_string(),
                continues: false
            }
        );
    }

    #[test]
    fn double_semicolon_lines_become_records() {
        assert_eq!(
            lex_directive_line("role Alice;; text Hi\\nthere ;;flag"),
            RawLine::Record(vec![
                ("role".to_string(), "Alice".to_string()),
                ("text".to_string(), "Hi\nthere".to_string()),
                ("flag".to_string(), String::new()),
            ])
        );
    }

    #[test]
    fn drama_lines_split_on_first_space() {
        let line = lex_drama_line("  Alice Hello there  ").expect("line");
        assert_eq!(line.head, "Alice");
        assert_eq!(line.rest.as_deref(), Some("Hello there"));
        assert_eq!(line.line, "Alice Hello there");

        let single = lex_drama_line("Silence").expect("line");
        assert_eq!(single.rest, None);

        assert!(lex_drama_line("# comment").is_none());
        assert!(lex_drama_line("   ").is_none());
    }

    #[test]
    fn source_lines_are_numbered_from_one() {
        let numbered = source_lines("a\r\nb\n").collect::<Vec<_>>();
        assert_eq!(numbered.len(), 2);
        assert_eq!(numbered[0].number, 1);
        assert_eq!(numbered[1].text, "b");
    }
}
