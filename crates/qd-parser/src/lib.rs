mod line;

pub use line::{
    lex_directive_line, lex_drama_line, source_lines, unescape_newlines, DramaLine, RawLine,
    SourceLine,
};
