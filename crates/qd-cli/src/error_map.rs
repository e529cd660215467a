use std::fmt::Display;
use std::path::Path;

use qd_core::{DramaError, ErrorKind};

fn map_error(kind: ErrorKind, error: impl Display) -> DramaError {
    DramaError::new(kind, error.to_string())
}

pub(crate) fn emit_error(error: DramaError) -> i32 {
    tracing::error!(code = error.code(), "{}", error.message);
    match error.line {
        Some(line) => eprintln!("error[{}]: line {}: {}", error.code(), line, error.message),
        None => eprintln!("error[{}]: {}", error.code(), error.message),
    }
    1
}

pub(crate) fn map_terminal_io(error: std::io::Error) -> DramaError {
    map_error(ErrorKind::Terminal, error)
}

pub(crate) fn map_output_write(path: &Path, error: std::io::Error) -> DramaError {
    map_error(
        ErrorKind::Io,
        format!("Failed to write \"{}\": {}", path.display(), error),
    )
}

pub(crate) fn map_log_file(path: &Path, error: std::io::Error) -> DramaError {
    map_error(
        ErrorKind::Io,
        format!("Failed to open log file \"{}\": {}", path.display(), error),
    )
}

#[cfg(test)]
mod error_map_tests {
    use super::*;

    #[test]
    fn emit_error_returns_non_zero_exit_code() {
        let code = emit_error(DramaError::new(ErrorKind::NotFound, "missing"));
        assert_eq!(code, 1);
    }

    #[test]
    fn mapping_helpers_keep_error_kinds() {
        assert_eq!(
            map_terminal_io(std::io::Error::other("tty")).kind,
            ErrorKind::Terminal
        );
        let error = map_output_write(Path::new("out.json"), std::io::Error::other("disk"));
        assert_eq!(error.kind, ErrorKind::Io);
        assert!(error.message.contains("out.json"));
        assert_eq!(
            map_log_file(Path::new("player.log"), std::io::Error::other("perm")).kind,
            ErrorKind::Io
        );
    }
}
