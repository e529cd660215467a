use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    NotADirectory,
    CorruptContainer,
    Encoding,
    InvalidManifest,
    InvalidScript,
    Io,
    Terminal,
    MalformedLine,
    InvalidArgument,
    InvalidColor,
    UnknownRole,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::NotADirectory => "NOT_A_DIRECTORY",
            Self::CorruptContainer => "CORRUPT_CONTAINER",
            Self::Encoding => "ENCODING",
            Self::InvalidManifest => "INVALID_MANIFEST",
            Self::InvalidScript => "INVALID_SCRIPT",
            Self::Io => "IO",
            Self::Terminal => "TERMINAL",
            Self::MalformedLine => "MALFORMED_LINE",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidColor => "INVALID_COLOR",
            Self::UnknownRole => "UNKNOWN_ROLE",
        }
    }

    /// Recoverable kinds are logged and playback goes on; everything else is fatal.
    pub fn is_recoverable(self) -> bool {
        matches!(
            self,
            Self::MalformedLine | Self::InvalidArgument | Self::InvalidColor | Self::UnknownRole
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{}: {message}", .kind.code())]
pub struct DramaError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: Option<usize>,
}

impl DramaError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: None,
        }
    }

    pub fn with_line(kind: ErrorKind, message: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            line: Some(line),
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn is_recoverable(&self) -> bool {
        self.kind.is_recoverable()
    }
}
