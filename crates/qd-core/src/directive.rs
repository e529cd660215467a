use std::time::Duration;

use crate::error::{DramaError, ErrorKind};
use crate::palette::{Color, ColorScope, Style};
use crate::types::Directive;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorChange {
    Foreground(Color),
    Background(Color),
    Style(Style),
    Reset(ColorScope),
    ResetAll,
}

/// The closed directive grammar, with typed payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveKind {
    Delay(f64),
    Color(ColorChange),
    Sleep(Duration),
    End,
    Link(String),
    Highlight(String),
    Ellipsis,
}

impl DirectiveKind {
    /// Matches the directive tokens against the grammar.
    ///
    /// A token sequence of the wrong shape is `MalformedLine`; a well-shaped directive
    /// whose argument does not parse is `InvalidArgument` or `InvalidColor`.
    pub fn parse(directive: &Directive) -> Result<Self, DramaError> {
        let tokens = directive.tokens();
        match tokens.as_slice() {
            ["delay", value] => parse_seconds(value).map(Self::Delay),
            ["sleep", value] => {
                let seconds = parse_seconds(value)?;
                Duration::try_from_secs_f64(seconds)
                    .map(Self::Sleep)
                    .map_err(|_| invalid_argument(value))
            }
            ["color", "reset"] => Ok(Self::Color(ColorChange::ResetAll)),
            ["color", scope @ ("fore" | "back" | "style"), "reset"] => {
                let scope = ColorScope::from_token(scope).ok_or_else(|| malformed(directive))?;
                Ok(Self::Color(ColorChange::Reset(scope)))
            }
            ["color", "fore", name] => Color::from_palette(name)
                .map(|color| Self::Color(ColorChange::Foreground(color)))
                .ok_or_else(|| invalid_color(name)),
            ["color", "back", name] => Color::from_palette(name)
                .map(|color| Self::Color(ColorChange::Background(color)))
                .ok_or_else(|| invalid_color(name)),
            ["color", "style", name] => Style::from_name(name)
                .map(|style| Self::Color(ColorChange::Style(style)))
                .ok_or_else(|| invalid_color(name)),
            ["color", name] => {
                if let Some(color) = Color::from_palette(name) {
                    Ok(Self::Color(ColorChange::Foreground(color)))
                } else if let Some(style) = Style::from_name(name) {
                    Ok(Self::Color(ColorChange::Style(style)))
                } else {
                    Err(invalid_color(name))
                }
            }
            ["end"] => Ok(Self::End),
            ["link", rest @ ..] if !rest.is_empty() => Ok(Self::Link(rest.join(" "))),
            ["hl", rest @ ..] if !rest.is_empty() => Ok(Self::Highlight(rest.join(" "))),
            ["..."] => Ok(Self::Ellipsis),
            _ => Err(malformed(directive)),
        }
    }
}

pub fn parse_seconds(value: &str) -> Result<f64, DramaError> {
    match value.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => Ok(seconds),
        _ => Err(invalid_argument(value)),
    }
}

fn invalid_argument(value: &str) -> DramaError {
    DramaError::new(
        ErrorKind::InvalidArgument,
        format!("Expected a non-negative number of seconds, got \"{}\".", value),
    )
}

fn invalid_color(name: &str) -> DramaError {
    DramaError::new(
        ErrorKind::InvalidColor,
        format!("Unknown color setting \"{}\".", name),
    )
}

fn malformed(directive: &Directive) -> DramaError {
    DramaError::new(
        ErrorKind::MalformedLine,
        format!("Invalid statement: /{}", directive.tokens().join(" ")),
    )
}
