use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DramaError, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Color {
    Black,
    Blue,
    Cyan,
    Green,
    Magenta,
    Red,
    White,
    Yellow,
    LightBlack,
    LightBlue,
    LightCyan,
    LightGreen,
    LightMagenta,
    LightRed,
    LightWhite,
    LightYellow,
    Rgb(u8, u8, u8),
}

const NAMED_COLORS: &[(&str, &str, Color)] = &[
    ("black", "bk", Color::Black),
    ("blue", "bl", Color::Blue),
    ("cyan", "cy", Color::Cyan),
    ("green", "gr", Color::Green),
    ("magenta", "mg", Color::Magenta),
    ("red", "rd", Color::Red),
    ("white", "wt", Color::White),
    ("yellow", "yl", Color::Yellow),
    ("lightblack", "lbk", Color::LightBlack),
    ("lightblue", "lbl", Color::LightBlue),
    ("lightcyan", "lcy", Color::LightCyan),
    ("lightgreen", "lgr", Color::LightGreen),
    ("lightmagenta", "lmg", Color::LightMagenta),
    ("lightred", "lrd", Color::LightRed),
    ("lightwhite", "lwt", Color::LightWhite),
    ("lightyellow", "lyl", Color::LightYellow),
];

impl Color {
    /// Looks a token up in the closed directive palette (full name or abbreviation).
    pub fn from_palette(token: &str) -> Option<Self> {
        NAMED_COLORS
            .iter()
            .find(|(name, short, _)| *name == token || *short == token)
            .map(|(_, _, color)| *color)
    }

    /// Parses a role or manifest colour: palette names, `#rgb`, `#rrggbb` or `rgb(r, g, b)`.
    pub fn parse(spec: &str) -> Result<Self, DramaError> {
        let spec = spec.trim();
        if let Some(color) = Self::from_palette(&spec.to_ascii_lowercase()) {
            return Ok(color);
        }

        if let Some(caps) = hex_regex().captures(spec) {
            let digits = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let expanded = if digits.len() == 3 {
                digits.chars().flat_map(|ch| [ch, ch]).collect::<String>()
            } else {
                digits.to_string()
            };
            let channel = |index: usize| u8::from_str_radix(&expanded[index..index + 2], 16);
            if let (Ok(r), Ok(g), Ok(b)) = (channel(0), channel(2), channel(4)) {
                return Ok(Self::Rgb(r, g, b));
            }
        }

        if let Some(caps) = rgb_regex().captures(spec) {
            let channel = |index: usize| {
                caps.get(index)
                    .and_then(|m| m.as_str().parse::<u8>().ok())
            };
            if let (Some(r), Some(g), Some(b)) = (channel(1), channel(2), channel(3)) {
                return Ok(Self::Rgb(r, g, b));
            }
        }

        Err(DramaError::new(
            ErrorKind::InvalidColor,
            format!("Unknown color \"{}\".", spec),
        ))
    }

    pub fn name(&self) -> String {
        match self {
            Self::Rgb(r, g, b) => format!("#{:02x}{:02x}{:02x}", r, g, b),
            named => NAMED_COLORS
                .iter()
                .find(|(_, _, color)| color == named)
                .map(|(name, _, _)| (*name).to_string())
                .unwrap_or_default(),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl TryFrom<String> for Color {
    type Error = DramaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.name()
    }
}

fn hex_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$").expect("hex color regex")
    })
}

fn rgb_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^rgb\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*\)$")
            .expect("rgb color regex")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    #[default]
    Normal,
    Bright,
    Dim,
}

impl Style {
    pub fn from_name(token: &str) -> Option<Self> {
        match token {
            "normal" | "nm" => Some(Self::Normal),
            "bright" | "br" => Some(Self::Bright),
            "dim" | "dm" => Some(Self::Dim),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Bright => "bright",
            Self::Dim => "dim",
        }
    }
}

/// Which render-state colour field a `color` directive addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorScope {
    Fore,
    Back,
    Style,
}

impl ColorScope {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "fore" => Some(Self::Fore),
            "back" => Some(Self::Back),
            "style" => Some(Self::Style),
            _ => None,
        }
    }
}

/// Colour snapshot attached to every typed chunk of output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextStyle {
    pub foreground: Color,
    pub background: Color,
    pub style: Style,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_names_and_abbreviations_map_to_their_own_color() {
        assert_eq!(Color::from_palette("red"), Some(Color::Red));
        assert_eq!(Color::from_palette("rd"), Some(Color::Red));
        assert_eq!(Color::from_palette("green"), Some(Color::Green));
        assert_eq!(Color::from_palette("lyl"), Some(Color::LightYellow));
        assert_eq!(Color::from_palette("teal"), None);
        assert_ne!(Color::from_palette("red"), Color::from_palette("green"));
    }

    #[test]
    fn parse_accepts_hex_and_rgb_specs() {
        assert_eq!(Color::parse("#ff8000").unwrap(), Color::Rgb(255, 128, 0));
        assert_eq!(Color::parse("#fff").unwrap(), Color::Rgb(255, 255, 255));
        assert_eq!(
            Color::parse("rgb(1, 2,3)").unwrap(),
            Color::Rgb(1, 2, 3)
        );
        assert_eq!(Color::parse("Blue").unwrap(), Color::Blue);

        let error = Color::parse("rgb(300, 0, 0)").unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidColor);
        assert!(Color::parse("#12345").is_err());
    }

    #[test]
    fn color_serializes_as_its_name() {
        let json = serde_json::to_string(&Color::LightRed).unwrap();
        assert_eq!(json, "\"lightred\"");
        let back: Color = serde_json::from_str("\"#0a0b0c\"").unwrap();
        assert_eq!(back, Color::Rgb(10, 11, 12));
        assert!(serde_json::from_str::<Color>("\"nope\"").is_err());
    }

    #[test]
    fn style_names_cover_all_variants() {
        assert_eq!(Style::from_name("br"), Some(Style::Bright));
        assert_eq!(Style::from_name("dim"), Some(Style::Dim));
        assert_eq!(Style::from_name("normal"), Some(Style::Normal));
        assert_eq!(Style::from_name("bold"), None);
        assert_eq!(ColorScope::from_token("back"), Some(ColorScope::Back));
        assert_eq!(ColorScope::from_token("side"), None);
    }
}
