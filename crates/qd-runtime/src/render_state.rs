use std::time::Duration;

use qd_core::{Color, ColorScope, DefaultStyle, DramaError, ErrorKind, Style, TextStyle};

pub const DEFAULT_TYPING_DELAY: f64 = 0.1;

/// Initial render state for a playback session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderDefaults {
    pub foreground: Color,
    pub background: Color,
    pub style: Style,
    pub typing_delay: f64,
    pub extra_blank_lines: u32,
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            foreground: Color::White,
            background: Color::Black,
            style: Style::Normal,
            typing_delay: DEFAULT_TYPING_DELAY,
            extra_blank_lines: 0,
        }
    }
}

impl RenderDefaults {
    /// Layers a manifest `default-style` block over these defaults.
    pub fn with_default_style(mut self, style: &DefaultStyle) -> Result<Self, DramaError> {
        if let Some(foreground) = &style.foreground {
            self.foreground = Color::parse(foreground).map_err(manifest_error)?;
        }
        if let Some(background) = &style.background {
            self.background = Color::parse(background).map_err(manifest_error)?;
        }
        if let Some(name) = &style.style {
            self.style = Style::from_name(name).ok_or_else(|| {
                DramaError::new(
                    ErrorKind::InvalidManifest,
                    format!("Unknown default style \"{}\".", name),
                )
            })?;
        }
        if let Some(delay) = style.delay {
            self = self.with_typing_delay(delay)?;
        }
        if let Some(blank_lines) = style.blank_lines {
            self.extra_blank_lines = blank_lines;
        }
        Ok(self)
    }

    pub fn with_typing_delay(mut self, seconds: f64) -> Result<Self, DramaError> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(DramaError::new(
                ErrorKind::InvalidArgument,
                format!("Typing delay must be a non-negative number, got {}.", seconds),
            ));
        }
        self.typing_delay = seconds;
        Ok(self)
    }
}

fn manifest_error(error: DramaError) -> DramaError {
    DramaError::new(ErrorKind::InvalidManifest, error.message)
}

/// Partial update: only the `Some` fields are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderDelta {
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    pub style: Option<Style>,
    pub typing_delay: Option<f64>,
    pub extra_blank_lines: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    pub foreground: Color,
    pub background: Color,
    pub style: Style,
    pub typing_delay: f64,
    pub extra_blank_lines: u32,
    defaults: RenderDefaults,
}

impl RenderState {
    pub fn new(defaults: RenderDefaults) -> Self {
        Self {
            foreground: defaults.foreground,
            background: defaults.background,
            style: defaults.style,
            typing_delay: defaults.typing_delay,
            extra_blank_lines: defaults.extra_blank_lines,
            defaults,
        }
    }

    pub fn defaults(&self) -> &RenderDefaults {
        &self.defaults
    }

    pub fn apply(&mut self, delta: RenderDelta) -> &Self {
        if let Some(foreground) = delta.foreground {
            self.foreground = foreground;
        }
        if let Some(background) = delta.background {
            self.background = background;
        }
        if let Some(style) = delta.style {
            self.style = style;
        }
        if let Some(typing_delay) = delta.typing_delay {
            self.typing_delay = typing_delay;
        }
        if let Some(extra_blank_lines) = delta.extra_blank_lines {
            self.extra_blank_lines = extra_blank_lines;
        }
        self
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.defaults);
    }

    pub fn reset_colors(&mut self) {
        self.foreground = self.defaults.foreground;
        self.background = self.defaults.background;
        self.style = self.defaults.style;
    }

    pub fn reset_field(&mut self, scope: ColorScope) {
        match scope {
            ColorScope::Fore => self.foreground = self.defaults.foreground,
            ColorScope::Back => self.background = self.defaults.background,
            ColorScope::Style => self.style = self.defaults.style,
        }
    }

    pub fn overlaid(&self, delta: RenderDelta) -> Self {
        let mut copy = *self;
        copy.apply(delta);
        copy
    }

    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            foreground: self.foreground,
            background: self.background,
            style: self.style,
        }
    }

    pub fn char_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.typing_delay).unwrap_or(Duration::MAX)
    }
}

impl Default for RenderState {
    fn default() -> Self {
        Self::new(RenderDefaults::default())
    }
}

#[cfg(test)]
mod render_state_tests {
    use super::*;

    #[test]
    fn apply_merges_only_present_fields() {
        let mut state = RenderState::default();
        state.apply(RenderDelta {
            foreground: Some(Color::Red),
            typing_delay: Some(0.05),
            ..RenderDelta::default()
        });
        assert_eq!(state.foreground, Color::Red);
        assert_eq!(state.background, Color::Black);
        assert_eq!(state.typing_delay, 0.05);
        assert_eq!(state.style, Style::Normal);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut state = RenderState::default();
        state.apply(RenderDelta {
            foreground: Some(Color::Cyan),
            background: Some(Color::Blue),
            style: Some(Style::Dim),
            typing_delay: Some(1.0),
            extra_blank_lines: Some(3),
        });
        state.reset();
        let once = state;
        state.reset();
        assert_eq!(state, once);
        assert_eq!(state, RenderState::default());
    }

    #[test]
    fn colour_resets_leave_delay_alone() {
        let mut state = RenderState::default();
        state.apply(RenderDelta {
            foreground: Some(Color::Green),
            style: Some(Style::Bright),
            typing_delay: Some(0.3),
            ..RenderDelta::default()
        });
        state.reset_field(ColorScope::Style);
        assert_eq!(state.style, Style::Normal);
        assert_eq!(state.foreground, Color::Green);
        state.reset_colors();
        assert_eq!(state.foreground, Color::White);
        assert_eq!(state.typing_delay, 0.3);
    }

    #[test]
    fn overlay_does_not_mutate() {
        let state = RenderState::default();
        let overlay = state.overlaid(RenderDelta {
            foreground: Some(Color::LightBlue),
            ..RenderDelta::default()
        });
        assert_eq!(overlay.foreground, Color::LightBlue);
        assert_eq!(state.foreground, Color::White);
    }

    #[test]
    fn manifest_default_style_layers_over_builtins() {
        let style = DefaultStyle {
            foreground: Some("#000000".to_string()),
            background: Some("lightwhite".to_string()),
            style: Some("dim".to_string()),
            delay: Some(0.02),
            blank_lines: Some(1),
            ..DefaultStyle::default()
        };
        let defaults = RenderDefaults::default()
            .with_default_style(&style)
            .expect("valid default style");
        assert_eq!(defaults.foreground, Color::Rgb(0, 0, 0));
        assert_eq!(defaults.background, Color::LightWhite);
        assert_eq!(defaults.style, Style::Dim);
        assert_eq!(defaults.typing_delay, 0.02);
        assert_eq!(defaults.extra_blank_lines, 1);

        let broken = DefaultStyle {
            foreground: Some("ultraviolet".to_string()),
            ..DefaultStyle::default()
        };
        let error = RenderDefaults::default()
            .with_default_style(&broken)
            .expect_err("unknown colour");
        assert_eq!(error.kind, ErrorKind::InvalidManifest);
    }

    #[test]
    fn negative_delay_is_rejected() {
        assert!(RenderDefaults::default().with_typing_delay(-1.0).is_err());
        assert!(RenderDefaults::default().with_typing_delay(f64::NAN).is_err());
    }
}
