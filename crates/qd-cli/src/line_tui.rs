use std::io::{self, BufRead, IsTerminal, Write};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::queue;
use crossterm::style::{
    Attribute, Color as TermColor, Print, ResetColor, SetAttribute, SetBackgroundColor,
    SetForegroundColor,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use qd_api::LoadedProject;
use qd_core::{Color, DramaError, Style, TextStyle};
use qd_runtime::{
    run_blocking, AutoAdvance, DriverOptions, InputEvent, InputSource, PlaybackStatus, Presenter,
};

use crate::map_terminal_io;

pub(crate) const CONTINUE_PROMPT: &str = " ·";

/// Writes render ops to a terminal stream, with ANSI colours when `colored`.
pub(crate) struct TerminalPresenter<W: Write> {
    writer: W,
    colored: bool,
    show_prompt: bool,
}

impl<W: Write> TerminalPresenter<W> {
    pub(crate) fn styled(writer: W) -> Self {
        Self {
            writer,
            colored: true,
            show_prompt: true,
        }
    }

    /// Text only: no colour codes and no continue marker.
    pub(crate) fn plain(writer: W) -> Self {
        Self {
            writer,
            colored: false,
            show_prompt: false,
        }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.writer
    }

    fn write_styled(&mut self, text: &str, style: TextStyle) -> io::Result<()> {
        if !self.colored {
            return self.writer.write_all(text.as_bytes());
        }
        queue!(
            self.writer,
            SetForegroundColor(term_color(style.foreground)),
            SetBackgroundColor(term_color(style.background)),
            SetAttribute(term_attribute(style.style)),
            Print(text),
            SetAttribute(Attribute::Reset),
            ResetColor
        )
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn type_text(&mut self, text: &str, style: TextStyle) -> Result<(), DramaError> {
        self.write_styled(text, style).map_err(map_terminal_io)?;
        self.writer.flush().map_err(map_terminal_io)
    }

    fn line_break(&mut self) -> Result<(), DramaError> {
        writeln!(self.writer).map_err(map_terminal_io)
    }

    fn blank_lines(&mut self, count: u32) -> Result<(), DramaError> {
        for _ in 0..count {
            writeln!(self.writer).map_err(map_terminal_io)?;
        }
        Ok(())
    }

    fn prompt(&mut self) -> Result<(), DramaError> {
        if self.show_prompt {
            if self.colored {
                queue!(
                    self.writer,
                    SetAttribute(Attribute::Dim),
                    Print(CONTINUE_PROMPT),
                    SetAttribute(Attribute::Reset)
                )
                .map_err(map_terminal_io)?;
            } else {
                write!(self.writer, "{}", CONTINUE_PROMPT).map_err(map_terminal_io)?;
            }
        }
        self.writer.flush().map_err(map_terminal_io)
    }

    fn end_message(&mut self, text: &str) -> Result<(), DramaError> {
        writeln!(self.writer).map_err(map_terminal_io)?;
        writeln!(self.writer, "{}", text).map_err(map_terminal_io)?;
        self.writer.flush().map_err(map_terminal_io)
    }
}

pub(crate) fn term_color(color: Color) -> TermColor {
    match color {
        Color::Black => TermColor::Black,
        Color::Blue => TermColor::DarkBlue,
        Color::Cyan => TermColor::DarkCyan,
        Color::Green => TermColor::DarkGreen,
        Color::Magenta => TermColor::DarkMagenta,
        Color::Red => TermColor::DarkRed,
        Color::White => TermColor::Grey,
        Color::Yellow => TermColor::DarkYellow,
        Color::LightBlack => TermColor::DarkGrey,
        Color::LightBlue => TermColor::Blue,
        Color::LightCyan => TermColor::Cyan,
        Color::LightGreen => TermColor::Green,
        Color::LightMagenta => TermColor::Magenta,
        Color::LightRed => TermColor::Red,
        Color::LightWhite => TermColor::White,
        Color::LightYellow => TermColor::Yellow,
        Color::Rgb(r, g, b) => TermColor::Rgb { r, g, b },
    }
}

fn term_attribute(style: Style) -> Attribute {
    match style {
        Style::Normal => Attribute::NormalIntensity,
        Style::Bright => Attribute::Bold,
        Style::Dim => Attribute::Dim,
    }
}

pub(crate) fn map_key(key: KeyEvent) -> InputEvent {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return InputEvent::Quit;
    }
    match key.code {
        KeyCode::Char(' ') | KeyCode::Enter => InputEvent::Advance,
        KeyCode::Esc | KeyCode::Char('q') => InputEvent::Quit,
        _ => InputEvent::Other,
    }
}

/// Raw mode for the lifetime of the guard.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self, DramaError> {
        enable_raw_mode().map_err(map_terminal_io)?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Single-key input from an interactive terminal. Raw mode is held only while waiting.
pub(crate) struct KeyboardInput;

impl InputSource for KeyboardInput {
    fn next_event(&mut self, timeout: Option<Duration>) -> Result<Option<InputEvent>, DramaError> {
        let _raw = RawModeGuard::enable()?;
        if let Some(timeout) = timeout {
            if !event::poll(timeout).map_err(map_terminal_io)? {
                return Ok(None);
            }
        }
        match event::read().map_err(map_terminal_io)? {
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(map_key(key))),
            _ => Ok(None),
        }
    }
}

/// Line-based input for piped stdin: a line advances, `q` or end of input quits.
pub(crate) struct LineInput<R: BufRead> {
    reader: R,
}

impl<R: BufRead> LineInput<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> InputSource for LineInput<R> {
    fn next_event(&mut self, timeout: Option<Duration>) -> Result<Option<InputEvent>, DramaError> {
        if let Some(timeout) = timeout {
            std::thread::sleep(timeout);
            return Ok(None);
        }
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).map_err(map_terminal_io)?;
        if read == 0 {
            return Ok(Some(InputEvent::Quit));
        }
        match line.trim() {
            "q" | ":quit" => Ok(Some(InputEvent::Quit)),
            _ => Ok(Some(InputEvent::Advance)),
        }
    }
}

pub(crate) fn run_line_mode(project: &LoadedProject) -> Result<PlaybackStatus, DramaError> {
    let mut interpreter = project.create_interpreter();
    let stdout = io::stdout();
    if io::stdin().is_terminal() {
        let mut presenter = if stdout.is_terminal() {
            TerminalPresenter::styled(stdout.lock())
        } else {
            TerminalPresenter::plain(stdout.lock())
        };
        run_blocking(
            &mut interpreter,
            &mut presenter,
            &mut KeyboardInput,
            DriverOptions::default(),
        )
    } else {
        let mut presenter = TerminalPresenter::plain(stdout.lock());
        let mut input = LineInput::new(io::stdin().lock());
        run_blocking(
            &mut interpreter,
            &mut presenter,
            &mut input,
            DriverOptions::default(),
        )
    }
}

/// Headless playback: plain text on stdout, every wait answered at once.
pub(crate) fn run_auto_mode(
    project: &LoadedProject,
    writer: &mut dyn Write,
) -> Result<PlaybackStatus, DramaError> {
    let mut interpreter = project.create_interpreter();
    let mut presenter = TerminalPresenter::plain(writer);
    let status = run_blocking(
        &mut interpreter,
        &mut presenter,
        &mut AutoAdvance,
        DriverOptions { skip_pauses: true },
    )?;
    tracing::info!(cursor = interpreter.cursor(), units = interpreter.len(), ?status, "auto playback finished");
    Ok(status)
}
