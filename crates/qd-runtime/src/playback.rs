//! Drivers that carry render ops to a presenter and reader input back to the interpreter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use qd_core::{DramaError, RenderOp, TextStyle};

use crate::engine::{Interpreter, PlaybackStatus};

/// Output side of a player.
pub trait Presenter {
    fn type_text(&mut self, text: &str, style: TextStyle) -> Result<(), DramaError>;
    fn line_break(&mut self) -> Result<(), DramaError>;
    fn blank_lines(&mut self, count: u32) -> Result<(), DramaError>;
    fn prompt(&mut self) -> Result<(), DramaError>;
    fn end_message(&mut self, text: &str) -> Result<(), DramaError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Advance,
    Quit,
    Other,
}

/// Input side of a player.
pub trait InputSource {
    /// Waits up to `timeout` (forever when `None`) for the next event; `None` on timeout.
    fn next_event(&mut self, timeout: Option<Duration>) -> Result<Option<InputEvent>, DramaError>;
}

/// Input that advances every time it is asked. Used for headless playback.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoAdvance;

impl InputSource for AutoAdvance {
    fn next_event(&mut self, timeout: Option<Duration>) -> Result<Option<InputEvent>, DramaError> {
        match timeout {
            None => Ok(Some(InputEvent::Advance)),
            Some(timeout) => {
                std::thread::sleep(timeout);
                Ok(None)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverOptions {
    /// Type whole lines at once and skip `sleep` pauses.
    pub skip_pauses: bool,
}

enum Pause {
    Elapsed,
    Advance,
    Quit,
}

/// Plays the interpreter to the end on the calling thread. Quit is honoured while
/// typing, while sleeping and while waiting for the reader.
pub fn run_blocking(
    interpreter: &mut Interpreter,
    presenter: &mut dyn Presenter,
    input: &mut dyn InputSource,
    options: DriverOptions,
) -> Result<PlaybackStatus, DramaError> {
    loop {
        let output = interpreter.step();
        for op in output.ops {
            if !perform(op, interpreter, presenter, input, options)? {
                interpreter.quit();
                return Ok(interpreter.status());
            }
        }

        match interpreter.status() {
            PlaybackStatus::AwaitingAdvance => match wait_for_reader(input)? {
                InputEvent::Advance => interpreter.advance()?,
                _ => {
                    interpreter.quit();
                    return Ok(interpreter.status());
                }
            },
            PlaybackStatus::Complete | PlaybackStatus::Terminated => {
                return Ok(interpreter.status())
            }
            PlaybackStatus::Ready | PlaybackStatus::Running => {}
        }
    }
}

/// Performs one op. Returns `false` when the reader quit during it.
fn perform(
    op: RenderOp,
    interpreter: &Interpreter,
    presenter: &mut dyn Presenter,
    input: &mut dyn InputSource,
    options: DriverOptions,
) -> Result<bool, DramaError> {
    match op {
        RenderOp::Type { text, style, delay } => {
            if options.skip_pauses || delay.is_zero() {
                presenter.type_text(&text, style)?;
                return Ok(true);
            }
            let mut buffer = [0u8; 4];
            for (index, ch) in text.char_indices() {
                presenter.type_text(ch.encode_utf8(&mut buffer), style)?;
                match pause(input, delay)? {
                    Pause::Elapsed => {}
                    Pause::Advance => {
                        let rest = &text[index + ch.len_utf8()..];
                        if !rest.is_empty() {
                            presenter.type_text(rest, style)?;
                        }
                        break;
                    }
                    Pause::Quit => return Ok(false),
                }
            }
        }
        RenderOp::BlankLines(count) => presenter.blank_lines(count)?,
        RenderOp::LineBreak => presenter.line_break()?,
        RenderOp::Prompt => presenter.prompt()?,
        RenderOp::Sleep(duration) => {
            if !options.skip_pauses {
                let deadline = Instant::now().checked_add(duration);
                loop {
                    match pause_until(input, deadline)? {
                        Pause::Elapsed => break,
                        Pause::Quit => return Ok(false),
                        Pause::Advance => {}
                    }
                }
            }
        }
        RenderOp::EndMessage(text) => {
            presenter.end_message(&text)?;
            tracing::debug!(cursor = interpreter.cursor(), "waiting for final key");
            while input.next_event(None)?.is_none() {}
        }
    }
    Ok(true)
}

fn pause(input: &mut dyn InputSource, duration: Duration) -> Result<Pause, DramaError> {
    pause_until(input, Instant::now().checked_add(duration))
}

/// A `None` deadline lies beyond what `Instant` can represent: wait on input alone.
fn pause_until(
    input: &mut dyn InputSource,
    deadline: Option<Instant>,
) -> Result<Pause, DramaError> {
    loop {
        let timeout = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(Pause::Elapsed);
                }
                Some(deadline - now)
            }
            None => None,
        };
        match input.next_event(timeout)? {
            Some(InputEvent::Quit) => return Ok(Pause::Quit),
            Some(InputEvent::Advance) => return Ok(Pause::Advance),
            Some(InputEvent::Other) | None => {}
        }
    }
}

fn wait_for_reader(input: &mut dyn InputSource) -> Result<InputEvent, DramaError> {
    loop {
        match input.next_event(None)? {
            Some(InputEvent::Advance) => return Ok(InputEvent::Advance),
            Some(InputEvent::Quit) => return Ok(InputEvent::Quit),
            Some(InputEvent::Other) | None => {}
        }
    }
}

/// Advance request shared between an event handler and a ticking UI loop.
#[derive(Debug, Clone, Default)]
pub struct AdvanceFlag(Arc<AtomicBool>);

impl AdvanceFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears the request and reports whether there was one.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}
