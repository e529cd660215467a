use std::collections::VecDeque;
use std::time::{Duration, Instant};

use qd_core::{DramaError, RenderOp, TextStyle};
use qd_runtime::{AdvanceFlag, Interpreter, PlaybackStatus};

const MAX_TRANSCRIPT_LINES: usize = 2_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StyledChunk {
    pub(crate) text: String,
    pub(crate) style: TextStyle,
}

#[derive(Debug, Clone)]
pub(crate) struct TypingJob {
    pub(crate) text: String,
    pub(crate) style: TextStyle,
    pub(crate) shown_chars: usize,
    delay: Duration,
    /// `None` once the delay no longer fits an `Instant`; only a fast-forward finishes it.
    next_at: Option<Instant>,
}

impl TypingJob {
    fn total_chars(&self) -> usize {
        self.text.chars().count()
    }

    pub(crate) fn visible_text(&self) -> String {
        self.text.chars().take(self.shown_chars).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SleepDeadline {
    At(Instant),
    /// Longer than `Instant` can represent; only quitting ends it.
    Never,
}

/// Screen model of the full-screen player. Render ops are queued and revealed on
/// `tick`, one typed character per elapsed delay.
#[derive(Debug, Default)]
pub(crate) struct TuiUiState {
    /// Finished output; the last line is the one still being written.
    pub(crate) lines: Vec<Vec<StyledChunk>>,
    pub(crate) pending: VecDeque<RenderOp>,
    pub(crate) typing: Option<TypingJob>,
    pub(crate) sleep_until: Option<SleepDeadline>,
    pub(crate) awaiting: bool,
    pub(crate) end_message: Option<String>,
    pub(crate) finished: bool,
    pub(crate) help_visible: bool,
    pub(crate) status: String,
}

impl TuiUiState {
    pub(crate) fn new() -> Self {
        Self {
            lines: vec![Vec::new()],
            status: "ready".to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn typing_in_progress(&self) -> bool {
        self.typing.is_some()
    }

    /// Drives output forward to `now`: reveals due characters, expires sleeps, applies
    /// queued ops and, once the reader has asked for it, advances the interpreter.
    pub(crate) fn tick(
        &mut self,
        now: Instant,
        interpreter: &mut Interpreter,
        flag: &AdvanceFlag,
    ) -> Result<(), DramaError> {
        loop {
            if !self.reveal_due(now) {
                return Ok(());
            }
            match self.sleep_until {
                Some(SleepDeadline::At(until)) if now < until => return Ok(()),
                Some(SleepDeadline::Never) => return Ok(()),
                Some(SleepDeadline::At(_)) => self.sleep_until = None,
                None => {}
            }
            if let Some(op) = self.pending.pop_front() {
                self.apply(op, now);
                continue;
            }
            if self.end_message.is_some() || interpreter.status().is_terminal() {
                if !self.finished {
                    self.finished = true;
                    self.status = "finished".to_string();
                }
                return Ok(());
            }
            if interpreter.status() == PlaybackStatus::AwaitingAdvance {
                if !flag.take() {
                    return Ok(());
                }
                self.awaiting = false;
                interpreter.advance()?;
            }

            let output = interpreter.step();
            self.status = format!("{}/{}", interpreter.cursor(), interpreter.len());
            if output.ops.is_empty() && !output.status.is_terminal() {
                return Ok(());
            }
            self.pending.extend(output.ops);
        }
    }

    /// Shows the rest of the line being typed at once. Returns whether anything was typing.
    pub(crate) fn fast_forward(&mut self) -> bool {
        match self.typing.take() {
            Some(job) => {
                self.append_text(&job.text, job.style);
                true
            }
            None => false,
        }
    }

    /// Transcript including the partially typed chunk.
    pub(crate) fn visible_lines(&self) -> Vec<Vec<StyledChunk>> {
        let mut lines = self.lines.clone();
        if let Some(job) = &self.typing {
            append_to(&mut lines, &job.visible_text(), job.style);
        }
        lines
    }

    /// `false` while a typed line still has characters to wait for.
    fn reveal_due(&mut self, now: Instant) -> bool {
        let Some(job) = self.typing.as_mut() else {
            return true;
        };
        while job.shown_chars < job.total_chars() {
            match job.next_at {
                Some(at) if now >= at => {
                    job.shown_chars += 1;
                    job.next_at = at.checked_add(job.delay);
                }
                _ => return false,
            }
        }
        if let Some(job) = self.typing.take() {
            self.append_text(&job.text, job.style);
        }
        true
    }

    fn apply(&mut self, op: RenderOp, now: Instant) {
        match op {
            RenderOp::Type { text, style, delay } => {
                if delay.is_zero() || text.is_empty() {
                    self.append_text(&text, style);
                } else {
                    self.typing = Some(TypingJob {
                        text,
                        style,
                        shown_chars: 0,
                        delay,
                        next_at: Some(now),
                    });
                }
            }
            RenderOp::BlankLines(count) => {
                for _ in 0..count {
                    self.new_line();
                }
            }
            RenderOp::LineBreak => self.new_line(),
            RenderOp::Prompt => self.awaiting = true,
            RenderOp::Sleep(duration) => {
                self.sleep_until = Some(
                    now.checked_add(duration)
                        .map_or(SleepDeadline::Never, SleepDeadline::At),
                );
            }
            RenderOp::EndMessage(text) => {
                self.new_line();
                self.end_message = Some(text);
            }
        }
    }

    fn append_text(&mut self, text: &str, style: TextStyle) {
        append_to(&mut self.lines, text, style);
        self.trim_transcript();
    }

    fn new_line(&mut self) {
        self.lines.push(Vec::new());
        self.trim_transcript();
    }

    fn trim_transcript(&mut self) {
        if self.lines.len() > MAX_TRANSCRIPT_LINES {
            let excess = self.lines.len() - MAX_TRANSCRIPT_LINES;
            self.lines.drain(..excess);
        }
    }
}

fn append_to(lines: &mut Vec<Vec<StyledChunk>>, text: &str, style: TextStyle) {
    for (index, part) in text.split('\n').enumerate() {
        if index > 0 || lines.is_empty() {
            lines.push(Vec::new());
        }
        if part.is_empty() {
            continue;
        }
        if let Some(line) = lines.last_mut() {
            match line.last_mut() {
                Some(chunk) if chunk.style == style => chunk.text.push_str(part),
                _ => line.push(StyledChunk {
                    text: part.to_string(),
                    style,
                }),
            }
        }
    }
}
