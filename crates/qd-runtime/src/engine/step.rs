use std::collections::BTreeMap;

use qd_core::{
    parse_seconds, Color, ColorChange, Directive, DirectiveKind, DramaError, ErrorKind, LineUnit,
    Style,
};

use super::*;
use crate::render_state::RenderDelta;

/// What the dispatch of one unit asks of the step loop.
enum Flow {
    Next,
    Await,
    End,
}

impl Interpreter {
    /// Runs units until the next boundary and returns the render ops produced on the way.
    pub fn step(&mut self) -> StepOutput {
        match self.status {
            PlaybackStatus::AwaitingAdvance | PlaybackStatus::Complete | PlaybackStatus::Terminated => {
                return StepOutput {
                    ops: Vec::new(),
                    status: self.status,
                };
            }
            PlaybackStatus::Ready | PlaybackStatus::Running => {}
        }

        self.status = PlaybackStatus::Running;
        let mut ops = Vec::new();
        if std::mem::take(&mut self.pending_line_break) {
            ops.push(RenderOp::LineBreak);
        }

        let script = Arc::clone(&self.script);
        loop {
            let Some(unit) = script.get(self.cursor) else {
                tracing::info!(units = script.len(), "playback complete");
                self.status = PlaybackStatus::Complete;
                break;
            };

            tracing::debug!(cursor = self.cursor, kind = unit.kind_name(), "dispatch");
            match self.dispatch(unit, &mut ops) {
                Flow::Next => self.bump_cursor(),
                Flow::Await => {
                    ops.push(RenderOp::Prompt);
                    self.status = PlaybackStatus::AwaitingAdvance;
                    break;
                }
                Flow::End => {
                    ops.push(RenderOp::EndMessage(END_MESSAGE.to_string()));
                    self.bump_cursor();
                    self.status = PlaybackStatus::Terminated;
                    break;
                }
            }
        }

        StepOutput {
            ops,
            status: self.status,
        }
    }

    fn dispatch(&mut self, unit: &LineUnit, ops: &mut Vec<RenderOp>) -> Flow {
        match unit {
            LineUnit::Text { content, continues } => {
                let state = self.state;
                type_line(content.clone(), &state, state.extra_blank_lines, ops);
                wait_unless(*continues)
            }
            LineUnit::Speech {
                role,
                content,
                continues,
            } => {
                let (prefix, state) = self.speaker(role, &self.state);
                let extra = state.extra_blank_lines;
                type_line(format!("{}: {}", prefix, content), &state, extra, ops);
                wait_unless(*continues)
            }
            LineUnit::Directive(directive) => self.run_directive(directive, ops),
            LineUnit::Record { fields } => self.run_record(fields, ops),
        }
    }

    fn run_directive(&mut self, directive: &Directive, ops: &mut Vec<RenderOp>) -> Flow {
        let kind = match DirectiveKind::parse(directive) {
            Ok(kind) => kind,
            Err(error) => {
                report(&error);
                return Flow::Next;
            }
        };

        match kind {
            DirectiveKind::Delay(seconds) => {
                self.state.apply(RenderDelta {
                    typing_delay: Some(seconds),
                    ..RenderDelta::default()
                });
                Flow::Next
            }
            DirectiveKind::Color(change) => {
                match change {
                    ColorChange::Foreground(color) => {
                        self.state.apply(RenderDelta {
                            foreground: Some(color),
                            ..RenderDelta::default()
                        });
                    }
                    ColorChange::Background(color) => {
                        self.state.apply(RenderDelta {
                            background: Some(color),
                            ..RenderDelta::default()
                        });
                    }
                    ColorChange::Style(style) => {
                        self.state.apply(RenderDelta {
                            style: Some(style),
                            ..RenderDelta::default()
                        });
                    }
                    ColorChange::Reset(scope) => self.state.reset_field(scope),
                    ColorChange::ResetAll => self.state.reset_colors(),
                }
                Flow::Next
            }
            DirectiveKind::Sleep(duration) => {
                ops.push(RenderOp::Sleep(duration));
                Flow::Next
            }
            DirectiveKind::End => Flow::End,
            DirectiveKind::Link(url) => {
                let state = self.state.overlaid(RenderDelta {
                    foreground: Some(Color::LightBlue),
                    ..RenderDelta::default()
                });
                type_line(url, &state, state.extra_blank_lines, ops);
                Flow::Await
            }
            DirectiveKind::Highlight(text) => {
                let state = self.state.overlaid(RenderDelta {
                    style: Some(Style::Bright),
                    ..RenderDelta::default()
                });
                type_line(text, &state, state.extra_blank_lines, ops);
                Flow::Await
            }
            DirectiveKind::Ellipsis => {
                let state = self.state;
                type_line(ELLIPSIS_TEXT.to_string(), &state, 1, ops);
                Flow::Await
            }
        }
    }

    /// A record renders its `text` once with the other fields overlaid for that unit.
    fn run_record(&self, fields: &BTreeMap<String, String>, ops: &mut Vec<RenderOp>) -> Flow {
        let Some(text) = fields.get("text") else {
            report(&DramaError::with_line(
                ErrorKind::MalformedLine,
                "Structured line has no \"text\" field.",
                self.cursor + 1,
            ));
            return Flow::Next;
        };

        let (prefix, base) = match fields.get("role") {
            Some(role) => {
                let (prefix, state) = self.speaker(role, &self.state);
                (Some(prefix), state)
            }
            None => (None, self.state),
        };

        let mut delta = RenderDelta::default();
        for (key, value) in fields {
            let parsed = match key.as_str() {
                "fore" => Color::parse(value).map(|color| delta.foreground = Some(color)),
                "back" => Color::parse(value).map(|color| delta.background = Some(color)),
                "style" => Style::from_name(value)
                    .map(|style| delta.style = Some(style))
                    .ok_or_else(|| {
                        DramaError::new(
                            ErrorKind::InvalidColor,
                            format!("Unknown style \"{}\".", value),
                        )
                    }),
                "delay" => parse_seconds(value).map(|seconds| delta.typing_delay = Some(seconds)),
                "text" | "role" => Ok(()),
                other => {
                    tracing::warn!(field = other, "ignoring unknown record field");
                    Ok(())
                }
            };
            if let Err(error) = parsed {
                report(&error);
            }
        }

        let state = base.overlaid(delta);
        let text = match prefix {
            Some(prefix) => format!("{}: {}", prefix, text),
            None => text.clone(),
        };
        type_line(text, &state, state.extra_blank_lines, ops);
        Flow::Await
    }

    /// Display prefix and render state for a speaker. Unknown roles keep the current
    /// state and show the raw id.
    fn speaker(&self, role: &str, state: &RenderState) -> (String, RenderState) {
        match self.roles.get(role) {
            Some(entry) => {
                let state = state.overlaid(RenderDelta {
                    foreground: entry.color,
                    ..RenderDelta::default()
                });
                (self.roles.display_name(role).to_string(), state)
            }
            None => {
                report(&DramaError::new(
                    ErrorKind::UnknownRole,
                    format!("Unknown role \"{}\".", role),
                ));
                (role.to_string(), *state)
            }
        }
    }
}

fn type_line(text: String, state: &RenderState, extra_blank_lines: u32, ops: &mut Vec<RenderOp>) {
    ops.push(RenderOp::Type {
        text,
        style: state.text_style(),
        delay: state.char_delay(),
    });
    if extra_blank_lines > 0 {
        ops.push(RenderOp::BlankLines(extra_blank_lines));
    }
}

fn wait_unless(continues: bool) -> Flow {
    if continues {
        Flow::Next
    } else {
        Flow::Await
    }
}

fn report(error: &DramaError) {
    match error.line {
        Some(line) => tracing::error!(line, code = error.code(), "{}", error.message),
        None => tracing::error!(code = error.code(), "{}", error.message),
    }
}
