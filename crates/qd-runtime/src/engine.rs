use std::sync::Arc;

use qd_core::{RenderOp, RoleRegistry, Script};

use crate::render_state::{RenderDefaults, RenderState};

mod boundary;
mod lifecycle;
mod step;


pub const END_MESSAGE: &str = "Playback finished, press any key to exit...";
pub const ELLIPSIS_TEXT: &str = "... ...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Ready,
    Running,
    AwaitingAdvance,
    Complete,
    Terminated,
}

impl PlaybackStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Terminated)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub ops: Vec<RenderOp>,
    pub status: PlaybackStatus,
}

#[derive(Debug, Clone)]
pub struct InterpreterOptions {
    pub script: Arc<Script>,
    pub roles: Arc<RoleRegistry>,
    pub defaults: RenderDefaults,
}

/// Walks a compiled script, one unit at a time, suspending on every line that waits
/// for the reader.
#[derive(Debug)]
pub struct Interpreter {
    script: Arc<Script>,
    roles: Arc<RoleRegistry>,
    state: RenderState,
    cursor: usize,
    status: PlaybackStatus,
    pending_line_break: bool,
}
