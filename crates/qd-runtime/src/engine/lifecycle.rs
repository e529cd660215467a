use super::*;

impl Interpreter {
    pub fn new(options: InterpreterOptions) -> Self {
        tracing::debug!(
            units = options.script.len(),
            roles = options.roles.len(),
            "interpreter created"
        );
        Self {
            script: options.script,
            roles: options.roles,
            state: RenderState::new(options.defaults),
            cursor: 0,
            status: PlaybackStatus::Ready,
            pending_line_break: false,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.script.len()
    }

    pub fn is_empty(&self) -> bool {
        self.script.is_empty()
    }

    pub fn render_state(&self) -> &RenderState {
        &self.state
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    /// Stops playback from any non-terminal state. No further ops are produced.
    pub fn quit(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        tracing::info!(cursor = self.cursor, "playback quit");
        self.status = PlaybackStatus::Terminated;
        self.pending_line_break = false;
    }

    pub(super) fn bump_cursor(&mut self) {
        self.cursor = (self.cursor + 1).min(self.script.len());
    }
}
