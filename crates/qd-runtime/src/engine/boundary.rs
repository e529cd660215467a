use qd_core::{DramaError, ErrorKind};

use super::*;

impl Interpreter {
    /// Acknowledges the line being shown. Only legal while awaiting; the next `step`
    /// starts by closing that line.
    pub fn advance(&mut self) -> Result<(), DramaError> {
        if self.status != PlaybackStatus::AwaitingAdvance {
            return Err(DramaError::new(
                ErrorKind::InvalidArgument,
                format!("Cannot advance while playback is {:?}.", self.status),
            ));
        }
        self.bump_cursor();
        self.status = PlaybackStatus::Running;
        self.pending_line_break = true;
        Ok(())
    }
}
