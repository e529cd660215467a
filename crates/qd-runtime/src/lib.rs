mod engine;
pub mod playback;
mod render_state;

pub use engine::{
    Interpreter, InterpreterOptions, PlaybackStatus, StepOutput, ELLIPSIS_TEXT, END_MESSAGE,
};
pub use playback::{
    run_blocking, AdvanceFlag, AutoAdvance, DriverOptions, InputEvent, InputSource, Presenter,
};
pub use render_state::{RenderDefaults, RenderDelta, RenderState, DEFAULT_TYPING_DELAY};
