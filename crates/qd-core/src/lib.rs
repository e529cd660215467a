pub mod directive;
pub mod error;
pub mod manifest;
pub mod palette;
pub mod types;

pub use directive::*;
pub use error::{DramaError, ErrorKind};
pub use manifest::*;
pub use palette::*;
pub use types::*;
