mod codec;
mod package;
mod script;

pub use codec::{read_header, Algorithm, ContainerHeader, EncodeOptions, HEADER_LEN};
pub use package::{decode_package, encode_package};
pub use script::{decode_script, encode_script, encode_script_bytes};

pub const SCRIPT_EXTENSION: &str = "qdz";
pub const PACKAGE_EXTENSION: &str = "qdpkg";
