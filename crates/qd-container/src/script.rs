use qd_core::{DramaError, ErrorKind};

use crate::codec::{compress, corrupt, decompress, EncodeOptions};

pub fn encode_script(text: &str, options: EncodeOptions) -> Result<Vec<u8>, DramaError> {
    let blob = compress(text.as_bytes(), options)?;
    tracing::info!(
        algorithm = %options.algorithm,
        level = options.level,
        input = text.len(),
        output = blob.len(),
        "encoded script"
    );
    Ok(blob)
}

/// Same as [`encode_script`] for raw file contents, which must be UTF-8.
pub fn encode_script_bytes(bytes: &[u8], options: EncodeOptions) -> Result<Vec<u8>, DramaError> {
    let text = std::str::from_utf8(bytes).map_err(|error| {
        DramaError::new(
            ErrorKind::Encoding,
            format!("Script is not valid UTF-8: {}", error),
        )
    })?;
    encode_script(text, options)
}

pub fn decode_script(bytes: &[u8]) -> Result<String, DramaError> {
    let payload = decompress(bytes)?;
    String::from_utf8(payload).map_err(|_| corrupt("Decoded script is not valid UTF-8."))
}
