//! Compression layer shared by scripts and packages.

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use qd_core::{DramaError, ErrorKind};

const MAGIC: &[u8; 3] = b"QDZ";
const FORMAT_VERSION: u8 = 1;
pub const HEADER_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    #[default]
    Gzip = 0,
    Zlib = 1,
    Bzip2 = 2,
    Zstd = 3,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Zlib => "zlib",
            Self::Bzip2 => "bzip2",
            Self::Zstd => "zstd",
        }
    }

    pub fn level_range(self) -> std::ops::RangeInclusive<u8> {
        match self {
            Self::Gzip | Self::Zlib => 0..=9,
            Self::Bzip2 => 1..=9,
            // 20-22 need the ultra window sizes; not offered.
            Self::Zstd => 1..=19,
        }
    }

    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Gzip),
            1 => Some(Self::Zlib),
            2 => Some(Self::Bzip2),
            3 => Some(Self::Zstd),
            _ => None,
        }
    }

    fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0x1f, 0x8b, ..] => Some(Self::Gzip),
            [b'B', b'Z', b'h', ..] => Some(Self::Bzip2),
            [0x28, 0xb5, 0x2f, 0xfd, ..] => Some(Self::Zstd),
            [0x78, second, ..] if u16::from_be_bytes([0x78, *second]) % 31 == 0 => {
                Some(Self::Zlib)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = DramaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "gzip" | "gz" => Ok(Self::Gzip),
            "zlib" => Ok(Self::Zlib),
            "bzip2" | "bz2" => Ok(Self::Bzip2),
            "zstd" | "zst" => Ok(Self::Zstd),
            _ => Err(DramaError::new(
                ErrorKind::InvalidArgument,
                format!("Unknown compression algorithm \"{}\".", value),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    pub algorithm: Algorithm,
    pub level: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Gzip,
            level: 6,
        }
    }
}

impl EncodeOptions {
    pub fn new(algorithm: Algorithm, level: u8) -> Result<Self, DramaError> {
        let options = Self { algorithm, level };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), DramaError> {
        if self.algorithm.level_range().contains(&self.level) {
            return Ok(());
        }
        let range = self.algorithm.level_range();
        Err(DramaError::new(
            ErrorKind::InvalidArgument,
            format!(
                "Compression level {} is out of range for {} ({}-{}).",
                self.level,
                self.algorithm,
                range.start(),
                range.end()
            ),
        ))
    }
}

/// What the leading bytes of a container say about it. `level` is only known when the
/// blob carries our header; bare gzip/zlib/bzip2/zstd streams are sniffed by magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub algorithm: Algorithm,
    pub level: Option<u8>,
}

pub fn read_header(bytes: &[u8]) -> Result<ContainerHeader, DramaError> {
    if let Some(rest) = bytes.strip_prefix(MAGIC.as_slice()) {
        let [version, algorithm, level, ..] = rest else {
            return Err(corrupt("Container header is truncated."));
        };
        if *version != FORMAT_VERSION {
            return Err(corrupt(format!(
                "Unsupported container version {}.",
                version
            )));
        }
        let algorithm = Algorithm::from_byte(*algorithm).ok_or_else(|| {
            corrupt(format!("Unknown compression algorithm id {}.", algorithm))
        })?;
        return Ok(ContainerHeader {
            algorithm,
            level: Some(*level),
        });
    }

    Algorithm::sniff(bytes)
        .map(|algorithm| ContainerHeader {
            algorithm,
            level: None,
        })
        .ok_or_else(|| corrupt("Data is not a recognised compressed container."))
}

pub(crate) fn compress(payload: &[u8], options: EncodeOptions) -> Result<Vec<u8>, DramaError> {
    options.validate()?;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() / 2);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[FORMAT_VERSION, options.algorithm as u8, options.level]);

    let level = u32::from(options.level);
    let out = match options.algorithm {
        Algorithm::Gzip => {
            let mut encoder = GzEncoder::new(out, flate2::Compression::new(level));
            encoder.write_all(payload).map_err(map_encode_error)?;
            encoder.finish().map_err(map_encode_error)?
        }
        Algorithm::Zlib => {
            let mut encoder = ZlibEncoder::new(out, flate2::Compression::new(level));
            encoder.write_all(payload).map_err(map_encode_error)?;
            encoder.finish().map_err(map_encode_error)?
        }
        Algorithm::Bzip2 => {
            let mut encoder = bzip2::write::BzEncoder::new(out, bzip2::Compression::new(level));
            encoder.write_all(payload).map_err(map_encode_error)?;
            encoder.finish().map_err(map_encode_error)?
        }
        Algorithm::Zstd => {
            let mut encoder =
                zstd::stream::write::Encoder::new(out, i32::from(options.level))
                    .map_err(map_encode_error)?;
            encoder.write_all(payload).map_err(map_encode_error)?;
            encoder.finish().map_err(map_encode_error)?
        }
    };
    Ok(out)
}

pub(crate) fn decompress(bytes: &[u8]) -> Result<Vec<u8>, DramaError> {
    let header = read_header(bytes)?;
    let body = match header.level {
        Some(_) => &bytes[HEADER_LEN..],
        None => bytes,
    };

    let mut decompressed = Vec::new();
    let result = match header.algorithm {
        Algorithm::Gzip => GzDecoder::new(body).read_to_end(&mut decompressed),
        Algorithm::Zlib => ZlibDecoder::new(body).read_to_end(&mut decompressed),
        Algorithm::Bzip2 => bzip2::read::BzDecoder::new(body).read_to_end(&mut decompressed),
        Algorithm::Zstd => zstd::stream::read::Decoder::new(body)
            .and_then(|mut decoder| decoder.read_to_end(&mut decompressed)),
    };
    result.map_err(|error| {
        corrupt(format!(
            "Failed to decompress {} data: {}",
            header.algorithm, error
        ))
    })?;
    Ok(decompressed)
}

fn map_encode_error(error: std::io::Error) -> DramaError {
    DramaError::new(
        ErrorKind::Io,
        format!("Failed to compress data: {}", error),
    )
}

pub(crate) fn corrupt(message: impl Into<String>) -> DramaError {
    DramaError::new(ErrorKind::CorruptContainer, message)
}

#[cfg(test)]
mod codec_tests {
    use super::*;

    #[test]
    fn header_records_algorithm_and_level() {
        let blob = compress(b"payload", EncodeOptions::new(Algorithm::Bzip2, 3).expect("options"))
            .expect("compress");
        assert_eq!(&blob[..4], b"QDZ\x01");
        assert_eq!(
            read_header(&blob).expect("header"),
            ContainerHeader {
                algorithm: Algorithm::Bzip2,
                level: Some(3)
            }
        );
    }

    #[test]
    fn headerless_streams_are_sniffed() {
        let blob = compress(b"payload", EncodeOptions::default()).expect("compress");
        let raw_gzip = &blob[HEADER_LEN..];
        assert_eq!(
            read_header(raw_gzip).expect("header").algorithm,
            Algorithm::Gzip
        );
        assert_eq!(decompress(raw_gzip).expect("decompress"), b"payload");

        let blob = compress(b"payload", EncodeOptions::new(Algorithm::Zlib, 9).expect("options"))
            .expect("compress");
        let raw_zlib = &blob[HEADER_LEN..];
        assert_eq!(read_header(raw_zlib).expect("header").level, None);
        assert_eq!(decompress(raw_zlib).expect("decompress"), b"payload");
    }

    #[test]
    fn bare_zstd_frames_decode() {
        let frame = zstd::stream::encode_all(&b"Hello\n/end\n"[..], 3).expect("zstd frame");
        assert_eq!(
            read_header(&frame).expect("header"),
            ContainerHeader {
                algorithm: Algorithm::Zstd,
                level: None
            }
        );
        assert_eq!(decompress(&frame).expect("decompress"), b"Hello\n/end\n");
    }

    #[test]
    fn illegal_levels_are_rejected() {
        for (algorithm, level) in [
            (Algorithm::Gzip, 10),
            (Algorithm::Zlib, 42),
            (Algorithm::Bzip2, 0),
            (Algorithm::Zstd, 0),
            (Algorithm::Zstd, 22),
        ] {
            let error = EncodeOptions::new(algorithm, level).expect_err("illegal level");
            assert_eq!(error.kind, ErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn algorithm_names_parse() {
        assert_eq!("GZIP".parse::<Algorithm>().expect("gzip"), Algorithm::Gzip);
        assert_eq!("bz2".parse::<Algorithm>().expect("bzip2"), Algorithm::Bzip2);
        assert_eq!("zst".parse::<Algorithm>().expect("zstd"), Algorithm::Zstd);
        assert!("lzma".parse::<Algorithm>().is_err());
    }

    #[test]
    fn unknown_or_truncated_headers_are_corrupt() {
        for bytes in [&b"QDZ"[..], b"QDZ\x02\x00\x06", b"QDZ\x01\x07\x06", b"plain text"] {
            let error = read_header(bytes).expect_err("corrupt header");
            assert_eq!(error.kind, ErrorKind::CorruptContainer);
        }
    }
}
