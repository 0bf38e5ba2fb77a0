//! LZO1X decompression
//!
//! Thin wrapper over the safe LZO1X decompressor that tolerates padded input streams.

use log::debug;
use rust_lzo::{LZOContext, LZOError};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum LzoError {
    #[error("LZO input overrun")]
    InputOverrun,
    #[error("LZO output overrun")]
    OutputOverrun,
    #[error("LZO lookbehind overrun")]
    LookbehindOverrun,
    #[error("LZO end of stream marker not found")]
    EofNotFound,
    #[error("LZO decompression failed")]
    Other,
}

/// The result of a successful decompression
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Decompressed {
    /// Number of bytes written to the output buffer
    pub len: usize,
    /// Set when the end marker was reached before all of the input was consumed
    pub trailing_slack: bool,
}

/// Decompresses `input` into `output`, whose length is the output capacity.
///
/// Encoders pad some streams to an alignment boundary, so hitting the end marker before the
/// end of the input is not an error.
pub fn decompress(input: &[u8], output: &mut [u8]) -> Result<Decompressed, LzoError> {
    let (decompressed, err) = LZOContext::decompress_to_slice(input, output);
    let len = decompressed.len();

    let trailing_slack = match err {
        LZOError::OK => false,
        LZOError::INPUT_NOT_CONSUMED => {
            debug!("LZO end of stream before end of input, this may be harmless");
            true
        }
        LZOError::INPUT_OVERRUN => return Err(LzoError::InputOverrun),
        LZOError::OUTPUT_OVERRUN => return Err(LzoError::OutputOverrun),
        LZOError::LOOKBEHIND_OVERRUN => return Err(LzoError::LookbehindOverrun),
        LZOError::EOF_NOT_FOUND => return Err(LzoError::EofNotFound),
        _ => return Err(LzoError::Other),
    };

    Ok(Decompressed {
        len,
        trailing_slack,
    })
}

/// Builds an LZO1X stream made of a single literal run followed by the end marker
#[cfg(test)]
pub(crate) fn literal_stream(data: &[u8]) -> Vec<u8> {
    assert!(data.len() >= 4 && data.len() <= 238);

    let mut stream = Vec::with_capacity(data.len() + 4);
    stream.push(17 + data.len() as u8);
    stream.extend_from_slice(data);
    stream.extend_from_slice(&[0x11, 0x00, 0x00]);

    stream
}

#[cfg(test)]
mod tests {
    use assert_hex::*;

    use super::*;

    #[test]
    fn it_should_decompress_literal_stream() {
        let data = b"RouterBOARD calibration";
        let stream = literal_stream(data);
        let mut out = [0u8; 64];

        let res = decompress(&stream, &mut out).unwrap();

        assert_eq!(
            res,
            Decompressed {
                len: data.len(),
                trailing_slack: false
            }
        );
        assert_eq_hex!(&out[..res.len], &data[..]);
    }

    #[test]
    fn it_should_tolerate_padding() {
        let data = b"padded";
        let mut stream = literal_stream(data);
        stream.extend_from_slice(&[0, 0, 0]);
        let mut out = [0u8; 64];

        let res = decompress(&stream, &mut out).unwrap();

        assert!(res.trailing_slack);
        assert_eq_hex!(&out[..res.len], &data[..]);
    }

    #[test]
    fn it_should_fail_on_small_output() {
        let stream = literal_stream(b"does not fit here");
        let mut out = [0u8; 8];

        assert!(decompress(&stream, &mut out).is_err());
    }

    #[test]
    fn it_should_fail_on_truncated_stream() {
        let stream = literal_stream(b"cut short");
        let mut out = [0u8; 64];

        assert!(decompress(&stream[..stream.len() - 3], &mut out).is_err());
    }
}
