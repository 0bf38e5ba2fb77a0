use std::io;

use thiserror::Error;

use crate::routerboot::lzo::LzoError;
use crate::routerboot::rle::RleError;
use crate::routerboot::tag::TagError;

/// Errors that abort loading of the hard config segment
#[derive(Error, Debug)]
pub enum InitError {
    #[error("I/O error when reading flash segment: {}", _0)]
    Io(#[from] io::Error),

    #[error("Short read of flash segment: expected {} bytes, got {}", expected, actual)]
    ShortRead { expected: usize, actual: usize },

    #[error("The magic header value is invalid: {:?}", _0)]
    BadMagic([u8; 4]),
}

/// Errors returned when reading a single attribute
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("No such attribute: {}", _0)]
    NotFound(String),

    #[error("Invalid payload length {}: {}", len, reason)]
    InvalidLength { len: usize, reason: &'static str },

    #[error("Payload of {} bytes exceeds the maximum of {} bytes", len, max)]
    TooLarge { len: usize, max: usize },

    #[error("Payload at {:#x}+{} is outside of the {} byte segment", offset, len, buf_len)]
    OutOfBounds {
        offset: usize,
        len: usize,
        buf_len: usize,
    },

    #[error("LZO error: {}", _0)]
    Decompression(#[from] LzoError),

    #[error("RLE error: {}", _0)]
    Rle(#[from] RleError),
}

impl From<TagError> for ReadError {
    fn from(err: TagError) -> ReadError {
        match err {
            TagError::NotFound(id) => ReadError::NotFound(format!("tag {:#04x}", id)),
            TagError::Malformed { len, .. } => ReadError::InvalidLength {
                len: len as usize,
                reason: "tag payload runs past the end of its container",
            },
        }
    }
}
