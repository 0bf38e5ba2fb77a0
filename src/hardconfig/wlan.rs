//! WLAN calibration data unpacking
//!
//! The `wlan_data` tag holds calibration data in one of three containers, told apart by the
//! magic number at the start of the payload:
//!
//! * `LZOR`: the rest of the payload is appended to [`LZOR_PREFIX`] and LZO-decompressed.
//!   The output contains an aligned `ERD` magic followed by a tag list whose tag 1 is
//!   RLE-encoded calibration data.
//! * `ERD`: the rest of the payload is a tag list whose tag 1 is LZO-compressed calibration
//!   data.
//! * anything else: the payload itself is RLE-encoded calibration data.
//!
//! [`LZOR_PREFIX`]: super::lzor::LZOR_PREFIX

use byteorder::ByteOrder;
use log::debug;

use super::lzor::LZOR_PREFIX;
use crate::error::ReadError;
use crate::routerboot::tag::{self, TagError, TagRecord};
use crate::routerboot::{lzo, rle, RB_MAGIC_ERD, RB_MAGIC_LZOR};

/// Id of the embedded tag locating the calibration data
const EMBEDDED_TAG_ID: u16 = 0x1;

/// Unpacks the WLAN data payload described by `record` inside `buf` into `out`, returning the
/// decoded length. `out.len()` is the maximum size of the decoded data.
pub fn unpack<B: ByteOrder>(
    buf: &[u8],
    record: TagRecord,
    out: &mut [u8],
) -> Result<usize, ReadError> {
    let payload = record.payload(buf).ok_or(ReadError::OutOfBounds {
        offset: record.offset,
        len: record.len as usize,
        buf_len: buf.len(),
    })?;

    let magic = if payload.len() >= 4 {
        Some(B::read_u32(payload))
    } else {
        None
    };

    match magic {
        Some(RB_MAGIC_LZOR) => unpack_lzor::<B>(&payload[4..], &LZOR_PREFIX, out),
        Some(RB_MAGIC_ERD) => unpack_erd::<B>(&payload[4..], out),
        _ => rle::decode(payload, out).map_err(|err| {
            debug!("RLE decoding error ({})", err);
            err.into()
        }),
    }
}

/// Locates the embedded calibration data tag in `data`
fn embedded_tag<B: ByteOrder>(data: &[u8], what: &str) -> Result<TagRecord, ReadError> {
    tag::find::<B>(data, EMBEDDED_TAG_ID).map_err(|err| {
        match err {
            TagError::NotFound(_) => debug!("{}: data not found", what),
            TagError::Malformed { .. } => debug!("{}: invalid data length ({})", what, err),
        }

        match err {
            TagError::NotFound(_) => ReadError::NotFound(format!("{} data", what)),
            err => err.into(),
        }
    })
}

fn unpack_erd<B: ByteOrder>(data: &[u8], out: &mut [u8]) -> Result<usize, ReadError> {
    let record = embedded_tag::<B>(data, "ERD")?;
    let compressed = &data[record.range()];

    let res = lzo::decompress(compressed, out).map_err(|err| {
        debug!("ERD: LZO decompression error ({})", err);
        err
    })?;

    Ok(res.len)
}

/// Unpacks LZOR data, with `prefix` being the head of the LZO stream
pub(crate) fn unpack_lzor<B: ByteOrder>(
    data: &[u8],
    prefix: &[u8],
    out: &mut [u8],
) -> Result<usize, ReadError> {
    let packed_len = prefix.len() + data.len();

    if packed_len > out.len() {
        return Err(ReadError::TooLarge {
            len: packed_len,
            max: out.len(),
        });
    }

    let mut packed = Vec::with_capacity(packed_len);
    packed.extend_from_slice(prefix);
    packed.extend_from_slice(data);

    let mut unpacked = vec![0u8; out.len()];

    let res = lzo::decompress(&packed, &mut unpacked).map_err(|err| {
        debug!("LZOR: LZO decompression error ({})", err);
        err
    })?;

    let unpacked = &unpacked[..res.len];

    // The ERD magic is word-aligned in the decompressed output
    let magic_pos = (0..unpacked.len())
        .step_by(4)
        .take_while(|pos| pos + 4 <= unpacked.len())
        .find(|&pos| B::read_u32(&unpacked[pos..pos + 4]) == RB_MAGIC_ERD)
        .ok_or_else(|| {
            debug!("LZOR: ERD magic not found");
            ReadError::NotFound("ERD magic in LZOR data".to_owned())
        })?;

    let data = &unpacked[magic_pos + 4..];
    let record = embedded_tag::<B>(data, "LZOR")?;

    rle::decode(&data[record.range()], out).map_err(|err| {
        debug!("LZOR: RLE decoding error ({})", err);
        err.into()
    })
}
