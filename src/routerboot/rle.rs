//! RouterBoot run-length decoding
//!
//! The stream is a sequence of runs, each introduced by a control byte:
//!
//! * bit 7 set: the next `256 - control` input bytes are copied verbatim
//! * bit 7 clear: the next input byte is repeated `control` times (a zero count is allowed)
//!
//! Decoding stops when fewer than two input bytes remain.

use log::trace;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum RleError {
    #[error("RLE input is too short ({} bytes)", _0)]
    InputTooShort(usize),

    #[error("Verbatim run of {} bytes at offset {:#x} exceeds the remaining input", run, offset)]
    Truncated { offset: usize, run: usize },

    #[error("Decoded data exceeds the output buffer of {} bytes", capacity)]
    BufferTooSmall { capacity: usize },
}

/// Decodes the RLE stream `input` into `output`, returning the number of bytes written.
///
/// Every run is checked against the capacity of `output` before anything is written for it.
pub fn decode(input: &[u8], output: &mut [u8]) -> Result<usize, RleError> {
    if input.len() < 2 {
        return Err(RleError::InputTooShort(input.len()));
    }

    let capacity = output.len();
    let mut pos = 0;
    let mut written = 0;

    while input.len() - pos >= 2 {
        let control = input[pos];
        pos += 1;

        if control & 0x80 != 0 {
            let run = 0x100 - control as usize;

            if run > input.len() - pos {
                return Err(RleError::Truncated { offset: pos - 1, run });
            }

            if written + run > capacity {
                return Err(RleError::BufferTooSmall { capacity });
            }

            output[written..written + run].copy_from_slice(&input[pos..pos + run]);
            pos += run;
            written += run;
        } else {
            let run = control as usize;
            let byte = input[pos];
            pos += 1;

            if written + run > capacity {
                return Err(RleError::BufferTooSmall { capacity });
            }

            for out in &mut output[written..written + run] {
                *out = byte;
            }

            written += run;
        }
    }

    trace!("RLE decoded {} bytes into {}", input.len(), written);

    Ok(written)
}

#[cfg(test)]
mod tests {
    use assert_hex::*;
    use hex_literal::hex;

    use super::*;

    #[test]
    fn it_should_expand_repeated_runs() {
        let mut out = [0u8; 16];
        let len = decode(&hex!("04 aa 02 55"), &mut out).unwrap();

        assert_eq!(len, 6);
        assert_eq_hex!(&out[..len], &hex!("aa aa aa aa 55 55")[..]);
    }

    #[test]
    fn it_should_copy_verbatim_runs() {
        let mut out = [0u8; 16];
        // 0xfd => 3 verbatim bytes, 0xff => 1 verbatim byte
        let len = decode(&hex!("fd 01 02 03 ff 04 03 00"), &mut out).unwrap();

        assert_eq!(len, 7);
        assert_eq_hex!(&out[..len], &hex!("01 02 03 04 00 00 00")[..]);
    }

    #[test]
    fn it_should_accept_empty_runs_and_ignore_trailing_byte() {
        let mut out = [0u8; 4];
        let len = decode(&hex!("00 ff 02 11 7f"), &mut out).unwrap();

        assert_eq!(len, 2);
        assert_eq_hex!(&out[..len], &hex!("11 11")[..]);
    }

    #[test]
    fn it_should_be_deterministic() {
        let input = hex!("fe 10 20 05 30 81");
        let mut first = [0u8; 64];
        let mut second = [0xffu8; 64];

        let len1 = decode(&input, &mut first).unwrap();
        let len2 = decode(&input, &mut second).unwrap();

        assert_eq!(len1, len2);
        assert_eq_hex!(&first[..len1], &second[..len2]);
    }

    #[test]
    fn it_should_fail_on_short_input() {
        let mut out = [0u8; 4];

        assert_eq!(decode(&[0x01], &mut out), Err(RleError::InputTooShort(1)));
        assert_eq!(decode(&[], &mut out), Err(RleError::InputTooShort(0)));
    }

    #[test]
    fn it_should_fail_on_truncated_verbatim_run() {
        let mut out = [0u8; 16];

        assert_eq!(
            decode(&hex!("02 aa fc 01 02"), &mut out),
            Err(RleError::Truncated { offset: 2, run: 4 })
        );
    }

    #[test]
    fn it_should_fail_when_output_is_too_small() {
        let mut out = [0u8; 5];

        assert_eq!(
            decode(&hex!("04 aa 02 55"), &mut out),
            Err(RleError::BufferTooSmall { capacity: 5 })
        );
        assert_eq!(
            decode(&hex!("7f 00"), &mut out),
            Err(RleError::BufferTooSmall { capacity: 5 })
        );
    }
}
