//! RouterBoot on-flash format primitives
//!
//! MikroTik RouterBOARDs store their identity and calibration data in tagged, word-aligned
//! binary segments. This module holds the shared constants and the low-level decoders that
//! operate on those segments.

pub mod lzo;
pub mod rle;
pub mod tag;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Magic header of the `hard_config` segment ("Hard")
pub const RB_MAGIC_HARD: u32 =
    (b'H' as u32) | (b'a' as u32) << 8 | (b'r' as u32) << 16 | (b'd' as u32) << 24;

/// Magic header of LZO-compressed WLAN data that needs the dictionary prefix ("LZOR")
pub const RB_MAGIC_LZOR: u32 =
    (b'L' as u32) | (b'Z' as u32) << 8 | (b'O' as u32) << 16 | (b'R' as u32) << 24;

/// Magic header of WLAN data holding an embedded tag list ("ERD")
pub const RB_MAGIC_ERD: u32 = (b'E' as u32) << 16 | (b'R' as u32) << 8 | (b'D' as u32);

/// Maximum size of decoded WLAN calibration data
pub const RB_ART_SIZE: usize = 0x10000;

/// Name of the flash partition holding the hard config
pub const RB_MTD_HARD_CONFIG: &str = "hard_config";

/// Known tag ids in the `hard_config` segment
#[repr(u16)]
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
pub enum TagId {
    FlashInfo = 0x03,
    MacAddressPack = 0x04,
    BoardProductCode = 0x05,
    BiosVersion = 0x06,
    SdramTimings = 0x08,
    DeviceTimings = 0x09,
    SoftwareId = 0x0A,
    SerialNumber = 0x0B,
    MemorySize = 0x0D,
    MacAddressCount = 0x0E,
    HwOptions = 0x15,
    WlanData = 0x16,
    BoardIdentifier = 0x17,
    ProductName = 0x21,
    Defconf = 0x26,
    BoardRevision = 0x27,
}

impl TagId {
    /// Returns the raw numeric id
    pub fn id(self) -> u16 {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use byteorder::{ByteOrder, LittleEndian};

    use super::*;

    #[test]
    fn it_should_encode_magics_as_little_endian_ascii() {
        assert_eq!(LittleEndian::read_u32(b"Hard"), RB_MAGIC_HARD);
        assert_eq!(LittleEndian::read_u32(b"LZOR"), RB_MAGIC_LZOR);
        assert_eq!(LittleEndian::read_u32(b"DRE\0"), RB_MAGIC_ERD);
    }

    #[test]
    fn it_should_convert_tag_ids() {
        assert_eq!(TagId::WlanData.id(), 0x16);
        assert_eq!(TagId::try_from(0x21u16).unwrap(), TagId::ProductName);
        assert!(TagId::try_from(0x01u16).is_err());
    }
}
