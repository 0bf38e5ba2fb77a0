//! Published hard config attributes and their text formatters

use std::iter;
use std::marker::PhantomData;

use byteorder::ByteOrder;

use crate::error::ReadError;
use crate::routerboot::TagId;

/// How the payload of a text attribute is rendered
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Format {
    /// One or more 32-bit words, one hex value per line
    U32s,
    /// NUL-terminated ASCII string
    Str,
    /// MAC address packed in two 32-bit words
    Mac,
    /// Hardware options bitmask
    HwOptions,
}

/// What kind of attribute a tag is published as
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Kind {
    Text(Format),
    /// WLAN calibration data, unpacked on every read
    WlanData,
}

/// A tag published as a named attribute
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct AttrSpec {
    pub tag: TagId,
    pub name: &'static str,
    pub kind: Kind,
}

const fn text(tag: TagId, name: &'static str, format: Format) -> AttrSpec {
    AttrSpec {
        tag,
        name,
        kind: Kind::Text(format),
    }
}

/// Name of the WLAN calibration data attribute
pub const WLAN_DATA: &str = "wlan_data";

/// Every tag published from the hard config, in publication order
pub static ATTRS: [AttrSpec; 13] = [
    text(TagId::FlashInfo, "flash_info", Format::U32s),
    text(TagId::MacAddressPack, "mac_base", Format::Mac),
    text(TagId::BoardProductCode, "board_product_code", Format::Str),
    text(TagId::BiosVersion, "booter_version", Format::Str),
    text(TagId::SerialNumber, "board_serial", Format::Str),
    text(TagId::MemorySize, "mem_size", Format::U32s),
    text(TagId::MacAddressCount, "mac_count", Format::U32s),
    text(TagId::HwOptions, "hw_options", Format::HwOptions),
    AttrSpec {
        tag: TagId::WlanData,
        name: WLAN_DATA,
        kind: Kind::WlanData,
    },
    text(TagId::BoardIdentifier, "board_identifier", Format::Str),
    text(TagId::ProductName, "product_name", Format::Str),
    text(TagId::Defconf, "defconf", Format::Str),
    text(TagId::BoardRevision, "board_revision", Format::Str),
];

/// Looks up a published attribute by name
pub fn by_name(name: &str) -> Option<&'static AttrSpec> {
    ATTRS.iter().find(|attr| attr.name == name)
}

pub const RB_HW_OPT_NO_UART: u32 = 1 << 0;
pub const RB_HW_OPT_HAS_VOLTAGE: u32 = 1 << 1;
pub const RB_HW_OPT_HAS_USB: u32 = 1 << 2;
pub const RB_HW_OPT_HAS_ATTINY: u32 = 1 << 3;
pub const RB_HW_OPT_PULSE_DUTY_CYCLE: u32 = 1 << 9;
pub const RB_HW_OPT_NO_NAND: u32 = 1 << 14;
pub const RB_HW_OPT_HAS_LCD: u32 = 1 << 15;
pub const RB_HW_OPT_HAS_POE_OUT: u32 = 1 << 16;
pub const RB_HW_OPT_HAS_USD: u32 = 1 << 17;
pub const RB_HW_OPT_HAS_SIM: u32 = 1 << 18;
pub const RB_HW_OPT_HAS_SFP: u32 = 1 << 20;
pub const RB_HW_OPT_HAS_WIFI: u32 = 1 << 21;
pub const RB_HW_OPT_HAS_TS_FOR_ADC: u32 = 1 << 22;
pub const RB_HW_OPT_HAS_PLC: u32 = 1 << 29;

/// Hardware option bits with their human-friendly labels, padded with tabs for alignment
pub static HW_OPTIONS: [(u32, &str); 13] = [
    (RB_HW_OPT_NO_UART, "no UART\t\t"),
    (RB_HW_OPT_HAS_VOLTAGE, "has Vreg\t"),
    (RB_HW_OPT_HAS_USB, "has usb\t\t"),
    (RB_HW_OPT_HAS_ATTINY, "has ATtiny\t"),
    (RB_HW_OPT_NO_NAND, "no NAND\t\t"),
    (RB_HW_OPT_HAS_LCD, "has LCD\t\t"),
    (RB_HW_OPT_HAS_POE_OUT, "has POE out\t"),
    (RB_HW_OPT_HAS_USD, "has MicroSD\t"),
    (RB_HW_OPT_HAS_SIM, "has SIM\t\t"),
    (RB_HW_OPT_HAS_SFP, "has SFP\t\t"),
    (RB_HW_OPT_HAS_WIFI, "has WiFi\t"),
    (RB_HW_OPT_HAS_TS_FOR_ADC, "has TS ADC\t"),
    (RB_HW_OPT_HAS_PLC, "has PLC\t\t"),
];

/// Hardware options bitmask
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct HwOptions(pub u32);

impl HwOptions {
    pub fn contains(self, bit: u32) -> bool {
        self.0 & bit != 0
    }

    /// Iterates over the known options as `(label, is_set)` pairs, labels padded as in
    /// `HW_OPTIONS`
    pub fn flags(self) -> impl Iterator<Item = (&'static str, bool)> {
        HW_OPTIONS
            .iter()
            .map(move |&(bit, label)| (label, self.contains(bit)))
    }
}

/// Text formatter bound to the byte order of the segment
pub struct Formatter<B> {
    byte_order: PhantomData<B>,
}

impl<B: ByteOrder> Formatter<B> {
    pub fn format(format: Format, payload: &[u8]) -> Result<String, ReadError> {
        match format {
            Format::U32s => Self::u32s(payload),
            Format::Str => Ok(Self::string(payload)),
            Format::Mac => Self::mac(payload),
            Format::HwOptions => Self::hw_options(payload),
        }
    }

    /// Renders every 32-bit word of the payload on its own line
    pub fn u32s(payload: &[u8]) -> Result<String, ReadError> {
        if payload.is_empty() || payload.len() % 4 != 0 {
            return Err(ReadError::InvalidLength {
                len: payload.len(),
                reason: "expected a non-zero multiple of 4",
            });
        }

        let mut out = String::with_capacity(payload.len() / 4 * 11);

        for word in payload.chunks_exact(4) {
            out.push_str(&format!("{:#010x}\n", B::read_u32(word)));
        }

        Ok(out)
    }

    /// Renders the payload up to its first NUL, followed by a newline. Non-ASCII bytes are
    /// replaced with `?` so the output never exceeds the payload length.
    pub fn string(payload: &[u8]) -> String {
        let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
        payload[..end]
            .iter()
            .map(|&b| if b.is_ascii() { b as char } else { '?' })
            .chain(iter::once('\n'))
            .take(payload.len())
            .collect()
    }

    /// The MAC is stored network-endian in two 32-bit words: `<XX:XX:XX:XX> <XX:XX:00:00>`
    pub fn mac(payload: &[u8]) -> Result<String, ReadError> {
        if payload.len() != 8 {
            return Err(ReadError::InvalidLength {
                len: payload.len(),
                reason: "expected 8 bytes",
            });
        }

        let mac: Vec<String> = payload[..6].iter().map(|b| format!("{:02x}", b)).collect();

        Ok(format!("{}\n", mac.join(":")))
    }

    /// Renders the raw bitmask followed by one line per known option
    pub fn hw_options(payload: &[u8]) -> Result<String, ReadError> {
        if payload.len() != 4 {
            return Err(ReadError::InvalidLength {
                len: payload.len(),
                reason: "expected 4 bytes",
            });
        }

        let options = HwOptions(B::read_u32(payload));
        let mut out = format!("raw\t\t: {:#010x}\n\n", options.0);

        for (label, set) in options.flags() {
            out.push_str(&format!("{}: {}\n", label, set));
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use byteorder::{BigEndian, LittleEndian};
    use hex_literal::hex;

    use super::*;

    type Fmt = Formatter<LittleEndian>;

    #[test]
    fn it_should_render_u32s() {
        let out = Fmt::u32s(&hex!("00 00 00 01 00 00 01 00 00 10 00 00")).unwrap();

        assert_eq!(out, "0x01000000\n0x00010000\n0x00001000\n");
        assert_eq!(
            Formatter::<BigEndian>::u32s(&hex!("00 00 00 40")).unwrap(),
            "0x00000040\n"
        );
    }

    #[test]
    fn it_should_reject_odd_u32s() {
        assert!(matches!(
            Fmt::u32s(&hex!("01 02 03")),
            Err(ReadError::InvalidLength { len: 3, .. })
        ));
        assert!(matches!(
            Fmt::u32s(&[]),
            Err(ReadError::InvalidLength { len: 0, .. })
        ));
    }

    #[test]
    fn it_should_render_strings() {
        assert_eq!(Fmt::string(b"RB951Ui-2HnD\0"), "RB951Ui-2HnD\n");
        assert_eq!(Fmt::string(b"6.45.9\0\0\0"), "6.45.9\n");
        // Without a terminator there is no room left for the newline
        assert_eq!(Fmt::string(b"r2"), "r2");
        assert_eq!(Fmt::string(b""), "");
    }

    #[test]
    fn it_should_replace_non_ascii_string_bytes() {
        let payload = hex!("52 42 e9 ff 00");
        let out = Fmt::string(&payload);

        assert_eq!(out, "RB??\n");
        assert_eq!(out.len(), payload.len());
        assert_eq!(Fmt::string(&hex!("c3 a9")), "??");
    }

    #[test]
    fn it_should_render_mac() {
        let out = Fmt::mac(&hex!("AA BB CC DD EE FF 00 00")).unwrap();

        assert_eq!(out, "aa:bb:cc:dd:ee:ff\n");
    }

    #[test]
    fn it_should_reject_bad_mac_length() {
        for len in [0usize, 6, 7, 9, 12].iter() {
            let payload = vec![0xaa; *len];

            assert!(matches!(
                Fmt::mac(&payload),
                Err(ReadError::InvalidLength { .. })
            ));
        }
    }

    #[test]
    fn it_should_render_hw_options() {
        let out = Fmt::hw_options(&hex!("05 00 00 00")).unwrap();
        let mut lines = out.lines();

        assert_eq!(lines.next(), Some("raw\t\t: 0x00000005"));
        assert_eq!(lines.next(), Some(""));
        assert_eq!(lines.next(), Some("no UART\t\t: true"));
        assert_eq!(lines.next(), Some("has Vreg\t: false"));
        assert_eq!(lines.next(), Some("has usb\t\t: true"));

        let rest: Vec<&str> = lines.collect();

        assert_eq!(rest.len(), 10);
        assert!(rest.iter().all(|line| line.ends_with(": false")));
    }

    #[test]
    fn it_should_list_hw_option_flags() {
        let set: Vec<&str> = HwOptions(0x0020_0005)
            .flags()
            .filter(|&(_, set)| set)
            .map(|(label, _)| label.trim_end())
            .collect();

        assert_eq!(set, vec!["no UART", "has usb", "has WiFi"]);
        assert!(!HwOptions(RB_HW_OPT_PULSE_DUTY_CYCLE)
            .flags()
            .any(|(_, set)| set));
    }

    #[test]
    fn it_should_reject_bad_hw_options_length() {
        assert!(Fmt::hw_options(&hex!("05 00 00")).is_err());
        assert!(Fmt::hw_options(&hex!("05 00 00 00 00 00 00 00")).is_err());
    }

    #[test]
    fn it_should_find_attrs_by_name() {
        assert_eq!(by_name("mac_base").unwrap().tag, TagId::MacAddressPack);
        assert_eq!(by_name("wlan_data").unwrap().kind, Kind::WlanData);
        assert!(by_name("sdram_timings").is_none());
    }
}
