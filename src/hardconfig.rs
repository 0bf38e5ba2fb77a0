//! MikroTik RouterBoot `hard_config` segment
//!
//! The segment starts with the `Hard` magic followed by a tag list describing the board:
//! identity strings, MAC address, hardware options and WLAN calibration data. `HardConfig`
//! keeps a copy of the whole segment and resolves every known tag once, at load time.
//! Attributes are rendered from that copy on every read; the WLAN calibration data is unpacked
//! from scratch each time it is read and never cached.

pub mod attr;
mod lzor;
pub mod wlan;

use std::fmt;
use std::marker::PhantomData;

use byteorder::ByteOrder;
use log::{debug, info, trace, warn};

pub use attr::{AttrSpec, Format, Formatter, HwOptions, Kind, ATTRS};
pub use lzor::LZOR_PREFIX;

use crate::error::{InitError, ReadError};
use crate::flash::FlashSegment;
use crate::routerboot::tag::{TagIndex, TagRecord};
use crate::routerboot::{RB_ART_SIZE, RB_MAGIC_HARD};

/// Size of the magic header preceding the tag list
const MAGIC_LEN: usize = 4;

/// A published attribute together with its location in the segment, if present
#[derive(Debug, Clone, Copy)]
struct Resolved {
    spec: &'static AttrSpec,
    record: Option<TagRecord>,
}

/// A loaded `hard_config` segment, with 32-bit words in byte order `B`
pub struct HardConfig<B> {
    buf: Vec<u8>,
    index: TagIndex,
    attrs: Vec<Resolved>,
    byte_order: PhantomData<B>,
}

impl<B> fmt::Debug for HardConfig<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HardConfig")
            .field("len", &self.buf.len())
            .field("tags", &self.index.len())
            .finish()
    }
}

impl<B: ByteOrder> HardConfig<B> {
    /// Reads the whole `flash` segment and parses it
    pub fn from_flash<F: FlashSegment + ?Sized>(flash: &mut F) -> Result<Self, InitError> {
        let size = flash.size();
        let mut buf = vec![0u8; size];

        debug!("Reading {} bytes from flash segment {:?}", size, flash.name());

        let read = flash.read_at(0, &mut buf)?;

        if read != size {
            return Err(InitError::ShortRead {
                expected: size,
                actual: read,
            });
        }

        Self::from_bytes(buf)
    }

    /// Parses a segment already read into `buf`
    pub fn from_bytes(buf: Vec<u8>) -> Result<Self, InitError> {
        let mut magic = [0u8; MAGIC_LEN];
        let head = buf.len().min(MAGIC_LEN);
        magic[..head].copy_from_slice(&buf[..head]);

        if buf.len() < MAGIC_LEN || B::read_u32(&magic) != RB_MAGIC_HARD {
            return Err(InitError::BadMagic(magic));
        }

        let index = TagIndex::build::<B>(&buf[MAGIC_LEN..]);

        let attrs: Vec<Resolved> = ATTRS
            .iter()
            .map(|spec| {
                let record = match index.get(spec.tag.id()) {
                    // Account for the skipped magic
                    Ok(record) if record.len > 0 => Some(record.shifted(MAGIC_LEN)),
                    Ok(_) => {
                        debug!("Tag {} has an empty payload", spec.name);
                        None
                    }
                    Err(err) => {
                        trace!("{} unavailable: {}", spec.name, err);
                        None
                    }
                };

                Resolved { spec, record }
            })
            .collect();

        info!(
            "MikroTik RouterBOARD hardware configuration: {} tags, {} attributes available",
            index.len(),
            attrs.iter().filter(|attr| attr.record.is_some()).count()
        );

        Ok(HardConfig {
            buf,
            index,
            attrs,
            byte_order: PhantomData,
        })
    }

    /// The raw segment, including its magic header
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Every tag in the segment in stream order, offsets relative to the segment start
    pub fn tags(&self) -> impl Iterator<Item = TagRecord> + '_ {
        self.index.iter().map(|record| record.shifted(MAGIC_LEN))
    }

    /// The published attributes present in this segment
    pub fn attributes(&self) -> impl Iterator<Item = &'static AttrSpec> + '_ {
        self.attrs
            .iter()
            .filter(|attr| attr.record.is_some())
            .map(|attr| attr.spec)
    }

    fn resolve(&self, name: &str) -> Result<(&'static AttrSpec, TagRecord), ReadError> {
        if attr::by_name(name).is_none() {
            return Err(ReadError::NotFound(format!("unknown attribute {}", name)));
        }

        self.attrs
            .iter()
            .find(|attr| attr.spec.name == name)
            .and_then(|attr| attr.record.map(|record| (attr.spec, record)))
            .ok_or_else(|| ReadError::NotFound(name.to_owned()))
    }

    fn payload(&self, record: TagRecord) -> Result<&[u8], ReadError> {
        record.payload(&self.buf).ok_or(ReadError::OutOfBounds {
            offset: record.offset,
            len: record.len as usize,
            buf_len: self.buf.len(),
        })
    }

    /// Renders the text attribute `name`
    pub fn render(&self, name: &str) -> Result<String, ReadError> {
        let (spec, record) = self.resolve(name)?;

        match spec.kind {
            Kind::Text(format) => self.show(format, record),
            Kind::WlanData => Err(ReadError::NotFound(format!("{} is not a text attribute", name))),
        }
    }

    fn show(&self, format: Format, record: TagRecord) -> Result<String, ReadError> {
        Formatter::<B>::format(format, self.payload(record)?)
    }

    /// Unpacks the WLAN calibration data and returns up to `count` bytes of it starting at
    /// `offset`. Reading at or past the end returns an empty buffer.
    pub fn render_wlan_data(&self, offset: usize, count: usize) -> Result<Vec<u8>, ReadError> {
        let (_, record) = self.resolve(attr::WLAN_DATA)?;

        self.read_wlan_data(record, offset, count)
    }

    /// Unpacks the whole WLAN calibration data
    pub fn wlan_data(&self) -> Result<Vec<u8>, ReadError> {
        self.render_wlan_data(0, RB_ART_SIZE)
    }

    fn read_wlan_data(
        &self,
        record: TagRecord,
        offset: usize,
        count: usize,
    ) -> Result<Vec<u8>, ReadError> {
        // Don't bother unpacking if the source is already too large
        if record.len as usize > RB_ART_SIZE {
            return Err(ReadError::TooLarge {
                len: record.len as usize,
                max: RB_ART_SIZE,
            });
        }

        let mut out = vec![0u8; RB_ART_SIZE];
        let len = wlan::unpack::<B>(&self.buf, record, &mut out)?;

        if offset >= len {
            return Ok(Vec::new());
        }

        out.truncate(len.min(offset.saturating_add(count)));
        out.drain(..offset);

        Ok(out)
    }

    /// Hands every available attribute to `sink`, returning the number published.
    ///
    /// A failure to publish one attribute is logged and doesn't prevent the others from being
    /// published.
    pub fn publish<P: Publish<B>>(&self, sink: &mut P) -> usize {
        let mut published = 0;

        for attr in &self.attrs {
            let record = match attr.record {
                Some(record) => record,
                None => continue,
            };

            let res = match attr.spec.kind {
                Kind::Text(format) => sink.text(TextAttr {
                    config: self,
                    name: attr.spec.name,
                    format,
                    record,
                }),
                Kind::WlanData => sink.binary(BinAttr {
                    config: self,
                    name: attr.spec.name,
                    record,
                }),
            };

            match res {
                Ok(()) => published += 1,
                Err(err) => warn!("Could not publish {} ({})", attr.spec.name, err),
            }
        }

        published
    }
}

/// A text attribute bound to its payload
pub struct TextAttr<'a, B> {
    config: &'a HardConfig<B>,
    name: &'static str,
    format: Format,
    record: TagRecord,
}

impl<'a, B: ByteOrder> TextAttr<'a, B> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn show(&self) -> Result<String, ReadError> {
        self.config.show(self.format, self.record)
    }
}

/// A binary attribute bound to the WLAN data payload
pub struct BinAttr<'a, B> {
    config: &'a HardConfig<B>,
    name: &'static str,
    record: TagRecord,
}

impl<'a, B: ByteOrder> BinAttr<'a, B> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Reads up to `count` bytes of the decoded data starting at `offset`
    pub fn read(&self, offset: usize, count: usize) -> Result<Vec<u8>, ReadError> {
        self.config.read_wlan_data(self.record, offset, count)
    }
}

/// A destination for published attributes, e.g. a sysfs-like directory
pub trait Publish<B: ByteOrder> {
    type Error: fmt::Display;

    fn text(&mut self, attr: TextAttr<'_, B>) -> Result<(), Self::Error>;

    fn binary(&mut self, attr: BinAttr<'_, B>) -> Result<(), Self::Error>;
}
