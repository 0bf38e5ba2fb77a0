//! RouterBoot tag lists
//!
//! A tag list is a sequence of word-aligned records. Each record starts with a 32-bit node
//! word holding the tag id in its low half and the payload length in its high half, followed
//! by the payload itself. A zero node word terminates the list.

use std::collections::HashMap;
use std::io::Cursor;
use std::marker::PhantomData;
use std::ops::Range;

use byteorder::{ByteOrder, ReadBytesExt};
use log::debug;
use thiserror::Error;

/// Size of a tag node header
pub const TAG_NODE_SIZE: usize = 4;

/// Tag lookup errors
#[derive(Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum TagError {
    #[error("Tag {:#04x} not found", _0)]
    NotFound(u16),

    #[error(
        "Tag {:#04x} at offset {:#x} claims {} bytes but only {} remain",
        id,
        offset,
        len,
        available
    )]
    Malformed {
        id: u16,
        offset: usize,
        len: u16,
        available: usize,
    },
}

/// A record located inside a tag list. Offsets are relative to the buffer it was found in.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TagRecord {
    pub id: u16,
    pub offset: usize,
    pub len: u16,
}

impl TagRecord {
    /// The byte range of the payload
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len as usize
    }

    /// Returns the payload of this record within `buf`, if `buf` is large enough to hold it
    pub fn payload<'a>(&self, buf: &'a [u8]) -> Option<&'a [u8]> {
        buf.get(self.range())
    }

    /// Returns a copy of this record with its offset moved by `delta` bytes
    pub fn shifted(self, delta: usize) -> TagRecord {
        TagRecord {
            offset: self.offset + delta,
            ..self
        }
    }
}

/// Iterator over the records of a tag list in stream order.
///
/// Yields `Err(TagError::Malformed)` for a record whose payload runs past the end of the
/// buffer and stops afterwards.
pub struct Tags<'a, B> {
    cursor: Cursor<&'a [u8]>,
    done: bool,
    byte_order: PhantomData<B>,
}

impl<'a, B: ByteOrder> Tags<'a, B> {
    pub fn new(buf: &'a [u8]) -> Tags<'a, B> {
        Tags {
            cursor: Cursor::new(buf),
            done: false,
            byte_order: PhantomData,
        }
    }
}

impl<'a, B: ByteOrder> Iterator for Tags<'a, B> {
    type Item = Result<TagRecord, TagError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let buf_len = self.cursor.get_ref().len();

        // A short read means fewer than four bytes are left, which can't hold a node
        let node = match self.cursor.read_u32::<B>() {
            Ok(node) => node,
            Err(_) => {
                self.done = true;
                return None;
            }
        };

        // Tag list ends with a null node
        if node == 0 {
            self.done = true;
            return None;
        }

        let id = (node & 0xFFFF) as u16;
        let len = (node >> 16) as u16;
        let offset = self.cursor.position() as usize;
        let available = buf_len - offset;

        if len as usize > available {
            self.done = true;

            return Some(Err(TagError::Malformed {
                id,
                offset,
                len,
                available,
            }));
        }

        // Payloads are padded to the next word boundary
        let padded = (len as usize + TAG_NODE_SIZE - 1) & !(TAG_NODE_SIZE - 1);
        self.cursor.set_position((offset + padded) as u64);

        Some(Ok(TagRecord { id, offset, len }))
    }
}

/// Finds the first record with the given `id` in `buf`.
///
/// Non-matching records are skipped without looking at their payload, so a bogus length on
/// one of them merely ends the walk. A matching record that doesn't fit in `buf` is reported as
/// `TagError::Malformed`.
pub fn find<B: ByteOrder>(buf: &[u8], id: u16) -> Result<TagRecord, TagError> {
    for record in Tags::<B>::new(buf) {
        match record {
            Ok(record) if record.id == id => return Ok(record),
            Ok(_) => {}
            Err(err @ TagError::Malformed { id: bad_id, .. }) if bad_id == id => return Err(err),
            Err(err) => {
                debug!("Stopping tag walk: {}", err);
                break;
            }
        }
    }

    Err(TagError::NotFound(id))
}

/// Index of every record in a tag list, keyed by tag id.
///
/// Built with a single forward scan. When an id occurs more than once, the first occurrence
/// wins.
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    records: Vec<TagRecord>,
    by_id: HashMap<u16, usize>,
}

impl TagIndex {
    pub fn build<B: ByteOrder>(buf: &[u8]) -> TagIndex {
        let mut index = TagIndex::default();

        for record in Tags::<B>::new(buf) {
            match record {
                Ok(record) => {
                    if index.by_id.contains_key(&record.id) {
                        debug!(
                            "Ignoring duplicate tag {:#04x} at offset {:#x}",
                            record.id, record.offset
                        );
                        continue;
                    }

                    index.by_id.insert(record.id, index.records.len());
                    index.records.push(record);
                }
                Err(err) => debug!("Stopping tag scan: {}", err),
            }
        }

        index
    }

    /// Looks up the first record with the given `id`
    pub fn get(&self, id: u16) -> Result<TagRecord, TagError> {
        self.by_id
            .get(&id)
            .map(|&idx| self.records[idx])
            .ok_or(TagError::NotFound(id))
    }

    /// Iterates over the indexed records in stream order
    pub fn iter(&self) -> impl Iterator<Item = &TagRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use byteorder::{BigEndian, LittleEndian};
    use hex_literal::hex;

    use super::*;

    // id 0x05 len 3 "abc" + pad, id 0x0b len 4, id 0x05 again, terminator
    const TAGS: [u8; 28] = hex!(
        "05 00 03 00 61 62 63 00
         0b 00 04 00 01 02 03 04
         05 00 02 00 78 79 00 00
         00 00 00 00"
    );

    #[test]
    fn it_should_find_first_occurrence() {
        let rec = find::<LittleEndian>(&TAGS, 0x05).unwrap();

        assert_eq!(
            rec,
            TagRecord {
                id: 0x05,
                offset: 4,
                len: 3
            }
        );
        assert_eq!(rec.payload(&TAGS).unwrap(), b"abc");

        let rec = find::<LittleEndian>(&TAGS, 0x0b).unwrap();

        assert_eq!(rec.offset, 12);
        assert_eq!(rec.payload(&TAGS).unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn it_should_report_missing_tags() {
        assert_eq!(
            find::<LittleEndian>(&TAGS, 0x16),
            Err(TagError::NotFound(0x16))
        );
        assert_eq!(find::<LittleEndian>(&[], 0x16), Err(TagError::NotFound(0x16)));
    }

    #[test]
    fn it_should_stop_at_terminator() {
        let buf = hex!("00 00 00 00 05 00 01 00 ff 00 00 00");

        assert_eq!(find::<LittleEndian>(&buf, 0x05), Err(TagError::NotFound(0x05)));
    }

    #[test]
    fn it_should_ignore_trailing_fragment() {
        let buf = hex!("05 00 01 00 ff 00 00 00 0b 00");

        assert_eq!(find::<LittleEndian>(&buf, 0x0b), Err(TagError::NotFound(0x0b)));
        assert_eq!(find::<LittleEndian>(&buf, 0x05).unwrap().len, 1);
    }

    #[test]
    fn it_should_reject_overlong_matching_record() {
        let buf = hex!("05 00 10 00 61 62 63 00");

        assert_eq!(
            find::<LittleEndian>(&buf, 0x05),
            Err(TagError::Malformed {
                id: 0x05,
                offset: 4,
                len: 0x10,
                available: 4
            })
        );
    }

    #[test]
    fn it_should_not_read_past_overlong_record() {
        // The overlong record hides everything after it
        let buf = hex!("03 00 ff 7f 0b 00 00 00 05 00 01 00 aa 00 00 00");

        assert_eq!(find::<LittleEndian>(&buf, 0x05), Err(TagError::NotFound(0x05)));
    }

    #[test]
    fn it_should_honor_byte_order() {
        let buf = hex!("00 02 00 21 de ad 00 00");
        let rec = find::<BigEndian>(&buf, 0x21).unwrap();

        assert_eq!(rec.len, 2);
        assert_eq!(rec.payload(&buf).unwrap(), &[0xde, 0xad]);
        assert!(find::<LittleEndian>(&buf, 0x21).is_err());
    }

    #[test]
    fn it_should_index_in_stream_order() {
        let index = TagIndex::build::<LittleEndian>(&TAGS);
        let ids: Vec<u16> = index.iter().map(|rec| rec.id).collect();

        assert_eq!(ids, vec![0x05, 0x0b]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(0x05).unwrap().offset, 4);
        assert_eq!(index.get(0x26), Err(TagError::NotFound(0x26)));
    }

    #[test]
    fn it_should_agree_with_find() {
        let index = TagIndex::build::<LittleEndian>(&TAGS);

        for id in 0..0x30 {
            assert_eq!(index.get(id), find::<LittleEndian>(&TAGS, id));
        }
    }

    #[test]
    fn it_should_index_until_malformed_record() {
        let buf = hex!("0b 00 01 00 aa 00 00 00 05 00 09 00 61 62");
        let index = TagIndex::build::<LittleEndian>(&buf);

        assert_eq!(index.len(), 1);
        assert!(index.get(0x0b).is_ok());
        assert!(index.get(0x05).is_err());
    }
}
