//! Flash segment access
//!
//! The hard config lives in its own flash partition. On a running board that is an MTD
//! character device located through `/proc/mtd`; on a host it is usually a dump of that
//! partition.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::{debug, trace};
use thiserror::Error;

/// A named, fixed-size flash region that can be read at arbitrary offsets
pub trait FlashSegment {
    /// The partition name
    fn name(&self) -> &str;

    /// The size of the segment in bytes
    fn size(&self) -> usize;

    /// Reads into `buf` starting at `offset`, returning the number of bytes read. Fewer bytes
    /// than requested are only returned when the end of the underlying device is reached.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;
}

/// A flash segment backed by a reader, such as a partition dump or an MTD device
#[derive(Debug)]
pub struct FileSegment<R> {
    name: String,
    inner: R,
    size: usize,
}

impl<R: Read + Seek> FileSegment<R> {
    pub fn new<S: Into<String>>(name: S, inner: R, size: usize) -> FileSegment<R> {
        FileSegment {
            name: name.into(),
            inner,
            size,
        }
    }
}

impl FileSegment<File> {
    /// Opens a partition dump, using the file size as the segment size
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<FileSegment<File>> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let size = file.metadata()?.len() as usize;

        debug!("Opened {} ({} bytes)", path.display(), size);

        Ok(FileSegment::new(path.display().to_string(), file, size))
    }

    /// Opens the MTD character device of `partition`
    pub fn open_mtd(partition: &MtdPartition) -> io::Result<FileSegment<File>> {
        let path = partition.device_path();
        let file = File::open(&path)?;

        debug!(
            "Opened {} for partition {:?} ({} bytes)",
            path.display(),
            partition.name,
            partition.size
        );

        Ok(FileSegment::new(
            partition.name.clone(),
            file,
            partition.size as usize,
        ))
    }
}

impl<R: Read + Seek> FlashSegment for FileSegment<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> usize {
        self.size
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.seek(SeekFrom::Start(offset))?;

        let mut read = 0;

        while read < buf.len() {
            match self.inner.read(&mut buf[read..]) {
                Ok(0) => break,
                Ok(n) => read += n,
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }

        trace!("Read {} of {} bytes at {:#x}", read, buf.len(), offset);

        Ok(read)
    }
}

/// `/proc/mtd` parsing errors
#[derive(Error, Debug)]
pub enum MtdError {
    #[error("I/O error: {}", _0)]
    IoError(#[from] io::Error),

    #[error("Malformed MTD table entry: {:?}", _0)]
    MalformedEntry(String),

    #[error("No MTD partition named {:?}", _0)]
    PartitionNotFound(String),
}

/// An entry of the kernel MTD partition table
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MtdPartition {
    pub index: u32,
    pub size: u64,
    pub erase_size: u32,
    pub name: String,
}

impl MtdPartition {
    /// Path of the character device for this partition
    pub fn device_path(&self) -> PathBuf {
        PathBuf::from(format!("/dev/mtd{}", self.index))
    }

    fn parse(line: &str) -> Result<MtdPartition, MtdError> {
        let malformed = || MtdError::MalformedEntry(line.to_owned());

        // mtd3: 00001000 00001000 "hard_config"
        let quote = line.find('"').ok_or_else(malformed)?;
        let (head, name) = line.split_at(quote);
        let mut fields = head.split_whitespace();

        let dev = fields.next().ok_or_else(malformed)?;
        let index = dev
            .strip_prefix("mtd")
            .and_then(|dev| dev.strip_suffix(':'))
            .and_then(|index| index.parse().ok())
            .ok_or_else(malformed)?;

        let size = fields
            .next()
            .and_then(|size| u64::from_str_radix(size, 16).ok())
            .ok_or_else(malformed)?;
        let erase_size = fields
            .next()
            .and_then(|size| u32::from_str_radix(size, 16).ok())
            .ok_or_else(malformed)?;

        if fields.next().is_some() {
            return Err(malformed());
        }

        let name = name
            .trim_end()
            .strip_prefix('"')
            .and_then(|name| name.strip_suffix('"'))
            .ok_or_else(malformed)?;

        Ok(MtdPartition {
            index,
            size,
            erase_size,
            name: name.to_owned(),
        })
    }
}

/// The kernel MTD partition table, as listed in `/proc/mtd`
#[derive(Debug, Clone, Default)]
pub struct MtdTable {
    partitions: Vec<MtdPartition>,
}

impl MtdTable {
    pub const PROC_MTD: &'static str = "/proc/mtd";

    /// Reads and parses `/proc/mtd`
    pub fn load() -> Result<MtdTable, MtdError> {
        Self::parse(&fs::read_to_string(Self::PROC_MTD)?)
    }

    /// Parses the contents of `/proc/mtd`, skipping the header line
    pub fn parse(text: &str) -> Result<MtdTable, MtdError> {
        let partitions = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("dev:"))
            .map(MtdPartition::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MtdTable { partitions })
    }

    /// Finds the first partition named `name`
    pub fn find(&self, name: &str) -> Result<&MtdPartition, MtdError> {
        self.partitions
            .iter()
            .find(|partition| partition.name == name)
            .ok_or_else(|| MtdError::PartitionNotFound(name.to_owned()))
    }

    pub fn partitions(&self) -> &[MtdPartition] {
        &self.partitions
    }
}
