//! Reader for the MikroTik RouterBoot `hard_config` flash segment.
//!
//! # Examples
//!
//! ```no_run
//! use byteorder::BigEndian;
//! use rb_hardconfig::flash::{FileSegment, MtdTable};
//! use rb_hardconfig::HardConfig;
//!
//! let table = MtdTable::load()?;
//! let mut flash = FileSegment::open_mtd(table.find("hard_config")?)?;
//! let hc = HardConfig::<BigEndian>::from_flash(&mut flash)?;
//!
//! print!("{}", hc.render("board_product_code")?);
//! let _caldata = hc.wlan_data()?;
//!
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
pub mod flash;
pub mod hardconfig;
pub mod routerboot;

pub use error::{InitError, ReadError};
pub use hardconfig::{BinAttr, HardConfig, Publish, TextAttr};
pub use routerboot::TagId;
