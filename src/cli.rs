use std::path::PathBuf;
use std::str::FromStr;

use structopt::StructOpt;

/// Byte order of the 32-bit words in the segment
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ByteOrderOpt {
    Little,
    Big,
    Native,
}

impl FromStr for ByteOrderOpt {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "little" | "le" => Ok(ByteOrderOpt::Little),
            "big" | "be" => Ok(ByteOrderOpt::Big),
            "native" => Ok(ByteOrderOpt::Native),
            _ => Err(format!("unknown byte order {:?}", s)),
        }
    }
}

#[derive(StructOpt, Debug)]
pub enum Command {
    /// List the attributes present in the hard config
    List,
    /// Print a text attribute
    Show {
        /// The attribute name, e.g. board_serial
        #[structopt(required = true)]
        name: String,
    },
    /// List every raw tag in the segment
    Tags,
    /// Unpack the WLAN calibration data
    #[structopt(name = "wlan-data")]
    WlanData(WlanDataOpts),
    /// Write every attribute to its own file in a directory
    Export {
        /// The directory to write the attributes to
        #[structopt(required = true)]
        dir: PathBuf,
    },
}

#[derive(StructOpt, Debug)]
pub struct WlanDataOpts {
    /// Offset into the decoded data
    #[structopt(long = "offset", default_value = "0")]
    pub offset: usize,
    /// Maximum number of bytes to output
    #[structopt(long = "count")]
    pub count: Option<usize>,
    /// The name of the file to save the data to, stdout when omitted
    #[structopt(short = "o", long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(StructOpt, Debug)]
pub struct Opts {
    #[structopt(subcommand)]
    pub command: Command,

    /// A dump of the hard_config partition. The MTD partition is used when omitted
    #[structopt(env = "HARD_CONFIG", short = "i", long = "input")]
    pub input: Option<PathBuf>,

    /// The name of the MTD partition holding the hard config
    #[structopt(env = "HARD_CONFIG_MTD", long = "mtd", default_value = "hard_config")]
    pub mtd: String,

    /// Byte order of the segment: little, big or native
    #[structopt(
        env = "HARD_CONFIG_BYTE_ORDER",
        short = "e",
        long = "byte-order",
        default_value = "native"
    )]
    pub byte_order: ByteOrderOpt,
}
