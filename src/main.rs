use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use byteorder::{BigEndian, ByteOrder, LittleEndian, NativeEndian};
use log::{debug, info};
use structopt::StructOpt;

use rb_hardconfig::flash::{FileSegment, FlashSegment, MtdTable};
use rb_hardconfig::routerboot::{TagId, RB_ART_SIZE};
use rb_hardconfig::{BinAttr, HardConfig, Publish, TextAttr};

mod cli;

use cli::{ByteOrderOpt, Command, Opts, WlanDataOpts};

/// Opens either the given dump or the named MTD partition
fn open_segment(opts: &Opts) -> Result<Box<dyn FlashSegment>, anyhow::Error> {
    if let Some(path) = &opts.input {
        let segment = FileSegment::open(path)
            .with_context(|| format!("Failed to open '{}'", path.display()))?;

        return Ok(Box::new(segment));
    }

    let table = MtdTable::load().with_context(|| "Failed to read the MTD partition table")?;
    let partition = table.find(&opts.mtd)?;

    debug!("Using MTD partition {:?}", partition);

    let segment = FileSegment::open_mtd(partition).with_context(|| {
        format!(
            "Failed to open '{}'",
            partition.device_path().as_path().display()
        )
    })?;

    Ok(Box::new(segment))
}

/// Writes every published attribute to a file in a directory
struct DirSink {
    dir: PathBuf,
}

impl DirSink {
    fn write(&self, name: &str, data: &[u8]) -> Result<(), anyhow::Error> {
        let path = self.dir.join(name);

        fs::write(&path, data).with_context(|| format!("Failed to write '{}'", path.display()))
    }
}

impl<B: ByteOrder> Publish<B> for DirSink {
    type Error = anyhow::Error;

    fn text(&mut self, attr: TextAttr<'_, B>) -> Result<(), Self::Error> {
        let shown = attr.show()?;

        self.write(attr.name(), shown.as_bytes())
    }

    fn binary(&mut self, attr: BinAttr<'_, B>) -> Result<(), Self::Error> {
        let data = attr.read(0, RB_ART_SIZE)?;

        self.write(attr.name(), &data)
    }
}

fn wlan_data<B: ByteOrder>(hc: &HardConfig<B>, opts: &WlanDataOpts) -> Result<(), anyhow::Error> {
    let count = opts.count.unwrap_or(RB_ART_SIZE);
    let data = hc
        .render_wlan_data(opts.offset, count)
        .with_context(|| "Failed to unpack WLAN calibration data")?;

    match &opts.output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create '{}'", path.display()))?;
            file.write_all(&data)?;

            println!("Wrote {} bytes to {}", data.len(), path.display());
        }
        None => io::stdout().write_all(&data)?,
    }

    Ok(())
}

fn export<B: ByteOrder>(hc: &HardConfig<B>, dir: &Path) -> Result<(), anyhow::Error> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create '{}'", dir.display()))?;

    let mut sink = DirSink {
        dir: dir.to_path_buf(),
    };
    let published = hc.publish(&mut sink);

    println!("Exported {} attributes to {}", published, dir.display());

    Ok(())
}

fn run<B: ByteOrder>(opts: &Opts) -> Result<(), anyhow::Error> {
    let mut segment = open_segment(opts)?;
    let hc = HardConfig::<B>::from_flash(segment.as_mut())
        .with_context(|| format!("Failed to load hard config from {:?}", segment.name()))?;

    match &opts.command {
        Command::List => {
            for attr in hc.attributes() {
                println!("{}", attr.name);
            }
        }
        Command::Show { name } => {
            let shown = hc
                .render(name)
                .with_context(|| format!("Failed to read attribute {}", name))?;

            print!("{}", shown);
        }
        Command::Tags => {
            use std::convert::TryFrom;

            println!("{:>6} {:>8} {:>6}  name", "id", "offset", "len");

            for tag in hc.tags() {
                let name = TagId::try_from(tag.id)
                    .map(|id| format!("{:?}", id))
                    .unwrap_or_else(|_| "-".to_owned());

                println!(
                    "{:#06x} {:#08x} {:>6}  {}",
                    tag.id, tag.offset, tag.len, name
                );
            }
        }
        Command::WlanData(wlan_opts) => wlan_data(&hc, wlan_opts)?,
        Command::Export { dir } => export(&hc, dir)?,
    }

    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    // Create a logger with a timestamp that logs everything at Info level or above
    pretty_env_logger::init_timed();

    // Parse the command-line arguments
    let opts = Opts::from_args();

    info!("Reading hard config as {:?} endian", opts.byte_order);

    match opts.byte_order {
        ByteOrderOpt::Little => run::<LittleEndian>(&opts),
        ByteOrderOpt::Big => run::<BigEndian>(&opts),
        ByteOrderOpt::Native => run::<NativeEndian>(&opts),
    }
}
