use clap::*;
use std::path::PathBuf;

#[derive(Debug, Subcommand)]
pub enum Command {
  /// Create an image from files and directories
  Create {
    /// Path of the image to write
    output: PathBuf,
    /// Files and directories placed in the root of the image
    #[clap(required = true)]
    inputs: Vec<PathBuf>,
    /// Volume label, derived from the first input when omitted
    #[clap(long)]
    label: Option<String>,
    /// El Torito no-emulation boot image
    #[clap(long)]
    boot: Option<PathBuf>,
    /// Number of 512 byte sectors the firmware loads from the boot image
    #[clap(long, default_value_t = isoforge::manifest::DEFAULT_BOOT_LOAD_SIZE)]
    boot_load_size: u32,
    /// Record ISO 9660 names only
    #[clap(long)]
    no_joliet: bool,
  },
}

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
  #[clap(subcommand)]
  pub command: Command,
}

pub fn parse() -> Cli {
  Cli::parse()
}
