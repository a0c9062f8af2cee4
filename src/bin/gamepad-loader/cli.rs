use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gamepad-loader")]
#[command(about = "Build & flash CLI for the AVR gamepad boards")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Cross-compile a firmware project.
    Build(BuildArgs),

    /// Build a project and program it over serial ISP (avrdude).
    Flash(FlashArgs),

    /// Build the USB interface firmware and flash it over DFU.
    FlashUsb(FlashUsbArgs),

    /// Flash the factory USB-serial image over DFU (no build).
    RestoreUsb(RestoreUsbArgs),

    /// Encode a USB string descriptor as a byte-array literal.
    GenStringDescriptor(GenStringDescriptorArgs),

    /// List the known firmware projects.
    Projects(ProjectsArgs),
}

#[derive(Args, Clone)]
pub struct CommonArgs {
    /// Repository root the project directories live under.
    #[arg(long, default_value = ".")]
    pub project_root: PathBuf,

    /// Emit JSON line events to stdout.
    #[arg(long)]
    pub json: bool,

    /// Reduce output (only errors).
    #[arg(long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// More logs to stderr.
    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Parser)]
pub struct BuildArgs {
    /// Project id (e.g. controller, usb-interface).
    pub project: String,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Parser)]
pub struct FlashArgs {
    /// Project id (e.g. controller).
    pub project: String,

    /// Serial device the board enumerates as.
    #[arg(long, default_value = "/dev/ttyACM0")]
    pub port: String,

    /// avrdude programmer type.
    #[arg(long, default_value = "arduino")]
    pub programmer: String,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Clone)]
pub struct DfuArgs {
    /// Interval between bootloader enumeration polls.
    #[arg(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Max bootloader polls before giving up (0 = wait forever).
    #[arg(long, default_value_t = 0)]
    pub max_polls: u32,
}

#[derive(Parser)]
pub struct FlashUsbArgs {
    #[command(flatten)]
    pub dfu: DfuArgs,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Parser)]
pub struct RestoreUsbArgs {
    #[command(flatten)]
    pub dfu: DfuArgs,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Parser)]
pub struct GenStringDescriptorArgs {
    /// Text to encode; multiple words are joined with single spaces.
    #[arg(required = true)]
    pub text: Vec<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Parser)]
pub struct ProjectsArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}
