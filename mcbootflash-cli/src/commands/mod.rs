//! Command implementations.
//!
//! Each subcommand is implemented in its own module for clean separation.

pub(crate) mod completions;
pub(crate) mod erase;
pub(crate) mod flash;
pub(crate) mod info;

use anyhow::{Context, Result};
use console::style;
use mcbootflash::{Bootloader, NativePort};

use crate::Cli;
use crate::config::Config;
use crate::serial::serial_config;

/// Open the selected port and bring up the bootloader.
///
/// Status lines are suppressed when `quiet` is set.
pub(crate) fn connect(cli: &Cli, config: &Config, quiet: bool) -> Result<Bootloader<NativePort>> {
    let serial = serial_config(cli, config)?;
    if !quiet {
        eprintln!(
            "{} Using port {} at {} baud",
            style("🔌").cyan(),
            serial.port_name,
            serial.baud_rate
        );
        eprintln!("{} Waiting for bootloader...", style("⏳").yellow());
    }

    let bootloader = Bootloader::open(&serial)
        .with_context(|| format!("Failed to connect to bootloader on {}", serial.port_name))?;

    if !quiet {
        eprintln!("{} Connected", style("✓").green());
    }
    Ok(bootloader)
}
