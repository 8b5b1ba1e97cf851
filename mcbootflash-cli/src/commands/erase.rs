//! Erase and reset command implementations.

use anyhow::{Context, Result};
use console::style;
use mcbootflash::EraseOptions;

use crate::Cli;
use crate::commands::connect;
use crate::config::Config;

/// Erase command implementation.
pub(crate) fn cmd_erase(cli: &Cli, config: &Config, force: bool, no_verify: bool) -> Result<()> {
    let mut bootloader = connect(cli, config, cli.quiet)?;

    if !cli.quiet {
        eprintln!("{} Erasing program memory", style("🗑").red());
    }
    bootloader
        .erase_all(EraseOptions {
            force,
            verify: !no_verify,
        })
        .context("Erase failed")?;

    if !cli.quiet {
        eprintln!("\n{} Erase completed", style("✓").green().bold());
    }

    Ok(())
}

/// Reset command implementation.
pub(crate) fn cmd_reset(cli: &Cli, config: &Config) -> Result<()> {
    let mut bootloader = connect(cli, config, cli.quiet)?;
    bootloader
        .reset()
        .context("Failed to reset device")?;

    if !cli.quiet {
        eprintln!("{} Device reset", style("🔄").cyan());
    }

    Ok(())
}
