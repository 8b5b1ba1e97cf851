//! Flash command implementation.

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use mcbootflash::HexImage;
use std::fs;
use std::path::Path;

use crate::commands::connect;
use crate::config::Config;
use crate::{Cli, use_fancy_output};

/// Load an Intel HEX file.
///
/// Read failures stay plain I/O errors so they are not mistaken for
/// device failures.
fn load_image(hexfile: &Path) -> Result<HexImage> {
    let text = fs::read_to_string(hexfile)
        .with_context(|| format!("Failed to read HEX file {}", hexfile.display()))?;
    HexImage::parse(&text).with_context(|| format!("Failed to load HEX file {}", hexfile.display()))
}

fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet || !use_fancy_output() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(0);
    #[allow(clippy::unwrap_used)] // Static template string
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}",
            )
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
    pb
}

/// Flash command implementation.
pub(crate) fn cmd_flash(cli: &Cli, config: &Config, hexfile: &Path, reset: bool) -> Result<()> {
    if !cli.quiet {
        eprintln!("{} Loading {}", style("📦").cyan(), hexfile.display());
    }
    let image = load_image(hexfile)?;

    let mut bootloader = connect(cli, config, cli.quiet)?;

    let pb = progress_bar(cli.quiet);
    pb.set_message("Flashing");
    let result = bootloader.flash(&image, |written, total| {
        pb.set_length(total as u64);
        pb.set_position(written as u64);
    });
    if let Err(err) = result {
        pb.abandon();
        return Err(err).context("Flashing failed");
    }
    pb.finish_with_message("Complete");

    if reset || config.flash.reset_after {
        if !cli.quiet {
            eprintln!("{} Resetting device", style("🔄").cyan());
        }
        bootloader
            .reset()
            .context("Failed to reset device")?;
    }

    if !cli.quiet {
        eprintln!("\n{} Flashing completed", style("🎉").green().bold());
    }

    Ok(())
}
