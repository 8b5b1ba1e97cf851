//! mcbootflash CLI - Command-line tool for flashing devices running
//! Microchip's MCC 16-bit bootloader.
//!
//! ## Features
//!
//! - Flash Intel HEX firmware images
//! - Erase program memory
//! - Reset the device into its application
//! - Query bootloader attributes
//! - Shell completion generation
//! - Environment variable and config file support

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use console::style;
use env_logger::Env;
use log::debug;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Whether stderr is a terminal (set once at startup).
static STDERR_IS_TTY: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

/// Check if emoji/animations should be used (TTY and colors enabled).
fn use_fancy_output() -> bool {
    STDERR_IS_TTY.load(std::sync::atomic::Ordering::Relaxed) && console::colors_enabled_stderr()
}

mod commands;
mod config;
mod serial;

use commands::{
    completions::cmd_completions,
    erase::{cmd_erase, cmd_reset},
    flash::cmd_flash,
    info::{cmd_info, cmd_list_ports},
};
use config::Config;

/// Generic runtime failure.
const EXIT_FAILURE: u8 = 1;
/// Bad invocation or no usable port.
const EXIT_USAGE: u8 = 2;
/// Invalid configuration values.
const EXIT_CONFIG: u8 = 3;
/// The device could not be reached or rejected an operation.
const EXIT_DEVICE: u8 = 4;

/// CLI-level failures with a dedicated exit code.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    /// The invocation cannot be carried out as given.
    #[error("{0}")]
    Usage(String),
    /// A configuration value is unusable.
    #[error("{0}")]
    Config(String),
}

/// mcbootflash - Flash firmware to devices running Microchip's MCC 16-bit bootloader.
///
/// Environment variables:
///   MCBOOTFLASH_PORT      - Default serial port
///   MCBOOTFLASH_BAUD      - Default baud rate (default: 115200)
///   MCBOOTFLASH_TIMEOUT   - Default read timeout in seconds (default: 5)
#[derive(Parser)]
#[command(name = "mcbootflash")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = "Config files: ./mcbootflash.toml, then the global config.toml")]
struct Cli {
    /// Serial port to use (auto-detected if not specified).
    #[arg(short, long, global = true, env = "MCBOOTFLASH_PORT")]
    port: Option<String>,

    /// Baud rate [default: 115200].
    #[arg(
        short,
        long,
        global = true,
        env = "MCBOOTFLASH_BAUD",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    baud: Option<u32>,

    /// Read timeout in seconds [default: 5].
    #[arg(
        short,
        long,
        global = true,
        env = "MCBOOTFLASH_TIMEOUT",
        value_name = "SECONDS",
        value_parser = parse_timeout
    )]
    timeout: Option<Duration>,

    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a configuration file.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Flash an Intel HEX firmware image.
    Flash {
        /// Path to the HEX file.
        hexfile: PathBuf,

        /// Reset the device after flashing.
        #[arg(long)]
        reset: bool,
    },

    /// Erase the application from program memory.
    Erase {
        /// Erase even if no application is detected.
        #[arg(long)]
        force: bool,

        /// Skip checking that the application is gone afterwards.
        #[arg(long)]
        no_verify: bool,
    },

    /// Reset the device, starting the application if present.
    Reset,

    /// Show bootloader attributes.
    Info {
        /// Output information as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// List available serial ports.
    ListPorts {
        /// Output port list as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type for completions.
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|e| format!("Invalid timeout: {e}"))?;
    serial::parse_timeout_secs(secs)
}

/// Map an error to the process exit code.
fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return match cli_err {
            CliError::Usage(_) => EXIT_USAGE,
            CliError::Config(_) => EXIT_CONFIG,
        };
    }

    let device_failure = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<mcbootflash::Error>())
        .any(is_device_failure);
    if device_failure {
        EXIT_DEVICE
    } else {
        EXIT_FAILURE
    }
}

/// Whether a library error came from talking to the device, as opposed to
/// a bad image or argument.
fn is_device_failure(err: &mcbootflash::Error) -> bool {
    use mcbootflash::Error;

    err.is_device_error()
        || err.is_connection_error()
        || matches!(
            err,
            Error::MalformedPacket { .. }
                | Error::UnknownCommand(_)
                | Error::ProtocolMismatch(_)
                | Error::EraseVerificationFailed
                | Error::ChecksumMismatch { .. }
                | Error::FlashVerificationFailed
                | Error::Unsupported(_)
        )
}

fn init_logging(cli: &Cli) {
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(if cli.verbose >= 2 {
            Some(env_logger::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();
}

fn main() -> ExitCode {
    // --- NO_COLOR and TTY detection ---
    let stderr_is_tty = console::Term::stderr().is_term();
    STDERR_IS_TTY.store(stderr_is_tty, std::sync::atomic::Ordering::Relaxed);

    if env::var("NO_COLOR").is_ok() || !stderr_is_tty {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let cli = Cli::parse();
    init_logging(&cli);

    debug!(
        "mcbootflash v{} (verbose level: {})",
        env!("CARGO_PKG_VERSION"),
        cli.verbose
    );

    let config = if let Some(ref path) = cli.config_path {
        Config::load_from_path(path)
    } else {
        Config::load()
    };

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", style("Error:").red().bold());
            ExitCode::from(exit_code(&err))
        },
    }
}

fn run(cli: &Cli, config: &Config) -> Result<()> {
    match &cli.command {
        Commands::Flash { hexfile, reset } => cmd_flash(cli, config, hexfile, *reset),
        Commands::Erase { force, no_verify } => cmd_erase(cli, config, *force, *no_verify),
        Commands::Reset => cmd_reset(cli, config),
        Commands::Info { json } => cmd_info(cli, config, *json),
        Commands::ListPorts { json } => cmd_list_ports(*json),
        Commands::Completions { shell } => {
            cmd_completions(*shell);
            Ok(())
        },
    }
}
