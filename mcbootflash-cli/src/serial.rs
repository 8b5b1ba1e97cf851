//! Serial port selection and connection settings.
//!
//! The port comes from `--port`/`MCBOOTFLASH_PORT`, then the config files,
//! then the single serial port present on the system. Anything else is a
//! usage error, so scripts never end up talking to the wrong device.

use {
    crate::{Cli, CliError, config::Config},
    anyhow::Result,
    log::debug,
    mcbootflash::{PortInfo, SerialConfig, port::DEFAULT_BAUD_RATE, port::DEFAULT_TIMEOUT},
    std::time::Duration,
};

fn usage_err(message: String) -> anyhow::Error {
    CliError::Usage(message).into()
}

fn config_err(message: String) -> anyhow::Error {
    CliError::Config(message).into()
}

/// Build the serial settings for a command that talks to the device.
pub(crate) fn serial_config(cli: &Cli, config: &Config) -> Result<SerialConfig> {
    use mcbootflash::{NativePortEnumerator, PortEnumerator};

    serial_config_with(cli, config, NativePortEnumerator::list_ports)
}

/// Build the serial settings, enumerating ports with `list_ports` only when
/// no port was named.
pub(crate) fn serial_config_with<F>(cli: &Cli, config: &Config, list_ports: F) -> Result<SerialConfig>
where
    F: FnOnce() -> mcbootflash::Result<Vec<PortInfo>>,
{
    let port = select_port(cli.port.as_deref(), config, list_ports)?;

    let baud = match (cli.baud, config.connection.baud) {
        (Some(baud), _) => baud,
        (None, Some(0)) => return Err(config_err("configured baud rate must be non-zero".into())),
        (None, Some(baud)) => baud,
        (None, None) => DEFAULT_BAUD_RATE,
    };

    let timeout = match (cli.timeout, config.connection.timeout) {
        (Some(timeout), _) => timeout,
        (None, Some(secs)) => parse_timeout_secs(secs).map_err(config_err)?,
        (None, None) => DEFAULT_TIMEOUT,
    };

    debug!("Serial settings: {port} @ {baud} baud, timeout {timeout:?}");
    Ok(SerialConfig::new(port, baud).with_timeout(timeout))
}

/// Pick the port to open.
fn select_port<F>(explicit: Option<&str>, config: &Config, list_ports: F) -> Result<String>
where
    F: FnOnce() -> mcbootflash::Result<Vec<PortInfo>>,
{
    if let Some(port_name) = explicit {
        return Ok(port_name.to_string());
    }

    if let Some(port_name) = &config
        .connection
        .port
    {
        debug!("Using port from config: {port_name}");
        return Ok(port_name.clone());
    }

    let ports = list_ports()?;
    select_single_port(ports)
}

fn select_single_port(mut ports: Vec<PortInfo>) -> Result<String> {
    match ports.len() {
        0 => Err(usage_err(
            "no serial ports found; connect the device or pass --port".into(),
        )),
        1 => {
            let name = ports
                .swap_remove(0)
                .name;
            debug!("Auto-selected port: {name}");
            Ok(name)
        },
        _ => {
            let names: Vec<&str> = ports
                .iter()
                .map(|p| p.name.as_str())
                .collect();
            Err(usage_err(format!(
                "multiple serial ports found ({}); select one with --port",
                names.join(", ")
            )))
        },
    }
}

/// Turn a timeout in seconds into a `Duration`, rejecting zero, negative
/// and non-finite values.
pub(crate) fn parse_timeout_secs(secs: f64) -> Result<Duration, String> {
    if secs <= 0.0 {
        return Err(format!("timeout must be positive, got {secs}"));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid timeout {secs}: {e}"))
}
