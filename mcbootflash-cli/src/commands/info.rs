//! Bootloader info and port listing command implementations.

use {
    anyhow::{Context, Result},
    console::style,
    mcbootflash::{BootAttributes, NativePortEnumerator, Port, PortEnumerator, PortInfo},
    serde::Serialize,
};

use crate::{Cli, commands::connect, config::Config};

/// Everything `info` reports about a connected device.
#[derive(Debug, Serialize)]
struct DeviceInfo<'a> {
    port: &'a str,
    #[serde(flatten)]
    attributes: &'a BootAttributes,
    program_start: u32,
    program_end: u32,
}

/// Info command implementation.
///
/// With `json`, stdout carries exactly one JSON document and nothing is
/// printed to it on failure.
pub(crate) fn cmd_info(cli: &Cli, config: &Config, json: bool) -> Result<()> {
    let bootloader = connect(cli, config, cli.quiet || json)?;
    let range = bootloader.memory_range();
    let info = DeviceInfo {
        port: bootloader
            .port()
            .name(),
        attributes: bootloader.attributes(),
        program_start: range.start,
        program_end: range.end,
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&info).context("Failed to serialize device info")?
        );
        return Ok(());
    }

    print_device_info(&info);
    Ok(())
}

fn print_device_info(info: &DeviceInfo<'_>) {
    let attrs = info.attributes;
    eprintln!("\n{}", style("Bootloader").bold().underlined());
    eprintln!("  Port:              {}", info.port);
    eprintln!("  Version:           {:#06x}", attrs.version);
    eprintln!("  Device ID:         {:#06x}", attrs.device_id);
    eprintln!("  Max packet length: {}", attrs.max_packet_length);
    eprintln!("  Erase size:        {}", attrs.erase_size);
    eprintln!("  Write size:        {}", attrs.write_size);
    eprintln!(
        "  Program memory:    {:#08x}..{:#08x} (words)",
        info.program_start, info.program_end
    );
}

/// List ports command implementation.
pub(crate) fn cmd_list_ports(json: bool) -> Result<()> {
    let ports = NativePortEnumerator::list_ports().context("Failed to enumerate serial ports")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&ports).context("Failed to serialize port list")?
        );
        return Ok(());
    }

    eprintln!("{}", style("Available serial ports").bold().underlined());

    if ports.is_empty() {
        eprintln!("  {}", style("No serial ports found").dim());
    } else {
        for port in &ports {
            eprintln!("  {} {}", style("•").green(), describe_port(port));
        }
    }

    Ok(())
}

/// One-line human description of a port.
fn describe_port(port: &PortInfo) -> String {
    let mut line = style(&port.name)
        .cyan()
        .to_string();
    if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
        line.push_str(&format!(" ({vid:04X}:{pid:04X})"));
    }
    if let Some(product) = port
        .product
        .as_deref()
        .filter(|p| !p.is_empty())
    {
        line.push_str(&format!(" - {}", style(product).dim()));
    }
    line
}
