//! Command-line interface for the SPM8821 voltage-control daemon.
//!
//! Talks to `vrd` over its HTTP API. Voltages are given and shown in
//! millivolts.

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};

use spm8821_vr::{
    api_client::{Client, DEFAULT_BASE_URL},
    config::parse_u8,
    types::Voltage,
};

/// Read and program SPM8821 rail voltages
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the vrd API
    #[arg(long, env = "SPM8821_API_URL", default_value = DEFAULT_BASE_URL)]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the voltage of one rail
    Get {
        /// Rail name, e.g. dcdc1 or ldo5
        rail: String,
    },
    /// Program a rail and show the voltage read back
    Set {
        rail: String,
        /// Target in millivolts, fractions allowed (e.g. 1187.5)
        #[arg(value_parser = parse_millivolts)]
        millivolts: u32,
    },
    /// Show every rail
    List,
    /// Show driver and device identification
    Info,
    /// Read a raw register
    ReadReg {
        /// Register address, decimal or 0x hex
        #[arg(value_parser = parse_byte)]
        address: u8,
    },
    /// Write a raw register and show the value read back
    WriteReg {
        #[arg(value_parser = parse_byte)]
        address: u8,
        #[arg(value_parser = parse_byte)]
        value: u8,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let client = Client::with_base_url(args.url);

    match args.command {
        Command::Get { rail } => {
            let reading = client.get_voltage(&rail).await?;
            println!("{}: {}", reading.name, Voltage::from_uv(reading.microvolts));
        }
        Command::Set { rail, millivolts } => {
            let result = client.set_voltage(&rail, millivolts).await?;
            let requested = Voltage::from_uv(result.requested_microvolts);
            let actual = Voltage::from_uv(result.microvolts);
            if requested == actual {
                println!("{}: {}", result.name, actual);
            } else {
                println!("{}: {} (requested {})", result.name, actual, requested);
            }
        }
        Command::List => {
            println!(
                "{:<6} {:<5} {:<5} {:>5}  {:>21}  {:>10}",
                "RAIL", "BANK", "CLASS", "REG", "RANGE", "VOLTAGE"
            );
            for rail in client.list_rails().await? {
                let range = format!(
                    "{} - {}",
                    Voltage::from_uv(rail.min_microvolts),
                    Voltage::from_uv(rail.max_microvolts)
                );
                let voltage = match (rail.microvolts, &rail.error) {
                    (Some(uv), _) => Voltage::from_uv(uv).to_string(),
                    (None, Some(e)) => format!("error: {}", e),
                    (None, None) => "-".to_string(),
                };
                println!(
                    "{:<6} {:<5} {:<5} {:>#5x}  {:>21}  {:>10}",
                    rail.name,
                    rail.bank.as_str(),
                    rail.class.as_str(),
                    rail.register,
                    range,
                    voltage
                );
            }
        }
        Command::Info => {
            let info = client.info().await?;
            println!("Chip:    {}", info.chip);
            println!("Driver:  {} {}", info.driver, info.version);
            println!("Bus:     i2c-{}", info.i2c_bus);
            println!("Address: {:#04x}", info.i2c_address);
        }
        Command::ReadReg { address } => {
            let reg = client.read_register(address).await?;
            println!("{:#04x}: {:#04x}", reg.address, reg.value);
        }
        Command::WriteReg { address, value } => {
            let reg = client.write_register(address, value).await?;
            if reg.value != value {
                eprintln!("warning: wrote {:#04x}, read back {:#04x}", value, reg.value);
            }
            println!("{:#04x}: {:#04x}", reg.address, reg.value);
        }
    }

    Ok(())
}

/// Parse a decimal millivolt value into microvolts.
///
/// Up to three fractional digits are accepted; `1187.5` is 1187500 uV.
fn parse_millivolts(s: &str) -> Result<u32> {
    let s = s.trim();
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    if whole.is_empty() && frac.is_empty() {
        bail!("empty voltage");
    }
    if frac.len() > 3 {
        bail!("millivolts have at most three decimal places");
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        bail!("not a decimal millivolt value: {:?}", s);
    }

    let whole: u32 = if whole.is_empty() { 0 } else { whole.parse()? };
    let frac: u32 = if frac.is_empty() {
        0
    } else {
        format!("{:0<3}", frac).parse()?
    };

    whole
        .checked_mul(1000)
        .and_then(|uv| uv.checked_add(frac))
        .ok_or_else(|| anyhow::anyhow!("voltage out of range: {} mV", s))
}

fn parse_byte(s: &str) -> Result<u8> {
    parse_u8(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_millivolts() {
        assert_eq!(parse_millivolts("900").unwrap(), 900_000);
        assert_eq!(parse_millivolts("1187.5").unwrap(), 1_187_500);
        assert_eq!(parse_millivolts("1.001").unwrap(), 1_001);
        assert_eq!(parse_millivolts(".5").unwrap(), 500);
        assert_eq!(parse_millivolts("3300.").unwrap(), 3_300_000);
    }

    #[test]
    fn rejects_bad_millivolts() {
        assert!(parse_millivolts("").is_err());
        assert!(parse_millivolts(".").is_err());
        assert!(parse_millivolts("-5").is_err());
        assert!(parse_millivolts("1.2345").is_err());
        assert!(parse_millivolts("1e3").is_err());
        assert!(parse_millivolts("5000000").is_err());
    }

    #[test]
    fn parses_command_line() {
        let args = Args::try_parse_from(["vrctl", "set", "ldo5", "1800"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Set { ref rail, millivolts: 1_800_000 } if rail == "ldo5"
        ));

        let args = Args::try_parse_from(["vrctl", "write-reg", "0x48", "140"]).unwrap();
        assert!(matches!(
            args.command,
            Command::WriteReg { address: 0x48, value: 140 }
        ));

        assert!(Args::try_parse_from(["vrctl", "set", "ldo5", "abc"]).is_err());
    }
}
