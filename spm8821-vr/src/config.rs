//! Daemon configuration.
//!
//! Defaults match the SpacemiT K1 reference boards. Each field can be
//! overridden through an environment variable; nothing is persisted.

use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::{
    api::ApiConfig,
    peripheral::spm8821::{DEFAULT_ADDRESS, DEFAULT_BUS},
    service::DEFAULT_SETTLE,
};

/// I2C adapter number.
pub const ENV_I2C_BUS: &str = "SPM8821_I2C_BUS";
/// 7-bit device address, decimal or `0x` hex.
pub const ENV_I2C_ADDR: &str = "SPM8821_I2C_ADDR";
/// Settle delay after a voltage write, in microseconds.
pub const ENV_SETTLE_US: &str = "SPM8821_SETTLE_US";
/// API listen address.
pub const ENV_API_BIND: &str = "SPM8821_API_BIND";

/// Highest valid 7-bit I2C address.
const MAX_I2C_ADDRESS: u8 = 0x7F;

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub i2c_bus: u32,
    pub i2c_address: u8,
    pub settle: Duration,
    pub api: ApiConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            i2c_bus: DEFAULT_BUS,
            i2c_address: DEFAULT_ADDRESS,
            settle: DEFAULT_SETTLE,
            api: ApiConfig::default(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(bus) = lookup(ENV_I2C_BUS) {
            config.i2c_bus = bus
                .trim()
                .parse()
                .with_context(|| format!("invalid {ENV_I2C_BUS}: {bus:?}"))?;
        }

        if let Some(addr) = lookup(ENV_I2C_ADDR) {
            config.i2c_address =
                parse_address(&addr).with_context(|| format!("invalid {ENV_I2C_ADDR}: {addr:?}"))?;
        }

        if let Some(us) = lookup(ENV_SETTLE_US) {
            let us: u64 = us
                .trim()
                .parse()
                .with_context(|| format!("invalid {ENV_SETTLE_US}: {us:?}"))?;
            config.settle = Duration::from_micros(us);
        }

        if let Some(bind) = lookup(ENV_API_BIND) {
            config.api.bind_addr = bind;
        }

        Ok(config)
    }
}

/// Parse a 7-bit I2C address given in decimal or `0x`-prefixed hex.
pub fn parse_address(s: &str) -> Result<u8> {
    parse_u8(s).and_then(|addr| {
        if addr > MAX_I2C_ADDRESS {
            bail!("address 0x{addr:02x} is not a 7-bit I2C address");
        }
        Ok(addr)
    })
}

/// Parse a byte given in decimal or `0x`-prefixed hex.
pub fn parse_u8(s: &str) -> Result<u8> {
    let s = s.trim();
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16)?,
        None => s.parse()?,
    };
    Ok(value)
}
