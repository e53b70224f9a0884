//! Physical transport layer for the PMIC connection.
//!
//! This module binds the driver to a concrete bus. Binding is the only
//! place where the bus and device are discovered; once it succeeds the
//! resulting handle is owned by the control service for the life of the
//! process.

pub mod i2c_dev;

use std::io;

use thiserror::Error;

pub use i2c_dev::LinuxI2c;

/// Failures while binding to the PMIC.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The I2C adapter does not exist or cannot be opened
    #[error("I2C bus {bus} not available: {source}")]
    BusNotFound {
        bus: u32,
        #[source]
        source: io::Error,
    },

    /// The adapter exists but nothing answers at the address
    #[error("no device at address 0x{address:02x} on I2C bus {bus}")]
    DeviceNotFound { bus: u32, address: u8 },
}
