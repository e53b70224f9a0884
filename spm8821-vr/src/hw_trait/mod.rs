//! Hardware abstraction traits.
//!
//! Chip drivers in this crate are written against these traits rather than a
//! concrete bus, so the same driver runs over Linux i2c-dev in production
//! and over an in-memory register file in tests.

pub mod i2c;
#[cfg(test)]
pub mod mock;

use thiserror::Error;

pub use i2c::{BoxedI2c, I2c, I2cError};

/// Errors raised by hardware access.
#[derive(Error, Debug)]
pub enum HwError {
    /// I2C bus transaction failed
    #[error("I2C error: {0}")]
    I2c(#[from] I2cError),

    /// Operating system I/O error from the underlying device node
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenient Result type for hardware access.
pub type Result<T> = std::result::Result<T, HwError>;
