//! I2C bus interface.

use async_trait::async_trait;
use thiserror::Error;

use super::Result;

/// I2C-specific failures.
///
/// Transports map their native status codes to these variants where a
/// mapping exists and pass everything else through as `Other`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum I2cError {
    /// Device did not acknowledge its address or a data byte
    #[error("no acknowledge from device 0x{0:02x}")]
    Nack(u8),

    /// Another master won arbitration
    #[error("arbitration lost")]
    ArbitrationLost,

    /// Transaction did not complete within the bus timeout
    #[error("bus timeout")]
    Timeout,

    /// Anything else the transport reports
    #[error("{0}")]
    Other(String),
}

/// I2C bus master.
///
/// Every method is one complete bus transaction. Addresses are 7-bit.
#[async_trait]
pub trait I2c: Send {
    /// START - ADDR(W) - DATA - STOP
    async fn write(&mut self, addr: u8, data: &[u8]) -> Result<()>;

    /// START - ADDR(R) - DATA - STOP
    async fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<()>;

    /// Write then read with a repeated START in between.
    ///
    /// This is the usual way to read a register: write its address, then
    /// read its contents.
    async fn write_read(&mut self, addr: u8, write: &[u8], read: &mut [u8]) -> Result<()>;
}

/// Type-erased bus, used where the concrete transport is chosen at runtime.
pub type BoxedI2c = Box<dyn I2c>;

#[async_trait]
impl<T: I2c + ?Sized> I2c for Box<T> {
    async fn write(&mut self, addr: u8, data: &[u8]) -> Result<()> {
        (**self).write(addr, data).await
    }

    async fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<()> {
        (**self).read(addr, buffer).await
    }

    async fn write_read(&mut self, addr: u8, write: &[u8], read: &mut [u8]) -> Result<()> {
        (**self).write_read(addr, write, read).await
    }
}
