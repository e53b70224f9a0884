//! Linux i2c-dev transport.
//!
//! Talks to `/dev/i2c-N` with the `I2C_RDWR` ioctl, which carries the
//! target address in each message. Unlike `I2C_SLAVE` it works while a
//! kernel driver is bound to the device, which is the normal situation for
//! a PMIC owned by the regulator framework.

use std::{
    fs::{File, OpenOptions},
    os::fd::AsRawFd,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use nix::errno::Errno;

use super::TransportError;
use crate::{
    hw_trait::{HwError, I2cError, Result, i2c::I2c},
    peripheral::spm8821::Spm8821,
    rail::Rail,
    tracing::prelude::*,
};

/// Combined-transfer ioctl number from `<linux/i2c-dev.h>`.
const I2C_RDWR: u16 = 0x0707;

/// Message flag marking a read segment.
const I2C_M_RD: u16 = 0x0001;

/// `struct i2c_msg` from `<linux/i2c.h>`.
#[repr(C)]
struct I2cMsg {
    addr: u16,
    flags: u16,
    len: u16,
    buf: *mut u8,
}

/// `struct i2c_rdwr_ioctl_data` from `<linux/i2c-dev.h>`.
#[repr(C)]
struct I2cRdwrIoctlData {
    msgs: *mut I2cMsg,
    nmsgs: u32,
}

nix::ioctl_write_ptr_bad!(i2c_rdwr, I2C_RDWR, I2cRdwrIoctlData);

/// One segment of a combined transfer.
enum Segment {
    Write(Vec<u8>),
    Read(usize),
}

/// I2C adapter opened through `/dev/i2c-N`.
#[derive(Clone)]
pub struct LinuxI2c {
    file: Arc<File>,
}

impl LinuxI2c {
    /// Open the adapter for `bus`.
    pub fn open(bus: u32) -> std::result::Result<Self, TransportError> {
        let path = device_path(bus);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| TransportError::BusNotFound { bus, source })?;

        debug!(path = %path.display(), "Opened I2C adapter");
        Ok(Self {
            file: Arc::new(file),
        })
    }

    /// Run the segments as one transaction with repeated STARTs between
    /// them, returning the bytes of every read segment concatenated.
    async fn transfer(&self, addr: u8, segments: Vec<Segment>) -> Result<Vec<u8>> {
        let file = self.file.clone();

        tokio::task::spawn_blocking(move || transfer_blocking(&file, addr, segments))
            .await
            .map_err(|e| HwError::I2c(I2cError::Other(format!("transfer task failed: {}", e))))?
    }
}

fn device_path(bus: u32) -> PathBuf {
    PathBuf::from(format!("/dev/i2c-{}", bus))
}

/// sysfs node the kernel creates for an instantiated client.
fn sysfs_client_path(bus: u32, address: u8) -> PathBuf {
    PathBuf::from(format!("/sys/bus/i2c/devices/{}-{:04x}", bus, address))
}

fn transfer_blocking(file: &File, addr: u8, mut segments: Vec<Segment>) -> Result<Vec<u8>> {
    let mut msgs: Vec<I2cMsg> = segments
        .iter_mut()
        .map(|segment| match segment {
            Segment::Write(data) => I2cMsg {
                addr: addr as u16,
                flags: 0,
                len: data.len() as u16,
                buf: data.as_mut_ptr(),
            },
            Segment::Read(len) => I2cMsg {
                addr: addr as u16,
                flags: I2C_M_RD,
                len: *len as u16,
                buf: std::ptr::null_mut(),
            },
        })
        .collect();

    let mut read_buffers: Vec<Vec<u8>> = msgs
        .iter()
        .filter(|msg| msg.flags & I2C_M_RD != 0)
        .map(|msg| vec![0u8; msg.len as usize])
        .collect();
    for (msg, buffer) in msgs
        .iter_mut()
        .filter(|msg| msg.flags & I2C_M_RD != 0)
        .zip(read_buffers.iter_mut())
    {
        msg.buf = buffer.as_mut_ptr();
    }

    let data = I2cRdwrIoctlData {
        msgs: msgs.as_mut_ptr(),
        nmsgs: msgs.len() as u32,
    };

    // SAFETY: every message points into a buffer owned by `segments` or
    // `read_buffers`, both of which outlive the call, and each `len`
    // matches its buffer.
    unsafe { i2c_rdwr(file.as_raw_fd(), &data) }.map_err(|errno| map_errno(errno, addr))?;

    Ok(read_buffers.concat())
}

fn map_errno(errno: Errno, addr: u8) -> HwError {
    match errno {
        Errno::ENXIO | Errno::EREMOTEIO => HwError::I2c(I2cError::Nack(addr)),
        Errno::ETIMEDOUT => HwError::I2c(I2cError::Timeout),
        Errno::EAGAIN => HwError::I2c(I2cError::ArbitrationLost),
        other => HwError::Io(other.into()),
    }
}

#[async_trait]
impl I2c for LinuxI2c {
    async fn write(&mut self, addr: u8, data: &[u8]) -> Result<()> {
        self.transfer(addr, vec![Segment::Write(data.to_vec())])
            .await?;
        Ok(())
    }

    async fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<()> {
        let data = self.transfer(addr, vec![Segment::Read(buffer.len())]).await?;
        buffer.copy_from_slice(&data);
        Ok(())
    }

    async fn write_read(&mut self, addr: u8, write: &[u8], read: &mut [u8]) -> Result<()> {
        let data = self
            .transfer(
                addr,
                vec![Segment::Write(write.to_vec()), Segment::Read(read.len())],
            )
            .await?;
        read.copy_from_slice(&data);
        Ok(())
    }
}

/// Bind the SPM8821 driver to `address` on `bus`.
///
/// Fails if the adapter does not exist, or if the device is neither known
/// to the kernel nor answering a probe read of its first voltage register.
pub async fn bind(bus: u32, address: u8) -> std::result::Result<Spm8821<LinuxI2c>, TransportError> {
    let i2c = LinuxI2c::open(bus)?;
    let mut pmic = Spm8821::new_with_address(i2c, address);

    let sysfs = sysfs_client_path(bus, address);
    if Path::new(&sysfs).exists() {
        debug!(path = %sysfs.display(), "Found PMIC in sysfs");
        return Ok(pmic);
    }

    match pmic.read_register(Rail::Dcdc1.register()).await {
        Ok(_) => {
            debug!("PMIC answered probe read");
            Ok(pmic)
        }
        Err(e) => {
            debug!(error = %e, "PMIC probe read failed");
            Err(TransportError::DeviceNotFound { bus, address })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths() {
        assert_eq!(device_path(8), PathBuf::from("/dev/i2c-8"));
        assert_eq!(
            sysfs_client_path(8, 0x41),
            PathBuf::from("/sys/bus/i2c/devices/8-0041")
        );
    }

    #[test]
    fn errno_mapping() {
        assert!(matches!(
            map_errno(Errno::ENXIO, 0x41),
            HwError::I2c(I2cError::Nack(0x41))
        ));
        assert!(matches!(
            map_errno(Errno::EREMOTEIO, 0x41),
            HwError::I2c(I2cError::Nack(0x41))
        ));
        assert!(matches!(
            map_errno(Errno::ETIMEDOUT, 0x41),
            HwError::I2c(I2cError::Timeout)
        ));
        assert!(matches!(
            map_errno(Errno::EAGAIN, 0x41),
            HwError::I2c(I2cError::ArbitrationLost)
        ));
        match map_errno(Errno::EIO, 0x41) {
            HwError::Io(e) => assert_eq!(e.raw_os_error(), Some(Errno::EIO as i32)),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn missing_bus_is_reported() {
        let err = LinuxI2c::open(u32::MAX).err().unwrap();
        assert!(matches!(err, TransportError::BusNotFound { bus: u32::MAX, .. }));
    }
}
