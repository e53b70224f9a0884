//! Voltage control service.
//!
//! The only component that touches the bus. Callers name rails by string;
//! the service resolves the name, converts voltages through the codec and
//! runs the bus transactions against the bound PMIC.
//!
//! All operations on one service are serialized: a set is a write, a settle
//! delay and a read-back, and nothing else may reach the bus in between.

use std::time::Duration;

use tokio::sync::Mutex;

use crate::{
    error::{Result, VrError},
    hw_trait::{BoxedI2c, HwError},
    peripheral::spm8821::Spm8821,
    rail::Rail,
    tracing::prelude::*,
    types::Voltage,
};

/// Time the regulator output needs after a voltage write before a read-back
/// reflects the new setting.
pub const DEFAULT_SETTLE: Duration = Duration::from_micros(150);

/// Shortest settle handed to the runtime timer. Tokio timers tick in whole
/// milliseconds, so anything shorter sleeps on a blocking thread instead.
const TIMER_RESOLUTION: Duration = Duration::from_millis(1);

/// The bound PMIC, erased over its transport.
pub type BoundPmic = Spm8821<BoxedI2c>;

/// Voltage of one rail as seen by [`VoltageService::list_rails`].
#[derive(Debug)]
pub struct RailReading {
    pub rail: Rail,
    pub voltage: std::result::Result<Voltage, HwError>,
}

/// Serialized access to the PMIC's voltage registers.
pub struct VoltageService {
    pmic: Mutex<Option<BoundPmic>>,
    settle: Duration,
}

impl VoltageService {
    /// Create a service with no device bound.
    ///
    /// Every operation fails with [`VrError::Unbound`] until [`bind`] is
    /// called.
    ///
    /// [`bind`]: VoltageService::bind
    pub fn new(settle: Duration) -> Self {
        Self {
            pmic: Mutex::new(None),
            settle,
        }
    }

    /// Create a service already bound to a device.
    pub fn with_pmic(pmic: BoundPmic, settle: Duration) -> Self {
        Self {
            pmic: Mutex::new(Some(pmic)),
            settle,
        }
    }

    /// Bind a device, replacing any previous binding.
    pub async fn bind(&self, pmic: BoundPmic) {
        debug!(address = format!("{:#04x}", pmic.address()), "PMIC bound");
        *self.pmic.lock().await = Some(pmic);
    }

    /// Release the bound device, if any.
    ///
    /// Requests arriving afterwards fail with [`VrError::Unbound`].
    pub async fn unbind(&self) -> Option<BoundPmic> {
        let pmic = self.pmic.lock().await.take();
        if pmic.is_some() {
            debug!("PMIC unbound");
        }
        pmic
    }

    pub async fn is_bound(&self) -> bool {
        self.pmic.lock().await.is_some()
    }

    /// Read the voltage of the named rail.
    pub async fn get_voltage(&self, name: &str) -> Result<Voltage> {
        let rail: Rail = name.parse()?;
        self.read_rail(rail).await
    }

    /// Set the voltage of the named rail and return the resulting voltage.
    ///
    /// The returned value is read back from the register after the settle
    /// delay. It differs from `target` whenever the target is not exactly
    /// representable or lies outside the rail's range.
    pub async fn set_voltage(&self, name: &str, target: Voltage) -> Result<Voltage> {
        let rail: Rail = name.parse()?;
        self.write_rail(rail, target).await
    }

    pub async fn read_rail(&self, rail: Rail) -> Result<Voltage> {
        let mut guard = self.pmic.lock().await;
        let pmic = guard.as_mut().ok_or(VrError::Unbound)?;

        Ok(pmic.read_voltage(rail).await?)
    }

    pub async fn write_rail(&self, rail: Rail, target: Voltage) -> Result<Voltage> {
        let mut guard = self.pmic.lock().await;
        let pmic = guard.as_mut().ok_or(VrError::Unbound)?;

        let code = pmic.write_voltage(rail, target).await?;
        settle(self.settle).await;
        let actual = pmic.read_voltage(rail).await?;

        info!(
            rail = %rail,
            requested = %target,
            actual = %actual,
            code = format!("{:#04x}", code),
            "Voltage set"
        );
        Ok(actual)
    }

    /// Read every rail in register order.
    ///
    /// A failed read is reported for that rail alone; only an unbound
    /// service fails the whole listing.
    pub async fn list_rails(&self) -> Result<Vec<RailReading>> {
        let mut guard = self.pmic.lock().await;
        let pmic = guard.as_mut().ok_or(VrError::Unbound)?;

        let mut readings = Vec::with_capacity(Rail::ALL.len());
        for rail in Rail::ALL {
            let voltage = pmic.read_voltage(rail).await;
            if let Err(e) = &voltage {
                warn!(rail = %rail, error = %e, "Rail read failed");
            }
            readings.push(RailReading { rail, voltage });
        }
        Ok(readings)
    }

    /// Read an arbitrary register.
    pub async fn read_register(&self, reg: u8) -> Result<u8> {
        let mut guard = self.pmic.lock().await;
        let pmic = guard.as_mut().ok_or(VrError::Unbound)?;

        Ok(pmic.read_register(reg).await?)
    }

    /// Write an arbitrary register and return its value read back.
    pub async fn write_register(&self, reg: u8, value: u8) -> Result<u8> {
        let mut guard = self.pmic.lock().await;
        let pmic = guard.as_mut().ok_or(VrError::Unbound)?;

        pmic.write_register(reg, value).await?;
        let readback = pmic.read_register(reg).await?;
        info!(
            register = format!("{:#04x}", reg),
            value = format!("{:#04x}", value),
            readback = format!("{:#04x}", readback),
            "Register written"
        );
        Ok(readback)
    }
}

/// Wait for a regulator output to settle.
async fn settle(delay: Duration) {
    if delay.is_zero() {
        return;
    }
    if delay >= TIMER_RESOLUTION {
        tokio::time::sleep(delay).await;
        return;
    }
    if tokio::task::spawn_blocking(move || std::thread::sleep(delay))
        .await
        .is_err()
    {
        tokio::time::sleep(delay).await;
    }
}
