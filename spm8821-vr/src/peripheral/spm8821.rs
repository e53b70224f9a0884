//! SPM8821 power management IC driver.
//!
//! The SPM8821 is the PMIC paired with SpacemiT K1/M1 SoCs. It provides six
//! buck converters and eleven LDOs, each with a one-byte voltage-select
//! register on I2C. This driver reads and writes those registers directly,
//! independent of the kernel regulator framework and its constraints.

use crate::{
    codec,
    hw_trait::{BoxedI2c, Result, i2c::I2c},
    rail::Rail,
    tracing::prelude::*,
    types::Voltage,
};

/// I2C bus the PMIC sits on for SpacemiT K1 reference boards.
pub const DEFAULT_BUS: u32 = 8;

/// Default I2C address for the SPM8821.
pub const DEFAULT_ADDRESS: u8 = 0x41;

/// Protocol dissection utilities for the SPM8821.
pub mod protocol {
    use crate::{codec, rail::Rail};

    /// Chip model reported by the API.
    pub const CHIP_MODEL: &str = "SPM8821";

    /// Get register name from address.
    pub fn register_name(addr: u8) -> String {
        match Rail::from_register(addr) {
            Some(rail) => format!(
                "{}{}_VSEL",
                rail.bank().as_str().to_uppercase(),
                rail.bank_index() + 1
            ),
            None => format!("REG[0x{:02x}]", addr),
        }
    }

    /// Decode a register value, showing the voltage if it is a rail register.
    pub fn decode_value(addr: u8, value: u8) -> String {
        match Rail::from_register(addr) {
            Some(rail) => format!(
                "0x{:02x} ({}, {})",
                value,
                codec::decode(value, rail.class()),
                rail
            ),
            None => format!("0x{:02x}", value),
        }
    }

    /// Format an SPM8821 register transaction.
    pub fn format_transaction(reg: u8, value: u8, is_read: bool) -> String {
        if is_read {
            format!("-> READ {}={}", register_name(reg), decode_value(reg, value))
        } else {
            format!("<- WRITE {}={}", register_name(reg), decode_value(reg, value))
        }
    }
}

/// SPM8821 driver
pub struct Spm8821<I: I2c> {
    i2c: I,
    address: u8,
}

impl<I: I2c> Spm8821<I> {
    /// Create a new SPM8821 driver with default address
    pub fn new(i2c: I) -> Self {
        Self {
            i2c,
            address: DEFAULT_ADDRESS,
        }
    }

    /// Create a new SPM8821 driver with custom address
    pub fn new_with_address(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Erase the transport type.
    pub fn boxed(self) -> Spm8821<BoxedI2c>
    where
        I: 'static,
    {
        Spm8821 {
            i2c: Box::new(self.i2c),
            address: self.address,
        }
    }

    /// Read a rail's current voltage setting.
    pub async fn read_voltage(&mut self, rail: Rail) -> Result<Voltage> {
        let code = self.read_register(rail.register()).await?;
        Ok(codec::decode(code, rail.class()))
    }

    /// Program a rail's voltage, returning the code written.
    ///
    /// The target is quantized and saturated by the codec; this never
    /// rejects a voltage. It does not wait for the output to settle.
    pub async fn write_voltage(&mut self, rail: Rail, target: Voltage) -> Result<u8> {
        let code = codec::encode(target, rail.class());
        self.write_register(rail.register(), code).await?;
        Ok(code)
    }

    /// Read one register.
    pub async fn read_register(&mut self, reg: u8) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.i2c.write_read(self.address, &[reg], &mut buf).await?;
        trace!("{}", protocol::format_transaction(reg, buf[0], true));
        Ok(buf[0])
    }

    /// Write one register.
    pub async fn write_register(&mut self, reg: u8, value: u8) -> Result<()> {
        trace!("{}", protocol::format_transaction(reg, value, false));
        self.i2c.write(self.address, &[reg, value]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw_trait::{
        HwError, I2cError,
        mock::{MockI2c, Transaction},
    };

    fn driver() -> (MockI2c, Spm8821<MockI2c>) {
        let mock = MockI2c::new(DEFAULT_ADDRESS);
        (mock.clone(), Spm8821::new(mock))
    }

    #[tokio::test]
    async fn reads_buck_voltage() {
        let (mock, mut pmic) = driver();
        mock.set_register(0x48, 140);

        let v = pmic.read_voltage(Rail::Dcdc1).await.unwrap();
        assert_eq!(v.uv(), 1_200_000);
        assert_eq!(
            mock.transactions(),
            vec![Transaction::WriteRead {
                addr: DEFAULT_ADDRESS,
                write: vec![0x48],
                len: 1
            }]
        );
    }

    #[tokio::test]
    async fn reads_ldo_voltage_from_second_bank() {
        let (mock, mut pmic) = driver();
        mock.set_register(0x7A, 63);

        let v = pmic.read_voltage(Rail::Ldo11).await.unwrap();
        assert_eq!(v.uv(), 1_800_000);
    }

    #[tokio::test]
    async fn writes_encoded_voltage() {
        let (mock, mut pmic) = driver();

        let code = pmic
            .write_voltage(Rail::Ldo4, Voltage::from_mv(3300))
            .await
            .unwrap();
        assert_eq!(code, 123);
        assert_eq!(mock.register(0x65), 123);
        assert_eq!(
            mock.transactions(),
            vec![Transaction::Write {
                addr: DEFAULT_ADDRESS,
                data: vec![0x65, 123]
            }]
        );
    }

    #[tokio::test]
    async fn write_saturates_instead_of_failing() {
        let (mock, mut pmic) = driver();

        let code = pmic
            .write_voltage(Rail::Dcdc2, Voltage::from_mv(5000))
            .await
            .unwrap();
        assert_eq!(code, 254);
        assert_eq!(mock.register(0x4B), 254);
    }

    #[tokio::test]
    async fn custom_address_is_used() {
        let mock = MockI2c::new(0x42);
        let mut pmic = Spm8821::new_with_address(mock.clone(), 0x42);
        assert_eq!(pmic.address(), 0x42);

        pmic.write_register(0x10, 0xAA).await.unwrap();
        assert_eq!(pmic.read_register(0x10).await.unwrap(), 0xAA);
    }

    #[tokio::test]
    async fn boxed_driver_keeps_address() {
        let mock = MockI2c::new(0x42);
        let mut pmic = Spm8821::new_with_address(mock.clone(), 0x42).boxed();
        assert_eq!(pmic.address(), 0x42);

        pmic.write_voltage(Rail::Dcdc6, Voltage::from_mv(1800))
            .await
            .unwrap();
        assert_eq!(mock.register(0x57), 188);
    }

    #[tokio::test]
    async fn propagates_bus_errors() {
        let (mock, mut pmic) = driver();
        mock.fail_next(I2cError::Timeout);

        let err = pmic.read_voltage(Rail::Dcdc1).await.unwrap_err();
        assert!(matches!(err, HwError::I2c(I2cError::Timeout)));
    }

    #[test]
    fn register_names() {
        assert_eq!(protocol::register_name(0x48), "BUCK1_VSEL");
        assert_eq!(protocol::register_name(0x65), "ALDO4_VSEL");
        assert_eq!(protocol::register_name(0x68), "DLDO1_VSEL");
        assert_eq!(protocol::register_name(0x49), "REG[0x49]");
    }

    #[test]
    fn formats_transactions() {
        assert_eq!(
            protocol::format_transaction(0x48, 140, true),
            "-> READ BUCK1_VSEL=0x8c (1200.0 mV, dcdc1)"
        );
        assert_eq!(
            protocol::format_transaction(0x00, 0x01, false),
            "<- WRITE REG[0x00]=0x01"
        );
    }
}
