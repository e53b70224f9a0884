//! Rail directory for the SPM8821.
//!
//! Maps externally visible rail names onto voltage-select registers. Names
//! are parsed once at the boundary into a [`Rail`]; everything downstream
//! works with the enum and never sees a string again.
//!
//! The chip has three regulator banks, each a run of voltage registers
//! three bytes apart:
//!
//! | Bank | Rails          | Base | Class |
//! |------|----------------|------|-------|
//! | Buck | dcdc1..dcdc6   | 0x48 | Buck  |
//! | ALDO | ldo1..ldo4     | 0x5C | LDO   |
//! | DLDO | ldo5..ldo11    | 0x68 | LDO   |
//!
//! The two LDO banks share one external numbering. Datasheet bank names
//! (`buckN`, `aldoN`, `dldoN`) are accepted as aliases.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::RegulatorClass;

/// Distance between consecutive voltage registers within a bank.
pub const REG_STRIDE: u8 = 3;

/// Physical regulator bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bank {
    Buck,
    Aldo,
    Dldo,
}

impl Bank {
    /// Voltage register of the first rail in the bank.
    pub const fn base(self) -> u8 {
        match self {
            Self::Buck => 0x48,
            Self::Aldo => 0x5C,
            Self::Dldo => 0x68,
        }
    }

    /// Number of rails in the bank.
    pub const fn len(self) -> u8 {
        match self {
            Self::Buck => 6,
            Self::Aldo => 4,
            Self::Dldo => 7,
        }
    }

    pub const fn class(self) -> RegulatorClass {
        match self {
            Self::Buck => RegulatorClass::Buck,
            Self::Aldo | Self::Dldo => RegulatorClass::Ldo,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buck => "buck",
            Self::Aldo => "aldo",
            Self::Dldo => "dldo",
        }
    }
}

/// A voltage rail of the SPM8821.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rail {
    Dcdc1,
    Dcdc2,
    Dcdc3,
    Dcdc4,
    Dcdc5,
    Dcdc6,
    Ldo1,
    Ldo2,
    Ldo3,
    Ldo4,
    Ldo5,
    Ldo6,
    Ldo7,
    Ldo8,
    Ldo9,
    Ldo10,
    Ldo11,
}

impl Rail {
    /// Every rail, in register order.
    pub const ALL: [Rail; 17] = [
        Rail::Dcdc1,
        Rail::Dcdc2,
        Rail::Dcdc3,
        Rail::Dcdc4,
        Rail::Dcdc5,
        Rail::Dcdc6,
        Rail::Ldo1,
        Rail::Ldo2,
        Rail::Ldo3,
        Rail::Ldo4,
        Rail::Ldo5,
        Rail::Ldo6,
        Rail::Ldo7,
        Rail::Ldo8,
        Rail::Ldo9,
        Rail::Ldo10,
        Rail::Ldo11,
    ];

    /// Number of Buck-family rails ahead of the LDO family in [`Rail::ALL`].
    const DCDC_COUNT: u8 = 6;

    /// Look up a buck rail by its 1-based ordinal.
    pub fn dcdc(ordinal: u8) -> Option<Rail> {
        match ordinal {
            1..=Self::DCDC_COUNT => Some(Self::ALL[(ordinal - 1) as usize]),
            _ => None,
        }
    }

    /// Look up an LDO rail by its 1-based ordinal.
    pub fn ldo(ordinal: u8) -> Option<Rail> {
        match ordinal {
            1..=11 => Some(Self::ALL[(Self::DCDC_COUNT + ordinal - 1) as usize]),
            _ => None,
        }
    }

    /// Look up a rail by physical bank and 1-based position within it.
    pub fn in_bank(bank: Bank, position: u8) -> Option<Rail> {
        if position == 0 || position > bank.len() {
            return None;
        }
        match bank {
            Bank::Buck => Self::dcdc(position),
            Bank::Aldo => Self::ldo(position),
            Bank::Dldo => Self::ldo(position + Bank::Aldo.len()),
        }
    }

    /// Canonical name, matching the Linux regulator names on the board.
    pub const fn name(self) -> &'static str {
        match self {
            Rail::Dcdc1 => "dcdc1",
            Rail::Dcdc2 => "dcdc2",
            Rail::Dcdc3 => "dcdc3",
            Rail::Dcdc4 => "dcdc4",
            Rail::Dcdc5 => "dcdc5",
            Rail::Dcdc6 => "dcdc6",
            Rail::Ldo1 => "ldo1",
            Rail::Ldo2 => "ldo2",
            Rail::Ldo3 => "ldo3",
            Rail::Ldo4 => "ldo4",
            Rail::Ldo5 => "ldo5",
            Rail::Ldo6 => "ldo6",
            Rail::Ldo7 => "ldo7",
            Rail::Ldo8 => "ldo8",
            Rail::Ldo9 => "ldo9",
            Rail::Ldo10 => "ldo10",
            Rail::Ldo11 => "ldo11",
        }
    }

    /// Physical bank holding this rail's register.
    pub const fn bank(self) -> Bank {
        match self {
            Rail::Dcdc1 | Rail::Dcdc2 | Rail::Dcdc3 | Rail::Dcdc4 | Rail::Dcdc5 | Rail::Dcdc6 => {
                Bank::Buck
            }
            Rail::Ldo1 | Rail::Ldo2 | Rail::Ldo3 | Rail::Ldo4 => Bank::Aldo,
            _ => Bank::Dldo,
        }
    }

    /// 0-based position within the bank.
    pub const fn bank_index(self) -> u8 {
        let index = self as u8;
        match self.bank() {
            Bank::Buck => index,
            Bank::Aldo => index - Self::DCDC_COUNT,
            Bank::Dldo => index - Self::DCDC_COUNT - Bank::Aldo.len(),
        }
    }

    pub const fn class(self) -> RegulatorClass {
        self.bank().class()
    }

    /// Voltage-select register address.
    pub const fn register(self) -> u8 {
        self.bank().base() + self.bank_index() * REG_STRIDE
    }

    /// Find the rail whose voltage register is `addr`.
    pub fn from_register(addr: u8) -> Option<Rail> {
        Self::ALL.into_iter().find(|rail| rail.register() == addr)
    }
}

impl fmt::Display for Rail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name that does not resolve to a rail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown rail {0:?}")]
pub struct UnknownRail(pub String);

impl FromStr for Rail {
    type Err = UnknownRail;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        parse(name).ok_or_else(|| UnknownRail(name.to_string()))
    }
}

fn parse(name: &str) -> Option<Rail> {
    let split = name.find(|c: char| c.is_ascii_digit())?;
    let (family, digits) = name.split_at(split);

    // One or two digits, no sign, no leading zero.
    if digits.len() > 2 || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let ordinal: u8 = digits.parse().ok()?;

    match family {
        "dcdc" => Rail::dcdc(ordinal),
        "ldo" => Rail::ldo(ordinal),
        "buck" => Rail::in_bank(Bank::Buck, ordinal),
        "aldo" => Rail::in_bank(Bank::Aldo, ordinal),
        "dldo" => Rail::in_bank(Bank::Dldo, ordinal),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("dcdc1", 0x48, RegulatorClass::Buck; "dcdc1")]
    #[test_case("dcdc2", 0x4B, RegulatorClass::Buck; "dcdc2")]
    #[test_case("dcdc6", 0x57, RegulatorClass::Buck; "dcdc6")]
    #[test_case("ldo1", 0x5C, RegulatorClass::Ldo; "ldo1 first aldo")]
    #[test_case("ldo4", 0x5C + 3 * 3, RegulatorClass::Ldo; "ldo4 last aldo")]
    #[test_case("ldo5", 0x68, RegulatorClass::Ldo; "ldo5 first dldo")]
    #[test_case("ldo9", 0x74, RegulatorClass::Ldo; "ldo9")]
    #[test_case("ldo10", 0x77, RegulatorClass::Ldo; "ldo10 two digits")]
    #[test_case("ldo11", 0x68 + 6 * 3, RegulatorClass::Ldo; "ldo11 last dldo")]
    fn resolves(name: &str, register: u8, class: RegulatorClass) {
        let rail: Rail = name.parse().unwrap();
        assert_eq!(rail.register(), register);
        assert_eq!(rail.class(), class);
        assert_eq!(rail.name(), name);
    }

    #[test_case("buck1", Rail::Dcdc1; "buck1")]
    #[test_case("buck6", Rail::Dcdc6; "buck6")]
    #[test_case("aldo1", Rail::Ldo1; "aldo1")]
    #[test_case("aldo4", Rail::Ldo4; "aldo4")]
    #[test_case("dldo1", Rail::Ldo5; "dldo1")]
    #[test_case("dldo7", Rail::Ldo11; "dldo7")]
    fn resolves_aliases(name: &str, expect: Rail) {
        assert_eq!(name.parse::<Rail>(), Ok(expect));
    }

    #[test_case(""; "empty")]
    #[test_case("ldo"; "missing ordinal")]
    #[test_case("ldo0"; "ldo ordinal zero")]
    #[test_case("ldo12"; "ldo ordinal past end")]
    #[test_case("dcdc0"; "dcdc ordinal zero")]
    #[test_case("dcdc7"; "dcdc ordinal past end")]
    #[test_case("buck7"; "buck alias past end")]
    #[test_case("aldo5"; "aldo alias past end")]
    #[test_case("dldo8"; "dldo alias past end")]
    #[test_case("dldo0"; "dldo alias zero")]
    #[test_case("ldo01"; "leading zero")]
    #[test_case("ldo111"; "three digits")]
    #[test_case("ldo1x"; "trailing garbage")]
    #[test_case("ldo1 "; "trailing space")]
    #[test_case(" ldo1"; "leading space")]
    #[test_case("LDO1"; "upper case")]
    #[test_case("ldo-1"; "negative ordinal")]
    #[test_case("vdd1"; "unknown family")]
    #[test_case("42"; "bare number")]
    fn rejects(name: &str) {
        assert_eq!(name.parse::<Rail>(), Err(UnknownRail(name.to_string())));
    }

    #[test]
    fn canonical_names_round_trip() {
        for rail in Rail::ALL {
            assert_eq!(rail.name().parse::<Rail>(), Ok(rail));
            assert_eq!(rail.to_string(), rail.name());
        }
    }

    #[test]
    fn registers_are_unique() {
        let mut registers: Vec<u8> = Rail::ALL.iter().map(|rail| rail.register()).collect();
        registers.sort_unstable();
        registers.dedup();
        assert_eq!(registers.len(), Rail::ALL.len());
    }

    #[test]
    fn registers_stay_inside_their_bank() {
        for rail in Rail::ALL {
            let bank = rail.bank();
            let offset = rail.register() - bank.base();
            assert_eq!(offset % REG_STRIDE, 0, "{rail}");
            assert!(offset / REG_STRIDE < bank.len(), "{rail}");
        }
    }

    #[test]
    fn from_register_inverts_register() {
        for rail in Rail::ALL {
            assert_eq!(Rail::from_register(rail.register()), Some(rail));
        }
        assert_eq!(Rail::from_register(0x49), None);
        assert_eq!(Rail::from_register(0x00), None);
    }

    #[test]
    fn ordinal_lookups() {
        assert_eq!(Rail::dcdc(3), Some(Rail::Dcdc3));
        assert_eq!(Rail::dcdc(0), None);
        assert_eq!(Rail::ldo(11), Some(Rail::Ldo11));
        assert_eq!(Rail::ldo(12), None);
        assert_eq!(Rail::in_bank(Bank::Dldo, 2), Some(Rail::Ldo6));
        assert_eq!(Rail::in_bank(Bank::Aldo, 0), None);
    }
}
