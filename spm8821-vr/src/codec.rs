//! Voltage register codec.
//!
//! Converts between physical voltages and the one-byte voltage-select
//! codes held in the SPM8821 regulator registers. The encoding depends on
//! the regulator class:
//!
//! | Class | Code range  | Voltage             | Step  |
//! |-------|-------------|---------------------|-------|
//! | Buck  | 0..=170     | 500..=1350 mV       | 5 mV  |
//! | Buck  | 171..=254   | 1375..=3450 mV      | 25 mV |
//! | LDO   | 11..=127    | 500..=3400 mV       | 25 mV |
//!
//! LDO codes are 7 bits wide; bit 7 is reserved and ignored on decode, and
//! codes below 11 all select the 500 mV floor.
//!
//! Out-of-range voltages saturate to the nearest end of the table instead
//! of being rejected. The regulator clamps out-of-range selections the same
//! way, and drivers layered on top rely on that.

use serde::{Deserialize, Serialize};

use crate::types::Voltage;

/// Lowest voltage either class can produce, in millivolts.
const FLOOR_MV: u32 = 500;

mod buck {
    /// Top of the 5 mV region.
    pub const FINE_MAX_MV: u32 = 1350;
    pub const FINE_STEP_MV: u32 = 5;
    pub const FINE_MAX_CODE: u8 = 170;

    /// Bottom and top of the 25 mV region.
    pub const COARSE_MIN_MV: u32 = 1375;
    pub const COARSE_MAX_MV: u32 = 3450;
    pub const COARSE_STEP_MV: u32 = 25;
    pub const COARSE_MIN_CODE: u8 = 171;

    pub const MAX_CODE: u8 = 254;
}

mod ldo {
    pub const MAX_MV: u32 = 3400;
    pub const STEP_MV: u32 = 25;
    /// Code selecting the 500 mV floor.
    pub const MIN_CODE: u8 = 0x0B;
    pub const MAX_CODE: u8 = 0x7F;
    pub const CODE_MASK: u8 = 0x7F;
}

/// Regulator class, selecting which encoding curve applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegulatorClass {
    /// Switching regulator with a two-region encoding.
    Buck,
    /// Linear low-dropout regulator with a single 25 mV region.
    Ldo,
}

impl RegulatorClass {
    /// Encode a voltage into this class's register code.
    pub fn encode(self, voltage: Voltage) -> u8 {
        encode(voltage, self)
    }

    /// Decode a register code of this class into a voltage.
    pub fn decode(self, code: u8) -> Voltage {
        decode(code, self)
    }

    /// Lowest voltage this class can select.
    pub const fn min_voltage(self) -> Voltage {
        Voltage::from_mv(FLOOR_MV)
    }

    /// Highest voltage this class can select.
    pub const fn max_voltage(self) -> Voltage {
        match self {
            Self::Buck => Voltage::from_mv(buck::COARSE_MAX_MV),
            Self::Ldo => Voltage::from_mv(ldo::MAX_MV),
        }
    }

    /// Code written for voltages below the floor.
    pub const fn min_code(self) -> u8 {
        match self {
            Self::Buck => 0,
            Self::Ldo => ldo::MIN_CODE,
        }
    }

    /// Code written for voltages at or above the ceiling.
    pub const fn max_code(self) -> u8 {
        match self {
            Self::Buck => buck::MAX_CODE,
            Self::Ldo => ldo::MAX_CODE,
        }
    }

    /// Lower-case name, as used in the API.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buck => "buck",
            Self::Ldo => "ldo",
        }
    }
}

/// Encode a voltage into a register code, saturating at both ends.
///
/// The voltage is truncated to whole millivolts first, then rounded down to
/// the step of the region it falls in. Voltages strictly between the top of
/// the Buck fine region (1350 mV) and the bottom of the coarse region
/// (1375 mV) select 1375 mV.
pub fn encode(voltage: Voltage, class: RegulatorClass) -> u8 {
    let mv = voltage.mv();

    if mv < FLOOR_MV {
        return class.min_code();
    }

    match class {
        RegulatorClass::Buck => {
            if mv <= buck::FINE_MAX_MV {
                ((mv - FLOOR_MV) / buck::FINE_STEP_MV) as u8
            } else if mv <= buck::COARSE_MAX_MV {
                let steps = mv.saturating_sub(buck::COARSE_MIN_MV) / buck::COARSE_STEP_MV;
                buck::COARSE_MIN_CODE + steps as u8
            } else {
                buck::MAX_CODE
            }
        }
        RegulatorClass::Ldo => {
            if mv <= ldo::MAX_MV {
                let steps = (mv - FLOOR_MV) / ldo::STEP_MV;
                (ldo::MIN_CODE + steps as u8).min(ldo::MAX_CODE)
            } else {
                ldo::MAX_CODE
            }
        }
    }
}

/// Decode a register code into the voltage it selects.
pub fn decode(code: u8, class: RegulatorClass) -> Voltage {
    let mv = match class {
        RegulatorClass::Buck => {
            if code <= buck::FINE_MAX_CODE {
                FLOOR_MV + code as u32 * buck::FINE_STEP_MV
            } else if code <= buck::MAX_CODE {
                buck::COARSE_MIN_MV
                    + (code - buck::COARSE_MIN_CODE) as u32 * buck::COARSE_STEP_MV
            } else {
                buck::COARSE_MAX_MV
            }
        }
        RegulatorClass::Ldo => {
            let code = code & ldo::CODE_MASK;
            if code < ldo::MIN_CODE {
                FLOOR_MV
            } else {
                FLOOR_MV + (code - ldo::MIN_CODE) as u32 * ldo::STEP_MV
            }
        }
    };

    Voltage::from_mv(mv)
}
