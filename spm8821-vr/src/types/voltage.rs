//! Voltage type for regulator setpoints and readings.
//!
//! Stores voltage internally as integer microvolts, the unit the register
//! codec and the external API both use, with convenience methods for
//! coarser units.
//!
//! # Example
//!
//! ```
//! use spm8821_vr::types::Voltage;
//!
//! let v = Voltage::from_mv(1200);
//! assert_eq!(v.uv(), 1_200_000);
//! assert_eq!(v.mv(), 1200);
//! assert_eq!(v.to_string(), "1200.0 mV");
//! ```

use std::fmt;

/// Voltage in microvolts.
///
/// A unit-aware voltage type following the pattern of `std::time::Duration`.
/// Stores microvolts internally; convert on access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Voltage {
    uv: u32,
}

impl Voltage {
    /// Create voltage from microvolts.
    pub const fn from_uv(uv: u32) -> Self {
        Self { uv }
    }

    /// Create voltage from millivolts.
    pub const fn from_mv(mv: u32) -> Self {
        Self {
            uv: mv.saturating_mul(1_000),
        }
    }

    /// Get voltage in microvolts.
    pub const fn uv(&self) -> u32 {
        self.uv
    }

    /// Get voltage in whole millivolts, truncating.
    pub const fn mv(&self) -> u32 {
        self.uv / 1_000
    }

    /// Get voltage in volts.
    pub fn volts(&self) -> f32 {
        self.uv as f32 / 1_000_000.0
    }
}

// Millivolts with one decimal, the resolution regulator tables are
// usually quoted in.
impl fmt::Display for Voltage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} mV", self.uv / 1_000, (self.uv % 1_000) / 100)
    }
}
