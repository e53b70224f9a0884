//! Peripheral chip drivers.
//!
//! Drivers for board power-management ICs. All drivers are generic over
//! the hw_trait interfaces.

pub mod spm8821;
