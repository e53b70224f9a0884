//! Error types for voltage-control operations.

use thiserror::Error;

use crate::{hw_trait::HwError, rail::UnknownRail};

/// Failures reported by the control service.
#[derive(Error, Debug)]
pub enum VrError {
    /// Name does not resolve to a rail. Caller input error; retrying the
    /// same request cannot succeed.
    #[error("unknown rail: {0:?}")]
    UnknownRail(String),

    /// Bus transaction failed. The transport's own status is carried
    /// through unchanged.
    #[error("transport error: {0}")]
    Transport(#[from] HwError),

    /// No device is bound, either because binding never happened or
    /// because it was released.
    #[error("PMIC is not bound")]
    Unbound,
}

impl From<UnknownRail> for VrError {
    fn from(err: UnknownRail) -> Self {
        Self::UnknownRail(err.0)
    }
}

/// Convenient Result type for voltage-control operations.
pub type Result<T> = std::result::Result<T, VrError>;
