//! API data transfer objects.
//!
//! These types define the API contract shared between the server and
//! clients. Voltages cross the wire as integer microvolts.

use serde::{Deserialize, Serialize};

use crate::{codec::RegulatorClass, rail::Bank};

/// Driver and device identification.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct DriverInfo {
    pub chip: String,
    pub driver: String,
    pub version: String,
    pub i2c_bus: u32,
    pub i2c_address: u8,
}

/// Current voltage of one rail.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct RailVoltage {
    pub name: String,
    pub microvolts: u32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SetVoltageRequest {
    pub microvolts: u32,
}

/// Outcome of a set: the voltage actually programmed, read back from the
/// device, next to what was asked for.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct SetVoltageResponse {
    pub name: String,
    pub requested_microvolts: u32,
    pub microvolts: u32,
}

/// One entry of the rail listing.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct RailState {
    pub name: String,
    pub bank: Bank,
    pub class: RegulatorClass,
    pub register: u8,
    pub min_microvolts: u32,
    pub max_microvolts: u32,
    /// Current voltage, or null if the read failed.
    pub microvolts: Option<u32>,
    /// Why the read failed, if it did.
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegisterValue {
    pub address: u8,
    pub value: u8,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct WriteRegisterRequest {
    pub value: u8,
}

/// Body of every non-2xx response.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorBody {
    /// Machine-readable kind: `unknown_rail`, `bad_request`,
    /// `transport_error` or `unbound`.
    pub error: String,
    pub message: String,
}
