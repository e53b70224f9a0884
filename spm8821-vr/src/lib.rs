//! Direct voltage control for the SpacemiT SPM8821 PMIC.
//!
//! The driver programs the PMIC's voltage-select registers over I2C,
//! independently of the kernel regulator framework. [`service`] holds the
//! request-facing operations; [`daemon`] and [`api`] expose them over HTTP
//! for the `vrctl` tool.

pub mod api;
pub mod api_client;
pub mod codec;
pub mod config;
pub mod daemon;
pub mod error;
pub mod hw_trait;
pub mod peripheral;
pub mod rail;
pub mod service;
pub mod tracing;
pub mod transport;
pub mod types;
