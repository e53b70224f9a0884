//! HTTP API server.
//!
//! Exposes the control service over a small REST API built on Axum, so
//! that tools and scripts can read and program rails without linking the
//! driver.
//!
//! The API binds to localhost only by default and does not require
//! authentication for local access.

mod server;
mod v0;

pub use server::{ApiConfig, serve};
