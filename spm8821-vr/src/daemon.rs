//! Daemon lifecycle management for the voltage-control service.
//!
//! Binds the PMIC, serves the API and waits for a signal. The process
//! refuses to start if the bus or the device is missing; there is no
//! retry loop.

use std::sync::Arc;

use anyhow::Context;
use tokio::signal::unix::{self, SignalKind};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    api,
    api_client::types::DriverInfo,
    config::DaemonConfig,
    peripheral::spm8821::protocol::CHIP_MODEL,
    service::VoltageService,
    tracing::prelude::*,
    transport,
};

/// Driver name reported by the info endpoint.
pub const DRIVER_NAME: &str = env!("CARGO_PKG_NAME");

/// Driver version reported by the info endpoint.
pub const DRIVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The running daemon.
pub struct Daemon {
    config: DaemonConfig,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl Daemon {
    pub fn new(config: DaemonConfig) -> Self {
        Self {
            config,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Identification for the configured device.
    pub fn driver_info(&self) -> DriverInfo {
        DriverInfo {
            chip: CHIP_MODEL.to_string(),
            driver: DRIVER_NAME.to_string(),
            version: DRIVER_VERSION.to_string(),
            i2c_bus: self.config.i2c_bus,
            i2c_address: self.config.i2c_address,
        }
    }

    /// Run the daemon until shutdown is requested.
    pub async fn run(self) -> anyhow::Result<()> {
        let bus = self.config.i2c_bus;
        let address = self.config.i2c_address;

        let pmic = transport::i2c_dev::bind(bus, address)
            .await
            .context("failed to bind SPM8821")?;
        info!(
            bus,
            address = format!("{:#04x}", address),
            "SPM8821 found"
        );

        let service = Arc::new(VoltageService::with_pmic(pmic.boxed(), self.config.settle));

        self.tracker.spawn({
            let shutdown = self.shutdown.clone();
            let api_config = self.config.api.clone();
            let service = service.clone();
            let info = self.driver_info();
            async move {
                if let Err(e) = api::serve(api_config, shutdown.clone(), service, info).await {
                    error!("API server error: {:#}", e);
                    // Without the API the daemon has nothing to do.
                    shutdown.cancel();
                }
            }
        });
        self.tracker.close();

        info!("Started.");
        info!("For bus debugging, set RUST_LOG=spm8821_vr=trace to see all register traffic");

        let mut sigint = unix::signal(SignalKind::interrupt())?;
        let mut sigterm = unix::signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT");
            },
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            },
            _ = self.shutdown.cancelled() => {},
        }

        trace!("Shutting down.");
        self.shutdown.cancel();
        self.tracker.wait().await;

        // Requests still queued on the service see Unbound from here on.
        service.unbind().await;
        info!("Exiting.");

        Ok(())
    }
}
