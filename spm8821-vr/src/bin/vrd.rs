//! Main entry point for the SPM8821 voltage-control daemon.

use anyhow::Context;

use spm8821_vr::{config::DaemonConfig, daemon::Daemon, tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing::init_journald_or_stdout("vrd");

    let config = DaemonConfig::from_env().context("invalid configuration")?;
    Daemon::new(config).run().await
}
