pub mod bridge;
pub mod config;
pub mod device;
pub mod indicator;
pub mod serial;
pub mod session;
pub mod wireless;

use anyhow::Context;

use config::BridgeConfig;
use device::PortWatcher;
use indicator::{StatusIndicator, SysfsLed, SHUTDOWN_TIMEOUT};
use serial::DeviceOpener;
use session::{Orchestrator, SessionConfig};
use wireless::BluezAdvertiser;

/// Run the bridge until SIGINT or SIGTERM.
///
/// Setup failures are returned as errors. Once sessions are being served,
/// only a lost filesystem watch ends the loop early.
pub async fn run(config: BridgeConfig) -> anyhow::Result<()> {
    config.validate()?;

    let watcher = PortWatcher::new(config.ports.clone())
        .context("Could not watch serial port directories")?;

    let indicator = match &config.led {
        Some(led) => StatusIndicator::spawn(SysfsLed::new(led)),
        None => StatusIndicator::disabled(),
    };

    if config.init_adapter {
        log::info!("Initializing Bluetooth adapter");
        if let Err(e) = wireless::adapter::initialize_adapter().await {
            indicator.shutdown(SHUTDOWN_TIMEOUT).await;
            return Err(e).context("Bluetooth adapter initialization failed");
        }
    }

    let session_config = SessionConfig {
        serial: config.serial.clone(),
        advertisement: config.advertisement.clone(),
        retry_interval: config.retry_interval,
        debug: config.debug,
    };
    let mut orchestrator = Orchestrator::new(
        watcher,
        DeviceOpener,
        BluezAdvertiser::new(),
        indicator.sender(),
        session_config,
    );

    log::info!(
        "Bridging {} at {} as service {}",
        config
            .ports
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
        config.serial,
        config.advertisement.service_id
    );

    // Dropping the orchestrator future releases any open session
    let result = tokio::select! {
        res = orchestrator.run() => res.context("Serial port watch failed"),
        res = shutdown_signal() => res.map(|()| println!("Caught interrupt")),
    };

    drop(orchestrator);
    indicator.shutdown(SHUTDOWN_TIMEOUT).await;
    result
}

#[cfg(unix)]
async fn shutdown_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> anyhow::Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
