use anyhow::{Context, Result};
use helios::config::Config;
use helios::logging::{get_logger, init_logging};
use helios::scheduler::FleetScheduler;
use helios::shutdown;
use helios::tesla::TeslaClient;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_logging(&config.logging).context("Failed to initialize logging")?;
    let logger = get_logger("main");
    logger.info(&format!("Helios {} starting up", env!("APP_VERSION")));

    let client = TeslaClient::new(&config.api).context("Failed to create API client")?;
    let mut scheduler = FleetScheduler::discover(Arc::new(client), config)
        .await
        .context("Product discovery failed")?;

    let (trigger, shutdown) = shutdown::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            get_logger("main").info("Shutdown requested");
            trigger.trigger();
        }
    });

    scheduler.run(shutdown).await;
    logger.info("Helios stopped");
    Ok(())
}
