//! Energy site state shared between the fleet scheduler and the active session

use crate::allocator::PowerAllocator;
use crate::config::Config;
use crate::error::Result;
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::types::{PowerSnapshot, SiteHandle};
use crate::vehicle::EnergyApi;
use crate::window::SlidingWindow;
use std::time::Duration;
use tokio::time::Instant;

/// Snapshots younger than this are reused instead of fetched again
pub const SNAPSHOT_REUSE_WINDOW: Duration = Duration::from_secs(1);

/// Latest site telemetry plus the solar smoothing window
pub struct SiteMonitor {
    pub handle: SiteHandle,
    snapshot: Option<PowerSnapshot>,
    refreshed_at: Option<Instant>,
    solar: SlidingWindow,
    allocator: PowerAllocator,
    logger: StructuredLogger,
}

impl SiteMonitor {
    pub fn new(handle: SiteHandle, config: &Config) -> Self {
        let logger = get_logger_with_context(
            LogContext::new("site").with_field("site", handle.display_name.clone()),
        );
        Self {
            handle,
            snapshot: None,
            refreshed_at: None,
            solar: SlidingWindow::new(config.solar.window),
            allocator: PowerAllocator::new(config.battery.clone(), config.solar.threshold_w),
            logger,
        }
    }

    /// Fetch a new snapshot and feed its solar production into the window
    pub async fn refresh(&mut self, api: &dyn EnergyApi, now: Instant) -> Result<PowerSnapshot> {
        let snapshot = api.get_power_snapshot(&self.handle.id).await?;
        self.solar.add(now, snapshot.solar_power);
        self.snapshot = Some(snapshot);
        self.refreshed_at = Some(now);
        self.logger.debug(&format!(
            "Solar {:.0}W, house {:.0}W, powerwall {:.0}W ({:.1}%), grid {:.0}W",
            snapshot.solar_power,
            snapshot.load_power,
            snapshot.battery_power,
            snapshot.percentage_charged,
            snapshot.grid_power
        ));
        Ok(snapshot)
    }

    /// Return the current snapshot, fetching only if it is older than
    /// [`SNAPSHOT_REUSE_WINDOW`]
    pub async fn ensure_fresh(&mut self, api: &dyn EnergyApi, now: Instant) -> Result<PowerSnapshot> {
        if let (Some(snapshot), Some(at)) = (self.snapshot, self.refreshed_at) {
            if now.saturating_duration_since(at) < SNAPSHOT_REUSE_WINDOW {
                self.solar.prune(now);
                return Ok(snapshot);
            }
        }
        self.refresh(api, now).await
    }

    pub fn snapshot(&self) -> Option<&PowerSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn solar_window(&self) -> &SlidingWindow {
        &self.solar
    }

    pub fn allocator(&self) -> &PowerAllocator {
        &self.allocator
    }

    pub fn has_enough_solar(&self) -> bool {
        self.allocator.has_enough_solar(&self.solar)
    }

    pub fn average_solar(&self) -> Option<f64> {
        self.solar.average().ok()
    }
}
