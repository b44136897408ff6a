//! Battery reservation and solar sufficiency
//!
//! Pure functions over the current site snapshot: how much of the surplus the
//! stationary battery gets before the vehicle, and whether there is enough sun
//! to bother at all.

use crate::config::BatteryConfig;
use crate::types::PowerSnapshot;
use crate::window::{Retention, SlidingWindow};

#[derive(Debug, Clone)]
pub struct PowerAllocator {
    battery: BatteryConfig,
    solar_threshold_w: f64,
}

impl PowerAllocator {
    pub fn new(battery: BatteryConfig, solar_threshold_w: f64) -> Self {
        Self {
            battery,
            solar_threshold_w,
        }
    }

    pub fn percent_charged(&self, site: &PowerSnapshot) -> f64 {
        site.percentage_charged
    }

    /// True when the smoothed solar production exceeds the threshold.
    /// An empty window never counts as enough.
    pub fn has_enough_solar<R: Retention>(&self, solar: &SlidingWindow<R>) -> bool {
        solar
            .average()
            .map(|avg| avg > self.solar_threshold_w)
            .unwrap_or(false)
    }

    /// Power reserved for the stationary battery (W, never negative).
    ///
    /// Below the target charge this is the power that would reach the target
    /// within the configured horizon, bounded by the cap. At or above the
    /// target the battery holds and gets nothing.
    pub fn allocate_power(&self, site: &PowerSnapshot) -> f64 {
        let percent = self.percent_charged(site);
        let target = self.battery.target_percent;
        if percent >= target {
            return 0.0;
        }
        let missing_wh = (target - percent) / 100.0 * site.total_pack_energy;
        let watts = missing_wh * 60.0 / self.battery.charge_horizon_minutes;
        watts.min(self.battery.power_cap_w).max(0.0)
    }
}
