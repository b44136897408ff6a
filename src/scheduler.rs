//! Fleet scheduler: the outer loop over discovered vehicles
//!
//! Each pass first checks the daylight window and the site-level solar
//! average. While that gate is closed the scheduler backs off; otherwise it
//! visits every vehicle in turn and runs a charging session for each one that
//! is plugged in.

use crate::config::Config;
use crate::error::{HeliosError, Result};
use crate::logging::{StructuredLogger, get_logger};
use crate::session::{ChargingSession, SessionSummary, TerminationReason};
use crate::shutdown::Shutdown;
use crate::site::SiteMonitor;
use crate::types::{ChargingState, Product, SiteHandle, VehicleDescriptor, VehicleState};
use crate::vehicle::{EnergyApi, Vehicle};
use chrono::{NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const SECONDS_PER_DAY: i64 = 24 * 3600;

/// Why the solar gate is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateReason {
    OutsideDaylight,
    InsufficientSolar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Open,
    Closed { reason: GateReason, backoff: Duration },
}

/// What a single pass did
#[derive(Debug)]
pub enum PassOutcome {
    Gated { backoff: Duration },
    Completed {
        sessions: Vec<SessionSummary>,
        skipped: usize,
    },
}

/// Whether `hour` lies in `[start, end)`; a window with `start > end` wraps midnight
pub fn is_daylight(hour: u32, start: u32, end: u32) -> bool {
    if start <= end {
        hour >= start && hour < end
    } else {
        hour >= start || hour < end
    }
}

/// Time from `local` until the next `start_hour:00`
pub fn until_daylight(local: NaiveTime, start_hour: u32) -> Duration {
    let now = i64::from(local.num_seconds_from_midnight());
    let start = i64::from(start_hour) * 3600;
    let wait = (start - now).rem_euclid(SECONDS_PER_DAY);
    Duration::from_secs(wait as u64)
}

/// Back-off proportional to how far the solar average is below the threshold
pub fn solar_backoff(average: Option<f64>, threshold: f64, min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let ratio = match average {
        Some(avg) if threshold > 0.0 => ((threshold - avg) / threshold).clamp(0.0, 1.0),
        Some(_) => 0.0,
        None => 1.0,
    };
    min + (max - min).mul_f64(ratio)
}

pub struct FleetScheduler {
    api: Arc<dyn EnergyApi>,
    config: Config,
    tz: Tz,
    site: SiteMonitor,
    vehicles: Vec<Vehicle>,
    logger: StructuredLogger,
}

impl FleetScheduler {
    pub fn new(
        api: Arc<dyn EnergyApi>,
        config: Config,
        site: SiteHandle,
        vehicles: Vec<VehicleDescriptor>,
    ) -> Result<Self> {
        let tz = config.tz()?;
        let cooldown = config.session.wake_cooldown();
        let vehicles = vehicles
            .into_iter()
            .map(|d| Vehicle::new(d, cooldown))
            .collect();
        Ok(Self {
            site: SiteMonitor::new(site, &config),
            api,
            config,
            tz,
            vehicles,
            logger: get_logger("scheduler"),
        })
    }

    /// Build the fleet from the product list
    ///
    /// The site named by `api.site_id` is used when configured, otherwise the
    /// first site in the list.
    pub async fn discover(api: Arc<dyn EnergyApi>, config: Config) -> Result<Self> {
        let products = api.list_products().await?;
        let mut sites = Vec::new();
        let mut vehicles = Vec::new();
        for product in products {
            match product {
                Product::Site(site) => sites.push(site),
                Product::Vehicle(vehicle) => vehicles.push(vehicle),
            }
        }

        let site = match config.api.site_id.as_deref() {
            Some(id) => sites.into_iter().find(|s| s.id == id).ok_or_else(|| {
                HeliosError::config(format!("Energy site {} not found in product list", id))
            })?,
            None => sites
                .into_iter()
                .next()
                .ok_or_else(|| HeliosError::config("No energy site found in product list"))?,
        };
        if vehicles.is_empty() {
            return Err(HeliosError::config("No vehicles found in product list"));
        }

        let scheduler = Self::new(api, config, site, vehicles)?;
        scheduler.logger.info(&format!(
            "Discovered powerwall {} and {} vehicle(s): {}",
            scheduler.site.handle.display_name,
            scheduler.vehicles.len(),
            scheduler
                .vehicles
                .iter()
                .map(|v| v.display_name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));
        Ok(scheduler)
    }

    pub fn site(&self) -> &SiteMonitor {
        &self.site
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    /// Run passes until shutdown is requested
    pub async fn run(&mut self, mut shutdown: Shutdown) {
        self.logger.info("Fleet scheduler started");
        loop {
            if shutdown.is_requested() {
                break;
            }
            let pause = match self.run_pass(&shutdown).await {
                PassOutcome::Gated { backoff } => backoff,
                PassOutcome::Completed { sessions, skipped } => {
                    self.logger.debug(&format!(
                        "Pass finished: {} session(s), {} vehicle(s) skipped",
                        sessions.len(),
                        skipped
                    ));
                    self.config.scheduler.inter_pass_sleep()
                }
            };
            if shutdown.sleep(pause).await {
                break;
            }
        }
        self.logger.info("Fleet scheduler stopped");
    }

    /// One gate check followed, if open, by one visit of every vehicle
    pub async fn run_pass(&mut self, shutdown: &Shutdown) -> PassOutcome {
        let local = Utc::now().with_timezone(&self.tz).time();
        let gate = match self.gate(local, Instant::now()).await {
            Ok(gate) => gate,
            Err(e) => {
                self.logger
                    .warn(&format!("Cannot read site telemetry: {}", e));
                return PassOutcome::Gated {
                    backoff: Duration::from_secs(self.config.scheduler.gate_min_backoff_seconds),
                };
            }
        };
        if let Gate::Closed { reason, backoff } = gate {
            self.logger.info(&format!(
                "{}, checking again in {} minutes",
                match reason {
                    GateReason::OutsideDaylight => "Outside daylight hours",
                    GateReason::InsufficientSolar => "Not enough solar power",
                },
                backoff.as_secs() / 60
            ));
            return PassOutcome::Gated { backoff };
        }

        let mut sessions = Vec::new();
        let mut skipped = 0;
        for index in 0..self.vehicles.len() {
            if shutdown.is_requested() {
                break;
            }
            let Some(summary) = self.visit(index, shutdown).await else {
                skipped += 1;
                continue;
            };
            match serde_json::to_string(&summary) {
                Ok(json) => self.logger.info(&format!("Session summary {}", json)),
                Err(e) => self.logger.warn(&format!("Cannot encode session summary: {}", e)),
            }
            let sun_gone = summary.reason == TerminationReason::InsufficientSolar;
            sessions.push(summary);
            if sun_gone {
                // Later vehicles are judged on the same site window
                self.logger
                    .info("Solar dropped below the threshold, ending the pass early");
                break;
            }
        }
        PassOutcome::Completed { sessions, skipped }
    }

    /// Evaluate the daylight window and, inside it, the site solar average
    pub async fn gate(&mut self, local: NaiveTime, now: Instant) -> Result<Gate> {
        let solar = &self.config.solar;
        let scheduler = &self.config.scheduler;
        let max = Duration::from_secs(scheduler.gate_max_backoff_seconds);
        let min = Duration::from_secs(scheduler.gate_min_backoff_seconds);

        if !is_daylight(local.hour(), solar.daylight_start_hour, solar.daylight_end_hour) {
            let backoff = until_daylight(local, solar.daylight_start_hour).min(max);
            return Ok(Gate::Closed {
                reason: GateReason::OutsideDaylight,
                backoff,
            });
        }

        self.site.ensure_fresh(self.api.as_ref(), now).await?;
        if self.site.has_enough_solar() {
            return Ok(Gate::Open);
        }
        Ok(Gate::Closed {
            reason: GateReason::InsufficientSolar,
            backoff: solar_backoff(self.site.average_solar(), solar.threshold_w, min, max),
        })
    }

    async fn visit(&mut self, index: usize, shutdown: &Shutdown) -> Option<SessionSummary> {
        let api = self.api.as_ref();
        let vehicle = &mut self.vehicles[index];

        let state = match vehicle.fetch_state(api).await {
            Ok(state) => state,
            Err(e) => {
                let message = format!("Cannot read state of {}: {}", vehicle.display_name, e);
                if e.is_retryable() {
                    self.logger.warn(&message);
                } else {
                    self.logger.error(&message);
                }
                return None;
            }
        };

        match state {
            VehicleState::Asleep => {
                if self.config.scheduler.wake_idle_vehicles {
                    if let Err(e) = vehicle.wake_if_due(api, Instant::now()).await {
                        self.logger.warn(&format!(
                            "Waking {} failed: {}",
                            vehicle.display_name, e
                        ));
                    }
                } else {
                    self.logger
                        .debug(&format!("{} is asleep, skipping", vehicle.display_name));
                }
                None
            }
            VehicleState::Awake(charge) => match charge.charging_state {
                ChargingState::Disconnected | ChargingState::Complete => {
                    self.logger.debug(&format!(
                        "{} is {}, skipping",
                        vehicle.display_name,
                        charge.charging_state.as_str()
                    ));
                    None
                }
                _ => {
                    let session = ChargingSession::new(api, vehicle, &mut self.site, &self.config)
                        .with_shutdown(shutdown.clone());
                    Some(session.run().await)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daylight_window() {
        assert!(is_daylight(7, 7, 20));
        assert!(is_daylight(19, 7, 20));
        assert!(!is_daylight(20, 7, 20));
        assert!(!is_daylight(3, 7, 20));
        // Wrapping window
        assert!(is_daylight(23, 22, 4));
        assert!(is_daylight(2, 22, 4));
        assert!(!is_daylight(12, 22, 4));
    }

    #[test]
    fn test_until_daylight() {
        let t = NaiveTime::from_hms_opt(6, 30, 0).unwrap();
        assert_eq!(until_daylight(t, 7), Duration::from_secs(1800));

        let t = NaiveTime::from_hms_opt(21, 0, 0).unwrap();
        assert_eq!(until_daylight(t, 7), Duration::from_secs(10 * 3600));
    }

    #[test]
    fn test_solar_backoff_scales_with_deficit() {
        let min = Duration::from_secs(300);
        let max = Duration::from_secs(3600);
        assert_eq!(solar_backoff(Some(1200.0), 1000.0, min, max), min);
        assert_eq!(solar_backoff(Some(0.0), 1000.0, min, max), max);
        assert_eq!(solar_backoff(Some(-50.0), 1000.0, min, max), max);
        assert_eq!(solar_backoff(None, 1000.0, min, max), max);
        assert_eq!(
            solar_backoff(Some(500.0), 1000.0, min, max),
            Duration::from_secs(300 + 1650)
        );
    }

    #[test]
    fn test_solar_backoff_degenerate_bounds() {
        let d = Duration::from_secs(600);
        assert_eq!(solar_backoff(Some(0.0), 1000.0, d, d), d);
    }
}
