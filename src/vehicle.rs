//! Vehicle and energy-site API integration for Helios
//!
//! The control loop talks to the outside world exclusively through
//! [`EnergyApi`]. A concrete HTTP implementation lives in `crate::tesla`;
//! tests substitute scripted stubs.

use crate::error::Result;
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::types::{PowerSnapshot, Product, VehicleDescriptor, VehicleState};
use std::time::Duration;
use tokio::time::Instant;

/// Remote telemetry and command capability
///
/// Every call is bounded by the implementation's request timeout. Callers see
/// only the typed outcome, never transport details.
#[async_trait::async_trait]
pub trait EnergyApi: Send + Sync {
    async fn get_power_snapshot(&self, site_id: &str) -> Result<PowerSnapshot>;
    async fn get_vehicle_state(&self, vehicle_id: &str) -> Result<VehicleState>;
    async fn wake(&self, vehicle_id: &str) -> Result<()>;
    async fn start_charging(&self, vehicle_id: &str) -> Result<()>;
    async fn stop_charging(&self, vehicle_id: &str) -> Result<()>;
    async fn set_charging_current(&self, vehicle_id: &str, amps: u32) -> Result<()>;
    async fn list_products(&self) -> Result<Vec<Product>>;
}

/// A controllable vehicle and its wake bookkeeping
pub struct Vehicle {
    pub id: String,
    pub display_name: String,
    last_wake: Option<Instant>,
    wake_cooldown: Duration,
    logger: StructuredLogger,
}

impl Vehicle {
    pub fn new(descriptor: VehicleDescriptor, wake_cooldown: Duration) -> Self {
        let logger = get_logger_with_context(
            LogContext::new("vehicle").with_field("vehicle", descriptor.display_name.clone()),
        );
        Self {
            id: descriptor.id,
            display_name: descriptor.display_name,
            last_wake: None,
            wake_cooldown,
            logger,
        }
    }

    pub fn last_wake(&self) -> Option<Instant> {
        self.last_wake
    }

    /// Whether a wake command may be sent at `now`
    pub fn wake_due(&self, now: Instant) -> bool {
        match self.last_wake {
            None => true,
            Some(at) => now.saturating_duration_since(at) >= self.wake_cooldown,
        }
    }

    /// Send a wake command unless one was sent within the cooldown.
    ///
    /// Returns whether a command was issued. The cooldown restarts only once
    /// the command has been accepted.
    pub async fn wake_if_due(&mut self, api: &dyn EnergyApi, now: Instant) -> Result<bool> {
        if !self.wake_due(now) {
            self.logger.debug("Vehicle is asleep, wake cooldown still running");
            return Ok(false);
        }
        self.logger.info("Vehicle is asleep, waking up");
        api.wake(&self.id).await?;
        self.last_wake = Some(now);
        Ok(true)
    }

    pub async fn fetch_state(&self, api: &dyn EnergyApi) -> Result<VehicleState> {
        api.get_vehicle_state(&self.id).await
    }
}
