//! Charging session management for Helios
//!
//! A session supervises one plugged-in vehicle against one energy site. Each
//! cycle refreshes telemetry, evaluates the termination gates and, when the
//! vehicle keeps charging, lets the [`ChargeController`] adjust the current.
//! Failures are absorbed here: a cycle that fails counts towards the
//! consecutive error threshold, any successful cycle resets the count.

use crate::config::Config;
use crate::controls::{ChargeCommand, ChargeController};
use crate::error::{HeliosError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::shutdown::Shutdown;
use crate::site::SiteMonitor;
use crate::types::{ChargingState, VehicleState};
use crate::vehicle::{EnergyApi, Vehicle};
use crate::window::SlidingWindow;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminationReason {
    InsufficientSolar,
    Disconnected,
    Complete,
    TooManyErrors,
    Shutdown,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientSolar => "insufficient solar",
            Self::Disconnected => "charger disconnected",
            Self::Complete => "charging complete",
            Self::TooManyErrors => "too many errors",
            Self::Shutdown => "shutdown requested",
        }
    }
}

/// Result of a single successful cycle
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Charging continues; `commands` were sent this cycle
    Continue { commands: Vec<ChargeCommand> },
    /// Vehicle asleep; `woke` tells whether a wake command went out
    Asleep { woke: bool },
    Terminate(TerminationReason),
}

/// Record of a finished session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub vehicle: String,
    pub reason: TerminationReason,
    pub cycles: u32,
    pub commands_sent: usize,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

pub struct ChargingSession<'a> {
    id: String,
    api: &'a dyn EnergyApi,
    vehicle: &'a mut Vehicle,
    site: &'a mut SiteMonitor,
    controller: ChargeController,
    surplus: SlidingWindow,
    min_solar_samples: usize,
    error_threshold: u32,
    cycle_period: Duration,
    consecutive_errors: u32,
    /// Whether the charger may be drawing power, as far as we know
    charging_active: bool,
    cycles: u32,
    commands_sent: usize,
    started_at: DateTime<Utc>,
    shutdown: Shutdown,
    logger: StructuredLogger,
}

impl<'a> ChargingSession<'a> {
    pub fn new(
        api: &'a dyn EnergyApi,
        vehicle: &'a mut Vehicle,
        site: &'a mut SiteMonitor,
        config: &Config,
    ) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let logger = get_logger_with_context(
            LogContext::new("session")
                .with_session_id(id.clone())
                .with_field("vehicle", vehicle.display_name.clone()),
        );
        Self {
            id,
            api,
            vehicle,
            site,
            controller: ChargeController::new(config.controls.clone()),
            surplus: SlidingWindow::new(config.controls.surplus_window),
            min_solar_samples: config.solar.min_samples,
            error_threshold: config.session.error_threshold,
            cycle_period: config.session.cycle_period(),
            consecutive_errors: 0,
            charging_active: false,
            cycles: 0,
            commands_sent: 0,
            started_at: Utc::now(),
            shutdown: Shutdown::never(),
            logger,
        }
    }

    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn charging_active(&self) -> bool {
        self.charging_active
    }

    /// Cycle until a terminal condition, then leave the charger in a safe state
    pub async fn run(mut self) -> SessionSummary {
        self.logger.info(&format!(
            "Starting session with vehicle {} and powerwall {}",
            self.vehicle.display_name, self.site.handle.display_name
        ));

        let reason = loop {
            if self.shutdown.is_requested() {
                break TerminationReason::Shutdown;
            }
            if let Some(reason) = self.step().await {
                break reason;
            }
            let period = self.cycle_period;
            if self.shutdown.sleep(period).await {
                break TerminationReason::Shutdown;
            }
        };

        self.finish(reason).await
    }

    /// Run one cycle with error accounting; `Some` ends the session
    pub async fn step(&mut self) -> Option<TerminationReason> {
        self.cycles += 1;
        match self.cycle().await {
            Ok(outcome) => {
                self.consecutive_errors = 0;
                match outcome {
                    CycleOutcome::Terminate(reason) => Some(reason),
                    CycleOutcome::Continue { .. } | CycleOutcome::Asleep { .. } => None,
                }
            }
            Err(e) => self.record_failure(&e),
        }
    }

    fn record_failure(&mut self, err: &HeliosError) -> Option<TerminationReason> {
        self.consecutive_errors += 1;
        match err {
            HeliosError::MissingField { field } => self.logger.warn(&format!(
                "Error #{}: telemetry incomplete, field '{}' missing",
                self.consecutive_errors, field
            )),
            other => self
                .logger
                .error(&format!("Error #{}: {}", self.consecutive_errors, other)),
        }
        if self.consecutive_errors >= self.error_threshold {
            self.logger.error("Too many errors, ending session");
            return Some(TerminationReason::TooManyErrors);
        }
        None
    }

    /// One polling cycle without error accounting
    pub async fn cycle(&mut self) -> Result<CycleOutcome> {
        let now = Instant::now();
        let power = self.site.ensure_fresh(self.api, now).await?;
        let state = self.vehicle.fetch_state(self.api).await?;

        let charge = match state {
            VehicleState::Asleep => None,
            VehicleState::Awake(snapshot) => Some(snapshot),
        };
        self.charging_active = charge
            .map(|c| c.charging_state.is_active())
            .unwrap_or(false);

        if self.site.solar_window().count() >= self.min_solar_samples
            && !self.site.has_enough_solar()
        {
            self.logger.info(&format!(
                "Solar power over the last {} samples is {:.0}W, ending session",
                self.site.solar_window().count(),
                self.site.average_solar().unwrap_or(0.0)
            ));
            return Ok(CycleOutcome::Terminate(TerminationReason::InsufficientSolar));
        }

        let Some(charge) = charge else {
            let woke = self.vehicle.wake_if_due(self.api, now).await?;
            return Ok(CycleOutcome::Asleep { woke });
        };

        match charge.charging_state {
            ChargingState::Disconnected => {
                self.logger
                    .info("Charger is disconnected, session completed");
                return Ok(CycleOutcome::Terminate(TerminationReason::Disconnected));
            }
            ChargingState::Complete => {
                self.logger.info("Charging is completed, session completed");
                return Ok(CycleOutcome::Terminate(TerminationReason::Complete));
            }
            _ => {}
        }

        let current = self.controller.current_power(&charge);
        let surplus = ChargeController::surplus(&power, &current);
        self.surplus.add(now, surplus);
        let average_surplus = self.surplus.average()?;
        let allocation = self.site.allocator().allocate_power(&power);

        self.logger.info(&format!(
            "Solar: {:.0}W -> House: {:.0}W",
            power.solar_power,
            power.load_power - current.watts
        ));
        self.logger.info(&format!(
            "Surplus: {:.0}W -> Vehicle: {:.0}W, Powerwall: {:.0}W, Grid: {:.0}W",
            surplus, -current.watts, power.battery_power, power.grid_power
        ));
        self.logger.info(&format!(
            "Average surplus of the last {} values: {:.0}W",
            self.surplus.count(),
            average_surplus
        ));
        if allocation > 0.0 {
            self.logger.info(&format!(
                "Powerwall is {:.2}% charged, allowing {:.0}W to powerwall",
                power.percentage_charged, allocation
            ));
        } else {
            self.logger.info(&format!(
                "Powerwall is {:.2}% charged, holding",
                power.percentage_charged
            ));
        }

        let decision =
            self.controller
                .decide(&current, charge.charging_state, average_surplus, allocation);
        if decision.is_hold() {
            return Ok(CycleOutcome::Continue {
                commands: Vec::new(),
            });
        }

        self.logger.info(&format!(
            "Charging power is {:.0}W, setting to {:.0}W ({}A)",
            current.watts, decision.next_charging_power, decision.amps
        ));
        if decision.commands.contains(&ChargeCommand::Start) {
            // From here on the charger may be running even if a later command fails
            self.charging_active = true;
        }
        let sent = self
            .controller
            .apply(self.api, &self.vehicle.id, &decision.commands)
            .await?;
        self.commands_sent += sent;
        if decision.commands.contains(&ChargeCommand::Stop) {
            self.charging_active = false;
        }

        Ok(CycleOutcome::Continue {
            commands: decision.commands,
        })
    }

    async fn finish(self, reason: TerminationReason) -> SessionSummary {
        let mut commands_sent = self.commands_sent;
        if self.charging_active {
            self.logger
                .info("Vehicle still charging, stopping before leaving the session");
            match self.api.stop_charging(&self.vehicle.id).await {
                Ok(()) => commands_sent += 1,
                Err(e) => self
                    .logger
                    .warn(&format!("Final stop command failed: {}", e)),
            }
        }

        self.logger.info(&format!(
            "Session ended after {} cycles: {}",
            self.cycles,
            reason.as_str()
        ));

        SessionSummary {
            id: self.id,
            vehicle: self.vehicle.display_name.clone(),
            reason,
            cycles: self.cycles,
            commands_sent,
            started_at: self.started_at,
            ended_at: Utc::now(),
        }
    }
}
