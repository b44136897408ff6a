//! Charging control algorithm for Helios
//!
//! Turns the smoothed surplus and the battery reservation into an ordered list
//! of charger commands. Decisions are pure; [`ChargeController::apply`] is the
//! only part that talks to the vehicle and it never retries.

use crate::config::ControlsConfig;
use crate::error::Result;
use crate::logging::{StructuredLogger, get_logger};
use crate::types::{ChargeSnapshot, ChargingState, PowerSnapshot};
use crate::vehicle::EnergyApi;

/// Power currently drawn by the vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargingPower {
    pub voltage: f64,
    pub amps: f64,
    pub watts: f64,
}

/// Command sent to the vehicle's charger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeCommand {
    Start,
    Stop,
    SetAmps(u32),
}

/// Outcome of one control step
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeDecision {
    pub next_charging_power: f64,
    pub amps: u32,
    /// Empty when the change stays inside the deadband
    pub commands: Vec<ChargeCommand>,
}

impl ChargeDecision {
    pub fn is_hold(&self) -> bool {
        self.commands.is_empty()
    }
}

pub struct ChargeController {
    config: ControlsConfig,
    logger: StructuredLogger,
}

impl ChargeController {
    pub fn new(config: ControlsConfig) -> Self {
        let logger = get_logger("controls");
        Self { config, logger }
    }

    /// Charging power from a charger snapshot.
    ///
    /// A stopped charger reports stale current, so it reads as nominal voltage
    /// and zero amps. A charger that has not settled its voltage yet is
    /// converted at nominal voltage as well.
    pub fn current_power(&self, snapshot: &ChargeSnapshot) -> ChargingPower {
        if snapshot.charging_state == ChargingState::Stopped {
            return ChargingPower {
                voltage: self.config.nominal_voltage,
                amps: 0.0,
                watts: 0.0,
            };
        }
        let amps = snapshot.charger_actual_current.max(0.0);
        let watts = amps * snapshot.charger_voltage.max(0.0);
        let voltage = if snapshot.charger_voltage > 0.0 {
            snapshot.charger_voltage
        } else {
            self.config.nominal_voltage
        };
        ChargingPower {
            voltage,
            amps,
            watts,
        }
    }

    /// Power available to the vehicle and the battery together
    pub fn surplus(site: &PowerSnapshot, current: &ChargingPower) -> f64 {
        site.solar_power - site.load_power + current.watts
    }

    pub fn next_charging_power(average_surplus: f64, battery_allocation: f64) -> f64 {
        (average_surplus - battery_allocation).max(0.0)
    }

    /// Deadband check; a transition to zero always passes
    pub fn should_command(&self, current_w: f64, next_w: f64) -> bool {
        (next_w - current_w).abs() > self.config.deadband_w || (current_w > 0.0 && next_w == 0.0)
    }

    /// Charging current for a power target, rounded half away from zero
    pub fn amps_for(&self, power_w: f64, voltage: f64) -> u32 {
        let max = f64::from(self.config.max_charging_amps);
        let amps = (power_w / voltage).clamp(0.0, max).round();
        // clamped to [0, max_charging_amps] so the cast cannot truncate
        amps as u32
    }

    /// Command order for a new current: a stopped charger ignores amperage
    /// changes, so it has to be started first.
    pub fn command_sequence(amps: u32, state: ChargingState) -> Vec<ChargeCommand> {
        if amps == 0 {
            return vec![ChargeCommand::Stop];
        }
        if state == ChargingState::Stopped {
            vec![ChargeCommand::Start, ChargeCommand::SetAmps(amps)]
        } else {
            vec![ChargeCommand::SetAmps(amps)]
        }
    }

    pub fn decide(
        &self,
        current: &ChargingPower,
        state: ChargingState,
        average_surplus: f64,
        battery_allocation: f64,
    ) -> ChargeDecision {
        let next = Self::next_charging_power(average_surplus, battery_allocation);
        let amps = self.amps_for(next, current.voltage);
        let commands = if self.should_command(current.watts, next) {
            Self::command_sequence(amps, state)
        } else {
            Vec::new()
        };
        ChargeDecision {
            next_charging_power: next,
            amps,
            commands,
        }
    }

    /// Send commands in order, stopping at the first failure
    pub async fn apply(
        &self,
        api: &dyn EnergyApi,
        vehicle_id: &str,
        commands: &[ChargeCommand],
    ) -> Result<usize> {
        let mut sent = 0;
        for command in commands {
            match command {
                ChargeCommand::Stop => {
                    self.logger.info("Stopping charging");
                    api.stop_charging(vehicle_id).await?;
                }
                ChargeCommand::Start => {
                    self.logger.info("Starting charging");
                    api.start_charging(vehicle_id).await?;
                }
                ChargeCommand::SetAmps(amps) => {
                    self.logger.info(&format!("Setting charging current: {}A", amps));
                    api.set_charging_current(vehicle_id, *amps).await?;
                }
            }
            sent += 1;
        }
        Ok(sent)
    }
}
