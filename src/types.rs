//! Telemetry snapshots and product descriptors shared by the control loop

use serde::{Deserialize, Serialize};

/// Site power flows from one poll
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerSnapshot {
    /// Solar production (W)
    pub solar_power: f64,
    /// House consumption including the vehicle (W)
    pub load_power: f64,
    /// Stationary battery flow, positive when discharging into the house (W)
    pub battery_power: f64,
    /// Grid flow, positive when importing (W)
    pub grid_power: f64,
    /// Stationary battery state of charge (0-100)
    pub percentage_charged: f64,
    /// Stationary battery capacity (Wh)
    pub total_pack_energy: f64,
}

/// Charger state as reported by the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargingState {
    Charging,
    Stopped,
    Complete,
    Disconnected,
    Starting,
}

impl ChargingState {
    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            "Charging" => Some(Self::Charging),
            // A plugged-in car without power behaves as a stopped charger
            "Stopped" | "NoPower" => Some(Self::Stopped),
            "Complete" => Some(Self::Complete),
            "Disconnected" => Some(Self::Disconnected),
            "Starting" => Some(Self::Starting),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Charging => "Charging",
            Self::Stopped => "Stopped",
            Self::Complete => "Complete",
            Self::Disconnected => "Disconnected",
            Self::Starting => "Starting",
        }
    }

    /// Whether the charger may currently be drawing power
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Charging | Self::Starting)
    }
}

/// Charger telemetry from one poll
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChargeSnapshot {
    pub charging_state: ChargingState,
    /// Current drawn by the vehicle (A)
    pub charger_actual_current: f64,
    /// Charger voltage (V)
    pub charger_voltage: f64,
}

/// Vehicle state from one poll
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VehicleState {
    Asleep,
    Awake(ChargeSnapshot),
}

/// Energy site (powerwall) identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteHandle {
    pub id: String,
    pub display_name: String,
}

/// Vehicle identity as returned by discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleDescriptor {
    pub id: String,
    pub display_name: String,
}

/// One entry of the product list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Product {
    Vehicle(VehicleDescriptor),
    Site(SiteHandle),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charging_state_labels() {
        for state in [
            ChargingState::Charging,
            ChargingState::Stopped,
            ChargingState::Complete,
            ChargingState::Disconnected,
            ChargingState::Starting,
        ] {
            assert_eq!(ChargingState::from_label(state.as_str()), Some(state));
        }
        assert_eq!(
            ChargingState::from_label("NoPower"),
            Some(ChargingState::Stopped)
        );
        assert_eq!(ChargingState::from_label("Sideways"), None);
    }

    #[test]
    fn active_states() {
        assert!(ChargingState::Charging.is_active());
        assert!(ChargingState::Starting.is_active());
        assert!(!ChargingState::Stopped.is_active());
        assert!(!ChargingState::Complete.is_active());
    }
}
