//! # Helios - solar-surplus EV charging controller
//!
//! Helios modulates an electric vehicle's charging current so the car only
//! consumes the solar production the house does not use, after reserving a
//! share for the stationary battery (powerwall).
//!
//! ## Architecture
//!
//! - `window`: sliding-window averages used to smooth noisy telemetry
//! - `allocator`: battery reservation and solar sufficiency
//! - `site`: latest site telemetry and the site-level solar window
//! - `controls`: charging control algorithm with deadband hysteresis
//! - `session`: per-vehicle charging session state machine
//! - `scheduler`: outer loop over the fleet with daylight/solar gate
//! - `vehicle`: the `EnergyApi` capability and vehicle wake bookkeeping
//! - `tesla`: owner-API client implementing `EnergyApi`
//! - `config`, `error`, `logging`, `shutdown`: ambient plumbing

pub mod allocator;
pub mod config;
pub mod controls;
pub mod error;
pub mod logging;
pub mod scheduler;
pub mod session;
pub mod shutdown;
pub mod site;
#[cfg(feature = "tesla")]
pub mod tesla;
pub mod types;
pub mod vehicle;
pub mod window;

// Re-export commonly used types
pub use config::Config;
pub use error::{HeliosError, Result};
pub use scheduler::FleetScheduler;
pub use session::{ChargingSession, SessionSummary, TerminationReason};
pub use vehicle::EnergyApi;
