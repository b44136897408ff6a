//! Configuration management for Helios
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files. Every recognised option has a default, so a
//! partial file (or no file at all) yields a usable configuration.

use crate::error::{HeliosError, Result};
use crate::window::{RetentionKind, WindowRetention};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote energy API connection
    pub api: ApiConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Solar sufficiency and daylight gate
    pub solar: SolarConfig,

    /// Stationary battery reservation
    pub battery: BatteryConfig,

    /// Charge command generation
    pub controls: ControlsConfig,

    /// Per-vehicle session loop
    pub session: SessionConfig,

    /// Outer fleet loop
    pub scheduler: SchedulerConfig,

    /// IANA timezone used for the daylight window
    pub timezone: String,
}

/// Remote API connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the owner API
    pub base_url: String,

    /// Bearer token; when empty the token is read from `credentials_file`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub access_token: String,

    /// JSON file holding `{"access_token": "..."}`
    pub credentials_file: String,

    /// Upper bound for every remote call
    pub request_timeout_seconds: u64,

    /// Energy site to control; the first discovered site when unset
    pub site_id: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console-specific level
    pub console_level: Option<String>,

    /// Optional file-specific level
    pub file_level: Option<String>,

    /// Directory (or file path whose parent is used) for rolling log files
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolarConfig {
    /// Smoothed solar production required to keep charging (W)
    pub threshold_w: f64,

    /// Retention of the site-level solar window
    pub window: WindowRetention,

    /// Samples required before a session may end for lack of sun
    pub min_samples: usize,

    /// First local hour of the daylight window (inclusive)
    pub daylight_start_hour: u32,

    /// Last local hour of the daylight window (exclusive)
    pub daylight_end_hour: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryConfig {
    /// State of charge the powerwall is topped up to before the car gets everything
    pub target_percent: f64,

    /// Horizon in which the reservation would reach the target (minutes)
    pub charge_horizon_minutes: f64,

    /// Upper bound of the reservation (W)
    pub power_cap_w: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    /// Smoothing of the surplus signal before acting
    pub surplus_window: WindowRetention,

    /// Minimum change of charging power that triggers a command (W)
    pub deadband_w: f64,

    /// Circuit ceiling for the charging current (A)
    pub max_charging_amps: u32,

    /// Voltage assumed while the charger is stopped (V)
    pub nominal_voltage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Time between session cycles
    pub cycle_period_seconds: u64,

    /// Consecutive failed cycles that end a session
    pub error_threshold: u32,

    /// Minimum time between two wake commands for the same vehicle
    pub wake_cooldown_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Sleep after a full pass over the fleet
    pub inter_pass_sleep_seconds: u64,

    /// Shortest back-off when the solar gate is closed
    pub gate_min_backoff_seconds: u64,

    /// Longest back-off when the solar gate is closed
    pub gate_max_backoff_seconds: u64,

    /// Wake sleeping vehicles during a pass (subject to the wake cooldown)
    pub wake_idle_vehicles: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://owner-api.teslamotors.com".to_string(),
            access_token: String::new(),
            credentials_file: "credentials.json".to_string(),
            request_timeout_seconds: 10,
            site_id: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/helios.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for SolarConfig {
    fn default() -> Self {
        Self {
            threshold_w: 1000.0,
            window: WindowRetention::seconds(3000),
            min_samples: 10,
            daylight_start_hour: 7,
            daylight_end_hour: 20,
        }
    }
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            target_percent: 90.0,
            charge_horizon_minutes: 5.0,
            power_cap_w: 5000.0,
        }
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            surplus_window: WindowRetention::seconds(300),
            deadband_w: 250.0,
            max_charging_amps: 32,
            nominal_voltage: 240.0,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cycle_period_seconds: 30,
            error_threshold: 3,
            wake_cooldown_seconds: 8 * 3600,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            inter_pass_sleep_seconds: 120,
            gate_min_backoff_seconds: 300,
            gate_max_backoff_seconds: 3600,
            wake_idle_vehicles: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            logging: LoggingConfig::default(),
            solar: SolarConfig::default(),
            battery: BatteryConfig::default(),
            controls: ControlsConfig::default(),
            session: SessionConfig::default(),
            scheduler: SchedulerConfig::default(),
            timezone: "UTC".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn cycle_period(&self) -> Duration {
        Duration::from_secs(self.cycle_period_seconds)
    }

    pub fn wake_cooldown(&self) -> Duration {
        Duration::from_secs(self.wake_cooldown_seconds)
    }
}

impl SchedulerConfig {
    pub fn inter_pass_sleep(&self) -> Duration {
        Duration::from_secs(self.inter_pass_sleep_seconds)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from `$HELIOS_CONFIG` or the default locations
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os("HELIOS_CONFIG") {
            return Self::from_file(path);
        }

        let default_paths = ["helios.yaml", "/etc/helios/config.yaml"];
        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parsed timezone for the daylight window
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| HeliosError::validation("timezone".to_string(), e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(HeliosError::validation("api.base_url", "Cannot be empty"));
        }

        if self.api.request_timeout_seconds == 0 {
            return Err(HeliosError::validation(
                "api.request_timeout_seconds",
                "Must be greater than 0",
            ));
        }

        if self.solar.threshold_w < 0.0 {
            return Err(HeliosError::validation(
                "solar.threshold_w",
                "Must not be negative",
            ));
        }

        if self.solar.daylight_start_hour > 23 || self.solar.daylight_end_hour > 24 {
            return Err(HeliosError::validation(
                "solar.daylight_start_hour",
                "Hours must lie within 0..=24",
            ));
        }
        if self.solar.daylight_start_hour == self.solar.daylight_end_hour {
            return Err(HeliosError::validation(
                "solar.daylight_end_hour",
                "Must differ from daylight_start_hour",
            ));
        }

        validate_window("solar.window", &self.solar.window)?;
        validate_window("controls.surplus_window", &self.controls.surplus_window)?;

        if !(0.0..=100.0).contains(&self.battery.target_percent) {
            return Err(HeliosError::validation(
                "battery.target_percent",
                "Must lie within 0..=100",
            ));
        }

        if self.battery.charge_horizon_minutes <= 0.0 {
            return Err(HeliosError::validation(
                "battery.charge_horizon_minutes",
                "Must be positive",
            ));
        }

        if self.battery.power_cap_w < 0.0 {
            return Err(HeliosError::validation(
                "battery.power_cap_w",
                "Must not be negative",
            ));
        }

        if self.controls.max_charging_amps == 0 {
            return Err(HeliosError::validation(
                "controls.max_charging_amps",
                "Must be greater than 0",
            ));
        }

        if self.controls.nominal_voltage <= 0.0 {
            return Err(HeliosError::validation(
                "controls.nominal_voltage",
                "Must be positive",
            ));
        }

        if self.session.error_threshold == 0 {
            return Err(HeliosError::validation(
                "session.error_threshold",
                "Must be greater than 0",
            ));
        }

        if self.scheduler.gate_min_backoff_seconds > self.scheduler.gate_max_backoff_seconds {
            return Err(HeliosError::validation(
                "scheduler.gate_min_backoff_seconds",
                "Must not exceed gate_max_backoff_seconds",
            ));
        }

        self.tz()?;
        Ok(())
    }
}

fn validate_window(field: &str, window: &WindowRetention) -> Result<()> {
    if window.limit == 0 {
        let message = match window.kind {
            RetentionKind::Samples => "Must retain at least one sample",
            RetentionKind::Seconds => "Must retain at least one second",
        };
        return Err(HeliosError::validation(field, message));
    }
    Ok(())
}
