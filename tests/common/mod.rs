#![allow(dead_code)]

use helios::error::{HeliosError, Result};
use helios::types::{
    ChargeSnapshot, ChargingState, PowerSnapshot, Product, SiteHandle, VehicleDescriptor,
    VehicleState,
};
use helios::vehicle::EnergyApi;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Side-effecting call recorded by the stub
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Wake(String),
    Start(String),
    Stop(String),
    SetAmps(String, u32),
}

/// One scripted answer to `get_vehicle_state`
#[derive(Debug, Clone, Copy)]
pub enum Step {
    State(VehicleState),
    Fail,
    MissingField,
}

/// Scripted `EnergyApi`: per-vehicle state queues, a settable power snapshot
/// and a log of every command
pub struct ScriptedApi {
    power: Mutex<PowerSnapshot>,
    power_script: Mutex<VecDeque<PowerSnapshot>>,
    power_failures: Mutex<u32>,
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    fallback: Mutex<HashMap<String, VehicleState>>,
    calls: Mutex<Vec<Call>>,
    fail_wake: Mutex<bool>,
    products: Vec<Product>,
}

impl ScriptedApi {
    pub fn new(power: PowerSnapshot) -> Self {
        Self {
            power: Mutex::new(power),
            power_script: Mutex::new(VecDeque::new()),
            power_failures: Mutex::new(0),
            scripts: Mutex::new(HashMap::new()),
            fallback: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            fail_wake: Mutex::new(false),
            products: Vec::new(),
        }
    }

    pub fn with_products(mut self, products: Vec<Product>) -> Self {
        self.products = products;
        self
    }

    /// Answers queued for `vehicle_id`, consumed in order
    pub fn script(&self, vehicle_id: &str, steps: Vec<Step>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(vehicle_id.to_string())
            .or_default()
            .extend(steps);
    }

    /// State returned once the script for `vehicle_id` is exhausted
    pub fn set_fallback(&self, vehicle_id: &str, state: VehicleState) {
        self.fallback
            .lock()
            .unwrap()
            .insert(vehicle_id.to_string(), state);
    }

    pub fn set_power(&self, power: PowerSnapshot) {
        *self.power.lock().unwrap() = power;
    }

    /// Snapshots returned before falling back to the settable one
    pub fn queue_power(&self, snapshots: Vec<PowerSnapshot>) {
        self.power_script.lock().unwrap().extend(snapshots);
    }

    pub fn fail_power(&self, times: u32) {
        *self.power_failures.lock().unwrap() = times;
    }

    pub fn fail_wake(&self, fail: bool) {
        *self.fail_wake.lock().unwrap() = fail;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl EnergyApi for ScriptedApi {
    async fn get_power_snapshot(&self, _site_id: &str) -> Result<PowerSnapshot> {
        let mut failures = self.power_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(HeliosError::remote("live_status unavailable"));
        }
        if let Some(snapshot) = self.power_script.lock().unwrap().pop_front() {
            return Ok(snapshot);
        }
        Ok(*self.power.lock().unwrap())
    }

    async fn get_vehicle_state(&self, vehicle_id: &str) -> Result<VehicleState> {
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(vehicle_id)
            .and_then(|q| q.pop_front());
        match step {
            Some(Step::State(state)) => Ok(state),
            Some(Step::Fail) => Err(HeliosError::remote("vehicle unavailable")),
            Some(Step::MissingField) => Err(HeliosError::missing_field("charging_state")),
            None => self
                .fallback
                .lock()
                .unwrap()
                .get(vehicle_id)
                .copied()
                .ok_or_else(|| HeliosError::remote(format!("no script for {}", vehicle_id))),
        }
    }

    async fn wake(&self, vehicle_id: &str) -> Result<()> {
        if *self.fail_wake.lock().unwrap() {
            return Err(HeliosError::timeout("wake_up timed out"));
        }
        self.record(Call::Wake(vehicle_id.to_string()));
        Ok(())
    }

    async fn start_charging(&self, vehicle_id: &str) -> Result<()> {
        self.record(Call::Start(vehicle_id.to_string()));
        Ok(())
    }

    async fn stop_charging(&self, vehicle_id: &str) -> Result<()> {
        self.record(Call::Stop(vehicle_id.to_string()));
        Ok(())
    }

    async fn set_charging_current(&self, vehicle_id: &str, amps: u32) -> Result<()> {
        self.record(Call::SetAmps(vehicle_id.to_string(), amps));
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.products.clone())
    }
}

pub fn power(solar: f64, load: f64, percent: f64, pack_wh: f64) -> PowerSnapshot {
    PowerSnapshot {
        solar_power: solar,
        load_power: load,
        battery_power: 0.0,
        grid_power: 0.0,
        percentage_charged: percent,
        total_pack_energy: pack_wh,
    }
}

pub fn awake(state: ChargingState, amps: f64, voltage: f64) -> VehicleState {
    VehicleState::Awake(ChargeSnapshot {
        charging_state: state,
        charger_actual_current: amps,
        charger_voltage: voltage,
    })
}

pub fn charging(amps: f64) -> VehicleState {
    awake(ChargingState::Charging, amps, 240.0)
}

pub fn stopped() -> VehicleState {
    awake(ChargingState::Stopped, 0.0, 0.0)
}

pub fn disconnected() -> VehicleState {
    awake(ChargingState::Disconnected, 0.0, 0.0)
}

pub fn site() -> SiteHandle {
    SiteHandle {
        id: "site-1".to_string(),
        display_name: "Home".to_string(),
    }
}

pub fn descriptor(id: &str) -> VehicleDescriptor {
    VehicleDescriptor {
        id: id.to_string(),
        display_name: format!("Car {}", id),
    }
}
