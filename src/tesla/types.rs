//! Decoding of owner-API payloads into typed snapshots
//!
//! All functions take the already unwrapped `response` value and fail with
//! `MissingField` when a required key is absent.

use crate::error::{HeliosError, Result};
use crate::types::{
    ChargeSnapshot, ChargingState, PowerSnapshot, Product, SiteHandle, VehicleDescriptor,
};
use serde_json::Value;

fn field<'a>(value: &'a Value, name: &str) -> Result<&'a Value> {
    value
        .get(name)
        .ok_or_else(|| HeliosError::missing_field(name))
}

fn f64_field(value: &Value, name: &str) -> Result<f64> {
    field(value, name)?
        .as_f64()
        .ok_or_else(|| HeliosError::remote(format!("Field '{}' is not a number", name)))
}

/// Charger readings are `null` while the charger is idle
fn charger_reading(value: &Value, name: &str) -> Result<f64> {
    let v = field(value, name)?;
    if v.is_null() {
        return Ok(0.0);
    }
    v.as_f64()
        .ok_or_else(|| HeliosError::remote(format!("Field '{}' is not a number", name)))
}

/// Identifiers arrive as numbers or strings depending on the endpoint
fn id_field(value: &Value, name: &str) -> Result<String> {
    match field(value, name)? {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(HeliosError::remote(format!(
            "Field '{}' is not an identifier",
            name
        ))),
    }
}

pub fn decode_power_snapshot(response: &Value) -> Result<PowerSnapshot> {
    Ok(PowerSnapshot {
        solar_power: f64_field(response, "solar_power")?,
        load_power: f64_field(response, "load_power")?,
        battery_power: f64_field(response, "battery_power")?,
        grid_power: f64_field(response, "grid_power")?,
        percentage_charged: f64_field(response, "percentage_charged")?,
        total_pack_energy: f64_field(response, "total_pack_energy")?,
    })
}

pub fn decode_charge_state(response: &Value) -> Result<ChargeSnapshot> {
    let label = field(response, "charging_state")?
        .as_str()
        .ok_or_else(|| HeliosError::remote("Field 'charging_state' is not a string"))?;
    let charging_state = ChargingState::from_label(label)
        .ok_or_else(|| HeliosError::remote(format!("Unknown charging state '{}'", label)))?;
    Ok(ChargeSnapshot {
        charging_state,
        charger_actual_current: charger_reading(response, "charger_actual_current")?,
        charger_voltage: charger_reading(response, "charger_voltage")?,
    })
}

/// Whether `vehicles/{id}` reports the car as online
pub fn decode_online(response: &Value) -> Result<bool> {
    let state = field(response, "state")?
        .as_str()
        .ok_or_else(|| HeliosError::remote("Field 'state' is not a string"))?;
    Ok(state == "online")
}

/// Entries without `vin` or `energy_site_id` are ignored
pub fn decode_products(response: &Value) -> Result<Vec<Product>> {
    let entries = response
        .as_array()
        .ok_or_else(|| HeliosError::remote("Product list is not an array"))?;

    let mut products = Vec::new();
    for entry in entries {
        if entry.get("vin").is_some() {
            let id = match entry.get("id_s") {
                Some(_) => id_field(entry, "id_s")?,
                None => id_field(entry, "id")?,
            };
            let display_name = entry
                .get("display_name")
                .and_then(|v| v.as_str())
                .unwrap_or(id.as_str())
                .to_string();
            products.push(Product::Vehicle(VehicleDescriptor { id, display_name }));
        } else if entry.get("energy_site_id").is_some() {
            let id = id_field(entry, "energy_site_id")?;
            let display_name = entry
                .get("site_name")
                .and_then(|v| v.as_str())
                .unwrap_or(id.as_str())
                .to_string();
            products.push(Product::Site(SiteHandle { id, display_name }));
        }
    }
    Ok(products)
}

/// Commands answer `{"result": bool, "reason": "..."}`
pub fn decode_command_result(response: &Value) -> Result<()> {
    let accepted = field(response, "result")?.as_bool().unwrap_or(false);
    if accepted {
        return Ok(());
    }
    let reason = response
        .get("reason")
        .and_then(|v| v.as_str())
        .unwrap_or("no reason given");
    Err(HeliosError::remote(format!("Command rejected: {}", reason)))
}

/// Strip the `response` envelope, turning an `error` envelope into a failure
pub fn unwrap_envelope(body: Value) -> Result<Value> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        let message = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
        let description = body
            .get("error_description")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        return Err(HeliosError::remote(if description.is_empty() {
            message
        } else {
            format!("{}: {}", message, description)
        }));
    }
    match body {
        Value::Object(mut map) => map
            .remove("response")
            .ok_or_else(|| HeliosError::missing_field("response")),
        _ => Err(HeliosError::missing_field("response")),
    }
}
