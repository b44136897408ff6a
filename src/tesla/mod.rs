//! Tesla owner-API integration
//!
//! `client` performs the authenticated HTTP calls; `types` turns the JSON
//! payloads into the typed snapshots the control loop consumes.

pub mod client;
pub mod types;

pub use client::{TeslaClient, read_credentials_file, resolve_access_token};
pub use types::{decode_charge_state, decode_power_snapshot, decode_products};
