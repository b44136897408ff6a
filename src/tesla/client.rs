use crate::config::ApiConfig;
use crate::error::{HeliosError, Result};
use crate::logging::{StructuredLogger, get_logger};
use crate::tesla::types::{
    decode_charge_state, decode_command_result, decode_online, decode_power_snapshot,
    decode_products, unwrap_envelope,
};
use crate::types::{PowerSnapshot, Product, VehicleState};
use crate::vehicle::EnergyApi;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;

/// Owner-API client holding one bearer token for its whole lifetime
pub struct TeslaClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    logger: StructuredLogger,
}

impl std::fmt::Debug for TeslaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeslaClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Token from the config, or from the credentials file when the config has none
pub fn resolve_access_token(api: &ApiConfig) -> Result<String> {
    let token = api.access_token.trim();
    if !token.is_empty() {
        return Ok(token.to_string());
    }
    read_credentials_file(&api.credentials_file)
}

pub fn read_credentials_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        HeliosError::auth(format!(
            "Cannot read credentials file {}: {}",
            path.display(),
            e
        ))
    })?;
    let credentials: Value = serde_json::from_str(&content)?;
    credentials
        .get("access_token")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            HeliosError::auth(format!("No access_token in {}", path.display()))
        })
}

impl TeslaClient {
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let token = resolve_access_token(api)?;
        Self::with_token(
            &api.base_url,
            token,
            Duration::from_secs(api.request_timeout_seconds),
        )
    }

    pub fn with_token(base_url: &str, access_token: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
            logger: get_logger("tesla"),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/1/{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder, path: &str) -> Result<Value> {
        let resp = request
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("helios/", env!("CARGO_PKG_VERSION")))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            self.logger
                .debug(&format!("{} answered {}: {}", path, status, body));
            return Err(HeliosError::remote(format!("{} returned {}", path, status)));
        }

        let body: Value = resp.json().await?;
        unwrap_envelope(body)
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.send(self.http.get(self.url(path)), path).await
    }

    async fn post(&self, path: &str, body: Option<Value>) -> Result<Value> {
        let mut request = self.http.post(self.url(path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        self.send(request, path).await
    }

    async fn command(&self, vehicle_id: &str, name: &str, body: Option<Value>) -> Result<()> {
        let response = self
            .post(&format!("vehicles/{}/command/{}", vehicle_id, name), body)
            .await?;
        decode_command_result(&response)
    }
}

#[async_trait::async_trait]
impl EnergyApi for TeslaClient {
    async fn get_power_snapshot(&self, site_id: &str) -> Result<PowerSnapshot> {
        let response = self
            .get(&format!("energy_sites/{}/live_status", site_id))
            .await?;
        decode_power_snapshot(&response)
    }

    async fn get_vehicle_state(&self, vehicle_id: &str) -> Result<VehicleState> {
        let summary = self.get(&format!("vehicles/{}", vehicle_id)).await?;
        if !decode_online(&summary)? {
            return Ok(VehicleState::Asleep);
        }
        let response = self
            .get(&format!("vehicles/{}/data_request/charge_state", vehicle_id))
            .await?;
        Ok(VehicleState::Awake(decode_charge_state(&response)?))
    }

    async fn wake(&self, vehicle_id: &str) -> Result<()> {
        // wake_up answers with the vehicle summary, not a command result
        self.post(&format!("vehicles/{}/wake_up", vehicle_id), None)
            .await?;
        Ok(())
    }

    async fn start_charging(&self, vehicle_id: &str) -> Result<()> {
        self.command(vehicle_id, "charge_start", None).await
    }

    async fn stop_charging(&self, vehicle_id: &str) -> Result<()> {
        self.command(vehicle_id, "charge_stop", None).await
    }

    async fn set_charging_current(&self, vehicle_id: &str, amps: u32) -> Result<()> {
        self.command(
            vehicle_id,
            "set_charging_amps",
            Some(json!({ "charging_amps": amps })),
        )
        .await
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let response = self.get("products").await?;
        decode_products(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_token_wins() {
        let api = ApiConfig {
            access_token: "  abc  ".to_string(),
            credentials_file: "/nonexistent/credentials.json".to_string(),
            ..ApiConfig::default()
        };
        assert_eq!(resolve_access_token(&api).unwrap(), "abc");
    }

    #[test]
    fn test_token_from_credentials_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"access_token": "xyz", "refresh_token": "r"}}"#).unwrap();
        let api = ApiConfig {
            credentials_file: file.path().display().to_string(),
            ..ApiConfig::default()
        };
        assert_eq!(resolve_access_token(&api).unwrap(), "xyz");
    }

    #[test]
    fn test_missing_credentials_is_auth_error() {
        let api = ApiConfig {
            credentials_file: "/nonexistent/credentials.json".to_string(),
            ..ApiConfig::default()
        };
        assert!(matches!(
            resolve_access_token(&api),
            Err(HeliosError::Auth { .. })
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"refresh_token": "r"}}"#).unwrap();
        assert!(matches!(
            read_credentials_file(file.path()),
            Err(HeliosError::Auth { .. })
        ));
    }

    #[test]
    fn test_url_building() {
        let client = TeslaClient::with_token(
            "https://owner-api.example.com/",
            "t".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.url("energy_sites/1/live_status"),
            "https://owner-api.example.com/api/1/energy_sites/1/live_status"
        );
    }
}
