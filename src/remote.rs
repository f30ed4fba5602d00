//! HTTP adapter for the fuel/distance-accounting endpoint.

use serde::{Deserialize, Serialize};

use crate::errors::SyncError;
use crate::fuel::Motor;
use crate::traits::{DistanceSyncOutcome, DistanceSyncReport, FuelAccountingService};

#[derive(Debug, Clone)]
pub struct FuelApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for FuelApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Blocking client for the remote fuel-accounting service.
#[derive(Debug, Clone)]
pub struct HttpFuelAccounting {
    config: FuelApiConfig,
    client: reqwest::blocking::Client,
}

impl HttpFuelAccounting {
    pub fn new(config: FuelApiConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        url: String,
        body: &Req,
    ) -> Result<Resp, SyncError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(|err| SyncError::transient(err.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(SyncError::permanent(format!("http {}", status)));
        }
        if status.is_server_error() {
            return Err(SyncError::transient(format!("http {}", status)));
        }

        response
            .json::<Resp>()
            .map_err(|err| SyncError::permanent(format!("malformed response: {}", err)))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DistanceUpdateRequest<'a> {
    vehicle_id: &'a str,
    cumulative_distance_km: f64,
    last_synced_distance_km: f64,
}

/// Wire shape of a distance update response. The backend answers either
/// with a full report or with a `{"status": "skipped", "reason": ...}`
/// sentinel for sub-threshold updates.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DistanceUpdateResponse {
    Skipped { status: String, reason: String },
    Report(DistanceSyncReport),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FuelComputationRequest<'a> {
    motor: &'a Motor,
    incremental_distance_km: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FuelComputationResponse {
    new_fuel_level_percent: f64,
}

impl FuelAccountingService for HttpFuelAccounting {
    fn sync_distance(
        &self,
        vehicle_id: &str,
        cumulative_distance_km: f64,
        last_synced_distance_km: f64,
    ) -> Result<DistanceSyncOutcome, SyncError> {
        let url = format!("{}/vehicles/{}/distance", self.config.base_url, vehicle_id);
        let body = DistanceUpdateRequest {
            vehicle_id,
            cumulative_distance_km,
            last_synced_distance_km,
        };

        match self.post::<_, DistanceUpdateResponse>(url, &body)? {
            DistanceUpdateResponse::Skipped { status, reason } => {
                if status == "skipped" {
                    Ok(DistanceSyncOutcome::Skipped { reason })
                } else {
                    Err(SyncError::permanent(format!(
                        "unexpected status sentinel: {}",
                        status
                    )))
                }
            }
            DistanceUpdateResponse::Report(report) => Ok(DistanceSyncOutcome::Applied(report)),
        }
    }

    fn fuel_after_distance(
        &self,
        motor: &Motor,
        incremental_distance_km: f64,
    ) -> Result<f64, SyncError> {
        let url = format!("{}/fuel/consumption", self.config.base_url);
        let body = FuelComputationRequest {
            motor,
            incremental_distance_km,
        };

        let response: FuelComputationResponse = self.post(url, &body)?;
        Ok(response.new_fuel_level_percent)
    }
}
