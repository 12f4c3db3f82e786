//! Parcel tracking client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{check_status, IntegrationError};
use crate::config::ParcelConfig;

const SERVICE: &str = "parcel tracking";

#[derive(Clone)]
pub struct ParcelClient {
    http: reqwest::Client,
    config: ParcelConfig,
}

#[derive(Debug, Serialize)]
struct TraceRequest<'a> {
    api_key: &'a str,
    tracking_no: &'a str,
}

#[derive(Debug, Deserialize)]
struct TraceResponse {
    status: bool,
    message: Option<String>,
    data: Option<TraceData>,
}

#[derive(Debug, Deserialize)]
struct TraceData {
    courier: Option<String>,
    status: Option<String>,
    #[serde(default)]
    checkpoints: Vec<Checkpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub time: DateTime<Utc>,
    pub status: String,
    pub location: Option<String>,
}

/// Where a tracking answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingSource { Cache, Courier }

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingInfo {
    pub tracking_number: String,
    pub courier: Option<String>,
    pub status: Option<String>,
    pub checkpoints: Vec<Checkpoint>,
    pub source: TrackingSource,
}

impl ParcelClient {
    pub fn new(http: reqwest::Client, config: ParcelConfig) -> Self {
        Self { http, config }
    }

    /// Current trace for a tracking number. `Ok(None)` when the courier does not know it yet.
    pub async fn trace(&self, tracking_number: &str) -> Result<Option<TrackingInfo>, IntegrationError> {
        let resp = self
            .http
            .post(format!("{}/v2/tracking", self.config.api_url.trim_end_matches('/')))
            .json(&TraceRequest { api_key: &self.config.api_key, tracking_no: tracking_number })
            .send()
            .await
            .map_err(IntegrationError::http(SERVICE))?;
        let body: TraceResponse = check_status(SERVICE, resp)
            .await?
            .json()
            .await
            .map_err(|e| IntegrationError::Decode { service: SERVICE, detail: e.to_string() })?;
        Ok(into_tracking(tracking_number, body))
    }
}

fn into_tracking(tracking_number: &str, body: TraceResponse) -> Option<TrackingInfo> {
    if !body.status {
        tracing::debug!(tracking_number, message = ?body.message, "Courier has no trace");
        return None;
    }
    let data = body.data?;
    let mut checkpoints = data.checkpoints;
    checkpoints.sort_by(|a, b| b.time.cmp(&a.time));
    Some(TrackingInfo {
        tracking_number: tracking_number.to_string(),
        courier: data.courier,
        status: data.status.or_else(|| checkpoints.first().map(|c| c.status.clone())),
        checkpoints,
        source: TrackingSource::Courier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_sorted_newest_first() {
        let body: TraceResponse = serde_json::from_str(
            r#"{"status":true,"data":{"courier":"J&T","checkpoints":[
                {"time":"2026-10-14T09:00:00Z","status":"Picked up","location":"Shah Alam"},
                {"time":"2026-10-15T11:30:00Z","status":"Out for delivery","location":"Petaling Jaya"}]}}"#,
        )
        .unwrap();
        let info = into_tracking("JT123", body).unwrap();
        assert_eq!(info.checkpoints[0].status, "Out for delivery");
        assert_eq!(info.status.as_deref(), Some("Out for delivery"));
        assert_eq!(info.source, TrackingSource::Courier);
    }

    #[test]
    fn test_unknown_tracking_number_is_none() {
        let body: TraceResponse = serde_json::from_str(r#"{"status":false,"message":"Not found"}"#).unwrap();
        assert!(into_tracking("XX", body).is_none());
    }
}
