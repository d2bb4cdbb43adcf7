use std::{fmt, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;

use crate::{
    error::{CycleError, truncate_body},
    model::{DeviceRecord, Reading},
};

use super::StationSource;

pub const DEFAULT_BASE_URL: &str = "https://rt.ambientweather.net/v1";

/// Upstream cap on `limit` for the device history endpoint.
pub const MAX_HISTORY_LIMIT: u32 = 288;

const DEVICES: &str = "Ambient Weather devices";
const HISTORY: &str = "Ambient Weather device history";

/// Client for the Ambient Weather REST API.
///
/// The API allows one request per second per `apiKey`; callers are expected
/// to pace consecutive calls.
#[derive(Clone)]
pub struct AmbientWeatherSource {
    application_key: String,
    api_key: String,
    base_url: String,
    http: Client,
}

impl AmbientWeatherSource {
    pub fn new(application_key: String, api_key: String, timeout: Duration) -> reqwest::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            application_key,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch(
        &self,
        operation: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<String, CycleError> {
        let res = self
            .http
            .get(url)
            .query(&[
                ("applicationKey", self.application_key.as_str()),
                ("apiKey", self.api_key.as_str()),
            ])
            .query(query)
            .send()
            .await
            .map_err(|source| CycleError::SourceTransport { operation, source })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| CycleError::SourceTransport { operation, source })?;

        if !status.is_success() {
            return Err(CycleError::Source {
                operation,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(body)
    }
}

impl fmt::Debug for AmbientWeatherSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmbientWeatherSource")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StationSource for AmbientWeatherSource {
    async fn devices(&self) -> Result<Vec<DeviceRecord>, CycleError> {
        let url = format!("{}/devices", self.base_url);
        let body = self.fetch(DEVICES, &url, &[]).await?;

        let devices = decode_devices(&body)?;
        tracing::debug!(count = devices.len(), records = ?devices, "latest");

        Ok(devices)
    }

    async fn device_history(
        &self,
        mac: &str,
        end_date: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Reading>, CycleError> {
        let url = format!("{}/devices/{}", self.base_url, mac);
        let body = self
            .fetch(
                HISTORY,
                &url,
                &[
                    ("endDate", end_date.timestamp_millis().to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        let records = decode_history(&body)?;

        let tail = &records[records.len().saturating_sub(10)..];
        tracing::debug!(
            total_records = records.len(),
            last_records = ?tail,
            "historical (last 10 records only)"
        );

        Ok(records)
    }
}

fn decode_devices(body: &str) -> Result<Vec<DeviceRecord>, CycleError> {
    serde_json::from_str(body).map_err(|source| CycleError::SourceDecode { operation: DEVICES, source })
}

fn decode_history(body: &str) -> Result<Vec<Reading>, CycleError> {
    serde_json::from_str(body).map_err(|source| CycleError::SourceDecode { operation: HISTORY, source })
}
