use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single station reading: field name → raw JSON value as sent by the source.
pub type Reading = Map<String, Value>;

/// Field names copied from the latest reading into the webhook payload.
pub const RECOGNIZED_FIELDS: &[&str] = &["tempf", "feelsLike", "humidity", "dailyrainin", "dateutc"];

/// One device from the source's device listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    #[serde(rename = "macAddress")]
    pub mac_address: String,

    #[serde(rename = "lastData", default)]
    pub last_data: Reading,
}

/// Hourly summary of the historical series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketedRecord {
    /// Average temperature for the hour, rounded to one decimal.
    pub tempf: f64,
    /// Start of the hour, milliseconds since the Unix epoch.
    pub dateutc: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeVariables {
    pub latest: Reading,
    pub historical: Vec<BucketedRecord>,
}

/// Document POSTed to the TRMNL webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub merge_variables: MergeVariables,
}

impl WebhookPayload {
    pub fn new(latest: Reading, historical: Vec<BucketedRecord>) -> Self {
        Self { merge_variables: MergeVariables { latest, historical } }
    }
}
