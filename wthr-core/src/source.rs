use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    config::Settings,
    error::CycleError,
    model::{DeviceRecord, Reading},
    source::ambient::AmbientWeatherSource,
};

pub mod ambient;

/// Remote provider of station readings.
#[async_trait]
pub trait StationSource: Send + Sync + Debug {
    /// Every device on the account together with its most recent reading.
    async fn devices(&self) -> Result<Vec<DeviceRecord>, CycleError>;

    /// Up to `limit` readings for `mac`, ending at `end_date`.
    async fn device_history(
        &self,
        mac: &str,
        end_date: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Reading>, CycleError>;
}

/// Construct the Ambient Weather client from resolved settings.
pub fn source_from_settings(settings: &Settings) -> anyhow::Result<Box<dyn StationSource>> {
    let source = AmbientWeatherSource::new(
        settings.application_key.clone(),
        settings.api_key.clone(),
        settings.request_timeout,
    )?;

    Ok(Box::new(source))
}

/// Minimum spacing between two calls to the source with the same key.
pub const PACING_DELAY: Duration = Duration::from_secs(1);
