//! One fetch → aggregate → deliver round trip.

use std::time::Duration;

use chrono::Utc;

use crate::{
    aggregate::aggregate,
    config::Settings,
    error::CycleError,
    model::WebhookPayload,
    project::project,
    source::{PACING_DELAY, StationSource, source_from_settings},
    webhook::{HttpWebhook, WebhookTarget},
};

#[derive(Debug)]
pub struct UpdateCycle {
    source: Box<dyn StationSource>,
    webhook: Box<dyn WebhookTarget>,
    device: String,
    history_limit: u32,
    pacing: Duration,
}

impl UpdateCycle {
    pub fn new(
        source: Box<dyn StationSource>,
        webhook: Box<dyn WebhookTarget>,
        device: impl Into<String>,
        history_limit: u32,
    ) -> Self {
        Self {
            source,
            webhook,
            device: device.into(),
            history_limit,
            pacing: PACING_DELAY,
        }
    }

    /// Wire the Ambient Weather client and the HTTP webhook from settings.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let source = source_from_settings(settings)?;
        let webhook = HttpWebhook::new(settings.webhook_url.clone(), settings.request_timeout)?;

        Ok(Self::new(source, Box::new(webhook), settings.device.clone(), settings.results_limit)
            .with_pacing(settings.pacing))
    }

    /// Wait between the two source calls. Never shorter than the source's
    /// one-request-per-second limit.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing.max(PACING_DELAY);
        self
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Fetch latest and historical readings and assemble the payload.
    pub async fn collect(&self) -> Result<WebhookPayload, CycleError> {
        tracing::info!(mac = %self.device, "getting latest weather data");
        let devices = self.source.devices().await?;
        let latest = project(&devices, &self.device)?;

        // Ambient rejects a second request inside the same second with a 429.
        tokio::time::sleep(self.pacing).await;

        tracing::info!(
            mac = %self.device,
            records = self.history_limit,
            "getting historical weather data"
        );
        let series = self
            .source
            .device_history(&self.device, Utc::now(), self.history_limit)
            .await?;
        let historical = aggregate(&series);

        tracing::info!(
            original_count = series.len(),
            bucketed_count = historical.len(),
            "bucketed historical data"
        );

        Ok(WebhookPayload::new(latest, historical))
    }

    /// Run one full cycle: collect, serialize and deliver exactly once.
    pub async fn run(&self) -> Result<(), CycleError> {
        let payload = self.collect().await?;
        tracing::debug!(data = ?payload, "sending data to TRMNL");

        let body = serde_json::to_vec(&payload)?;
        let size_bytes = body.len();
        tracing::info!(
            size_bytes,
            size_human = %format!("{:.2} KB", size_bytes as f64 / 1024.0),
            "webhook payload details"
        );

        let status = self.webhook.deliver(body).await?;
        tracing::info!(status, "webhook request sent successfully");

        Ok(())
    }
}
