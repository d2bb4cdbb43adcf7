use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Url, header::CONTENT_TYPE};

use crate::error::{CycleError, truncate_body};

/// Downstream endpoint receiving the assembled payload.
#[async_trait]
pub trait WebhookTarget: Send + Sync + Debug {
    /// POST an already-serialized JSON document, returning the 2xx status.
    async fn deliver(&self, body: Vec<u8>) -> Result<u16, CycleError>;
}

/// TRMNL private-plugin webhook reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpWebhook {
    url: Url,
    http: Client,
}

impl HttpWebhook {
    pub fn new(url: Url, timeout: Duration) -> reqwest::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { url, http })
    }
}

#[async_trait]
impl WebhookTarget for HttpWebhook {
    async fn deliver(&self, body: Vec<u8>) -> Result<u16, CycleError> {
        let res = self
            .http
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(CycleError::WebhookTransport)?;

        let status = res.status();
        if !status.is_success() {
            // The body is diagnostics only; a failed read leaves it empty.
            let body = res.text().await.unwrap_or_default();
            return Err(CycleError::Webhook { status: status.as_u16(), body: truncate_body(&body) });
        }

        Ok(status.as_u16())
    }
}
