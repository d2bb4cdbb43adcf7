use thiserror::Error;

/// Failure of a single update cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("{operation} request failed with status {status}: {body}")]
    Source { operation: &'static str, status: u16, body: String },

    #[error("failed to send {operation} request")]
    SourceTransport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to parse {operation} response")]
    SourceDecode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("received zero device records")]
    NoDevices,

    #[error("no device data found for device MAC: {0}")]
    DeviceNotFound(String),

    #[error("webhook request failed with status {status}: {body}")]
    Webhook { status: u16, body: String },

    #[error("error sending webhook request")]
    WebhookTransport(#[source] reqwest::Error),

    #[error("error marshaling webhook data")]
    Encode(#[from] serde_json::Error),
}

/// Coarse classification used for logging and by callers that only care
/// which collaborator failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Source,
    NotFound,
    Webhook,
}

impl CycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CycleError::Source { .. }
            | CycleError::SourceTransport { .. }
            | CycleError::SourceDecode { .. } => ErrorKind::Source,
            CycleError::NoDevices | CycleError::DeviceNotFound(_) => ErrorKind::NotFound,
            CycleError::Webhook { .. } | CycleError::WebhookTransport(_) | CycleError::Encode(_) => {
                ErrorKind::Webhook
            }
        }
    }

    /// HTTP status reported by the remote side, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            CycleError::Source { status, .. } | CycleError::Webhook { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for `429 Too Many Requests` from either the source or the webhook.
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }

    /// The message followed by every underlying cause, `: `-separated.
    pub fn report(&self) -> String {
        let mut out = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            out.push_str(": ");
            out.push_str(&err.to_string());
            cause = err.source();
        }
        out
    }
}

const MAX_BODY_EXCERPT: usize = 200;

/// Bounded excerpt of a response body for error messages.
pub(crate) fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_BODY_EXCERPT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_detected_on_both_sides() {
        let source = CycleError::Source { operation: "devices", status: 429, body: String::new() };
        let webhook = CycleError::Webhook { status: 429, body: String::new() };
        let unavailable = CycleError::Webhook { status: 503, body: String::new() };

        assert!(source.is_rate_limited());
        assert!(webhook.is_rate_limited());
        assert!(!unavailable.is_rate_limited());
        assert!(!CycleError::NoDevices.is_rate_limited());
    }

    #[test]
    fn kinds_follow_the_failing_collaborator() {
        assert_eq!(CycleError::NoDevices.kind(), ErrorKind::NotFound);
        assert_eq!(CycleError::DeviceNotFound("AA".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            CycleError::Source { operation: "devices", status: 500, body: String::new() }.kind(),
            ErrorKind::Source
        );
        assert_eq!(
            CycleError::Webhook { status: 500, body: String::new() }.kind(),
            ErrorKind::Webhook
        );
    }

    #[test]
    fn truncate_body_is_bounded_and_char_safe() {
        let short = "service unavailable";
        assert_eq!(truncate_body(short), short);

        let long = "é".repeat(500);
        let excerpt = truncate_body(&long);
        assert_eq!(excerpt.chars().count(), MAX_BODY_EXCERPT + 3);
        assert!(excerpt.ends_with("..."));
    }

    #[test]
    fn report_appends_causes() {
        let decode = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        let err = CycleError::SourceDecode { operation: "devices", source: decode };

        let report = err.report();
        assert!(report.starts_with("failed to parse devices response: "));
        assert!(report.len() > "failed to parse devices response: ".len());
    }

    #[test]
    fn message_includes_status_and_body() {
        let err = CycleError::Webhook { status: 503, body: "down".into() };
        assert_eq!(err.to_string(), "webhook request failed with status 503: down");
    }
}
