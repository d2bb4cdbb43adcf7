//! Core library for `trmnl-wthr-svr`.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The Ambient Weather source and TRMNL webhook boundaries
//! - Hourly aggregation of historical readings
//! - The update cycle and the polling scheduler that drives it
//!
//! It is used by `trmnl-wthr-svr`, but can also be embedded in other services.

pub mod aggregate;
pub mod coerce;
pub mod config;
pub mod cycle;
pub mod error;
pub mod model;
pub mod project;
pub mod scheduler;
pub mod source;
pub mod webhook;

#[cfg(test)]
mod test_server;

pub use aggregate::aggregate;
pub use config::{Config, Overrides, Settings};
pub use cycle::UpdateCycle;
pub use error::{CycleError, ErrorKind};
pub use model::{BucketedRecord, DeviceRecord, Reading, WebhookPayload};
pub use project::project;
pub use scheduler::{PollScheduler, SchedulerState};
pub use source::{StationSource, ambient::AmbientWeatherSource};
pub use webhook::{HttpWebhook, WebhookTarget};
