use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::source::{PACING_DELAY, ambient::MAX_HISTORY_LIMIT};

/// One day of 5-minute samples.
pub const DEFAULT_RESULTS_LIMIT: u32 = 288;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15 * 60);
pub const MAX_INTERVAL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration stored on disk. Every key is optional; command-line flags
/// and environment variables fill in or override what is missing.
///
/// Example TOML:
/// ```toml
/// application_key = "..."
/// api_key = "..."
/// device = "00:0E:C6:20:0F:7B"
/// webhook_url = "https://usetrmnl.com/api/custom_plugins/..."
/// results_limit = 288
/// interval_secs = 900
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub application_key: Option<String>,
    pub api_key: Option<String>,
    pub device: Option<String>,
    pub webhook_url: Option<String>,
    pub results_limit: Option<u32>,
    pub interval_secs: Option<u64>,
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub application_key: Option<String>,
    pub api_key: Option<String>,
    pub device: Option<String>,
    pub webhook_url: Option<String>,
    pub results_limit: Option<u32>,
    pub interval_secs: Option<u64>,
}

/// Fully resolved and validated runtime settings.
#[derive(Clone)]
pub struct Settings {
    pub application_key: String,
    pub api_key: String,
    pub device: String,
    pub webhook_url: Url,
    pub results_limit: u32,
    pub interval: Duration,
    pub pacing: Duration,
    pub request_timeout: Duration,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("device", &self.device)
            .field("webhook_host", &self.webhook_url.host_str())
            .field("results_limit", &self.results_limit)
            .field("interval", &self.interval)
            .field("pacing", &self.pacing)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "trmnl", "trmnl-wthr-svr")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Merge `overrides` over the stored values and validate the result.
    pub fn resolve(&self, overrides: &Overrides) -> Result<Settings> {
        let application_key = pick(&overrides.application_key, &self.application_key)
            .ok_or_else(|| missing("application key", "--application-key"))?;
        let api_key = pick(&overrides.api_key, &self.api_key)
            .ok_or_else(|| missing("API key", "--api-key"))?;
        let device = pick(&overrides.device, &self.device)
            .ok_or_else(|| missing("device MAC address", "--device"))?;
        let webhook_url = pick(&overrides.webhook_url, &self.webhook_url)
            .ok_or_else(|| missing("webhook URL", "--webhook-url"))?;

        let webhook_url = parse_webhook_url(&webhook_url)?;

        let results_limit =
            overrides.results_limit.or(self.results_limit).unwrap_or(DEFAULT_RESULTS_LIMIT);
        if !(1..=MAX_HISTORY_LIMIT).contains(&results_limit) {
            bail!("Results limit must be between 1 and {MAX_HISTORY_LIMIT}, got {results_limit}");
        }

        let interval = match overrides.interval_secs.or(self.interval_secs) {
            Some(0) => bail!("Poll interval must be at least one second"),
            Some(secs) if secs > MAX_INTERVAL.as_secs() => bail!(
                "Poll interval must be at most {} seconds (one week), got {secs}.\n\
                 Hint: pass a smaller --interval-secs or run `trmnl-wthr-svr configure`.",
                MAX_INTERVAL.as_secs()
            ),
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_INTERVAL,
        };

        Ok(Settings {
            application_key,
            api_key,
            device,
            webhook_url,
            results_limit,
            interval,
            pacing: PACING_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }
}

/// Parse a webhook URL, accepting only http and https.
pub fn parse_webhook_url(input: &str) -> Result<Url> {
    let url = Url::parse(input).with_context(|| format!("Invalid webhook URL '{input}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("Webhook URL must use http or https, got '{}'", url.scheme());
    }
    Ok(url)
}

fn pick(preferred: &Option<String>, fallback: &Option<String>) -> Option<String> {
    [preferred, fallback]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_owned)
}

fn missing(what: &str, flag: &str) -> anyhow::Error {
    anyhow!(
        "No {what} configured.\n\
         Hint: run `trmnl-wthr-svr configure` or pass {flag}."
    )
}
