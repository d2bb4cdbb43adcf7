use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use inquire::{CustomType, Password, Text, validator::Validation};
use trmnl_wthr_core::{
    Config, Overrides, PollScheduler, UpdateCycle,
    config::{DEFAULT_INTERVAL, DEFAULT_RESULTS_LIMIT, MAX_INTERVAL, parse_webhook_url},
    source::ambient::MAX_HISTORY_LIMIT,
};

use crate::shutdown::shutdown_signal;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "trmnl-wthr-svr",
    version,
    about = "Ambient Weather webhook server for TRMNL displays"
)]
pub struct Cli {
    /// Enable debug logging.
    #[arg(short = 'D', long, global = true, env = "TRMNL_WTHR_SVR_DEBUG")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll Ambient Weather on a fixed interval and push each result to the webhook.
    Serve {
        #[command(flatten)]
        station: StationArgs,

        /// Seconds between updates.
        #[arg(long, env = "TRMNL_WTHR_SVR_INTERVAL_SECS")]
        interval_secs: Option<u64>,
    },

    /// Run a single update and exit.
    Update {
        #[command(flatten)]
        station: StationArgs,
    },

    /// Interactively store credentials, device and webhook in the config file.
    Configure,
}

#[derive(Debug, Args)]
pub struct StationArgs {
    /// Ambient Weather API "application" key.
    #[arg(long, env = "TRMNL_WTHR_SVR_APP_KEY", hide_env_values = true)]
    application_key: Option<String>,

    /// Ambient Weather API key.
    #[arg(long, env = "TRMNL_WTHR_SVR_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Device MAC address.
    #[arg(long, env = "TRMNL_WTHR_SVR_DEVICE")]
    device: Option<String>,

    /// TRMNL plugin webhook URL.
    #[arg(long, env = "TRMNL_WTHR_SVR_WEBHOOK_URL", hide_env_values = true)]
    webhook_url: Option<String>,

    /// Number of historical records to request (at most 288).
    #[arg(long, env = "TRMNL_WTHR_SVR_RESULTS_LIMIT")]
    results_limit: Option<u32>,
}

impl StationArgs {
    fn into_overrides(self, interval_secs: Option<u64>) -> Overrides {
        Overrides {
            application_key: self.application_key,
            api_key: self.api_key,
            device: self.device,
            webhook_url: self.webhook_url,
            results_limit: self.results_limit,
            interval_secs,
        }
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Serve { station, interval_secs } => {
                let settings = Config::load()?.resolve(&station.into_overrides(interval_secs))?;
                tracing::debug!(?settings, "resolved settings");

                let cycle = UpdateCycle::from_settings(&settings)?;
                let mut scheduler = PollScheduler::new(cycle, settings.interval);
                scheduler.run(shutdown_signal()).await;
            }
            Command::Update { station } => {
                let settings = Config::load()?.resolve(&station.into_overrides(None))?;
                tracing::debug!(?settings, "resolved settings");

                let cycle = UpdateCycle::from_settings(&settings)?;
                cycle.run().await.context("Update failed")?;
            }
            Command::Configure => configure()?,
        }

        Ok(())
    }
}

fn configure() -> Result<()> {
    let mut cfg = Config::load()?;

    let application_key = Password::new("Ambient Weather application key:")
        .without_confirmation()
        .with_help_message("Leave empty to keep the current value")
        .prompt()?;
    let api_key = Password::new("Ambient Weather API key:")
        .without_confirmation()
        .with_help_message("Leave empty to keep the current value")
        .prompt()?;

    let device = prompt_text("Device MAC address:", cfg.device.as_deref())?;
    let webhook_url = Text::new("TRMNL webhook URL:")
        .with_default(cfg.webhook_url.as_deref().unwrap_or_default())
        .with_validator(|input: &str| {
            Ok(if parse_webhook_url(input.trim()).is_ok() {
                Validation::Valid
            } else {
                Validation::Invalid("Enter an http(s) URL".into())
            })
        })
        .prompt()?;

    let results_limit = CustomType::<u32>::new("Historical records to request:")
        .with_default(cfg.results_limit.unwrap_or(DEFAULT_RESULTS_LIMIT))
        .with_validator(|limit: &u32| {
            Ok(if (1..=MAX_HISTORY_LIMIT).contains(limit) {
                Validation::Valid
            } else {
                Validation::Invalid(format!("Must be between 1 and {MAX_HISTORY_LIMIT}").into())
            })
        })
        .prompt()?;

    let interval_secs = CustomType::<u64>::new("Seconds between updates:")
        .with_default(cfg.interval_secs.unwrap_or(DEFAULT_INTERVAL.as_secs()))
        .with_validator(|secs: &u64| {
            Ok(if (1..=MAX_INTERVAL.as_secs()).contains(secs) {
                Validation::Valid
            } else {
                Validation::Invalid(
                    format!("Must be between 1 and {} seconds", MAX_INTERVAL.as_secs()).into(),
                )
            })
        })
        .prompt()?;

    if !application_key.trim().is_empty() {
        cfg.application_key = Some(application_key.trim().to_string());
    }
    if !api_key.trim().is_empty() {
        cfg.api_key = Some(api_key.trim().to_string());
    }
    cfg.device = Some(device);
    cfg.webhook_url = Some(webhook_url.trim().to_string());
    cfg.results_limit = Some(results_limit);
    cfg.interval_secs = Some(interval_secs);

    let path = cfg.save()?;
    println!("Configuration saved to {}", path.display());

    Ok(())
}

fn prompt_text(message: &str, current: Option<&str>) -> Result<String> {
    let answer = Text::new(message)
        .with_default(current.unwrap_or_default())
        .with_validator(|input: &str| {
            Ok(if input.trim().is_empty() {
                Validation::Invalid("A value is required".into())
            } else {
                Validation::Valid
            })
        })
        .prompt()?;

    Ok(answer.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "trmnl-wthr-svr",
            "-D",
            "serve",
            "--application-key",
            "APP",
            "--device",
            "AA:BB",
            "--results-limit",
            "10",
            "--interval-secs",
            "60",
        ])
        .unwrap();

        assert!(cli.debug);
        let Command::Serve { station, interval_secs } = cli.command else {
            panic!("expected serve");
        };
        let overrides = station.into_overrides(interval_secs);

        assert_eq!(overrides.application_key.as_deref(), Some("APP"));
        assert_eq!(overrides.device.as_deref(), Some("AA:BB"));
        assert_eq!(overrides.results_limit, Some(10));
        assert_eq!(overrides.interval_secs, Some(60));
    }

    #[test]
    fn update_has_no_interval() {
        let result = Cli::try_parse_from(["trmnl-wthr-svr", "update", "--interval-secs", "60"]);
        assert!(result.is_err());
    }
}
