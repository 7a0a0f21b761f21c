// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use forecaster_app::{DEFAULT_HORIZON, ForecastFrequency, ForecastHorizon};
use forecaster_client::Timeouts;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "forecaster";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_UPLOAD_TIMEOUT: &str = "30s";
const DEFAULT_FORECAST_TIMEOUT: &str = "5m";
const DEFAULT_LOG_LEVEL: &str = "warn";
const CONFIG_PATH_ENV: &str = "FORECASTER_CONFIG_PATH";
const BASE_URL_ENV: &str = "FORECASTER_BASE_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub timeouts: TimeoutSettings,
    #[serde(default)]
    pub forecast: ForecastDefaults,
    #[serde(default)]
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: Server::default(),
            timeouts: TimeoutSettings::default(),
            forecast: ForecastDefaults::default(),
            logging: Logging::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Server {
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutSettings {
    pub upload: Option<String>,
    pub forecast: Option<String>,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            upload: Some(DEFAULT_UPLOAD_TIMEOUT.to_owned()),
            forecast: Some(DEFAULT_FORECAST_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastDefaults {
    pub default_frequency: Option<String>,
    pub default_periods: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Logging {
    pub level: Option<String>,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [server], [timeouts], [forecast], and [logging]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.server.base_url
            && base_url.trim().is_empty()
        {
            bail!("server.base_url in {} must not be empty", path.display());
        }

        for (key, raw) in [
            ("timeouts.upload", &self.timeouts.upload),
            ("timeouts.forecast", &self.timeouts.forecast),
        ] {
            if let Some(raw) = raw {
                let parsed = parse_duration(raw)?;
                if parsed.is_zero() {
                    bail!(
                        "{key} in {} must be positive, got {raw}",
                        path.display()
                    );
                }
            }
        }

        if let Some(frequency) = &self.forecast.default_frequency
            && ForecastFrequency::parse(frequency).is_none()
        {
            bail!(
                "forecast.default_frequency in {} must be one of {}, got {frequency:?}",
                path.display(),
                frequency_names()
            );
        }

        if let Some(periods) = self.forecast.default_periods
            && periods < 1
        {
            bail!(
                "forecast.default_periods in {} must be a positive integer, got {periods}",
                path.display()
            );
        }

        Ok(())
    }

    pub fn base_url(&self) -> String {
        let configured = self
            .server
            .base_url
            .clone()
            .or_else(|| env::var(BASE_URL_ENV).ok().filter(|url| !url.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        configured.trim().trim_end_matches('/').to_owned()
    }

    pub fn timeouts(&self) -> Result<Timeouts> {
        Ok(Timeouts {
            upload: parse_duration(
                self.timeouts
                    .upload
                    .as_deref()
                    .unwrap_or(DEFAULT_UPLOAD_TIMEOUT),
            )?,
            forecast: parse_duration(
                self.timeouts
                    .forecast
                    .as_deref()
                    .unwrap_or(DEFAULT_FORECAST_TIMEOUT),
            )?,
        })
    }

    pub fn default_frequency(&self) -> ForecastFrequency {
        self.forecast
            .default_frequency
            .as_deref()
            .and_then(ForecastFrequency::parse)
            .unwrap_or_default()
    }

    pub fn default_periods(&self) -> String {
        self.forecast
            .default_periods
            .and_then(|periods| u32::try_from(periods).ok())
            .and_then(ForecastHorizon::new)
            .map_or_else(|| DEFAULT_HORIZON.to_owned(), |horizon| horizon.to_string())
    }

    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# forecaster config\n# Place this file at: {}\n\nversion = 1\n\n[server]\n# Optional. {BASE_URL_ENV} is used when this is unset.\nbase_url = \"{DEFAULT_BASE_URL}\"\n\n[timeouts]\nupload = \"{DEFAULT_UPLOAD_TIMEOUT}\"\nforecast = \"{DEFAULT_FORECAST_TIMEOUT}\"\n\n[forecast]\n# One of {}\ndefault_frequency = \"{}\"\ndefault_periods = {DEFAULT_HORIZON}\n\n[logging]\n# Overridden by RUST_LOG.\nlevel = \"{DEFAULT_LOG_LEVEL}\"\n",
            path.display(),
            frequency_names(),
            ForecastFrequency::default(),
        )
    }
}

fn frequency_names() -> String {
    ForecastFrequency::ALL
        .iter()
        .map(|frequency| frequency.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 30s)")
}
