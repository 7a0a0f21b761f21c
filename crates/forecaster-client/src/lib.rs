// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod headers;
pub mod orchestrator;

use anyhow::{Context, Result, bail};
use forecaster_app::{
    ForecastError, MAX_UPLOAD_BYTES, RequestPayload, SourceFile, UploadReceipt,
};
use reqwest::StatusCode;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client as HttpClient, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

pub use headers::sniff_headers;
pub use orchestrator::{ForecastBackend, Orchestrator};

pub const UPLOAD_PATH: &str = "/upload";
pub const FORECAST_PATH: &str = "/forecast";
pub const HEALTH_PATH: &str = "/health";

pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_FORECAST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub upload: Duration,
    pub forecast: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            upload: DEFAULT_UPLOAD_TIMEOUT,
            forecast: DEFAULT_FORECAST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeouts: Timeouts,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeouts: Timeouts) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("server.base_url must not be empty");
        }
        let parsed = url::Url::parse(&base_url)
            .with_context(|| format!("server.base_url {base_url:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "server.base_url {base_url:?} must use http or https, got {}",
                parsed.scheme()
            );
        }
        if timeouts.upload.is_zero() || timeouts.forecast.is_zero() {
            bail!("upload and forecast timeouts must be positive");
        }

        let http = HttpClient::builder()
            .connect_timeout(timeouts.upload)
            .timeout(None)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeouts,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub fn health(&self) -> Result<HealthStatus, ForecastError> {
        let response = self
            .http
            .get(self.endpoint(HEALTH_PATH))
            .timeout(self.timeouts.upload)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;
        let body = success_body(response)?;
        serde_json::from_slice(&body)
            .map_err(|error| ForecastError::malformed(format!("health response: {error}")))
    }

    pub fn ping(&self) -> Result<(), ForecastError> {
        let health = self.health()?;
        if !health.is_healthy() {
            return Err(ForecastError::Unexpected(format!(
                "backend at {} reports status {:?}",
                self.base_url, health.status
            )));
        }
        Ok(())
    }

    // Falls back to the local header row when the server omits it.
    pub fn upload(&self, file: &SourceFile) -> Result<UploadReceipt, ForecastError> {
        check_upload(file)?;
        let form = Form::new().part(RequestPayload::FILE_FIELD, file_part(file)?);

        info!(file = %file.file_name, bytes = file.len(), "uploading file");
        let response = self
            .http
            .post(self.endpoint(UPLOAD_PATH))
            .timeout(self.timeouts.upload)
            .multipart(form)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;
        let body = success_body(response)?;

        let mut receipt: UploadReceipt = serde_json::from_slice(&body)
            .map_err(|error| ForecastError::malformed(format!("upload response: {error}")))?;
        if receipt.column_headers.is_empty() {
            debug!(file = %file.file_name, "upload response has no headers; reading them locally");
            receipt.column_headers = sniff_headers(&file.data)?;
        }
        Ok(receipt)
    }

    pub fn forecast(&self, payload: &RequestPayload) -> Result<Value, ForecastError> {
        let mut form = Form::new().part(RequestPayload::FILE_FIELD, file_part(&payload.file)?);
        for (name, value) in payload.text_fields() {
            form = form.text(name, value);
        }

        let response = self
            .http
            .post(self.endpoint(FORECAST_PATH))
            .timeout(self.timeouts.forecast)
            .multipart(form)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;
        let body = success_body(response)?;

        serde_json::from_slice(&body)
            .map_err(|error| ForecastError::malformed(format!("forecast response: {error}")))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn check_upload(file: &SourceFile) -> Result<(), ForecastError> {
    let name = file.file_name.trim();
    if name.is_empty() {
        return Err(ForecastError::Precondition("No selected file.".to_owned()));
    }
    if !name.to_ascii_lowercase().ends_with(".csv") {
        return Err(ForecastError::Precondition(
            "Invalid file type. Please upload a CSV file.".to_owned(),
        ));
    }
    if file.is_empty() {
        return Err(ForecastError::Precondition(format!("{name} is empty.")));
    }
    if file.len() > MAX_UPLOAD_BYTES {
        return Err(ForecastError::Precondition(format!(
            "{name} is larger than the {} MiB upload limit.",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

fn file_part(file: &SourceFile) -> Result<Part, ForecastError> {
    Part::bytes(file.data.clone())
        .file_name(file.file_name.clone())
        .mime_str("text/csv")
        .map_err(|error| ForecastError::Unexpected(format!("build upload body: {error}")))
}

fn success_body(response: Response) -> Result<Vec<u8>, ForecastError> {
    let status = response.status();
    let body = response
        .bytes()
        .map_err(|error| ForecastError::Transport(format!("read response body: {error}")))?;
    if !status.is_success() {
        return Err(clean_error_response(status, &body));
    }
    Ok(body.to_vec())
}

fn connection_error(base_url: &str, error: reqwest::Error) -> ForecastError {
    if error.is_timeout() {
        return ForecastError::Transport(format!("{base_url} did not answer in time ({error})"));
    }
    ForecastError::Transport(format!("cannot reach {base_url} ({error})"))
}

fn clean_error_response(status: StatusCode, body: &[u8]) -> ForecastError {
    if let Ok(parsed) = serde_json::from_slice::<BackendErrorEnvelope>(body)
        && let Some(error) = parsed.error
        && !error.trim().is_empty()
    {
        let details = match parsed.details {
            None | Some(Value::Null) => None,
            Some(Value::String(details)) => Some(details),
            Some(other) => Some(other.to_string()),
        };
        return ForecastError::Backend {
            status: status.as_u16(),
            error,
            details,
        };
    }

    let text = String::from_utf8_lossy(body);
    let error = if text.len() < 100 && !text.contains('{') && !text.contains('<') {
        text.trim().to_owned()
    } else {
        status.canonical_reason().unwrap_or_default().to_owned()
    };
    ForecastError::Backend {
        status: status.as_u16(),
        error,
        details: None,
    }
}

#[derive(Debug, Deserialize)]
struct BackendErrorEnvelope {
    error: Option<String>,
    details: Option<Value>,
}
