// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

use crate::ValidationField;

pub const MISSING_FILE_MESSAGE: &str = "Original file data is missing. Please upload the file again.";
pub const NO_RESPONSE_MESSAGE: &str =
    "No response from server. Check that the forecasting backend is running and reachable.";
pub const INVALID_RESULTS_MESSAGE: &str = "Received invalid results data from the server.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForecastError {
    #[error("{message}")]
    Validation {
        field: ValidationField,
        message: String,
    },

    #[error("original file data is missing")]
    MissingFile,

    #[error("{0}")]
    Precondition(String),

    #[error("no response from server: {0}")]
    Transport(String),

    #[error("server error ({status}): {error}")]
    Backend {
        status: u16,
        error: String,
        details: Option<String>,
    },

    #[error("invalid results data: {0}")]
    MalformedResponse(String),

    #[error("{0}")]
    Unexpected(String),
}

impl ForecastError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse(reason.into())
    }

    // Raised before anything was sent.
    pub const fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::MissingFile | Self::Precondition(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportScope {
    Field(ValidationField),
    Banner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub scope: ReportScope,
    pub message: String,
}

pub fn report(error: &ForecastError) -> ErrorReport {
    let (scope, message) = match error {
        ForecastError::Validation { field, message } => {
            (ReportScope::Field(*field), message.clone())
        }
        ForecastError::MissingFile => (ReportScope::Banner, MISSING_FILE_MESSAGE.to_owned()),
        ForecastError::Precondition(message) => (ReportScope::Banner, message.clone()),
        ForecastError::Transport(_) => (ReportScope::Banner, NO_RESPONSE_MESSAGE.to_owned()),
        ForecastError::Backend {
            status,
            error,
            details,
        } => (ReportScope::Banner, backend_message(*status, error, details.as_deref())),
        ForecastError::MalformedResponse(_) => {
            (ReportScope::Banner, INVALID_RESULTS_MESSAGE.to_owned())
        }
        ForecastError::Unexpected(message) => (ReportScope::Banner, message.clone()),
    };

    ErrorReport { scope, message }
}

fn backend_message(status: u16, error: &str, details: Option<&str>) -> String {
    let error = error.trim();
    let mut out = if error.is_empty() {
        format!("Server error ({status})")
    } else {
        format!("Server error ({status}): {error}")
    };
    if let Some(details) = details.map(str::trim)
        && !details.is_empty()
    {
        out.push_str(" -- details: ");
        out.push_str(details);
    }
    out
}
