// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use forecaster_app::{
    ColumnMapping, ColumnRole, ForecastError, ForecastFrequency, ForecastResults, ReportScope,
    SourceFile, ValidationField, WizardCommand, WizardState, report,
};
use forecaster_client::{ForecastBackend, Orchestrator};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardInput {
    pub source: SourceFile,
    pub mapping: ColumnMapping,
    pub frequency: ForecastFrequency,
    pub periods: String,
}

pub fn read_source(path: &Path) -> Result<SourceFile> {
    let Some(file_name) = path.file_name() else {
        bail!("{} does not name a file", path.display());
    };
    let data = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    Ok(SourceFile::new(&file_name.to_string_lossy(), data))
}

// `state` is left as the wizard saw it so callers can read the headers
// after a failure.
pub fn run_forecast<B: ForecastBackend>(
    orchestrator: &Orchestrator<B>,
    state: &mut WizardState,
    input: WizardInput,
) -> Result<ForecastResults, ForecastError> {
    orchestrator.upload(state, input.source)?;

    for role in ColumnRole::ALL {
        state.dispatch(WizardCommand::SetColumn(
            role,
            input.mapping.get(role).to_owned(),
        ));
    }
    state.dispatch(WizardCommand::SetFrequency(input.frequency));
    state.dispatch(WizardCommand::SetHorizon(input.periods));
    debug!(verdict = ?state.verdict, "selection applied");

    orchestrator.submit(state)?;
    state
        .results
        .clone()
        .ok_or_else(|| ForecastError::Unexpected("forecast finished without results".to_owned()))
}

pub fn failure_message(error: &ForecastError, headers: &[String]) -> String {
    let report = report(error);
    match report.scope {
        ReportScope::Banner => report.message,
        ReportScope::Field(ValidationField::Horizon) => format!("--periods: {}", report.message),
        ReportScope::Field(ValidationField::Columns) if headers.is_empty() => {
            format!("--date/--value: {}", report.message)
        }
        ReportScope::Field(ValidationField::Columns) => format!(
            "--date/--value: {} Available columns: {}",
            report.message,
            headers.join(", ")
        ),
    }
}
