// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::{debug, info, warn};

use crate::{
    ColumnMapping, ColumnRole, ForecastError, ForecastFrequency, ForecastHorizon, ForecastResults,
    RequestId, RequestPayload, SourceFile, UploadReceipt, Verdict, WizardStage, report, validate,
};

pub const DEFAULT_HORIZON: &str = "12";
pub const IN_FLIGHT_MESSAGE: &str = "A forecast is already running; wait for it to finish.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub mapping: ColumnMapping,
    pub frequency: ForecastFrequency,
    // Raw text as typed.
    pub horizon: String,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            mapping: ColumnMapping::default(),
            frequency: ForecastFrequency::default(),
            horizon: DEFAULT_HORIZON.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WizardState {
    pub stage: WizardStage,
    pub source: Option<SourceFile>,
    pub headers: Vec<String>,
    pub uploaded_name: Option<String>,
    pub selection: Selection,
    pub verdict: Verdict,
    pub in_flight: Option<RequestId>,
    pub results: Option<ForecastResults>,
    pub status_line: Option<String>,
    last_request: RequestId,
}

impl Default for WizardState {
    fn default() -> Self {
        let selection = Selection::default();
        let verdict = validate(
            &selection.mapping,
            selection.frequency,
            &selection.horizon,
            &[],
        );
        Self {
            stage: WizardStage::Upload,
            source: None,
            headers: Vec::new(),
            uploaded_name: None,
            selection,
            verdict,
            in_flight: None,
            results: None,
            status_line: None,
            last_request: RequestId::new(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardCommand {
    FileUploaded {
        source: SourceFile,
        receipt: UploadReceipt,
    },
    SetColumn(ColumnRole, String),
    SetFrequency(ForecastFrequency),
    SetHorizon(String),
    BackToConfigure,
    Reset,
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEvent {
    StageChanged(WizardStage),
    SelectionChanged,
    VerdictChanged(Verdict),
    SubmitStarted(RequestId),
    ResultsReady(RequestId),
    SubmitFailed(RequestId),
    StatusUpdated(String),
    StatusCleared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastTicket {
    pub request_id: RequestId,
    pub payload: RequestPayload,
}

impl WizardState {
    pub fn dispatch(&mut self, command: WizardCommand) -> Vec<WizardEvent> {
        match command {
            WizardCommand::FileUploaded { source, receipt } => {
                if let Some(request_id) = self.in_flight {
                    debug!(
                        request = %request_id,
                        file = %receipt.filename,
                        "upload ignored while forecasting"
                    );
                    return vec![self.set_status(IN_FLIGHT_MESSAGE)];
                }
                info!(
                    file = %receipt.filename,
                    columns = receipt.column_headers.len(),
                    "file uploaded"
                );
                self.uploaded_name = Some(receipt.filename);
                self.headers = receipt.column_headers;
                self.source = Some(source);
                self.selection.mapping = ColumnMapping::default();
                self.results = None;
                self.stage = WizardStage::Configure;
                let mut events = vec![WizardEvent::StageChanged(self.stage)];
                events.extend(self.revalidate());
                events
            }
            WizardCommand::SetColumn(role, column) => {
                self.selection.mapping.set(role, &column);
                self.selection_changed()
            }
            WizardCommand::SetFrequency(frequency) => {
                self.selection.frequency = frequency;
                self.selection_changed()
            }
            WizardCommand::SetHorizon(horizon) => {
                self.selection.horizon = horizon;
                self.selection_changed()
            }
            WizardCommand::BackToConfigure => {
                if self.stage != WizardStage::Results {
                    return Vec::new();
                }
                self.stage = WizardStage::Configure;
                vec![WizardEvent::StageChanged(self.stage)]
            }
            WizardCommand::Reset => {
                let last_request = self.last_request;
                *self = Self {
                    last_request,
                    ..Self::default()
                };
                vec![
                    WizardEvent::StageChanged(self.stage),
                    WizardEvent::VerdictChanged(self.verdict.clone()),
                ]
            }
            WizardCommand::ClearStatus => {
                self.status_line = None;
                vec![WizardEvent::StatusCleared]
            }
        }
    }

    pub fn can_submit(&self) -> bool {
        self.verdict.is_valid() && self.source.is_some() && self.in_flight.is_none()
    }

    // Source and headers stay fixed while a request is outstanding.
    pub fn begin_upload(&mut self) -> Result<(), ForecastError> {
        if self.in_flight.is_some() {
            return Err(self.reject(ForecastError::Precondition(IN_FLIGHT_MESSAGE.to_owned())));
        }
        Ok(())
    }

    pub fn begin_forecast(&mut self) -> Result<ForecastTicket, ForecastError> {
        if self.in_flight.is_some() {
            return Err(self.reject(ForecastError::Precondition(IN_FLIGHT_MESSAGE.to_owned())));
        }

        self.verdict = self.current_verdict();
        match self.verdict.clone() {
            Verdict::Valid => {}
            Verdict::Incomplete => {
                return Err(self.reject(ForecastError::Precondition(
                    "Select both a Date and a Value column.".to_owned(),
                )));
            }
            Verdict::Invalid { field, message } => {
                let error = ForecastError::Validation {
                    field,
                    message: message.to_owned(),
                };
                return Err(self.reject(error));
            }
        }

        let Some(file) = self.source.clone() else {
            return Err(self.reject(ForecastError::MissingFile));
        };
        let Some(horizon) = ForecastHorizon::parse(&self.selection.horizon) else {
            return Err(self.reject(ForecastError::Unexpected(
                "forecast periods changed during validation".to_owned(),
            )));
        };

        let request_id = self.last_request.next();
        self.last_request = request_id;
        self.in_flight = Some(request_id);
        self.status_line = Some("Generating forecast...".to_owned());
        info!(
            request = %request_id,
            frequency = %self.selection.frequency,
            periods = horizon.get(),
            "forecast submitted"
        );

        Ok(ForecastTicket {
            request_id,
            payload: RequestPayload {
                file,
                mapping: self.selection.mapping.clone(),
                frequency: self.selection.frequency,
                horizon,
            },
        })
    }

    pub fn complete_forecast(
        &mut self,
        request_id: RequestId,
        outcome: Result<ForecastResults, ForecastError>,
    ) -> Vec<WizardEvent> {
        if self.in_flight != Some(request_id) {
            debug!(request = %request_id, "ignoring stale forecast completion");
            return Vec::new();
        }
        self.in_flight = None;

        match outcome {
            Ok(results) => {
                info!(
                    request = %request_id,
                    series = results.series.len(),
                    rows = results.table_rows.len(),
                    "forecast results ready"
                );
                let message = results.best_model_message();
                self.results = Some(results);
                self.stage = WizardStage::Results;
                vec![
                    WizardEvent::ResultsReady(request_id),
                    WizardEvent::StageChanged(self.stage),
                    self.set_status(&message),
                ]
            }
            Err(error) => {
                warn!(request = %request_id, %error, "forecast attempt failed");
                let report = report(&error);
                vec![
                    WizardEvent::SubmitFailed(request_id),
                    self.set_status(&report.message),
                ]
            }
        }
    }

    pub fn current_verdict(&self) -> Verdict {
        validate(
            &self.selection.mapping,
            self.selection.frequency,
            &self.selection.horizon,
            &self.headers,
        )
    }

    fn selection_changed(&mut self) -> Vec<WizardEvent> {
        let mut events = vec![WizardEvent::SelectionChanged];
        events.extend(self.revalidate());
        events
    }

    fn revalidate(&mut self) -> Option<WizardEvent> {
        let verdict = self.current_verdict();
        if verdict == self.verdict {
            return None;
        }
        debug!(?verdict, "selection verdict changed");
        self.verdict = verdict.clone();
        Some(WizardEvent::VerdictChanged(verdict))
    }

    pub fn record_failure(&mut self, error: &ForecastError) -> WizardEvent {
        if !error.is_local() {
            warn!(%error, "request failed");
        }
        let message = report(error).message;
        self.set_status(&message)
    }

    fn reject(&mut self, error: ForecastError) -> ForecastError {
        self.record_failure(&error);
        error
    }

    fn set_status(&mut self, message: &str) -> WizardEvent {
        self.status_line = Some(message.to_owned());
        WizardEvent::StatusUpdated(message.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::{IN_FLIGHT_MESSAGE, WizardCommand, WizardEvent, WizardState};
    use crate::{
        ColumnRole, ForecastError, ForecastFrequency, SAME_COLUMN_MESSAGE, SourceFile,
        UploadReceipt, ValidationField, Verdict, WizardStage, transform,
    };
    use serde_json::json;

    fn uploaded_state() -> WizardState {
        let mut state = WizardState::default();
        state.dispatch(WizardCommand::FileUploaded {
            source: SourceFile::new("sales.csv", b"Date,Sales,Region\n".to_vec()),
            receipt: UploadReceipt {
                filename: "sales.csv".to_owned(),
                column_headers: vec!["Date".to_owned(), "Sales".to_owned(), "Region".to_owned()],
            },
        });
        state
    }

    fn configured_state() -> WizardState {
        let mut state = uploaded_state();
        state.dispatch(WizardCommand::SetColumn(ColumnRole::Date, "Date".to_owned()));
        state.dispatch(WizardCommand::SetColumn(ColumnRole::Value, "Sales".to_owned()));
        state.dispatch(WizardCommand::SetFrequency(ForecastFrequency::Monthly));
        state.dispatch(WizardCommand::SetHorizon("6".to_owned()));
        state
    }

    #[test]
    fn upload_moves_to_configure_with_incomplete_verdict() {
        let state = uploaded_state();
        assert_eq!(state.stage, WizardStage::Configure);
        assert_eq!(state.verdict, Verdict::Incomplete);
        assert!(!state.can_submit());
    }

    #[test]
    fn every_selection_change_revalidates() {
        let mut state = uploaded_state();
        state.dispatch(WizardCommand::SetColumn(ColumnRole::Date, "Date".to_owned()));
        let events =
            state.dispatch(WizardCommand::SetColumn(ColumnRole::Value, "Date".to_owned()));
        assert_eq!(
            events,
            vec![
                WizardEvent::SelectionChanged,
                WizardEvent::VerdictChanged(Verdict::Invalid {
                    field: ValidationField::Columns,
                    message: SAME_COLUMN_MESSAGE,
                }),
            ]
        );

        let events =
            state.dispatch(WizardCommand::SetColumn(ColumnRole::Value, "Sales".to_owned()));
        assert_eq!(events[1], WizardEvent::VerdictChanged(Verdict::Valid));
        assert!(state.can_submit());
    }

    #[test]
    fn unchanged_verdict_emits_only_selection_event() {
        let mut state = configured_state();
        let events = state.dispatch(WizardCommand::SetFrequency(ForecastFrequency::Weekly));
        assert_eq!(events, vec![WizardEvent::SelectionChanged]);
    }

    #[test]
    fn second_submit_is_rejected_while_one_is_in_flight() {
        let mut state = configured_state();
        let ticket = state.begin_forecast().expect("first submit should start");
        assert!(!state.can_submit());

        let error = state
            .begin_forecast()
            .expect_err("second submit should be rejected");
        assert_eq!(error, ForecastError::Precondition(IN_FLIGHT_MESSAGE.to_owned()));
        assert_eq!(state.in_flight, Some(ticket.request_id));
    }

    #[test]
    fn ticket_carries_validated_payload() {
        let mut state = configured_state();
        let ticket = state.begin_forecast().expect("submit should start");
        assert_eq!(ticket.payload.mapping.date, "Date");
        assert_eq!(ticket.payload.mapping.value, "Sales");
        assert_eq!(ticket.payload.frequency, ForecastFrequency::Monthly);
        assert_eq!(ticket.payload.horizon.get(), 6);
        assert_eq!(ticket.payload.file.file_name, "sales.csv");
    }

    #[test]
    fn missing_file_fails_before_marking_in_flight() {
        let mut state = configured_state();
        state.source = None;
        let error = state.begin_forecast().expect_err("missing file should fail");
        assert_eq!(error, ForecastError::MissingFile);
        assert!(state.in_flight.is_none());
        assert!(state.status_line.is_some());
    }

    #[test]
    fn invalid_selection_is_a_validation_error() {
        let mut state = configured_state();
        state.dispatch(WizardCommand::SetHorizon("0".to_owned()));
        let error = state.begin_forecast().expect_err("bad horizon should fail");
        assert!(matches!(
            error,
            ForecastError::Validation {
                field: ValidationField::Horizon,
                ..
            }
        ));
        assert!(state.in_flight.is_none());
    }

    #[test]
    fn failure_keeps_selection_editable() {
        let mut state = configured_state();
        let before = state.selection.clone();
        let ticket = state.begin_forecast().expect("submit should start");

        let events = state.complete_forecast(
            ticket.request_id,
            Err(ForecastError::Transport("timed out".to_owned())),
        );
        assert_eq!(events[0], WizardEvent::SubmitFailed(ticket.request_id));
        assert_eq!(state.selection, before);
        assert_eq!(state.stage, WizardStage::Configure);
        assert!(state.can_submit());
    }

    #[test]
    fn success_moves_to_results_and_stale_completion_is_ignored() {
        let mut state = configured_state();
        let ticket = state.begin_forecast().expect("submit should start");
        let results = transform(&json!({
            "historicalData": [],
            "modelResults": {},
            "bestMethod": null,
        }))
        .expect("empty response should transform");

        let stale = state.complete_forecast(ticket.request_id.next(), Ok(results.clone()));
        assert!(stale.is_empty());
        assert_eq!(state.in_flight, Some(ticket.request_id));

        state.complete_forecast(ticket.request_id, Ok(results));
        assert_eq!(state.stage, WizardStage::Results);
        assert!(state.results.is_some());
        assert!(state.in_flight.is_none());

        state.dispatch(WizardCommand::BackToConfigure);
        assert_eq!(state.stage, WizardStage::Configure);
    }

    #[test]
    fn reset_keeps_request_counter_monotonic() {
        let mut state = configured_state();
        let first = state.begin_forecast().expect("submit should start");
        state.dispatch(WizardCommand::Reset);
        assert_eq!(state.stage, WizardStage::Upload);
        assert!(state.in_flight.is_none());
        assert!(state.source.is_none());

        let late = state.complete_forecast(
            first.request_id,
            Err(ForecastError::Transport("late".to_owned())),
        );
        assert!(late.is_empty());

        state.dispatch(WizardCommand::FileUploaded {
            source: SourceFile::new("sales.csv", b"Date,Sales\n".to_vec()),
            receipt: UploadReceipt {
                filename: "sales.csv".to_owned(),
                column_headers: vec!["Date".to_owned(), "Sales".to_owned()],
            },
        });
        state.dispatch(WizardCommand::SetColumn(ColumnRole::Date, "Date".to_owned()));
        state.dispatch(WizardCommand::SetColumn(ColumnRole::Value, "Sales".to_owned()));
        let second = state.begin_forecast().expect("submit should start");
        assert!(second.request_id > first.request_id);
    }

    #[test]
    fn upload_during_forecast_keeps_the_submitted_file() {
        let mut state = configured_state();
        let ticket = state.begin_forecast().expect("submit should start");

        let events = state.dispatch(WizardCommand::FileUploaded {
            source: SourceFile::new("other.csv", b"When,Amount\n".to_vec()),
            receipt: UploadReceipt {
                filename: "other.csv".to_owned(),
                column_headers: vec!["When".to_owned(), "Amount".to_owned()],
            },
        });
        assert_eq!(
            events,
            vec![WizardEvent::StatusUpdated(IN_FLIGHT_MESSAGE.to_owned())]
        );
        assert_eq!(state.uploaded_name.as_deref(), Some("sales.csv"));
        assert_eq!(state.headers, vec!["Date", "Sales", "Region"]);
        assert_eq!(
            state.source.as_ref().map(|source| source.file_name.as_str()),
            Some("sales.csv")
        );
        assert_eq!(state.selection.mapping.date, "Date");

        let error = state
            .begin_upload()
            .expect_err("upload should wait for the forecast");
        assert_eq!(error, ForecastError::Precondition(IN_FLIGHT_MESSAGE.to_owned()));

        let results = transform(&json!({
            "historicalData": [],
            "modelResults": {},
            "bestMethod": null,
        }))
        .expect("empty response should transform");
        state.complete_forecast(ticket.request_id, Ok(results));
        assert_eq!(state.stage, WizardStage::Results);
        assert!(state.begin_upload().is_ok());
    }

    #[test]
    fn clear_status_removes_message() {
        let mut state = configured_state();
        state.source = None;
        let _ = state.begin_forecast();
        assert!(state.status_line.is_some());
        let events = state.dispatch(WizardCommand::ClearStatus);
        assert_eq!(events, vec![WizardEvent::StatusCleared]);
        assert!(state.status_line.is_none());
    }
}
