// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use forecaster_app::{
    ForecastError, RequestPayload, SourceFile, UploadReceipt, WizardCommand, WizardEvent,
    WizardState, transform,
};
use serde_json::Value;

use crate::Client;

pub trait ForecastBackend {
    fn upload(&self, file: &SourceFile) -> Result<UploadReceipt, ForecastError>;
    fn forecast(&self, payload: &RequestPayload) -> Result<Value, ForecastError>;
}

impl ForecastBackend for Client {
    fn upload(&self, file: &SourceFile) -> Result<UploadReceipt, ForecastError> {
        Client::upload(self, file)
    }

    fn forecast(&self, payload: &RequestPayload) -> Result<Value, ForecastError> {
        Client::forecast(self, payload)
    }
}

#[derive(Debug)]
pub struct Orchestrator<B> {
    backend: B,
}

impl<B: ForecastBackend> Orchestrator<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn upload(
        &self,
        state: &mut WizardState,
        source: SourceFile,
    ) -> Result<Vec<WizardEvent>, ForecastError> {
        state.begin_upload()?;
        match self.backend.upload(&source) {
            Ok(receipt) => Ok(state.dispatch(WizardCommand::FileUploaded { source, receipt })),
            Err(error) => {
                state.record_failure(&error);
                Err(error)
            }
        }
    }

    pub fn submit(&self, state: &mut WizardState) -> Result<Vec<WizardEvent>, ForecastError> {
        let ticket = state.begin_forecast()?;
        let mut events = vec![WizardEvent::SubmitStarted(ticket.request_id)];

        let outcome = self
            .backend
            .forecast(&ticket.payload)
            .and_then(|body| transform(&body));
        let failure = outcome.as_ref().err().cloned();
        events.extend(state.complete_forecast(ticket.request_id, outcome));

        match failure {
            Some(error) => Err(error),
            None => Ok(events),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ForecastBackend, Orchestrator};
    use forecaster_app::{
        ColumnRole, ForecastError, ForecastFrequency, RequestPayload, SourceFile, UploadReceipt,
        WizardCommand, WizardEvent, WizardStage, WizardState,
    };
    use forecaster_testkit::{ResponseBuilder, sample_csv, sample_headers};
    use serde_json::Value;
    use std::cell::{Cell, RefCell};

    struct FakeBackend {
        upload_calls: Cell<usize>,
        forecast_calls: Cell<usize>,
        last_fields: RefCell<Vec<(&'static str, String)>>,
        response: Result<Value, ForecastError>,
    }

    impl FakeBackend {
        fn answering(response: Result<Value, ForecastError>) -> Self {
            Self {
                upload_calls: Cell::new(0),
                forecast_calls: Cell::new(0),
                last_fields: RefCell::new(Vec::new()),
                response,
            }
        }
    }

    impl ForecastBackend for FakeBackend {
        fn upload(&self, file: &SourceFile) -> Result<UploadReceipt, ForecastError> {
            self.upload_calls.set(self.upload_calls.get() + 1);
            Ok(UploadReceipt {
                filename: file.file_name.clone(),
                column_headers: sample_headers(),
            })
        }

        fn forecast(&self, payload: &RequestPayload) -> Result<Value, ForecastError> {
            self.forecast_calls.set(self.forecast_calls.get() + 1);
            *self.last_fields.borrow_mut() = payload.text_fields().to_vec();
            self.response.clone()
        }
    }

    fn six_month_response() -> Value {
        ResponseBuilder::new()
            .demo_history(24)
            .model("ARIMA", 6, 2.5)
            .model("ETS", 6, 3.0)
            .best("ARIMA")
            .build()
    }

    fn configure(state: &mut WizardState) {
        state.dispatch(WizardCommand::SetColumn(ColumnRole::Date, "Date".to_owned()));
        state.dispatch(WizardCommand::SetColumn(ColumnRole::Value, "Sales".to_owned()));
        state.dispatch(WizardCommand::SetFrequency(ForecastFrequency::Monthly));
        state.dispatch(WizardCommand::SetHorizon("6".to_owned()));
    }

    #[test]
    fn monthly_scenario_makes_one_request_and_yields_six_rows() {
        let orchestrator = Orchestrator::new(FakeBackend::answering(Ok(six_month_response())));
        let mut state = WizardState::default();
        orchestrator
            .upload(&mut state, SourceFile::new("sales.csv", sample_csv(24).into_bytes()))
            .expect("upload should succeed");
        configure(&mut state);

        let events = orchestrator.submit(&mut state).expect("submit should succeed");
        assert!(matches!(events[0], WizardEvent::SubmitStarted(_)));
        assert_eq!(orchestrator.backend().forecast_calls.get(), 1);

        let fields = orchestrator.backend().last_fields.borrow().clone();
        let names: Vec<_> = fields.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec!["selectedColumns", "selectedFrequency", "forecastPeriods"]
        );
        assert_eq!(fields[1].1, "Monthly");
        assert_eq!(fields[2].1, "6");

        assert_eq!(state.stage, WizardStage::Results);
        let results = state.results.as_ref().expect("results stored");
        assert_eq!(results.table_rows.len(), 6);
        assert!(state.in_flight.is_none());
    }

    #[test]
    fn invalid_selection_makes_no_request() {
        let orchestrator = Orchestrator::new(FakeBackend::answering(Ok(six_month_response())));
        let mut state = WizardState::default();
        orchestrator
            .upload(&mut state, SourceFile::new("sales.csv", sample_csv(3).into_bytes()))
            .expect("upload should succeed");
        configure(&mut state);
        state.dispatch(WizardCommand::SetColumn(ColumnRole::Value, "Date".to_owned()));

        let error = orchestrator
            .submit(&mut state)
            .expect_err("same column should be rejected");
        assert!(matches!(error, ForecastError::Validation { .. }));
        assert_eq!(orchestrator.backend().forecast_calls.get(), 0);
    }

    #[test]
    fn missing_file_makes_no_request() {
        let orchestrator = Orchestrator::new(FakeBackend::answering(Ok(six_month_response())));
        let mut state = WizardState::default();
        orchestrator
            .upload(&mut state, SourceFile::new("sales.csv", sample_csv(3).into_bytes()))
            .expect("upload should succeed");
        configure(&mut state);
        state.source = None;

        let error = orchestrator.submit(&mut state).expect_err("no file");
        assert_eq!(error, ForecastError::MissingFile);
        assert_eq!(orchestrator.backend().forecast_calls.get(), 0);
    }

    #[test]
    fn backend_failure_clears_in_flight_and_keeps_stage() {
        let orchestrator = Orchestrator::new(FakeBackend::answering(Err(
            ForecastError::Backend {
                status: 500,
                error: "boom".to_owned(),
                details: None,
            },
        )));
        let mut state = WizardState::default();
        orchestrator
            .upload(&mut state, SourceFile::new("sales.csv", sample_csv(3).into_bytes()))
            .expect("upload should succeed");
        configure(&mut state);

        let error = orchestrator.submit(&mut state).expect_err("backend failed");
        assert!(matches!(error, ForecastError::Backend { status: 500, .. }));
        assert!(state.in_flight.is_none());
        assert_eq!(state.stage, WizardStage::Configure);
        assert_eq!(
            state.status_line.as_deref(),
            Some("Server error (500): boom")
        );
        assert!(state.can_submit());
    }

    #[test]
    fn malformed_body_is_reported_once() {
        let body = ResponseBuilder::new().without_models().build();
        let orchestrator = Orchestrator::new(FakeBackend::answering(Ok(body)));
        let mut state = WizardState::default();
        orchestrator
            .upload(&mut state, SourceFile::new("sales.csv", sample_csv(3).into_bytes()))
            .expect("upload should succeed");
        configure(&mut state);

        let error = orchestrator.submit(&mut state).expect_err("malformed");
        assert!(matches!(error, ForecastError::MalformedResponse(_)));
        assert!(state.results.is_none());
        assert_eq!(
            state.status_line.as_deref(),
            Some("Received invalid results data from the server.")
        );
    }

    #[test]
    fn upload_waits_for_outstanding_forecast() {
        let orchestrator = Orchestrator::new(FakeBackend::answering(Ok(six_month_response())));
        let mut state = WizardState::default();
        orchestrator
            .upload(&mut state, SourceFile::new("sales.csv", sample_csv(3).into_bytes()))
            .expect("upload should succeed");
        configure(&mut state);
        let ticket = state.begin_forecast().expect("submit should start");

        let error = orchestrator
            .upload(&mut state, SourceFile::new("other.csv", b"When,Amount\n".to_vec()))
            .expect_err("second upload should wait");
        assert!(matches!(error, ForecastError::Precondition(_)));
        assert_eq!(orchestrator.backend().upload_calls.get(), 1);
        assert_eq!(
            state.source.as_ref().map(|source| source.file_name.as_str()),
            Some("sales.csv")
        );
        assert_eq!(state.in_flight, Some(ticket.request_id));
    }
}
