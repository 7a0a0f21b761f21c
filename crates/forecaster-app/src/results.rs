// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::{Map, Value};
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};
use tracing::debug;

use crate::ForecastError;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const DATE_TIME_T_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
);
const DATE_TIME_SPACE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
);
const LABEL_DATE_TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

const HISTORICAL_LABEL: &str = "Historical";
const MISSING_NUMBER: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(OffsetDateTime);

impl Timestamp {
    pub const fn new(instant: OffsetDateTime) -> Self {
        Self(instant)
    }

    pub const fn get(self) -> OffsetDateTime {
        self.0
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(instant) = OffsetDateTime::parse(raw, &Rfc3339) {
            return Some(Self(instant));
        }
        if let Ok(instant) = OffsetDateTime::parse(raw, &Rfc2822) {
            return Some(Self(instant));
        }
        for format in [DATE_TIME_T_FORMAT, DATE_TIME_SPACE_FORMAT] {
            if let Ok(instant) = PrimitiveDateTime::parse(raw, format) {
                return Some(Self(instant.assume_utc()));
            }
        }
        Date::parse(raw, DATE_FORMAT)
            .ok()
            .map(|date| Self(date.midnight().assume_utc()))
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(raw) => Self::parse(raw),
            Value::Number(number) => {
                let millis = match number.as_i64() {
                    Some(millis) => i128::from(millis),
                    None => {
                        let millis = number.as_f64()?;
                        if !millis.is_finite() || millis.fract() != 0.0 {
                            return None;
                        }
                        millis as i128
                    }
                };
                OffsetDateTime::from_unix_timestamp_nanos(millis.checked_mul(1_000_000)?)
                    .ok()
                    .map(Self)
            }
            _ => None,
        }
    }

    pub fn unix_seconds(self) -> f64 {
        self.0.unix_timestamp() as f64
    }

    pub fn label(self) -> String {
        let utc = self.0.to_offset(time::UtcOffset::UTC);
        let format = if utc.time() == time::Time::MIDNIGHT {
            DATE_FORMAT
        } else {
            LABEL_DATE_TIME_FORMAT
        };
        utc.format(format)
            .unwrap_or_else(|_| utc.unix_timestamp().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotPoint {
    pub x: Timestamp,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Historical,
    Forecast,
    LowerBound,
    UpperBound,
}

impl SeriesKind {
    pub const fn is_band(self) -> bool {
        matches!(self, Self::LowerBound | Self::UpperBound)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    LinesAndMarkers,
    Lines,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDash {
    Solid,
    Dash,
    Dot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesStyle {
    pub mode: DrawMode,
    pub dash: LineDash,
    pub width: u8,
    pub emphasized: bool,
}

// Shade down to the series directly before this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillReference {
    PreviousSeries,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    pub label: String,
    pub kind: SeriesKind,
    pub model: Option<String>,
    pub points: Vec<PlotPoint>,
    pub style: SeriesStyle,
    pub fill: Option<FillReference>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub date: String,
    pub forecast: String,
    pub lower: String,
    pub upper: String,
}

impl TableRow {
    pub const HEADERS: [&'static str; 4] = ["Date", "Forecast", "Lower Bound", "Upper Bound"];

    pub fn cells(&self) -> [&str; 4] {
        [&self.date, &self.forecast, &self.lower, &self.upper]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSummary {
    pub name: String,
    pub rmse: Option<f64>,
    pub failure: Option<String>,
    pub charted: bool,
    pub best: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestModelStatus {
    Ready,
    Failed { reason: String },
    NoData,
    NotDesignated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResults {
    pub series: Vec<PlotSeries>,
    pub table_rows: Vec<TableRow>,
    pub best_model_name: Option<String>,
    pub best_model_error: Option<f64>,
    pub best_model_status: BestModelStatus,
    pub summary: Vec<ModelSummary>,
}

impl ForecastResults {
    pub fn forecast_series(&self) -> impl Iterator<Item = &PlotSeries> {
        self.series
            .iter()
            .filter(|series| series.kind == SeriesKind::Forecast)
    }

    pub fn best_model_message(&self) -> String {
        let name = self.best_model_name.as_deref().unwrap_or_default();
        match &self.best_model_status {
            BestModelStatus::Ready => match self.best_model_error {
                Some(rmse) => format!("Best model: {name} (RMSE {rmse:.2})"),
                None => format!("Best model: {name}"),
            },
            BestModelStatus::Failed { reason } => {
                format!("Best model {name} failed: {reason}")
            }
            BestModelStatus::NoData => {
                format!("Best model {name} returned no forecast data and reported no error.")
            }
            BestModelStatus::NotDesignated => {
                "The server did not designate a best model.".to_owned()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ForecastPoint {
    at: Timestamp,
    value: Option<f64>,
    lower: Option<f64>,
    upper: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
struct ModelOutcome {
    name: String,
    points: Option<Vec<ForecastPoint>>,
    rmse: Option<f64>,
    failure: Option<String>,
}

impl ModelOutcome {
    fn usable_points(&self) -> Option<&[ForecastPoint]> {
        if self.failure.is_some() {
            return None;
        }
        self.points
            .as_deref()
            .filter(|points| points.iter().any(|point| point.value.is_some()))
    }
}

pub fn transform_body(body: &[u8]) -> Result<ForecastResults, ForecastError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|error| ForecastError::malformed(format!("response is not JSON: {error}")))?;
    transform(&value)
}

pub fn transform(response: &Value) -> Result<ForecastResults, ForecastError> {
    let object = response
        .as_object()
        .ok_or_else(|| ForecastError::malformed("response is not a JSON object"))?;

    let historical = object
        .get("historicalData")
        .and_then(Value::as_array)
        .ok_or_else(|| ForecastError::malformed("historicalData must be a list"))?;
    let models = object
        .get("modelResults")
        .and_then(Value::as_object)
        .ok_or_else(|| ForecastError::malformed("modelResults must be a mapping"))?;
    let best_model_name = match object.get("bestMethod") {
        None | Some(Value::Null) => None,
        Some(Value::String(name)) if name.trim().is_empty() => None,
        Some(Value::String(name)) => Some(name.clone()),
        Some(other) => {
            return Err(ForecastError::malformed(format!(
                "bestMethod must be a string, got {other}"
            )));
        }
    };

    let historical = decode_historical(historical)?;
    let outcomes = decode_models(models)?;

    let mut series = Vec::with_capacity(outcomes.len() + 3);
    if !historical.is_empty() {
        series.push(historical_series(historical));
    }

    let mut summary = Vec::with_capacity(outcomes.len());
    for outcome in &outcomes {
        let best = best_model_name.as_deref() == Some(outcome.name.as_str());
        let charted = match outcome.usable_points() {
            Some(points) => {
                push_model_series(&mut series, &outcome.name, points, best);
                true
            }
            None => {
                debug!(
                    model = %outcome.name,
                    failure = outcome.failure.as_deref().unwrap_or("no forecast data"),
                    "model left off the chart"
                );
                false
            }
        };
        summary.push(ModelSummary {
            name: outcome.name.clone(),
            rmse: outcome.rmse,
            failure: outcome.failure.clone(),
            charted,
            best,
        });
    }

    let best_outcome = best_model_name
        .as_deref()
        .and_then(|name| outcomes.iter().find(|outcome| outcome.name == name));
    let (best_model_status, table_rows) = match best_outcome {
        None => (BestModelStatus::NotDesignated, Vec::new()),
        Some(outcome) => match (&outcome.failure, outcome.usable_points()) {
            (Some(reason), _) => (
                BestModelStatus::Failed {
                    reason: reason.clone(),
                },
                Vec::new(),
            ),
            (None, None) => (BestModelStatus::NoData, Vec::new()),
            (None, Some(points)) => (BestModelStatus::Ready, table_rows(points)),
        },
    };

    Ok(ForecastResults {
        series,
        table_rows,
        best_model_error: best_outcome.and_then(|outcome| outcome.rmse),
        best_model_name,
        best_model_status,
        summary,
    })
}

fn historical_series(mut points: Vec<PlotPoint>) -> PlotSeries {
    points.sort_by_key(|point| point.x);
    PlotSeries {
        label: HISTORICAL_LABEL.to_owned(),
        kind: SeriesKind::Historical,
        model: None,
        points,
        style: SeriesStyle {
            mode: DrawMode::LinesAndMarkers,
            dash: LineDash::Solid,
            width: 2,
            emphasized: false,
        },
        fill: None,
    }
}

fn push_model_series(
    series: &mut Vec<PlotSeries>,
    name: &str,
    points: &[ForecastPoint],
    best: bool,
) {
    let line = |select: fn(&ForecastPoint) -> Option<f64>| -> Vec<PlotPoint> {
        points
            .iter()
            .filter_map(|point| select(point).map(|y| PlotPoint { x: point.at, y }))
            .collect()
    };
    let band_style = SeriesStyle {
        mode: DrawMode::Lines,
        dash: LineDash::Dot,
        width: 1,
        emphasized: false,
    };

    if best {
        series.push(PlotSeries {
            label: format!("{name} lower bound"),
            kind: SeriesKind::LowerBound,
            model: Some(name.to_owned()),
            points: line(|point| point.lower),
            style: band_style,
            fill: None,
        });
    }

    series.push(PlotSeries {
        label: if best {
            format!("{name} (best)")
        } else {
            name.to_owned()
        },
        kind: SeriesKind::Forecast,
        model: Some(name.to_owned()),
        points: line(|point| point.value),
        style: SeriesStyle {
            mode: DrawMode::Lines,
            dash: if best { LineDash::Solid } else { LineDash::Dash },
            width: if best { 3 } else { 2 },
            emphasized: best,
        },
        fill: best.then_some(FillReference::PreviousSeries),
    });

    if best {
        series.push(PlotSeries {
            label: format!("{name} upper bound"),
            kind: SeriesKind::UpperBound,
            model: Some(name.to_owned()),
            points: line(|point| point.upper),
            style: band_style,
            fill: Some(FillReference::PreviousSeries),
        });
    }
}

fn table_rows(points: &[ForecastPoint]) -> Vec<TableRow> {
    points
        .iter()
        .map(|point| TableRow {
            date: point.at.label(),
            forecast: format_number(point.value),
            lower: format_number(point.lower),
            upper: format_number(point.upper),
        })
        .collect()
}

pub fn format_number(value: Option<f64>) -> String {
    match value {
        Some(value) if value.is_finite() => format!("{value:.2}"),
        _ => MISSING_NUMBER.to_owned(),
    }
}

fn decode_historical(rows: &[Value]) -> Result<Vec<PlotPoint>, ForecastError> {
    let mut points = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let row = row.as_object().ok_or_else(|| {
            ForecastError::malformed(format!("historicalData[{index}] is not an object"))
        })?;
        let at = timestamp_field(row, "Date")
            .map_err(|reason| ForecastError::malformed(format!("historicalData[{index}]: {reason}")))?;
        let value = number_field(row, "Value")
            .map_err(|reason| ForecastError::malformed(format!("historicalData[{index}]: {reason}")))?;
        if let Some(y) = value {
            points.push(PlotPoint { x: at, y });
        }
    }
    Ok(points)
}

fn decode_models(models: &Map<String, Value>) -> Result<Vec<ModelOutcome>, ForecastError> {
    let mut names: Vec<&String> = models.keys().collect();
    names.sort();

    let mut outcomes = Vec::with_capacity(names.len());
    for name in names {
        let Some(entry) = models.get(name).and_then(Value::as_object) else {
            outcomes.push(ModelOutcome {
                name: name.clone(),
                points: None,
                rmse: None,
                failure: None,
            });
            continue;
        };

        let failure = match entry.get("error") {
            None | Some(Value::Null) | Some(Value::Bool(false)) => None,
            Some(Value::String(reason)) if reason.trim().is_empty() => None,
            Some(Value::String(reason)) => Some(reason.clone()),
            Some(other) => Some(other.to_string()),
        };
        let rmse = number_field(entry, "evaluation_rmse").ok().flatten();
        // A failed model is never charted, so its rows are not decoded.
        let points = match entry.get("forecast_data").and_then(Value::as_array) {
            Some(rows) if failure.is_none() => Some(decode_forecast_points(name, rows)?),
            _ => None,
        };

        outcomes.push(ModelOutcome {
            name: name.clone(),
            points,
            rmse,
            failure,
        });
    }
    Ok(outcomes)
}

fn decode_forecast_points(
    model: &str,
    rows: &[Value],
) -> Result<Vec<ForecastPoint>, ForecastError> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let context = |reason: String| {
                ForecastError::malformed(format!("{model} forecast_data[{index}]: {reason}"))
            };
            let row = row
                .as_object()
                .ok_or_else(|| context("not an object".to_owned()))?;
            Ok(ForecastPoint {
                at: timestamp_field(row, "Date").map_err(context)?,
                value: number_field(row, "ForecastValue").map_err(context)?,
                lower: number_field(row, "LowerBound").map_err(context)?,
                upper: number_field(row, "UpperBound").map_err(context)?,
            })
        })
        .collect()
}

fn timestamp_field(row: &Map<String, Value>, key: &str) -> Result<Timestamp, String> {
    let raw = row.get(key).ok_or_else(|| format!("{key} is missing"))?;
    Timestamp::from_json(raw).ok_or_else(|| format!("{key} {raw} is not a recognized date"))
}

// `null` and a missing key read as absent.
fn number_field(row: &Map<String, Value>, key: &str) -> Result<Option<f64>, String> {
    match row.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => Ok(number.as_f64()),
        Some(Value::String(raw)) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("{key} {raw:?} is not a number")),
        Some(other) => Err(format!("{key} {other} is not a number")),
    }
}
