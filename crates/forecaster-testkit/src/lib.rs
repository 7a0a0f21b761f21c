// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use time::macros::format_description;
use time::{Date, Month};

pub const SAMPLE_HEADERS: [&str; 3] = ["Date", "Sales", "Region"];

const REGIONS: [&str; 3] = ["North", "South", "West"];

pub fn sample_headers() -> Vec<String> {
    SAMPLE_HEADERS.into_iter().map(str::to_owned).collect()
}

pub fn monthly_dates(start: Date, count: usize) -> Vec<String> {
    let format = format_description!("[year]-[month]-[day]");
    let mut dates = Vec::with_capacity(count);
    let (mut year, mut month) = (start.year(), start.month());
    for _ in 0..count {
        let date = Date::from_calendar_date(year, month, 1).unwrap_or(start);
        dates.push(date.format(&format).unwrap_or_default());
        if month == Month::December {
            year += 1;
        }
        month = month.next();
    }
    dates
}

pub fn demo_values(count: usize) -> Vec<f64> {
    (0..count)
        .map(|index| {
            let trend = 100.0 + index as f64 * 2.5;
            let season = [0.0, 4.0, 9.0, 12.0, 7.0, 1.0, -3.0, -6.0, -8.0, -5.0, -1.0, 3.0];
            trend + season[index % season.len()]
        })
        .collect()
}

pub fn sample_csv(months: usize) -> String {
    let start = Date::from_calendar_date(2023, Month::January, 1).unwrap_or(Date::MIN);
    let mut out = SAMPLE_HEADERS.join(",");
    out.push('\n');
    for (index, (date, value)) in monthly_dates(start, months)
        .into_iter()
        .zip(demo_values(months))
        .enumerate()
    {
        out.push_str(&format!("{date},{value:.2},{}\n", REGIONS[index % REGIONS.len()]));
    }
    out
}

// Keep the TempDir alive for as long as the file is needed.
pub fn write_temp_file(name: &str, contents: &[u8]) -> Result<(tempfile::TempDir, PathBuf)> {
    let temp = tempfile::tempdir().context("create temp dir")?;
    let path = temp.path().join(name);
    std::fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok((temp, path))
}

pub fn forecast_point(date: &str, value: f64, spread: f64) -> Value {
    json!({
        "Date": date,
        "ForecastValue": value,
        "LowerBound": value - spread,
        "UpperBound": value + spread,
    })
}

#[derive(Debug, Clone, Default)]
pub struct ResponseBuilder {
    historical: Vec<Value>,
    models: Map<String, Value>,
    best: Option<String>,
    drop_models: bool,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn historical(mut self, date: &str, value: f64) -> Self {
        self.historical.push(json!({ "Date": date, "Value": value }));
        self
    }

    pub fn demo_history(mut self, months: usize) -> Self {
        let start = Date::from_calendar_date(2023, Month::January, 1).unwrap_or(Date::MIN);
        for (date, value) in monthly_dates(start, months).into_iter().zip(demo_values(months)) {
            self.historical.push(json!({ "Date": date, "Value": value }));
        }
        self
    }

    // Monthly points starting 2025-01.
    pub fn model(mut self, name: &str, periods: usize, rmse: f64) -> Self {
        let start = Date::from_calendar_date(2025, Month::January, 1).unwrap_or(Date::MIN);
        let points: Vec<Value> = monthly_dates(start, periods)
            .iter()
            .zip(demo_values(periods))
            .map(|(date, value)| forecast_point(date, value, 5.0))
            .collect();
        self.models.insert(
            name.to_owned(),
            json!({ "forecast_data": points, "evaluation_rmse": rmse }),
        );
        self
    }

    pub fn failed_model(mut self, name: &str, error: &str) -> Self {
        self.models
            .insert(name.to_owned(), json!({ "error": error }));
        self
    }

    pub fn raw_model(mut self, name: &str, body: Value) -> Self {
        self.models.insert(name.to_owned(), body);
        self
    }

    pub fn best(mut self, name: &str) -> Self {
        self.best = Some(name.to_owned());
        self
    }

    pub fn without_models(mut self) -> Self {
        self.drop_models = true;
        self
    }

    pub fn build(self) -> Value {
        let mut body = Map::new();
        body.insert("historicalData".to_owned(), Value::Array(self.historical));
        if !self.drop_models {
            body.insert("modelResults".to_owned(), Value::Object(self.models));
        }
        body.insert(
            "bestMethod".to_owned(),
            self.best.map_or(Value::Null, Value::String),
        );
        Value::Object(body)
    }

    pub fn build_string(self) -> String {
        self.build().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{ResponseBuilder, monthly_dates, sample_csv};
    use time::{Date, Month};

    #[test]
    fn monthly_dates_roll_over_year_end() {
        let start = Date::from_calendar_date(2024, Month::November, 1).expect("valid date");
        assert_eq!(
            monthly_dates(start, 3),
            vec!["2024-11-01", "2024-12-01", "2025-01-01"]
        );
    }

    #[test]
    fn sample_csv_has_header_and_rows() {
        let csv = sample_csv(4);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Date,Sales,Region");
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("2023-01-01,100.00,"));
    }

    #[test]
    fn builder_can_omit_models() {
        let body = ResponseBuilder::new().without_models().build();
        assert!(body.get("modelResults").is_none());
        assert!(body["historicalData"].is_array());
    }
}
