// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnRole {
    Date,
    Value,
    Aggregation,
}

impl ColumnRole {
    pub const ALL: [Self; 3] = [Self::Date, Self::Value, Self::Aggregation];

    pub const fn wire_key(self) -> &'static str {
        match self {
            Self::Date => "Date Column",
            Self::Value => "Value Column",
            Self::Aggregation => "Aggregation Column (Optional)",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Value => "value",
            Self::Aggregation => "aggregation",
        }
    }

    pub const fn is_required(self) -> bool {
        !matches!(self, Self::Aggregation)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    #[serde(rename = "Date Column")]
    pub date: String,
    #[serde(rename = "Value Column")]
    pub value: String,
    #[serde(rename = "Aggregation Column (Optional)")]
    pub aggregation: String,
}

impl ColumnMapping {
    pub fn new(date: &str, value: &str) -> Self {
        Self {
            date: date.to_owned(),
            value: value.to_owned(),
            aggregation: String::new(),
        }
    }

    pub fn with_aggregation(mut self, aggregation: &str) -> Self {
        self.aggregation = aggregation.to_owned();
        self
    }

    pub fn get(&self, role: ColumnRole) -> &str {
        match role {
            ColumnRole::Date => &self.date,
            ColumnRole::Value => &self.value,
            ColumnRole::Aggregation => &self.aggregation,
        }
    }

    pub fn set(&mut self, role: ColumnRole, column: &str) {
        let slot = match role {
            ColumnRole::Date => &mut self.date,
            ColumnRole::Value => &mut self.value,
            ColumnRole::Aggregation => &mut self.aggregation,
        };
        *slot = column.trim().to_owned();
    }

    pub fn selected(&self) -> impl Iterator<Item = (ColumnRole, &str)> {
        ColumnRole::ALL
            .into_iter()
            .map(|role| (role, self.get(role).trim()))
            .filter(|(_, column)| !column.is_empty())
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_owned())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForecastFrequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl ForecastFrequency {
    pub const ALL: [Self; 5] = [
        Self::Daily,
        Self::Weekly,
        Self::Monthly,
        Self::Quarterly,
        Self::Yearly,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::Quarterly => "Quarterly",
            Self::Yearly => "Yearly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|frequency| frequency.as_str().eq_ignore_ascii_case(value))
    }
}

impl std::fmt::Display for ForecastFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ForecastHorizon(u32);

impl ForecastHorizon {
    pub const fn new(periods: u32) -> Option<Self> {
        if periods == 0 {
            None
        } else {
            Some(Self(periods))
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        let periods: i64 = input.trim().parse().ok()?;
        if periods < 1 {
            return None;
        }
        u32::try_from(periods).ok().and_then(Self::new)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ForecastHorizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl SourceFile {
    pub fn new(file_name: &str, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_owned(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    pub filename: String,
    #[serde(default)]
    pub column_headers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStage {
    Upload,
    Configure,
    Results,
}

impl WizardStage {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Configure => "configure",
            Self::Results => "results",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPayload {
    pub file: SourceFile,
    pub mapping: ColumnMapping,
    pub frequency: ForecastFrequency,
    pub horizon: ForecastHorizon,
}

impl RequestPayload {
    pub const FILE_FIELD: &'static str = "file";
    pub const COLUMNS_FIELD: &'static str = "selectedColumns";
    pub const FREQUENCY_FIELD: &'static str = "selectedFrequency";
    pub const PERIODS_FIELD: &'static str = "forecastPeriods";

    // Sent in this order.
    pub fn text_fields(&self) -> [(&'static str, String); 3] {
        [
            (Self::COLUMNS_FIELD, self.mapping.to_json()),
            (Self::FREQUENCY_FIELD, self.frequency.as_str().to_owned()),
            (Self::PERIODS_FIELD, self.horizon.get().to_string()),
        ]
    }
}
