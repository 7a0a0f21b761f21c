// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{ColumnMapping, ForecastFrequency};

pub const HORIZON_MESSAGE: &str = "Please enter a positive integer for forecast periods.";
pub const SAME_COLUMN_MESSAGE: &str = "Date and Value columns cannot be the same.";
pub const UNKNOWN_COLUMN_MESSAGE: &str =
    "One or more selected columns are not in the original data.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationField {
    Horizon,
    Columns,
}

impl ValidationField {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Horizon => "forecast periods",
            Self::Columns => "columns",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Incomplete,
    Invalid {
        field: ValidationField,
        message: &'static str,
    },
}

impl Verdict {
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub const fn message(&self) -> Option<&'static str> {
        match self {
            Self::Invalid { message, .. } => Some(message),
            Self::Valid | Self::Incomplete => None,
        }
    }

    pub const fn field(&self) -> Option<ValidationField> {
        match self {
            Self::Invalid { field, .. } => Some(*field),
            Self::Valid | Self::Incomplete => None,
        }
    }
}

// First failing rule wins: horizon, required columns, distinct Date/Value,
// header membership.
pub fn validate(
    mapping: &ColumnMapping,
    _frequency: ForecastFrequency,
    horizon: &str,
    known_headers: &[String],
) -> Verdict {
    if crate::ForecastHorizon::parse(horizon).is_none() {
        return Verdict::Invalid {
            field: ValidationField::Horizon,
            message: HORIZON_MESSAGE,
        };
    }

    let date = mapping.date.trim();
    let value = mapping.value.trim();
    if date.is_empty() || value.is_empty() {
        return Verdict::Incomplete;
    }

    if date == value {
        return Verdict::Invalid {
            field: ValidationField::Columns,
            message: SAME_COLUMN_MESSAGE,
        };
    }

    let all_known = mapping
        .selected()
        .all(|(_, column)| known_headers.iter().any(|header| header.trim() == column));
    if !all_known {
        return Verdict::Invalid {
            field: ValidationField::Columns,
            message: UNKNOWN_COLUMN_MESSAGE,
        };
    }

    Verdict::Valid
}
