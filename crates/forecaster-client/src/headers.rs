// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use csv::ReaderBuilder;
use forecaster_app::ForecastError;

const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

// The delimiter is whichever candidate occurs most often on the first line.
pub fn sniff_headers(data: &[u8]) -> Result<Vec<String>, ForecastError> {
    let first_line = data
        .split(|byte| *byte == b'\n')
        .next()
        .unwrap_or_default();
    let delimiter = CANDIDATE_DELIMITERS
        .into_iter()
        .max_by_key(|candidate| first_line.iter().filter(|byte| *byte == candidate).count())
        .unwrap_or(b',');

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(data);
    let headers = reader.headers().map_err(|error| {
        ForecastError::Precondition(format!("cannot read the header row: {error}"))
    })?;

    let headers: Vec<String> = headers
        .iter()
        .map(|header| header.trim().trim_start_matches('\u{feff}').to_owned())
        .filter(|header| !header.is_empty())
        .collect();
    if headers.is_empty() {
        return Err(ForecastError::Precondition(
            "The file has no header row.".to_owned(),
        ));
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::sniff_headers;

    #[test]
    fn comma_headers_are_trimmed() {
        let headers = sniff_headers(b"Date , Sales,Region\n2024-01-01,1,N\n").expect("headers");
        assert_eq!(headers, vec!["Date", "Sales", "Region"]);
    }

    #[test]
    fn semicolon_and_tab_delimiters_are_detected() {
        let semicolon = sniff_headers(b"Date;Sales\n2024-01-01;1\n").expect("headers");
        assert_eq!(semicolon, vec!["Date", "Sales"]);
        let tab = sniff_headers(b"Date\tSales\tRegion\n").expect("headers");
        assert_eq!(tab, vec!["Date", "Sales", "Region"]);
    }

    #[test]
    fn byte_order_mark_is_stripped() {
        let headers = sniff_headers("\u{feff}Date,Sales\n".as_bytes()).expect("headers");
        assert_eq!(headers[0], "Date");
    }

    #[test]
    fn empty_file_has_no_headers() {
        assert!(sniff_headers(b"").is_err());
        assert!(sniff_headers(b"\n").is_err());
    }
}
