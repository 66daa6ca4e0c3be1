//! Reformatting quote JSON into CSV rows.
//!
//! The raw quote record carries parallel arrays: one `timestamp` array and
//! per-field arrays under `indicators.quote[0]`. Reformatting zips them into
//! one row per timestamp. Rows where the provider reported no quote (null
//! entries) are dropped.

use serde_json::Value;
use thiserror::Error;

/// Column order of the formatted CSV.
pub const CSV_HEADER: &str = "timestamp,open,high,low,close,volume";

/// Errors that can occur while reformatting price data.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Quote record is missing field '{0}'")]
    MissingField(&'static str),

    #[error("Field '{field}' is not an array")]
    NotAnArray { field: &'static str },

    #[error("CSV header mismatch: expected '{}', got '{}'", CSV_HEADER, .0)]
    BadHeader(String),

    #[error("CSV line {line} is malformed: {reason}")]
    BadRow { line: usize, reason: String },
}

/// One formatted price row.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Converts a raw quote record into formatted rows, preserving timestamp
/// order.
///
/// # Errors
///
/// Returns `FormatError` if the record lacks the `timestamp` array or the
/// `indicators.quote[0]` field arrays.
pub fn to_rows(prices: &Value) -> Result<Vec<PriceRow>, FormatError> {
    let timestamps = field_array("timestamp", prices.get("timestamp"))?;

    let quote = prices
        .get("indicators")
        .and_then(|i| i.get("quote"))
        .and_then(|q| q.get(0))
        .ok_or(FormatError::MissingField("indicators.quote"))?;

    let opens = field_array("open", quote.get("open"))?;
    let highs = field_array("high", quote.get("high"))?;
    let lows = field_array("low", quote.get("low"))?;
    let closes = field_array("close", quote.get("close"))?;
    let volumes = field_array("volume", quote.get("volume"))?;

    let mut rows = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let row = (
            ts.as_i64(),
            opens.get(i).and_then(Value::as_f64),
            highs.get(i).and_then(Value::as_f64),
            lows.get(i).and_then(Value::as_f64),
            closes.get(i).and_then(Value::as_f64),
            volumes.get(i).and_then(Value::as_f64),
        );

        // Rows with any missing quote entry are dropped, not zero-filled.
        if let (Some(timestamp), Some(open), Some(high), Some(low), Some(close), Some(volume)) = row
        {
            rows.push(PriceRow {
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            });
        }
    }

    Ok(rows)
}

fn field_array<'a>(
    name: &'static str,
    value: Option<&'a Value>,
) -> Result<&'a Vec<Value>, FormatError> {
    match value {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(FormatError::NotAnArray { field: name }),
        None => Err(FormatError::MissingField(name)),
    }
}

/// Renders rows as CSV with the standard header.
pub fn to_csv(rows: &[PriceRow]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for row in rows {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            row.timestamp, row.open, row.high, row.low, row.close, row.volume
        ));
    }
    out
}

/// Parses CSV produced by `to_csv` (or the containerized formatter) back into
/// rows, preserving order.
///
/// # Errors
///
/// Returns `FormatError::BadHeader` if the header does not match and
/// `FormatError::BadRow` for lines that do not parse.
pub fn parse_csv(csv: &str) -> Result<Vec<PriceRow>, FormatError> {
    let mut lines = csv.lines();

    let header = lines.next().unwrap_or_default();
    if header != CSV_HEADER {
        return Err(FormatError::BadHeader(header.to_string()));
    }

    let mut rows = Vec::new();
    for (i, line) in lines.enumerate() {
        if line.is_empty() {
            continue;
        }

        let line_no = i + 2; // header is line 1
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 6 {
            return Err(FormatError::BadRow {
                line: line_no,
                reason: format!("expected 6 fields, got {}", fields.len()),
            });
        }

        rows.push(PriceRow {
            timestamp: parse_field(fields[0], line_no)?,
            open: parse_field(fields[1], line_no)?,
            high: parse_field(fields[2], line_no)?,
            low: parse_field(fields[3], line_no)?,
            close: parse_field(fields[4], line_no)?,
            volume: parse_field(fields[5], line_no)?,
        });
    }

    Ok(rows)
}

fn parse_field<T: std::str::FromStr>(raw: &str, line: usize) -> Result<T, FormatError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e| FormatError::BadRow {
        line,
        reason: format!("'{raw}': {e}"),
    })
}

/// Reformats a raw quote record straight to CSV.
pub fn reformat(prices: &Value) -> Result<String, FormatError> {
    Ok(to_csv(&to_rows(prices)?))
}
