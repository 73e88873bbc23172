use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::warn;

use crate::error::AnalysisError;

/// One row of the study dataset. Header names are the dataset's own
/// (Portuguese) column titles, preserved verbatim.
#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "URL")]
    url: String,
    #[serde(rename = "Data de morte")]
    death_date: String,
    #[serde(rename = "Data de ressurreição")]
    revival_date: String,
}

/// A validated input row: URL still unparsed, timestamps normalized to UTC.
#[derive(Debug, Clone)]
pub struct RepositoryInput {
    pub url: String,
    pub death_date: DateTime<Utc>,
    pub revival_date: DateTime<Utc>,
}

pub fn load_dataset(path: &Path) -> Result<Vec<RepositoryInput>> {
    let reader = csv::Reader::from_path(path)?;
    read_dataset(reader)
}

/// Rows that cannot be deserialized or whose timestamps do not parse are
/// logged and dropped; they never abort the batch.
fn read_dataset<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<RepositoryInput>> {
    let mut inputs = Vec::new();

    for (idx, record) in reader.deserialize::<RawRow>().enumerate() {
        // Header occupies line 1.
        let line = idx + 2;

        let raw = match record {
            Ok(raw) => raw,
            Err(e) => {
                warn!("dataset line {line} unreadable, skipped: {e}");
                continue;
            }
        };

        let death_date = match parse_timestamp(&raw.death_date) {
            Ok(ts) => ts,
            Err(e) => {
                warn!("dataset line {line} skipped: {e}");
                continue;
            }
        };
        let revival_date = match parse_timestamp(&raw.revival_date) {
            Ok(ts) => ts,
            Err(e) => {
                warn!("dataset line {line} skipped: {e}");
                continue;
            }
        };

        inputs.push(RepositoryInput {
            url: raw.url,
            death_date,
            revival_date,
        });
    }

    Ok(inputs)
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD` and the dataset's
/// occasional `DD/MM/YYYY`. Date-only values become UTC midnight.
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, AnalysisError> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(ndt.and_utc());
        }
    }
    for format in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Ok(date.and_time(NaiveTime::MIN).and_utc());
        }
    }

    Err(AnalysisError::BadTimestamp(value.to_string()))
}
