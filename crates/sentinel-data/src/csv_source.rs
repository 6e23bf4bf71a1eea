//! CSV bar files.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, WriterBuilder};
use sentinel_core::error::DataError;
use sentinel_core::types::Bar;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date", alias = "time", alias = "Timestamp")]
    timestamp: String,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close", alias = "Adj Close")]
    close: f64,
    #[serde(alias = "Volume", default)]
    volume: f64,
}

#[derive(Debug, Serialize)]
struct CsvRow {
    timestamp: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Historical bars stored as CSV, one bar per row.
#[derive(Debug, Clone)]
pub struct CsvBarSource {
    path: PathBuf,
}

impl CsvBarSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DataError::SymbolNotFound(path.display().to_string()));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all bars ordered by timestamp. Rows with non-finite or
    /// inconsistent prices are skipped; a repeated timestamp keeps the last row.
    pub fn load(&self) -> Result<Vec<Bar>, DataError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| DataError::ParseError(e.to_string()))?;

        let mut bars = Vec::new();
        let mut skipped = 0usize;

        for (row, result) in reader.deserialize().enumerate() {
            let record: CsvRecord =
                result.map_err(|e| DataError::ParseError(format!("row {}: {}", row + 1, e)))?;
            let timestamp = parse_timestamp(&record.timestamp)?;
            let bar = Bar::new(
                timestamp,
                record.open,
                record.high,
                record.low,
                record.close,
                record.volume,
            );
            if is_valid(&bar) {
                bars.push(bar);
            } else {
                skipped += 1;
            }
        }

        if skipped > 0 {
            warn!(path = %self.path.display(), skipped, "Skipped invalid bars");
        }

        bars.sort_by_key(|b| b.timestamp);
        // Keep the last row for each timestamp
        bars.reverse();
        bars.dedup_by_key(|b| b.timestamp);
        bars.reverse();

        if bars.is_empty() {
            return Err(DataError::NoDataAvailable);
        }
        debug!(path = %self.path.display(), bars = bars.len(), "Loaded CSV bars");
        Ok(bars)
    }
}

/// Write bars as CSV with millisecond timestamps.
pub fn write_csv(path: impl AsRef<Path>, bars: &[Bar]) -> Result<(), DataError> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .map_err(|e| DataError::ParseError(e.to_string()))?;
    for bar in bars {
        writer
            .serialize(CsvRow {
                timestamp: bar.timestamp,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
            })
            .map_err(|e| DataError::ParseError(e.to_string()))?;
    }
    writer.flush().map_err(|e| DataError::ParseError(e.to_string()))
}

fn is_valid(bar: &Bar) -> bool {
    let prices = [bar.open, bar.high, bar.low, bar.close];
    prices.iter().all(|p| p.is_finite() && *p > 0.0)
        && bar.volume.is_finite()
        && bar.volume >= 0.0
        && bar.high >= bar.low
}

/// Parse RFC 3339, common date/datetime layouts, or Unix seconds/milliseconds.
fn parse_timestamp(value: &str) -> Result<i64, DataError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp_millis());
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(value, format) {
            return Ok(d.and_time(NaiveTime::MIN).and_utc().timestamp_millis());
        }
    }

    if let Ok(ts) = value.parse::<i64>() {
        // Assume milliseconds if > 10 digits
        return Ok(if ts > 10_000_000_000 { ts } else { ts * 1000 });
    }

    Err(DataError::ParseError(format!("Could not parse timestamp: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("2024-01-15").unwrap(), 1_705_276_800_000);
        assert_eq!(parse_timestamp("2024-01-15 10:30:00").unwrap(), 1_705_314_600_000);
        assert_eq!(parse_timestamp("2024-01-15T10:30:00Z").unwrap(), 1_705_314_600_000);
        assert_eq!(parse_timestamp("1705312800000").unwrap(), 1_705_312_800_000);
        assert_eq!(parse_timestamp("1705312800").unwrap(), 1_705_312_800_000);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_load_sorts_dedups_and_skips_invalid() {
        let file = csv_file(
            "timestamp,open,high,low,close,volume\n\
             1705312900000,45010,45020,45000,45015,10\n\
             1705312800000,45000,45010,44990,45005,12\n\
             1705312900000,45010,45030,45000,45025,11\n\
             1705313000000,45020,45000,45030,45010,9\n",
        );
        let bars = CsvBarSource::open(file.path()).unwrap().load().unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp, 1_705_312_800_000);
        assert_eq!(bars[1].close, 45025.0);
    }

    #[test]
    fn test_header_aliases() {
        let file = csv_file("Date,Open,High,Low,Close,Volume\n2024-01-15,1,2,0.5,1.5,100\n");
        let bars = CsvBarSource::open(file.path()).unwrap().load().unwrap();
        assert_eq!(bars[0].volume, 100.0);
    }

    #[test]
    fn test_write_then_load() {
        let bars: Vec<Bar> = (0..3)
            .map(|i| Bar::new(1_705_312_800_000 + i * 300_000, 45000.0, 45010.0, 44990.0, 45005.0, 1000.0))
            .collect();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.csv");

        write_csv(&path, &bars).unwrap();
        assert_eq!(CsvBarSource::open(&path).unwrap().load().unwrap(), bars);
    }

    #[test]
    fn test_missing_and_empty_files() {
        assert!(matches!(
            CsvBarSource::open("/nonexistent/bars.csv"),
            Err(DataError::SymbolNotFound(_))
        ));

        let file = csv_file("timestamp,open,high,low,close,volume\n");
        assert!(matches!(
            CsvBarSource::open(file.path()).unwrap().load(),
            Err(DataError::NoDataAvailable)
        ));
    }
}
