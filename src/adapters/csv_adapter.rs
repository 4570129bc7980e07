//! CSV file data adapter.
//!
//! One file per symbol, `<base>/<symbol>.csv`, with a header row. Columns are
//! found by name (`date`, `open`, `high`, `low`, `close`, `volume`, any case);
//! `time`/`timestamp` are accepted for the date column. Rows are returned
//! oldest to newest whatever order the file is in.

use crate::domain::error::RulecraftError;
use crate::domain::ohlcv::{OhlcvBar, OhlcvSeries};
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Default)]
struct Columns {
    date: Option<usize>,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    close: Option<usize>,
    volume: Option<usize>,
}

#[derive(Debug)]
struct Row {
    date: NaiveDateTime,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: f64,
    volume: Option<f64>,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    /// Read any OHLCV file into a series. Only `date` and `close` are
    /// required; other columns are carried when present.
    pub fn load_series(path: &Path) -> Result<OhlcvSeries, RulecraftError> {
        let (columns, rows) = read_rows(path)?;
        let mut series = OhlcvSeries::from_close(rows.iter().map(|r| r.close).collect())
            .with_dates(rows.iter().map(|r| r.date).collect())?;
        if columns.open.is_some() {
            series = series.with_open(rows.iter().filter_map(|r| r.open).collect())?;
        }
        if columns.high.is_some() {
            series = series.with_high(rows.iter().filter_map(|r| r.high).collect())?;
        }
        if columns.low.is_some() {
            series = series.with_low(rows.iter().filter_map(|r| r.low).collect())?;
        }
        if columns.volume.is_some() {
            series = series.with_volume(rows.iter().filter_map(|r| r.volume).collect())?;
        }
        Ok(series)
    }
}

fn data_error(reason: String) -> RulecraftError {
    RulecraftError::Data { reason }
}

fn find_columns(headers: &csv::StringRecord) -> Columns {
    let mut columns = Columns::default();
    for (i, header) in headers.iter().enumerate() {
        let slot = match header.trim().to_lowercase().as_str() {
            "date" | "time" | "timestamp" | "datetime" => &mut columns.date,
            "open" => &mut columns.open,
            "high" => &mut columns.high,
            "low" => &mut columns.low,
            "close" | "price" => &mut columns.close,
            "volume" | "vol" => &mut columns.volume,
            _ => continue,
        };
        slot.get_or_insert(i);
    }
    columns
}

/// Dates as `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, RFC 3339 or Unix
/// seconds/milliseconds.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    let stamp: i64 = raw.parse().ok()?;
    let dt = if stamp.abs() >= 100_000_000_000 {
        DateTime::from_timestamp_millis(stamp)
    } else {
        DateTime::from_timestamp(stamp, 0)
    };
    dt.map(|d| d.naive_utc())
}

fn read_rows(path: &Path) -> Result<(Columns, Vec<Row>), RulecraftError> {
    let content = fs::read_to_string(path)
        .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))?;

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| data_error(format!("CSV header error in {}: {}", path.display(), e)))?
        .clone();
    let columns = find_columns(&headers);
    let date_col = columns
        .date
        .ok_or_else(|| data_error(format!("{}: missing date column", path.display())))?;
    let close_col = columns
        .close
        .ok_or_else(|| data_error(format!("{}: missing close column", path.display())))?;

    let mut rows = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        // header is line 1
        let line = line + 2;
        let record = result.map_err(|e| data_error(format!("CSV parse error: {}", e)))?;

        let field = |col: usize, name: &str| -> Result<f64, RulecraftError> {
            let raw = record.get(col).unwrap_or("");
            raw.parse::<f64>().map_err(|_| {
                data_error(format!(
                    "{}:{}: invalid {} value '{}'",
                    path.display(),
                    line,
                    name,
                    raw
                ))
            })
        };
        let optional = |col: Option<usize>, name: &str| col.map(|c| field(c, name)).transpose();

        let raw_date = record.get(date_col).unwrap_or("");
        let date = parse_date(raw_date).ok_or_else(|| {
            data_error(format!(
                "{}:{}: invalid date '{}'",
                path.display(),
                line,
                raw_date
            ))
        })?;

        rows.push(Row {
            date,
            open: optional(columns.open, "open")?,
            high: optional(columns.high, "high")?,
            low: optional(columns.low, "low")?,
            close: field(close_col, "close")?,
            volume: optional(columns.volume, "volume")?,
        });
    }

    rows.sort_by_key(|r| r.date);
    Ok((columns, rows))
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(&self, symbol: &str) -> Result<Vec<OhlcvBar>, RulecraftError> {
        let path = self.csv_path(symbol);
        let (columns, rows) = read_rows(&path)?;

        for (name, col) in [
            ("open", columns.open),
            ("high", columns.high),
            ("low", columns.low),
            ("volume", columns.volume),
        ] {
            if col.is_none() {
                return Err(data_error(format!(
                    "{}: missing {} column",
                    path.display(),
                    name
                )));
            }
        }

        Ok(rows
            .into_iter()
            .map(|r| OhlcvBar {
                date: r.date,
                open: r.open.unwrap_or(r.close),
                high: r.high.unwrap_or(r.close),
                low: r.low.unwrap_or(r.close),
                close: r.close,
                volume: r.volume.unwrap_or(0.0),
            })
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, RulecraftError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| data_error(format!("directory entry error: {}", e)))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")) {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
