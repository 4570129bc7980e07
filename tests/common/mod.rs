#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use rulecraft::domain::error::RulecraftError;
pub use rulecraft::domain::ohlcv::{OhlcvBar, OhlcvSeries};
use rulecraft::ports::data_port::DataPort;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(&self, symbol: &str) -> Result<Vec<OhlcvBar>, RulecraftError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(RulecraftError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, RulecraftError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn make_bar(date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000.0,
    }
}

/// One bar per day, closing on each of `closes`.
pub fn bars_from_closes(start_date: &str, closes: &[f64]) -> Vec<OhlcvBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let day = start + chrono::Duration::days(i as i64);
            make_bar(&day.format("%Y-%m-%d").to_string(), close)
        })
        .collect()
}

/// Steadily rising bars.
pub fn generate_bars(start_date: &str, count: usize, start_price: f64) -> Vec<OhlcvBar> {
    let closes: Vec<f64> = (0..count).map(|i| start_price + i as f64).collect();
    bars_from_closes(start_date, &closes)
}

pub fn write_bars_csv(path: &Path, bars: &[OhlcvBar]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for bar in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.date.format("%Y-%m-%d"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        ));
    }
    fs::write(path, content).unwrap();
}

/// Strategy document: enter when close crosses above SMA(3), exit when it
/// crosses below.
pub const CROSSOVER_STRATEGY: &str = r#"{
    "name": "Close over SMA",
    "entryRules": [{
        "id": "entry",
        "logic": "AND",
        "inequalities": [{
            "id": "e1",
            "left": {"type": "PRICE", "value": "close"},
            "condition": "CROSSES_ABOVE",
            "right": {"type": "INDICATOR", "indicator": "SMA", "parameters": {"period": 3}}
        }]
    }],
    "exitRules": [{
        "id": "exit",
        "logic": "AND",
        "inequalities": [{
            "id": "x1",
            "left": {"type": "PRICE", "value": "close"},
            "condition": "CROSSES_BELOW",
            "right": {"type": "INDICATOR", "indicator": "SMA", "parameters": {"period": 3}}
        }]
    }]
}"#;

/// Data directory, strategy file and INI config in one temp dir.
pub struct Workspace {
    pub dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new(symbol: &str, bars: &[OhlcvBar], strategy: &str) -> Self {
        let dir = tempfile::TempDir::new().unwrap();
        fs::create_dir(dir.path().join("data")).unwrap();
        write_bars_csv(&dir.path().join("data").join(format!("{symbol}.csv")), bars);
        fs::write(dir.path().join("strategy.json"), strategy).unwrap();
        let config = format!(
            "[data]\ndir = {}\nsymbol = {}\n\n[strategy]\npath = {}\n\n[logging]\nlevel = warn\n",
            dir.path().join("data").display(),
            symbol,
            dir.path().join("strategy.json").display()
        );
        fs::write(dir.path().join("config.ini"), config).unwrap();
        Self { dir }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.ini")
    }

    pub fn strategy_path(&self) -> PathBuf {
        self.dir.path().join("strategy.json")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn append_config(&self, extra: &str) {
        let mut content = fs::read_to_string(self.config_path()).unwrap();
        content.push_str(extra);
        fs::write(self.config_path(), content).unwrap();
    }
}
