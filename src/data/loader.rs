use crate::data::bar::Bar;
use crate::error::{EngineError, EngineResult};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use csv::ReaderBuilder;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CsvRecord {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    symbol: String,
}

//accepts rfc3339 timestamps or plain trading dates (yyyy-mm-dd)
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .context(format!("Unrecognised timestamp '{}'", raw))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .context(format!("Invalid trading date '{}'", raw))?;
    Ok(midnight.and_utc())
}

//loads bars from a csv file, sorted by timestamp
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Bar>> {
    load_csv_with_symbols(path).map(|(bars, _)| bars)
}

//loads bars plus the distinct symbols in order of first appearance in the file
pub fn load_csv_with_symbols<P: AsRef<Path>>(path: P) -> Result<(Vec<Bar>, Vec<String>)> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context(format!("Failed to open CSV file: {:?}", path))?;

    let mut bars = Vec::new();
    let mut symbols: Vec<String> = Vec::new();

    for (index, result) in reader.deserialize().enumerate() {
        let record: CsvRecord =
            result.context(format!("Failed to parse CSV record at line {}", index + 2))?;

        let timestamp = parse_timestamp(&record.timestamp)
            .context(format!("Bad timestamp at line {}", index + 2))?;

        let bar = Bar::new_unchecked(
            timestamp,
            record.open,
            record.high,
            record.low,
            record.close,
            record.volume,
            record.symbol,
        );

        if !symbols.contains(&bar.symbol) {
            symbols.push(bar.symbol.clone());
        }
        bars.push(bar);
    }

    //stable sort keeps per-symbol file order for equal timestamps
    bars.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    tracing::debug!(path = ?path, bars = bars.len(), symbols = symbols.len(), "loaded bars");

    Ok((bars, symbols))
}

//filters bars by symbol
pub fn filter_by_symbol(bars: &[Bar], symbol: &str) -> Vec<Bar> {
    bars.iter()
        .filter(|bar| bar.symbol == symbol)
        .cloned()
        .collect()
}

//splits bars into one ascending series per requested symbol, in the order given
pub fn group_by_symbol(bars: &[Bar], symbols: &[String]) -> EngineResult<IndexMap<String, Vec<Bar>>> {
    if symbols.is_empty() {
        return Err(EngineError::NoInstruments);
    }

    let mut grouped: IndexMap<String, Vec<Bar>> = symbols
        .iter()
        .map(|symbol| (symbol.clone(), Vec::new()))
        .collect();

    for bar in bars {
        if let Some(series) = grouped.get_mut(&bar.symbol) {
            series.push(bar.clone());
        }
    }

    for (symbol, series) in grouped.iter_mut() {
        if series.is_empty() {
            return Err(EngineError::MissingInstrument(symbol.clone()));
        }
        series.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    }

    Ok(grouped)
}
