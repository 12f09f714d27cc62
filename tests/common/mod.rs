#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use lotsim::data::parse_timestamp;
use lotsim::prelude::*;
use std::io::Write;
use std::path::Path;

pub fn start() -> DateTime<Utc> {
    parse_timestamp("2023-01-06").unwrap()
}

//weekly bars with the given closes and a flat open/high/low at the close
pub fn flat_bars(symbol: &str, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            Bar::new_unchecked(
                start() + Duration::weeks(i as i64),
                c,
                c,
                c,
                c,
                10_000.0,
                symbol.to_string(),
            )
        })
        .collect()
}

//weekly bars following a deterministic pseudo-random walk
pub fn walk_bars(symbol: &str, seed: u64, len: usize) -> Vec<Bar> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut price = 20.0;
    (0..len)
        .map(|i| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
            let open = price;
            price = (price * (1.0 + (unit - 0.48) * 0.12)).max(1.0);
            let high = open.max(price) * 1.02;
            let low = open.min(price) * 0.98;
            let volume = 5_000.0 + unit * 20_000.0;
            Bar::new_unchecked(
                start() + Duration::weeks(i as i64),
                open,
                high,
                low,
                price,
                volume,
                symbol.to_string(),
            )
        })
        .collect()
}

pub fn market_from(series: Vec<(&str, Vec<Bar>)>, specs: &[IndicatorSpec]) -> MarketData {
    let map: IndexMap<String, Vec<Bar>> = series
        .into_iter()
        .map(|(symbol, bars)| (symbol.to_string(), bars))
        .collect();
    MarketData::build(map, specs).unwrap()
}

pub fn zero_cost(max_hold: usize) -> SimulatorConfig {
    SimulatorConfig {
        fee_rate: 0.0,
        slippage_rate: 0.0,
        max_hold,
        ..SimulatorConfig::default()
    }
}

pub fn engine(config: SimulatorConfig) -> BacktestEngine {
    BacktestEngine::new(config, PositionSizer::default()).unwrap()
}

//emits a fixed action per bar index, for every instrument
pub struct ScriptedStrategy {
    pub buys: Vec<usize>,
    pub sells: Vec<usize>,
}

impl ScriptedStrategy {
    pub fn new(buys: &[usize], sells: &[usize]) -> Self {
        ScriptedStrategy {
            buys: buys.to_vec(),
            sells: sells.to_vec(),
        }
    }
}

impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn required_indicators(&self) -> Vec<IndicatorSpec> {
        Vec::new()
    }

    fn evaluate(&self, history: &InstrumentHistory, index: usize) -> Signal {
        let action = if self.buys.contains(&index) {
            Action::Buy
        } else if self.sells.contains(&index) {
            Action::Sell
        } else {
            Action::Hold
        };
        Signal::rule(history, index, action)
    }
}

//writes bars as a loader-compatible csv
pub fn write_csv(path: &Path, bars: &[Bar]) {
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(file, "timestamp,open,high,low,close,volume,symbol").unwrap();
    for bar in bars {
        writeln!(
            file,
            "{},{},{},{},{},{},{}",
            bar.timestamp.format("%Y-%m-%d"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume,
            bar.symbol
        )
        .unwrap();
    }
}
