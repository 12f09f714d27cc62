use crate::portfolio::position::Position;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

//cash, open positions and the equity recorded so far in one backtest run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioState {
    pub initial_capital: f64,

    //never negative: buys that would overdraw are rejected before they debit
    pub cash: f64,

    //open positions in the order they were opened
    pub positions: IndexMap<String, Position>,

    //(timestamp, total value) once per processed bar
    pub equity_history: Vec<(DateTime<Utc>, f64)>,

    //last usable close seen per instrument
    marks: HashMap<String, f64>,
}

impl PortfolioState {
    pub fn new(initial_capital: f64) -> Self {
        PortfolioState {
            initial_capital,
            cash: initial_capital,
            positions: IndexMap::new(),
            equity_history: Vec::new(),
            marks: HashMap::new(),
        }
    }

    pub fn held_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_held(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn update_mark(&mut self, symbol: &str, price: f64) {
        self.marks.insert(symbol.to_string(), price);
    }

    pub fn mark(&self, symbol: &str) -> Option<f64> {
        self.marks.get(symbol).copied()
    }

    //cash plus every open position at its latest mark
    //a position never marked since opening is carried at its entry price
    pub fn total_value(&self) -> f64 {
        self.cash
            + self
                .positions
                .values()
                .map(|p| p.market_value(self.mark(&p.symbol).unwrap_or(p.entry_price)))
                .sum::<f64>()
    }

    //debits the full cost and opens the position; the caller has checked cost <= cash
    pub fn open(&mut self, position: Position) {
        self.cash -= position.cost_basis;
        self.positions.insert(position.symbol.clone(), position);
    }

    //credits the proceeds and removes the position
    pub fn close(&mut self, symbol: &str, proceeds: f64) -> Option<Position> {
        let position = self.positions.shift_remove(symbol)?;
        self.cash += proceeds;
        Some(position)
    }

    pub fn record(&mut self, timestamp: DateTime<Utc>) {
        let value = self.total_value();
        self.equity_history.push((timestamp, value));
    }

    //rewrites the last recorded value as the mark-to-market of whatever is still open
    pub fn finalize(&mut self) {
        let value = self.total_value();
        if let Some(last) = self.equity_history.last_mut() {
            last.1 = value;
        }
    }

    //returns the total return as a fraction
    pub fn total_return(&self) -> f64 {
        (self.total_value() - self.initial_capital) / self.initial_capital
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parse_timestamp;

    #[test]
    fn tracks_cash_and_marked_positions() {
        let mut state = PortfolioState::new(10_000.0);
        state.open(Position::open("A".into(), 100, 20.0, 2_001.0));
        assert_eq!(state.cash, 7_999.0);
        assert_eq!(state.held_count(), 1);

        //unmarked positions are carried at entry
        assert_eq!(state.total_value(), 9_999.0);

        state.update_mark("A", 25.0);
        assert_eq!(state.total_value(), 10_499.0);

        let closed = state.close("A", 2_499.0).unwrap();
        assert_eq!(closed.shares, 100);
        assert!(!state.is_held("A"));
        assert_eq!(state.cash, 10_498.0);
        assert!(state.close("A", 1.0).is_none());
    }

    #[test]
    fn finalize_overwrites_the_last_point() {
        let mut state = PortfolioState::new(1_000.0);
        state.record(parse_timestamp("2024-01-01").unwrap());
        state.open(Position::open("A".into(), 10, 10.0, 100.0));
        state.update_mark("A", 30.0);
        state.finalize();

        assert_eq!(state.equity_history.len(), 1);
        assert_eq!(state.equity_history[0].1, 1_200.0);
        assert!((state.total_return() - 0.2).abs() < 1e-12);
    }
}
