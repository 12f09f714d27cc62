use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//a point in the equity curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
    pub drawdown: f64,
    pub returns: f64,
}

impl EquityPoint {
    pub fn new(timestamp: DateTime<Utc>, equity: f64, drawdown: f64, returns: f64) -> Self {
        EquityPoint {
            timestamp,
            equity,
            drawdown,
            returns,
        }
    }
}

//builds the equity curve with drawdowns from the recorded (timestamp, value) history
//the peak is the running max of the series itself; the first point has zero return
pub fn calculate_equity_curve(history: &[(DateTime<Utc>, f64)]) -> Vec<EquityPoint> {
    let mut curve = Vec::with_capacity(history.len());
    let mut peak = f64::NEG_INFINITY;
    let mut prev_equity: Option<f64> = None;

    for &(timestamp, equity) in history {
        //update peak
        if equity > peak {
            peak = equity;
        }

        let drawdown = if peak > 0.0 {
            (peak - equity) / peak
        } else {
            0.0
        };

        let returns = match prev_equity {
            Some(prev) => equity / prev - 1.0,
            None => 0.0,
        };

        curve.push(EquityPoint::new(timestamp, equity, drawdown, returns));
        prev_equity = Some(equity);
    }

    curve
}

//r_t = equity_t / equity_{t-1} - 1, first point dropped
pub fn period_returns(equity_values: &[f64]) -> Vec<f64> {
    equity_values
        .windows(2)
        .map(|pair| pair[1] / pair[0] - 1.0)
        .collect()
}

//running maximum of the series, element by element
pub fn running_max(equity_values: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity_values
        .iter()
        .map(|&value| {
            peak = peak.max(value);
            peak
        })
        .collect()
}

//largest fractional decline from a running peak; 0 for an empty or never-falling series
pub fn max_drawdown(equity_values: &[f64]) -> f64 {
    running_max(equity_values)
        .iter()
        .zip(equity_values)
        .filter(|(&peak, _)| peak > 0.0)
        .map(|(&peak, &value)| (peak - value) / peak)
        .fold(0.0, f64::max)
}
