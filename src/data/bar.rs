use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum BarError {
    #[error("Invalid OHLC values: high ({high}) < low ({low})")]
    InvalidHighLow { high: f64, low: f64 },
    #[error("Invalid OHLC values: close ({close}) outside high-low range [{low}, {high}]")]
    InvalidClose { close: f64, high: f64, low: f64 },
    #[error("Invalid OHLC values: open ({open}) outside high-low range [{low}, {high}]")]
    InvalidOpen { open: f64, high: f64, low: f64 },
    #[error("Negative volume: {0}")]
    NegativeVolume(f64),
}

//one instrument's ohlcv observation at a point in time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub symbol: String,
}

impl Bar {
    //creates a new Bar with validation
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        symbol: String,
    ) -> Result<Self, BarError> {
        if high < low {
            return Err(BarError::InvalidHighLow { high, low });
        }

        if close < low || close > high {
            return Err(BarError::InvalidClose { close, high, low });
        }

        if open < low || open > high {
            return Err(BarError::InvalidOpen { open, high, low });
        }

        if volume < 0.0 {
            return Err(BarError::NegativeVolume(volume));
        }

        Ok(Bar::new_unchecked(
            timestamp, open, high, low, close, volume, symbol,
        ))
    }

    //creates a Bar without validation
    pub fn new_unchecked(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        symbol: String,
    ) -> Self {
        Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            symbol,
        }
    }

    //a close that can be traded and marked against
    //nan, infinite or non-positive closes count as a gap in the data
    pub fn has_valid_close(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }

    //returns the range (high - low)
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap()
    }

    #[test]
    fn rejects_inverted_high_low() {
        let err = Bar::new(ts(), 10.0, 9.0, 11.0, 10.0, 100.0, "600000".into()).unwrap_err();
        assert_eq!(err, BarError::InvalidHighLow { high: 9.0, low: 11.0 });
    }

    #[test]
    fn rejects_close_outside_range() {
        let err = Bar::new(ts(), 10.0, 11.0, 9.0, 12.0, 100.0, "600000".into()).unwrap_err();
        assert!(matches!(err, BarError::InvalidClose { .. }));
    }

    #[test]
    fn rejects_negative_volume() {
        let err = Bar::new(ts(), 10.0, 11.0, 9.0, 10.0, -1.0, "600000".into()).unwrap_err();
        assert_eq!(err, BarError::NegativeVolume(-1.0));
    }

    #[test]
    fn flags_unusable_closes() {
        let mut bar = Bar::new(ts(), 10.0, 11.0, 9.0, 10.5, 100.0, "600000".into()).unwrap();
        assert!(bar.has_valid_close());
        assert_eq!(bar.range(), 2.0);

        bar.close = f64::NAN;
        assert!(!bar.has_valid_close());
        bar.close = 0.0;
        assert!(!bar.has_valid_close());
    }
}
