pub mod composite;
pub mod pullback;
pub mod trend_follow;
pub mod volume_breakout;

use crate::data::InstrumentHistory;
use crate::error::EngineError;
use crate::indicator::IndicatorSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//what a strategy wants done with an instrument on a bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Hold,
    Sell,
}

impl Action {
    //ternary reading of a combined 0-1 score: below 0.4 sell, up to 0.7 hold, above buy
    pub fn from_score(score: f64) -> Self {
        if score < 0.4 {
            Action::Sell
        } else if score <= 0.7 {
            Action::Hold
        } else {
            Action::Buy
        }
    }

    //label used by the upstream selection pipeline
    pub fn label_zh(&self) -> &'static str {
        match self {
            Action::Buy => "买入",
            Action::Hold => "持有",
            Action::Sell => "卖出",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Buy => "BUY",
            Action::Hold => "HOLD",
            Action::Sell => "SELL",
        };
        f.write_str(label)
    }
}

impl FromStr for Action {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "买入" => Ok(Action::Buy),
            "持有" => Ok(Action::Hold),
            "卖出" => Ok(Action::Sell),
            other => match other.to_uppercase().as_str() {
                "BUY" => Ok(Action::Buy),
                "HOLD" => Ok(Action::Hold),
                "SELL" => Ok(Action::Sell),
                _ => Err(EngineError::UnknownStrategy(format!("action '{}'", other))),
            },
        }
    }
}

//one strategy's verdict for one instrument on one bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub instrument: String,
    pub timestamp: DateTime<Utc>,
    pub action: Action,
    pub score: Option<f64>,
}

impl Signal {
    //rule-only signal without a confidence score
    pub fn rule(history: &InstrumentHistory, index: usize, action: Action) -> Self {
        Signal {
            instrument: history.symbol.clone(),
            timestamp: timestamp_at(history, index),
            action,
            score: None,
        }
    }

    pub fn scored(history: &InstrumentHistory, index: usize, action: Action, score: f64) -> Self {
        Signal {
            score: Some(score),
            ..Signal::rule(history, index, action)
        }
    }

    //explicit score, else 1.0 on buy and 0.0 otherwise
    pub fn score(&self) -> f64 {
        match (self.score, self.action) {
            (Some(score), _) => score,
            (None, Action::Buy) => 1.0,
            (None, _) => 0.0,
        }
    }

    pub fn is_buy(&self) -> bool {
        self.action == Action::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.action == Action::Sell
    }
}

fn timestamp_at(history: &InstrumentHistory, index: usize) -> DateTime<Utc> {
    history
        .bar(index)
        .map(|bar| bar.timestamp)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

//signal generator interface that all strategies implement
//
//`evaluate` may only look at bars up to and including `index`. Missing
//indicator values (warm-up, gaps) must never produce a buy.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    //indicators this strategy reads, so market data can precompute them
    fn required_indicators(&self) -> Vec<IndicatorSpec>;

    fn evaluate(&self, history: &InstrumentHistory, index: usize) -> Signal;
}

//true when `a` moved from at-or-below `b` on the prior bar to strictly above it now
pub fn crossed_above(history: &InstrumentHistory, a: &str, b: &str, index: usize) -> bool {
    if index == 0 {
        return false;
    }

    let values = (
        history.indicator(a, index - 1),
        history.indicator(b, index - 1),
        history.indicator(a, index),
        history.indicator(b, index),
    );

    match values {
        (Some(prev_a), Some(prev_b), Some(a), Some(b)) => prev_a <= prev_b && a > b,
        _ => false,
    }
}

//close of the bar at `index`, if it is usable
pub fn close_at(history: &InstrumentHistory, index: usize) -> Option<f64> {
    history
        .bar(index)
        .filter(|bar| bar.has_valid_close())
        .map(|bar| bar.close)
}

//every indicator the given strategies read; duplicates are computed once downstream
pub fn indicators_for(strategies: &[Box<dyn Strategy>]) -> Vec<IndicatorSpec> {
    strategies
        .iter()
        .flat_map(|strategy| strategy.required_indicators())
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::data::{parse_timestamp, Bar, InstrumentHistory};
    use crate::indicator::IndicatorSpec;
    use chrono::Duration;

    //bars with the given closes, a +/-1 high-low band and the given volumes
    pub fn history_with_volume(closes: &[f64], volumes: &[f64], specs: &[IndicatorSpec]) -> InstrumentHistory {
        let start = parse_timestamp("2023-01-02").unwrap();
        let bars = closes
            .iter()
            .zip(volumes.iter())
            .enumerate()
            .map(|(i, (&close, &volume))| {
                Bar::new_unchecked(
                    start + Duration::weeks(i as i64),
                    close,
                    close + 1.0,
                    close - 1.0,
                    close,
                    volume,
                    "TEST".into(),
                )
            })
            .collect();
        InstrumentHistory::new("TEST".into(), bars, specs)
    }

    pub fn history(closes: &[f64], specs: &[IndicatorSpec]) -> InstrumentHistory {
        history_with_volume(closes, &vec![1000.0; closes.len()], specs)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::history;
    use super::*;

    #[test]
    fn parses_upstream_labels() {
        assert_eq!("买入".parse::<Action>().unwrap(), Action::Buy);
        assert_eq!("持有".parse::<Action>().unwrap(), Action::Hold);
        assert_eq!("sell".parse::<Action>().unwrap(), Action::Sell);
        assert!("maybe".parse::<Action>().is_err());
        assert_eq!(Action::Sell.label_zh(), "卖出");
    }

    #[test]
    fn score_thresholds() {
        assert_eq!(Action::from_score(0.39), Action::Sell);
        assert_eq!(Action::from_score(0.4), Action::Hold);
        assert_eq!(Action::from_score(0.7), Action::Hold);
        assert_eq!(Action::from_score(0.71), Action::Buy);
    }

    #[test]
    fn default_scores_for_rule_signals() {
        let h = history(&[1.0, 2.0], &[]);
        assert_eq!(Signal::rule(&h, 1, Action::Buy).score(), 1.0);
        assert_eq!(Signal::rule(&h, 1, Action::Hold).score(), 0.0);
        assert_eq!(Signal::scored(&h, 1, Action::Hold, 0.55).score(), 0.55);
    }

    #[test]
    fn crossing_needs_both_bars_defined() {
        let h = history(&[3.0, 2.0, 1.0, 2.0, 6.0], &[IndicatorSpec::Sma(1), IndicatorSpec::Sma(3)]);
        //ma3: -, -, 2.0, 1.667, 3.0 ; ma1 = close
        assert!(!crossed_above(&h, "ma1", "ma3", 2));
        assert!(crossed_above(&h, "ma1", "ma3", 3));
        //already above on the prior bar
        assert!(!crossed_above(&h, "ma1", "ma3", 4));
        assert!(!crossed_above(&h, "ma1", "ma3", 0));
    }
}
