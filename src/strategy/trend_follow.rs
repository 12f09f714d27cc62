use crate::config::TrendFollowParams;
use crate::data::InstrumentHistory;
use crate::indicator::IndicatorSpec;
use crate::strategy::{close_at, crossed_above, Action, Signal, Strategy};

//trend following
//buys when, on the same bar, the fast ma crosses above the mid ma, macd dif
//crosses above dea, and the close breaks the prior n-bar closing high;
//sells when the close drops below the mid ma
#[derive(Debug, Clone)]
pub struct TrendFollowStrategy {
    params: TrendFollowParams,
    fast_key: String,
    mid_key: String,
    high_key: String,
    dif_key: String,
    dea_key: String,
}

impl TrendFollowStrategy {
    pub fn new(params: TrendFollowParams) -> Self {
        let macd_keys = params.macd_spec().keys();
        TrendFollowStrategy {
            fast_key: format!("ma{}", params.fast_window),
            mid_key: format!("ma{}", params.mid_window),
            high_key: format!("high{}", params.breakout_window),
            dif_key: macd_keys[0].clone(),
            dea_key: macd_keys[1].clone(),
            params,
        }
    }

    fn breaks_prior_high(&self, history: &InstrumentHistory, index: usize) -> bool {
        if index == 0 {
            return false;
        }
        match (close_at(history, index), history.indicator(&self.high_key, index - 1)) {
            (Some(close), Some(prior_high)) => close > prior_high,
            _ => false,
        }
    }
}

impl Default for TrendFollowStrategy {
    fn default() -> Self {
        Self::new(TrendFollowParams::default())
    }
}

impl Strategy for TrendFollowStrategy {
    fn name(&self) -> &str {
        "Trend Follow"
    }

    fn required_indicators(&self) -> Vec<IndicatorSpec> {
        vec![
            IndicatorSpec::Sma(self.params.fast_window),
            IndicatorSpec::Sma(self.params.mid_window),
            IndicatorSpec::HighestClose(self.params.breakout_window),
            self.params.macd_spec(),
        ]
    }

    fn evaluate(&self, history: &InstrumentHistory, index: usize) -> Signal {
        let close = close_at(history, index);
        let mid = history.indicator(&self.mid_key, index);

        //exit dominates when both fire on one bar
        if let (Some(close), Some(mid)) = (close, mid) {
            if close < mid {
                return Signal::rule(history, index, Action::Sell);
            }
        }

        let buy = crossed_above(history, &self.fast_key, &self.mid_key, index)
            && crossed_above(history, &self.dif_key, &self.dea_key, index)
            && self.breaks_prior_high(history, index);

        let action = if buy { Action::Buy } else { Action::Hold };
        Signal::rule(history, index, action)
    }
}
