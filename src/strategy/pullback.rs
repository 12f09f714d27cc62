use crate::config::PullbackParams;
use crate::data::InstrumentHistory;
use crate::indicator::IndicatorSpec;
use crate::strategy::{close_at, Action, Signal, Strategy};

//pullback buying: an oversold dip inside an uptrend
//buys while the long ma is rising, kdj j or rsi reads oversold and the
//close still sits above the long ma; sells once the close drops below it
#[derive(Debug, Clone)]
pub struct PullbackStrategy {
    params: PullbackParams,
    ma_key: String,
    j_key: String,
    rsi_key: String,
}

impl PullbackStrategy {
    pub fn new(params: PullbackParams) -> Self {
        PullbackStrategy {
            ma_key: format!("ma{}", params.ma_window),
            j_key: params.kdj_spec().keys()[2].clone(),
            rsi_key: format!("rsi{}", params.rsi_period),
            params,
        }
    }

    fn ma_rising(&self, history: &InstrumentHistory, index: usize) -> bool {
        if index == 0 {
            return false;
        }
        match (
            history.indicator(&self.ma_key, index - 1),
            history.indicator(&self.ma_key, index),
        ) {
            (Some(prev), Some(now)) => now > prev,
            _ => false,
        }
    }

    fn oversold(&self, history: &InstrumentHistory, index: usize) -> bool {
        let j_low = history
            .indicator(&self.j_key, index)
            .is_some_and(|j| j < self.params.j_oversold);
        let rsi_low = history
            .indicator(&self.rsi_key, index)
            .is_some_and(|rsi| rsi < self.params.rsi_oversold);
        j_low || rsi_low
    }
}

impl Default for PullbackStrategy {
    fn default() -> Self {
        Self::new(PullbackParams::default())
    }
}

impl Strategy for PullbackStrategy {
    fn name(&self) -> &str {
        "Pullback"
    }

    fn required_indicators(&self) -> Vec<IndicatorSpec> {
        vec![
            IndicatorSpec::Sma(self.params.ma_window),
            self.params.kdj_spec(),
            IndicatorSpec::Rsi(self.params.rsi_period),
        ]
    }

    fn evaluate(&self, history: &InstrumentHistory, index: usize) -> Signal {
        let (Some(close), Some(ma)) = (
            close_at(history, index),
            history.indicator(&self.ma_key, index),
        ) else {
            return Signal::rule(history, index, Action::Hold);
        };

        if close < ma {
            return Signal::rule(history, index, Action::Sell);
        }

        let buy = close > ma && self.ma_rising(history, index) && self.oversold(history, index);
        let action = if buy { Action::Buy } else { Action::Hold };
        Signal::rule(history, index, action)
    }
}
