use crate::config::VolumeBreakoutParams;
use crate::data::InstrumentHistory;
use crate::indicator::IndicatorSpec;
use crate::strategy::{close_at, Action, Signal, Strategy};

//volume breakout
//buys when the close clears the prior n-bar closing high on volume above
//`volume_multiplier` times its m-bar average while macd dif is positive;
//exits on any single-bar close decrease
#[derive(Debug, Clone)]
pub struct VolumeBreakoutStrategy {
    params: VolumeBreakoutParams,
    high_key: String,
    volume_key: String,
    dif_key: String,
}

impl VolumeBreakoutStrategy {
    pub fn new(params: VolumeBreakoutParams) -> Self {
        VolumeBreakoutStrategy {
            high_key: format!("high{}", params.breakout_window),
            volume_key: format!("vol_ma{}", params.volume_window),
            dif_key: params.macd_spec().keys()[0].clone(),
            params,
        }
    }
}

impl Default for VolumeBreakoutStrategy {
    fn default() -> Self {
        Self::new(VolumeBreakoutParams::default())
    }
}

impl Strategy for VolumeBreakoutStrategy {
    fn name(&self) -> &str {
        "Volume Breakout"
    }

    fn required_indicators(&self) -> Vec<IndicatorSpec> {
        vec![
            IndicatorSpec::HighestClose(self.params.breakout_window),
            IndicatorSpec::VolumeSma(self.params.volume_window),
            self.params.macd_spec(),
        ]
    }

    fn evaluate(&self, history: &InstrumentHistory, index: usize) -> Signal {
        let Some(close) = close_at(history, index) else {
            return Signal::rule(history, index, Action::Hold);
        };
        if index == 0 {
            return Signal::rule(history, index, Action::Hold);
        }

        if close_at(history, index - 1).is_some_and(|prev| close < prev) {
            return Signal::rule(history, index, Action::Sell);
        }

        let breakout = history
            .indicator(&self.high_key, index - 1)
            .is_some_and(|prior_high| close > prior_high);
        let volume_surge = match (
            history.bar(index),
            history.indicator(&self.volume_key, index),
        ) {
            (Some(bar), Some(avg)) => bar.volume > self.params.volume_multiplier * avg,
            _ => false,
        };
        let momentum = history
            .indicator(&self.dif_key, index)
            .is_some_and(|dif| dif > 0.0);

        let action = if breakout && volume_surge && momentum {
            Action::Buy
        } else {
            Action::Hold
        };
        Signal::rule(history, index, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::history_with_volume;

    fn small() -> VolumeBreakoutStrategy {
        VolumeBreakoutStrategy::new(VolumeBreakoutParams {
            breakout_window: 3,
            volume_window: 3,
            volume_multiplier: 1.5,
            macd_fast: 2,
            macd_slow: 3,
            macd_signal: 2,
        })
    }

    #[test]
    fn buys_breakout_on_heavy_volume() {
        let strategy = small();
        let closes = [10.0, 11.0, 12.0, 12.0, 12.0, 15.0];
        let volumes = [100.0, 100.0, 100.0, 100.0, 100.0, 400.0];
        let h = history_with_volume(&closes, &volumes, &strategy.required_indicators());

        //vol_ma3 = 200, 400 > 300
        assert_eq!(strategy.evaluate(&h, 5).action, Action::Buy);
    }

    #[test]
    fn thin_volume_does_not_confirm() {
        let strategy = small();
        let closes = [10.0, 11.0, 12.0, 12.0, 12.0, 15.0];
        let volumes = [100.0, 100.0, 100.0, 100.0, 100.0, 140.0];
        let h = history_with_volume(&closes, &volumes, &strategy.required_indicators());
        assert_eq!(strategy.evaluate(&h, 5).action, Action::Hold);
    }

    #[test]
    fn any_down_close_exits() {
        let strategy = small();
        let closes = [10.0, 11.0, 12.0, 11.99];
        let h = history_with_volume(&closes, &[100.0; 4], &strategy.required_indicators());
        assert_eq!(strategy.evaluate(&h, 3).action, Action::Sell);
    }
}
