//technical indicators computed from an instrument's bar history
//
//every series is aligned 1:1 with the bars it was computed from; bars inside
//the warm-up window (or fed by unusable input) carry `None`, never zero

pub mod bollinger;
pub mod kdj;
pub mod macd;
pub mod moving_average;
pub mod rsi;

use crate::data::Bar;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use bollinger::{calculate_bollinger, BollingerSeries};
pub use kdj::{calculate_kdj, KdjSeries};
pub use macd::{calculate_macd, MacdSeries};
pub use moving_average::{ema, rolling_max, rolling_min, rolling_std, sma};
pub use rsi::calculate_rsi;

pub type Series = Vec<Option<f64>>;

//maps non-finite results to "no value"
pub(crate) fn defined(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

//an indicator a strategy needs, with its parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum IndicatorSpec {
    Sma(usize),
    VolumeSma(usize),
    HighestClose(usize),
    Macd { fast: usize, slow: usize, signal: usize },
    Rsi(usize),
    Kdj { n: usize, k: usize, d: usize },
    Bollinger { window: usize, k: f64 },
}

impl IndicatorSpec {
    pub fn default_macd() -> Self {
        IndicatorSpec::Macd {
            fast: macd::DEFAULT_FAST,
            slow: macd::DEFAULT_SLOW,
            signal: macd::DEFAULT_SIGNAL,
        }
    }

    pub fn default_kdj() -> Self {
        IndicatorSpec::Kdj {
            n: kdj::DEFAULT_N,
            k: kdj::DEFAULT_K,
            d: kdj::DEFAULT_D,
        }
    }

    //names of the series this spec produces, in output order
    pub fn keys(&self) -> Vec<String> {
        match *self {
            IndicatorSpec::Sma(n) => vec![format!("ma{}", n)],
            IndicatorSpec::VolumeSma(n) => vec![format!("vol_ma{}", n)],
            IndicatorSpec::HighestClose(n) => vec![format!("high{}", n)],
            IndicatorSpec::Rsi(n) => vec![format!("rsi{}", n)],
            IndicatorSpec::Macd { .. } => {
                let suffix = self.param_suffix();
                ["macd_dif", "macd_dea", "macd_hist"]
                    .iter()
                    .map(|name| format!("{}{}", name, suffix))
                    .collect()
            }
            IndicatorSpec::Kdj { .. } => {
                let suffix = self.param_suffix();
                ["kdj_k", "kdj_d", "kdj_j"]
                    .iter()
                    .map(|name| format!("{}{}", name, suffix))
                    .collect()
            }
            IndicatorSpec::Bollinger { window, .. } => {
                let suffix = self.param_suffix();
                ["boll_mid", "boll_upper", "boll_lower"]
                    .iter()
                    .map(|name| format!("{}{}{}", name, window, suffix))
                    .collect()
            }
        }
    }

    //non-default parameters become part of the key so two variants never collide
    fn param_suffix(&self) -> String {
        match *self {
            IndicatorSpec::Macd { fast, slow, signal } => {
                if (fast, slow, signal) == (macd::DEFAULT_FAST, macd::DEFAULT_SLOW, macd::DEFAULT_SIGNAL) {
                    String::new()
                } else {
                    format!("_{}_{}_{}", fast, slow, signal)
                }
            }
            IndicatorSpec::Kdj { n, k, d } => {
                if (n, k, d) == (kdj::DEFAULT_N, kdj::DEFAULT_K, kdj::DEFAULT_D) {
                    String::new()
                } else {
                    format!("_{}_{}_{}", n, k, d)
                }
            }
            IndicatorSpec::Bollinger { k, .. } => {
                if k == bollinger::DEFAULT_K {
                    String::new()
                } else {
                    format!("_k{}", k)
                }
            }
            _ => String::new(),
        }
    }

    //computes this indicator's series over the bars
    fn compute(&self, bars: &[Bar]) -> Vec<(String, Series)> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let keys = self.keys();

        let series: Vec<Series> = match *self {
            IndicatorSpec::Sma(n) => vec![sma(&closes, n)],
            IndicatorSpec::VolumeSma(n) => {
                let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
                vec![sma(&volumes, n)]
            }
            IndicatorSpec::HighestClose(n) => vec![rolling_max(&closes, n)],
            IndicatorSpec::Rsi(n) => vec![calculate_rsi(&closes, n)],
            IndicatorSpec::Macd { fast, slow, signal } => {
                let out = calculate_macd(&closes, fast, slow, signal);
                vec![out.dif, out.dea, out.macd]
            }
            IndicatorSpec::Kdj { n, k, d } => {
                let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
                let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
                let out = calculate_kdj(&highs, &lows, &closes, n, k, d);
                vec![out.k, out.d, out.j]
            }
            IndicatorSpec::Bollinger { window, k } => {
                let out = calculate_bollinger(&closes, window, k);
                vec![out.middle, out.upper, out.lower]
            }
        };

        keys.into_iter().zip(series).collect()
    }
}

//named indicator series aligned with one instrument's bars
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSet {
    len: usize,
    series: IndexMap<String, Series>,
}

impl IndicatorSet {
    //computes every requested indicator once, deterministically
    pub fn compute(bars: &[Bar], specs: &[IndicatorSpec]) -> Self {
        let mut set = IndicatorSet {
            len: bars.len(),
            series: IndexMap::new(),
        };

        for spec in specs {
            if spec.keys().iter().all(|key| set.series.contains_key(key)) {
                continue;
            }
            for (key, values) in spec.compute(bars) {
                set.series.insert(key, values);
            }
        }

        set
    }

    pub fn get(&self, name: &str) -> Option<&Series> {
        self.series.get(name)
    }

    //value of `name` at `index`; unknown names, warm-up and out-of-range all read as None
    pub fn value(&self, name: &str, index: usize) -> Option<f64> {
        self.series.get(name)?.get(index).copied().flatten()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_timestamp;
    use chrono::Duration;

    fn bars(closes: &[f64]) -> Vec<Bar> {
        let start = parse_timestamp("2024-01-01").unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Bar::new_unchecked(start + Duration::days(i as i64), c, c, c, c, 1000.0, "X".into())
            })
            .collect()
    }

    #[test]
    fn keys_are_stable() {
        assert_eq!(IndicatorSpec::Sma(5).keys(), vec!["ma5"]);
        assert_eq!(IndicatorSpec::default_macd().keys(), vec!["macd_dif", "macd_dea", "macd_hist"]);
        assert_eq!(
            IndicatorSpec::Macd { fast: 5, slow: 10, signal: 4 }.keys()[0],
            "macd_dif_5_10_4"
        );
        assert_eq!(IndicatorSpec::Rsi(14).keys(), vec!["rsi14"]);
        assert_eq!(
            IndicatorSpec::Bollinger { window: 20, k: 2.0 }.keys(),
            vec!["boll_mid20", "boll_upper20", "boll_lower20"]
        );
    }

    #[test]
    fn computes_requested_series_aligned_with_bars() {
        let set = IndicatorSet::compute(
            &bars(&[1.0, 2.0, 3.0, 4.0]),
            &[IndicatorSpec::Sma(2), IndicatorSpec::VolumeSma(2), IndicatorSpec::Sma(2)],
        );

        assert_eq!(set.len(), 4);
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["ma2", "vol_ma2"]);
        assert_eq!(set.value("ma2", 0), None);
        assert_eq!(set.value("ma2", 3), Some(3.5));
        assert_eq!(set.value("vol_ma2", 1), Some(1000.0));
        assert_eq!(set.value("rsi14", 3), None);
        assert_eq!(set.value("ma2", 99), None);
    }

    #[test]
    fn constant_prices_pin_rsi_and_bands() {
        let set = IndicatorSet::compute(
            &bars(&[10.0; 30]),
            &[IndicatorSpec::Rsi(14), IndicatorSpec::Bollinger { window: 20, k: 2.0 }],
        );

        assert_eq!(set.value("rsi14", 29), Some(100.0));
        assert_eq!(set.value("boll_upper20", 29), Some(10.0));
        assert_eq!(set.value("boll_lower20", 29), Some(10.0));
    }
}
