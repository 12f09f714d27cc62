use crate::indicator::moving_average::{rolling_max, rolling_min, smooth};
use crate::indicator::Series;

pub const DEFAULT_N: usize = 9;
pub const DEFAULT_K: usize = 3;
pub const DEFAULT_D: usize = 3;

//rsv when the lookback window has no high-low range
pub const NEUTRAL_RSV: f64 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub struct KdjSeries {
    pub rsv: Series,
    pub k: Series,
    pub d: Series,
    pub j: Series,
}

//rsv = (close - lowest low) / (highest high - lowest low) * 100 over `n` bars
//k and d smooth rsv and k with weight 1/k_period and 1/d_period; j = 3k - 2d
pub fn calculate_kdj(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    n: usize,
    k_period: usize,
    d_period: usize,
) -> KdjSeries {
    let highest = rolling_max(highs, n);
    let lowest = rolling_min(lows, n);

    let rsv: Series = closes
        .iter()
        .zip(highest.iter().zip(lowest.iter()))
        .map(|(&close, (hh, ll))| {
            let (hh, ll) = ((*hh)?, (*ll)?);
            if !close.is_finite() {
                return None;
            }
            let range = hh - ll;
            if range == 0.0 {
                Some(NEUTRAL_RSV)
            } else {
                Some((close - ll) / range * 100.0)
            }
        })
        .collect();

    let k = smooth(&rsv, 1.0 / k_period.max(1) as f64);
    let d = smooth(&k, 1.0 / d_period.max(1) as f64);
    let j = k
        .iter()
        .zip(d.iter())
        .map(|(k, d)| Some(3.0 * (*k)? - 2.0 * (*d)?))
        .collect();

    KdjSeries { rsv, k, d, j }
}
