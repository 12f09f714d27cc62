use crate::indicator::moving_average::{ema, smooth};
use crate::indicator::Series;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub dif: Series,
    pub dea: Series,
    pub macd: Series,
}

//dif = ema(fast) - ema(slow), dea = ema(dif, signal), macd = 2 * (dif - dea)
//the recursions start on the first bar; dif is reported once the slow ema
//has seen `slow` bars and dea once it has seen `signal` difs on top of that
pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let ema_fast = ema(closes, fast);
    let ema_slow = ema(closes, slow);

    let raw_dif: Series = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();
    let raw_dea = smooth(&raw_dif, 2.0 / (signal as f64 + 1.0));

    let dif_warmup = slow.max(fast).saturating_sub(1);
    let dea_warmup = dif_warmup + signal.saturating_sub(1);

    let dif = mask_warmup(&raw_dif, dif_warmup);
    let dea = mask_warmup(&raw_dea, dea_warmup);
    let macd = dif
        .iter()
        .zip(dea.iter())
        .map(|(d, e)| Some(2.0 * ((*d)? - (*e)?)))
        .collect();

    MacdSeries { dif, dea, macd }
}

fn mask_warmup(values: &Series, warmup: usize) -> Series {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| if i < warmup { None } else { *v })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn warmup_is_undefined() {
        let closes: Vec<f64> = (0..40).map(|i| 10.0 + i as f64).collect();
        let out = calculate_macd(&closes, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL);

        assert!(out.dif[24].is_none());
        assert!(out.dif[25].is_some());
        assert!(out.dea[32].is_none());
        assert!(out.dea[33].is_some());
        assert!(out.macd[33].is_some());
    }

    #[test]
    fn rising_prices_give_positive_dif() {
        let closes: Vec<f64> = (0..60).map(|i| 10.0 + 0.5 * i as f64).collect();
        let out = calculate_macd(&closes, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL);
        assert!(out.dif[59].unwrap() > 0.0);
    }

    #[test]
    fn histogram_is_twice_the_gap() {
        let closes: Vec<f64> = (0..50).map(|i| 20.0 + (i as f64 * 0.3).sin()).collect();
        let out = calculate_macd(&closes, 3, 6, 3);
        let i = 30;
        assert_relative_eq!(
            out.macd[i].unwrap(),
            2.0 * (out.dif[i].unwrap() - out.dea[i].unwrap()),
            epsilon = 1e-12
        );
    }

    #[test]
    fn constant_prices_have_flat_macd() {
        let out = calculate_macd(&[8.0; 40], DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL);
        assert_relative_eq!(out.dif[39].unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(out.macd[39].unwrap(), 0.0, epsilon = 1e-12);
    }
}
