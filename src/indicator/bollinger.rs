use crate::indicator::moving_average::{rolling_std, sma};
use crate::indicator::Series;

pub const DEFAULT_WINDOW: usize = 20;
pub const DEFAULT_K: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerSeries {
    pub middle: Series,
    pub upper: Series,
    pub lower: Series,
}

//moving average +/- k sample standard deviations over the trailing window
pub fn calculate_bollinger(closes: &[f64], window: usize, k: f64) -> BollingerSeries {
    let middle = sma(closes, window);
    let std = rolling_std(closes, window);

    let band = |sign: f64| -> Series {
        middle
            .iter()
            .zip(std.iter())
            .map(|(m, s)| Some((*m)? + sign * k * (*s)?))
            .collect()
    };

    BollingerSeries {
        upper: band(1.0),
        lower: band(-1.0),
        middle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_prices_collapse_the_bands() {
        let out = calculate_bollinger(&[12.5; 25], DEFAULT_WINDOW, DEFAULT_K);
        assert!(out.middle[18].is_none());
        for i in 19..25 {
            assert_eq!(out.middle[i], Some(12.5));
            assert_eq!(out.upper[i], Some(12.5));
            assert_eq!(out.lower[i], Some(12.5));
        }
    }

    #[test]
    fn bands_are_symmetric() {
        let closes = [1.0, 3.0, 5.0];
        let out = calculate_bollinger(&closes, 3, 2.0);
        //mean 3, sample std 2
        assert_eq!(out.middle[2], Some(3.0));
        assert_eq!(out.upper[2], Some(7.0));
        assert_eq!(out.lower[2], Some(-1.0));
    }
}
