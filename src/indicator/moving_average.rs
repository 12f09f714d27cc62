use crate::indicator::{defined, Series};
use statrs::statistics::Statistics;

//arithmetic mean over the trailing window
pub fn sma(values: &[f64], window: usize) -> Series {
    rolling(values, window, |slice| slice.iter().sum::<f64>() / slice.len() as f64)
}

//highest value over the trailing window, current bar included
pub fn rolling_max(values: &[f64], window: usize) -> Series {
    rolling(values, window, |slice| {
        slice.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    })
}

//lowest value over the trailing window, current bar included
pub fn rolling_min(values: &[f64], window: usize) -> Series {
    rolling(values, window, |slice| {
        slice.iter().copied().fold(f64::INFINITY, f64::min)
    })
}

//sample standard deviation (n - 1) over the trailing window
pub fn rolling_std(values: &[f64], window: usize) -> Series {
    rolling(values, window, |slice| {
        if slice.len() < 2 {
            0.0
        } else {
            slice.iter().std_dev()
        }
    })
}

//exponential moving average with smoothing constant 2 / (span + 1)
pub fn ema(values: &[f64], span: usize) -> Series {
    let alpha = 2.0 / (span as f64 + 1.0);
    let input: Series = values.iter().map(|&v| defined(v)).collect();
    smooth(&input, alpha)
}

//recursive exponential smoothing seeded with the first defined input
//undefined inputs produce undefined outputs without resetting the state
pub fn smooth(values: &[Option<f64>], alpha: f64) -> Series {
    let mut state: Option<f64> = None;

    values
        .iter()
        .map(|value| {
            let x = (*value)?;
            let next = match state {
                Some(prev) => alpha * x + (1.0 - alpha) * prev,
                None => x,
            };
            state = Some(next);
            Some(next)
        })
        .collect()
}

fn rolling<F>(values: &[f64], window: usize, reduce: F) -> Series
where
    F: Fn(&[f64]) -> f64,
{
    if window == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            defined(reduce(&values[i + 1 - window..=i]))
        })
        .collect()
}
