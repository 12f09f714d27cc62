use crate::indicator::Series;

pub const DEFAULT_PERIOD: usize = 14;

//mean gain over the period divided by mean gain plus mean loss, scaled to 0-100
//
//a window with no movement at all has a zero denominator; that is read as a
//pure uptrend and reported as 100
pub fn calculate_rsi(closes: &[f64], period: usize) -> Series {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    for i in period..closes.len() {
        //deltas[i - 1] is the change into bar i
        let window = &deltas[i - period..i];
        if window.iter().any(|d| !d.is_finite()) {
            continue;
        }

        let gain = window.iter().map(|d| d.max(0.0)).sum::<f64>() / period as f64;
        let loss = window.iter().map(|d| (-d).max(0.0)).sum::<f64>() / period as f64;
        let denominator = gain + loss;

        out[i] = Some(if denominator == 0.0 {
            100.0
        } else {
            100.0 * gain / denominator
        });
    }

    out
}
