use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

//sharpe a strategy has to beat before its confidence rises above neutral
pub const BENCHMARK_SHARPE: f64 = 0.5;

//win rate stops adding confidence past this level
const WIN_RATE_CAP: f64 = 0.9;

//one row of the sizing schedule: scores in [score_low, score_high) map
//linearly onto [weight_low, weight_high]; the top band also includes score_high
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBand {
    pub score_low: f64,
    pub score_high: f64,
    pub weight_low: f64,
    pub weight_high: f64,
}

impl ScoreBand {
    pub const fn new(score_low: f64, score_high: f64, weight_low: f64, weight_high: f64) -> Self {
        ScoreBand {
            score_low,
            score_high,
            weight_low,
            weight_high,
        }
    }

    fn interpolate(&self, score: f64) -> f64 {
        self.weight_low
            + (score - self.score_low) * (self.weight_high - self.weight_low)
                / (self.score_high - self.score_low)
    }
}

//scores below the lowest band size to 0%
pub fn default_bands() -> Vec<ScoreBand> {
    vec![
        ScoreBand::new(0.4, 0.6, 0.02, 0.05),
        ScoreBand::new(0.6, 0.8, 0.05, 0.10),
        ScoreBand::new(0.8, 1.0, 0.10, 0.15),
    ]
}

//maps a 0-1 confidence score to a suggested portfolio weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSizer {
    bands: Vec<ScoreBand>,
}

impl PositionSizer {
    //bands must be contiguous, ascending, inside [0, 1] and end at 1.0
    pub fn new(mut bands: Vec<ScoreBand>) -> EngineResult<Self> {
        if bands.is_empty() {
            return Err(EngineError::InvalidScoreBands("no bands".into()));
        }

        bands.sort_by(|a, b| a.score_low.total_cmp(&b.score_low));

        for band in &bands {
            let in_unit = |v: f64| (0.0..=1.0).contains(&v);
            if !(in_unit(band.score_low) && in_unit(band.score_high))
                || band.score_high <= band.score_low
            {
                return Err(EngineError::InvalidScoreBands(format!(
                    "band [{}, {}] is empty or outside [0, 1]",
                    band.score_low, band.score_high
                )));
            }
            if band.weight_high < band.weight_low {
                return Err(EngineError::InvalidScoreBands(format!(
                    "band [{}, {}] has decreasing weights",
                    band.score_low, band.score_high
                )));
            }
        }

        for pair in bands.windows(2) {
            if pair[0].score_high != pair[1].score_low {
                return Err(EngineError::InvalidScoreBands(format!(
                    "gap or overlap between {} and {}",
                    pair[0].score_high, pair[1].score_low
                )));
            }
            if pair[1].weight_low < pair[0].weight_high {
                return Err(EngineError::InvalidScoreBands(
                    "weights must not decrease across bands".into(),
                ));
            }
        }

        if bands.last().map(|b| b.score_high) != Some(1.0) {
            return Err(EngineError::InvalidScoreBands("last band must end at 1.0".into()));
        }

        Ok(PositionSizer { bands })
    }

    pub fn bands(&self) -> &[ScoreBand] {
        &self.bands
    }

    //suggested weight for `score`, clamped to [0, 1] and rounded to 4 decimals
    pub fn position_weight(&self, score: f64) -> EngineResult<f64> {
        if !(0.0..=1.0).contains(&score) {
            return Err(EngineError::ScoreOutOfRange(score));
        }

        let last = self.bands.len() - 1;
        let weight = self
            .bands
            .iter()
            .enumerate()
            .find(|(i, band)| {
                score >= band.score_low && (score < band.score_high || *i == last)
            })
            .map(|(_, band)| band.interpolate(score))
            .unwrap_or(0.0);

        Ok(round4(weight.clamp(0.0, 1.0)))
    }
}

impl Default for PositionSizer {
    fn default() -> Self {
        PositionSizer {
            bands: default_bands(),
        }
    }
}

//suggested weight under the default schedule
pub fn position_weight(score: f64) -> EngineResult<f64> {
    PositionSizer::default().position_weight(score)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

//0-1 confidence from backtest metrics: 70% a sigmoid of sharpe over the
//benchmark, 30% the win rate capped at 90%
//undefined metrics count as no edge: sharpe at the benchmark, win rate 0
pub fn confidence_from_metrics(sharpe_ratio: f64, win_rate: f64, benchmark_sharpe: f64) -> f64 {
    let sharpe_confidence = if sharpe_ratio.is_nan() {
        0.5
    } else {
        sigmoid((sharpe_ratio - benchmark_sharpe) * 2.0)
    };
    let win_rate_confidence = if win_rate.is_nan() {
        0.0
    } else {
        win_rate.clamp(0.0, WIN_RATE_CAP)
    };

    round4((0.7 * sharpe_confidence + 0.3 * win_rate_confidence).clamp(0.0, 1.0))
}

//z-score squashed into (0, 1); 0.5 when the distribution has no spread
pub fn normalize_score(raw_score: f64, mean: f64, std: f64) -> f64 {
    if std == 0.0 || !std.is_finite() {
        return 0.5;
    }
    round4(sigmoid((raw_score - mean) / std))
}

//normalizes each raw score against the sample mean and stdev of all of them
pub fn normalize_scores(raw_scores: &[f64]) -> Vec<f64> {
    let mean = raw_scores.iter().mean();
    let std = raw_scores.iter().std_dev();
    raw_scores
        .iter()
        .map(|&score| normalize_score(score, mean, std))
        .collect()
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_inside_bands() {
        assert_eq!(position_weight(0.9).unwrap(), 0.125);
        assert_eq!(position_weight(0.8).unwrap(), 0.10);
        assert_eq!(position_weight(1.0).unwrap(), 0.15);
        assert_eq!(position_weight(0.7).unwrap(), 0.075);
        assert_eq!(position_weight(0.6).unwrap(), 0.05);
        assert_eq!(position_weight(0.5).unwrap(), 0.035);
        assert_eq!(position_weight(0.4).unwrap(), 0.02);
    }

    #[test]
    fn low_scores_get_nothing() {
        for score in [0.0, 0.1, 0.25, 0.3999] {
            assert_eq!(position_weight(score).unwrap(), 0.0);
        }
    }

    #[test]
    fn monotone_over_the_unit_interval() {
        let mut previous = 0.0;
        for step in 0..=1000 {
            let weight = position_weight(step as f64 / 1000.0).unwrap();
            assert!(weight >= previous, "weight fell at step {}", step);
            previous = weight;
        }
    }

    #[test]
    fn top_band_stays_within_ten_to_fifteen_percent() {
        for step in 800..=1000 {
            let weight = position_weight(step as f64 / 1000.0).unwrap();
            assert!((0.10..=0.15).contains(&weight));
        }
    }

    #[test]
    fn out_of_range_scores_are_errors() {
        assert_eq!(position_weight(1.01), Err(EngineError::ScoreOutOfRange(1.01)));
        assert_eq!(position_weight(-0.1), Err(EngineError::ScoreOutOfRange(-0.1)));
        assert!(position_weight(f64::NAN).is_err());
    }

    #[test]
    fn confidence_blends_sharpe_and_win_rate() {
        //sharpe at the benchmark is neutral
        assert_eq!(confidence_from_metrics(0.5, 0.6, BENCHMARK_SHARPE), 0.53);
        //sigmoid(3) = 0.952574, win rate capped at 0.9
        assert_eq!(confidence_from_metrics(2.0, 0.95, BENCHMARK_SHARPE), 0.9368);
        assert_eq!(confidence_from_metrics(f64::NAN, f64::NAN, BENCHMARK_SHARPE), 0.35);

        let weak = confidence_from_metrics(-1.0, 0.3, BENCHMARK_SHARPE);
        let strong = confidence_from_metrics(1.5, 0.3, BENCHMARK_SHARPE);
        assert!(weak < strong);
        assert!(position_weight(strong).is_ok());
    }

    #[test]
    fn normalizes_against_the_distribution() {
        assert_eq!(normalize_score(5.0, 5.0, 0.0), 0.5);
        assert_eq!(normalize_score(2.0, 1.0, 1.0), 0.7311);
        assert_eq!(normalize_score(0.0, 1.0, 1.0), 0.2689);

        assert_eq!(normalize_scores(&[1.0, 2.0, 3.0]), vec![0.2689, 0.5, 0.7311]);
        assert_eq!(normalize_scores(&[4.0, 4.0]), vec![0.5, 0.5]);
        assert_eq!(normalize_scores(&[4.0]), vec![0.5]);
    }

    #[test]
    fn validates_custom_bands() {
        assert!(PositionSizer::new(vec![]).is_err());
        assert!(PositionSizer::new(vec![ScoreBand::new(0.5, 0.9, 0.1, 0.2)]).is_err());
        assert!(PositionSizer::new(vec![
            ScoreBand::new(0.2, 0.5, 0.0, 0.1),
            ScoreBand::new(0.6, 1.0, 0.1, 0.2),
        ])
        .is_err());

        let sizer = PositionSizer::new(vec![ScoreBand::new(0.5, 1.0, 0.0, 0.5)]).unwrap();
        assert_eq!(sizer.position_weight(0.75).unwrap(), 0.25);
        assert_eq!(sizer.position_weight(0.2).unwrap(), 0.0);
    }
}
