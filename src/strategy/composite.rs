use crate::data::{InstrumentHistory, MarketData};
use crate::error::{EngineError, EngineResult};
use crate::indicator::IndicatorSpec;
use crate::strategy::{Action, Signal, Strategy};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

//rule-derived evidence and externally supplied evidence merged by fixed weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedScore {
    pub calc: f64,
    pub ai: f64,
    pub weight_calc: f64,
    pub weight_ai: f64,
}

impl WeightedScore {
    //weighted mean of the two scores
    pub fn combined(&self) -> f64 {
        let total = self.weight_calc + self.weight_ai;
        if total <= 0.0 {
            return self.calc;
        }
        ((self.calc * self.weight_calc + self.ai * self.weight_ai) / total).clamp(0.0, 1.0)
    }

    pub fn action(&self) -> Action {
        Action::from_score(self.combined())
    }
}

//qualitative scores produced upstream (fundamentals or sentiment), keyed by instrument
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalScores {
    scores: IndexMap<String, f64>,
}

impl ExternalScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instrument: impl Into<String>, score: f64) -> EngineResult<()> {
        if !(0.0..=1.0).contains(&score) {
            return Err(EngineError::ScoreOutOfRange(score));
        }
        self.scores.insert(instrument.into(), score);
        Ok(())
    }

    pub fn get(&self, instrument: &str) -> Option<f64> {
        self.scores.get(instrument).copied()
    }

    //deserialized scores skip `insert`, so loaded configs are checked here
    pub fn validate(&self) -> EngineResult<()> {
        match self.scores.values().find(|score| !(0.0..=1.0).contains(*score)) {
            Some(&score) => Err(EngineError::ScoreOutOfRange(score)),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

//blend weights must be finite, non-negative and not both zero
pub fn check_weights(weight_calc: f64, weight_ai: f64) -> EngineResult<()> {
    let valid = |w: f64| w.is_finite() && w >= 0.0;
    if !valid(weight_calc) || !valid(weight_ai) || weight_calc + weight_ai <= 0.0 {
        return Err(EngineError::InvalidWeights {
            calc: weight_calc,
            ai: weight_ai,
        });
    }
    Ok(())
}

//composite strategy: averages the member rule strategies' scores into
//`calc`, blends in the external score and reads the result as buy/hold/sell
pub struct CompositeStrategy {
    members: Vec<Box<dyn Strategy>>,
    external: ExternalScores,
    weight_calc: f64,
    weight_ai: f64,
}

impl CompositeStrategy {
    pub fn new(
        members: Vec<Box<dyn Strategy>>,
        external: ExternalScores,
        weight_calc: f64,
        weight_ai: f64,
    ) -> EngineResult<Self> {
        check_weights(weight_calc, weight_ai)?;

        Ok(CompositeStrategy {
            members,
            external,
            weight_calc,
            weight_ai,
        })
    }

    //the score breakdown for one instrument on one bar
    //with no external score for the instrument the calc score stands alone
    pub fn weighted_score(&self, history: &InstrumentHistory, index: usize) -> WeightedScore {
        let calc = if self.members.is_empty() {
            0.0
        } else {
            self.members
                .iter()
                .map(|member| member.evaluate(history, index).score())
                .sum::<f64>()
                / self.members.len() as f64
        };

        match self.external.get(&history.symbol) {
            Some(ai) => WeightedScore {
                calc,
                ai,
                weight_calc: self.weight_calc,
                weight_ai: self.weight_ai,
            },
            None => WeightedScore {
                calc,
                ai: 0.0,
                weight_calc: 1.0,
                weight_ai: 0.0,
            },
        }
    }
}

impl Strategy for CompositeStrategy {
    fn name(&self) -> &str {
        "Composite"
    }

    fn required_indicators(&self) -> Vec<IndicatorSpec> {
        self.members
            .iter()
            .flat_map(|member| member.required_indicators())
            .collect()
    }

    fn evaluate(&self, history: &InstrumentHistory, index: usize) -> Signal {
        let weighted = self.weighted_score(history, index);
        let score = weighted.combined();
        Signal::scored(history, index, Action::from_score(score), score)
    }
}

//signals for every instrument on `timestamp`, best score first
//ties keep the market's instrument order; instruments without a bar that day are left out
pub fn rank_by_score(
    market: &MarketData,
    strategy: &dyn Strategy,
    timestamp: &DateTime<Utc>,
) -> Vec<Signal> {
    let mut signals: Vec<Signal> = market
        .instruments()
        .filter_map(|history| {
            let index = history.index_at(timestamp)?;
            Some(strategy.evaluate(history, index))
        })
        .collect();

    signals.sort_by(|a, b| b.score().total_cmp(&a.score()));
    signals
}
