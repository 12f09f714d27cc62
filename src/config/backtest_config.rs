use crate::engine::SimulatorConfig;
use crate::error::{EngineError, EngineResult};
use crate::indicator::{macd, IndicatorSpec};
use crate::sizing::{default_bands, PositionSizer, ScoreBand};
use crate::strategy::composite::{check_weights, CompositeStrategy, ExternalScores};
use crate::strategy::pullback::PullbackStrategy;
use crate::strategy::trend_follow::TrendFollowStrategy;
use crate::strategy::volume_breakout::VolumeBreakoutStrategy;
use crate::strategy::Strategy;
use serde::{Deserialize, Serialize};
use std::path::Path;

//strategy type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyType {
    TrendFollow,
    Pullback,
    VolumeBreakout,
    Composite,
}

impl StrategyType {
    //parse strategy type from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trend" | "trend_follow" => Some(StrategyType::TrendFollow),
            "pullback" => Some(StrategyType::Pullback),
            "volume" | "volume_breakout" => Some(StrategyType::VolumeBreakout),
            "composite" | "weighted" => Some(StrategyType::Composite),
            _ => None,
        }
    }
}

//how a buy is turned into a cash allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SizingMode {
    //available cash split evenly across max_hold slots
    #[default]
    EqualWeight,
    //total equity times the sizer's weight for the signal score
    ScoreWeighted,
}

impl SizingMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "equal" | "equal_weight" => Some(SizingMode::EqualWeight),
            "score" | "score_weighted" => Some(SizingMode::ScoreWeighted),
            _ => None,
        }
    }
}

//trend follow strategy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendFollowParams {
    pub fast_window: usize,
    pub mid_window: usize,
    pub breakout_window: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl TrendFollowParams {
    pub fn macd_spec(&self) -> IndicatorSpec {
        IndicatorSpec::Macd {
            fast: self.macd_fast,
            slow: self.macd_slow,
            signal: self.macd_signal,
        }
    }

    fn validate(&self) -> EngineResult<()> {
        check_window("trend fast ma", self.fast_window, 1)?;
        check_window("trend mid ma", self.mid_window, 1)?;
        check_window("trend breakout", self.breakout_window, 1)?;
        check_macd(self.macd_fast, self.macd_slow, self.macd_signal)
    }
}

impl Default for TrendFollowParams {
    fn default() -> Self {
        TrendFollowParams {
            fast_window: 5,
            mid_window: 10,
            breakout_window: 20,
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
        }
    }
}

//pullback strategy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullbackParams {
    pub ma_window: usize,
    pub kdj_n: usize,
    pub kdj_k: usize,
    pub kdj_d: usize,
    pub rsi_period: usize,
    pub j_oversold: f64,
    pub rsi_oversold: f64,
}

impl PullbackParams {
    pub fn kdj_spec(&self) -> IndicatorSpec {
        IndicatorSpec::Kdj {
            n: self.kdj_n,
            k: self.kdj_k,
            d: self.kdj_d,
        }
    }

    fn validate(&self) -> EngineResult<()> {
        check_window("pullback ma", self.ma_window, 1)?;
        check_window("kdj n", self.kdj_n, 1)?;
        check_window("kdj k", self.kdj_k, 1)?;
        check_window("kdj d", self.kdj_d, 1)?;
        check_window("rsi", self.rsi_period, 1)
    }
}

impl Default for PullbackParams {
    fn default() -> Self {
        PullbackParams {
            ma_window: 20,
            kdj_n: 9,
            kdj_k: 3,
            kdj_d: 3,
            rsi_period: 14,
            j_oversold: 20.0,
            rsi_oversold: 30.0,
        }
    }
}

//volume breakout strategy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeBreakoutParams {
    pub breakout_window: usize,
    pub volume_window: usize,
    pub volume_multiplier: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl VolumeBreakoutParams {
    pub fn macd_spec(&self) -> IndicatorSpec {
        IndicatorSpec::Macd {
            fast: self.macd_fast,
            slow: self.macd_slow,
            signal: self.macd_signal,
        }
    }

    fn validate(&self) -> EngineResult<()> {
        check_window("volume breakout", self.breakout_window, 1)?;
        check_window("volume average", self.volume_window, 1)?;
        check_macd(self.macd_fast, self.macd_slow, self.macd_signal)
    }
}

impl Default for VolumeBreakoutParams {
    fn default() -> Self {
        VolumeBreakoutParams {
            breakout_window: 20,
            volume_window: 8,
            volume_multiplier: 1.5,
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
        }
    }
}

//composite strategy parameters: the three rule strategies plus blend weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeParams {
    pub trend: TrendFollowParams,
    pub pullback: PullbackParams,
    pub volume: VolumeBreakoutParams,
    pub weight_calc: f64,
    pub weight_ai: f64,
}

impl Default for CompositeParams {
    fn default() -> Self {
        CompositeParams {
            trend: TrendFollowParams::default(),
            pullback: PullbackParams::default(),
            volume: VolumeBreakoutParams::default(),
            weight_calc: 0.6,
            weight_ai: 0.4,
        }
    }
}

//strategy-specific parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StrategyParams {
    TrendFollow(TrendFollowParams),
    Pullback(PullbackParams),
    VolumeBreakout(VolumeBreakoutParams),
    Composite(CompositeParams),
}

impl StrategyParams {
    //default parameters for a strategy type
    pub fn defaults_for(strategy_type: StrategyType) -> Self {
        match strategy_type {
            StrategyType::TrendFollow => StrategyParams::TrendFollow(TrendFollowParams::default()),
            StrategyType::Pullback => StrategyParams::Pullback(PullbackParams::default()),
            StrategyType::VolumeBreakout => {
                StrategyParams::VolumeBreakout(VolumeBreakoutParams::default())
            }
            StrategyType::Composite => StrategyParams::Composite(CompositeParams::default()),
        }
    }

    pub fn strategy_type(&self) -> StrategyType {
        match self {
            StrategyParams::TrendFollow(_) => StrategyType::TrendFollow,
            StrategyParams::Pullback(_) => StrategyType::Pullback,
            StrategyParams::VolumeBreakout(_) => StrategyType::VolumeBreakout,
            StrategyParams::Composite(_) => StrategyType::Composite,
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        match self {
            StrategyParams::TrendFollow(p) => p.validate(),
            StrategyParams::Pullback(p) => p.validate(),
            StrategyParams::VolumeBreakout(p) => p.validate(),
            StrategyParams::Composite(p) => {
                p.trend.validate()?;
                p.pullback.validate()?;
                p.volume.validate()?;
                check_weights(p.weight_calc, p.weight_ai)
            }
        }
    }

    //instantiates the strategy; external scores only feed the composite
    pub fn build(&self, external: &ExternalScores) -> EngineResult<Box<dyn Strategy>> {
        self.validate()?;
        let strategy: Box<dyn Strategy> = match self {
            StrategyParams::TrendFollow(p) => Box::new(TrendFollowStrategy::new(p.clone())),
            StrategyParams::Pullback(p) => Box::new(PullbackStrategy::new(p.clone())),
            StrategyParams::VolumeBreakout(p) => Box::new(VolumeBreakoutStrategy::new(p.clone())),
            StrategyParams::Composite(p) => {
                let members: Vec<Box<dyn Strategy>> = vec![
                    Box::new(TrendFollowStrategy::new(p.trend.clone())),
                    Box::new(PullbackStrategy::new(p.pullback.clone())),
                    Box::new(VolumeBreakoutStrategy::new(p.volume.clone())),
                ];
                Box::new(CompositeStrategy::new(
                    members,
                    external.clone(),
                    p.weight_calc,
                    p.weight_ai,
                )?)
            }
        };
        Ok(strategy)
    }
}

//complete backtest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfiguration {
    //account settings
    pub initial_capital: f64,
    pub fee_rate: f64,
    pub slippage_rate: f64,

    //portfolio constraints
    pub max_hold: usize,
    pub lot_size: u64,
    pub sizing: SizingMode,
    pub score_bands: Vec<ScoreBand>,

    //bars per year used to annualise (52 weekly, 252 daily)
    pub periods_per_year: f64,

    //strategies, each simulated independently over the same data
    pub strategies: Vec<StrategyParams>,

    //qualitative scores fed to the composite strategy
    pub external_scores: ExternalScores,
}

impl Default for BacktestConfiguration {
    fn default() -> Self {
        BacktestConfiguration {
            initial_capital: 1_000_000.0,
            fee_rate: 0.0003,
            slippage_rate: 0.0002,
            max_hold: 20,
            lot_size: 100,
            sizing: SizingMode::EqualWeight,
            score_bands: default_bands(),
            periods_per_year: WEEKLY_PERIODS_PER_YEAR,
            strategies: vec![StrategyParams::TrendFollow(TrendFollowParams::default())],
            external_scores: ExternalScores::default(),
        }
    }
}

//bars per year for weekly and daily data
pub const WEEKLY_PERIODS_PER_YEAR: f64 = 52.0;
pub const DAILY_PERIODS_PER_YEAR: f64 = 252.0;

impl BacktestConfiguration {
    pub fn default_periods_per_year(weekly: bool) -> f64 {
        if weekly {
            WEEKLY_PERIODS_PER_YEAR
        } else {
            DAILY_PERIODS_PER_YEAR
        }
    }

    //picks the annualisation for the bar frequency being simulated:
    //an explicit override wins, a value from a config file is kept (with a
    //warning if it does not match the frequency), otherwise the frequency default
    pub fn resolve_periods_per_year(&mut self, weekly: bool, explicit: Option<f64>, from_file: bool) {
        let expected = Self::default_periods_per_year(weekly);
        match explicit {
            Some(value) => self.periods_per_year = value,
            None if from_file => {
                if self.periods_per_year != expected {
                    tracing::warn!(
                        periods_per_year = self.periods_per_year,
                        expected,
                        weekly,
                        "configured annualisation does not match the bar frequency"
                    );
                }
            }
            None => self.periods_per_year = expected,
        }
    }

    //fails fast on any parameter the simulation cannot honour
    pub fn validate(&self) -> EngineResult<()> {
        self.simulator_config().validate()?;
        self.position_sizer()?;
        for strategy in &self.strategies {
            strategy.validate()?;
        }
        self.external_scores.validate()
    }

    pub fn simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            initial_capital: self.initial_capital,
            fee_rate: self.fee_rate,
            slippage_rate: self.slippage_rate,
            max_hold: self.max_hold,
            lot_size: self.lot_size,
            sizing: self.sizing,
            periods_per_year: self.periods_per_year,
        }
    }

    pub fn position_sizer(&self) -> EngineResult<PositionSizer> {
        PositionSizer::new(self.score_bands.clone())
    }

    //builds every configured strategy in order
    pub fn build_strategies(&self) -> EngineResult<Vec<Box<dyn Strategy>>> {
        self.strategies
            .iter()
            .map(|params| params.build(&self.external_scores))
            .collect()
    }

    //load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: BacktestConfiguration = serde_json::from_str(&contents)?;
        Ok(config)
    }

    //save configuration to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

fn check_window(name: &'static str, value: usize, min: usize) -> EngineResult<()> {
    if value < min {
        return Err(EngineError::InvalidWindow { name, value, min });
    }
    Ok(())
}

fn check_macd(fast: usize, slow: usize, signal: usize) -> EngineResult<()> {
    check_window("macd fast", fast, 1)?;
    check_window("macd slow", slow, fast.max(1))?;
    check_window("macd signal", signal, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = BacktestConfiguration::default();
        config.validate().unwrap();
        assert_eq!(config.build_strategies().unwrap().len(), 1);
    }

    #[test]
    fn parses_names() {
        assert_eq!(StrategyType::parse("Trend"), Some(StrategyType::TrendFollow));
        assert_eq!(StrategyType::parse("volume_breakout"), Some(StrategyType::VolumeBreakout));
        assert_eq!(StrategyType::parse("weighted"), Some(StrategyType::Composite));
        assert_eq!(StrategyType::parse("martingale"), None);
        assert_eq!(SizingMode::parse("score"), Some(SizingMode::ScoreWeighted));
    }

    #[test]
    fn rejects_bad_parameters() {
        let config = BacktestConfiguration {
            initial_capital: -1.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(EngineError::NegativeCapital(-1.0)));

        let config = BacktestConfiguration {
            max_hold: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(EngineError::ZeroMaxHold));

        let config = BacktestConfiguration {
            strategies: vec![StrategyParams::TrendFollow(TrendFollowParams {
                mid_window: 0,
                ..Default::default()
            })],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::InvalidWindow { .. })));
    }

    #[test]
    fn loaded_scores_and_weights_are_checked() {
        let config: BacktestConfiguration =
            serde_json::from_str(r#"{ "external_scores": { "A": 0.3, "B": 7.5 } }"#).unwrap();
        assert_eq!(config.external_scores.get("B"), Some(7.5));
        assert_eq!(config.validate(), Err(EngineError::ScoreOutOfRange(7.5)));

        let config = BacktestConfiguration {
            strategies: vec![StrategyParams::Composite(CompositeParams {
                weight_calc: 0.0,
                weight_ai: 0.0,
                ..Default::default()
            })],
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(EngineError::InvalidWeights { calc: 0.0, ai: 0.0 })
        );

        let config = BacktestConfiguration {
            strategies: vec![StrategyParams::Composite(CompositeParams {
                weight_ai: -0.4,
                ..Default::default()
            })],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::InvalidWeights { .. })));
    }

    #[test]
    fn round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = BacktestConfiguration {
            sizing: SizingMode::ScoreWeighted,
            strategies: vec![
                StrategyParams::defaults_for(StrategyType::Pullback),
                StrategyParams::defaults_for(StrategyType::Composite),
            ],
            ..Default::default()
        };
        config.external_scores.insert("600519", 0.8).unwrap();
        config.to_json_file(&path).unwrap();

        let loaded = BacktestConfiguration::from_json_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn annualisation_follows_bar_frequency() {
        let mut daily = BacktestConfiguration::default();
        daily.resolve_periods_per_year(false, None, false);
        assert_eq!(daily.periods_per_year, 252.0);

        let mut weekly = BacktestConfiguration::default();
        weekly.resolve_periods_per_year(true, None, false);
        assert_eq!(weekly.periods_per_year, 52.0);

        let mut explicit = BacktestConfiguration::default();
        explicit.resolve_periods_per_year(false, Some(250.0), true);
        assert_eq!(explicit.periods_per_year, 250.0);

        //a file value is kept even when it looks like the other frequency
        let mut loaded = BacktestConfiguration {
            periods_per_year: 12.0,
            ..Default::default()
        };
        loaded.resolve_periods_per_year(false, None, true);
        assert_eq!(loaded.periods_per_year, 12.0);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: BacktestConfiguration =
            serde_json::from_str(r#"{ "max_hold": 3, "periods_per_year": 252.0 }"#).unwrap();
        assert_eq!(config.max_hold, 3);
        assert_eq!(config.lot_size, 100);
        assert_eq!(config.strategies.len(), 1);
    }
}
