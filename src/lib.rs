//a Rust-based multi-strategy portfolio backtesting engine for lot-traded equities

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod indicator;
pub mod metrics;
pub mod portfolio;
pub mod sizing;
pub mod strategy;

//prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        BacktestConfiguration, CompositeParams, PullbackParams, SizingMode, StrategyParams,
        StrategyType, TrendFollowParams, VolumeBreakoutParams,
    };
    pub use crate::data::{
        filter_by_symbol, group_by_symbol, load_csv, load_csv_with_symbols, resample_weekly, Bar,
        InstrumentHistory, MarketData,
    };
    pub use crate::engine::{
        BacktestEngine, BacktestResult, Fill, OrderSide, SimulatorConfig, Skip, SkipReason,
    };
    pub use crate::error::{EngineError, EngineResult};
    pub use crate::indicator::{IndicatorSet, IndicatorSpec, Series};
    pub use crate::metrics::{
        calculate_equity_curve, comparison_table, EquityPoint, PerformanceReport, TradeStats,
    };
    pub use crate::portfolio::{PortfolioState, Position};
    pub use crate::sizing::{
        confidence_from_metrics, normalize_score, normalize_scores, position_weight,
        PositionSizer, ScoreBand,
    };
    pub use crate::strategy::{
        composite::{rank_by_score, CompositeStrategy, ExternalScores, WeightedScore},
        indicators_for,
        pullback::PullbackStrategy,
        trend_follow::TrendFollowStrategy,
        volume_breakout::VolumeBreakoutStrategy,
        Action, Signal, Strategy,
    };
}
