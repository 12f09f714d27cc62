pub mod backtest_config;

pub use backtest_config::{
    BacktestConfiguration, CompositeParams, PullbackParams, SizingMode, StrategyParams,
    StrategyType, TrendFollowParams, VolumeBreakoutParams,
};
