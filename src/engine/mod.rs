pub mod backtest;
pub mod execution;

pub use backtest::{BacktestEngine, BacktestResult, BarSnapshot, SimulatorConfig};
pub use execution::{lot_shares, CostModel, Fill, OrderSide, Skip, SkipReason};
