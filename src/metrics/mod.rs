pub mod summary;
pub mod timeseries;

pub use summary::{comparison_table, format_pct, format_ratio, PerformanceReport, TradeStats};
pub use timeseries::{calculate_equity_curve, max_drawdown, period_returns, running_max, EquityPoint};
