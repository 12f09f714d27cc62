use crate::engine::execution::{Fill, OrderSide};
use crate::metrics::timeseries::{max_drawdown, period_returns};
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

//shown wherever a metric is not a number
const UNDEFINED: &str = "undefined";

//scalar performance report for one equity series
//NaN marks a metric with no defined value (e.g. sharpe at zero volatility)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub initial_equity: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub periods: usize,
}

impl PerformanceReport {
    //pure reduction over the ordered equity values
    pub fn from_equity(equity_values: &[f64], periods_per_year: f64) -> Self {
        let returns = period_returns(equity_values);
        let periods = returns.len();

        let initial_equity = equity_values.first().copied().unwrap_or(f64::NAN);
        let final_equity = equity_values.last().copied().unwrap_or(f64::NAN);

        let total_return = if initial_equity > 0.0 {
            final_equity / initial_equity - 1.0
        } else {
            f64::NAN
        };

        let annual_return = annual_return(initial_equity, final_equity, periods, periods_per_year);

        //sample stdev needs two returns
        let annual_volatility = if periods >= 2 {
            returns.iter().std_dev() * periods_per_year.sqrt()
        } else {
            f64::NAN
        };

        let sharpe_ratio = if annual_volatility == 0.0 {
            f64::NAN
        } else {
            annual_return / annual_volatility
        };

        PerformanceReport {
            initial_equity,
            final_equity,
            total_return,
            annual_return,
            annual_volatility,
            sharpe_ratio,
            max_drawdown: max_drawdown(equity_values),
            periods,
        }
    }

    pub fn is_sharpe_defined(&self) -> bool {
        self.sharpe_ratio.is_finite()
    }

    //the report as a two-column table
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();

        table.add_row(Row::new(vec![Cell::new("Metric"), Cell::new("Value")]));

        table.add_row(Row::new(vec![
            Cell::new("Initial Equity"),
            Cell::new(&format!("{:.2}", self.initial_equity)),
        ]));

        table.add_row(Row::new(vec![
            Cell::new("Final Equity"),
            Cell::new(&format!("{:.2}", self.final_equity)),
        ]));

        table.add_row(Row::new(vec![
            Cell::new("Total Return"),
            Cell::new(&format_pct(self.total_return)),
        ]));

        table.add_row(Row::new(vec![
            Cell::new("Annual Return"),
            Cell::new(&format_pct(self.annual_return)),
        ]));

        table.add_row(Row::new(vec![
            Cell::new("Annual Volatility"),
            Cell::new(&format_pct(self.annual_volatility)),
        ]));

        table.add_row(Row::new(vec![
            Cell::new("Sharpe Ratio"),
            Cell::new(&format_ratio(self.sharpe_ratio)),
        ]));

        table.add_row(Row::new(vec![
            Cell::new("Max Drawdown"),
            Cell::new(&format_pct(self.max_drawdown)),
        ]));

        table.add_row(Row::new(vec![
            Cell::new("Periods"),
            Cell::new(&format!("{}", self.periods)),
        ]));

        table
    }

    //prints metrics in a formatted table
    pub fn pretty_print_table(&self) {
        self.to_table().printstd();
    }
}

//(last / first)^(periods_per_year / periods) - 1
fn annual_return(first: f64, last: f64, periods: usize, periods_per_year: f64) -> f64 {
    if periods == 0 || !(first > 0.0) {
        return f64::NAN;
    }
    (last / first).powf(periods_per_year / periods as f64) - 1.0
}

//round-trip statistics from the fill log; each sell closes one round trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeStats {
    pub num_fills: usize,
    pub num_round_trips: usize,
    pub num_winning_trades: usize,
    pub num_losing_trades: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub profit_factor: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub total_fees: f64,
}

impl TradeStats {
    pub fn from_fills(fills: &[Fill]) -> Self {
        let round_trips: Vec<f64> = fills
            .iter()
            .filter(|fill| fill.side == OrderSide::Sell)
            .filter_map(|fill| fill.realized_pnl)
            .collect();

        let winning_trades: Vec<f64> = round_trips.iter().copied().filter(|&p| p > 0.0).collect();
        let losing_trades: Vec<f64> = round_trips.iter().copied().filter(|&p| p < 0.0).collect();

        let mean_or_nan = |values: &[f64]| {
            if values.is_empty() {
                f64::NAN
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        };

        let win_rate = if round_trips.is_empty() {
            f64::NAN
        } else {
            winning_trades.len() as f64 / round_trips.len() as f64
        };

        let total_wins: f64 = winning_trades.iter().sum();
        let total_losses: f64 = losing_trades.iter().sum::<f64>().abs();

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            f64::NAN
        };

        TradeStats {
            num_fills: fills.len(),
            num_round_trips: round_trips.len(),
            num_winning_trades: winning_trades.len(),
            num_losing_trades: losing_trades.len(),
            win_rate,
            avg_win: mean_or_nan(&winning_trades),
            avg_loss: mean_or_nan(&losing_trades),
            profit_factor,
            largest_win: winning_trades.iter().fold(0.0f64, |a, &b| a.max(b)),
            largest_loss: losing_trades.iter().fold(0.0f64, |a, &b| a.min(b)),
            total_fees: fills.iter().map(|fill| fill.fees).sum(),
        }
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();

        table.add_row(Row::new(vec![Cell::new("Trades"), Cell::new("Value")]));
        table.add_row(Row::new(vec![
            Cell::new("Fills"),
            Cell::new(&format!("{}", self.num_fills)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("Round Trips"),
            Cell::new(&format!("{}", self.num_round_trips)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("Win Rate"),
            Cell::new(&format_pct(self.win_rate)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("Avg Win"),
            Cell::new(&format_money(self.avg_win)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("Avg Loss"),
            Cell::new(&format_money(self.avg_loss)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("Largest Win"),
            Cell::new(&format_money(self.largest_win)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("Largest Loss"),
            Cell::new(&format_money(self.largest_loss)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("Profit Factor"),
            Cell::new(&format_ratio(self.profit_factor)),
        ]));
        table.add_row(Row::new(vec![
            Cell::new("Total Fees"),
            Cell::new(&format_money(self.total_fees)),
        ]));

        table
    }

    pub fn pretty_print_table(&self) {
        self.to_table().printstd();
    }
}

//one row per strategy, the four headline metrics side by side
pub fn comparison_table<'a, I>(rows: I) -> Table
where
    I: IntoIterator<Item = (&'a str, &'a PerformanceReport)>,
{
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Strategy"),
        Cell::new("Annual Return"),
        Cell::new("Annual Volatility"),
        Cell::new("Sharpe"),
        Cell::new("Max Drawdown"),
    ]));

    for (name, report) in rows {
        table.add_row(Row::new(vec![
            Cell::new(name),
            Cell::new(&format_pct(report.annual_return)),
            Cell::new(&format_pct(report.annual_volatility)),
            Cell::new(&format_ratio(report.sharpe_ratio)),
            Cell::new(&format_pct(report.max_drawdown)),
        ]));
    }

    table
}

pub fn format_pct(value: f64) -> String {
    if value.is_nan() {
        UNDEFINED.to_string()
    } else {
        format!("{:.2}%", value * 100.0)
    }
}

pub fn format_ratio(value: f64) -> String {
    if value.is_nan() {
        UNDEFINED.to_string()
    } else {
        format!("{:.3}", value)
    }
}

fn format_money(value: f64) -> String {
    if value.is_nan() {
        UNDEFINED.to_string()
    } else {
        format!("{:.2}", value)
    }
}
