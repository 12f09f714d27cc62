use crate::config::SizingMode;
use crate::data::{InstrumentHistory, MarketData};
use crate::engine::execution::{lot_shares, CostModel, Fill, OrderSide, Skip, SkipReason};
use crate::error::{EngineError, EngineResult};
use crate::metrics::{calculate_equity_curve, EquityPoint, PerformanceReport, TradeStats};
use crate::portfolio::{PortfolioState, Position};
use crate::sizing::{confidence_from_metrics, PositionSizer, BENCHMARK_SHARPE};
use crate::strategy::{Signal, Strategy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//account and portfolio settings for one simulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub initial_capital: f64,
    pub fee_rate: f64,
    pub slippage_rate: f64,

    //max concurrently held instruments
    pub max_hold: usize,

    //shares per tradable lot
    pub lot_size: u64,
    pub sizing: SizingMode,
    pub periods_per_year: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            initial_capital: 1_000_000.0,
            fee_rate: 0.0003,
            slippage_rate: 0.0002,
            max_hold: 20,
            lot_size: 100,
            sizing: SizingMode::EqualWeight,
            periods_per_year: 52.0,
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.initial_capital >= 0.0) || !self.initial_capital.is_finite() {
            return Err(EngineError::NegativeCapital(self.initial_capital));
        }

        for (name, value) in [("fee_rate", self.fee_rate), ("slippage_rate", self.slippage_rate)] {
            if !(0.0..1.0).contains(&value) {
                return Err(EngineError::InvalidRate { name, value });
            }
        }

        //sells must still return something
        let combined = self.fee_rate + self.slippage_rate;
        if combined >= 1.0 {
            return Err(EngineError::InvalidRate {
                name: "fee_rate + slippage_rate",
                value: combined,
            });
        }

        if self.max_hold == 0 {
            return Err(EngineError::ZeroMaxHold);
        }

        if self.lot_size == 0 {
            return Err(EngineError::InvalidLotSize);
        }

        if !(self.periods_per_year > 0.0) || !self.periods_per_year.is_finite() {
            return Err(EngineError::InvalidPeriodsPerYear(self.periods_per_year));
        }

        Ok(())
    }

    pub fn cost_model(&self) -> CostModel {
        CostModel::new(self.fee_rate, self.slippage_rate)
    }
}

//portfolio state at the end of one bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSnapshot {
    pub timestamp: DateTime<Utc>,
    pub cash: f64,
    pub total_value: f64,
    pub held: usize,
}

//result of a backtest
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub strategy: String,
    pub equity_history: Vec<(DateTime<Utc>, f64)>,
    pub equity_curve: Vec<EquityPoint>,
    pub report: PerformanceReport,
    pub trade_stats: TradeStats,
    pub trades: Vec<Fill>,
    pub skips: Vec<Skip>,
    pub snapshots: Vec<BarSnapshot>,
    pub final_state: PortfolioState,
}

impl BacktestResult {
    pub fn equity_values(&self) -> Vec<f64> {
        self.equity_history.iter().map(|(_, e)| *e).collect()
    }

    pub fn final_equity(&self) -> Option<f64> {
        self.equity_history.last().map(|(_, e)| *e)
    }

    pub fn skip_count(&self, reason: SkipReason) -> usize {
        self.skips.iter().filter(|skip| skip.reason == reason).count()
    }

    //0-1 confidence in this strategy from its sharpe and win rate
    pub fn confidence(&self) -> f64 {
        confidence_from_metrics(
            self.report.sharpe_ratio,
            self.trade_stats.win_rate,
            BENCHMARK_SHARPE,
        )
    }
}

//main backtest engine
//
//walks the common calendar bar by bar; within a bar instruments are visited
//in market data order, which is also the tie-break when more instruments
//signal a buy than there are free slots
pub struct BacktestEngine {
    config: SimulatorConfig,
    sizer: PositionSizer,
    costs: CostModel,
}

impl BacktestEngine {
    //creates a new backtest engine; rejects invalid settings up front
    pub fn new(config: SimulatorConfig, sizer: PositionSizer) -> EngineResult<Self> {
        config.validate()?;
        Ok(BacktestEngine {
            costs: config.cost_model(),
            config,
            sizer,
        })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn sizer(&self) -> &PositionSizer {
        &self.sizer
    }

    //runs the backtest with the given strategy
    //the engine holds no run state, so repeated runs on the same inputs are identical
    pub fn run(&self, market: &MarketData, strategy: &dyn Strategy) -> BacktestResult {
        let span = tracing::info_span!("backtest", strategy = strategy.name());
        let _guard = span.enter();

        let mut run = Run::new(self);

        //main backtest loop
        for timestamp in market.calendar() {
            //marks first, so every sizing decision on this bar sees the same prices
            for history in market.instruments() {
                if let Some((_, close)) = usable_close(history, timestamp) {
                    run.state.update_mark(&history.symbol, close);
                }
            }

            for history in market.instruments() {
                match usable_close(history, timestamp) {
                    Some((index, price)) => {
                        let signal = strategy.evaluate(history, index);
                        run.apply(&signal, price);
                    }
                    None => run.skip(*timestamp, &history.symbol, SkipReason::DataGap),
                }
            }

            run.record(*timestamp);
        }

        //last point reflects the mark-to-market of anything still open
        run.finalize();

        let result = run.into_result(strategy.name(), self.config.periods_per_year);

        tracing::info!(
            final_equity = result.final_equity().unwrap_or(self.config.initial_capital),
            annual_return = result.report.annual_return,
            sharpe = result.report.sharpe_ratio,
            max_drawdown = result.report.max_drawdown,
            fills = result.trades.len(),
            skips = result.skips.len(),
            "backtest finished"
        );

        result
    }

    //runs every strategy independently over the same market data, in order
    pub fn run_all(
        &self,
        market: &MarketData,
        strategies: &[Box<dyn Strategy>],
    ) -> Vec<BacktestResult> {
        strategies
            .iter()
            .map(|strategy| self.run(market, strategy.as_ref()))
            .collect()
    }

    //cash to commit to a new position
    fn allocation(&self, state: &PortfolioState, signal: &Signal) -> f64 {
        match self.config.sizing {
            SizingMode::EqualWeight => state.cash / self.config.max_hold as f64,
            SizingMode::ScoreWeighted => {
                let weight = self
                    .sizer
                    .position_weight(signal.score().clamp(0.0, 1.0))
                    .unwrap_or(0.0);
                state.total_value() * weight
            }
        }
    }
}

//bar index and close for `timestamp`, unless the bar is missing or unpriced
fn usable_close(history: &InstrumentHistory, timestamp: &DateTime<Utc>) -> Option<(usize, f64)> {
    let index = history.index_at(timestamp)?;
    let bar = history.bar(index).filter(|bar| bar.has_valid_close())?;
    Some((index, bar.close))
}

//mutable state of a single run; the only writer of its PortfolioState
struct Run<'a> {
    engine: &'a BacktestEngine,
    state: PortfolioState,
    trades: Vec<Fill>,
    skips: Vec<Skip>,
    snapshots: Vec<BarSnapshot>,
    next_fill_id: u64,
}

impl<'a> Run<'a> {
    fn new(engine: &'a BacktestEngine) -> Self {
        Run {
            engine,
            state: PortfolioState::new(engine.config.initial_capital),
            trades: Vec::new(),
            skips: Vec::new(),
            snapshots: Vec::new(),
            next_fill_id: 1,
        }
    }

    fn apply(&mut self, signal: &Signal, price: f64) {
        if self.state.is_held(&signal.instrument) {
            //a second buy while held is a no-op
            if signal.is_sell() {
                self.sell(signal, price);
            }
        } else if signal.is_buy() {
            self.buy(signal, price);
        }
    }

    fn buy(&mut self, signal: &Signal, price: f64) {
        let engine = self.engine;

        if self.state.held_count() >= engine.config.max_hold {
            self.skip(signal.timestamp, &signal.instrument, SkipReason::MaxPositionsReached);
            return;
        }

        let allocation = engine.allocation(&self.state, signal);
        let shares = lot_shares(allocation, price, engine.config.lot_size);
        if shares == 0 {
            self.skip(signal.timestamp, &signal.instrument, SkipReason::BelowMinimumLot);
            return;
        }

        let cost = engine.costs.buy_cost(price, shares);
        if cost > self.state.cash {
            self.skip(signal.timestamp, &signal.instrument, SkipReason::InsufficientCash);
            return;
        }

        self.state.open(Position::open(
            signal.instrument.clone(),
            shares,
            price,
            cost,
        ));

        tracing::debug!(
            symbol = %signal.instrument,
            shares,
            price,
            cost,
            cash = self.state.cash,
            "buy filled"
        );

        let fees = engine.costs.costs(price, shares);
        self.push_fill(signal, OrderSide::Buy, shares, price, fees, None);
    }

    fn sell(&mut self, signal: &Signal, price: f64) {
        let Some(shares) = self.state.position(&signal.instrument).map(|p| p.shares) else {
            return;
        };

        let proceeds = self.engine.costs.sell_proceeds(price, shares);
        let Some(position) = self.state.close(&signal.instrument, proceeds) else {
            return;
        };
        let realized_pnl = proceeds - position.cost_basis;

        tracing::debug!(
            symbol = %signal.instrument,
            shares,
            price,
            proceeds,
            realized_pnl,
            "sell filled"
        );

        let fees = self.engine.costs.costs(price, shares);
        self.push_fill(signal, OrderSide::Sell, shares, price, fees, Some(realized_pnl));
    }

    fn push_fill(
        &mut self,
        signal: &Signal,
        side: OrderSide,
        shares: u64,
        price: f64,
        fees: f64,
        realized_pnl: Option<f64>,
    ) {
        self.trades.push(Fill {
            id: self.next_fill_id,
            timestamp: signal.timestamp,
            symbol: signal.instrument.clone(),
            side,
            shares,
            price,
            fees,
            realized_pnl,
        });
        self.next_fill_id += 1;
    }

    fn skip(&mut self, timestamp: DateTime<Utc>, symbol: &str, reason: SkipReason) {
        tracing::debug!(symbol, reason = reason.as_str(), %timestamp, "order skipped");
        self.skips.push(Skip {
            timestamp,
            symbol: symbol.to_string(),
            reason,
        });
    }

    fn record(&mut self, timestamp: DateTime<Utc>) {
        self.state.record(timestamp);
        self.snapshots.push(BarSnapshot {
            timestamp,
            cash: self.state.cash,
            total_value: self.state.total_value(),
            held: self.state.held_count(),
        });
    }

    fn finalize(&mut self) {
        self.state.finalize();
        let value = self.state.total_value();
        if let Some(last) = self.snapshots.last_mut() {
            last.total_value = value;
        }
    }

    fn into_result(self, strategy: &str, periods_per_year: f64) -> BacktestResult {
        let equity_history = self.state.equity_history.clone();
        let equity_curve = calculate_equity_curve(&equity_history);
        let values: Vec<f64> = equity_history.iter().map(|(_, e)| *e).collect();

        BacktestResult {
            strategy: strategy.to_string(),
            report: PerformanceReport::from_equity(&values, periods_per_year),
            trade_stats: TradeStats::from_fills(&self.trades),
            equity_history,
            equity_curve,
            trades: self.trades,
            skips: self.skips,
            snapshots: self.snapshots,
            final_state: self.state,
        }
    }
}
