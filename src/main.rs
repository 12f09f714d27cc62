use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use lotsim::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lotsim")]
#[command(about = "A multi-strategy portfolio backtesting engine for lot-traded equities", long_about = None)]
struct Cli {
    //log filter used when LOTSIM_LOG is unset (eg info, lotsim=debug)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    //run a backtest
    Run {
        //path to csv data file
        #[arg(long)]
        data: PathBuf,

        //instruments to trade, in tie-break order (defaults to every symbol in the file)
        #[arg(long, value_delimiter = ',')]
        symbols: Vec<String>,

        //strategy to run (trend, pullback, volume, composite); repeat to compare
        #[arg(long)]
        strategy: Vec<String>,

        //json configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        //aggregate daily bars into iso weeks before simulating
        #[arg(long)]
        weekly: bool,

        //position sizing (equal, score)
        #[arg(long)]
        sizing: Option<String>,

        //account overrides
        #[arg(long)]
        initial_capital: Option<f64>,

        #[arg(long)]
        fee_rate: Option<f64>,

        #[arg(long)]
        slippage_rate: Option<f64>,

        //max concurrently held instruments
        #[arg(long)]
        max_hold: Option<usize>,

        //bars per year used to annualise (defaults to 52 with --weekly, else 252)
        #[arg(long)]
        periods_per_year: Option<f64>,

        //output options
        //output path for equity curve csv
        #[arg(long)]
        output_equity_csv: Option<PathBuf>,

        //output path for trades csv
        #[arg(long)]
        output_trades_csv: Option<PathBuf>,
    },

    //print the position weight for a confidence score
    Weight {
        #[arg(long)]
        score: f64,

        //json configuration file supplying custom score bands
        #[arg(long)]
        config: Option<PathBuf>,
    },

    //write the default configuration as json
    InitConfig {
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match cli.command {
        Commands::Run {
            data,
            symbols,
            strategy,
            config,
            weekly,
            sizing,
            initial_capital,
            fee_rate,
            slippage_rate,
            max_hold,
            periods_per_year,
            output_equity_csv,
            output_trades_csv,
        } => {
            let mut cfg = load_config(config.as_deref())?;

            if let Some(mode) = sizing {
                cfg.sizing = SizingMode::parse(&mode)
                    .ok_or_else(|| anyhow::anyhow!("Unknown sizing mode: {}", mode))?;
            }
            if let Some(value) = initial_capital {
                cfg.initial_capital = value;
            }
            if let Some(value) = fee_rate {
                cfg.fee_rate = value;
            }
            if let Some(value) = slippage_rate {
                cfg.slippage_rate = value;
            }
            if let Some(value) = max_hold {
                cfg.max_hold = value;
            }
            cfg.resolve_periods_per_year(weekly, periods_per_year, config.is_some());
            if !strategy.is_empty() {
                cfg.strategies = select_strategies(&cfg, &strategy)?;
            }

            run_backtest(
                &cfg,
                &data,
                symbols,
                weekly,
                output_equity_csv.as_deref(),
                output_trades_csv.as_deref(),
            )?;
        }
        Commands::Weight { score, config } => {
            let cfg = load_config(config.as_deref())?;
            let sizer = cfg.position_sizer()?;
            let weight = sizer.position_weight(score)?;
            println!("score {:.4} -> weight {:.4} ({:.2}%)", score, weight, weight * 100.0);
        }
        Commands::InitConfig { output } => {
            BacktestConfiguration::default()
                .to_json_file(&output)
                .with_context(|| format!("Failed to write config to {:?}", output))?;
            println!("Default configuration written to {:?}", output);
        }
    }

    Ok(())
}

//LOTSIM_LOG wins over --log-level; logs go to stderr so tables stay clean on stdout
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = std::env::var("LOTSIM_LOG").unwrap_or_else(|_| log_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| anyhow::anyhow!("invalid log filter: {err}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<BacktestConfiguration> {
    match path {
        Some(path) => BacktestConfiguration::from_json_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path)),
        None => Ok(BacktestConfiguration::default()),
    }
}

//strategies named on the command line, keeping any parameters the config file gave them
fn select_strategies(cfg: &BacktestConfiguration, names: &[String]) -> Result<Vec<StrategyParams>> {
    names
        .iter()
        .map(|name| {
            let strategy_type = StrategyType::parse(name)
                .ok_or_else(|| anyhow::anyhow!("Unknown strategy: {}", name))?;
            let params = cfg
                .strategies
                .iter()
                .find(|params| params.strategy_type() == strategy_type)
                .cloned()
                .unwrap_or_else(|| StrategyParams::defaults_for(strategy_type));
            Ok(params)
        })
        .collect()
}

fn run_backtest(
    cfg: &BacktestConfiguration,
    data_path: &Path,
    mut symbols: Vec<String>,
    weekly: bool,
    output_equity_csv: Option<&Path>,
    output_trades_csv: Option<&Path>,
) -> Result<()> {
    //fail fast before touching any data
    cfg.validate().context("Invalid configuration")?;

    println!("lotsim Portfolio Backtesting Engine");
    println!("===================================\n");

    //load data
    println!("Loading data from {:?}...", data_path);
    let (all_bars, file_symbols) = load_csv_with_symbols(data_path)
        .with_context(|| format!("Failed to load data from {:?}", data_path))?;

    //without --symbols, trade everything in order of first appearance in the file
    if symbols.is_empty() {
        symbols = file_symbols;
    }

    let mut series = group_by_symbol(&all_bars, &symbols)?;
    if weekly {
        series = series
            .into_iter()
            .map(|(symbol, bars)| {
                let weeks = resample_weekly(&bars);
                (symbol, weeks)
            })
            .collect::<IndexMap<_, _>>();
    }

    for (symbol, bars) in &series {
        if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
            println!(
                "  {}: {} bars, {} to {}",
                symbol,
                bars.len(),
                first.timestamp.date_naive(),
                last.timestamp.date_naive()
            );
        }
    }

    let strategies = cfg.build_strategies()?;
    let market = MarketData::build(series, &indicators_for(&strategies))?;
    println!(
        "\n{} instruments, {} common dates\n",
        market.instrument_count(),
        market.calendar().len()
    );

    let engine = BacktestEngine::new(cfg.simulator_config(), cfg.position_sizer()?)?;

    println!("Initial capital: {:.2}", cfg.initial_capital);
    println!("Fee rate: {}  Slippage rate: {}", cfg.fee_rate, cfg.slippage_rate);
    println!("Max hold: {}  Sizing: {:?}\n", cfg.max_hold, cfg.sizing);

    //run backtest
    let results = engine.run_all(&market, &strategies);

    //display results
    for result in &results {
        println!("Strategy: {}", result.strategy);
        println!("================\n");
        result.report.pretty_print_table();
        result.trade_stats.pretty_print_table();
        println!("Confidence: {:.4}", result.confidence());

        for reason in [
            SkipReason::InsufficientCash,
            SkipReason::MaxPositionsReached,
            SkipReason::BelowMinimumLot,
            SkipReason::DataGap,
        ] {
            let count = result.skip_count(reason);
            if count > 0 {
                println!("Skipped ({}): {}", reason, count);
            }
        }
        println!();
    }

    if results.len() > 1 {
        println!("Comparison");
        println!("==========\n");
        comparison_table(
            results
                .iter()
                .map(|result| (result.strategy.as_str(), &result.report)),
        )
        .printstd();
    }

    //save outputs if requested
    if let Some(equity_path) = output_equity_csv {
        save_equity_csv(&results, equity_path)?;
        println!("\nEquity curve saved to {:?}", equity_path);
    }

    if let Some(trades_path) = output_trades_csv {
        save_trades_csv(&results, trades_path)?;
        println!("Trades saved to {:?}", trades_path);
    }

    Ok(())
}

#[derive(Serialize)]
struct EquityRow<'a> {
    strategy: &'a str,
    timestamp: String,
    equity: f64,
    drawdown: f64,
    returns: f64,
}

#[derive(Serialize)]
struct TradeRow<'a> {
    strategy: &'a str,
    id: u64,
    timestamp: String,
    symbol: &'a str,
    side: String,
    shares: u64,
    price: f64,
    fees: f64,
    realized_pnl: Option<f64>,
}

fn save_equity_csv(results: &[BacktestResult], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;

    for result in results {
        for point in &result.equity_curve {
            writer.serialize(EquityRow {
                strategy: &result.strategy,
                timestamp: point.timestamp.to_rfc3339(),
                equity: point.equity,
                drawdown: point.drawdown,
                returns: point.returns,
            })?;
        }
    }

    writer.flush()?;
    Ok(())
}

fn save_trades_csv(results: &[BacktestResult], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;

    for result in results {
        for trade in &result.trades {
            writer.serialize(TradeRow {
                strategy: &result.strategy,
                id: trade.id,
                timestamp: trade.timestamp.to_rfc3339(),
                symbol: &trade.symbol,
                side: trade.side.to_string(),
                shares: trade.shares,
                price: trade.price,
                fees: trade.fees,
                realized_pnl: trade.realized_pnl,
            })?;
        }
    }

    writer.flush()?;
    Ok(())
}
