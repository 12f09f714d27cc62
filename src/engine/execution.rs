use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

//order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

//represents an executed trade at the bar close
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub side: OrderSide,
    pub shares: u64,
    pub price: f64,
    pub fees: f64, //total fees (commission + slippage)

    //proceeds less the opening cost; only set on sells
    pub realized_pnl: Option<f64>,
}

impl Fill {
    //returns the notional value of the fill
    pub fn notional_value(&self) -> f64 {
        self.price * self.shares as f64
    }
}

//why a signalled buy or a bar was passed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    //not enough cash to pay for the lots plus costs
    InsufficientCash,
    //all position slots are taken
    MaxPositionsReached,
    //the allocation does not buy a single lot
    BelowMinimumLot,
    //no usable close for the instrument on this bar
    DataGap,
}

impl SkipReason {
    //stable label used in log fields and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::InsufficientCash => "insufficient_cash",
            SkipReason::MaxPositionsReached => "max_positions",
            SkipReason::BelowMinimumLot => "below_min_lot",
            SkipReason::DataGap => "data_gap",
        }
    }

    //business-rule skips, as opposed to hard constraints or missing data
    pub fn is_business_rule(&self) -> bool {
        matches!(self, SkipReason::InsufficientCash)
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skip {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub reason: SkipReason,
}

//proportional trading costs, both charged on notional
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub fee_rate: f64,
    pub slippage_rate: f64,
}

impl CostModel {
    pub fn new(fee_rate: f64, slippage_rate: f64) -> Self {
        CostModel {
            fee_rate,
            slippage_rate,
        }
    }

    fn rate(&self) -> f64 {
        self.fee_rate + self.slippage_rate
    }

    //cash debited to buy `shares` at `price`
    pub fn buy_cost(&self, price: f64, shares: u64) -> f64 {
        price * shares as f64 * (1.0 + self.rate())
    }

    //cash credited for selling `shares` at `price`
    pub fn sell_proceeds(&self, price: f64, shares: u64) -> f64 {
        price * shares as f64 * (1.0 - self.rate())
    }

    //fees plus slippage on one side of a trade
    pub fn costs(&self, price: f64, shares: u64) -> f64 {
        price * shares as f64 * self.rate()
    }
}

//largest whole number of lots the allocation pays for, in shares
pub fn lot_shares(allocation: f64, price: f64, lot_size: u64) -> u64 {
    if !(allocation > 0.0) || !(price > 0.0) || lot_size == 0 {
        return 0;
    }
    let lots = (allocation / price / lot_size as f64).floor();
    lots as u64 * lot_size
}
