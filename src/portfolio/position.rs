use serde::{Deserialize, Serialize};

//an open long equity position; only exists while shares > 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,

    //whole shares, always a multiple of the lot size
    pub shares: u64,

    //fill price of the opening buy
    pub entry_price: f64,

    //cash paid to open, fees and slippage included
    pub cost_basis: f64,
}

impl Position {
    pub fn open(symbol: String, shares: u64, entry_price: f64, cost_basis: f64) -> Self {
        Position {
            symbol,
            shares,
            entry_price,
            cost_basis,
        }
    }

    //value of the shares at `price`
    pub fn market_value(&self, price: f64) -> f64 {
        self.shares as f64 * price
    }

    //gain against the entry price, ignoring costs
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.shares as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_shares_at_price() {
        let position = Position::open("600519".into(), 300, 10.0, 3001.5);
        assert_eq!(position.market_value(12.0), 3600.0);
        assert_eq!(position.unrealized_pnl(9.0), -300.0);
    }
}
