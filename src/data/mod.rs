pub mod bar;
pub mod loader;
pub mod market;
pub mod resample;

pub use bar::{Bar, BarError};
pub use loader::{
    filter_by_symbol, group_by_symbol, load_csv, load_csv_with_symbols, parse_timestamp,
};
pub use market::{InstrumentHistory, MarketData};
pub use resample::resample_weekly;
