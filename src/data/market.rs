use crate::data::bar::Bar;
use crate::error::{EngineError, EngineResult};
use crate::indicator::{IndicatorSet, IndicatorSpec};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};

//one instrument's full bar history with its derived indicators
#[derive(Debug, Clone)]
pub struct InstrumentHistory {
    pub symbol: String,
    pub bars: Vec<Bar>,
    pub indicators: IndicatorSet,
    index_by_time: HashMap<DateTime<Utc>, usize>,
}

impl InstrumentHistory {
    //bars must already be in ascending timestamp order
    pub fn new(symbol: String, bars: Vec<Bar>, specs: &[IndicatorSpec]) -> Self {
        let indicators = IndicatorSet::compute(&bars, specs);
        let index_by_time = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.timestamp, i))
            .collect();

        InstrumentHistory {
            symbol,
            bars,
            indicators,
            index_by_time,
        }
    }

    //position of the bar stamped `timestamp` in this instrument's own history
    pub fn index_at(&self, timestamp: &DateTime<Utc>) -> Option<usize> {
        self.index_by_time.get(timestamp).copied()
    }

    pub fn bar(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn indicator(&self, name: &str, index: usize) -> Option<f64> {
        self.indicators.value(name, index)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

//the aligned simulation input: every instrument plus the common trading calendar
#[derive(Debug, Clone)]
pub struct MarketData {
    instruments: IndexMap<String, InstrumentHistory>,
    calendar: Vec<DateTime<Utc>>,
}

impl MarketData {
    //indicators are computed per instrument in parallel, then joined back in
    //the caller's instrument order; the calendar keeps only the timestamps
    //every instrument has a bar for
    pub fn build(
        series: IndexMap<String, Vec<Bar>>,
        specs: &[IndicatorSpec],
    ) -> EngineResult<Self> {
        if series.is_empty() {
            return Err(EngineError::NoInstruments);
        }

        if let Some((symbol, _)) = series.iter().find(|(_, bars)| bars.is_empty()) {
            return Err(EngineError::MissingInstrument(symbol.clone()));
        }

        let histories: Vec<InstrumentHistory> = series
            .into_iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|(symbol, bars)| InstrumentHistory::new(symbol, bars, specs))
            .collect();

        let calendar = common_calendar(&histories);
        if calendar.is_empty() {
            return Err(EngineError::NoCommonDates);
        }

        let instruments = histories
            .into_iter()
            .map(|history| (history.symbol.clone(), history))
            .collect();

        tracing::debug!(dates = calendar.len(), "aligned trading calendar");

        Ok(MarketData {
            instruments,
            calendar,
        })
    }

    pub fn calendar(&self) -> &[DateTime<Utc>] {
        &self.calendar
    }

    pub fn instruments(&self) -> impl Iterator<Item = &InstrumentHistory> {
        self.instruments.values()
    }

    pub fn instrument(&self, symbol: &str) -> Option<&InstrumentHistory> {
        self.instruments.get(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.instruments.keys().map(String::as_str)
    }

    pub fn instrument_count(&self) -> usize {
        self.instruments.len()
    }
}

//intersection of all instruments' timestamps, ascending
fn common_calendar(histories: &[InstrumentHistory]) -> Vec<DateTime<Utc>> {
    let mut iter = histories.iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };

    let mut common: BTreeSet<DateTime<Utc>> = first.bars.iter().map(|b| b.timestamp).collect();
    for history in iter {
        common.retain(|ts| history.index_by_time.contains_key(ts));
    }

    common.into_iter().collect()
}
