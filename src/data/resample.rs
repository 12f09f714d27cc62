use crate::data::bar::Bar;
use chrono::{DateTime, Datelike, IsoWeek, NaiveDate, TimeZone, Utc, Weekday};

//friday 00:00 utc of the iso week, shared by every instrument trading that week
fn week_stamp(iso: IsoWeek, fallback: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::from_isoywd_opt(iso.year(), iso.week(), Weekday::Fri)
        .and_then(|friday| friday.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .unwrap_or(fallback)
}

//aggregates one instrument's daily bars into iso-week bars
//open of the first day, extreme high/low, close of the last day, summed volume;
//the weekly bar is stamped with the week's friday so calendars line up across instruments
pub fn resample_weekly(bars: &[Bar]) -> Vec<Bar> {
    let mut weeks: Vec<Bar> = Vec::new();
    let mut current_week = None;

    for bar in bars {
        let iso = bar.timestamp.iso_week();
        let key = (iso.year(), iso.week());

        match weeks.last_mut() {
            Some(week) if current_week == Some(key) => {
                week.high = week.high.max(bar.high);
                week.low = week.low.min(bar.low);
                week.close = bar.close;
                week.volume += bar.volume;
            }
            _ => {
                let mut week = bar.clone();
                week.timestamp = week_stamp(iso, bar.timestamp);
                weeks.push(week);
                current_week = Some(key);
            }
        }
    }

    weeks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_timestamp;
    use crate::data::MarketData;
    use indexmap::IndexMap;

    fn day(date: &str, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar::new_unchecked(parse_timestamp(date).unwrap(), open, high, low, close, 100.0, "X".into())
    }

    #[test]
    fn folds_days_into_weeks() {
        //mon 2024-01-01 .. wed 2024-01-03, then mon 2024-01-08
        let bars = vec![
            day("2024-01-01", 10.0, 11.0, 9.5, 10.5),
            day("2024-01-02", 10.5, 12.0, 10.0, 11.5),
            day("2024-01-03", 11.5, 11.8, 9.0, 9.2),
            day("2024-01-08", 9.2, 9.9, 9.1, 9.8),
        ];

        let weeks = resample_weekly(&bars);
        assert_eq!(weeks.len(), 2);

        let first = &weeks[0];
        assert_eq!(first.open, 10.0);
        assert_eq!(first.high, 12.0);
        assert_eq!(first.low, 9.0);
        assert_eq!(first.close, 9.2);
        assert_eq!(first.volume, 300.0);
        assert_eq!(first.timestamp, parse_timestamp("2024-01-05").unwrap());

        assert_eq!(weeks[1].close, 9.8);
        assert_eq!(weeks[1].timestamp, parse_timestamp("2024-01-12").unwrap());
    }

    #[test]
    fn missing_friday_keeps_the_shared_week_stamp() {
        let full = vec![
            day("2024-01-04", 10.0, 10.0, 10.0, 10.0),
            day("2024-01-05", 10.0, 10.0, 10.0, 10.0),
            day("2024-01-11", 10.0, 10.0, 10.0, 10.0),
            day("2024-01-12", 10.0, 10.0, 10.0, 10.0),
        ];
        let short: Vec<Bar> = full
            .iter()
            .filter(|bar| bar.timestamp != parse_timestamp("2024-01-05").unwrap())
            .cloned()
            .map(|mut bar| {
                bar.symbol = "Y".into();
                bar
            })
            .collect();

        let a = resample_weekly(&full);
        let b = resample_weekly(&short);
        let stamps = |weeks: &[Bar]| weeks.iter().map(|w| w.timestamp).collect::<Vec<_>>();
        assert_eq!(stamps(&a), stamps(&b));

        let series: IndexMap<String, Vec<Bar>> =
            [("X".to_string(), a), ("Y".to_string(), b)].into_iter().collect();
        let market = MarketData::build(series, &[]).unwrap();
        assert_eq!(market.calendar().len(), 2);
    }

    #[test]
    fn weeks_spanning_new_year_use_the_iso_year() {
        //mon 2024-12-30 belongs to iso week 2025-w01, whose friday is 2025-01-03
        let weeks = resample_weekly(&[
            day("2024-12-30", 1.0, 1.0, 1.0, 1.0),
            day("2025-01-02", 2.0, 2.0, 2.0, 2.0),
        ]);
        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[0].timestamp, parse_timestamp("2025-01-03").unwrap());
        assert_eq!(weeks[0].close, 2.0);
    }

    #[test]
    fn empty_input_gives_no_weeks() {
        assert!(resample_weekly(&[]).is_empty());
    }
}
