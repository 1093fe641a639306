use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, TimeZone};

use crate::filter::{Calendar, TimeFilter};
use crate::models::HistoryEntry;

/// Minutes watched per calendar day. Entries without a date or a readable
/// time are skipped.
pub fn daily_minutes<Tz: TimeZone>(
    history: &[HistoryEntry],
    filter: &TimeFilter,
    cal: &Calendar<Tz>,
) -> BTreeMap<NaiveDate, f64> {
    let mut days = BTreeMap::new();
    for h in history {
        let watched = h.watched_at(cal);
        if !filter.contains(watched.as_ref(), cal) {
            continue;
        }
        let (Some(watched), Some(mins)) = (watched, h.minutes()) else {
            continue;
        };
        *days.entry(cal.day_of(&watched)).or_insert(0.0) += mins;
    }
    days
}

/// Minutes watched per `YYYY-MM` month.
pub fn monthly_minutes<Tz: TimeZone>(
    history: &[HistoryEntry],
    filter: &TimeFilter,
    cal: &Calendar<Tz>,
) -> BTreeMap<String, f64> {
    let mut months = BTreeMap::new();
    for (day, mins) in daily_minutes(history, filter, cal) {
        *months.entry(month_key(day)).or_insert(0.0) += mins;
    }
    months
}

pub fn month_key(day: NaiveDate) -> String {
    format!("{:04}-{:02}", day.year(), day.month())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn h(date: &str, time: &str) -> HistoryEntry {
        HistoryEntry {
            name: "x".into(),
            episode: "Ep 1".into(),
            time: time.into(),
            date: Some(date.into()),
        }
    }

    #[test]
    fn test_daily_and_monthly_buckets() {
        let cal = Calendar::new(Utc, Utc::now());
        let history = vec![
            h("2024-01-01T10:00:00Z", "24 min"),
            h("2024-01-01T20:00:00Z", "1:30"),
            h("2024-01-15T20:00:00Z", "45 min"),
            h("2024-02-02T20:00:00Z", "20 min"),
            h("2024-02-03T20:00:00Z", "unknown"),
            HistoryEntry { date: None, ..h("", "10 min") },
        ];

        let daily = daily_minutes(&history, &TimeFilter::All, &cal);
        assert_eq!(daily.len(), 3);
        assert_eq!(daily[&NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()], 114.0);

        let monthly = monthly_minutes(&history, &TimeFilter::All, &cal);
        assert_eq!(monthly["2024-01"], 159.0);
        assert_eq!(monthly["2024-02"], 20.0);
    }

    #[test]
    fn test_respects_filter() {
        let cal = Calendar::new(Utc, Utc::now());
        let history = vec![h("2023-12-31T10:00:00Z", "24 min"), h("2024-01-01T10:00:00Z", "24 min")];
        let daily = daily_minutes(&history, &TimeFilter::Year(2024), &cal);
        assert_eq!(daily.len(), 1);
    }
}
