//! Consecutive-day watching streaks.
//!
//! A day qualifies when its logged minutes reach the threshold. The scan
//! walks calendar days (in the calendar's zone) from the first logged day to
//! the later of today and the last logged day. A current streak exists only
//! if that final day or the day before it qualifies.

use std::collections::BTreeMap;

use chrono::{NaiveDate, TimeZone};
use serde::Serialize;

use crate::filter::Calendar;
use crate::models::HistoryEntry;
use crate::parse;

/// Minutes a day needs to count toward a streak.
pub const STREAK_MIN_MINUTES: f64 = 20.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakRecord {
    pub current_length: u32,
    pub longest_length: u32,
    pub current_start: Option<NaiveDate>,
    pub current_end: Option<NaiveDate>,
    pub longest_start: Option<NaiveDate>,
    pub longest_end: Option<NaiveDate>,
}

/// Day → minutes over all history. Only the `"<N> min"` time form counts
/// here.
pub fn streak_day_minutes<Tz: TimeZone>(
    history: &[HistoryEntry],
    cal: &Calendar<Tz>,
) -> BTreeMap<NaiveDate, f64> {
    let mut days = BTreeMap::new();
    for h in history {
        let (Some(watched), Some(mins)) = (h.watched_at(cal), parse::parse_minutes_strict(&h.time))
        else {
            continue;
        };
        *days.entry(cal.day_of(&watched)).or_insert(0.0) += mins;
    }
    days
}

pub fn compute_streaks(
    day_minutes: &BTreeMap<NaiveDate, f64>,
    today: NaiveDate,
    min_minutes: f64,
) -> StreakRecord {
    let (Some(&first), Some(&last_logged)) = (day_minutes.keys().next(), day_minutes.keys().next_back())
    else {
        return StreakRecord::default();
    };
    let end = last_logged.max(today);
    let qualifies = |day: NaiveDate| day_minutes.get(&day).is_some_and(|m| *m >= min_minutes);

    let mut record = StreakRecord::default();

    let mut run = 0u32;
    let mut run_start = first;
    for day in first.iter_days().take_while(|d| *d <= end) {
        if qualifies(day) {
            if run == 0 {
                run_start = day;
            }
            run += 1;
            // Strictly greater: the earliest of equally long streaks wins.
            if run > record.longest_length {
                record.longest_length = run;
                record.longest_start = Some(run_start);
                record.longest_end = Some(day);
            }
        } else {
            run = 0;
        }
    }

    let anchor = if qualifies(end) {
        Some(end)
    } else {
        end.pred_opt().filter(|d| *d >= first && qualifies(*d))
    };

    if let Some(anchor) = anchor {
        let mut start = anchor;
        let mut length = 0u32;
        let mut day = Some(anchor);
        while let Some(d) = day.filter(|d| *d >= first && qualifies(*d)) {
            length += 1;
            start = d;
            day = d.pred_opt();
        }
        record.current_length = length;
        record.current_start = Some(start);
        record.current_end = Some(anchor);
    }

    record
}

/// Streaks straight from history entries, relative to the calendar's today.
pub fn streaks_from_history<Tz: TimeZone>(
    history: &[HistoryEntry],
    cal: &Calendar<Tz>,
    min_minutes: f64,
) -> StreakRecord {
    let days = streak_day_minutes(history, cal);
    log::debug!("Streak scan over {} logged days", days.len());
    compute_streaks(&days, cal.today(), min_minutes)
}
