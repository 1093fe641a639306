use chrono::{Datelike, TimeZone};
use serde::Serialize;
use std::collections::BTreeMap;

use super::tally::Tally;
use crate::filter::Calendar;
use crate::models::{CatalogEntry, Lifecycle};

/// Studio tokens longer than this are junk from a bad paste.
pub const MAX_STUDIO_LEN: usize = 40;

/// Release years outside (MIN, MAX] are not charted.
pub const RELEASE_YEAR_MIN_EXCLUSIVE: i32 = 1980;
pub const RELEASE_YEAR_MAX: i32 = 2025;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Distributions {
    pub by_type: Tally,
    pub by_status: Tally,
    pub by_dub: Tally,
    pub by_season: Tally,
    pub by_release_year: BTreeMap<i32, u64>,
    pub by_genre: Tally,
    pub by_studio: Tally,
    pub by_theme: Tally,
}

/// Release season from a calendar month (1-based).
pub fn season_of_month(month: u32) -> &'static str {
    match month {
        1..=3 => "Winter",
        4..=6 => "Spring",
        7..=9 => "Summer",
        _ => "Fall",
    }
}

/// Collapse status variants into one label per lifecycle ("Pending S2" →
/// "Pending"); other statuses pass through trimmed.
pub fn normalize_status(status: &str) -> String {
    match Lifecycle::classify(status) {
        Some(Lifecycle::Pending) => "Pending".to_string(),
        _ => status.trim().to_string(),
    }
}

pub fn studio_tokens(entry: &CatalogEntry) -> Vec<String> {
    entry
        .studios()
        .into_iter()
        .filter(|s| s.chars().count() <= MAX_STUDIO_LEN)
        .collect()
}

pub fn compute_distributions<Tz: TimeZone>(
    entries: &[&CatalogEntry],
    cal: &Calendar<Tz>,
) -> Distributions {
    let mut d = Distributions::default();

    for e in entries {
        d.by_type.add(e.type_label());

        if let Some(status) = e.status.as_deref().filter(|s| !s.trim().is_empty()) {
            d.by_status.add(&normalize_status(status));
        }
        if let Some(dub) = e.dub {
            d.by_dub.add(dub.label());
        }

        if let Some(released) = e.released_at(cal) {
            let day = cal.day_of(&released);
            d.by_season.add(season_of_month(day.month()));
            let year = day.year();
            if year > RELEASE_YEAR_MIN_EXCLUSIVE && year <= RELEASE_YEAR_MAX {
                *d.by_release_year.entry(year).or_insert(0) += 1;
            }
        }

        for g in e.genre_list() {
            d.by_genre.add(&g);
        }
        for s in studio_tokens(e) {
            d.by_studio.add(&s);
        }
        for t in e.theme_list() {
            d.by_theme.add(&t);
        }
    }

    d
}
