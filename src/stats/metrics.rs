use std::collections::BTreeMap;

use chrono::TimeZone;
use serde::Serialize;

use super::tally::Tally;
use crate::filter::Calendar;
use crate::models::CatalogEntry;

/// Totals for any subset of the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsetMetrics {
    pub count: usize,
    /// Episodes including rewatches.
    pub total_episodes: u64,
    pub total_minutes: f64,
    pub rewatch_count: u64,
    /// Minutes per watched episode; 0 when nothing was watched.
    pub avg_episode_duration: f64,
    pub type_breakdown: Tally,
}

impl SubsetMetrics {
    pub fn total_hours(&self) -> f64 {
        self.total_minutes / 60.0
    }
}

/// The one formula set used for per-year, all-time and filtered metrics.
pub fn compute_metrics<'a, I>(entries: I) -> SubsetMetrics
where
    I: IntoIterator<Item = &'a CatalogEntry>,
{
    let mut m = SubsetMetrics::default();
    for e in entries {
        m.count += 1;
        m.total_episodes += e.watched_episodes();
        m.total_minutes += e.watched_minutes();
        m.rewatch_count += e.rewatches() as u64;
        m.type_breakdown.add(e.type_label());
    }
    if m.total_episodes > 0 {
        m.avg_episode_duration = m.total_minutes / m.total_episodes as f64;
    }
    m
}

/// Group entries by the calendar year they were started in. Undated
/// entries are left out.
pub fn group_by_year<'a, Tz: TimeZone>(
    entries: &'a [CatalogEntry],
    cal: &Calendar<Tz>,
) -> BTreeMap<i32, Vec<&'a CatalogEntry>> {
    let mut by_year: BTreeMap<i32, Vec<&CatalogEntry>> = BTreeMap::new();
    for e in entries {
        if let Some(started) = e.started_at(cal) {
            by_year.entry(cal.year_of(&started)).or_default().push(e);
        }
    }
    by_year
}

/// Metrics for every detected year, ascending.
pub fn metrics_by_year<Tz: TimeZone>(
    entries: &[CatalogEntry],
    cal: &Calendar<Tz>,
) -> BTreeMap<i32, SubsetMetrics> {
    group_by_year(entries, cal)
        .into_iter()
        .map(|(year, group)| (year, compute_metrics(group)))
        .collect()
}
