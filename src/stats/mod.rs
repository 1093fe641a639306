//! Dashboard statistics.
//!
//! Everything here is a pure function of the loaded collections, the active
//! time filter and a calendar. Results are recomputed from scratch whenever
//! any input changes.

pub mod distribution;
pub mod favorites;
pub mod metrics;
pub mod ranking;
pub mod rating;
pub mod streak;
pub mod tally;
pub mod timeseries;
pub mod trend;

use std::collections::BTreeMap;

use chrono::{NaiveDate, TimeZone};
use serde::Serialize;

use crate::filter::{Calendar, TimeFilter};
use crate::models::{CatalogEntry, HistoryEntry};

pub use distribution::Distributions;
pub use metrics::SubsetMetrics;
pub use ranking::{RankedKey, Rankings};
pub use streak::StreakRecord;
pub use tally::Tally;

/// The full statistics object behind the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub filter: String,
    /// Years with at least one started entry, ascending.
    pub years: Vec<i32>,
    pub per_year: BTreeMap<i32, SubsetMetrics>,
    /// Whole catalog, ignoring the time filter.
    pub all_time: SubsetMetrics,
    /// Entries whose start date passes the time filter.
    pub filtered: SubsetMetrics,
    pub average_rating: Option<f64>,
    pub distributions: Distributions,
    pub rankings: Rankings,
    pub streak: StreakRecord,
    pub daily_minutes: BTreeMap<NaiveDate, f64>,
    pub monthly_minutes: BTreeMap<String, f64>,
}

/// Inputs that shape a dashboard computation besides the data itself.
#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub filter: TimeFilter,
    pub streak_min_minutes: f64,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            filter: TimeFilter::All,
            streak_min_minutes: streak::STREAK_MIN_MINUTES,
        }
    }
}

/// Entries whose start date passes the filter.
pub fn filter_catalog<'a, Tz: TimeZone>(
    catalog: &'a [CatalogEntry],
    filter: &TimeFilter,
    cal: &Calendar<Tz>,
) -> Vec<&'a CatalogEntry> {
    catalog
        .iter()
        .filter(|e| filter.contains(e.started_at(cal).as_ref(), cal))
        .collect()
}

/// Compute every dashboard statistic. `None` when the catalog is empty.
pub fn compute_dashboard<Tz: TimeZone>(
    catalog: &[CatalogEntry],
    history: &[HistoryEntry],
    opts: &DashboardOptions,
    cal: &Calendar<Tz>,
) -> Option<DashboardStats> {
    if catalog.is_empty() {
        log::debug!("Empty catalog, no dashboard statistics");
        return None;
    }

    let filtered = filter_catalog(catalog, &opts.filter, cal);
    log::debug!(
        "Computing dashboard for {} of {} entries ({})",
        filtered.len(),
        catalog.len(),
        opts.filter
    );

    let per_year = metrics::metrics_by_year(catalog, cal);

    Some(DashboardStats {
        filter: opts.filter.to_string(),
        years: per_year.keys().copied().collect(),
        per_year,
        all_time: metrics::compute_metrics(catalog),
        filtered: metrics::compute_metrics(filtered.iter().copied()),
        average_rating: ranking::average_rating(&filtered),
        distributions: distribution::compute_distributions(&filtered, cal),
        rankings: ranking::compute_rankings(&filtered),
        streak: streak::streaks_from_history(history, cal, opts.streak_min_minutes),
        daily_minutes: timeseries::daily_minutes(history, &opts.filter, cal),
        monthly_minutes: timeseries::monthly_minutes(history, &opts.filter, cal),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnimeType;
    use crate::parse::parse_date;
    use chrono::Utc;

    fn cal() -> Calendar<Utc> {
        Calendar::new(Utc, parse_date("2024-01-04T12:00:00Z").unwrap())
    }

    fn catalog() -> Vec<CatalogEntry> {
        vec![
            CatalogEntry {
                kind: Some(AnimeType::Tv),
                episodes: Some(12),
                rating: Some(8.0),
                studio: Some("Bones".into()),
                start_date: Some("2023-03-01".into()),
                ..CatalogEntry::new("A")
            },
            CatalogEntry {
                kind: Some(AnimeType::Movie),
                episodes: Some(1),
                episode_duration: Some(110.0),
                rating: Some(9.0),
                studio: Some("Bones".into()),
                start_date: Some("2024-01-02".into()),
                ..CatalogEntry::new("B")
            },
            CatalogEntry {
                kind: Some(AnimeType::Tv),
                episodes: Some(24),
                ..CatalogEntry::new("C (undated)")
            },
        ]
    }

    fn history() -> Vec<HistoryEntry> {
        [
            ("2024-01-01T20:00:00Z", "25 min"),
            ("2024-01-02T20:00:00Z", "30 min"),
            ("2024-01-03T20:00:00Z", "10 min"),
            ("2024-01-04T08:00:00Z", "22 min"),
        ]
        .iter()
        .map(|(date, time)| HistoryEntry {
            name: "A".into(),
            episode: "Ep 1".into(),
            time: time.to_string(),
            date: Some(date.to_string()),
        })
        .collect()
    }

    #[test]
    fn test_empty_catalog_has_no_stats() {
        assert!(compute_dashboard(&[], &history(), &DashboardOptions::default(), &cal()).is_none());
    }

    #[test]
    fn test_all_time_ignores_filter() {
        let opts = DashboardOptions {
            filter: TimeFilter::Year(2024),
            ..Default::default()
        };
        let stats = compute_dashboard(&catalog(), &history(), &opts, &cal()).unwrap();

        assert_eq!(stats.all_time.count, 3);
        assert_eq!(stats.filtered.count, 1);
        assert_eq!(stats.filtered.total_minutes, 110.0);
        assert_eq!(stats.years, vec![2023, 2024]);
        assert_eq!(stats.per_year[&2023].total_episodes, 12);
        assert_eq!(stats.average_rating, Some(9.0));
        assert_eq!(stats.filter, "2024");
    }

    #[test]
    fn test_all_mode_filtered_excludes_undated() {
        let stats =
            compute_dashboard(&catalog(), &history(), &DashboardOptions::default(), &cal()).unwrap();
        assert_eq!(stats.all_time.count, 3);
        assert_eq!(stats.filtered.count, 2);
        assert_eq!(stats.rankings.top_studios.len(), 1);
        assert_eq!(stats.rankings.top_studios[0].average, 8.5);
    }

    #[test]
    fn test_streak_and_series() {
        let stats =
            compute_dashboard(&catalog(), &history(), &DashboardOptions::default(), &cal()).unwrap();
        assert_eq!(stats.streak.longest_length, 2);
        assert_eq!(stats.streak.current_length, 1);
        assert_eq!(stats.daily_minutes.len(), 4);
        assert_eq!(stats.monthly_minutes["2024-01"], 87.0);
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let stats =
            compute_dashboard(&catalog(), &history(), &DashboardOptions::default(), &cal()).unwrap();
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["allTime"]["count"], 3);
        assert_eq!(json["streak"]["longestLength"], 2);
        assert_eq!(json["distributions"]["byType"]["TV"], 1);
    }
}
