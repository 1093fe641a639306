use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::Calendar;
use crate::parse::{self, opt_f64, opt_rating, opt_u32};

/// Episode length assumed when a catalog entry doesn't say.
pub const DEFAULT_EPISODE_MINUTES: f64 = 24.0;

/// Broadcast format of a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimeType {
    #[serde(rename = "TV")]
    Tv,
    Movie,
    #[serde(rename = "OVA")]
    Ova,
    #[serde(rename = "ONA")]
    Ona,
    Special,
    #[serde(rename = "TV-Special", alias = "TV Special")]
    TvSpecial,
    #[serde(other)]
    Other,
}

impl AnimeType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Tv => "TV",
            Self::Movie => "Movie",
            Self::Ova => "OVA",
            Self::Ona => "ONA",
            Self::Special => "Special",
            Self::TvSpecial => "TV-Special",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for AnimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Audio track availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DubStatus {
    Sub,
    Dub,
    Both,
    #[serde(other)]
    Unknown,
}

impl DubStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sub => "Sub",
            Self::Dub => "Dub",
            Self::Both => "Both",
            Self::Unknown => "Unknown",
        }
    }
}

/// Airing lifecycle, classified from the free-text status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Pending,
    Airing,
    Finished,
}

impl Lifecycle {
    /// Status strings often carry a suffix ("Pending S2", "Airing (ep 5)").
    pub fn classify(status: &str) -> Option<Self> {
        let s = status.trim().to_lowercase();
        if s.starts_with("pending") {
            Some(Self::Pending)
        } else if s.starts_with("airing") {
            Some(Self::Airing)
        } else if s.starts_with("finished") {
            Some(Self::Finished)
        } else {
            None
        }
    }
}

/// One watched or tracked title.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    #[serde(default, deserialize_with = "opt_u32", skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AnimeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub studio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub themes: Option<String>,
    #[serde(default, deserialize_with = "opt_u32", skip_serializing_if = "Option::is_none")]
    pub episodes: Option<u32>,
    #[serde(
        default,
        alias = "episode_duration",
        deserialize_with = "opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub episode_duration: Option<f64>,
    #[serde(default, deserialize_with = "opt_rating", skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, alias = "release_date", skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, alias = "start_date", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, alias = "end_date", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(
        default,
        alias = "rewatch_count",
        deserialize_with = "opt_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub rewatch_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dub: Option<DubStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        default,
        alias = "total_time",
        deserialize_with = "opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_time: Option<f64>,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn episode_count(&self) -> u32 {
        self.episodes.unwrap_or(0)
    }

    pub fn rewatches(&self) -> u32 {
        self.rewatch_count.unwrap_or(0)
    }

    pub fn duration_minutes(&self) -> f64 {
        self.episode_duration.unwrap_or(DEFAULT_EPISODE_MINUTES)
    }

    /// Episodes watched including rewatches.
    pub fn watched_episodes(&self) -> u64 {
        self.episode_count() as u64 * (1 + self.rewatches() as u64)
    }

    /// Minutes watched: the stored total when present, otherwise recomputed.
    pub fn watched_minutes(&self) -> f64 {
        self.total_time
            .unwrap_or_else(|| self.watched_episodes() as f64 * self.duration_minutes())
    }

    pub fn type_label(&self) -> &'static str {
        self.kind.map(|k| k.label()).unwrap_or("Unknown")
    }

    pub fn started_at<Tz: TimeZone>(&self, cal: &Calendar<Tz>) -> Option<DateTime<Utc>> {
        self.start_date.as_deref().and_then(|d| cal.instant_of(d))
    }

    pub fn released_at<Tz: TimeZone>(&self, cal: &Calendar<Tz>) -> Option<DateTime<Utc>> {
        self.release_date.as_deref().and_then(|d| cal.instant_of(d))
    }

    pub fn lifecycle(&self) -> Option<Lifecycle> {
        self.status.as_deref().and_then(Lifecycle::classify)
    }

    pub fn studios(&self) -> Vec<String> {
        self.studio.as_deref().map(parse::split_multi).unwrap_or_default()
    }

    pub fn genre_list(&self) -> Vec<String> {
        self.genres.as_deref().map(parse::split_multi).unwrap_or_default()
    }

    pub fn theme_list(&self) -> Vec<String> {
        self.themes.as_deref().map(parse::split_multi).unwrap_or_default()
    }

    /// Portion of the name used to associate history sessions: text before
    /// the first comma, lowercased.
    pub fn match_key(&self) -> String {
        self.name
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase()
    }
}

/// One watching session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub name: String,
    #[serde(default)]
    pub episode: String,
    #[serde(default)]
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl HistoryEntry {
    pub fn watched_at<Tz: TimeZone>(&self, cal: &Calendar<Tz>) -> Option<DateTime<Utc>> {
        self.date.as_deref().and_then(|d| cal.instant_of(d))
    }

    /// Minutes from either "<N> min" or "H:MM".
    pub fn minutes(&self) -> Option<f64> {
        parse::parse_elapsed_minutes(&self.time)
    }

    pub fn episode_count(&self) -> u32 {
        parse::parse_episode_count(&self.episode)
    }

    /// The loose association used by the history views: the session name
    /// contains the catalog entry's match key.
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        let key = entry.match_key();
        !key.is_empty() && self.name.to_lowercase().contains(&key)
    }
}

/// Per-category scores for one title.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryRating {
    pub name: String,
    #[serde(default, deserialize_with = "parse::rating_map")]
    pub categories: BTreeMap<String, f64>,
}

/// Per-episode score sequence for one title.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EpisodeRating {
    pub name: String,
    #[serde(default, deserialize_with = "parse::rating_list")]
    pub ratings: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SongKind {
    Opening,
    Ending,
    #[serde(alias = "OST")]
    Soundtrack,
    #[serde(other)]
    Other,
}

impl SongKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Opening => "Opening",
            Self::Ending => "Ending",
            Self::Soundtrack => "Soundtrack",
            Self::Other => "Other",
        }
    }
}

/// A favorite opening, ending or soundtrack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteSong {
    pub kind: SongKind,
    #[serde(default)]
    pub anime: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, deserialize_with = "opt_rating", skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<f64>,
    #[serde(default, deserialize_with = "opt_rating", skip_serializing_if = "Option::is_none")]
    pub emotion: Option<f64>,
    #[serde(default, deserialize_with = "opt_rating", skip_serializing_if = "Option::is_none")]
    pub melody: Option<f64>,
    #[serde(default, deserialize_with = "opt_rating", skip_serializing_if = "Option::is_none")]
    pub video: Option<f64>,
    #[serde(default, deserialize_with = "opt_rating", skip_serializing_if = "Option::is_none")]
    pub voice: Option<f64>,
    #[serde(
        default,
        alias = "final_rating",
        deserialize_with = "opt_rating",
        skip_serializing_if = "Option::is_none"
    )]
    pub final_rating: Option<f64>,
    #[serde(default)]
    pub frisson: bool,
}

impl FavoriteSong {
    /// Mean of the sub-ratings that are present.
    pub fn average(&self) -> Option<f64> {
        let present: Vec<f64> = [self.lyrics, self.emotion, self.melody, self.video, self.voice]
            .into_iter()
            .flatten()
            .collect();
        if present.is_empty() {
            None
        } else {
            Some(parse::round2(present.iter().sum::<f64>() / present.len() as f64))
        }
    }

    pub fn final_score(&self) -> Option<f64> {
        self.final_rating.or_else(|| self.average())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStatus {
    Airing,
    Released,
    #[serde(other)]
    Other,
}

/// A queued-to-watch title.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanEntry {
    pub name: String,
    #[serde(default, deserialize_with = "opt_f64", skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,
    #[serde(default, deserialize_with = "opt_u32", skip_serializing_if = "Option::is_none")]
    pub episodes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PlanStatus>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Note {
    pub name: String,
    #[serde(default)]
    pub text: String,
}

/// One overridden table row: a label (usually a year, or "All") and
/// display strings per column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OverrideRow {
    pub label: String,
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

/// Hand-maintained display values that replace computed ones.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatsOverrides {
    #[serde(default)]
    pub rows: Vec<OverrideRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commentary: Option<String>,
}

impl StatsOverrides {
    pub fn cell(&self, row: &str, column: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.label.eq_ignore_ascii_case(row))
            .and_then(|r| r.values.get(column))
            .map(String::as_str)
    }

    /// The override for (row, column) if one exists, otherwise the computed value.
    pub fn display_or(&self, row: &str, column: &str, computed: impl fmt::Display) -> String {
        match self.cell(row, column) {
            Some(v) => v.to_string(),
            None => computed.to_string(),
        }
    }
}

/// Server-side metadata used for cache invalidation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default, alias = "last_updated")]
    pub last_updated: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_entry_lenient_fields() {
        let e: CatalogEntry = serde_json::from_str(
            r#"{
                "name": "Mushishi",
                "type": "TV",
                "episodes": "26",
                "episodeDuration": "bad",
                "rating": 9.5,
                "rewatchCount": 1,
                "dub": "Sub",
                "status": "Finished"
            }"#,
        )
        .unwrap();

        assert_eq!(e.kind, Some(AnimeType::Tv));
        assert_eq!(e.episodes, Some(26));
        assert_eq!(e.episode_duration, None);
        assert_eq!(e.duration_minutes(), DEFAULT_EPISODE_MINUTES);
        assert_eq!(e.watched_episodes(), 52);
        assert_eq!(e.watched_minutes(), 52.0 * 24.0);
        assert_eq!(e.lifecycle(), Some(Lifecycle::Finished));
    }

    #[test]
    fn test_index_and_category_scores_are_lenient() {
        let e: CatalogEntry = serde_json::from_str(r#"{"index": "7", "name": "x"}"#).unwrap();
        assert_eq!(e.index, Some(7));
        let e: CatalogEntry = serde_json::from_str(r#"{"index": 3.0, "name": "x"}"#).unwrap();
        assert_eq!(e.index, Some(3));

        let r: CategoryRating = serde_json::from_str(
            r#"{"name": "x", "categories": {"Plot": 8, "Pacing": "7", "Art": "n/a"}}"#,
        )
        .unwrap();
        assert_eq!(r.categories.len(), 2);
        assert_eq!(r.categories["Pacing"], 7.0);
    }

    #[test]
    fn test_total_time_preferred() {
        let e = CatalogEntry {
            episodes: Some(12),
            total_time: Some(100.0),
            ..CatalogEntry::new("x")
        };
        assert_eq!(e.watched_minutes(), 100.0);
    }

    #[test]
    fn test_unknown_enum_values() {
        let e: CatalogEntry =
            serde_json::from_str(r#"{"name": "x", "type": "Music", "dub": "Raw"}"#).unwrap();
        assert_eq!(e.kind, Some(AnimeType::Other));
        assert_eq!(e.dub, Some(DubStatus::Unknown));
    }

    #[test]
    fn test_match_key_and_history_matching() {
        let entry = CatalogEntry::new("Monogatari, Second Season");
        assert_eq!(entry.match_key(), "monogatari");

        let h = HistoryEntry {
            name: "Monogatari Series: Second Season".into(),
            ..Default::default()
        };
        assert!(h.matches(&entry));

        // The heuristic also matches longer titles that contain the key
        let other = CatalogEntry::new("Gatari");
        assert!(h.matches(&other));
    }

    #[test]
    fn test_favorite_song_scores() {
        let s: FavoriteSong = serde_json::from_str(
            r#"{"kind": "Opening", "title": "Gurenge", "lyrics": 8, "melody": 9, "voice": "x"}"#,
        )
        .unwrap();
        assert_eq!(s.average(), Some(8.5));
        assert_eq!(s.final_score(), Some(8.5));
        assert!(!s.frisson);
    }

    #[test]
    fn test_overrides_fallback() {
        let o: StatsOverrides = serde_json::from_str(
            r#"{"rows": [{"label": "2023", "values": {"minutes": "~9000"}}]}"#,
        )
        .unwrap();
        assert_eq!(o.display_or("2023", "minutes", 8000), "~9000");
        assert_eq!(o.display_or("2023", "count", 42), "42");
        assert_eq!(o.display_or("2022", "minutes", 1), "1");
    }

    #[test]
    fn test_episode_rating_list_keeps_positions() {
        let r: EpisodeRating =
            serde_json::from_str(r#"{"name": "x", "ratings": [8, "?", 7.5]}"#).unwrap();
        assert_eq!(r.ratings, vec![Some(8.0), None, Some(7.5)]);
    }
}
