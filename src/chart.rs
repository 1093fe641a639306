//! Chart inputs: dashboard statistics turned into `{labels, datasets}`
//! plus display options taken from the chart's saved preference.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::parse::round2;
use crate::stats::ranking::{RankedKey, TOP_N};
use crate::stats::{DashboardStats, Tally};

pub const DEFAULT_PALETTE: &str = "default";

/// Named colour lists. Unknown names resolve to the first.
pub const PALETTES: [(&str, &[&str]); 5] = [
    (
        "default",
        &["#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948", "#b07aa1", "#ff9da7", "#9c755f", "#bab0ac"],
    ),
    (
        "pastel",
        &["#a1c9f4", "#ffb482", "#8de5a1", "#ff9f9b", "#d0bbff", "#debb9b", "#fab0e4", "#cfcfcf"],
    ),
    (
        "vivid",
        &["#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6"],
    ),
    (
        "ocean",
        &["#03045e", "#023e8a", "#0077b6", "#0096c7", "#00b4d8", "#48cae4", "#90e0ef", "#ade8f4"],
    ),
    (
        "sunset",
        &["#ff7b00", "#ff8800", "#ff9500", "#ffa200", "#ffaa00", "#ffb700", "#ffc300", "#ffd000"],
    ),
];

pub fn palette(name: &str) -> &'static [&'static str] {
    PALETTES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, colors)| *colors)
        .unwrap_or_else(|| {
            log::debug!("Unknown palette '{name}', using {DEFAULT_PALETTE}");
            PALETTES[0].1
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl ChartSize {
    /// Render height in pixels.
    pub fn height(&self) -> u32 {
        match self {
            Self::Small => 200,
            Self::Medium => 300,
            Self::Large => 450,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendPosition {
    #[default]
    Top,
    Bottom,
    Left,
    Right,
    Hidden,
}

/// Per-chart display settings. Every field falls back to its default when
/// missing from the stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChartPreference {
    pub size: ChartSize,
    pub palette: String,
    pub legend: LegendPosition,
    pub show_grid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Default for ChartPreference {
    fn default() -> Self {
        Self {
            size: ChartSize::default(),
            palette: DEFAULT_PALETTE.to_string(),
            legend: LegendPosition::default(),
            show_grid: true,
            y_min: None,
            y_max: None,
            title: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartKind {
    Bar,
    HorizontalBar,
    Line,
    Pie,
    Doughnut,
}

impl ChartKind {
    /// Categorical charts colour each label; the others colour each dataset.
    fn per_label_colors(&self) -> bool {
        matches!(self, Self::Pie | Self::Doughnut | Self::HorizontalBar)
    }
}

/// Every dashboard chart, in default layout order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartId {
    YearlyHours,
    YearlyEpisodes,
    TypeBreakdown,
    StatusBreakdown,
    DubBreakdown,
    SeasonBreakdown,
    ReleaseYears,
    GenreCounts,
    StudioCounts,
    ThemeCounts,
    TopStudios,
    TopGenres,
    TopThemes,
    RatingByType,
    DailyMinutes,
    MonthlyMinutes,
}

impl ChartId {
    pub const ALL: [ChartId; 16] = [
        Self::YearlyHours,
        Self::YearlyEpisodes,
        Self::TypeBreakdown,
        Self::StatusBreakdown,
        Self::DubBreakdown,
        Self::SeasonBreakdown,
        Self::ReleaseYears,
        Self::GenreCounts,
        Self::StudioCounts,
        Self::ThemeCounts,
        Self::TopStudios,
        Self::TopGenres,
        Self::TopThemes,
        Self::RatingByType,
        Self::DailyMinutes,
        Self::MonthlyMinutes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::YearlyHours => "yearly-hours",
            Self::YearlyEpisodes => "yearly-episodes",
            Self::TypeBreakdown => "type-breakdown",
            Self::StatusBreakdown => "status-breakdown",
            Self::DubBreakdown => "dub-breakdown",
            Self::SeasonBreakdown => "season-breakdown",
            Self::ReleaseYears => "release-years",
            Self::GenreCounts => "genre-counts",
            Self::StudioCounts => "studio-counts",
            Self::ThemeCounts => "theme-counts",
            Self::TopStudios => "top-studios",
            Self::TopGenres => "top-genres",
            Self::TopThemes => "top-themes",
            Self::RatingByType => "rating-by-type",
            Self::DailyMinutes => "daily-minutes",
            Self::MonthlyMinutes => "monthly-minutes",
        }
    }

    pub fn kind(&self) -> ChartKind {
        match self {
            Self::TypeBreakdown | Self::DubBreakdown => ChartKind::Pie,
            Self::StatusBreakdown => ChartKind::Doughnut,
            Self::GenreCounts
            | Self::StudioCounts
            | Self::ThemeCounts
            | Self::TopStudios
            | Self::TopGenres
            | Self::TopThemes => ChartKind::HorizontalBar,
            Self::DailyMinutes => ChartKind::Line,
            _ => ChartKind::Bar,
        }
    }

    pub fn default_title(&self) -> &'static str {
        match self {
            Self::YearlyHours => "Hours watched per year",
            Self::YearlyEpisodes => "Episodes watched per year",
            Self::TypeBreakdown => "By type",
            Self::StatusBreakdown => "By status",
            Self::DubBreakdown => "Sub / dub",
            Self::SeasonBreakdown => "By release season",
            Self::ReleaseYears => "By release year",
            Self::GenreCounts => "Most watched genres",
            Self::StudioCounts => "Most watched studios",
            Self::ThemeCounts => "Most watched themes",
            Self::TopStudios => "Top rated studios",
            Self::TopGenres => "Top rated genres",
            Self::TopThemes => "Top rated themes",
            Self::RatingByType => "Average rating by type",
            Self::DailyMinutes => "Minutes per day",
            Self::MonthlyMinutes => "Minutes per month",
        }
    }
}

impl fmt::Display for ChartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown chart '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
    pub colors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    pub height: u32,
    pub legend: LegendPosition,
    pub show_grid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_max: Option<f64>,
}

/// Plain chart input for an external renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub id: ChartId,
    pub kind: ChartKind,
    pub title: String,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    pub options: ChartOptions,
}

impl Chart {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

pub fn build_chart(id: ChartId, stats: &DashboardStats, pref: &ChartPreference) -> Chart {
    let (series, labels, data) = chart_series(id, stats);
    let kind = id.kind();
    let colors = palette(&pref.palette);
    let colors: Vec<String> = if kind.per_label_colors() {
        (0..labels.len())
            .map(|i| colors[i % colors.len()].to_string())
            .collect()
    } else {
        vec![colors[0].to_string()]
    };

    Chart {
        id,
        kind,
        title: pref
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| id.default_title().to_string()),
        labels,
        datasets: vec![Dataset {
            label: series.to_string(),
            data,
            colors,
        }],
        options: ChartOptions {
            height: pref.size.height(),
            legend: pref.legend,
            show_grid: pref.show_grid,
            y_min: pref.y_min,
            y_max: pref.y_max,
        },
    }
}

/// (series label, x labels, values) for one chart.
fn chart_series(id: ChartId, stats: &DashboardStats) -> (&'static str, Vec<String>, Vec<f64>) {
    let d = &stats.distributions;
    let r = &stats.rankings;
    match id {
        ChartId::YearlyHours => (
            "Hours",
            stats.per_year.keys().map(i32::to_string).collect(),
            stats.per_year.values().map(|m| round2(m.total_hours())).collect(),
        ),
        ChartId::YearlyEpisodes => (
            "Episodes",
            stats.per_year.keys().map(i32::to_string).collect(),
            stats.per_year.values().map(|m| m.total_episodes as f64).collect(),
        ),
        ChartId::TypeBreakdown => tally_series("Titles", &d.by_type, None),
        ChartId::StatusBreakdown => tally_series("Titles", &d.by_status, None),
        ChartId::DubBreakdown => tally_series("Titles", &d.by_dub, None),
        ChartId::SeasonBreakdown => tally_series("Titles", &d.by_season, None),
        ChartId::ReleaseYears => (
            "Titles",
            d.by_release_year.keys().map(i32::to_string).collect(),
            d.by_release_year.values().map(|n| *n as f64).collect(),
        ),
        ChartId::GenreCounts => tally_series("Titles", &d.by_genre, Some(TOP_N)),
        ChartId::StudioCounts => tally_series("Titles", &d.by_studio, Some(TOP_N)),
        ChartId::ThemeCounts => tally_series("Titles", &d.by_theme, Some(TOP_N)),
        ChartId::TopStudios => ranked_series(&r.top_studios),
        ChartId::TopGenres => ranked_series(&r.top_genres),
        ChartId::TopThemes => ranked_series(&r.top_themes),
        ChartId::RatingByType => ranked_series(&r.rating_by_type),
        ChartId::DailyMinutes => (
            "Minutes",
            stats.daily_minutes.keys().map(|day| day.format("%Y-%m-%d").to_string()).collect(),
            stats.daily_minutes.values().copied().collect(),
        ),
        ChartId::MonthlyMinutes => (
            "Minutes",
            stats.monthly_minutes.keys().cloned().collect(),
            stats.monthly_minutes.values().copied().collect(),
        ),
    }
}

/// Tallies are charted most-frequent first.
fn tally_series(
    series: &'static str,
    tally: &Tally,
    limit: Option<usize>,
) -> (&'static str, Vec<String>, Vec<f64>) {
    let mut rows = tally.by_count();
    if let Some(n) = limit {
        rows.truncate(n);
    }
    let (labels, data) = rows.into_iter().map(|(k, n)| (k, n as f64)).unzip();
    (series, labels, data)
}

fn ranked_series(ranked: &[RankedKey]) -> (&'static str, Vec<String>, Vec<f64>) {
    (
        "Average rating",
        ranked.iter().map(|k| k.key.clone()).collect(),
        ranked.iter().map(|k| k.average).collect(),
    )
}
