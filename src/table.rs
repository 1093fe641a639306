//! Filtered and sorted views over the raw collections.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{NaiveDate, TimeZone};

use crate::filter::{Calendar, TimeFilter};
use crate::models::{CatalogEntry, FavoriteSong, HistoryEntry, PlanEntry, SongKind};
use crate::stats::distribution::normalize_status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    Name,
    Rating,
    Episodes,
    Type,
    StartDate,
    Minutes,
}

impl FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" | "title" => Ok(Self::Name),
            "rating" => Ok(Self::Rating),
            "episodes" | "eps" => Ok(Self::Episodes),
            "type" => Ok(Self::Type),
            "start" | "start-date" | "started" => Ok(Self::StartDate),
            "minutes" | "time" => Ok(Self::Minutes),
            _ => Err(format!("unknown sort column '{s}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// What the catalog table shows.
#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    /// Case-insensitive substring of the name.
    pub search: Option<String>,
    /// Compared after status normalisation.
    pub status: Option<String>,
    /// `All` keeps undated entries; other modes need a start date in range.
    pub filter: TimeFilter,
    pub sort: SortColumn,
    pub order: SortOrder,
}

pub fn catalog_rows<'a, Tz: TimeZone>(
    catalog: &'a [CatalogEntry],
    query: &CatalogQuery,
    cal: &Calendar<Tz>,
) -> Vec<&'a CatalogEntry> {
    let needle = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let status = query
        .status
        .as_deref()
        .map(normalize_status)
        .filter(|s| !s.is_empty());

    let mut rows: Vec<&CatalogEntry> = catalog
        .iter()
        .filter(|e| match &needle {
            Some(n) => e.name.to_lowercase().contains(n),
            None => true,
        })
        .filter(|e| match &status {
            Some(s) => e
                .status
                .as_deref()
                .is_some_and(|st| normalize_status(st).eq_ignore_ascii_case(s)),
            None => true,
        })
        .filter(|e| query.filter == TimeFilter::All || query.filter.contains(e.started_at(cal).as_ref(), cal))
        .collect();

    rows.sort_by(|a, b| compare_entries(a, b, query.sort, query.order, cal));
    rows
}

/// Present values in the requested order, absent values always last.
fn cmp_present<T: PartialOrd>(a: Option<T>, b: Option<T>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_entries<Tz: TimeZone>(
    a: &CatalogEntry,
    b: &CatalogEntry,
    col: SortColumn,
    order: SortOrder,
    cal: &Calendar<Tz>,
) -> Ordering {
    match col {
        SortColumn::Name => cmp_present(Some(a.name.to_lowercase()), Some(b.name.to_lowercase()), order),
        SortColumn::Rating => cmp_present(a.rating, b.rating, order),
        SortColumn::Episodes => cmp_present(a.episodes, b.episodes, order),
        SortColumn::Type => cmp_present(a.kind.map(|k| k.label()), b.kind.map(|k| k.label()), order),
        SortColumn::StartDate => cmp_present(a.started_at(cal), b.started_at(cal), order),
        SortColumn::Minutes => cmp_present(Some(a.watched_minutes()), Some(b.watched_minutes()), order),
    }
}

/// Plan queue, most urgent (lowest priority number) first.
pub fn plan_rows(plan: &[PlanEntry]) -> Vec<&PlanEntry> {
    let mut rows: Vec<&PlanEntry> = plan.iter().collect();
    rows.sort_by(|a, b| cmp_present(a.priority, b.priority, SortOrder::Asc));
    rows
}

/// One calendar day of sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryDay<'a> {
    pub day: NaiveDate,
    pub entries: Vec<&'a HistoryEntry>,
    pub total_minutes: f64,
    pub total_episodes: u32,
}

/// Sessions grouped by day, newest day first. Undated sessions are left out.
pub fn history_by_day<'a, Tz: TimeZone>(
    history: &'a [HistoryEntry],
    cal: &Calendar<Tz>,
) -> Vec<HistoryDay<'a>> {
    let mut days: BTreeMap<NaiveDate, HistoryDay<'a>> = BTreeMap::new();
    for h in history {
        let Some(watched) = h.watched_at(cal) else {
            continue;
        };
        let day = cal.day_of(&watched);
        let group = days.entry(day).or_insert_with(|| HistoryDay {
            day,
            entries: Vec::new(),
            total_minutes: 0.0,
            total_episodes: 0,
        });
        group.entries.push(h);
        group.total_minutes += h.minutes().unwrap_or(0.0);
        group.total_episodes += h.episode_count();
    }
    days.into_values().rev().collect()
}

/// Sessions associated with one catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleHistory<'a> {
    pub entries: Vec<&'a HistoryEntry>,
    pub total_minutes: f64,
    pub total_episodes: u32,
}

/// Sessions whose name contains the entry's match key, in log order.
pub fn title_history<'a>(history: &'a [HistoryEntry], entry: &CatalogEntry) -> TitleHistory<'a> {
    let entries: Vec<&HistoryEntry> = history.iter().filter(|h| h.matches(entry)).collect();
    TitleHistory {
        total_minutes: entries.iter().filter_map(|h| h.minutes()).sum(),
        total_episodes: entries.iter().map(|h| h.episode_count()).sum(),
        entries,
    }
}

/// Favorites by final score, best first; unscored songs last.
pub fn favorite_rows(
    songs: &[FavoriteSong],
    frisson_only: bool,
    kind: Option<SongKind>,
) -> Vec<&FavoriteSong> {
    let mut rows: Vec<&FavoriteSong> = songs
        .iter()
        .filter(|s| !frisson_only || s.frisson)
        .filter(|s| kind.is_none_or(|k| s.kind == k))
        .collect();
    rows.sort_by(|a, b| cmp_present(a.final_score(), b.final_score(), SortOrder::Desc));
    rows
}

/// Exact (case-insensitive) name match, else the first name containing it.
pub fn find_entry<'a>(catalog: &'a [CatalogEntry], name: &str) -> Option<&'a CatalogEntry> {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    catalog
        .iter()
        .find(|e| e.name.to_lowercase() == wanted)
        .or_else(|| catalog.iter().find(|e| e.name.to_lowercase().contains(&wanted)))
}
