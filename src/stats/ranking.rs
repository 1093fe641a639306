use serde::Serialize;

use super::distribution::studio_tokens;
use super::tally::Tally;
use crate::models::CatalogEntry;
use crate::parse::round2;

/// Entries kept in a top-N ranking.
pub const TOP_N: usize = 10;

pub const MIN_STUDIO_COUNT: usize = 2;
pub const MIN_GENRE_COUNT: usize = 3;
pub const MIN_THEME_COUNT: usize = 3;

/// A key with its mean rating over the entries that carry one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedKey {
    pub key: String,
    pub average: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rankings {
    pub top_studios: Vec<RankedKey>,
    pub top_genres: Vec<RankedKey>,
    pub top_themes: Vec<RankedKey>,
    pub rating_by_type: Vec<RankedKey>,
}

/// Running rating sum and count for one key.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct RatingSum {
    sum: f64,
    count: usize,
}

impl RatingSum {
    fn add(&mut self, rating: f64) {
        self.sum += rating;
        self.count += 1;
    }
}

fn averages(acc: Tally<RatingSum>, min_count: usize) -> Vec<RankedKey> {
    acc.into_entries()
        .into_iter()
        .filter(|(_, r)| r.count >= min_count)
        .map(|(key, r)| RankedKey {
            key,
            average: round2(r.sum / r.count as f64),
            count: r.count,
        })
        .collect()
}

/// Mean rating per key for rated entries, keys with fewer than `min_count`
/// rated entries dropped, highest first, at most `TOP_N`. Equal averages
/// keep first-seen order.
pub fn top_by_average<'a, F>(entries: &[&'a CatalogEntry], keys_of: F, min_count: usize) -> Vec<RankedKey>
where
    F: Fn(&'a CatalogEntry) -> Vec<String>,
{
    let mut acc: Tally<RatingSum> = Tally::default();
    for &e in entries {
        let Some(rating) = e.rating else { continue };
        for key in keys_of(e) {
            acc.entry(&key).add(rating);
        }
    }
    let mut ranked = averages(acc, min_count);
    ranked.sort_by(|a, b| {
        b.average
            .partial_cmp(&a.average)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(TOP_N);
    ranked
}

/// Mean rating per type, no minimum and no truncation, first-seen order.
pub fn rating_by_type(entries: &[&CatalogEntry]) -> Vec<RankedKey> {
    let mut acc: Tally<RatingSum> = Tally::default();
    for e in entries {
        if let Some(rating) = e.rating {
            acc.entry(e.type_label()).add(rating);
        }
    }
    averages(acc, 0)
}

pub fn compute_rankings(entries: &[&CatalogEntry]) -> Rankings {
    Rankings {
        top_studios: top_by_average(entries, studio_tokens, MIN_STUDIO_COUNT),
        top_genres: top_by_average(entries, CatalogEntry::genre_list, MIN_GENRE_COUNT),
        top_themes: top_by_average(entries, CatalogEntry::theme_list, MIN_THEME_COUNT),
        rating_by_type: rating_by_type(entries),
    }
}

/// Mean rating over rated entries, `None` when none are rated.
pub fn average_rating(entries: &[&CatalogEntry]) -> Option<f64> {
    let rated: Vec<f64> = entries.iter().filter_map(|e| e.rating).collect();
    if rated.is_empty() {
        None
    } else {
        Some(round2(rated.iter().sum::<f64>() / rated.len() as f64))
    }
}
