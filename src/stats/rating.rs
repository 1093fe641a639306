//! Weighted composite of per-category scores.

use std::collections::BTreeMap;

use crate::models::CategoryRating;
use crate::parse::round2;

/// Importance of each rating category. Categories not listed weigh 1.
pub const CATEGORY_WEIGHTS: [(&str, f64); 14] = [
    ("Plot", 4.0),
    ("Characters", 3.5),
    ("Enjoyment", 3.5),
    ("Pacing", 3.0),
    ("Emotional Impact", 3.0),
    ("Ending", 2.5),
    ("World Building", 2.5),
    ("Originality", 2.0),
    ("Animation", 2.0),
    ("Art Style", 1.5),
    ("Soundtrack", 1.5),
    ("Voice Acting", 1.0),
    ("Opening", 0.5),
    ("Ending Song", 0.5),
];

pub const DEFAULT_CATEGORY_WEIGHT: f64 = 1.0;

pub fn category_weight(category: &str) -> f64 {
    CATEGORY_WEIGHTS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category))
        .map(|(_, w)| *w)
        .unwrap_or(DEFAULT_CATEGORY_WEIGHT)
}

/// Σ(score × weight) / Σ(weight), rounded to two places. `None` when there
/// are no categories.
pub fn composite_rating(categories: &BTreeMap<String, f64>) -> Option<f64> {
    if categories.is_empty() {
        return None;
    }
    let (weighted, total_weight) =
        categories
            .iter()
            .fold((0.0, 0.0), |(sum, weights), (category, score)| {
                let w = category_weight(category);
                (sum + score * w, weights + w)
            });
    if total_weight > 0.0 {
        Some(round2(weighted / total_weight))
    } else {
        None
    }
}

/// Composite rating of the named title, if it has category scores.
pub fn composite_for(ratings: &[CategoryRating], name: &str) -> Option<f64> {
    ratings
        .iter()
        .find(|r| r.name.eq_ignore_ascii_case(name))
        .and_then(|r| composite_rating(&r.categories))
}
