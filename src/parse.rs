//! Lenient field parsing shared by the models and the aggregation engine.
//!
//! Source documents are hand-edited JSON, so numbers arrive as numbers or
//! strings and dates in several shapes. Nothing here fails: a value that
//! cannot be read is reported as absent.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Tokens in multi-valued fields that mean "nothing here".
const PLACEHOLDER_TOKENS: &[&str] = &["", "-", "?", "n/a", "unknown", "none"];

/// Delimiter for multi-valued fields (studio, genres, themes).
pub const MULTI_DELIMITER: char = ';';

/// Read a JSON value as a finite number. Numeric strings count.
pub fn value_to_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(value_to_f64))
}

/// Non-negative whole numbers (episode counts, rewatches). Fractions truncate.
pub fn opt_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v
        .as_ref()
        .and_then(value_to_f64)
        .filter(|f| *f >= 0.0 && *f <= u32::MAX as f64)
        .map(|f| f as u32))
}

/// A 0–10 score. Anything outside the range is dropped.
pub fn opt_rating<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(value_to_f64).and_then(checked_rating))
}

pub fn checked_rating(r: f64) -> Option<f64> {
    if (0.0..=10.0).contains(&r) {
        Some(r)
    } else {
        log::debug!("Ignoring out-of-range rating {r}");
        None
    }
}

/// Named scores. Entries that are not a 0–10 number are dropped; the rest
/// are kept.
pub fn rating_map<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<String, f64>, D::Error> {
    let v = Option::<BTreeMap<String, Value>>::deserialize(d)?;
    Ok(v.unwrap_or_default()
        .into_iter()
        .filter_map(|(k, x)| {
            let score = value_to_f64(&x).and_then(checked_rating);
            if score.is_none() {
                log::debug!("Dropping unreadable score for '{k}': {x}");
            }
            score.map(|s| (k, s))
        })
        .collect())
}

/// Scores inside a list, keeping positions: `[8, "x", 7.5]` → `[Some(8), None, Some(7.5)]`.
pub fn rating_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Option<f64>>, D::Error> {
    let v = Option::<Vec<Value>>::deserialize(d)?;
    Ok(v.unwrap_or_default()
        .iter()
        .map(|x| value_to_f64(x).and_then(checked_rating))
        .collect())
}

/// A record timestamp before a time zone is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    /// Carried an offset, so it names one instant everywhere.
    Absolute(DateTime<Utc>),
    /// Wall-clock reading (naive date-time, or a bare date at midnight).
    Wall(NaiveDateTime),
}

/// Parse a record timestamp without deciding its zone.
///
/// Accepts RFC 3339 (`2023-06-15T00:00:00Z`), naive date-times
/// (`2023-06-15T10:30:00`, `2023-06-15 10:30:00`) and bare dates
/// (`2023-06-15`).
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(Timestamp::Absolute(dt.with_timezone(&Utc)));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Timestamp::Wall(naive));
        }
    }
    NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(Timestamp::Wall)
}

/// Parse a timestamp as an instant, reading values without an offset as UTC.
///
/// Used for server version stamps. Record dates go through
/// [`Calendar::instant_of`](crate::filter::Calendar::instant_of) instead.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    match parse_timestamp(raw)? {
        Timestamp::Absolute(dt) => Some(dt),
        Timestamp::Wall(naive) => Some(naive.and_utc()),
    }
}

/// Parse a calendar date given on the command line or in a filter.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_date(s).map(|dt| dt.date_naive()))
}

// "24 min", "24min", "24.5 mins"
static MINUTES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?P<min>\d+(?:\.\d+)?)\s*min").unwrap());

// "1:30" = one hour thirty
static CLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?P<h>\d+):(?P<m>\d{1,2})\s*$").unwrap());

// "(3x) Episodes 4-6"
static REPEAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\((?P<n>\d+)\s*[xX]\)").unwrap());

static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?P<a>\d+)\s*[-–]\s*(?P<b>\d+)").unwrap());

static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d").unwrap());

/// Minutes from a `"<N> min"` token only. Used by the streak calculation.
pub fn parse_minutes_strict(raw: &str) -> Option<f64> {
    MINUTES_RE
        .captures(raw)
        .and_then(|c| c["min"].parse::<f64>().ok())
}

/// Minutes from either `"<N> min"` or `"H:MM"`.
pub fn parse_elapsed_minutes(raw: &str) -> Option<f64> {
    if let Some(m) = parse_minutes_strict(raw) {
        return Some(m);
    }
    let caps = CLOCK_RE.captures(raw)?;
    let h: f64 = caps["h"].parse().ok()?;
    let m: f64 = caps["m"].parse().ok()?;
    Some(h * 60.0 + m)
}

/// Number of episodes a history descriptor stands for.
///
/// `"(3x) ..."` → 3, `"Ep 4-6"` → 3, `"Ep 5"` → 1, `"Movie"` → 0.
pub fn parse_episode_count(raw: &str) -> u32 {
    if let Some(c) = REPEAT_RE.captures(raw) {
        return c["n"].parse().unwrap_or(0);
    }
    if let Some(c) = RANGE_RE.captures(raw) {
        let a: u32 = c["a"].parse().unwrap_or(0);
        let b: u32 = c["b"].parse().unwrap_or(0);
        if b >= a {
            return b - a + 1;
        }
    }
    if DIGITS_RE.is_match(raw) { 1 } else { 0 }
}

/// Split a multi-valued field into cleaned tokens.
pub fn split_multi(raw: &str) -> Vec<String> {
    raw.split(MULTI_DELIMITER)
        .map(str::trim)
        .filter(|t| !PLACEHOLDER_TOKENS.contains(&t.to_lowercase().as_str()))
        .map(str::to_string)
        .collect()
}

/// Round to two decimal places.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "opt_f64")]
        f: Option<f64>,
        #[serde(default, deserialize_with = "opt_u32")]
        n: Option<u32>,
        #[serde(default, deserialize_with = "opt_rating")]
        r: Option<f64>,
    }

    fn probe(json: &str) -> Probe {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_lenient_numbers() {
        let p = probe(r#"{"f": "23.5", "n": 12, "r": "8.5"}"#);
        assert_eq!(p.f, Some(23.5));
        assert_eq!(p.n, Some(12));
        assert_eq!(p.r, Some(8.5));

        let p = probe(r#"{"f": "abc", "n": "-3", "r": 11}"#);
        assert_eq!(p.f, None);
        assert_eq!(p.n, None);
        assert_eq!(p.r, None);

        let p = probe(r#"{"f": null, "n": true}"#);
        assert_eq!(p.f, None);
        assert_eq!(p.n, None);
        assert_eq!(p.r, None);
    }

    #[test]
    fn test_parse_date_shapes() {
        let dt = parse_date("2023-06-15T00:00:00Z").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2023, 6, 15));

        let dt = parse_date("2023-06-15T10:30:00.000+02:00").unwrap();
        assert_eq!(dt.hour(), 8);

        let dt = parse_date("2023-06-15T10:30:00").unwrap();
        assert_eq!(dt.hour(), 10);

        let dt = parse_date("2000-06-01").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2000, 6, 1));

        assert!(parse_date("").is_none());
        assert!(parse_date("soon").is_none());
    }

    #[test]
    fn test_timestamp_keeps_wall_clock_forms_naive() {
        let bare = parse_timestamp("2023-02-01").unwrap();
        assert_eq!(
            bare,
            Timestamp::Wall(NaiveDate::from_ymd_opt(2023, 2, 1).unwrap().and_hms_opt(0, 0, 0).unwrap())
        );
        assert!(matches!(parse_timestamp("2023-02-01T10:00:00"), Some(Timestamp::Wall(_))));
        assert!(matches!(parse_timestamp("2023-02-01T10:00:00Z"), Some(Timestamp::Absolute(_))));
        assert_eq!(parse_timestamp("  "), None);
    }

    #[test]
    fn test_rating_map_keeps_readable_scores() {
        #[derive(Deserialize)]
        struct Scores {
            #[serde(deserialize_with = "rating_map")]
            scores: BTreeMap<String, f64>,
        }
        let s: Scores = serde_json::from_str(
            r#"{"scores": {"Plot": 8, "Pacing": "7", "Art": "great", "Sound": 14, "Cast": null}}"#,
        )
        .unwrap();
        assert_eq!(s.scores.len(), 2);
        assert_eq!(s.scores["Plot"], 8.0);
        assert_eq!(s.scores["Pacing"], 7.0);
    }

    #[test]
    fn test_elapsed_minutes() {
        assert_eq!(parse_elapsed_minutes("24 min"), Some(24.0));
        assert_eq!(parse_elapsed_minutes("48min"), Some(48.0));
        assert_eq!(parse_elapsed_minutes("1:30"), Some(90.0));
        assert_eq!(parse_elapsed_minutes("0:05"), Some(5.0));
        assert_eq!(parse_elapsed_minutes("a while"), None);

        // Streak parsing ignores the clock form
        assert_eq!(parse_minutes_strict("1:30"), None);
        assert_eq!(parse_minutes_strict("25 min"), Some(25.0));
    }

    #[test]
    fn test_episode_count() {
        assert_eq!(parse_episode_count("(3x) Episodes 4-6"), 3);
        assert_eq!(parse_episode_count("Ep 4-6"), 3);
        assert_eq!(parse_episode_count("Episode 12"), 1);
        assert_eq!(parse_episode_count("Movie"), 0);
    }

    #[test]
    fn test_split_multi() {
        assert_eq!(split_multi("Action; Drama ;;N/A; -"), vec!["Action", "Drama"]);
        assert!(split_multi("").is_empty());
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(8.3333), 8.33);
        assert_eq!(round2(7.005_1), 7.01);
    }
}
