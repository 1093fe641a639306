//! Fetching the static documents and keeping the local cache current.
//!
//! A sync first compares the server's `meta.lastUpdated` with the stamp
//! stored alongside the cache. A newer server stamp (or no stored stamp)
//! drops every cached document. Then each document missing from the cache
//! is fetched and stored. A document that cannot be fetched is logged and
//! left out, so its collection loads as empty.

pub mod cache;
pub mod source;

pub use cache::DocumentCache;
pub use source::{DirSource, DocumentSource, HttpSource};

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::{
    CatalogEntry, CategoryRating, EpisodeRating, FavoriteSong, HistoryEntry, Meta, Note, PlanEntry,
    StatsOverrides,
};
use crate::parse::parse_date;
use crate::store::{KvStore, StoreError};

/// Every document the dashboard reads, in fetch order after `meta`.
pub const DOCUMENTS: [&str; 9] = [
    "meta",
    "anime",
    "history",
    "favorites",
    "plan",
    "category_ratings",
    "episode_ratings",
    "notes",
    "stats",
];

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("No catalog entry named '{0}'")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, LoadError>;

/// All collections, decoded from the cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSet {
    pub anime: Vec<CatalogEntry>,
    pub history: Vec<HistoryEntry>,
    pub favorites: Vec<FavoriteSong>,
    pub plan: Vec<PlanEntry>,
    pub category_ratings: Vec<CategoryRating>,
    pub episode_ratings: Vec<EpisodeRating>,
    pub notes: Vec<Note>,
    pub overrides: StatsOverrides,
    pub meta: Meta,
}

impl DataSet {
    pub fn note_for(&self, name: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.name.eq_ignore_ascii_case(name))
    }
}

/// Outcome of one sync.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// The cache was dropped because the server had newer data (or a
    /// forced refresh).
    pub invalidated: bool,
    pub fetched: usize,
    pub cached: usize,
    pub failed: Vec<String>,
}

pub struct Loader<S, D> {
    cache: DocumentCache<S>,
    source: D,
    show_progress: bool,
}

impl<S: KvStore, D: DocumentSource> Loader<S, D> {
    pub fn new(store: S, source: D) -> Self {
        Self {
            cache: DocumentCache::new(store),
            source,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn cache(&self) -> &DocumentCache<S> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut DocumentCache<S> {
        &mut self.cache
    }

    pub fn into_cache(self) -> DocumentCache<S> {
        self.cache
    }

    /// Sync, then decode the cache.
    pub fn load(&mut self, force: bool) -> Result<DataSet> {
        self.sync(force)?;
        self.cache.dataset()
    }

    pub fn sync(&mut self, force: bool) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        log::info!("Syncing documents from {}", self.source.describe());

        if force {
            self.cache.clear_all()?;
            report.invalidated = true;
        }

        match self.fetch_document("meta") {
            Ok(meta) => {
                let server = meta.get("lastUpdated").and_then(Value::as_str).map(str::to_string);
                if !force && is_stale(server.as_deref(), self.cache.last_updated()?.as_deref()) {
                    log::info!("Server data is newer, dropping cached documents");
                    self.cache.clear_all()?;
                    report.invalidated = true;
                }
                self.cache.put("meta", &meta)?;
                if let Some(stamp) = &server {
                    self.cache.set_last_updated(stamp)?;
                }
                report.fetched += 1;
            }
            Err(e) => {
                log::warn!("Could not fetch meta, keeping cached documents: {e}");
                report.failed.push("meta".to_string());
            }
        }

        let pending: Vec<&str> = DOCUMENTS[1..]
            .iter()
            .copied()
            .filter(|doc| !self.cache.contains(doc).unwrap_or(false))
            .collect();
        report.cached = DOCUMENTS.len() - 1 - pending.len();

        let pb = if self.show_progress {
            ProgressBar::new(pending.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::with_template("  [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );

        for doc in pending {
            pb.set_message(doc.to_string());
            match self.fetch_document(doc) {
                Ok(value) => {
                    self.cache.put(doc, &value)?;
                    report.fetched += 1;
                }
                Err(e) => {
                    log::warn!("Failed to load '{doc}': {e}");
                    report.failed.push(doc.to_string());
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        log::info!(
            "Sync complete: {} fetched, {} from cache, {} failed",
            report.fetched,
            report.cached,
            report.failed.len()
        );
        Ok(report)
    }

    fn fetch_document(&self, doc: &str) -> Result<Value> {
        let raw = self.source.fetch(doc)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Whether the server stamp supersedes the cached one. Stamps that do not
/// parse as dates are compared for equality only.
pub fn is_stale(server: Option<&str>, cached: Option<&str>) -> bool {
    match (server, cached) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(s), Some(c)) => match (parse_date(s), parse_date(c)) {
            (Some(s), Some(c)) => s > c,
            _ => s != c,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory document host that records what was requested.
    struct FakeSource {
        docs: HashMap<&'static str, String>,
        requests: RefCell<Vec<String>>,
    }

    impl FakeSource {
        fn new(stamp: &str) -> Self {
            let mut docs = HashMap::new();
            docs.insert("meta", format!(r#"{{"lastUpdated": "{stamp}"}}"#));
            docs.insert(
                "anime",
                r#"[{"index": 1, "name": "Mushishi", "type": "TV", "episodes": 26, "startDate": "2023-02-01"}]"#
                    .to_string(),
            );
            docs.insert(
                "history",
                r#"[{"name": "Mushishi", "episode": "Ep 1-2", "time": "48 min", "date": "2023-02-01T21:00:00Z"}]"#
                    .to_string(),
            );
            docs.insert("stats", r#"{"rows": [{"label": "2023", "values": {"Hours": "10+"}}]}"#.to_string());
            Self {
                docs,
                requests: RefCell::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<String> {
            self.requests.borrow().clone()
        }
    }

    impl DocumentSource for &FakeSource {
        fn fetch(&self, name: &str) -> Result<String> {
            self.requests.borrow_mut().push(name.to_string());
            self.docs
                .get(name)
                .cloned()
                .ok_or_else(|| LoadError::Http(format!("404 {name}")))
        }

        fn describe(&self) -> String {
            "fake".into()
        }
    }

    #[test]
    fn test_first_load_fetches_everything() {
        let src = FakeSource::new("2024-01-01T00:00:00Z");
        let mut loader = Loader::new(MemoryStore::new(), &src).with_progress(false);
        let report = loader.sync(false).unwrap();

        assert!(report.invalidated);
        assert_eq!(report.fetched, 4);
        // Missing documents fail softly
        assert!(report.failed.contains(&"favorites".to_string()));

        let data = loader.cache().dataset().unwrap();
        assert_eq!(data.anime.len(), 1);
        assert_eq!(data.history[0].episode_count(), 2);
        assert!(data.favorites.is_empty());
        assert_eq!(data.overrides.cell("2023", "Hours"), Some("10+"));
        assert_eq!(data.meta.last_updated.as_deref(), Some("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_same_stamp_uses_cache() {
        let src = FakeSource::new("2024-01-01T00:00:00Z");
        let mut store = MemoryStore::new();
        Loader::new(&mut store, &src).with_progress(false).sync(false).unwrap();
        let before = src.requested().len();

        let report = Loader::new(&mut store, &src).with_progress(false).sync(false).unwrap();
        assert!(!report.invalidated);
        assert_eq!(report.cached, 3);
        // meta plus the documents that were never available
        let again: Vec<String> = src.requested()[before..].to_vec();
        assert!(again.contains(&"meta".to_string()));
        assert!(!again.contains(&"anime".to_string()));
    }

    #[test]
    fn test_newer_stamp_invalidates() {
        let mut store = MemoryStore::new();
        let old = FakeSource::new("2024-01-01T00:00:00Z");
        Loader::new(&mut store, &old).with_progress(false).sync(false).unwrap();

        let mut newer = FakeSource::new("2024-02-01T00:00:00Z");
        newer.docs.insert("anime", "[]".to_string());
        let mut loader = Loader::new(&mut store, &newer).with_progress(false);
        let report = loader.sync(false).unwrap();
        assert!(report.invalidated);
        assert!(loader.cache().dataset().unwrap().anime.is_empty());
        assert_eq!(
            loader.cache().last_updated().unwrap().as_deref(),
            Some("2024-02-01T00:00:00Z")
        );
    }

    #[test]
    fn test_meta_failure_keeps_cache() {
        let mut store = MemoryStore::new();
        let src = FakeSource::new("2024-01-01T00:00:00Z");
        Loader::new(&mut store, &src).with_progress(false).sync(false).unwrap();

        let mut offline = FakeSource::new("x");
        offline.docs.clear();
        let mut loader = Loader::new(&mut store, &offline).with_progress(false);
        let data = loader.load(false).unwrap();
        assert_eq!(data.anime.len(), 1);
    }

    #[test]
    fn test_force_refetches() {
        let mut store = MemoryStore::new();
        let src = FakeSource::new("2024-01-01T00:00:00Z");
        Loader::new(&mut store, &src).with_progress(false).sync(false).unwrap();
        let before = src.requested().len();

        let report = Loader::new(&mut store, &src).with_progress(false).sync(true).unwrap();
        assert!(report.invalidated);
        assert!(src.requested()[before..].contains(&"anime".to_string()));
    }

    #[test]
    fn test_local_edit_survives_resync_with_same_stamp() {
        let mut store = MemoryStore::new();
        let src = FakeSource::new("2024-01-01T00:00:00Z");
        let mut loader = Loader::new(&mut store, &src).with_progress(false);
        loader.sync(false).unwrap();
        loader.cache_mut().delete_entry("Mushishi").unwrap();
        loader.sync(false).unwrap();
        assert!(loader.cache().dataset().unwrap().anime.is_empty());
    }

    #[test]
    fn test_is_stale() {
        assert!(is_stale(Some("2024-02-01"), None));
        assert!(is_stale(Some("2024-02-01"), Some("2024-01-31T23:00:00Z")));
        assert!(!is_stale(Some("2024-01-01"), Some("2024-01-01")));
        assert!(!is_stale(Some("2023-12-31"), Some("2024-01-01")));
        assert!(!is_stale(None, Some("2024-01-01")));
        assert!(is_stale(Some("v2"), Some("v1")));
    }

    #[test]
    fn test_note_lookup() {
        let data = DataSet {
            notes: vec![Note {
                name: "Akira".into(),
                text: "rewatch in 4k".into(),
            }],
            ..Default::default()
        };
        assert_eq!(data.note_for("akira").map(|n| n.text.as_str()), Some("rewatch in 4k"));
    }
}
