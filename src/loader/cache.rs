//! Cached documents in a [`KvStore`], plus the local edits made to them.
//!
//! Documents are stored verbatim as JSON text under `cache:<name>`. Edits
//! work on the raw JSON so fields this crate does not model survive a
//! rewrite.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::{DOCUMENTS, DataSet, LoadError, Result};
use crate::models::{CatalogEntry, HistoryEntry};
use crate::parse;
use crate::store::KvStore;

pub const CACHE_PREFIX: &str = "cache:";
/// Server timestamp of the cached documents.
pub const LAST_UPDATED_KEY: &str = "cache:lastUpdated";

pub struct DocumentCache<S> {
    store: S,
}

impl<S: KvStore> DocumentCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn key_of(doc: &str) -> String {
        format!("{CACHE_PREFIX}{doc}")
    }

    pub fn contains(&self, doc: &str) -> Result<bool> {
        Ok(self.store.get(&Self::key_of(doc))?.is_some())
    }

    /// The cached document, or `None` when absent or unreadable.
    pub fn get(&self, doc: &str) -> Result<Option<Value>> {
        Ok(self.store.get_json(&Self::key_of(doc))?)
    }

    pub fn put(&mut self, doc: &str, value: &Value) -> Result<()> {
        Ok(self.store.set_json(&Self::key_of(doc), value)?)
    }

    /// Drop every cached document and the stored timestamp.
    pub fn clear_all(&mut self) -> Result<usize> {
        let keys = self.store.keys(CACHE_PREFIX)?;
        for key in &keys {
            self.store.clear(key)?;
        }
        log::info!("Cleared {} cached entries", keys.len());
        Ok(keys.len())
    }

    pub fn last_updated(&self) -> Result<Option<String>> {
        Ok(self.store.get(LAST_UPDATED_KEY)?)
    }

    pub fn set_last_updated(&mut self, stamp: &str) -> Result<()> {
        Ok(self.store.set(LAST_UPDATED_KEY, stamp)?)
    }

    /// Decode every cached document. Missing documents give empty
    /// collections.
    pub fn dataset(&self) -> Result<DataSet> {
        Ok(DataSet {
            anime: self.list("anime")?,
            history: self.list("history")?,
            favorites: self.list("favorites")?,
            plan: self.list("plan")?,
            category_ratings: self.list("category_ratings")?,
            episode_ratings: self.list("episode_ratings")?,
            notes: self.list("notes")?,
            overrides: self.object("stats")?,
            meta: self.object("meta")?,
        })
    }

    fn list<T: DeserializeOwned>(&self, doc: &str) -> Result<Vec<T>> {
        Ok(self.get(doc)?.map(|v| decode_list(doc, v)).unwrap_or_default())
    }

    fn object<T: DeserializeOwned + Default>(&self, doc: &str) -> Result<T> {
        Ok(match self.get(doc)? {
            Some(v) => serde_json::from_value(v).unwrap_or_else(|e| {
                log::warn!("Ignoring malformed '{doc}' document: {e}");
                T::default()
            }),
            None => T::default(),
        })
    }

    /// Cached array document, empty when absent or not an array.
    fn array(&self, doc: &str) -> Result<Vec<Value>> {
        Ok(match self.get(doc)? {
            Some(Value::Array(items)) => items,
            Some(_) => {
                log::warn!("Cached '{doc}' is not an array, starting from empty");
                Vec::new()
            }
            None => Vec::new(),
        })
    }

    /// One JSON object mapping document name to document.
    pub fn export(&self) -> Result<Value> {
        let mut out = Map::new();
        for doc in DOCUMENTS {
            if let Some(v) = self.get(doc)? {
                out.insert(doc.to_string(), v);
            }
        }
        log::info!("Exported {} documents", out.len());
        Ok(Value::Object(out))
    }

    /// Replace the cache with an exported object. Unknown document names
    /// are skipped.
    pub fn import(&mut self, exported: &Value) -> Result<usize> {
        let Value::Object(docs) = exported else {
            return Err(LoadError::Invalid(
                "import expects a JSON object of documents".into(),
            ));
        };

        let previous_stamp = self.last_updated()?;
        self.clear_all()?;
        let mut imported = 0;
        for (name, value) in docs {
            if !DOCUMENTS.contains(&name.as_str()) {
                log::warn!("Skipping unknown document '{name}' in import");
                continue;
            }
            self.put(name, value)?;
            imported += 1;
        }
        if let Some(stamp) = docs
            .get("meta")
            .and_then(|m| m.get("lastUpdated"))
            .and_then(Value::as_str)
        {
            self.set_last_updated(stamp)?;
        } else if let Some(stamp) = previous_stamp {
            log::info!("Import carries no meta stamp, keeping {stamp}");
            self.set_last_updated(&stamp)?;
        } else {
            log::warn!("Import carries no meta stamp; the next sync will replace it");
        }
        log::info!("Imported {imported} documents");
        Ok(imported)
    }

    /// Append a catalog entry. It gets the next index, and the current
    /// time as its start date when none is set.
    pub fn add_entry(&mut self, mut entry: CatalogEntry, now: DateTime<Utc>) -> Result<CatalogEntry> {
        if entry.name.trim().is_empty() {
            return Err(LoadError::Invalid("entry name is empty".into()));
        }
        let mut items = self.array("anime")?;
        if find_by_name(&items, &entry.name).is_some() {
            return Err(LoadError::Invalid(format!("'{}' is already in the catalog", entry.name)));
        }

        let next_index = items
            .iter()
            .filter_map(|v| v.get("index").and_then(parse::value_to_f64))
            .filter(|i| *i >= 0.0)
            .map(|i| i as u64)
            .max()
            .unwrap_or(0)
            + 1;
        entry.index = Some(next_index as u32);
        if entry.start_date.is_none() {
            entry.start_date = Some(timestamp(now));
        }

        items.push(serde_json::to_value(&entry)?);
        self.put("anime", &Value::Array(items))?;
        log::info!("Added '{}' as #{next_index}", entry.name);
        Ok(entry)
    }

    /// Merge `patch` (a JSON object) into the named entry's fields.
    pub fn update_entry(&mut self, name: &str, patch: &Value) -> Result<CatalogEntry> {
        let Value::Object(fields) = patch else {
            return Err(LoadError::Invalid("update expects a JSON object".into()));
        };
        let mut items = self.array("anime")?;
        let pos = find_by_name(&items, name).ok_or_else(|| LoadError::NotFound(name.to_string()))?;

        let Value::Object(target) = &mut items[pos] else {
            return Err(LoadError::Invalid(format!("catalog entry '{name}' is not an object")));
        };
        for (k, v) in fields {
            if v.is_null() {
                target.remove(k);
            } else {
                target.insert(k.clone(), v.clone());
            }
        }

        let updated: CatalogEntry = serde_json::from_value(items[pos].clone())?;
        self.put("anime", &Value::Array(items))?;
        log::info!("Updated '{}'", updated.name);
        Ok(updated)
    }

    pub fn delete_entry(&mut self, name: &str) -> Result<()> {
        let mut items = self.array("anime")?;
        let pos = find_by_name(&items, name).ok_or_else(|| LoadError::NotFound(name.to_string()))?;
        items.remove(pos);
        self.put("anime", &Value::Array(items))?;
        log::info!("Deleted '{name}'");
        Ok(())
    }

    /// Record a watching session dated `now`.
    pub fn log_history(
        &mut self,
        name: &str,
        episode: &str,
        time: &str,
        now: DateTime<Utc>,
    ) -> Result<HistoryEntry> {
        let entry = HistoryEntry {
            name: name.to_string(),
            episode: episode.to_string(),
            time: time.to_string(),
            date: Some(timestamp(now)),
        };
        let mut items = self.array("history")?;
        items.push(serde_json::to_value(&entry)?);
        self.put("history", &Value::Array(items))?;
        log::info!("Logged {} ({}) for '{}'", entry.episode, entry.time, entry.name);
        Ok(entry)
    }
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn find_by_name(items: &[Value], name: &str) -> Option<usize> {
    let wanted = name.trim();
    items.iter().position(|v| {
        v.get("name")
            .and_then(Value::as_str)
            .is_some_and(|n| n.trim().eq_ignore_ascii_case(wanted))
    })
}

/// Decode an array document item by item, dropping items that do not fit.
pub fn decode_list<T: DeserializeOwned>(doc: &str, value: Value) -> Vec<T> {
    let Value::Array(items) = value else {
        log::warn!("Document '{doc}' is not an array, ignoring it");
        return Vec::new();
    };
    let total = items.len();
    let decoded: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(v) => Some(v),
            Err(e) => {
                log::debug!("Skipping record in '{doc}': {e}");
                None
            }
        })
        .collect();
    if decoded.len() < total {
        log::warn!("Skipped {} malformed records in '{doc}'", total - decoded.len());
    }
    decoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_date;
    use crate::store::{MemoryStore, SqliteStore};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        parse_date("2024-05-01T10:00:00Z").unwrap()
    }

    fn seeded() -> DocumentCache<MemoryStore> {
        let mut cache = DocumentCache::new(MemoryStore::new());
        cache
            .put(
                "anime",
                &json!([
                    {"index": 1, "name": "Mushishi", "type": "TV", "episodes": 26, "custom": "kept"},
                    {"index": 4, "name": "Akira", "type": "Movie", "episodes": 1}
                ]),
            )
            .unwrap();
        cache
            .put("history", &json!([{"name": "Mushishi", "episode": "Ep 1", "time": "24 min", "date": "2024-04-30"}]))
            .unwrap();
        cache
    }

    #[test]
    fn test_dataset_from_cache() {
        let data = seeded().dataset().unwrap();
        assert_eq!(data.anime.len(), 2);
        assert_eq!(data.history.len(), 1);
        assert!(data.favorites.is_empty());
        assert_eq!(data.overrides.rows.len(), 0);
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let mut cache = DocumentCache::new(MemoryStore::new());
        cache
            .put("anime", &json!([{"name": "ok"}, {"noName": true}, 5]))
            .unwrap();
        cache.put("stats", &json!("not an object")).unwrap();
        let data = cache.dataset().unwrap();
        assert_eq!(data.anime.len(), 1);
        assert_eq!(data.overrides, Default::default());
    }

    #[test]
    fn test_add_assigns_next_index_and_start_date() {
        let mut cache = seeded();
        let added = cache.add_entry(CatalogEntry::new("Frieren"), now()).unwrap();
        assert_eq!(added.index, Some(5));
        assert_eq!(added.start_date.as_deref(), Some("2024-05-01T10:00:00Z"));

        let data = cache.dataset().unwrap();
        assert_eq!(data.anime.len(), 3);
        assert_eq!(data.anime[2].name, "Frieren");
    }

    #[test]
    fn test_add_rejects_duplicate_and_empty() {
        let mut cache = seeded();
        assert!(matches!(
            cache.add_entry(CatalogEntry::new("mushishi"), now()),
            Err(LoadError::Invalid(_))
        ));
        assert!(cache.add_entry(CatalogEntry::new("  "), now()).is_err());
    }

    #[test]
    fn test_update_merges_fields_and_keeps_unknown() {
        let mut cache = seeded();
        let updated = cache
            .update_entry("MUSHISHI", &json!({"rating": 9.5, "rewatchCount": 1}))
            .unwrap();
        assert_eq!(updated.rating, Some(9.5));
        assert_eq!(updated.episodes, Some(26));

        let raw = cache.get("anime").unwrap().unwrap();
        assert_eq!(raw[0]["custom"], "kept");
        assert_eq!(raw[0]["rewatchCount"], 1);
    }

    #[test]
    fn test_update_null_removes_field() {
        let mut cache = seeded();
        let updated = cache.update_entry("Akira", &json!({"type": null})).unwrap();
        assert_eq!(updated.kind, None);
    }

    #[test]
    fn test_update_and_delete_unknown_name() {
        let mut cache = seeded();
        assert!(matches!(
            cache.update_entry("Nope", &json!({})),
            Err(LoadError::NotFound(_))
        ));
        assert!(matches!(cache.delete_entry("Nope"), Err(LoadError::NotFound(_))));
        assert!(cache.update_entry("Akira", &json!([1])).is_err());
    }

    #[test]
    fn test_delete_is_case_insensitive() {
        let mut cache = seeded();
        cache.delete_entry("akira").unwrap();
        let data = cache.dataset().unwrap();
        assert_eq!(data.anime.len(), 1);
        assert_eq!(data.anime[0].name, "Mushishi");
    }

    #[test]
    fn test_log_history_appends() {
        let mut cache = seeded();
        let h = cache.log_history("Akira", "Movie", "124 min", now()).unwrap();
        assert_eq!(h.date.as_deref(), Some("2024-05-01T10:00:00Z"));
        let data = cache.dataset().unwrap();
        assert_eq!(data.history.len(), 2);
        assert_eq!(data.history[1].minutes(), Some(124.0));
    }

    #[test]
    fn test_export_import_reproduces_catalog() {
        let mut source = seeded();
        source.put("meta", &json!({"lastUpdated": "2024-04-30T00:00:00Z"})).unwrap();
        let exported = source.export().unwrap();
        assert!(exported.get("anime").is_some());
        assert!(exported.get("favorites").is_none());

        let mut target = DocumentCache::new(SqliteStore::open_in_memory().unwrap());
        target.put("plan", &json!([{"name": "stale"}])).unwrap();
        let n = target.import(&exported).unwrap();
        assert_eq!(n, 3);

        assert_eq!(target.dataset().unwrap().anime, source.dataset().unwrap().anime);
        assert!(target.dataset().unwrap().plan.is_empty());
        assert_eq!(
            target.last_updated().unwrap().as_deref(),
            Some("2024-04-30T00:00:00Z")
        );
    }

    #[test]
    fn test_import_without_meta_keeps_stamp() {
        let mut cache = seeded();
        cache.set_last_updated("2024-04-30T00:00:00Z").unwrap();
        let exported = json!({"anime": [{"name": "Akira"}]});
        cache.import(&exported).unwrap();
        assert_eq!(
            cache.last_updated().unwrap().as_deref(),
            Some("2024-04-30T00:00:00Z")
        );
        assert_eq!(cache.dataset().unwrap().anime.len(), 1);
    }

    #[test]
    fn test_numeric_strings_keep_records() {
        let mut cache = DocumentCache::new(MemoryStore::new());
        cache
            .put(
                "anime",
                &json!([
                    {"index": 1, "name": "A"},
                    {"index": "2", "name": "B"},
                    {"index": 3.0, "name": "C"},
                    {"index": "first", "name": "D"}
                ]),
            )
            .unwrap();
        cache
            .put("category_ratings", &json!([{"name": "A", "categories": {"Plot": 8, "Pacing": "7"}}]))
            .unwrap();

        let data = cache.dataset().unwrap();
        assert_eq!(data.anime.len(), 4);
        assert_eq!(data.anime[1].index, Some(2));
        assert_eq!(data.anime[2].index, Some(3));
        assert_eq!(data.anime[3].index, None);
        assert_eq!(data.category_ratings.len(), 1);
        assert_eq!(data.category_ratings[0].categories["Pacing"], 7.0);

        let added = cache.add_entry(CatalogEntry::new("E"), now()).unwrap();
        assert_eq!(added.index, Some(4));
    }

    #[test]
    fn test_import_rejects_non_object() {
        let mut cache = seeded();
        assert!(cache.import(&json!([1, 2])).is_err());
        // Cache untouched on rejection
        assert!(cache.contains("anime").unwrap());
    }

    #[test]
    fn test_clear_all() {
        let mut cache = seeded();
        cache.set_last_updated("x").unwrap();
        assert_eq!(cache.clear_all().unwrap(), 3);
        assert!(!cache.contains("anime").unwrap());
        assert_eq!(cache.last_updated().unwrap(), None);
    }
}
