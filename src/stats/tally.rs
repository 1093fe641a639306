use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Values per key, remembering the order keys were first seen. Plain counts
/// by default.
#[derive(Debug, Clone, PartialEq)]
pub struct Tally<V = u64> {
    order: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> Default for Tally<V> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> Tally<V> {
    /// Value for `key`, inserted as `V::default()` on first sight.
    pub fn entry(&mut self, key: &str) -> &mut V
    where
        V: Default,
    {
        let i = match self.index.get(key) {
            Some(&i) => i,
            None => {
                let i = self.order.len();
                self.index.insert(key.to_string(), i);
                self.order.push((key.to_string(), V::default()));
                i
            }
        };
        &mut self.order[i].1
    }

    pub fn value(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&i| &self.order[i].1)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in first-seen order.
    pub fn into_entries(self) -> Vec<(String, V)> {
        self.order
    }
}

impl Tally<u64> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str) {
        self.add_n(key, 1);
    }

    pub fn add_n(&mut self, key: &str, n: u64) {
        *self.entry(key) += n;
    }

    pub fn get(&self, key: &str) -> u64 {
        self.value(key).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.order.iter().map(|(_, n)| n).sum()
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.order.iter().map(|(k, n)| (k.as_str(), *n))
    }

    /// Entries by descending count; equal counts keep first-seen order.
    pub fn by_count(&self) -> Vec<(String, u64)> {
        let mut v = self.order.clone();
        v.sort_by(|a, b| b.1.cmp(&a.1));
        v
    }
}

impl<V: Serialize> Serialize for Tally<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.order.len()))?;
        for (k, n) in &self.order {
            map.serialize_entry(k, n)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_order() {
        let mut t = Tally::new();
        for k in ["TV", "Movie", "TV", "OVA", "Movie", "TV"] {
            t.add(k);
        }
        assert_eq!(t.get("TV"), 3);
        assert_eq!(t.get("Special"), 0);
        assert_eq!(t.total(), 6);
        let keys: Vec<&str> = t.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["TV", "Movie", "OVA"]);
    }

    #[test]
    fn test_by_count_is_stable() {
        let mut t = Tally::new();
        t.add("b");
        t.add("a");
        t.add_n("c", 5);
        let sorted: Vec<String> = t.by_count().into_iter().map(|(k, _)| k).collect();
        assert_eq!(sorted, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_custom_values_keep_first_seen_order() {
        let mut t: Tally<Vec<u32>> = Tally::default();
        t.entry("b").push(1);
        t.entry("a").push(2);
        t.entry("b").push(3);
        assert_eq!(t.value("b"), Some(&vec![1, 3]));
        assert_eq!(
            t.into_entries(),
            vec![("b".to_string(), vec![1, 3]), ("a".to_string(), vec![2])]
        );
    }

    #[test]
    fn test_serializes_in_order() {
        let mut t = Tally::new();
        t.add("z");
        t.add("a");
        assert_eq!(serde_json::to_string(&t).unwrap(), r#"{"z":1,"a":1}"#);
    }
}
