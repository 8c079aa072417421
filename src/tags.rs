//! Sorted, unique string tags
//!
//! Tags are set once when a logger is built (env, host, service...) and
//! shared read-only by every record through an `Arc`.

use std::collections::BTreeMap;

/// Key-sorted tag set with binary-search lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    items: Vec<(String, String)>,
}

impl Tags {
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build from any key/value iterator; later duplicates win
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            items: map.into_iter().collect(),
        }
    }

    /// Insert or replace, keeping order
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.items.binary_search_by(|(k, _)| k.as_str().cmp(&key)) {
            Ok(idx) => self.items[idx].1 = value,
            Err(idx) => self.items.insert(idx, (key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.items
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|idx| self.items[idx].1.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
