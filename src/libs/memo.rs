//! Per-request memoization of query results.
//!
//! The cache lives as long as the request that owns it and is passed by
//! reference to whichever code path repeats lookups. Writes made during the
//! request are not reflected in cached entries.

use crate::libs::table::Row;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct RequestCache {
    entries: HashMap<(String, String), Vec<Row>>,
    hits: usize,
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters are keyed by their JSON rendering, so `["ab", "c"]` and
    /// `["a", "bc"]` never collide.
    fn key(function: &str, params: &[Value]) -> (String, String) {
        let args = Value::Array(params.to_vec()).to_string();
        (function.to_string(), args)
    }

    pub fn get(&mut self, function: &str, params: &[Value]) -> Option<&[Row]> {
        let entry = self.entries.get(&Self::key(function, params));
        if entry.is_some() {
            self.hits += 1;
        }
        entry.map(Vec::as_slice)
    }

    pub fn insert(&mut self, function: &str, params: &[Value], rows: Vec<Row>) {
        self.entries.insert(Self::key(function, params), rows);
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn role_rows() -> Vec<Row> {
        vec![[("ID", json!(1)), ("Role", json!("Dispatcher"))].into_iter().collect()]
    }

    #[test]
    fn stores_and_returns_rows() {
        let mut cache = RequestCache::new();
        let params = [json!("Police")];
        assert!(cache.get("roles", &params).is_none());

        cache.insert("roles", &params, role_rows());
        assert_eq!(cache.get("roles", &params).unwrap(), role_rows().as_slice());
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn keys_do_not_collide_on_concatenation() {
        let mut cache = RequestCache::new();
        cache.insert("q", &[json!("ab"), json!("c")], role_rows());
        assert!(cache.get("q", &[json!("a"), json!("bc")]).is_none());
        assert!(cache.get("other", &[json!("ab"), json!("c")]).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_empties_cache() {
        let mut cache = RequestCache::new();
        cache.insert("q", &[], role_rows());
        cache.clear();
        assert!(cache.is_empty());
    }
}
