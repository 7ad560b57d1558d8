//! Ordered multi-valued metadata travelling with every work item
//!
//! Metadata is the only channel between the classifiers, the resolver and the
//! scheduler, and it is persisted by the crawl-state store between revisits.
//! Key names in [`keys`] are part of that persisted contract.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Metadata key names shared with the persisted crawl state.
pub mod keys {
    pub const IS_SITEMAP: &str = "isSitemap";
    pub const IS_SITEMAP_NEWS: &str = "isSitemapNews";
    pub const IS_SITEMAP_INDEX: &str = "isSitemapIndex";
    /// A sitemap (not necessarily a news sitemap) reached through a verified
    /// news sitemap index.
    pub const IS_SITEMAP_VERIFIED: &str = "isSitemapVerified";
    pub const IS_FEED: &str = "isFeed";

    pub const SIGNATURE: &str = "signature";
    pub const SIGNATURE_OLD: &str = "signatureOld";
    pub const FETCH_INTERVAL: &str = "fetchInterval";
    pub const SIGNATURE_CHANGE_DATE: &str = "signatureChangeDate";

    pub const NUM_LINKS: &str = "numLinks";
    pub const ERROR_SOURCE: &str = "error.source";
    pub const ERROR_MESSAGE: &str = "error.message";

    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const LAST_MODIFIED: &str = "Last-Modified";
    pub const FETCH_STATUS_CODE: &str = "fetch.statusCode";
    /// Minutes to wait before fetching a newly discovered URL
    pub const DELAY: &str = "delay";
    pub const DEPTH: &str = "depth";
    pub const URL_PATH: &str = "url.path";
}

/// Ordered mapping from key to a list of values.
///
/// Keys are unique and keep their first insertion position; values keep the
/// order in which they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, Vec<String>)>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// First value stored under `key`
    pub fn get_first(&self, key: &str) -> Option<&str> {
        self.position(key)
            .and_then(|i| self.entries[i].1.first())
            .map(String::as_str)
    }

    /// All values stored under `key` (empty if absent)
    pub fn values(&self, key: &str) -> &[String] {
        match self.position(key) {
            Some(i) => &self.entries[i].1,
            None => &[],
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Replace all values of `key` with a single value
    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set_values(key, vec![value.into()]);
    }

    /// Replace all values of `key`. An empty list removes the key.
    pub fn set_values(&mut self, key: impl Into<String>, values: Vec<String>) {
        let key = key.into();
        if values.is_empty() {
            self.remove(&key);
            return;
        }
        match self.position(&key) {
            Some(i) => self.entries[i].1 = values,
            None => self.entries.push((key, values)),
        }
    }

    /// Append a value to `key`, creating the key if needed
    pub fn add_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        match self.position(&key) {
            Some(i) => self.entries[i].1.push(value.into()),
            None => self.entries.push((key, vec![value.into()])),
        }
    }

    /// Remove `key`, returning its values
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }

    /// Boolean view of the first value: `"true"` (any case) is true,
    /// anything else or absence is false.
    pub fn flag(&self, key: &str) -> bool {
        self.get_first(key)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    pub fn set_flag(&mut self, key: impl Into<String>, value: bool) {
        self.set_value(key, if value { "true" } else { "false" });
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut md = Metadata::new();
        for (k, v) in iter {
            md.add_value(k, v);
        }
        md
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{k}: {}", v.join(", "))?;
        }
        Ok(())
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// A persisted value is either a single string or a list of strings
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

struct MetadataVisitor;

impl<'de> Visitor<'de> for MetadataVisitor {
    type Value = Metadata;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of string keys to a string or a list of strings")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Metadata, A::Error> {
        let mut md = Metadata::new();
        while let Some((key, value)) = access.next_entry::<String, OneOrMany>()? {
            match value {
                OneOrMany::One(v) => md.add_value(key, v),
                OneOrMany::Many(vs) => {
                    for v in vs {
                        md.add_value(key.clone(), v);
                    }
                }
            }
        }
        Ok(md)
    }
}

impl<'de> Deserialize<'de> for Metadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(MetadataVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_value_replaces_all_values() {
        let mut md = Metadata::new();
        md.add_value("k", "a");
        md.add_value("k", "b");
        md.set_value("k", "c");
        assert_eq!(md.values("k"), &["c".to_string()]);
    }

    #[test]
    fn add_value_preserves_order() {
        let mut md = Metadata::new();
        md.add_value("k", "1");
        md.add_value("k", "2");
        md.add_value("k", "3");
        assert_eq!(md.get_first("k"), Some("1"));
        assert_eq!(md.values("k").len(), 3);
        assert_eq!(md.values("k")[2], "3");
    }

    #[test]
    fn keys_keep_insertion_order() {
        let md: Metadata = [("b", "1"), ("a", "2"), ("c", "3"), ("a", "4")]
            .into_iter()
            .collect();
        let keys: Vec<&str> = md.keys().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(md.values("a"), &["2".to_string(), "4".to_string()]);
    }

    #[test]
    fn remove_returns_values() {
        let mut md: Metadata = [("k", "v")].into_iter().collect();
        assert_eq!(md.remove("k"), Some(vec!["v".to_string()]));
        assert!(md.remove("k").is_none());
        assert!(md.is_empty());
    }

    #[test]
    fn empty_set_values_removes_key() {
        let mut md: Metadata = [("k", "v")].into_iter().collect();
        md.set_values("k", Vec::new());
        assert!(!md.contains_key("k"));
    }

    #[test]
    fn flag_is_case_insensitive() {
        let mut md = Metadata::new();
        assert!(!md.flag(keys::IS_SITEMAP));
        md.set_value(keys::IS_SITEMAP, "TRUE");
        assert!(md.flag(keys::IS_SITEMAP));
        md.set_value(keys::IS_SITEMAP, "yes");
        assert!(!md.flag(keys::IS_SITEMAP));
        md.set_flag(keys::IS_SITEMAP, true);
        assert_eq!(md.get_first(keys::IS_SITEMAP), Some("true"));
    }

    #[test]
    fn json_keeps_key_order() {
        let mut md = Metadata::new();
        md.set_value("z", "1");
        md.add_value("a", "x");
        md.add_value("a", "y");
        let json = serde_json::to_string(&md).unwrap();
        assert_eq!(json, r#"{"z":["1"],"a":["x","y"]}"#);

        let back: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, md);
    }

    #[test]
    fn json_accepts_single_string_values() {
        let md: Metadata = serde_json::from_str(r#"{"signature":"abc","depth":["1"]}"#).unwrap();
        assert_eq!(md.get_first("signature"), Some("abc"));
        assert_eq!(md.get_first("depth"), Some("1"));
    }

    #[test]
    fn display_lists_all_entries() {
        let md: Metadata = [("a", "1"), ("a", "2"), ("b", "3")].into_iter().collect();
        assert_eq!(md.to_string(), "a: 1, 2; b: 3");
    }
}
