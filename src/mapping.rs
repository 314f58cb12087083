//! Collection mapping as stored in the device's `collections.json`.
//!
//! The document is a JSON object keyed by collection name, each value holding
//! an ordered `items` list of item identifiers:
//!
//! ```json
//! {"Physics@en-US":{"items":["#B005X0JVWI^EBOK","*9fcaa2f0cdad581f95cbb402b2c59e0b8e808b08"]}}
//! ```
//!
//! Keys keep their insertion order so that a mapping read from disk and
//! written back is stable. Fields other than `items` that the device stores
//! on a collection are carried through untouched.

use crate::item_id::ItemId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

/// Errors raised while reading, parsing or persisting a mapping.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("failed to read mapping file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid mapping file {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("failed to serialize mapping: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("destination directory does not exist: {}", path.display())]
    DestinationMissing { path: PathBuf },
    #[error("failed to back up {} to {}: {source}", from.display(), to.display())]
    Backup {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write mapping file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for mapping operations.
pub type MappingResult<T> = Result<T, MappingError>;

/// A single collection: an ordered list of item identifiers.
///
/// Duplicates are kept as they come.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub items: Vec<ItemId>,
    /// Additional device fields such as `lastAccess`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Collection {
    pub fn with_items<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ItemId>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
            extra: Map::new(),
        }
    }
}

/// Mapping from collection name to collection, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionMapping {
    collections: IndexMap<String, Collection>,
}

impl CollectionMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    /// Inserts or replaces a collection.
    pub fn insert(&mut self, name: impl Into<String>, collection: Collection) {
        self.collections.insert(name.into(), collection);
    }

    /// Returns the named collection, creating an empty one if absent.
    ///
    /// An existing collection keeps its items.
    pub fn collection_mut(&mut self, name: &str) -> &mut Collection {
        self.collections.entry(name.to_string()).or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Collection)> {
        self.collections.iter()
    }

    /// Total number of item entries over all collections, duplicates included.
    pub fn total_items(&self) -> usize {
        self.collections.values().map(|c| c.items.len()).sum()
    }

    /// Parses a mapping from `collections.json` text.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the mapping in the compact form the device writes.
    pub fn to_json_string(&self) -> MappingResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Loads a mapping from disk.
    ///
    /// # Errors
    ///
    /// Returns `MappingError::Read` if the file cannot be read and
    /// `MappingError::Parse` if it is not a valid mapping document.
    pub fn load(path: &Path) -> MappingResult<Self> {
        let json = fs::read_to_string(path).map_err(|e| MappingError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_json_str(&json).map_err(|e| MappingError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Loads a mapping, degrading to an empty one if the file is missing or
    /// corrupt. The failure is logged.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(mapping) => {
                info!(
                    "Read base mapping {}: {} collections",
                    path.display(),
                    mapping.len()
                );
                mapping
            }
            Err(e) => {
                error!("{}; continuing with an empty mapping", e);
                Self::new()
            }
        }
    }

    /// Builds the human-facing view of every collection and where its items
    /// came from.
    pub fn listing(&self, index: &IdentifierIndex) -> Vec<CollectionListing> {
        self.collections
            .iter()
            .map(|(name, collection)| CollectionListing {
                name: name.clone(),
                items: collection
                    .items
                    .iter()
                    .map(|id| {
                        let origin = match index.path_of(id) {
                            Some(path) => ItemOrigin::Scanned(path.to_string()),
                            None => ItemOrigin::Preconfigured,
                        };
                        (id.clone(), origin)
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Computes the items of `reference` that are missing from `current`.
///
/// A collection absent from `current` is copied whole. A collection present
/// in both contributes only its missing items and is left out when nothing
/// is missing. Collections that exist only in `current` are never reported.
pub fn diff(reference: &CollectionMapping, current: &CollectionMapping) -> CollectionMapping {
    let mut missing = CollectionMapping::new();

    for (name, collection) in reference.iter() {
        let Some(current_collection) = current.get(name) else {
            missing.insert(name.clone(), collection.clone());
            continue;
        };

        let present: HashSet<&ItemId> = current_collection.items.iter().collect();
        let items: Vec<ItemId> = collection
            .items
            .iter()
            .filter(|id| !present.contains(id))
            .cloned()
            .collect();

        if !items.is_empty() {
            missing.insert(
                name.clone(),
                Collection {
                    items,
                    extra: Map::new(),
                },
            );
        }
    }

    missing
}

/// Reverse lookup from item identifier to the file it was derived from.
///
/// Only used for reporting; it is never persisted.
#[derive(Debug, Clone, Default)]
pub struct IdentifierIndex {
    paths: HashMap<ItemId, String>,
}

impl IdentifierIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the origin of an identifier. A later file overwrites an earlier
    /// one.
    pub fn record(&mut self, id: ItemId, path: &str) {
        self.paths.insert(id, path.to_string());
    }

    pub fn path_of(&self, id: &ItemId) -> Option<&str> {
        self.paths.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Where an item in a listing came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOrigin {
    /// Derived from a file found during this scan.
    Scanned(String),
    /// Present in the base mapping with no file seen in this run.
    Preconfigured,
}

/// One collection of the reporting view.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionListing {
    pub name: String,
    pub items: Vec<(ItemId, ItemOrigin)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn mapping(json: &str) -> CollectionMapping {
        CollectionMapping::from_json_str(json).unwrap()
    }

    #[test]
    fn test_parse_preserves_order_and_duplicates() {
        let m = mapping(r#"{"Z@en-US":{"items":["a","a"]},"A@en-US":{"items":["b"]}}"#);
        let names: Vec<_> = m.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["Z@en-US", "A@en-US"]);
        assert_eq!(m.get("Z@en-US").unwrap().items.len(), 2);
        assert_eq!(m.total_items(), 3);
    }

    #[test]
    fn test_serialized_shape() {
        let mut m = CollectionMapping::new();
        m.insert("Physics@en-US", Collection::with_items(["#1^x", "*ab"]));
        assert_eq!(
            m.to_json_string().unwrap(),
            r##"{"Physics@en-US":{"items":["#1^x","*ab"]}}"##
        );
    }

    #[test]
    fn test_extra_device_fields_survive() {
        let json = r#"{"A@en-US":{"items":["x"],"lastAccess":1320969600000}}"#;
        let m = mapping(json);
        assert_eq!(m.to_json_string().unwrap(), json);
    }

    #[test]
    fn test_collection_mut_keeps_existing_items() {
        let mut m = mapping(r#"{"A@en-US":{"items":["x"]}}"#);
        m.collection_mut("A@en-US").items.push(ItemId::new("y"));
        m.collection_mut("B@en-US");

        assert_eq!(m.get("A@en-US").unwrap().items, vec![ItemId::new("x"), ItemId::new("y")]);
        assert!(m.get("B@en-US").unwrap().items.is_empty());
    }

    #[test]
    fn test_diff_reports_missing_items() {
        let reference = mapping(
            r##"{"A@en-US":{"items":["#1^x","#2^y"]},"B@en-US":{"items":["#3^z"]}}"##,
        );
        let current = mapping(r##"{"A@en-US":{"items":["#1^x"]}}"##);

        let missing = diff(&reference, &current);
        assert_eq!(
            missing.to_json_string().unwrap(),
            r##"{"A@en-US":{"items":["#2^y"]},"B@en-US":{"items":["#3^z"]}}"##
        );
    }

    #[test]
    fn test_diff_omits_fully_present_collections() {
        let reference = mapping(r#"{"A@en-US":{"items":["b","a"]}}"#);
        let current = mapping(r#"{"A@en-US":{"items":["a","b","c"]},"C@en-US":{"items":["q"]}}"#);

        assert!(diff(&reference, &current).is_empty());
    }

    #[test]
    fn test_diff_copies_absent_collection_verbatim() {
        let reference = mapping(r#"{"B@en-US":{"items":["z","z"],"lastAccess":5}}"#);
        let missing = diff(&reference, &CollectionMapping::new());
        assert_eq!(missing.get("B@en-US"), reference.get("B@en-US"));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = CollectionMapping::load(&temp_dir.path().join("nope.json"));
        assert!(matches!(result, Err(MappingError::Read { .. })));
    }

    #[test]
    fn test_load_corrupt_file_degrades_to_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("collections.json");
        fs::write(&path, "{not json").expect("Failed to write file");

        assert!(matches!(
            CollectionMapping::load(&path),
            Err(MappingError::Parse { .. })
        ));
        assert!(CollectionMapping::load_or_empty(&path).is_empty());
    }

    #[test]
    fn test_listing_marks_preconfigured_items() {
        let m = mapping(r#"{"A@en-US":{"items":["old","new"]}}"#);
        let mut index = IdentifierIndex::new();
        index.record(ItemId::new("new"), "documents/A/first.pdf");
        index.record(ItemId::new("new"), "documents/A/second.pdf");

        let listing = m.listing(&index);
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, "A@en-US");
        assert_eq!(
            listing[0].items,
            vec![
                (ItemId::new("old"), ItemOrigin::Preconfigured),
                (
                    ItemId::new("new"),
                    ItemOrigin::Scanned("documents/A/second.pdf".to_string())
                ),
            ]
        );
    }
}
