/// Assignment of scanned documents to collections.
///
/// The classifier walks a flat list of scan entries, asks the rule set which
/// collections each document belongs to, falls back to the directory layout
/// when no rule applies, and appends the document's item identifier to every
/// resulting collection of the mapping.
///
/// The mapping is never deduplicated: classifying the same files twice into
/// one mapping lists their identifiers twice, and identifiers already present
/// in a base mapping are appended again.
use crate::collection_rules::{RuleSet, default_collection};
use crate::item_id::derive_item_id;
use crate::mapping::{CollectionMapping, IdentifierIndex};
use tracing::{debug, info};

/// One entry produced by the directory walker, relative to the scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub relative_path: String,
    pub is_dir: bool,
}

impl ScanEntry {
    pub fn file(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            is_dir: false,
        }
    }

    pub fn dir(relative_path: impl Into<String>) -> Self {
        Self {
            relative_path: relative_path.into(),
            is_dir: true,
        }
    }
}

/// Counters describing one classification pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifyReport {
    /// Files considered. Directories are not counted.
    pub scanned: usize,
    /// Files placed in at least one collection.
    pub classified: usize,
    /// Files that ended up in no collection.
    pub dropped: usize,
    /// Item entries appended to the mapping.
    pub assignments: usize,
}

/// Classifies documents with a compiled rule set and a locale.
pub struct Classifier<'a> {
    rules: &'a RuleSet,
    locale: &'a str,
}

impl<'a> Classifier<'a> {
    pub fn new(rules: &'a RuleSet, locale: &'a str) -> Self {
        Self { rules, locale }
    }

    /// Collections a single document belongs to.
    ///
    /// Rule matches take precedence; otherwise the directory-derived default
    /// applies. An empty result means the document is in no collection.
    pub fn collections_for(&self, relative_path: &str) -> Vec<String> {
        let matched = self.rules.match_collections(relative_path, self.locale);
        if !matched.is_empty() {
            return matched;
        }
        default_collection(relative_path, self.locale)
            .into_iter()
            .collect()
    }

    /// Classifies `entries` into `mapping`, recording identifier origins in
    /// `index`. Both are mutated in place.
    pub fn classify(
        &self,
        mapping: &mut CollectionMapping,
        index: &mut IdentifierIndex,
        entries: &[ScanEntry],
    ) -> ClassifyReport {
        self.classify_with_progress(mapping, index, entries, |_| {})
    }

    /// Same as [`Classifier::classify`], calling `on_file` after each file.
    pub fn classify_with_progress<F>(
        &self,
        mapping: &mut CollectionMapping,
        index: &mut IdentifierIndex,
        entries: &[ScanEntry],
        mut on_file: F,
    ) -> ClassifyReport
    where
        F: FnMut(&ScanEntry),
    {
        let mut report = ClassifyReport::default();

        for entry in entries.iter().filter(|e| !e.is_dir) {
            report.scanned += 1;
            let path = entry.relative_path.as_str();
            let collections = self.collections_for(path);

            if collections.is_empty() {
                debug!("{} :: no collection", path);
                report.dropped += 1;
                on_file(entry);
                continue;
            }

            let id = derive_item_id(path);
            for collection in &collections {
                debug!("{} :: {} << {}", path, collection, id);
                mapping.collection_mut(collection).items.push(id.clone());
                index.record(id.clone(), path);
                report.assignments += 1;
            }
            report.classified += 1;
            on_file(entry);
        }

        info!(
            "Scanned {} files, classified {}, collections: {}",
            report.scanned,
            report.classified,
            mapping.len()
        );

        report
    }
}

/// Classifies `entries` on top of `base` and returns the resulting mapping
/// together with the identifier index.
pub fn classify_files(
    base: CollectionMapping,
    rules: &RuleSet,
    locale: &str,
    entries: &[ScanEntry],
) -> (CollectionMapping, IdentifierIndex, ClassifyReport) {
    let mut mapping = base;
    let mut index = IdentifierIndex::new();
    let report = Classifier::new(rules, locale).classify(&mut mapping, &mut index, entries);
    (mapping, index, report)
}
