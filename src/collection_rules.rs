/// Rule-based assignment of documents to collections.
///
/// A rule set is an ordered list of collections, each carrying an ordered list
/// of entries. An entry is either a regular expression tested against the
/// document's relative path, or the `else` marker which makes that collection
/// the catch-all for documents no other rule claimed.
///
/// # Examples
///
/// ```
/// use kindle_collections::collection_rules::{CollectionRule, RuleEntry, RuleSet};
///
/// let rules = RuleSet::compile(&[
///     CollectionRule::new("Physics", vec![RuleEntry::pattern("(?i)physics")]),
///     CollectionRule::new("Unsorted", vec![RuleEntry::else_marker()]),
/// ])
/// .unwrap();
///
/// assert_eq!(
///     rules.match_collections("documents/physics/qed.pdf", "en-US"),
///     vec!["Physics@en-US".to_string()]
/// );
/// assert_eq!(
///     rules.match_collections("documents/novel.txt", "en-US"),
///     vec!["Unsorted@en-US".to_string()]
/// );
/// ```
use crate::config::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One entry of a collection rule as written in the configuration file.
///
/// In TOML a pattern is a plain string and the marker is `{ else = true }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleEntry {
    /// Regular expression matched against the relative path.
    Pattern(String),
    /// Catch-all marker.
    Else(ElseMarker),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElseMarker {
    #[serde(rename = "else")]
    pub enabled: bool,
}

impl RuleEntry {
    pub fn pattern(pattern: impl Into<String>) -> Self {
        RuleEntry::Pattern(pattern.into())
    }

    pub fn else_marker() -> Self {
        RuleEntry::Else(ElseMarker { enabled: true })
    }
}

/// Configured rule for a single collection label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRule {
    /// Collection label without the locale suffix.
    pub name: String,
    #[serde(default)]
    pub patterns: Vec<RuleEntry>,
}

impl CollectionRule {
    pub fn new(name: impl Into<String>, patterns: Vec<RuleEntry>) -> Self {
        Self {
            name: name.into(),
            patterns,
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    label: String,
    patterns: Vec<Regex>,
    is_fallback: bool,
}

/// Immutable, pre-compiled rule set.
///
/// Patterns are compiled once in [`RuleSet::compile`] and reused for every
/// file of a run.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compiles the configured rules, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRegexPattern` naming the rule and pattern
    /// for the first pattern that fails to compile.
    pub fn compile(rules: &[CollectionRule]) -> Result<Self, ConfigError> {
        let rules = rules
            .iter()
            .map(|rule| {
                let mut patterns = Vec::new();
                let mut is_fallback = false;
                for entry in &rule.patterns {
                    match entry {
                        RuleEntry::Pattern(pattern) => {
                            let regex = Regex::new(pattern).map_err(|e| {
                                ConfigError::InvalidRegexPattern {
                                    rule: rule.name.clone(),
                                    pattern: pattern.clone(),
                                    reason: e.to_string(),
                                }
                            })?;
                            patterns.push(regex);
                        }
                        RuleEntry::Else(marker) => is_fallback |= marker.enabled,
                    }
                }
                Ok(CompiledRule {
                    label: rule.name.clone(),
                    patterns,
                    is_fallback,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns the collections a path belongs to, in rule order.
    ///
    /// Each rule contributes at most once, on its first matching pattern.
    /// When no pattern of any rule matched, the first rule carrying an `else`
    /// marker becomes the only result. An empty result means the caller
    /// should apply [`default_collection`].
    pub fn match_collections(&self, relative_path: &str, locale: &str) -> Vec<String> {
        let matched: Vec<String> = self
            .rules
            .iter()
            .filter(|rule| rule.patterns.iter().any(|re| re.is_match(relative_path)))
            .map(|rule| collection_name(&rule.label, locale))
            .collect();

        if !matched.is_empty() {
            return matched;
        }

        self.rules
            .iter()
            .find(|rule| rule.is_fallback)
            .map(|rule| vec![collection_name(&rule.label, locale)])
            .unwrap_or_default()
    }
}

/// Builds the `<label>@<locale>` key used in `collections.json`.
pub fn collection_name(label: &str, locale: &str) -> String {
    format!("{}@{}", label, locale)
}

/// Derives a collection from the directory layout.
///
/// `documents/Physics/book.pdf` belongs to `Physics@<locale>`. Paths with two
/// or fewer segments have no default collection.
pub fn default_collection(relative_path: &str, locale: &str) -> Option<String> {
    let mut segments: Vec<&str> = relative_path.split(['/', '\\']).collect();
    while segments.last().is_some_and(|s| s.is_empty()) {
        segments.pop();
    }

    if segments.len() > 2 {
        Some(collection_name(segments[1], locale))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str, entries: &[RuleEntry]) -> CollectionRule {
        CollectionRule::new(name, entries.to_vec())
    }

    #[test]
    fn test_first_match_per_rule() {
        let rules = RuleSet::compile(&[rule(
            "Physics",
            &[RuleEntry::pattern("physics"), RuleEntry::pattern("qed")],
        )])
        .unwrap();

        assert_eq!(
            rules.match_collections("documents/physics/qed.pdf", "en-US"),
            vec!["Physics@en-US"]
        );
    }

    #[test]
    fn test_path_can_belong_to_several_collections() {
        let rules = RuleSet::compile(&[
            rule("Physics", &[RuleEntry::pattern("physics")]),
            rule("Feynman", &[RuleEntry::pattern("(?i)feynman")]),
            rule("Poetry", &[RuleEntry::pattern("poem")]),
        ])
        .unwrap();

        assert_eq!(
            rules.match_collections("documents/physics/Feynman Lectures.pdf", "de-DE"),
            vec!["Physics@de-DE", "Feynman@de-DE"]
        );
    }

    #[test]
    fn test_literal_match_beats_else() {
        let rules = RuleSet::compile(&[
            rule("B", &[RuleEntry::else_marker()]),
            rule("A", &[RuleEntry::pattern(r"\.pdf$")]),
        ])
        .unwrap();

        assert_eq!(
            rules.match_collections("documents/book.pdf", "en-US"),
            vec!["A@en-US"]
        );
        assert_eq!(
            rules.match_collections("documents/book.txt", "en-US"),
            vec!["B@en-US"]
        );
    }

    #[test]
    fn test_first_else_wins() {
        let rules = RuleSet::compile(&[
            rule("First", &[RuleEntry::pattern("never"), RuleEntry::else_marker()]),
            rule("Second", &[RuleEntry::else_marker()]),
        ])
        .unwrap();

        assert_eq!(
            rules.match_collections("documents/book.txt", "en-US"),
            vec!["First@en-US"]
        );
    }

    #[test]
    fn test_disabled_else_marker_is_ignored() {
        let rules = RuleSet::compile(&[rule(
            "Nope",
            &[RuleEntry::Else(ElseMarker { enabled: false })],
        )])
        .unwrap();

        assert!(rules.match_collections("documents/book.txt", "en-US").is_empty());
    }

    #[test]
    fn test_no_rules_matches_nothing() {
        let rules = RuleSet::default();
        assert!(rules.is_empty());
        assert!(rules.match_collections("documents/a/b.pdf", "en-US").is_empty());
    }

    #[test]
    fn test_invalid_pattern_names_rule() {
        let err = RuleSet::compile(&[rule("Broken", &[RuleEntry::pattern("[invalid(")])])
            .unwrap_err();

        match err {
            ConfigError::InvalidRegexPattern { rule, pattern, .. } => {
                assert_eq!(rule, "Broken");
                assert_eq!(pattern, "[invalid(");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_default_collection_uses_second_segment() {
        assert_eq!(
            default_collection("documents/Physics/book.pdf", "en-US"),
            Some("Physics@en-US".to_string())
        );
        assert_eq!(
            default_collection(r"documents\Physics\deep\book.pdf", "fr-FR"),
            Some("Physics@fr-FR".to_string())
        );
    }

    #[test]
    fn test_default_collection_requires_three_segments() {
        assert_eq!(default_collection("book.pdf", "en-US"), None);
        assert_eq!(default_collection("documents/book.pdf", "en-US"), None);
        assert_eq!(default_collection("documents/book.pdf/", "en-US"), None);
    }

    #[test]
    fn test_rule_entries_deserialize_from_toml() {
        let rule: CollectionRule = toml::from_str(
            r#"
            name = "Physics"
            patterns = ["physics", { else = true }]
            "#,
        )
        .unwrap();

        assert_eq!(
            rule.patterns,
            vec![RuleEntry::pattern("physics"), RuleEntry::else_marker()]
        );
    }
}
