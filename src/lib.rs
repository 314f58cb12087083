//! kindle_collections - Automatic collection management for e-readers
//!
//! This library scans the documents on a mounted e-reader, assigns them to
//! named collections using configurable regex rules (or their directory when
//! no rule applies), and maintains the device's `collections.json`: merging
//! into an existing mapping, diffing two mappings, and writing the result with
//! a dated backup of the previous file.

pub mod classifier;
pub mod cli;
pub mod collection_rules;
pub mod config;
pub mod item_id;
pub mod mapping;
pub mod output;
pub mod scan;
pub mod writer;

pub use classifier::{ClassifyReport, Classifier, ScanEntry, classify_files};
pub use collection_rules::{CollectionRule, RuleEntry, RuleSet};
pub use config::{AppConfig, CompiledConfig, ConfigError};
pub use item_id::{ItemId, derive_item_id};
pub use mapping::{Collection, CollectionMapping, IdentifierIndex, MappingError, diff};
pub use writer::{WriteOutcome, write_mapping};

pub use cli::{Cli, CliError, run_cli};
