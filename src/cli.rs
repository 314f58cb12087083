//! Command-line interface module for kindle-collections.
//!
//! This module handles all CLI-related functionality including:
//! - Argument definitions and configuration overrides
//! - Scanning and classification orchestration
//! - Printing the configuration, a diff or the collection listing
//! - Writing the device's `collections.json`

use crate::classifier::Classifier;
use crate::config::{AppConfig, ConfigError};
use crate::mapping::{self, CollectionMapping, IdentifierIndex, MappingError};
use crate::output::OutputFormatter;
use crate::scan::scan_subdirs;
use crate::writer::write_mapping;
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

/// Command-line arguments.
#[derive(Debug, Default, Parser)]
#[command(
    name = "kindle-collections",
    version,
    about = "Automatically manage kindle collections"
)]
pub struct Cli {
    /// Kindle base directory
    #[arg(short = 'd', long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Re-use an existing collections.json as the base mapping
    #[arg(short = 'j', long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Kindle version (only 2 is supported)
    #[arg(short = 'k', long = "kindle", value_name = "VERSION")]
    pub kindle_version: Option<u32>,

    /// Register only files matching this regular expression
    #[arg(short = 'p', long, value_name = "REGEXP")]
    pub pattern: Option<String>,

    /// Add a sub-directory to scan
    #[arg(short = 's', long = "subdir", value_name = "DIR")]
    pub subdirs: Vec<String>,

    /// Locale suffix for collection names
    #[arg(short = 'l', long, value_name = "LOCALE")]
    pub locale: Option<String>,

    /// Configuration file
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the configuration and exit
    #[arg(long)]
    pub print_config: bool,

    /// Print entries in a JSON file that are not included in a current scan
    #[arg(long, value_name = "JSON")]
    pub print_diff: Option<PathBuf>,

    /// List every collection with its items instead of writing
    #[arg(long, conflicts_with = "print_diff")]
    pub list: bool,

    /// Show debug messages
    #[arg(long)]
    pub debug: bool,

    /// Run verbosely
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Log level selected by the verbosity flags.
    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }

    /// Applies command-line overrides on top of the loaded configuration.
    ///
    /// `--subdir` adds to the configured subdirectories.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.dir {
            config.dir = dir.clone();
        }
        if let Some(json) = &self.json {
            config.base_json = json.to_string_lossy().to_string();
        }
        if let Some(version) = self.kindle_version {
            config.kindle_version = version;
        }
        if let Some(pattern) = &self.pattern {
            config.include_pattern = pattern.clone();
        }
        if let Some(locale) = &self.locale {
            config.locale = locale.clone();
        }
        config.subdirs.extend(self.subdirs.iter().cloned());
    }
}

/// Errors surfaced to the user by a run.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error("JSON file does not exist: {}", .0.display())]
    ReferenceMissing(PathBuf),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(_) => 5,
            _ => 1,
        }
    }
}

/// Runs one scan-and-classify pass and performs the requested action.
///
/// Machine-readable output (configuration, diff, listing) goes to `out`.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use kindle_collections::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["kindle-collections", "--dir", "/media/kindle"]);
/// if let Err(e) = run_cli(&cli, &mut std::io::stdout()) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(cli: &Cli, out: &mut dyn Write) -> Result<(), CliError> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    debug!("config: {:?}", config);

    if cli.print_config {
        write!(out, "{}", config.to_toml_string()?)?;
        return Ok(());
    }

    let compiled = config.compile()?;
    let mut mapping = config
        .base_json_path()
        .map(CollectionMapping::load_or_empty)
        .unwrap_or_default();

    let entries = scan_subdirs(
        &config.dir,
        &config.subdirs,
        &compiled.include,
        config.include_hidden,
    );

    let mut index = IdentifierIndex::new();
    let files = entries.iter().filter(|e| !e.is_dir).count();
    let progress = OutputFormatter::create_progress_bar(files as u64);
    let report = Classifier::new(&compiled.rules, &compiled.locale).classify_with_progress(
        &mut mapping,
        &mut index,
        &entries,
        |_| progress.inc(1),
    );
    progress.finish_and_clear();
    info!("Collections: {}", mapping.len());
    debug!("{:?}", report);

    if let Some(reference_path) = &cli.print_diff {
        if !reference_path.exists() {
            return Err(CliError::ReferenceMissing(reference_path.clone()));
        }
        let reference = CollectionMapping::load_or_empty(reference_path);
        let missing = mapping::diff(&reference, &mapping);
        writeln!(out, "{}", missing.to_json_string()?)?;
        return Ok(());
    }

    if cli.list {
        OutputFormatter::write_listing(out, &mapping.listing(&index))?;
        return Ok(());
    }

    let destination = config.collections_json_path();
    let outcome = write_mapping(&mapping, &destination)?;
    if let Some(backup) = &outcome.backup {
        OutputFormatter::info(&format!("Previous collections saved to {}", backup.display()));
    }
    if outcome.overwrote_backup {
        OutputFormatter::warning("An earlier backup from today was overwritten");
    }
    OutputFormatter::success(&format!("Wrote {}", outcome.destination.display()));
    OutputFormatter::summary_table(&mapping);
    OutputFormatter::warning("You have to hard reset the kindle for the changes to take effect!");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::parse_from([
            "kindle-collections",
            "-d",
            "/media/kindle",
            "-s",
            "audible",
            "--subdir",
            "pictures",
            "-k",
            "2",
            "--print-diff",
            "old.json",
            "-v",
        ]);

        assert_eq!(cli.dir, Some(PathBuf::from("/media/kindle")));
        assert_eq!(cli.subdirs, vec!["audible", "pictures"]);
        assert_eq!(cli.kindle_version, Some(2));
        assert_eq!(cli.print_diff, Some(PathBuf::from("old.json")));
        assert_eq!(cli.log_level(), "info");
    }

    #[test]
    fn test_debug_beats_verbose() {
        let cli = Cli::parse_from(["kindle-collections", "--debug", "--verbose"]);
        assert_eq!(cli.log_level(), "debug");
        assert_eq!(Cli::default().log_level(), "warn");
    }

    #[test]
    fn test_list_conflicts_with_diff() {
        let result =
            Cli::try_parse_from(["kindle-collections", "--list", "--print-diff", "x.json"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_extend_subdirs() {
        let cli = Cli {
            dir: Some(PathBuf::from("/k")),
            pattern: Some(r"\.azw3$".to_string()),
            subdirs: vec!["audible".to_string()],
            ..Default::default()
        };
        let mut config = AppConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.dir, PathBuf::from("/k"));
        assert_eq!(config.include_pattern, r"\.azw3$");
        assert_eq!(config.subdirs, vec!["documents", "audible"]);
        assert_eq!(config.locale, "en-US");
    }

    #[test]
    fn test_config_errors_exit_with_five() {
        let err = CliError::Config(ConfigError::UnsupportedKindleVersion(3));
        assert_eq!(err.exit_code(), 5);
        let err = CliError::ReferenceMissing(PathBuf::from("x.json"));
        assert_eq!(err.exit_code(), 1);
    }
}
