//! Output formatting and styling module.
//!
//! Provides a centralized interface for human-facing CLI output: status
//! messages, the classification progress bar, the per-collection summary and
//! the collection listing.

use crate::mapping::{CollectionListing, CollectionMapping, ItemOrigin};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};

/// Shown in listings for items that came from the base mapping.
pub const PRECONFIGURED_MARKER: &str = "(pre-configured, no path known)";

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar for the classification pass.
    ///
    /// The bar is hidden when `total` is zero.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        if total == 0 {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("█▓░"));
        }
        pb
    }

    /// Prints the number of items per collection.
    ///
    /// Collections are listed in mapping order.
    pub fn summary_table(mapping: &CollectionMapping) {
        Self::header("SUMMARY");

        let max_name_len = mapping
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max(10); // At least "Collection" width

        println!(
            "{:<width$} | {}",
            "Collection".bold(),
            "Items".bold(),
            width = max_name_len
        );
        println!("{}", "-".repeat(max_name_len + 10));

        for (name, collection) in mapping.iter() {
            let count = collection.items.len();
            println!(
                "{:<width$} | {} {}",
                name,
                count.to_string().green(),
                if count == 1 { "item" } else { "items" },
                width = max_name_len
            );
        }

        println!("{}", "-".repeat(max_name_len + 10));
        let total = mapping.total_items();
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total.to_string().green().bold(),
            if total == 1 { "item" } else { "items" },
            width = max_name_len
        );
    }

    /// Writes the collection listing: each collection followed by its items
    /// and the file each one came from.
    pub fn write_listing(out: &mut dyn Write, listing: &[CollectionListing]) -> io::Result<()> {
        for collection in listing {
            writeln!(out, "{}", collection.name.bold())?;
            for (id, origin) in &collection.items {
                match origin {
                    ItemOrigin::Scanned(path) => writeln!(out, "  {}  {}", id, path)?,
                    ItemOrigin::Preconfigured => {
                        writeln!(out, "  {}  {}", id, PRECONFIGURED_MARKER.dimmed())?
                    }
                }
            }
        }
        Ok(())
    }
}
