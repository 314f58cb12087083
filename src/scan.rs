//! Discovery of candidate documents below the device root.

use crate::classifier::ScanEntry;
use regex::Regex;
use std::path::Path;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Walks `root/<subdir>` for every configured subdirectory and returns the
/// entries whose root-relative path matches `include`.
///
/// Paths are joined with `/` whatever the host separator, and come out in
/// file-name order per subdirectory. Directories whose path matches are
/// returned flagged as such. Hidden entries (and everything below a hidden
/// directory) are skipped unless `include_hidden` is set. Subdirectories that
/// don't exist are skipped.
pub fn scan_subdirs(
    root: &Path,
    subdirs: &[String],
    include: &Regex,
    include_hidden: bool,
) -> Vec<ScanEntry> {
    let mut entries = Vec::new();

    for subdir in subdirs {
        let start = root.join(subdir);
        if !start.is_dir() {
            debug!("Skip missing subdir: {}", start.display());
            continue;
        }
        debug!("Scan subdir: {}", start.display());

        let walker = WalkDir::new(&start)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| include_hidden || !is_hidden(e))
            .filter_map(Result::ok);

        for entry in walker {
            let Some(relative_path) = relative_path(root, entry.path()) else {
                continue;
            };
            if include.is_match(&relative_path) {
                entries.push(ScanEntry {
                    relative_path,
                    is_dir: entry.file_type().is_dir(),
                });
            }
        }
    }

    debug!("Found {} candidate entries", entries.len());
    entries
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    Some(segments.join("/"))
}
