/// Persisting a collection mapping to the device.
///
/// An existing `collections.json` is moved aside to a dated backup in the same
/// directory (`collections_bak_2011-11-11.json`) before the new mapping is
/// written. The new content goes to a temporary file first and is renamed into
/// place, so an interrupted write leaves either the backup or the complete new
/// file behind.
use crate::mapping::{CollectionMapping, MappingError, MappingResult};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What a successful write did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Where the mapping was written.
    pub destination: PathBuf,
    /// Backup of the previous file, if there was one.
    pub backup: Option<PathBuf>,
    /// True when an earlier backup from the same day was replaced.
    pub overwrote_backup: bool,
}

/// Writes `mapping` to `destination`, backing up any existing file under
/// today's local date.
///
/// # Examples
///
/// ```no_run
/// use kindle_collections::mapping::CollectionMapping;
/// use kindle_collections::writer::write_mapping;
/// use std::path::Path;
///
/// let outcome = write_mapping(
///     &CollectionMapping::new(),
///     Path::new("/media/kindle/system/collections.json"),
/// );
/// match outcome {
///     Ok(o) => println!("Wrote {}", o.destination.display()),
///     Err(e) => eprintln!("Write failed: {}", e),
/// }
/// ```
pub fn write_mapping(mapping: &CollectionMapping, destination: &Path) -> MappingResult<WriteOutcome> {
    write_mapping_on(mapping, destination, chrono::Local::now().date_naive())
}

/// Same as [`write_mapping`] with an explicit backup date.
///
/// # Errors
///
/// * `MappingError::DestinationMissing` if the destination directory does not
///   exist. Nothing is touched in that case.
/// * `MappingError::Backup` if the existing file cannot be moved aside.
/// * `MappingError::Write` if the new file cannot be written or renamed.
///
/// A backup from the same date is replaced; the returned outcome reports it
/// and a warning is logged.
pub fn write_mapping_on(
    mapping: &CollectionMapping,
    destination: &Path,
    date: NaiveDate,
) -> MappingResult<WriteOutcome> {
    let parent = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    if !parent.is_dir() {
        return Err(MappingError::DestinationMissing {
            path: parent.to_path_buf(),
        });
    }

    let serialized = mapping.to_json_string()?;
    debug!("JSON: {}", serialized);

    let mut backup = None;
    let mut overwrote_backup = false;
    if destination.exists() {
        let backup_path = backup_path(destination, date);
        if backup_path.exists() {
            warn!(
                "Backup {} already exists and will be overwritten",
                backup_path.display()
            );
            overwrote_backup = true;
        }
        info!(
            "Backup {} to {}",
            destination.display(),
            backup_path.display()
        );
        fs::rename(destination, &backup_path).map_err(|e| MappingError::Backup {
            from: destination.to_path_buf(),
            to: backup_path.clone(),
            source: e,
        })?;
        backup = Some(backup_path);
    }

    let temp_path = temp_path(destination);
    fs::write(&temp_path, serialized).map_err(|e| MappingError::Write {
        path: temp_path.clone(),
        source: e,
    })?;
    fs::rename(&temp_path, destination).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        MappingError::Write {
            path: destination.to_path_buf(),
            source: e,
        }
    })?;

    info!("Wrote {}", destination.display());

    Ok(WriteOutcome {
        destination: destination.to_path_buf(),
        backup,
        overwrote_backup,
    })
}

/// Dated backup path next to `destination`.
///
/// Example: `collections.json` becomes `collections_bak_2011-11-11.json`
pub fn backup_path(destination: &Path, date: NaiveDate) -> PathBuf {
    let stem = destination
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("collections");
    let backup_name = match destination.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_bak_{}.{}", stem, date.format("%Y-%m-%d"), ext),
        None => format!("{}_bak_{}", stem, date.format("%Y-%m-%d")),
    };
    destination.with_file_name(backup_name)
}

fn temp_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("collections.json");
    destination.with_file_name(format!(".{}.tmp", name))
}
