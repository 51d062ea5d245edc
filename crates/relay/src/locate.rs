use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{RelayError, Result};

/// Suffixes the pipeline treats as payload carriers.
pub const IMAGE_SUFFIXES: &[&str] = &[".jpg"];

/// How far below the scan root [`locate`] may descend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDepth {
    /// Visit the root plus this many additional directory levels;
    /// `Levels(0)` considers only files directly under the root.
    Levels(usize),
    Unbounded,
}

/// Return the most recently created regular file under `root` whose
/// name ends with one of `suffixes`, descending at most `depth` levels.
///
/// Symlinks and special files are excluded. Creation-time ties go to
/// the lexicographically smaller path. Unreadable directories are
/// skipped rather than aborting the scan, so a caller that needs an
/// exhaustive answer should expect partial results under restrictive
/// permissions.
pub fn locate(root: &Path, suffixes: &[&str], depth: ScanDepth) -> Result<PathBuf> {
    let mut walker = WalkDir::new(root).follow_links(false);
    if let ScanDepth::Levels(levels) = depth {
        // walkdir counts the root itself as depth 0 and its entries as 1
        walker = walker.max_depth(levels + 1);
    }

    let mut best: Option<(SystemTime, PathBuf)> = None;

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !has_suffix(path, suffixes) {
            continue;
        }

        let created = match creation_time(&entry) {
            Some(time) => time,
            None => {
                warn!("no usable timestamp for {}, skipping", path.display());
                continue;
            }
        };

        let replace = match &best {
            None => true,
            Some((best_time, best_path)) => {
                created > *best_time || (created == *best_time && path < best_path.as_path())
            }
        };
        if replace {
            best = Some((created, path.to_path_buf()));
        }
    }

    match best {
        Some((_, path)) => {
            debug!("candidate file: {}", path.display());
            Ok(path)
        }
        None => Err(RelayError::NoCandidateFile {
            root: root.to_path_buf(),
            suffixes: suffixes.iter().map(|s| s.to_string()).collect(),
        }),
    }
}

fn has_suffix(path: &Path, suffixes: &[&str]) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| suffixes.iter().any(|suffix| name.ends_with(suffix)))
        .unwrap_or(false)
}

/// Creation timestamp, falling back to the modification time on
/// filesystems that do not record a birth time.
fn creation_time(entry: &walkdir::DirEntry) -> Option<SystemTime> {
    let metadata = entry.metadata().ok()?;
    metadata.created().or_else(|_| metadata.modified()).ok()
}
