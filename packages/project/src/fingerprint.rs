//! Cheap change detection over the files that define the tree.

use crate::config::FingerprintStrategy;
use crate::errors::ProjectResult;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::debug;
use walkdir::WalkDir;

const SKIPPED_DIRS: &[&str] = &[".git", "node_modules"];

/// Opaque summary of the DOM files on disk. Only equality is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0[..12.min(self.0.len())])
    }
}

/// Root-relative globs selecting DOM files
#[derive(Debug, Clone)]
pub struct DomFileMatcher {
    set: GlobSet,
}

impl DomFileMatcher {
    pub fn new(patterns: &[String]) -> ProjectResult<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(GlobBuilder::new(pattern).literal_separator(true).build()?);
        }
        Ok(Self {
            set: builder.build()?,
        })
    }

    /// `relative` uses `/` separators
    pub fn is_match(&self, relative: &str) -> bool {
        self.set.is_match(relative)
    }
}

/// Fingerprint every DOM file under `root`. Runs on the blocking pool.
pub async fn compute_fingerprint(
    root: &Path,
    generated_dir: &str,
    matcher: &DomFileMatcher,
    strategy: FingerprintStrategy,
) -> ProjectResult<Fingerprint> {
    let root = root.to_path_buf();
    let generated_dir = generated_dir.to_string();
    let matcher = matcher.clone();
    tokio::task::spawn_blocking(move || fingerprint_files(&root, &generated_dir, &matcher, strategy))
        .await?
}

fn fingerprint_files(
    root: &Path,
    generated_dir: &str,
    matcher: &DomFileMatcher,
    strategy: FingerprintStrategy,
) -> ProjectResult<Fingerprint> {
    let mut files: Vec<(String, PathBuf)> = Vec::new();

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        let name = entry.file_name().to_string_lossy();
        !(entry.depth() > 0
            && entry.file_type().is_dir()
            && (SKIPPED_DIRS.contains(&&*name) || name == generated_dir))
    });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // Usually a file removed mid-walk
                debug!(error = %e, "Skipping entry while fingerprinting");
                continue;
            }
        };
        if !entry.file_type().is_file() || entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let relative = relative.join("/");
        if matcher.is_match(&relative) {
            files.push((relative, entry.into_path()));
        }
    }
    files.sort();

    let mut hasher = Sha256::new();
    for (relative, path) in &files {
        let stamp = match strategy {
            FingerprintStrategy::Mtime => std::fs::metadata(path)
                .and_then(|meta| meta.modified())
                .map(|modified| {
                    let nanos = modified
                        .duration_since(UNIX_EPOCH)
                        .map(|d| d.as_nanos())
                        .unwrap_or_default();
                    nanos.to_le_bytes().to_vec()
                }),
            FingerprintStrategy::Content => std::fs::read(path),
        };
        let stamp = match stamp {
            Ok(stamp) => stamp,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(relative.as_bytes());
        hasher.update([0u8]);
        hasher.update(&stamp);
        hasher.update([0u8]);
    }

    Ok(Fingerprint(format!("{:x}", hasher.finalize())))
}
