use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use globset::GlobSet;
use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::config::RenamerConfig;
use crate::date;
use crate::error::{RenamerError, Result};
use crate::models::FileSystemItem;

#[derive(Debug, Default, Clone, Serialize)]
pub struct ScanStats {
    pub files_found: usize,
    pub directories_found: usize,
    pub symlinks_skipped: usize,
    pub hidden_skipped: usize,
    pub permission_errors: usize,
    pub excluded_items: usize,
}

impl ScanStats {
    pub fn total_found(&self) -> usize {
        self.files_found + self.directories_found
    }

    pub fn total_skipped(&self) -> usize {
        self.symlinks_skipped + self.hidden_skipped + self.excluded_items
    }
}

#[derive(Debug)]
pub struct ScanOutcome {
    pub items: Vec<FileSystemItem>,
    pub stats: ScanStats,
}

enum Exclusion {
    Hidden,
    Pattern,
    Extension,
}

pub struct FileScanner {
    include_hidden: bool,
    follow_symlinks: bool,
    max_depth: Option<usize>,
    extensions: Option<BTreeSet<String>>,
    exclude_globs: Option<GlobSet>,
}

impl FileScanner {
    pub fn from_config(config: &RenamerConfig) -> Result<Self> {
        Ok(Self {
            include_hidden: config.include_hidden_files,
            follow_symlinks: config.follow_symlinks,
            max_depth: config.max_depth,
            extensions: config.normalized_extensions(),
            exclude_globs: config.build_exclude_globset()?,
        })
    }

    /// Walks `directory` depth-first in a deterministic order: within each
    /// directory, files sort before subdirectories, both by case-insensitive
    /// name, and every directory entry is yielded before its children.
    pub fn scan_directory(
        &self,
        directory: &Path,
        recursive: bool,
        mut on_progress: Option<&mut dyn FnMut(usize, &Path)>,
    ) -> Result<ScanOutcome> {
        if !directory.exists() {
            return Err(RenamerError::NotFound(directory.to_path_buf()));
        }
        if !directory.is_dir() {
            return Err(RenamerError::NotADirectory(directory.to_path_buf()));
        }

        let mut stats = ScanStats::default();
        let mut items: Vec<FileSystemItem> = Vec::new();

        // max_depth is counted from the scan root: 0 keeps only direct
        // children, which is walkdir depth 1.
        let walk_depth = if recursive {
            self.max_depth
                .map(|depth| depth.saturating_add(1))
                .unwrap_or(usize::MAX)
        } else {
            1
        };
        let walker = WalkDir::new(directory)
            .follow_links(false)
            .min_depth(1)
            .max_depth(walk_depth)
            .sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

        let mut iter = walker.into_iter();
        while let Some(entry) = iter.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    stats.permission_errors += 1;
                    tracing::warn!(error = %err, "failed to read directory entry");
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry.file_type().is_dir();
            if let Some(reason) = self.exclusion(&name, entry.path(), is_dir, directory) {
                self.record_exclusion(reason, &mut stats);
                if is_dir {
                    // Excluded directories are pruned from the walk entirely.
                    iter.skip_current_dir();
                }
                continue;
            }
            if let Some(item) = self.build_item(entry.path(), entry.path_is_symlink(), &mut stats) {
                if let Some(callback) = on_progress.as_deref_mut() {
                    callback(items.len() + 1, &item.path);
                }
                items.push(item);
            }
        }

        tracing::info!(
            directory = %directory.display(),
            found = items.len(),
            files = stats.files_found,
            directories = stats.directories_found,
            skipped = stats.total_skipped(),
            "scan finished"
        );
        Ok(ScanOutcome { items, stats })
    }

    /// Single-item variant used by in-place renaming. Exclusion or an
    /// unreadable item yields None rather than an error.
    pub fn scan_single_item(&self, path: &Path) -> Option<FileSystemItem> {
        let mut stats = ScanStats::default();
        let name = path.file_name()?.to_string_lossy().to_string();
        let root = path.parent().unwrap_or(path);
        if self.exclusion(&name, path, path.is_dir(), root).is_some() {
            return None;
        }
        self.build_item(path, path.is_symlink(), &mut stats)
    }

    fn exclusion(&self, name: &str, path: &Path, is_dir: bool, root: &Path) -> Option<Exclusion> {
        if !self.include_hidden && name.starts_with('.') {
            return Some(Exclusion::Hidden);
        }
        if let Some(globs) = &self.exclude_globs {
            let relative = path.strip_prefix(root).unwrap_or(path);
            if globs.is_match(name) || globs.is_match(relative) {
                return Some(Exclusion::Pattern);
            }
        }
        if let Some(extensions) = &self.extensions {
            // Directories are exempt from extension filtering.
            if !is_dir {
                let matches = path
                    .extension()
                    .map(|ext| extensions.contains(&ext.to_string_lossy().to_lowercase()))
                    .unwrap_or(false);
                if !matches {
                    return Some(Exclusion::Extension);
                }
            }
        }
        None
    }

    fn record_exclusion(&self, reason: Exclusion, stats: &mut ScanStats) {
        match reason {
            Exclusion::Hidden => stats.hidden_skipped += 1,
            Exclusion::Pattern | Exclusion::Extension => stats.excluded_items += 1,
        }
    }

    // One date extraction and one prefix check per item; a failure skips the
    // item without aborting the scan.
    fn build_item(
        &self,
        path: &Path,
        is_symlink: bool,
        stats: &mut ScanStats,
    ) -> Option<FileSystemItem> {
        if is_symlink && !self.follow_symlinks {
            stats.symlinks_skipped += 1;
            return None;
        }
        let created = match date::get_creation_date(path) {
            Ok(created) => created,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "skipping item, date extraction failed"
                );
                return None;
            }
        };
        let meta = fs::metadata(path).ok();
        let is_directory = meta.as_ref().map(|m| m.is_dir()).unwrap_or(false);
        let modified = meta
            .as_ref()
            .and_then(|m| m.modified().ok())
            .map(chrono::DateTime::from)
            .unwrap_or(created);
        let size_bytes = if is_directory {
            0
        } else {
            meta.as_ref().map(|m| m.len()).unwrap_or(0)
        };
        let name = path.file_name()?.to_string_lossy().to_string();
        let has_prefix = date::has_date_prefix(&name);

        if is_directory {
            stats.directories_found += 1;
        } else {
            stats.files_found += 1;
        }
        Some(FileSystemItem::new(
            path.to_path_buf(),
            created,
            modified,
            is_directory,
            is_symlink,
            has_prefix,
            size_bytes,
        ))
    }
}

fn sort_key(entry: &DirEntry) -> (bool, String) {
    (
        entry.file_type().is_dir(),
        entry.file_name().to_string_lossy().to_lowercase(),
    )
}
