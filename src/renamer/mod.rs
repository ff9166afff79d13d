use std::fs;
use std::path::{Path, PathBuf};

use crate::config::RenamerConfig;
use crate::error::{RenamerError, Result};
use crate::models::{DateFormatStyle, FileSystemItem, OperationKind, OperationStatus, RenameOperation};
use crate::util;
use crate::validate::PrefixValidator;

pub struct FileRenamer {
    style: DateFormatStyle,
    create_backups: bool,
    allow_overwrites: bool,
    validator: PrefixValidator,
}

impl FileRenamer {
    pub fn from_config(config: &RenamerConfig) -> Self {
        Self {
            style: config.date_format,
            create_backups: config.create_backups,
            allow_overwrites: config.allow_overwrites,
            validator: PrefixValidator::from_config(config),
        }
    }

    pub fn validator(&self) -> &PrefixValidator {
        &self.validator
    }

    /// Plans one rename. Items that already carry a valid prefix become
    /// skipped operations whose target equals the original name.
    pub fn preview_rename(&self, item: &FileSystemItem) -> Result<RenameOperation> {
        if item.has_date_prefix {
            return RenameOperation::new(item.clone(), item.name.clone(), OperationKind::Skipped);
        }
        let target = self
            .validator
            .generate_target_name(&item.name, item.created, self.style)?;
        let kind = if item.is_directory {
            OperationKind::FolderRename
        } else {
            OperationKind::FileRename
        };
        RenameOperation::new(item.clone(), target, kind)
    }

    /// Executes pending operations in input order. One failure never aborts
    /// the batch; each operation ends in a terminal status of its own. With
    /// `dry_run` the planning and bookkeeping are identical but the rename
    /// syscall is never issued.
    pub fn batch_rename(
        &self,
        operations: &mut [RenameOperation],
        dry_run: bool,
        mut on_progress: Option<&mut dyn FnMut(usize, usize, &str)>,
    ) {
        let total = operations.len();
        for (index, operation) in operations.iter_mut().enumerate() {
            let message = self.execute_one(operation, dry_run);
            if let Some(callback) = on_progress.as_deref_mut() {
                callback(index + 1, total, &message);
            }
        }
    }

    fn execute_one(&self, operation: &mut RenameOperation, dry_run: bool) -> String {
        if operation.kind == OperationKind::Skipped {
            return format!("skipped {} (already prefixed)", operation.original_name);
        }
        if operation.status != OperationStatus::Pending {
            return format!("{} ({})", operation.original_name, operation.status);
        }
        operation.status = OperationStatus::InProgress;
        let source = operation.item.path.clone();
        let target = operation.target_path();

        if dry_run {
            operation.mark_completed(util::now_local());
            return format!(
                "would rename {} -> {}",
                operation.original_name, operation.target_name
            );
        }
        if target.exists() && !self.allow_overwrites {
            let conflict = RenamerError::Conflict {
                source_path: source.clone(),
                target_path: target.clone(),
            };
            operation.mark_failed(conflict.to_string(), util::now_local());
            return format!("failed {}: target already exists", operation.original_name);
        }
        if self.create_backups && !operation.item.is_directory {
            if let Err(err) = backup_copy(&source) {
                let wrapped = RenamerError::io(err, &source, "backup");
                operation.mark_failed(wrapped.to_string(), util::now_local());
                return format!("failed {}: backup failed", operation.original_name);
            }
        }
        match fs::rename(&source, &target) {
            Ok(()) => {
                operation.mark_completed(util::now_local());
                tracing::debug!(
                    from = %source.display(),
                    to = %target.display(),
                    "renamed"
                );
                format!(
                    "renamed {} -> {}",
                    operation.original_name, operation.target_name
                )
            }
            Err(err) => {
                tracing::warn!(
                    from = %source.display(),
                    to = %target.display(),
                    error = %err,
                    "rename failed"
                );
                let wrapped = RenamerError::io(err, &source, "rename");
                operation.mark_failed(wrapped.to_string(), util::now_local());
                format!("failed {}", operation.original_name)
            }
        }
    }

    /// Previews and executes a single item in one step; used by the
    /// single-item command and the watch loop.
    pub fn rename_in_place(&self, item: &FileSystemItem, dry_run: bool) -> Result<RenameOperation> {
        let mut operations = vec![self.preview_rename(item)?];
        self.batch_rename(&mut operations, dry_run, None);
        Ok(operations.remove(0))
    }
}

fn backup_copy(source: &Path) -> std::io::Result<u64> {
    let backup = backup_path(source);
    fs::copy(source, backup)
}

fn backup_path(source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    source.with_file_name(format!("{name}.bak"))
}
