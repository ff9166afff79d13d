use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::RenamerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DateFormatStyle {
    IsoDate,
    UsDate,
    Compact,
    Ddmmyyyy,
    YearMonth,
}

impl DateFormatStyle {
    pub fn chrono_format(self) -> &'static str {
        match self {
            Self::IsoDate => "%Y-%m-%d",
            Self::UsDate => "%m-%d-%Y",
            Self::Compact => "%Y%m%d",
            Self::Ddmmyyyy => "%d%m%Y",
            Self::YearMonth => "%Y-%m",
        }
    }

    pub fn prefix_len(self) -> usize {
        match self {
            Self::IsoDate | Self::UsDate => 10,
            Self::Compact | Self::Ddmmyyyy => 8,
            Self::YearMonth => 7,
        }
    }

    pub fn example(self) -> &'static str {
        match self {
            Self::IsoDate => "2024-03-15",
            Self::UsDate => "03-15-2024",
            Self::Compact => "20240315",
            Self::Ddmmyyyy => "15032024",
            Self::YearMonth => "2024-03",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::IsoDate => "ISO standard format (YYYY-MM-DD)",
            Self::UsDate => "US format (MM-DD-YYYY)",
            Self::Compact => "Compact format (YYYYMMDD)",
            Self::Ddmmyyyy => "Day-first format (DDMMYYYY)",
            Self::YearMonth => "Year and month only (YYYY-MM)",
        }
    }

    pub fn all() -> [Self; 5] {
        [
            Self::IsoDate,
            Self::UsDate,
            Self::Compact,
            Self::Ddmmyyyy,
            Self::YearMonth,
        ]
    }

    // Order matters: existing prefixes are matched against these styles,
    // first hit wins. Ddmmyyyy is deliberately absent.
    pub fn detection_order() -> [Self; 4] {
        [Self::IsoDate, Self::UsDate, Self::Compact, Self::YearMonth]
    }
}

impl fmt::Display for DateFormatStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::IsoDate => "iso-date",
            Self::UsDate => "us-date",
            Self::Compact => "compact",
            Self::Ddmmyyyy => "ddmmyyyy",
            Self::YearMonth => "year-month",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLevel {
    Strict,
    Normal,
    Permissive,
    Disabled,
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Strict => "strict",
            Self::Normal => "normal",
            Self::Permissive => "permissive",
            Self::Disabled => "disabled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    FileRename,
    FolderRename,
    Skipped,
    Batch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
    Cancelled,
}

impl OperationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Skipped | Self::Cancelled
        )
    }

    pub fn is_successful(self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Initializing,
    Scanning,
    Ready,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initializing => "initializing",
            Self::Scanning => "scanning",
            Self::Ready => "ready",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSystemItem {
    pub path: PathBuf,
    pub name: String,
    pub created: DateTime<Local>,
    pub modified: DateTime<Local>,
    pub is_directory: bool,
    pub is_symlink: bool,
    pub has_date_prefix: bool,
    pub size_bytes: u64,
}

impl FileSystemItem {
    pub fn new(
        path: PathBuf,
        created: DateTime<Local>,
        modified: DateTime<Local>,
        is_directory: bool,
        is_symlink: bool,
        has_date_prefix: bool,
        size_bytes: u64,
    ) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        // A creation timestamp more than a day ahead of the clock is bogus
        // metadata; clamp it to the modification time.
        let created = if created > Local::now() + Duration::days(1) {
            modified
        } else {
            created
        };
        Self {
            path,
            name,
            created,
            modified,
            is_directory,
            is_symlink,
            has_date_prefix,
            size_bytes: if is_directory { 0 } else { size_bytes },
        }
    }

    pub fn parent_directory(&self) -> PathBuf {
        self.path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default()
    }

    pub fn extension(&self) -> Option<String> {
        if self.is_directory {
            return None;
        }
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameOperation {
    pub item: FileSystemItem,
    pub original_name: String,
    pub target_name: String,
    pub kind: OperationKind,
    pub status: OperationStatus,
    pub error_message: Option<String>,
    pub completed_at: Option<DateTime<Local>>,
    pub rollback_possible: bool,
}

impl RenameOperation {
    pub fn new(
        item: FileSystemItem,
        target_name: String,
        kind: OperationKind,
    ) -> Result<Self, RenamerError> {
        let original_name = item.name.clone();
        validate_prefix_shape(&original_name, &target_name)?;
        let status = if kind == OperationKind::Skipped {
            OperationStatus::Skipped
        } else {
            OperationStatus::Pending
        };
        Ok(Self {
            item,
            original_name,
            target_name,
            kind,
            status,
            error_message: None,
            completed_at: None,
            rollback_possible: true,
        })
    }

    pub fn target_path(&self) -> PathBuf {
        self.item.parent_directory().join(&self.target_name)
    }

    pub fn mark_completed(&mut self, at: DateTime<Local>) {
        self.status = OperationStatus::Completed;
        self.completed_at = Some(at);
    }

    pub fn mark_failed(&mut self, message: impl Into<String>, at: DateTime<Local>) {
        self.status = OperationStatus::Failed;
        self.error_message = Some(message.into());
        self.completed_at = Some(at);
        self.rollback_possible = false;
    }
}

// An underscore-delimited prefix of length 8 must parse as %d%m%Y and one of
// length 10 as %Y-%m-%d, no matter which style produced it. Targets that
// merely extend the original name are exempt.
fn validate_prefix_shape(original_name: &str, target_name: &str) -> Result<(), RenamerError> {
    if target_name.starts_with(original_name) || !target_name.contains('_') {
        return Ok(());
    }
    let prefix = target_name.split('_').next().unwrap_or_default();
    let format = match prefix.len() {
        8 => "%d%m%Y",
        10 => "%Y-%m-%d",
        _ => return Ok(()),
    };
    if NaiveDate::parse_from_str(prefix, format).is_err() {
        return Err(RenamerError::validation(
            target_name,
            format!("prefix {prefix:?} is not a valid {format} date"),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingSession {
    pub target_directory: PathBuf,
    pub session_id: String,
    pub is_dry_run: bool,
    pub discovered_items: Vec<FileSystemItem>,
    pub rename_operations: Vec<RenameOperation>,
    pub start_time: Option<DateTime<Local>>,
    pub end_time: Option<DateTime<Local>>,
    pub processed_count: usize,
    pub skipped_count: usize,
    pub error_count: usize,
}

impl ProcessingSession {
    pub fn new(target_directory: PathBuf, session_id: String, is_dry_run: bool) -> Self {
        Self {
            target_directory,
            session_id,
            is_dry_run,
            discovered_items: Vec::new(),
            rename_operations: Vec::new(),
            start_time: Some(Local::now()),
            end_time: None,
            processed_count: 0,
            skipped_count: 0,
            error_count: 0,
        }
    }

    pub fn total_items(&self) -> usize {
        self.discovered_items.len()
    }

    pub fn progress_percentage(&self) -> f64 {
        if self.total_items() == 0 {
            return 0.0;
        }
        let done = self.processed_count + self.skipped_count + self.error_count;
        done as f64 / self.total_items() as f64 * 100.0
    }

    pub fn completion_status(&self) -> SessionStatus {
        match self.end_time {
            None => {
                if self.rename_operations.is_empty() {
                    SessionStatus::Scanning
                } else {
                    SessionStatus::Processing
                }
            }
            Some(_) => {
                if self.error_count > 0 && self.processed_count == 0 {
                    SessionStatus::Failed
                } else {
                    SessionStatus::Completed
                }
            }
        }
    }

    pub fn complete(&mut self) {
        if self.end_time.is_none() {
            self.end_time = Some(Local::now());
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult {
    pub session: ProcessingSession,
    pub successful_renames: Vec<RenameOperation>,
    pub failed_operations: Vec<RenameOperation>,
    pub skipped_items: Vec<FileSystemItem>,
    pub rollback_map: BTreeMap<String, String>,
    pub summary_message: String,
}

impl OperationResult {
    pub fn from_session(session: &ProcessingSession) -> Self {
        let mut successful = Vec::new();
        let mut failed = Vec::new();
        let mut skipped = Vec::new();
        let mut rollback_map = BTreeMap::new();
        for operation in &session.rename_operations {
            match operation.status {
                OperationStatus::Completed => {
                    rollback_map.insert(
                        operation.target_path().to_string_lossy().to_string(),
                        operation.item.path.to_string_lossy().to_string(),
                    );
                    successful.push(operation.clone());
                }
                OperationStatus::Failed => failed.push(operation.clone()),
                OperationStatus::Skipped => skipped.push(operation.item.clone()),
                _ => {}
            }
        }
        let mut result = Self {
            session: session.clone(),
            successful_renames: successful,
            failed_operations: failed,
            skipped_items: skipped,
            rollback_map,
            summary_message: String::new(),
        };
        result.summary_message = result.build_summary();
        result
    }

    pub fn execution_time(&self) -> Duration {
        match (self.session.start_time, self.session.end_time) {
            (Some(start), Some(end)) => end - start,
            _ => Duration::zero(),
        }
    }

    pub fn total_operations(&self) -> usize {
        self.session.rename_operations.len()
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.total_operations();
        if total == 0 {
            return 100.0;
        }
        self.successful_renames.len() as f64 / total as f64 * 100.0
    }

    pub fn has_errors(&self) -> bool {
        !self.failed_operations.is_empty()
    }

    pub fn error_summary(&self) -> Vec<String> {
        self.failed_operations
            .iter()
            .map(|op| {
                format!(
                    "{}: {}",
                    op.original_name,
                    op.error_message.as_deref().unwrap_or("unknown error")
                )
            })
            .collect()
    }

    fn build_summary(&self) -> String {
        let seconds = self.execution_time().num_milliseconds() as f64 / 1000.0;
        format!(
            "Processing completed in {:.1} seconds. Total items: {}, Successful: {}, Failed: {}, Skipped: {}",
            seconds,
            self.total_operations(),
            self.successful_renames.len(),
            self.failed_operations.len(),
            self.skipped_items.len()
        )
    }
}
