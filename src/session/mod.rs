use std::path::Path;
use std::sync::Mutex;

use crate::config::RenamerConfig;
use crate::error::{RenamerError, Result};
use crate::models::{
    FileSystemItem, OperationKind, OperationResult, OperationStatus, ProcessingSession,
    RenameOperation, SessionStatus,
};
use crate::renamer::FileRenamer;
use crate::scanner::FileScanner;
use crate::util;

pub type StatusCallback = Box<dyn Fn(SessionStatus, &str) + Send + Sync>;

#[derive(Default)]
struct ManagerState {
    current: Option<ProcessingSession>,
    history: Vec<ProcessingSession>,
}

/// Orchestrates one scan -> plan -> execute run at a time. The mutex guards
/// every mutation of the current-session pointer so concurrent callers cannot
/// create or cancel sessions mid-flight; the pipeline itself is synchronous
/// and callers are expected to serialize scans and executions.
pub struct SessionManager {
    scanner: FileScanner,
    renamer: FileRenamer,
    state: Mutex<ManagerState>,
    status_callback: Option<StatusCallback>,
}

impl SessionManager {
    pub fn new(config: &RenamerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            scanner: FileScanner::from_config(config)?,
            renamer: FileRenamer::from_config(config),
            state: Mutex::new(ManagerState::default()),
            status_callback: None,
        })
    }

    pub fn with_status_callback(mut self, callback: StatusCallback) -> Self {
        self.status_callback = Some(callback);
        self
    }

    pub fn renamer(&self) -> &FileRenamer {
        &self.renamer
    }

    /// Starts a new session for `target_directory`. An active session is
    /// archived first; at most one session is current at any time.
    pub fn create_session(
        &self,
        target_directory: &Path,
        dry_run: bool,
    ) -> Result<ProcessingSession> {
        if !target_directory.exists() {
            return Err(RenamerError::validation(
                target_directory.to_string_lossy(),
                "target directory does not exist",
            ));
        }
        if !target_directory.is_dir() {
            return Err(RenamerError::validation(
                target_directory.to_string_lossy(),
                "target path is not a directory",
            ));
        }
        let session_id = util::session_id(target_directory, util::now_local());
        let session = ProcessingSession::new(target_directory.to_path_buf(), session_id, dry_run);
        {
            let mut state = self.lock_state();
            if let Some(previous) = state.current.take() {
                state.history.push(previous);
            }
            state.current = Some(session.clone());
        }
        self.notify(
            SessionStatus::Initializing,
            &format!("Created session: {}", session.session_id),
        );
        Ok(session)
    }

    /// Scans the session's target directory and records the discovered
    /// items. A scan failure transitions the session to FAILED.
    pub fn scan_directory(
        &self,
        recursive: bool,
        on_progress: Option<&mut dyn FnMut(usize, &Path)>,
    ) -> Result<Vec<FileSystemItem>> {
        let (session_id, target_directory) = {
            let mut state = self.lock_state();
            let session = state.current.as_mut().ok_or_else(|| {
                RenamerError::session(None, "no active session for directory scanning")
            })?;
            session.start_time = Some(util::now_local());
            (session.session_id.clone(), session.target_directory.clone())
        };
        self.notify(
            SessionStatus::Scanning,
            "Scanning directory for files and folders",
        );

        let outcome = match self
            .scanner
            .scan_directory(&target_directory, recursive, on_progress)
        {
            Ok(outcome) => outcome,
            Err(err) => {
                self.notify(SessionStatus::Failed, &format!("Scan failed: {err}"));
                return Err(RenamerError::session(
                    Some(session_id),
                    format!("directory scan failed: {err}"),
                ));
            }
        };

        {
            let mut state = self.lock_state();
            let session = state.current.as_mut().ok_or_else(|| {
                RenamerError::session(
                    Some(session_id.clone()),
                    "session was cancelled during scan",
                )
            })?;
            session.discovered_items = outcome.items.clone();
        }

        self.notify(
            SessionStatus::Ready,
            &format!("Scan complete: {} items found", outcome.items.len()),
        );
        Ok(outcome.items)
    }

    /// Plans one operation per discovered item, including skip records for
    /// items that already carry a prefix.
    pub fn generate_rename_operations(&self) -> Result<Vec<RenameOperation>> {
        let (session_id, items) = {
            let state = self.lock_state();
            let session = state.current.as_ref().ok_or_else(|| {
                RenamerError::session(None, "no active session for operation generation")
            })?;
            if session.discovered_items.is_empty() {
                return Err(RenamerError::session(
                    Some(session.session_id.clone()),
                    "no items discovered - run scan_directory first",
                ));
            }
            (session.session_id.clone(), session.discovered_items.clone())
        };

        let mut operations = Vec::with_capacity(items.len());
        for item in &items {
            let operation = self.renamer.preview_rename(item).map_err(|err| {
                RenamerError::session(
                    Some(session_id.clone()),
                    format!("operation generation failed for {}: {err}", item.name),
                )
            })?;
            if operation.kind == OperationKind::Skipped {
                tracing::debug!(item = %item.name, "will skip (already has prefix)");
            } else {
                tracing::debug!(item = %item.name, target = %operation.target_name, "will rename");
            }
            operations.push(operation);
        }

        let rename_count = operations
            .iter()
            .filter(|op| {
                matches!(
                    op.kind,
                    OperationKind::FileRename | OperationKind::FolderRename
                )
            })
            .count();
        let skip_count = operations
            .iter()
            .filter(|op| op.kind == OperationKind::Skipped)
            .count();

        {
            let mut state = self.lock_state();
            let session = state.current.as_mut().ok_or_else(|| {
                RenamerError::session(
                    Some(session_id.clone()),
                    "session was cancelled during planning",
                )
            })?;
            session.rename_operations = operations.clone();
        }

        self.notify(
            SessionStatus::Ready,
            &format!("Operations ready: {rename_count} renames, {skip_count} skipped"),
        );
        Ok(operations)
    }

    /// Runs the batch and settles the session: per-operation counters, a
    /// single end timestamp, and COMPLETED or FAILED depending on whether
    /// any operation failed.
    pub fn execute_operations(
        &self,
        on_progress: Option<&mut dyn FnMut(usize, usize, &str)>,
    ) -> Result<OperationResult> {
        let (session_id, dry_run, mut operations) = {
            let mut state = self.lock_state();
            let session = state.current.as_mut().ok_or_else(|| {
                RenamerError::session(None, "no active session for operation execution")
            })?;
            if session.rename_operations.is_empty() {
                return Err(RenamerError::session(
                    Some(session.session_id.clone()),
                    "no operations to execute - run generate_rename_operations first",
                ));
            }
            (
                session.session_id.clone(),
                session.is_dry_run,
                std::mem::take(&mut session.rename_operations),
            )
        };
        self.notify(SessionStatus::Processing, "Executing rename operations");

        self.renamer.batch_rename(&mut operations, dry_run, on_progress);

        let result = {
            let mut state = self.lock_state();
            let session = state.current.as_mut().ok_or_else(|| {
                RenamerError::session(
                    Some(session_id.clone()),
                    "session was cancelled during execution",
                )
            })?;
            session.rename_operations = operations;
            session.processed_count = 0;
            session.skipped_count = 0;
            session.error_count = 0;
            for operation in &session.rename_operations {
                match operation.status {
                    OperationStatus::Completed => session.processed_count += 1,
                    OperationStatus::Skipped => session.skipped_count += 1,
                    OperationStatus::Failed => session.error_count += 1,
                    _ => {}
                }
            }
            session.complete();
            OperationResult::from_session(session)
        };

        let final_status = if result.session.error_count == 0 {
            SessionStatus::Completed
        } else {
            SessionStatus::Failed
        };
        self.notify(final_status, &result.summary_message);
        Ok(result)
    }

    /// create -> scan -> generate -> execute with a coarse four-stage
    /// progress callback.
    pub fn run_complete_workflow(
        &self,
        target_directory: &Path,
        dry_run: bool,
        recursive: bool,
        mut on_progress: Option<&mut dyn FnMut(&str, usize, usize, &str)>,
    ) -> Result<OperationResult> {
        let mut report = |phase: &str, current: usize, total: usize, message: &str| {
            if let Some(callback) = on_progress.as_deref_mut() {
                callback(phase, current, total, message);
            }
        };

        self.create_session(target_directory, dry_run)?;

        report("Scanning", 0, 100, "Discovering files and folders...");
        let items = match self.scan_directory(recursive, None) {
            Ok(items) => items,
            Err(err) => {
                report("Failed", 0, 100, &err.to_string());
                return Err(err);
            }
        };
        report("Scanning", 33, 100, &format!("Found {} items", items.len()));

        report("Planning", 33, 100, "Generating rename operations...");
        let operations = match self.generate_rename_operations() {
            Ok(operations) => operations,
            Err(err) => {
                report("Failed", 33, 100, &err.to_string());
                return Err(err);
            }
        };
        report(
            "Planning",
            66,
            100,
            &format!("Generated {} operations", operations.len()),
        );

        report("Executing", 66, 100, "Performing rename operations...");
        let result = match self.execute_operations(None) {
            Ok(result) => result,
            Err(err) => {
                report("Failed", 66, 100, &err.to_string());
                return Err(err);
            }
        };
        report("Complete", 100, 100, &result.summary_message);
        Ok(result)
    }

    /// Marks every still-pending operation CANCELLED, ends the session and
    /// archives it. Safe to call with no active session.
    pub fn cancel_current_session(&self) -> bool {
        let cancelled = {
            let mut state = self.lock_state();
            match state.current.take() {
                Some(mut session) => {
                    for operation in &mut session.rename_operations {
                        if operation.status == OperationStatus::Pending {
                            operation.status = OperationStatus::Cancelled;
                        }
                    }
                    session.complete();
                    state.history.push(session);
                    true
                }
                None => false,
            }
        };
        if cancelled {
            self.notify(SessionStatus::Cancelled, "Session cancelled by user");
        }
        cancelled
    }

    pub fn current_session(&self) -> Option<ProcessingSession> {
        self.lock_state().current.clone()
    }

    pub fn session_history(&self) -> Vec<ProcessingSession> {
        self.lock_state().history.clone()
    }

    fn notify(&self, status: SessionStatus, message: &str) {
        if let Some(callback) = &self.status_callback {
            callback(status, message);
        }
        tracing::info!(status = %status, "{message}");
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap()
    }
}
