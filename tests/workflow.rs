use std::fs;
use std::sync::{Arc, Mutex};

use datestamp::config::RenamerConfig;
use datestamp::date;
use datestamp::models::{DateFormatStyle, OperationStatus, SessionStatus};
use datestamp::renamer::FileRenamer;
use datestamp::scanner::FileScanner;
use datestamp::session::SessionManager;

fn manager(config: &RenamerConfig) -> SessionManager {
    SessionManager::new(config).unwrap()
}

#[test]
fn full_workflow_renames_and_skips() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("report.txt");
    fs::write(&report, b"content").unwrap();
    fs::write(dir.path().join("2024-01-01_old.txt"), b"old").unwrap();

    let manager = manager(&RenamerConfig::default());
    let result = manager
        .run_complete_workflow(dir.path(), false, false, None)
        .unwrap();

    assert_eq!(result.successful_renames.len(), 1);
    assert_eq!(result.skipped_items.len(), 1);
    assert_eq!(result.failed_operations.len(), 0);
    assert_eq!(result.session.error_count, 0);

    let renamed = &result.successful_renames[0];
    assert_eq!(renamed.original_name, "report.txt");
    assert!(renamed.target_name.ends_with("_report.txt"));
    assert!(date::has_date_prefix(&renamed.target_name));
    assert!(renamed.target_path().exists());
    assert!(!report.exists());

    assert_eq!(result.skipped_items[0].name, "2024-01-01_old.txt");
    assert!(dir.path().join("2024-01-01_old.txt").exists());
    assert_eq!(result.session.completion_status(), SessionStatus::Completed);
    assert_eq!(result.session.progress_percentage(), 100.0);
    assert!(renamed.status.is_terminal() && renamed.status.is_successful());
}

#[test]
fn existing_target_fails_that_operation_only() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("x.txt");
    fs::write(&source, b"data").unwrap();

    // Precompute the name the pipeline will choose and occupy it.
    let created = date::get_creation_date(&source).unwrap();
    let taken = date::generate_target_name("x.txt", created, DateFormatStyle::IsoDate);
    fs::write(dir.path().join(&taken), b"squatter").unwrap();

    let manager = manager(&RenamerConfig::default());
    let result = manager
        .run_complete_workflow(dir.path(), false, false, None)
        .unwrap();

    assert_eq!(result.failed_operations.len(), 1);
    let failed = &result.failed_operations[0];
    assert_eq!(failed.original_name, "x.txt");
    assert!(failed
        .error_message
        .as_deref()
        .unwrap()
        .contains("already exists"));
    // The source file is untouched and the squatter keeps its content.
    assert!(source.exists());
    assert_eq!(fs::read(dir.path().join(&taken)).unwrap(), b"squatter");
    assert_eq!(result.session.error_count, 1);
    assert!(result.has_errors());
    let summary = result.error_summary();
    assert_eq!(summary.len(), 1);
    assert!(summary[0].starts_with("x.txt:"));
    assert!(result.success_rate() < 100.0);
}

#[test]
fn dry_run_never_touches_the_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"a").unwrap();
    fs::write(dir.path().join("b.txt"), b"b").unwrap();

    let manager = manager(&RenamerConfig::default());
    let snapshot = |root: &std::path::Path| {
        let mut entries: Vec<String> = fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        entries.sort();
        entries
    };
    let before = snapshot(dir.path());

    let plan = |result: &datestamp::models::OperationResult| {
        let mut rows: Vec<(String, String, OperationStatus)> = result
            .session
            .rename_operations
            .iter()
            .map(|op| (op.original_name.clone(), op.target_name.clone(), op.status))
            .collect();
        rows.sort();
        rows
    };

    let first = manager
        .run_complete_workflow(dir.path(), true, false, None)
        .unwrap();
    assert_eq!(snapshot(dir.path()), before);

    let second = manager
        .run_complete_workflow(dir.path(), true, false, None)
        .unwrap();
    assert_eq!(snapshot(dir.path()), before);
    assert_eq!(plan(&first), plan(&second));
    assert!(first
        .session
        .rename_operations
        .iter()
        .all(|op| op.status == OperationStatus::Completed));
}

#[test]
fn cancelling_before_execute_cancels_pending_operations() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("one.txt"), b"1").unwrap();
    fs::write(dir.path().join("two.txt"), b"2").unwrap();

    let manager = manager(&RenamerConfig::default());
    manager.create_session(dir.path(), false).unwrap();
    manager.scan_directory(false, None).unwrap();
    manager.generate_rename_operations().unwrap();

    assert!(manager.cancel_current_session());
    assert!(manager.current_session().is_none());

    let history = manager.session_history();
    let archived = history.last().unwrap();
    assert!(archived
        .rename_operations
        .iter()
        .all(|op| op.status == OperationStatus::Cancelled));
    assert_eq!(archived.processed_count, 0);
    assert_eq!(archived.error_count, 0);
    assert!(archived.end_time.is_some());

    // Nothing left to execute afterwards.
    assert!(manager.execute_operations(None).is_err());
    // Cancelling again is a no-op, not an error.
    assert!(!manager.cancel_current_session());
}

#[test]
fn pipeline_order_is_enforced() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"a").unwrap();

    let manager = manager(&RenamerConfig::default());
    assert!(manager.scan_directory(false, None).is_err());
    assert!(manager.generate_rename_operations().is_err());
    assert!(manager.execute_operations(None).is_err());

    manager.create_session(dir.path(), false).unwrap();
    assert!(manager.generate_rename_operations().is_err());
    assert!(manager.execute_operations(None).is_err());

    manager.scan_directory(false, None).unwrap();
    assert!(manager.execute_operations(None).is_err());

    manager.generate_rename_operations().unwrap();
    assert!(manager.execute_operations(None).is_ok());
}

#[test]
fn creating_a_session_requires_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("f.txt");
    fs::write(&file, b"x").unwrap();

    let manager = manager(&RenamerConfig::default());
    assert!(manager.create_session(&dir.path().join("missing"), false).is_err());
    assert!(manager.create_session(&file, false).is_err());
}

#[test]
fn status_callback_observes_the_state_machine() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"a").unwrap();

    let seen: Arc<Mutex<Vec<SessionStatus>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let config = RenamerConfig::default();
    let manager = SessionManager::new(&config)
        .unwrap()
        .with_status_callback(Box::new(move |status, _message| {
            sink.lock().unwrap().push(status);
        }));

    manager
        .run_complete_workflow(dir.path(), true, false, None)
        .unwrap();

    let seen = seen.lock().unwrap();
    let expected = [
        SessionStatus::Initializing,
        SessionStatus::Scanning,
        SessionStatus::Ready,
        SessionStatus::Ready,
        SessionStatus::Processing,
        SessionStatus::Completed,
    ];
    assert_eq!(seen.as_slice(), expected.as_slice());
}

#[test]
fn creating_a_new_session_archives_the_old_one() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    fs::write(dir_a.path().join("a.txt"), b"a").unwrap();

    let manager = manager(&RenamerConfig::default());
    let first = manager.create_session(dir_a.path(), true).unwrap();
    let second = manager.create_session(dir_b.path(), true).unwrap();
    assert_ne!(first.session_id, second.session_id);

    let history = manager.session_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].session_id, first.session_id);
    assert_eq!(
        manager.current_session().unwrap().session_id,
        second.session_id
    );
}

#[test]
fn single_item_rename_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memo.txt");
    fs::write(&path, b"m").unwrap();

    let config = RenamerConfig::default();
    let scanner = FileScanner::from_config(&config).unwrap();
    let renamer = FileRenamer::from_config(&config);

    let item = scanner.scan_single_item(&path).unwrap();
    let preview = renamer.rename_in_place(&item, true).unwrap();
    assert_eq!(preview.status, OperationStatus::Completed);
    assert!(path.exists());

    let applied = renamer.rename_in_place(&item, false).unwrap();
    assert_eq!(applied.status, OperationStatus::Completed);
    assert!(!path.exists());
    assert!(applied.target_path().exists());
}

#[test]
fn backups_are_created_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.txt");
    fs::write(&path, b"numbers").unwrap();

    let config = RenamerConfig {
        create_backups: true,
        ..RenamerConfig::default()
    };
    let scanner = FileScanner::from_config(&config).unwrap();
    let renamer = FileRenamer::from_config(&config);
    let item = scanner.scan_single_item(&path).unwrap();
    let operation = renamer.rename_in_place(&item, false).unwrap();

    assert_eq!(operation.status, OperationStatus::Completed);
    let backup = dir.path().join("ledger.txt.bak");
    assert!(backup.exists());
    assert_eq!(fs::read(backup).unwrap(), b"numbers");
}

#[test]
fn compact_targets_fail_operation_validation() {
    // An 8-character prefix is validated as a day-first date, so compact
    // targets whose digits do not re-read as one are rejected at planning.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    fs::write(&path, b"n").unwrap();

    let config = RenamerConfig {
        date_format: DateFormatStyle::Compact,
        ..RenamerConfig::default()
    };
    let scanner = FileScanner::from_config(&config).unwrap();
    let renamer = FileRenamer::from_config(&config);
    let item = scanner.scan_single_item(&path).unwrap();
    assert!(renamer.preview_rename(&item).is_err());
}

#[test]
fn execute_progress_reports_each_operation() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"a").unwrap();
    fs::write(dir.path().join("b.txt"), b"b").unwrap();

    let manager = manager(&RenamerConfig::default());
    manager.create_session(dir.path(), true).unwrap();
    manager.scan_directory(false, None).unwrap();
    manager.generate_rename_operations().unwrap();

    let mut ticks = Vec::new();
    let mut progress = |current: usize, total: usize, message: &str| {
        ticks.push((current, total, message.to_string()));
    };
    let result = manager.execute_operations(Some(&mut progress)).unwrap();
    assert_eq!(ticks.len(), 2);
    assert_eq!((ticks[0].0, ticks[0].1), (1, 2));
    assert_eq!((ticks[1].0, ticks[1].1), (2, 2));
    assert!(ticks[0].2.contains("would rename"));
    assert_eq!(result.successful_renames.len(), 2);
}
