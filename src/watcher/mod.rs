mod lock;
mod microbatch;
pub use lock::{is_process_alive, send_terminate, LockInfo, WatchLock};
pub use microbatch::Batch;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::event::ModifyKind;
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

use crate::config::RenamerConfig;
use crate::models::OperationStatus;
use crate::renamer::FileRenamer;
use crate::scanner::FileScanner;
use crate::util;

pub const DEFAULT_WINDOW_MS: u64 = 500;

pub struct WatchOptions {
    pub directory: PathBuf,
    pub window: Duration,
    pub dry_run: bool,
}

pub fn lock_dir_for(directory_id: &str) -> Result<PathBuf> {
    Ok(util::datestamp_root()?.join("watch").join(directory_id))
}

/// Watches a directory and prefixes newly created items in place. Items the
/// scanner excludes and items that already carry a prefix are left alone, so
/// the watcher's own renames never feed back into it.
pub async fn watch(options: WatchOptions, config: &RenamerConfig) -> Result<()> {
    let directory = util::resolve_target_dir(Some(options.directory))?;
    let directory_id = util::compute_dir_id(&directory)?;
    let lock_dir = lock_dir_for(&directory_id)?;
    let lock = WatchLock::acquire(&lock_dir, &directory_id, &directory)?;

    let scanner = FileScanner::from_config(config)?;
    let renamer = FileRenamer::from_config(config);

    let (tx, mut rx) = mpsc::channel::<Event>(1024);
    let mut watcher = create_watcher(tx)?;
    let mode = if config.recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    watcher
        .watch(&directory, mode)
        .with_context(|| format!("failed to watch {}", directory.display()))?;

    tracing::info!(
        directory_id = %directory_id,
        directory = %directory.display(),
        "watcher started"
    );
    println!(
        "Watching {} - drop items to rename them (Ctrl+C to stop)",
        directory.display()
    );

    #[cfg(unix)]
    {
        let mut ctrl_c = Box::pin(tokio::signal::ctrl_c());
        let mut sigterm_stream =
            signal(SignalKind::terminate()).context("failed to listen for SIGTERM")?;
        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("SIGINT received, shutting down watcher");
                    break;
                }
                _ = sigterm_stream.recv() => {
                    tracing::info!("SIGTERM received, shutting down watcher");
                    break;
                }
                batch = microbatch::next_batch(&mut rx, options.window) => {
                    match batch {
                        Some(batch) => {
                            process_batch(batch, &directory, &scanner, &renamer, options.dry_run);
                        }
                        None => break,
                    }
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        let mut ctrl_c = Box::pin(tokio::signal::ctrl_c());
        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("SIGINT received, shutting down watcher");
                    break;
                }
                batch = microbatch::next_batch(&mut rx, options.window) => {
                    match batch {
                        Some(batch) => {
                            process_batch(batch, &directory, &scanner, &renamer, options.dry_run);
                        }
                        None => break,
                    }
                }
            }
        }
    }
    lock.release();
    Ok(())
}

fn create_watcher(tx: mpsc::Sender<Event>) -> Result<RecommendedWatcher> {
    let watcher = recommended_watcher(move |res| match res {
        Ok(event) => {
            if let Err(err) = tx.blocking_send(event) {
                tracing::warn!(%err, "dropping fs event");
            }
        }
        Err(err) => tracing::error!(error = %err, "watch error"),
    })?;
    Ok(watcher)
}

fn process_batch(
    batch: microbatch::Batch,
    directory: &Path,
    scanner: &FileScanner,
    renamer: &FileRenamer,
    dry_run: bool,
) {
    for path in collect_created_paths(&batch.events, directory) {
        let Some(item) = scanner.scan_single_item(&path) else {
            continue;
        };
        if item.has_date_prefix {
            tracing::debug!(item = %item.name, "already prefixed, leaving alone");
            continue;
        }
        match renamer.rename_in_place(&item, dry_run) {
            Ok(operation) => match operation.status {
                OperationStatus::Completed if dry_run => {
                    println!(
                        "would rename {} -> {}",
                        operation.original_name, operation.target_name
                    );
                }
                OperationStatus::Completed => {
                    println!(
                        "renamed {} -> {}",
                        operation.original_name, operation.target_name
                    );
                }
                OperationStatus::Failed => {
                    println!(
                        "failed {}: {}",
                        operation.original_name,
                        operation.error_message.as_deref().unwrap_or("unknown error")
                    );
                }
                _ => {}
            },
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "could not plan rename");
            }
        }
    }
}

// Creation and rename-to events only; everything else (writes, deletions,
// metadata churn) is noise for in-place prefixing.
fn collect_created_paths(events: &[Event], directory: &Path) -> BTreeSet<PathBuf> {
    let mut paths = BTreeSet::new();
    for event in events {
        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(_))
        ) {
            continue;
        }
        for path in &event.paths {
            if path.starts_with(directory) && path.exists() {
                paths.insert(path.clone());
            }
        }
    }
    paths
}
