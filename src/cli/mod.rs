use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use nu_ansi_term::Color::{Green, Red, Yellow};
use serde_json::{self, json};

use crate::config::{self, RenamerConfig};
use crate::models::{
    DateFormatStyle, OperationKind, OperationResult, OperationStatus, ValidationLevel,
};
use crate::renamer::FileRenamer;
use crate::runtime;
use crate::scanner::FileScanner;
use crate::session::SessionManager;
use crate::util;
use crate::watcher::{self, is_process_alive, send_terminate, WatchLock, WatchOptions};

#[derive(Parser)]
#[command(author, version, about = "Prefix files and folders with their creation date")]
pub struct Cli {
    #[arg(short, long, action = ArgAction::Count, help = "Increase verbosity (-v, -vv)")]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    Run(RunArgs),
    Scan(ScanArgs),
    Single(SingleArgs),
    Watch(WatchArgs),
    Stop(StopArgs),
    Formats,
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ConfigOverrides {
    #[arg(long, value_enum, help = "Date prefix style")]
    pub format: Option<DateFormatStyle>,
    #[arg(long, value_enum, help = "Validation strictness")]
    pub level: Option<ValidationLevel>,
    #[arg(long, help = "Do not recurse into subdirectories")]
    pub no_recursive: bool,
    #[arg(long, help = "Include hidden items")]
    pub include_hidden: bool,
    #[arg(long, help = "Include symbolic links (they are never recursed into)")]
    pub follow_symlinks: bool,
    #[arg(long, help = "Copy files to <name>.bak before renaming")]
    pub backup: bool,
    #[arg(long, help = "Allow overwriting an existing target")]
    pub allow_overwrites: bool,
    #[arg(long, help = "Maximum scan depth below the target directory")]
    pub max_depth: Option<usize>,
    #[arg(
        long = "ext",
        value_name = "EXT",
        help = "Only process these file extensions (repeatable)"
    )]
    pub extensions: Vec<String>,
    #[arg(
        long = "exclude",
        value_name = "GLOB",
        help = "Exclude items matching this glob (repeatable)"
    )]
    pub exclude: Vec<String>,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut RenamerConfig) {
        if let Some(format) = self.format {
            config.date_format = format;
        }
        if let Some(level) = self.level {
            config.validation_level = level;
        }
        if self.no_recursive {
            config.recursive = false;
        }
        if self.include_hidden {
            config.include_hidden_files = true;
        }
        if self.follow_symlinks {
            config.follow_symlinks = true;
        }
        if self.backup {
            config.create_backups = true;
        }
        if self.allow_overwrites {
            config.allow_overwrites = true;
        }
        if let Some(depth) = self.max_depth {
            config.max_depth = Some(depth);
        }
        if !self.extensions.is_empty() {
            config.file_extensions = Some(self.extensions.iter().cloned().collect());
        }
        if !self.exclude.is_empty() {
            config.exclude_patterns = Some(self.exclude.iter().cloned().collect());
        }
    }
}

#[derive(Args)]
pub struct RunArgs {
    #[arg(short, long, help = "Target directory (defaults to CWD)")]
    pub path: Option<PathBuf>,
    #[arg(long, help = "Apply renames instead of previewing them")]
    pub apply: bool,
    #[arg(long, help = "Print the result as JSON")]
    pub json: bool,
    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

#[derive(Args)]
pub struct ScanArgs {
    #[arg(short, long, help = "Target directory (defaults to CWD)")]
    pub path: Option<PathBuf>,
    #[arg(long, help = "Print discovered items as JSON")]
    pub json: bool,
    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

#[derive(Args)]
pub struct SingleArgs {
    pub target: PathBuf,
    #[arg(long, help = "Apply the rename instead of previewing it")]
    pub apply: bool,
    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

#[derive(Args)]
pub struct WatchArgs {
    #[arg(short, long, help = "Directory to watch (defaults to CWD)")]
    pub path: Option<PathBuf>,
    #[arg(
        long,
        help = "Event debounce window in milliseconds",
        default_value_t = watcher::DEFAULT_WINDOW_MS
    )]
    pub window_ms: u64,
    #[arg(long, help = "Preview renames without touching the filesystem")]
    pub dry_run: bool,
    #[arg(long, help = "Run the watcher as a background daemon")]
    pub daemon: bool,
    #[arg(long, hide = true)]
    pub foreground: bool,
    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

#[derive(Args)]
pub struct StopArgs {
    #[arg(short, long, help = "Watched directory (defaults to CWD)")]
    pub path: Option<PathBuf>,
    #[arg(long, help = "Remove a stale lock even if the process is not running")]
    pub force: bool,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[arg(long, help = "Print only the config file path")]
    pub path_only: bool,
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    runtime::init_tracing(cli.verbose)?;
    match cli.command {
        Commands::Run(args) => handle_run(args),
        Commands::Scan(args) => handle_scan(args),
        Commands::Single(args) => handle_single(args),
        Commands::Watch(args) => handle_watch(args).await,
        Commands::Stop(args) => handle_stop(args),
        Commands::Formats => handle_formats(),
        Commands::Config(args) => handle_config(args),
    }
}

fn effective_config(overrides: &ConfigOverrides) -> Result<RenamerConfig> {
    let mut config = config::load_config()?;
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn handle_run(args: RunArgs) -> Result<()> {
    let RunArgs {
        path,
        apply,
        json,
        overrides,
    } = args;

    let config = effective_config(&overrides)?;
    let directory = util::resolve_target_dir(path)?;
    let recursive = config.recursive;
    let dry_run = !apply;

    let manager = SessionManager::new(&config)?;
    let mut progress = |phase: &str, _current: usize, _total: usize, message: &str| {
        if !json {
            println!("[{phase}] {message}");
        }
    };
    let result = manager.run_complete_workflow(&directory, dry_run, recursive, Some(&mut progress))?;

    if dry_run && !json {
        print_batch_warnings(&manager, &result);
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result, dry_run);
    }
    if result.has_errors() {
        bail!("{} operations failed", result.failed_operations.len());
    }
    Ok(())
}

// Pre-flight duplicate/collision report for previews: every problem in the
// batch is listed, not just the first.
fn print_batch_warnings(manager: &SessionManager, result: &OperationResult) {
    let planned: Vec<(String, String, PathBuf)> = result
        .session
        .rename_operations
        .iter()
        .filter(|op| op.kind != OperationKind::Skipped)
        .map(|op| {
            (
                op.original_name.clone(),
                op.target_name.clone(),
                op.item.path.clone(),
            )
        })
        .collect();
    for warning in manager
        .renamer()
        .validator()
        .validate_batch_operations(&planned)
    {
        println!("{} {}", Yellow.paint("warning:"), warning);
    }
}

fn print_result(result: &OperationResult, dry_run: bool) {
    for operation in &result.session.rename_operations {
        match operation.status {
            OperationStatus::Completed if dry_run => println!(
                "  {} {} -> {}",
                Green.paint("preview"),
                operation.original_name,
                operation.target_name
            ),
            OperationStatus::Completed => println!(
                "  {} {} -> {}",
                Green.paint("renamed"),
                operation.original_name,
                operation.target_name
            ),
            OperationStatus::Skipped => {
                println!("  {} {}", Yellow.paint("skipped"), operation.original_name)
            }
            OperationStatus::Failed => println!(
                "  {} {}: {}",
                Red.paint("failed"),
                operation.original_name,
                operation.error_message.as_deref().unwrap_or("unknown error")
            ),
            OperationStatus::Cancelled => println!(
                "  {} {}",
                Yellow.paint("cancelled"),
                operation.original_name
            ),
            _ => {}
        }
    }
    println!("{}", result.summary_message);
    if dry_run {
        println!("Dry run only - re-run with --apply to rename.");
    }
    println!("Success rate: {:.1}%", result.success_rate());
}

fn handle_scan(args: ScanArgs) -> Result<()> {
    let ScanArgs {
        path,
        json,
        overrides,
    } = args;

    let config = effective_config(&overrides)?;
    let directory = util::resolve_target_dir(path)?;
    let scanner = FileScanner::from_config(&config)?;
    let outcome = scanner.scan_directory(&directory, config.recursive, None)?;

    if json {
        let payload = json!({
            "directory": directory.to_string_lossy(),
            "items": outcome.items,
            "stats": outcome.stats,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("Scan of {}:", directory.display());
    for item in &outcome.items {
        let shown = item
            .path
            .strip_prefix(&directory)
            .unwrap_or(&item.path)
            .display();
        let kind = if item.is_directory { "dir " } else { "file" };
        let marker = if item.has_date_prefix {
            "  [prefixed]"
        } else {
            ""
        };
        println!(
            "  {} {:<10} {:>10} {}{}",
            kind,
            item.created.format("%Y-%m-%d"),
            item.size_bytes,
            shown,
            marker
        );
    }
    println!(
        "Found {} items ({} files, {} directories); skipped {} (hidden {}, symlinks {}, excluded {}), {} permission errors",
        outcome.stats.total_found(),
        outcome.stats.files_found,
        outcome.stats.directories_found,
        outcome.stats.total_skipped(),
        outcome.stats.hidden_skipped,
        outcome.stats.symlinks_skipped,
        outcome.stats.excluded_items,
        outcome.stats.permission_errors
    );
    Ok(())
}

fn handle_single(args: SingleArgs) -> Result<()> {
    let SingleArgs {
        target,
        apply,
        overrides,
    } = args;

    let config = effective_config(&overrides)?;
    let path = target
        .canonicalize()
        .with_context(|| format!("item not found: {}", target.display()))?;

    let scanner = FileScanner::from_config(&config)?;
    let renamer = FileRenamer::from_config(&config);
    let item = scanner
        .scan_single_item(&path)
        .with_context(|| format!("item is excluded or unreadable: {}", path.display()))?;

    let operation = renamer.rename_in_place(&item, !apply)?;
    match operation.status {
        OperationStatus::Completed if !apply => {
            println!(
                "{} {} -> {}",
                Green.paint("preview"),
                operation.original_name,
                operation.target_name
            );
            println!("Dry run only - re-run with --apply to rename.");
        }
        OperationStatus::Completed => {
            println!(
                "{} {} -> {}",
                Green.paint("renamed"),
                operation.original_name,
                operation.target_name
            );
            println!("New path: {}", operation.target_path().display());
        }
        OperationStatus::Skipped => {
            println!("{} {} already has a date prefix", Yellow.paint("skipped"), operation.original_name);
        }
        _ => {
            bail!(
                "rename failed: {}",
                operation.error_message.as_deref().unwrap_or("unknown error")
            );
        }
    }
    Ok(())
}

async fn handle_watch(args: WatchArgs) -> Result<()> {
    let WatchArgs {
        path,
        window_ms,
        dry_run,
        daemon,
        foreground,
        overrides,
    } = args;

    let config = effective_config(&overrides)?;
    let directory = util::resolve_target_dir(path)?;

    if daemon && !foreground {
        let exe = std::env::current_exe().context("failed to resolve current executable")?;
        let mut cmd = Command::new(exe);
        cmd.arg("watch")
            .arg("--foreground")
            .arg("--window-ms")
            .arg(window_ms.to_string())
            .arg("--path")
            .arg(directory.to_string_lossy().to_string());
        if dry_run {
            cmd.arg("--dry-run");
        }
        forward_overrides(&mut cmd, &overrides);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        let child = cmd.spawn().context("failed to spawn watcher daemon")?;
        println!(
            "Watcher daemon started (pid {}) for {}",
            child.id(),
            directory.display()
        );
        return Ok(());
    }

    let options = WatchOptions {
        directory,
        window: Duration::from_millis(window_ms),
        dry_run,
    };
    watcher::watch(options, &config).await
}

fn forward_overrides(cmd: &mut Command, overrides: &ConfigOverrides) {
    if let Some(format) = overrides.format {
        cmd.arg("--format").arg(format.to_string());
    }
    if let Some(level) = overrides.level {
        cmd.arg("--level").arg(level.to_string());
    }
    if overrides.no_recursive {
        cmd.arg("--no-recursive");
    }
    if overrides.include_hidden {
        cmd.arg("--include-hidden");
    }
    if overrides.follow_symlinks {
        cmd.arg("--follow-symlinks");
    }
    if overrides.backup {
        cmd.arg("--backup");
    }
    if overrides.allow_overwrites {
        cmd.arg("--allow-overwrites");
    }
    if let Some(depth) = overrides.max_depth {
        cmd.arg("--max-depth").arg(depth.to_string());
    }
    for ext in &overrides.extensions {
        cmd.arg("--ext").arg(ext);
    }
    for pattern in &overrides.exclude {
        cmd.arg("--exclude").arg(pattern);
    }
}

fn handle_stop(args: StopArgs) -> Result<()> {
    let StopArgs { path, force } = args;

    let directory = util::resolve_target_dir(path)?;
    let directory_id = util::compute_dir_id(&directory)?;
    let lock_dir = watcher::lock_dir_for(&directory_id)?;

    let lock_info = match WatchLock::read(&lock_dir)? {
        Some(info) => info,
        None => {
            println!("No active watcher for {}", directory.display());
            return Ok(());
        }
    };

    if is_process_alive(lock_info.pid) {
        send_terminate(lock_info.pid)?;
        println!("Sent SIGTERM to watcher pid {}", lock_info.pid);
    } else if !force {
        println!(
            "Watcher process {} not running; use --force to clear the lock",
            lock_info.pid
        );
        return Ok(());
    } else {
        println!("Removing stale lock for {}", directory.display());
    }

    let lock_path = WatchLock::path(&lock_dir);
    fs::remove_file(&lock_path).ok();
    println!("Stopped watcher for {}", directory.display());
    Ok(())
}

fn handle_formats() -> Result<()> {
    println!(
        "{:<12} {:<10} {:<12} {}",
        "Name", "Pattern", "Example", "Description"
    );
    for style in DateFormatStyle::all() {
        println!(
            "{:<12} {:<10} {:<12} {}",
            style.to_string(),
            style.chrono_format(),
            style.example(),
            style.description()
        );
    }
    Ok(())
}

fn handle_config(args: ConfigArgs) -> Result<()> {
    let path = config::config_file_path()?;
    if args.path_only {
        println!("{}", path.display());
        return Ok(());
    }
    let config = config::load_config()?;
    println!("Config file: {}", path.display());
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
