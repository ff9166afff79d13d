use std::fs;
use std::path::Path;

use datestamp::config::RenamerConfig;
use datestamp::error::RenamerError;
use datestamp::scanner::FileScanner;

fn scanner_with(config: &RenamerConfig) -> FileScanner {
    FileScanner::from_config(config).unwrap()
}

fn names(items: &[datestamp::models::FileSystemItem], root: &Path) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            item.path
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .to_string()
        })
        .collect()
}

fn build_tree(root: &Path) {
    fs::write(root.join("b.txt"), b"b").unwrap();
    fs::write(root.join("A.txt"), b"a").unwrap();
    fs::create_dir(root.join("zz")).unwrap();
    fs::write(root.join("zz").join("d.txt"), b"d").unwrap();
    fs::create_dir(root.join("sub")).unwrap();
    fs::write(root.join("sub").join("c.txt"), b"c").unwrap();
}

#[test]
fn traversal_is_deterministic_and_files_sort_before_directories() {
    let dir = tempfile::tempdir().unwrap();
    build_tree(dir.path());
    let scanner = scanner_with(&RenamerConfig::default());

    let first = scanner.scan_directory(dir.path(), true, None).unwrap();
    let second = scanner.scan_directory(dir.path(), true, None).unwrap();

    let expected = vec!["A.txt", "b.txt", "sub", "sub/c.txt", "zz", "zz/d.txt"];
    assert_eq!(names(&first.items, dir.path()), expected);
    assert_eq!(names(&second.items, dir.path()), expected);
}

#[test]
fn non_recursive_scan_stays_at_the_top_level() {
    let dir = tempfile::tempdir().unwrap();
    build_tree(dir.path());
    let scanner = scanner_with(&RenamerConfig::default());
    let outcome = scanner.scan_directory(dir.path(), false, None).unwrap();
    assert_eq!(
        names(&outcome.items, dir.path()),
        vec!["A.txt", "b.txt", "sub", "zz"]
    );
}

#[test]
fn max_depth_is_counted_from_the_scan_root() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("file0.txt"), b"0").unwrap();
    fs::create_dir(dir.path().join("d1")).unwrap();
    fs::write(dir.path().join("d1").join("file1.txt"), b"1").unwrap();
    fs::create_dir(dir.path().join("d1").join("d2")).unwrap();
    fs::write(dir.path().join("d1").join("d2").join("file2.txt"), b"2").unwrap();

    let config = RenamerConfig {
        max_depth: Some(0),
        ..RenamerConfig::default()
    };
    let outcome = scanner_with(&config)
        .scan_directory(dir.path(), true, None)
        .unwrap();
    assert_eq!(names(&outcome.items, dir.path()), vec!["file0.txt", "d1"]);

    let config = RenamerConfig {
        max_depth: Some(1),
        ..RenamerConfig::default()
    };
    let outcome = scanner_with(&config)
        .scan_directory(dir.path(), true, None)
        .unwrap();
    assert_eq!(
        names(&outcome.items, dir.path()),
        vec!["file0.txt", "d1", "d1/file1.txt", "d1/d2"]
    );
}

#[test]
fn hidden_items_are_skipped_unless_configured() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("visible.txt"), b"v").unwrap();
    fs::write(dir.path().join(".hidden.txt"), b"h").unwrap();
    fs::create_dir(dir.path().join(".hiddendir")).unwrap();
    fs::write(dir.path().join(".hiddendir").join("inner.txt"), b"i").unwrap();

    let default_scan = scanner_with(&RenamerConfig::default())
        .scan_directory(dir.path(), true, None)
        .unwrap();
    assert_eq!(names(&default_scan.items, dir.path()), vec!["visible.txt"]);
    assert_eq!(default_scan.stats.hidden_skipped, 2);

    let config = RenamerConfig {
        include_hidden_files: true,
        ..RenamerConfig::default()
    };
    let with_hidden = scanner_with(&config)
        .scan_directory(dir.path(), true, None)
        .unwrap();
    assert_eq!(
        names(&with_hidden.items, dir.path()),
        vec![".hidden.txt", "visible.txt", ".hiddendir", ".hiddendir/inner.txt"]
    );
}

#[test]
fn extension_whitelist_exempts_directories() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("keep.txt"), b"k").unwrap();
    fs::write(dir.path().join("drop.log"), b"d").unwrap();
    fs::create_dir(dir.path().join("folder")).unwrap();

    let config = RenamerConfig {
        file_extensions: Some(["txt".to_string()].into_iter().collect()),
        ..RenamerConfig::default()
    };
    let outcome = scanner_with(&config)
        .scan_directory(dir.path(), true, None)
        .unwrap();
    assert_eq!(names(&outcome.items, dir.path()), vec!["keep.txt", "folder"]);
    assert_eq!(outcome.stats.excluded_items, 1);
}

#[test]
fn exclude_globs_prune_matching_items() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("app.log"), b"l").unwrap();
    fs::write(dir.path().join("notes.txt"), b"n").unwrap();
    fs::create_dir(dir.path().join("cache")).unwrap();
    fs::write(dir.path().join("cache").join("entry.txt"), b"e").unwrap();

    let config = RenamerConfig {
        exclude_patterns: Some(
            ["*.log".to_string(), "cache".to_string()].into_iter().collect(),
        ),
        ..RenamerConfig::default()
    };
    let outcome = scanner_with(&config)
        .scan_directory(dir.path(), true, None)
        .unwrap();
    assert_eq!(names(&outcome.items, dir.path()), vec!["notes.txt"]);
    assert_eq!(outcome.stats.excluded_items, 2);
}

#[test]
fn scan_statistics_count_files_and_directories() {
    let dir = tempfile::tempdir().unwrap();
    build_tree(dir.path());
    let outcome = scanner_with(&RenamerConfig::default())
        .scan_directory(dir.path(), true, None)
        .unwrap();
    assert_eq!(outcome.stats.files_found, 4);
    assert_eq!(outcome.stats.directories_found, 2);
    assert_eq!(outcome.stats.total_found(), 6);
}

#[test]
fn bad_scan_targets_are_typed_errors() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("plain.txt");
    fs::write(&file, b"x").unwrap();
    let scanner = scanner_with(&RenamerConfig::default());

    let missing = scanner.scan_directory(&dir.path().join("nope"), true, None);
    assert!(matches!(missing, Err(RenamerError::NotFound(_))));

    let not_dir = scanner.scan_directory(&file, true, None);
    assert!(matches!(not_dir, Err(RenamerError::NotADirectory(_))));
}

#[test]
fn scan_single_item_honors_exclusions() {
    let dir = tempfile::tempdir().unwrap();
    let visible = dir.path().join("doc.txt");
    let hidden = dir.path().join(".secret");
    fs::write(&visible, b"v").unwrap();
    fs::write(&hidden, b"s").unwrap();

    let scanner = scanner_with(&RenamerConfig::default());
    let item = scanner.scan_single_item(&visible).unwrap();
    assert_eq!(item.name, "doc.txt");
    assert!(!item.is_directory);
    assert_eq!(item.extension().as_deref(), Some("txt"));
    assert!(scanner.scan_single_item(&hidden).is_none());
}

#[test]
fn progress_callback_sees_every_discovered_item() {
    let dir = tempfile::tempdir().unwrap();
    build_tree(dir.path());
    let scanner = scanner_with(&RenamerConfig::default());
    let mut seen = Vec::new();
    let mut callback = |count: usize, path: &Path| {
        seen.push((count, path.to_path_buf()));
    };
    let outcome = scanner
        .scan_directory(dir.path(), true, Some(&mut callback))
        .unwrap();
    assert_eq!(seen.len(), outcome.items.len());
    assert_eq!(seen.last().unwrap().0, outcome.items.len());
}

#[cfg(unix)]
#[test]
fn symlinks_are_skipped_unless_followed() {
    use std::os::unix::fs::symlink;

    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("real.txt"), b"r").unwrap();
    symlink(dir.path().join("real.txt"), dir.path().join("link.txt")).unwrap();

    let default_scan = scanner_with(&RenamerConfig::default())
        .scan_directory(dir.path(), true, None)
        .unwrap();
    assert_eq!(names(&default_scan.items, dir.path()), vec!["real.txt"]);
    assert_eq!(default_scan.stats.symlinks_skipped, 1);

    let config = RenamerConfig {
        follow_symlinks: true,
        ..RenamerConfig::default()
    };
    let followed = scanner_with(&config)
        .scan_directory(dir.path(), true, None)
        .unwrap();
    let link = followed
        .items
        .iter()
        .find(|item| item.name == "link.txt")
        .expect("symlink included when followed");
    assert!(link.is_symlink);
}
