use chrono::{DateTime, Local, TimeZone};
use datestamp::date;
use datestamp::models::{DateFormatStyle, FileSystemItem, OperationKind, RenameOperation};

fn march_15() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
}

#[test]
fn generated_prefixes_are_detected_again() {
    for style in DateFormatStyle::detection_order() {
        let target = date::generate_target_name("report.txt", march_15(), style);
        let prefix = date::extract_prefix_from_name(&target)
            .unwrap_or_else(|| panic!("prefix not detected for {style}: {target}"));
        assert_eq!(format!("{prefix}_"), date::format_date_prefix(march_15(), style));
    }
}

#[test]
fn existing_prefix_is_replaced_not_stacked() {
    let target = date::generate_target_name("2020-05-05_notes.txt", march_15(), DateFormatStyle::IsoDate);
    assert_eq!(target, "2024-03-15_notes.txt");

    // Re-prefixing the result again keeps exactly one prefix.
    let again = date::generate_target_name(&target, march_15(), DateFormatStyle::IsoDate);
    assert_eq!(again, target);
}

#[test]
fn prefix_detection_rejects_non_dates() {
    assert!(!date::has_date_prefix("not_a_date_file.txt"));
    assert!(date::has_date_prefix("2024-01-15_report.txt"));
    assert!(!date::has_date_prefix("9999-99-99_bad.txt"));
}

#[test]
fn prefix_detection_requires_separator() {
    assert!(!date::has_date_prefix("2024-01-15report.txt"));
    assert!(!date::has_date_prefix("2024-01-15"));
}

#[test]
fn prefix_detection_rejects_future_and_ancient_dates() {
    assert!(!date::has_date_prefix("2099-01-01_file.txt"));
    assert!(!date::has_date_prefix("1950-01-01_file.txt"));
}

#[test]
fn day_first_prefixes_are_not_detected() {
    // The detection list covers ISO, US, compact and year-month only, so a
    // DDMMYYYY-prefixed name is treated as unprefixed and gets re-prefixed.
    let target = date::generate_target_name("photo.jpg", march_15(), DateFormatStyle::Ddmmyyyy);
    assert_eq!(target, "15032024_photo.jpg");
    assert!(!date::has_date_prefix(&target));
}

#[test]
fn year_month_prefix_roundtrip() {
    let target = date::generate_target_name("archive", march_15(), DateFormatStyle::YearMonth);
    assert_eq!(target, "2024-03_archive");
    assert_eq!(date::extract_prefix_from_name(&target).as_deref(), Some("2024-03"));
}

#[test]
fn date_from_prefix_parses_supported_styles() {
    let expected = march_15().date_naive();
    assert_eq!(date::date_from_prefix("2024-03-15"), Some(expected));
    assert_eq!(date::date_from_prefix("03-15-2024"), Some(expected));
    assert_eq!(date::date_from_prefix("20240315"), Some(expected));
    assert_eq!(date::date_from_prefix("garbage"), None);
}

fn item_named(name: &str) -> FileSystemItem {
    FileSystemItem::new(
        std::path::PathBuf::from("/tmp/items").join(name),
        march_15(),
        march_15(),
        false,
        false,
        date::has_date_prefix(name),
        1,
    )
}

#[test]
fn operation_accepts_well_formed_prefixes() {
    let item = item_named("report.txt");
    let op = RenameOperation::new(item, "2024-03-15_report.txt".into(), OperationKind::FileRename);
    assert!(op.is_ok());
}

#[test]
fn operation_rejects_malformed_eight_char_prefix() {
    let item = item_named("report.txt");
    let op = RenameOperation::new(item, "99999999_report.txt".into(), OperationKind::FileRename);
    assert!(op.is_err());
}

#[test]
fn operation_rejects_malformed_ten_char_prefix() {
    let item = item_named("report.txt");
    let op = RenameOperation::new(item, "2024-13-99_report.txt".into(), OperationKind::FileRename);
    assert!(op.is_err());
}

#[test]
fn skipped_operation_with_unchanged_name_is_exempt() {
    let item = item_named("2024-01-01_old.txt");
    let op = RenameOperation::new(
        item,
        "2024-01-01_old.txt".into(),
        OperationKind::Skipped,
    );
    assert!(op.is_ok());
}
