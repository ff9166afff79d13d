use std::fs;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Datelike, Local, NaiveDate};

use crate::error::{RenamerError, Result};
use crate::models::DateFormatStyle;

/// Creation timestamp for a path, with the platform fallback chain: birth
/// time where the filesystem reports one, the inode-change time on Unix
/// systems without birth time, and the modification time when neither is
/// usable or the candidate lies in the future.
pub fn get_creation_date(path: &Path) -> Result<DateTime<Local>> {
    if !path.exists() && !path.is_symlink() {
        return Err(RenamerError::NotFound(path.to_path_buf()));
    }
    let meta = fs::metadata(path).map_err(|source| RenamerError::DateExtraction {
        source,
        path: path.to_path_buf(),
        source_field: "creation time",
    })?;
    let now = SystemTime::now();
    let candidate = creation_candidate(&meta).filter(|stamp| *stamp <= now);
    let stamp = match candidate {
        Some(stamp) => stamp,
        None => meta
            .modified()
            .map_err(|source| RenamerError::DateExtraction {
                source,
                path: path.to_path_buf(),
                source_field: "modification time",
            })?,
    };
    Ok(DateTime::<Local>::from(stamp))
}

fn creation_candidate(meta: &fs::Metadata) -> Option<SystemTime> {
    if let Ok(birth) = meta.created() {
        if birth > SystemTime::UNIX_EPOCH {
            return Some(birth);
        }
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let secs = meta.ctime();
        if secs > 0 {
            return Some(
                SystemTime::UNIX_EPOCH + std::time::Duration::new(secs as u64, meta.ctime_nsec() as u32),
            );
        }
    }
    None
}

pub fn format_date_prefix(date: DateTime<Local>, style: DateFormatStyle) -> String {
    format!("{}_", date.format(style.chrono_format()))
}

/// Returns the date prefix (without the separator) if `filename` starts with
/// one. Candidates are matched in a fixed priority order, must be followed by
/// the `_` separator, must parse strictly, and must not be in the future or
/// before 1970.
pub fn extract_prefix_from_name(filename: &str) -> Option<String> {
    let today = Local::now().date_naive();
    for style in DateFormatStyle::detection_order() {
        let len = style.prefix_len();
        if filename.len() <= len || filename.as_bytes()[len] != b'_' {
            continue;
        }
        let Some(candidate) = filename.get(..len) else {
            continue;
        };
        if let Some(date) = parse_prefix_with(candidate, style) {
            if date <= today && date.year() >= 1970 {
                return Some(candidate.to_string());
            }
        }
    }
    None
}

pub fn has_date_prefix(filename: &str) -> bool {
    extract_prefix_from_name(filename).is_some()
}

/// Prepends a freshly formatted prefix, replacing any existing valid prefix
/// rather than stacking a second one.
pub fn generate_target_name(original: &str, date: DateTime<Local>, style: DateFormatStyle) -> String {
    let bare = match extract_prefix_from_name(original) {
        Some(prefix) => &original[prefix.len() + 1..],
        None => original,
    };
    format!("{}{}", format_date_prefix(date, style), bare)
}

pub fn date_from_prefix(prefix: &str) -> Option<NaiveDate> {
    DateFormatStyle::detection_order()
        .into_iter()
        .find_map(|style| parse_prefix_with(prefix, style))
}

fn parse_prefix_with(candidate: &str, style: DateFormatStyle) -> Option<NaiveDate> {
    match style {
        DateFormatStyle::Compact | DateFormatStyle::Ddmmyyyy => {
            if candidate.len() != 8 || !candidate.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let (year, month, day) = if style == DateFormatStyle::Compact {
                (&candidate[..4], &candidate[4..6], &candidate[6..8])
            } else {
                (&candidate[4..8], &candidate[2..4], &candidate[..2])
            };
            NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
        }
        DateFormatStyle::YearMonth => {
            NaiveDate::parse_from_str(&format!("{candidate}-01"), "%Y-%m-%d").ok()
        }
        _ => NaiveDate::parse_from_str(candidate, style.chrono_format()).ok(),
    }
}
