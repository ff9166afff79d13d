use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::config::RenamerConfig;
use crate::date;
use crate::error::{RenamerError, Result};
use crate::models::{DateFormatStyle, ValidationLevel};

type PatternCheck = fn(&str) -> bool;

// Ordered: the reduced set used by Normal and Permissive is the first four
// entries, Strict checks all six.
const FORBIDDEN_PATTERNS: &[(&str, PatternCheck)] = &[
    ("control characters", has_control_chars),
    ("reserved characters", has_reserved_chars),
    ("reserved device name", is_reserved_device_name),
    ("leading dot", has_leading_dot),
    ("trailing dot", has_trailing_dot),
    ("trailing whitespace", has_trailing_whitespace),
];

const REDUCED_PATTERN_COUNT: usize = 4;

const RESERVED_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

fn has_control_chars(name: &str) -> bool {
    name.chars().any(|c| (c as u32) < 0x20)
}

fn has_reserved_chars(name: &str) -> bool {
    name.chars()
        .any(|c| matches!(c, '<' | '>' | ':' | '"' | '|' | '?' | '*'))
}

fn is_reserved_device_name(name: &str) -> bool {
    let upper = name.to_uppercase();
    RESERVED_DEVICE_NAMES
        .iter()
        .any(|reserved| upper == *reserved || upper.starts_with(&format!("{reserved}.")))
}

fn has_leading_dot(name: &str) -> bool {
    name.starts_with('.')
}

fn has_trailing_dot(name: &str) -> bool {
    name.ends_with('.')
}

fn has_trailing_whitespace(name: &str) -> bool {
    name.ends_with(char::is_whitespace)
}

pub struct PrefixValidator {
    level: ValidationLevel,
    allowed_extensions: Option<BTreeSet<String>>,
    max_filename_length: usize,
}

impl PrefixValidator {
    pub fn new(
        level: ValidationLevel,
        allowed_extensions: Option<BTreeSet<String>>,
        max_filename_length: usize,
    ) -> Self {
        Self {
            level,
            allowed_extensions,
            max_filename_length,
        }
    }

    pub fn from_config(config: &RenamerConfig) -> Self {
        Self::new(
            config.validation_level,
            config.normalized_extensions(),
            config.max_filename_length,
        )
    }

    pub fn has_date_prefix(&self, filename: &str) -> bool {
        date::has_date_prefix(filename)
    }

    /// Builds a prefixed target name and guarantees it is usable: structural
    /// checks pass, the length limit holds (the stem is truncated to fit;
    /// the prefix and extension never are), and the extension whitelist is
    /// honored.
    pub fn generate_target_name(
        &self,
        original_name: &str,
        creation_date: DateTime<Local>,
        style: DateFormatStyle,
    ) -> Result<String> {
        let mut target = date::generate_target_name(original_name, creation_date, style);
        if !self.validate_structure(&target) {
            return Err(RenamerError::validation(
                target,
                "generated name failed structural validation",
            ));
        }
        if target.chars().count() > self.max_filename_length {
            target = self.truncate_to_fit(&target)?;
        }
        if let Some(allowed) = &self.allowed_extensions {
            if let Some(ext) = extension_of(&target) {
                if !allowed.contains(&ext) {
                    return Err(RenamerError::validation(
                        target,
                        format!("extension .{ext} is not in the allowed list"),
                    ));
                }
            }
        }
        Ok(target)
    }

    fn truncate_to_fit(&self, target: &str) -> Result<String> {
        let prefix_end = target.find('_').map(|i| i + 1).unwrap_or(0);
        let prefix_part = &target[..prefix_end];
        let extension = Path::new(target)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let reserved = prefix_part.chars().count() + extension.chars().count();
        let available = self.max_filename_length.saturating_sub(reserved);
        if available < 1 {
            return Err(RenamerError::validation(
                target,
                "prefix and extension alone exceed the maximum filename length",
            ));
        }
        let stem = &target[prefix_end..target.len() - extension.len()];
        let truncated: String = stem.chars().take(available).collect();
        Ok(format!("{prefix_part}{truncated}{extension}"))
    }

    /// Composite safety check for a proposed name: structure, length,
    /// extension whitelist, collision with existing paths (case-insensitive
    /// on filesystems detected as such) and cross-platform compatibility.
    pub fn validate_target_name(&self, target_name: &str, original_path: &Path) -> bool {
        if !self.validate_structure(target_name) {
            return false;
        }
        if target_name.chars().count() > self.max_filename_length {
            return false;
        }
        if let Some(allowed) = &self.allowed_extensions {
            if let Some(ext) = extension_of(target_name) {
                if !allowed.contains(&ext) {
                    return false;
                }
            }
        }
        let parent = match original_path.parent() {
            Some(parent) => parent.to_path_buf(),
            None => return false,
        };
        if self.collides(&parent.join(target_name), original_path) {
            return false;
        }
        platform_compatible(target_name)
    }

    pub fn validate_structure(&self, name: &str) -> bool {
        if name.trim().is_empty() {
            return false;
        }
        let patterns: &[(&str, PatternCheck)] = match self.level {
            ValidationLevel::Disabled => &[],
            ValidationLevel::Strict => FORBIDDEN_PATTERNS,
            ValidationLevel::Normal | ValidationLevel::Permissive => {
                &FORBIDDEN_PATTERNS[..REDUCED_PATTERN_COUNT]
            }
        };
        for (pattern, check) in patterns {
            if check(name) {
                tracing::debug!(name = %name, pattern = %pattern, "structural check failed");
                return false;
            }
        }
        true
    }

    fn collides(&self, target_path: &Path, original_path: &Path) -> bool {
        if target_path == original_path {
            return false;
        }
        if target_path.exists() {
            return true;
        }
        let Some(parent) = target_path.parent() else {
            return false;
        };
        if !is_case_insensitive_filesystem(parent) {
            return false;
        }
        let Some(target_name) = target_path.file_name() else {
            return false;
        };
        let wanted = target_name.to_string_lossy().to_lowercase();
        let Ok(entries) = fs::read_dir(parent) else {
            return false;
        };
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().to_lowercase() == wanted
                && entry.path() != original_path
            {
                return true;
            }
        }
        false
    }

    /// Validates a whole batch, reporting every problem instead of stopping
    /// at the first: per-name validation plus case-insensitive duplicate
    /// targets within the batch itself.
    pub fn validate_batch_operations(
        &self,
        operations: &[(String, String, PathBuf)],
    ) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen_targets: BTreeSet<String> = BTreeSet::new();
        for (_original_name, target_name, path) in operations {
            if !self.validate_target_name(target_name, path) {
                errors.push(format!("Invalid target name: {target_name}"));
                continue;
            }
            let lowered = target_name.to_lowercase();
            if seen_targets.contains(&lowered) {
                errors.push(format!("Duplicate target name in batch: {target_name}"));
            } else {
                seen_targets.insert(lowered);
            }
        }
        errors
    }

    /// Appends a zero-padded numeric suffix before the extension until a
    /// free, valid name is found. None when `max_attempts` is exhausted.
    pub fn suggest_alternative_name(
        &self,
        target_name: &str,
        directory: &Path,
        max_attempts: usize,
    ) -> Option<String> {
        let path = Path::new(target_name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| target_name.to_string());
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        for attempt in 1..=max_attempts {
            let alternative = format!("{stem}_{attempt:03}{extension}");
            if directory.join(&alternative).exists() {
                continue;
            }
            if self.validate_target_name(&alternative, &directory.join("dummy")) {
                return Some(alternative);
            }
        }
        None
    }
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

// Always enforced regardless of validation level: names that can never be
// represented on one of the supported platforms.
fn platform_compatible(name: &str) -> bool {
    if is_reserved_device_name(name) {
        return false;
    }
    if has_reserved_chars(name) {
        return false;
    }
    !has_control_chars(name)
}

/// Case-insensitivity heuristic: when a lowercase/uppercase probe pair is
/// present in the directory, compare their identities; otherwise assume the
/// platform default (Windows and macOS case-insensitive, others sensitive).
fn is_case_insensitive_filesystem(directory: &Path) -> bool {
    let lower = directory.join("test_case_sensitivity.tmp");
    let upper = directory.join("TEST_CASE_SENSITIVITY.TMP");
    if lower.exists() && upper.exists() {
        match (lower.canonicalize(), upper.canonicalize()) {
            (Ok(a), Ok(b)) => return a == b,
            _ => {}
        }
    }
    cfg!(any(target_os = "windows", target_os = "macos"))
}
