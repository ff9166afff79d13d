use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{RenamerError, Result};
use crate::models::{DateFormatStyle, ValidationLevel};
use crate::util;

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenamerConfig {
    pub date_format: DateFormatStyle,
    pub validation_level: ValidationLevel,
    pub recursive: bool,
    pub include_hidden_files: bool,
    pub follow_symlinks: bool,
    pub create_backups: bool,
    pub allow_overwrites: bool,
    pub max_depth: Option<usize>,
    pub max_filename_length: usize,
    pub file_extensions: Option<BTreeSet<String>>,
    pub exclude_patterns: Option<BTreeSet<String>>,
}

impl Default for RenamerConfig {
    fn default() -> Self {
        Self {
            date_format: DateFormatStyle::IsoDate,
            validation_level: ValidationLevel::Normal,
            recursive: true,
            include_hidden_files: false,
            follow_symlinks: false,
            create_backups: false,
            allow_overwrites: false,
            max_depth: None,
            max_filename_length: 255,
            file_extensions: None,
            exclude_patterns: None,
        }
    }
}

impl RenamerConfig {
    /// Extension whitelist normalized for comparison against
    /// `Path::extension` output: lowercase, no leading dot.
    pub fn normalized_extensions(&self) -> Option<BTreeSet<String>> {
        self.file_extensions.as_ref().map(|extensions| {
            extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect()
        })
    }

    pub fn build_exclude_globset(&self) -> Result<Option<GlobSet>> {
        let Some(patterns) = self.exclude_patterns.as_ref() else {
            return Ok(None);
        };
        if patterns.is_empty() {
            return Ok(None);
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|err| {
                RenamerError::Config(format!("invalid exclude pattern {pattern:?}: {err}"))
            })?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|err| RenamerError::Config(format!("failed to build exclude patterns: {err}")))?;
        Ok(Some(set))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_filename_length == 0 {
            return Err(RenamerError::Config(
                "max_filename_length must be at least 1".to_string(),
            ));
        }
        self.build_exclude_globset()?;
        Ok(())
    }
}

pub fn config_file_path() -> anyhow::Result<PathBuf> {
    Ok(util::datestamp_root()?.join(CONFIG_FILE))
}

/// Loads the config file, creating a default one on first use. A corrupted
/// file logs a warning and falls back to defaults instead of aborting.
pub fn load_config() -> anyhow::Result<RenamerConfig> {
    let path = config_file_path()?;
    if !path.exists() {
        let config = RenamerConfig::default();
        save_config(&config)?;
        tracing::info!(path = %path.display(), "created default config");
        return Ok(config);
    }
    let content = fs::read_to_string(&path)?;
    match serde_json::from_str::<RenamerConfig>(&content) {
        Ok(config) => Ok(config),
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "failed to parse config, falling back to defaults"
            );
            Ok(RenamerConfig::default())
        }
    }
}

pub fn save_config(config: &RenamerConfig) -> anyhow::Result<()> {
    let path = config_file_path()?;
    if let Some(parent) = path.parent() {
        util::ensure_dir(parent)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(&path, json)?;
    Ok(())
}
