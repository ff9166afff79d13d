use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenamerError {
    #[error("{operation} failed for {}: {source}", .path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
        operation: &'static str,
    },

    #[error("path does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("invalid name {name:?}: {constraint}")]
    Validation { name: String, constraint: String },

    #[error("could not read a {source_field} timestamp for {}: {source}", .path.display())]
    DateExtraction {
        #[source]
        source: std::io::Error,
        path: PathBuf,
        source_field: &'static str,
    },

    #[error("rename target already exists: {} -> {}", .source_path.display(), .target_path.display())]
    Conflict {
        source_path: PathBuf,
        target_path: PathBuf,
    },

    #[error("session error ({}): {message}", .session_id.as_deref().unwrap_or("no active session"))]
    Session {
        session_id: Option<String>,
        message: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RenamerError {
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>, operation: &'static str) -> Self {
        Self::Io {
            source,
            path: path.into(),
            operation,
        }
    }

    pub fn validation(name: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self::Validation {
            name: name.into(),
            constraint: constraint.into(),
        }
    }

    pub fn session(session_id: Option<String>, message: impl Into<String>) -> Self {
        Self::Session {
            session_id,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RenamerError>;
