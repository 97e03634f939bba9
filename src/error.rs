//! Error types shared across the crate
//!
//! Only validation failures reach callers. Persistence failures are
//! recovered inside `PersistentStore::load`/`save` and surface as log
//! warnings plus a `false` return.

use std::path::PathBuf;

use thiserror::Error;

/// A score record (or part of one) fell outside its allowed domain
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("unknown game mode '{0}'")]
    UnknownGameMode(String),
    #[error("unknown character '{0}'")]
    UnknownCharacter(String),
    #[error("unknown difficulty '{0}'")]
    UnknownDifficulty(String),
    #[error("score must be finite, got {0}")]
    NonFiniteScore(f64),
    #[error("elapsed time must be finite and non-negative, got {0}")]
    InvalidElapsedTime(f64),
    #[error("combo multiplier must be finite and positive, got {0}")]
    InvalidCombo(f64),
    #[error("malformed score record: {0}")]
    Malformed(String),
}

/// Failures reading or writing the save file
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("save document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("save document root must be an object, found {0}")]
    NotAnObject(&'static str),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PersistenceError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors returned by the score ledger
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("leaderboard JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("leaderboard export is missing its 'entries' array")]
    MissingEntries,
}
