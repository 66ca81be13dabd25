//! CLI errors.

use minikv_core::CoreError;
use thiserror::Error;

/// A failed command.
#[derive(Debug, Error)]
pub enum CliError {
    /// `--dir` was not given.
    #[error("data directory required (--dir)")]
    MissingDir,

    /// The engine refused the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// JSON output failed.
    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),
}
