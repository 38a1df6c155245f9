use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("feedback CSV not found at {}", .path.display())]
    InputNotFound { path: PathBuf },

    #[error("feedback CSV {} is missing required column `{column}`", .path.display())]
    MissingColumn { column: &'static str, path: PathBuf },

    #[error("feedback CSV {} has more than one header for column `{column}`", .path.display())]
    DuplicateColumn { column: &'static str, path: PathBuf },

    #[error("failed to read feedback CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("stage 1 output {} is unusable: {reason}; run `trainer-scout score` first", .path.display())]
    MissingStage1Output { path: PathBuf, reason: String },

    #[error("failed to write {} artifact(s): {}", .failed.len(), .failed.join(", "))]
    ArtifactWrite { failed: Vec<String> },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A CSV row that was skipped during ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRow {
    pub row_id: String,
    pub reason: String,
}

impl fmt::Display for MalformedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.row_id, self.reason)
    }
}
