use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("invalid page range: {0}")]
    InvalidRange(String),

    #[error("source unreadable: {path}: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("write failed: {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("classification failed: {0}")]
    Classification(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("no pages to reconcile")]
    NothingToReconcile,

    #[error("directory does not exist: {}", .0.display())]
    DirectoryMissing(PathBuf),
}

impl SplitError {
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        SplitError::SourceUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        SplitError::Write {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SplitError>;
