use dirscope_protocol::ErrorCode;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error(
        "Memory budget exceeded: {used_mb:.1} MB used of {budget_mb:.1} MB after {entries_processed} entries"
    )]
    MemoryBudgetExceeded {
        entries_processed: usize,
        used_mb: f64,
        budget_mb: f64,
    },

    #[error("Scan deadline exceeded after {entries_processed} entries")]
    DeadlineExceeded { entries_processed: usize },

    #[error("Stream session '{id}' not found: {reason}")]
    SessionNotFound { id: String, reason: &'static str },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ScanError {
    /// Maps an I/O failure on the scan root to the matching root-level error.
    pub(crate) fn from_root_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::DirectoryNotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io(err),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DirectoryNotFound(_) => ErrorCode::DirectoryNotFound,
            Self::NotADirectory(_) => ErrorCode::NotADirectory,
            Self::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Self::MemoryBudgetExceeded { .. } => ErrorCode::MemoryBudgetExceeded,
            Self::DeadlineExceeded { .. } => ErrorCode::DeadlineExceeded,
            Self::SessionNotFound { .. } => ErrorCode::SessionNotFound,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Io(_) => ErrorCode::Internal,
        }
    }

    /// True for aborts that stopped a walk part-way through.
    pub fn is_partial(&self) -> bool {
        matches!(
            self,
            Self::MemoryBudgetExceeded { .. } | Self::DeadlineExceeded { .. }
        )
    }

    pub fn entries_processed(&self) -> Option<usize> {
        match self {
            Self::MemoryBudgetExceeded {
                entries_processed, ..
            }
            | Self::DeadlineExceeded { entries_processed } => Some(*entries_processed),
            _ => None,
        }
    }
}
