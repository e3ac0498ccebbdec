//! Error types for `ded-core`.
//!
//! All fallible operations in the core library return [`CoreResult<T>`],
//! which is an alias for `Result<T, CoreError>`.

use std::path::PathBuf;

/// Unified error type for all core operations.
///
/// Each variant captures just enough context for the caller to display
/// a meaningful message or take corrective action.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The target path does not exist.
    #[error("path not found: {0}")]
    NotFound(PathBuf),

    /// The process lacks permission to access the path.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// A directory was expected but the path points to a file.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// A file or directory name is invalid (empty, contains path separators, etc.).
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// A rename crossed a filesystem boundary. Surfaced to the caller,
    /// never silently retried as copy + delete.
    #[error("cannot move across filesystems: {0}")]
    CrossDevice(PathBuf),

    /// A buffer line does not follow the fixed-column layout contract.
    ///
    /// Entry lines are only ever parsed from text the renderer itself
    /// produced, so this indicates either a contract bug or a hand-edited
    /// buffer. The line is rejected rather than trusted.
    #[error("malformed buffer line: {0}")]
    MalformedLine(String),

    /// Failed to parse a TOML configuration file.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// The user cancelled an interactive operation.
    #[error("operation cancelled")]
    Cancelled,

    /// An I/O error that doesn't fit a more specific variant.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout `ded-core`.
pub type CoreResult<T> = Result<T, CoreError>;
