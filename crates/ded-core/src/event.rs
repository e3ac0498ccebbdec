//! Notifications from the core to the host.
//!
//! A [`Session`](crate::session::Session) owns the sending half of an
//! unbounded `tokio` channel and pushes an [`Event`] whenever something the
//! host must react to happens: the buffer text changed and should be
//! re-pulled, the cursor should move, or a filesystem operation finished.
//! Events flow **Core → Host**; the core never consumes them itself.

use std::path::PathBuf;

/// A notification the core sends to the host surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The rendered buffer for the given directory changed; the host should
    /// re-pull it via the content provider and redisplay.
    ContentChanged {
        /// Directory identity of the buffer that changed.
        path: PathBuf,
    },
    /// The host should move the cursor to this buffer line.
    FocusLine {
        /// Zero-based line index into the rendered buffer.
        line: usize,
    },
    /// One filesystem operation of a batch completed successfully.
    OperationComplete {
        /// Human-readable description of the operation.
        operation: String,
    },
    /// One filesystem operation of a batch failed. Siblings of the same
    /// batch are unaffected.
    OperationFailed {
        /// Human-readable description of the operation.
        operation: String,
        /// The error message.
        error: String,
    },
}
