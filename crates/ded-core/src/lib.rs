//! DEd core library — editor-agnostic directory-editor logic.
//!
//! `ded-core` renders a directory as a fixed-column text buffer and turns
//! edits and commands on that buffer back into filesystem operations. It is
//! deliberately decoupled from any particular editor: hosts implement
//! [`Interaction`] for prompts, subscribe to [`Event`]s, and display
//! whatever [`Session::content`] returns.
//!
//! # Modules
//!
//! - [`layout`] — Fixed column geometry of the buffer and its header lines.
//! - [`fs`] — The entry record, its line form, and the [`FileSystem`] capability.
//! - [`listing`] — Directory snapshots, sorting, and full-buffer rendering.
//! - [`session`] — The per-view controller and Explore/Move/Copy machine.
//! - [`config`] — TOML-based session defaults.
//! - [`event`] — Notifications from core to host.
//! - [`error`] — Unified error type ([`CoreError`]) and result alias ([`CoreResult`]).

pub mod config;
pub mod error;
pub mod event;
pub mod fs;
pub mod layout;
pub mod listing;
pub mod session;

pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use event::Event;
pub use fs::entry::Entry;
pub use fs::ops::{EntryMeta, FileSystem, LocalFs};
pub use listing::{sorted, Listing, SortMode, HEADER_LINES};
pub use session::{dir_completions, Cursor, Interaction, Mode, Session};

/// Normalises a string to NFC (composed) form.
///
/// macOS stores filenames in NFD (decomposed), which makes accented and
/// Hangul names compare and render as individual combining pieces. Entry
/// names are re-composed on the way in.
pub fn nfc_string(s: &str) -> String {
    use unicode_normalization::UnicodeNormalization;
    s.nfc().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nfc_recomposes_decomposed_input() {
        // "é" as 'e' + U+0301 combining acute
        let decomposed = "e\u{301}";
        assert_eq!(nfc_string(decomposed), "\u{e9}");
    }

    #[test]
    fn nfc_leaves_composed_input_alone() {
        assert_eq!(nfc_string("한글.txt"), "한글.txt");
    }
}
