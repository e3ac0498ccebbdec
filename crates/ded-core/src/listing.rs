//! Directory snapshot: partitioned entries and buffer rendering.
//!
//! A [`Listing`] holds one directory's entries split into three partitions
//! (directories, files, symlinks) and renders them into the multi-section
//! text buffer. Sorting and hidden-filtering never mutate the partitions;
//! both are applied on the way out, so the snapshot always remains the
//! single source of truth.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::fs::entry::Entry;
use crate::fs::ops::FileSystem;
use crate::layout;

/// Number of header lines before the first separator: mode line, directory
/// path, blank line, column header.
pub const HEADER_LINES: usize = 4;

/// The key by which each partition is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Lexicographic by entry name, ascending.
    #[default]
    Name,
    /// Lexicographic by file extension, ascending.
    Ext,
    /// By size, largest first.
    Size,
    /// By last-change time, newest first.
    Date,
}

/// Returns a new sequence of entries ordered by `mode`.
///
/// The sort is stable: entries with equal keys keep their input order.
/// The input is never mutated.
pub fn sorted(entries: &[Entry], mode: SortMode) -> Vec<Entry> {
    let mut out = entries.to_vec();
    out.sort_by(|a, b| match mode {
        SortMode::Name => a.name().cmp(b.name()),
        SortMode::Ext => a.ext().cmp(b.ext()),
        SortMode::Size => b.size().cmp(&a.size()),
        SortMode::Date => b.modified().cmp(&a.modified()),
    });
    out
}

/// One directory's entries, partitioned for rendering.
#[derive(Debug, Clone)]
pub struct Listing {
    path: PathBuf,
    dirs: Vec<Entry>,
    files: Vec<Entry>,
    links: Vec<Entry>,
}

impl Listing {
    /// An empty listing for `path`, used before the first read.
    pub fn empty(path: PathBuf) -> Self {
        Self {
            path,
            dirs: Vec::new(),
            files: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Reads a fresh snapshot of `path` through the filesystem capability.
    ///
    /// Entries whose stat fails (vanished, unreadable) are skipped with a
    /// warning; a failed directory read aborts the whole snapshot so the
    /// caller can keep its previous listing.
    pub async fn read(fs: &dyn FileSystem, path: &Path) -> CoreResult<Self> {
        let names = fs.list_directory(path).await?;

        let mut listing = Self::empty(path.to_path_buf());
        for name in names {
            match fs.stat_entry(&path.join(&name)).await {
                Ok(meta) => listing.insert(Entry::from_meta(path, &name, &meta)),
                Err(err) => {
                    tracing::warn!("skipping {name}: {err}");
                }
            }
        }
        Ok(listing)
    }

    /// Places an entry into its partition. Symlinks go to the links
    /// partition regardless of their target kind; other node types
    /// (sockets, fifos) are not listed.
    pub fn insert(&mut self, entry: Entry) {
        if entry.is_symlink() {
            self.links.push(entry);
        } else if entry.is_dir(false) {
            self.dirs.push(entry);
        } else if entry.is_file(false) {
            self.files.push(entry);
        }
    }

    /// The directory this listing snapshots.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dirs(&self) -> &[Entry] {
        &self.dirs
    }

    pub fn files(&self) -> &[Entry] {
        &self.files
    }

    pub fn links(&self) -> &[Entry] {
        &self.links
    }

    /// Renders the full text buffer: header, then one separator plus rows
    /// for each non-empty (filtered) partition, in dirs/files/links order.
    ///
    /// Entries whose path appears in `pending` render with the selection
    /// mark so an in-flight move/copy set stays visible across re-renders.
    /// An entirely empty render still gets one trailing separator so the
    /// buffer is never shorter than the header.
    pub fn render(
        &self,
        mode_line: &str,
        sort: SortMode,
        show_hidden: bool,
        pending: &[PathBuf],
    ) -> Vec<String> {
        let mut buffer = vec![
            mode_line.to_string(),
            format!("{}:", self.path.display()),
            String::new(),
            layout::header_line(),
        ];
        debug_assert_eq!(buffer.len(), HEADER_LINES);

        for partition in [&self.dirs, &self.files, &self.links] {
            let rows: Vec<String> = sorted(partition, sort)
                .into_iter()
                .filter(|e| show_hidden || !e.is_hidden())
                .map(|mut e| {
                    if pending.contains(&e.path(false)) {
                        e.select(true);
                    }
                    e.to_line()
                })
                .collect();
            if !rows.is_empty() {
                buffer.push(layout::separator_line());
                buffer.extend(rows);
            }
        }

        if buffer.len() == HEADER_LINES {
            buffer.push(layout::separator_line());
        }

        buffer
    }
}
