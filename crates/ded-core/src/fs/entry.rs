//! Directory entry representation and its fixed-column line form.
//!
//! An [`Entry`] is constructed either from a live filesystem stat
//! ([`Entry::from_meta`], authoritative) or parsed back out of a rendered
//! buffer line ([`Entry::from_line`], possibly stale). Both directions share
//! the column schema in [`crate::layout`]; see the round-trip tests at the
//! bottom of this file for the exact contract.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};

use crate::error::{CoreError, CoreResult};
use crate::fs::ops::EntryMeta;
use crate::layout;
use crate::nfc_string;

/// Characters kept from an over-long name before the `...` marker.
const TRUNCATED_NAME_LENGTH: usize = 36;

const DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

/// One filesystem node plus its presentation state.
///
/// Everything except the selection mark is fixed at construction time.
/// Sizes hold bytes for files and the child count for directories; `-1`
/// means the size could not be determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    dir: PathBuf,
    name: String,
    is_dir: bool,
    is_file: bool,
    is_symlink: bool,
    read_only: bool,
    hidden: bool,
    size: i64,
    modified: NaiveDateTime,
    symlink_target: String,
    selected: bool,
    ext: String,
}

impl Entry {
    /// Creates an `Entry` from stat metadata delivered by the filesystem
    /// capability.
    ///
    /// For symlinks the kind flags reflect the resolved target, exactly as
    /// [`crate::fs::ops::FileSystem::stat_entry`] reports them. Hidden-ness
    /// is derived solely from a leading `.` in the name. Names are
    /// NFC-normalised so decomposed (macOS) filenames display correctly.
    pub fn from_meta(dir: &Path, name: &str, meta: &EntryMeta) -> Self {
        let name = nfc_string(name);
        let hidden = name.starts_with('.');
        let ext = if meta.is_file {
            file_extension(&name)
        } else {
            String::new()
        };

        Self {
            dir: dir.to_path_buf(),
            name,
            is_dir: meta.is_dir,
            is_file: meta.is_file,
            is_symlink: meta.is_symlink,
            read_only: meta.read_only,
            hidden,
            size: meta.size,
            modified: DateTime::<Local>::from(meta.modified).naive_local(),
            symlink_target: meta.symlink_target.clone(),
            selected: false,
            ext,
        }
    }

    /// Returns the entry name (last path component).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the directory this entry was listed in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the full path of this entry.
    ///
    /// With `follow_symlink` set, a symlink resolves to its target: an
    /// absolute target is used as-is, a relative one is joined onto the
    /// parent directory.
    pub fn path(&self, follow_symlink: bool) -> PathBuf {
        if !follow_symlink || !self.is_symlink {
            return self.dir.join(&self.name);
        }
        let target = Path::new(&self.symlink_target);
        if target.is_absolute() {
            target.to_path_buf()
        } else {
            self.dir.join(target)
        }
    }

    /// Returns `true` if this entry is a directory.
    ///
    /// A symlink counts as a directory only when `follow_symlink` is set and
    /// its target resolves to one.
    pub fn is_dir(&self, follow_symlink: bool) -> bool {
        self.is_dir && (follow_symlink || !self.is_symlink)
    }

    /// Returns `true` if this entry is a regular file.
    ///
    /// A symlink counts as a file only when `follow_symlink` is set and its
    /// target resolves to one.
    pub fn is_file(&self, follow_symlink: bool) -> bool {
        self.is_file && (follow_symlink || !self.is_symlink)
    }

    /// Returns `true` if this entry is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.is_symlink
    }

    /// Returns `true` if the name starts with `.`.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Returns `true` if the entry is write-protected.
    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// Size in bytes for files, child count for directories, `-1` unknown.
    pub fn size(&self) -> i64 {
        self.size
    }

    /// Last-change timestamp (full precision; the rendered line keeps minutes).
    pub fn modified(&self) -> NaiveDateTime {
        self.modified
    }

    /// The raw symlink target string, empty for non-links.
    pub fn symlink_target(&self) -> &str {
        &self.symlink_target
    }

    /// File extension, always empty for non-files.
    pub fn ext(&self) -> &str {
        &self.ext
    }

    /// Returns the selection mark state.
    pub fn selected(&self) -> bool {
        self.selected
    }

    /// Sets the selection mark. Presentation state only, independent of
    /// filesystem truth.
    pub fn select(&mut self, selected: bool) {
        self.selected = selected;
    }

    /// Serializes this entry into one fixed-column buffer line.
    ///
    /// Names whose display form overflows the name column (the `/` suffix
    /// on directories counts) are shortened to a 36-character prefix plus
    /// `...` and carried in full in the details field. Symlink targets are
    /// appended to details after a `->` delimiter. Trailing whitespace is
    /// trimmed.
    pub fn to_line(&self) -> String {
        let size = match () {
            _ if self.size == -1 => "---".to_string(),
            _ if self.is_dir => format!("{} E", self.size),
            _ => format_file_size(self.size),
        };

        let attr = format_attr(
            self.is_dir,
            self.is_file,
            self.is_symlink,
            self.read_only,
            self.name.starts_with('.'),
        );

        let mut displayed = self.name.clone();
        if self.is_dir {
            displayed.push('/');
        }
        let mut details = String::new();

        if displayed.chars().count() > layout::NAME_LENGTH {
            displayed = self.name.chars().take(TRUNCATED_NAME_LENGTH).collect();
            displayed.push_str("...");
            if self.is_dir {
                displayed.push('/');
            }
            details = self.name.clone();
        }

        if self.is_symlink {
            details.push_str("-> ");
            details.push_str(&self.symlink_target);
        }

        let mark = if self.selected {
            layout::SELECTED_MARK.to_string()
        } else {
            " ".to_string()
        };

        [
            mark,
            layout::pad_end(&displayed, layout::NAME_LENGTH),
            layout::pad_start(&size, layout::SIZE_LENGTH),
            self.modified.format(DATE_FORMAT).to_string(),
            attr,
            // may be empty; the trailing margin is trimmed below
            details,
        ]
        .join(&" ".repeat(layout::COLUMN_MARGIN))
        .trim_end()
        .to_string()
    }

    /// Parses a rendered buffer line back into an `Entry`.
    ///
    /// The line must have been produced by [`Entry::to_line`] (directly or
    /// via a re-marked copy). Lines that break the layout contract — wrong
    /// mark, short line, unknown attribute bytes, unparseable size or date —
    /// are rejected with [`CoreError::MalformedLine`] so that a hand-edited
    /// buffer can never feed a destructive operation.
    pub fn from_line(dir: &Path, line: &str) -> CoreResult<Self> {
        let line = line.trim_end();
        let malformed = || CoreError::MalformedLine(line.to_string());

        if line.chars().count() < layout::ATTR_START_INDEX + layout::ATTR_LENGTH {
            return Err(malformed());
        }

        let mark = line.chars().next().ok_or_else(malformed)?;
        let selected = match mark {
            layout::SELECTED_MARK => true,
            ' ' => false,
            _ => return Err(malformed()),
        };

        let name = layout::slice_columns(line, layout::NAME_START_INDEX, layout::NAME_LENGTH)
            .trim_end()
            .to_string();
        let size = layout::slice_columns(line, layout::SIZE_START_INDEX, layout::SIZE_LENGTH)
            .trim_start()
            .to_string();
        let date = layout::slice_columns(line, layout::DATE_START_INDEX, layout::DATE_LENGTH)
            .trim()
            .to_string();
        let attr = layout::slice_columns(line, layout::ATTR_START_INDEX, layout::ATTR_LENGTH);
        let details = layout::slice_to_end(line, layout::DETAILS_START_INDEX)
            .trim()
            .to_string();

        let (is_symlink, is_file, is_dir, read_only, hidden) =
            parse_attr(&attr).ok_or_else(malformed)?;

        // Truncated names carry the real name in the details field.
        let name = if name.ends_with(".../") || name.ends_with("...") {
            let recovered = details
                .split("->")
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            if recovered.is_empty() {
                // an entry genuinely named "*..." renders untruncated with
                // empty details; keep the sliced name
                name.trim_end_matches('/').to_string()
            } else {
                recovered
            }
        } else if is_dir {
            // dirs (symlinked ones included) render with a '/' suffix
            name.trim_end_matches('/').to_string()
        } else {
            name
        };

        let symlink_target = if is_symlink {
            details
                .split("->")
                .nth(1)
                .ok_or_else(malformed)?
                .trim()
                .to_string()
        } else {
            String::new()
        };

        let ext = if is_file {
            file_extension(&name)
        } else {
            String::new()
        };

        Ok(Self {
            dir: dir.to_path_buf(),
            name,
            is_dir,
            is_file,
            is_symlink,
            read_only,
            hidden,
            size: parse_size(&size).ok_or_else(malformed)?,
            modified: NaiveDateTime::parse_from_str(&date, DATE_FORMAT)
                .map_err(|_| malformed())?,
            symlink_target,
            selected,
            ext,
        })
    }
}

/// Extension of a file name: one leading dot is stripped first, then the
/// text after the last remaining dot. Empty if no dot remains.
fn file_extension(name: &str) -> String {
    let name = name.strip_prefix('.').unwrap_or(name);
    match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_string(),
        None => String::new(),
    }
}

/// The five-slot attribute code: kind, file, read-only, hidden, reserved.
fn format_attr(
    is_dir: bool,
    is_file: bool,
    is_symlink: bool,
    read_only: bool,
    hidden: bool,
) -> String {
    let first = if is_symlink {
        'l'
    } else if is_dir {
        'd'
    } else {
        '-'
    };
    let second = if is_file { 'a' } else { '-' };
    let third = if read_only { 'r' } else { '-' };
    let fourth = if hidden { 'h' } else { '-' };
    format!("{first}{second}{third}{fourth}-")
}

/// Decodes the attribute code. Returns
/// `(is_symlink, is_file, is_dir, read_only, hidden)`, or `None` when any
/// slot holds an unknown character.
fn parse_attr(attr: &str) -> Option<(bool, bool, bool, bool, bool)> {
    let chars: Vec<char> = attr.chars().collect();
    if chars.len() != 5 || chars[4] != '-' {
        return None;
    }
    let is_symlink = match chars[0] {
        'l' => true,
        'd' | '-' => false,
        _ => return None,
    };
    let is_file = match chars[1] {
        'a' => true,
        '-' => false,
        _ => return None,
    };
    // a symlink that does not resolve to a file is treated as a directory
    let is_dir = chars[0] == 'd' || (is_symlink && !is_file);
    let read_only = match chars[2] {
        'r' => true,
        '-' => false,
        _ => return None,
    };
    let hidden = match chars[3] {
        'h' => true,
        '-' => false,
        _ => return None,
    };
    Some((is_symlink, is_file, is_dir, read_only, hidden))
}

const KB: i64 = 1024;
const MB: i64 = KB * 1024;
const GB: i64 = MB * 1024;

/// Formats a file size in bytes with the display unit used by the size
/// column. Kilobytes render without decimals, mega- and gigabytes with two.
fn format_file_size(size: i64) -> String {
    if size < KB {
        format!("{size} B")
    } else if size < MB {
        format!("{:.0} K", size as f64 / KB as f64)
    } else if size < GB {
        format!("{:.2} M", size as f64 / MB as f64)
    } else {
        format!("{:.2} G", size as f64 / GB as f64)
    }
}

/// Parses a size column value back into bytes (or a directory child count
/// for the `E` unit). `---` is the unknown sentinel.
fn parse_size(size: &str) -> Option<i64> {
    if size == "---" {
        return Some(-1);
    }
    let unit = size.chars().last()?;
    let number: f64 = size[..size.len() - unit.len_utf8()].trim().parse().ok()?;
    let multiplier = match unit.to_ascii_uppercase() {
        'B' | 'E' => 1,
        'K' => KB,
        'M' => MB,
        'G' => GB,
        _ => return None,
    };
    Some((number * multiplier as f64).round() as i64)
}
