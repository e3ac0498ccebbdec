//! Fixed-column schema for the rendered directory buffer.
//!
//! Serialization ([`crate::fs::entry::Entry::to_line`]) and parsing
//! ([`crate::fs::entry::Entry::from_line`]) both consume this table.
//! Every start index is derived from the widths and margins of the columns
//! before it, so changing a width here can never desynchronise the two
//! directions.

/// Spaces between two columns.
pub const COLUMN_MARGIN: usize = 2;

/// Mark placed in the first column of a selected entry line.
pub const SELECTED_MARK: char = '*';

pub const SELECTED_HEADER: &str = "#";
pub const SELECTED_LENGTH: usize = 1;
pub const SELECTED_START_INDEX: usize = 0;

pub const NAME_HEADER: &str = "Name";
pub const NAME_LENGTH: usize = 40;
pub const NAME_START_INDEX: usize = SELECTED_START_INDEX + SELECTED_LENGTH + COLUMN_MARGIN;

pub const SIZE_HEADER: &str = "Size";
pub const SIZE_LENGTH: usize = 9;
pub const SIZE_START_INDEX: usize = NAME_START_INDEX + NAME_LENGTH + COLUMN_MARGIN;

pub const DATE_HEADER: &str = "LastWriteTime";
pub const DATE_LENGTH: usize = 16;
pub const DATE_START_INDEX: usize = SIZE_START_INDEX + SIZE_LENGTH + COLUMN_MARGIN;

pub const ATTR_HEADER: &str = "Attr";
pub const ATTR_LENGTH: usize = 5;
pub const ATTR_START_INDEX: usize = DATE_START_INDEX + DATE_LENGTH + COLUMN_MARGIN;

/// Start of the unbounded trailing details field.
pub const DETAILS_START_INDEX: usize = ATTR_START_INDEX + ATTR_LENGTH + COLUMN_MARGIN;

/// Pads `s` with trailing spaces up to `width` characters.
///
/// Character-based, not byte-based — entry names may be non-ASCII.
pub fn pad_end(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + width - len);
    out.push_str(s);
    out.extend(std::iter::repeat(' ').take(width - len));
    out
}

/// Pads `s` with leading spaces up to `width` characters.
pub fn pad_start(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + width - len);
    out.extend(std::iter::repeat(' ').take(width - len));
    out.push_str(s);
    out
}

/// Returns the characters of `line` in the half-open range `[start, start + len)`.
///
/// Character indices match the column offsets above. Ranges past the end of
/// the line yield a shorter (possibly empty) slice, mirroring how trailing
/// whitespace is trimmed from rendered lines.
pub fn slice_columns(line: &str, start: usize, len: usize) -> String {
    line.chars().skip(start).take(len).collect()
}

/// Returns everything from character `start` to the end of `line`.
pub fn slice_to_end(line: &str, start: usize) -> String {
    line.chars().skip(start).collect()
}

/// The column-header line (`#  Name ... Size ... LastWriteTime  Attr`).
pub fn header_line() -> String {
    [
        SELECTED_HEADER.to_string(),
        pad_end(NAME_HEADER, NAME_LENGTH),
        pad_start(SIZE_HEADER, SIZE_LENGTH),
        pad_start(DATE_HEADER, DATE_LENGTH),
        // padding the last column would only add trailing whitespace
        ATTR_HEADER.to_string(),
    ]
    .join(&" ".repeat(COLUMN_MARGIN))
}

/// A section separator: one run of dashes per column label, padded to the
/// column widths so that separators line up with entry lines.
pub fn separator_line() -> String {
    [
        "-".repeat(SELECTED_LENGTH),
        pad_end(&"-".repeat(NAME_HEADER.len()), NAME_LENGTH),
        pad_start(&"-".repeat(SIZE_HEADER.len()), SIZE_LENGTH),
        pad_start(&"-".repeat(DATE_HEADER.len()), DATE_LENGTH),
        "-".repeat(ATTR_HEADER.len()),
    ]
    .join(&" ".repeat(COLUMN_MARGIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_indices_are_cumulative() {
        assert_eq!(SELECTED_START_INDEX, 0);
        assert_eq!(NAME_START_INDEX, SELECTED_LENGTH + COLUMN_MARGIN);
        assert_eq!(
            SIZE_START_INDEX,
            NAME_START_INDEX + NAME_LENGTH + COLUMN_MARGIN
        );
        assert_eq!(
            DATE_START_INDEX,
            SIZE_START_INDEX + SIZE_LENGTH + COLUMN_MARGIN
        );
        assert_eq!(
            ATTR_START_INDEX,
            DATE_START_INDEX + DATE_LENGTH + COLUMN_MARGIN
        );
        assert_eq!(
            DETAILS_START_INDEX,
            ATTR_START_INDEX + ATTR_LENGTH + COLUMN_MARGIN
        );
        assert_eq!(DETAILS_START_INDEX, 81);
    }

    #[test]
    fn header_columns_land_on_start_indices() {
        let header = header_line();
        assert_eq!(slice_columns(&header, SELECTED_START_INDEX, 1), "#");
        assert!(slice_columns(&header, NAME_START_INDEX, NAME_LENGTH).starts_with("Name"));
        assert!(slice_columns(&header, SIZE_START_INDEX, SIZE_LENGTH).ends_with("Size"));
        assert!(slice_columns(&header, DATE_START_INDEX, DATE_LENGTH).ends_with("LastWriteTime"));
        assert!(slice_columns(&header, ATTR_START_INDEX, ATTR_LENGTH).starts_with("Attr"));
    }

    #[test]
    fn separator_starts_with_dash_in_every_column() {
        let sep = separator_line();
        for start in [
            SELECTED_START_INDEX,
            NAME_START_INDEX,
            SIZE_START_INDEX + SIZE_LENGTH - SIZE_HEADER.len(),
            DATE_START_INDEX + DATE_LENGTH - DATE_HEADER.len(),
            ATTR_START_INDEX,
        ] {
            assert_eq!(slice_columns(&sep, start, 1), "-", "column at {start}");
        }
    }

    #[test]
    fn pad_end_counts_characters_not_bytes() {
        let padded = pad_end("한글", 4);
        assert_eq!(padded.chars().count(), 4);
        assert!(padded.ends_with("  "));
    }

    #[test]
    fn pad_start_counts_characters_not_bytes() {
        let padded = pad_start("5 K", 9);
        assert_eq!(padded.chars().count(), 9);
        assert!(padded.starts_with(' '));
    }

    #[test]
    fn slice_columns_past_end_is_empty() {
        assert_eq!(slice_columns("short", 10, 5), "");
        assert_eq!(slice_to_end("short", 10), "");
    }
}
