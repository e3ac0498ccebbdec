//! File system abstractions for DEd.
//!
//! This module provides the entry record and its fixed-column line form
//! ([`entry::Entry`]) and the filesystem capability the session consumes
//! ([`ops::FileSystem`], implemented for the local disk by [`ops::LocalFs`]).

pub mod entry;
pub mod ops;

pub use entry::Entry;
pub use ops::{EntryMeta, FileSystem, LocalFs};
