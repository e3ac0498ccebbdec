//! Per-view session: buffer state and the Explore/Move/Copy machine.
//!
//! A [`Session`] owns one directory view: the current [`Listing`], the
//! rendered buffer, the mode, and the pending move/copy set. It is an
//! explicit per-view object — hosts create one per open directory buffer,
//! nothing is shared between views. Filesystem access and interactive
//! prompts are injected ([`FileSystem`], [`Interaction`]) so the state
//! machine runs unchanged under tests and under a real editor host.
//!
//! Selection lives *in the buffer text* (the `*` marks), not in the
//! listing: toggling marks only refreshes presentation and never reloads,
//! so not-yet-persisted marks survive. Structural changes (navigation,
//! sort, hidden filter, any filesystem batch) regenerate the whole buffer
//! from the listing.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinSet;

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::event::Event;
use crate::fs::entry::Entry;
use crate::fs::ops::FileSystem;
use crate::layout;
use crate::listing::{Listing, SortMode, HEADER_LINES};

/// The session state machine's mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Normal browsing; selection toggles stay in this mode.
    #[default]
    Explore,
    /// A move is pending: the selected entries await a paste.
    Move,
    /// A copy is pending: the selected entries await a paste.
    Copy,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Explore => "Explore",
            Mode::Move => "Move",
            Mode::Copy => "Copy",
        };
        f.write_str(s)
    }
}

/// Host cursor state at the moment an operation is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// No active text selection; the cursor sits on this buffer line.
    Line(usize),
    /// An active text selection covering this inclusive line range.
    Range { start: usize, end: usize },
}

/// Interactive prompts the session needs from its host.
///
/// Closing or dismissing the surface resolves with `None`; the session
/// treats that as an abort, never as an error.
#[async_trait]
pub trait Interaction: Send + Sync {
    /// Free-text input prompt, pre-filled with `initial`.
    async fn input(&self, title: &str, prompt: &str, initial: &str) -> Option<String>;

    /// Single-select list; returns the chosen item's label.
    async fn pick(&self, title: &str, items: &[&str]) -> Option<String>;
}

/// One directory view and its state machine.
pub struct Session {
    fs: Arc<dyn FileSystem>,
    ui: Arc<dyn Interaction>,
    events: UnboundedSender<Event>,
    listing: Listing,
    buffer: Vec<String>,
    mode: Mode,
    pending: Vec<Entry>,
    show_hidden: bool,
    sort: SortMode,
}

impl Session {
    /// Creates a session with no directory loaded yet. Call
    /// [`Session::open_dir`] to populate it.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        ui: Arc<dyn Interaction>,
        events: UnboundedSender<Event>,
        config: &Config,
    ) -> Self {
        Self {
            fs,
            ui,
            events,
            listing: Listing::empty(PathBuf::new()),
            buffer: Vec::new(),
            mode: Mode::Explore,
            pending: Vec::new(),
            show_hidden: config.general.show_hidden,
            sort: config.general.sort_mode,
        }
    }

    /// The directory currently displayed.
    pub fn path(&self) -> &Path {
        self.listing.path()
    }

    /// The current state-machine mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The rendered buffer, line by line.
    pub fn buffer(&self) -> &[String] {
        &self.buffer
    }

    /// The content-provider contract: the full buffer text the host
    /// displays. Re-pulled after every [`Event::ContentChanged`].
    pub fn content(&self) -> String {
        self.buffer.join("\n")
    }

    /// The buffer line the host should focus after a fresh render:
    /// the first entry line when there is one.
    pub fn cursor_hint(&self) -> usize {
        if self.buffer.len() > HEADER_LINES + 1 {
            HEADER_LINES + 1
        } else {
            HEADER_LINES.min(self.buffer.len().saturating_sub(1))
        }
    }

    /// Navigates to `path`: reads a fresh snapshot and re-renders.
    ///
    /// On failure the previous listing and buffer stay visible.
    pub async fn open_dir(&mut self, path: &Path) -> CoreResult<()> {
        let listing = Listing::read(self.fs.as_ref(), path).await?;
        tracing::info!("opened {}", path.display());
        self.listing = listing;
        self.rerender();
        Ok(())
    }

    /// Re-reads the current directory from the filesystem.
    pub async fn reload(&mut self) -> CoreResult<()> {
        let path = self.listing.path().to_path_buf();
        self.open_dir(&path).await
    }

    /// Navigates to the parent directory. No-op at the filesystem root.
    pub async fn move_up(&mut self) -> CoreResult<()> {
        let Some(parent) = self.listing.path().parent().map(Path::to_path_buf) else {
            return Ok(());
        };
        self.open_dir(&parent).await
    }

    /// Toggles visibility of hidden (dot-prefixed) entries.
    pub fn toggle_hidden(&mut self) {
        self.show_hidden = !self.show_hidden;
        self.rerender();
    }

    /// Changes the sort key and re-renders.
    pub fn set_sort(&mut self, sort: SortMode) {
        self.sort = sort;
        self.rerender();
    }

    /// Parses the entry under the given buffer line.
    ///
    /// Header and separator lines yield `Ok(None)`. A line that breaks the
    /// layout contract (hand-edited buffer) is an error, never a silently
    /// dropped entry.
    pub fn entry_at(&self, line: usize) -> CoreResult<Option<Entry>> {
        if line < HEADER_LINES || line >= self.buffer.len() {
            return Ok(None);
        }
        let text = &self.buffer[line];
        if text.starts_with('-') {
            return Ok(None);
        }
        Entry::from_line(self.listing.path(), text).map(Some)
    }

    /// Activates the entry under the cursor: directories (and symlinks to
    /// directories) are entered, files are handed back for the host to
    /// open.
    pub async fn enter(&mut self, line: usize) -> CoreResult<Option<PathBuf>> {
        let Some(entry) = self.entry_at(line)? else {
            return Ok(None);
        };
        if entry.is_dir(true) {
            self.open_dir(&entry.path(true)).await?;
            Ok(None)
        } else {
            Ok(Some(entry.path(true)))
        }
    }

    /// Returns `true` if any buffer line carries the selection mark.
    pub fn anything_selected(&self) -> bool {
        self.buffer
            .iter()
            .any(|l| l.starts_with(layout::SELECTED_MARK))
    }

    /// Toggles selection marks under the cursor.
    ///
    /// Without a text selection: on a header line every entry toggles, on a
    /// separator every entry of that section toggles, on an entry line only
    /// that line toggles and focus advances one line. With a text selection
    /// every covered line toggles. Separators are never toggled. This only
    /// refreshes presentation — in-flight marks are preserved, no reload.
    pub fn toggle_select(&mut self, cursor: Cursor) {
        let (start, end) = match cursor {
            Cursor::Line(line) => {
                if line < HEADER_LINES {
                    (line, self.buffer.len())
                } else if line < self.buffer.len() && self.buffer[line].starts_with('-') {
                    let next_separator = (line + 1..self.buffer.len())
                        .find(|&i| self.buffer[i].starts_with('-'))
                        .unwrap_or(self.buffer.len());
                    (line, next_separator)
                } else {
                    let focus = (line + 1).min(self.buffer.len().saturating_sub(1));
                    let _ = self.events.send(Event::FocusLine { line: focus });
                    (line, line + 1)
                }
            }
            Cursor::Range { start, end } => (start, end + 1),
        };

        let start = start.max(HEADER_LINES);
        let end = end.clamp(HEADER_LINES, self.buffer.len());

        for i in start..end {
            let line = &self.buffer[i];
            if line.starts_with('-') {
                continue;
            }
            let mark = if line.starts_with(layout::SELECTED_MARK) {
                ' '
            } else {
                layout::SELECTED_MARK
            };
            // the mark column is always a single ASCII character
            let mut flipped = String::with_capacity(line.len());
            flipped.push(mark);
            flipped.push_str(&line[1..]);
            self.buffer[i] = flipped;
        }

        self.notify_content_changed();
    }

    /// Enters Move or Copy mode: auto-selects the cursor line when nothing
    /// is selected, snapshots the selected entries as the pending set, and
    /// updates the mode line.
    pub fn begin_transfer(&mut self, mode: Mode, cursor: Cursor) -> CoreResult<()> {
        if mode == Mode::Explore || self.buffer.len() < HEADER_LINES {
            return Ok(());
        }

        if !self.anything_selected() {
            self.toggle_select(cursor);
        }

        // parse the whole pending set before committing to the new mode, so
        // a rejected line leaves the session in Explore
        let dir = self.listing.path().to_path_buf();
        let mut pending = Vec::new();
        for line in self
            .buffer
            .iter()
            .filter(|l| l.starts_with(layout::SELECTED_MARK))
        {
            pending.push(Entry::from_line(&dir, line)?);
        }
        self.mode = mode;
        self.pending = pending;

        self.buffer[0] = self.mode_line();
        self.notify_content_changed();
        Ok(())
    }

    /// Leaves Move/Copy mode without executing, dropping the pending set.
    pub async fn abort_transfer(&mut self) -> CoreResult<()> {
        self.exit_mode().await
    }

    /// Executes the pending move or copy.
    ///
    /// With exactly one pending entry the destination is prompted for
    /// (defaulting to the original name); aborting the prompt stays in the
    /// current mode. With several, each entry keeps its own name under the
    /// current directory. Every entry runs as its own task; failures are
    /// reported per entry and never abort siblings. The listing reloads
    /// once after the whole batch settles.
    pub async fn paste(&mut self) -> CoreResult<()> {
        if self.mode == Mode::Explore {
            return Ok(());
        }

        let single = self.pending.len() == 1;
        let mut dest = self.listing.path().to_path_buf();
        if single {
            let title = format!("ded {}", self.mode.to_string().to_lowercase());
            match self.ui.input(&title, "New file name", self.pending[0].name()).await {
                Some(name) if !name.is_empty() => dest = dest.join(name),
                _ => return Ok(()),
            }
        }

        let is_move = self.mode == Mode::Move;
        let verb = if is_move { "move" } else { "copy" };
        let pending = std::mem::take(&mut self.pending);

        let mut tasks: JoinSet<(String, CoreResult<()>)> = JoinSet::new();
        for entry in pending {
            let fs = Arc::clone(&self.fs);
            let src = entry.path(false);
            let dst = if single { dest.clone() } else { dest.join(entry.name()) };
            let name = entry.name().to_string();
            tasks.spawn(async move {
                let result = if is_move {
                    fs.rename(&src, &dst).await
                } else {
                    fs.copy(&src, &dst).await
                };
                (name, result)
            });
        }
        self.report_batch(verb, tasks).await;

        self.exit_mode().await
    }

    /// Deletes the selected entries after a confirmation pick.
    ///
    /// Auto-selects the cursor line when nothing is selected. Each entry is
    /// removed in its own task; per-entry failures are reported and do not
    /// stop siblings. Reloads once afterwards.
    pub async fn delete(&mut self, cursor: Cursor) -> CoreResult<()> {
        if !self.anything_selected() {
            self.toggle_select(cursor);
        }

        let confirmed = self.ui.pick("Delete selection?", &["Yes", "No"]).await;
        if confirmed.as_deref() != Some("Yes") {
            tracing::info!("deletion aborted");
            return Ok(());
        }

        let dir = self.listing.path().to_path_buf();
        let mut doomed = Vec::new();
        for line in self
            .buffer
            .iter()
            .filter(|l| l.starts_with(layout::SELECTED_MARK))
        {
            doomed.push(Entry::from_line(&dir, line)?);
        }

        let mut tasks: JoinSet<(String, CoreResult<()>)> = JoinSet::new();
        for entry in doomed {
            let fs = Arc::clone(&self.fs);
            let path = entry.path(false);
            let recursive = entry.is_dir(false);
            let name = entry.name().to_string();
            tasks.spawn(async move {
                let result = fs.remove(&path, recursive).await;
                (name, result)
            });
        }
        self.report_batch("delete", tasks).await;

        self.reload().await
    }

    /// Prompts for a name and creates a directory under the current path,
    /// inserting it into the listing without a full reload.
    pub async fn create_dir(&mut self) -> CoreResult<()> {
        let Some(name) = self.ui.input("ded mkdir", "Directory name", "").await else {
            return Ok(());
        };
        if name.is_empty() {
            return Ok(());
        }

        let dir = self.listing.path().to_path_buf();
        let path = dir.join(&name);
        self.fs.create_directory(&path, true).await?;
        let meta = self.fs.stat_entry(&path).await?;
        self.listing.insert(Entry::from_meta(&dir, &name, &meta));
        self.rerender();
        Ok(())
    }

    /// Opens `path` when it exists (directories are entered, files are
    /// returned for the host to open); otherwise creates it as an empty
    /// file, parents included, and shows it in the listing.
    pub async fn create_or_open(&mut self, path: &Path) -> CoreResult<Option<PathBuf>> {
        match self.fs.stat_entry(path).await {
            Ok(meta) if meta.is_dir => {
                self.open_dir(path).await?;
                Ok(None)
            }
            Ok(_) => Ok(Some(path.to_path_buf())),
            Err(CoreError::NotFound(_)) => {
                if let Some(parent) = path.parent() {
                    self.fs.create_directory(parent, true).await?;
                }
                self.fs.create_file(path).await?;
                tracing::info!("created {}", path.display());

                if path.parent() == Some(self.listing.path()) {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .ok_or_else(|| CoreError::InvalidName(path.display().to_string()))?;
                    let dir = self.listing.path().to_path_buf();
                    let meta = self.fs.stat_entry(path).await?;
                    self.listing.insert(Entry::from_meta(&dir, &name, &meta));
                    self.rerender();
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn mode_line(&self) -> String {
        let mut head = format!("{} - mode", self.mode);
        if self.mode != Mode::Explore {
            head.push_str(&format!(
                ": {} selected. Paste with <p>. Abort with <q>",
                self.pending.len()
            ));
        }
        head
    }

    fn rerender(&mut self) {
        let pending_paths: Vec<PathBuf> = self.pending.iter().map(|e| e.path(false)).collect();
        self.buffer = self
            .listing
            .render(&self.mode_line(), self.sort, self.show_hidden, &pending_paths);
        self.notify_content_changed();
    }

    fn notify_content_changed(&self) {
        let _ = self.events.send(Event::ContentChanged {
            path: self.listing.path().to_path_buf(),
        });
    }

    async fn exit_mode(&mut self) -> CoreResult<()> {
        self.mode = Mode::Explore;
        self.pending.clear();
        self.reload().await
    }

    /// Awaits a batch of per-entry tasks and reports each outcome.
    async fn report_batch(&self, verb: &str, mut tasks: JoinSet<(String, CoreResult<()>)>) {
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(()))) => {
                    tracing::info!("{verb} {name}: ok");
                    let _ = self.events.send(Event::OperationComplete {
                        operation: format!("{verb} {name}"),
                    });
                }
                Ok((name, Err(err))) => {
                    tracing::warn!("{verb} {name}: {err}");
                    let _ = self.events.send(Event::OperationFailed {
                        operation: format!("{verb} {name}"),
                        error: err.to_string(),
                    });
                }
                Err(join_err) => {
                    tracing::warn!("{verb} task panicked: {join_err}");
                }
            }
        }
    }
}

/// Directory-completion candidates for a path-input widget.
///
/// When `input` names an existing directory the candidates are the
/// directory itself followed by its subdirectories; otherwise the
/// subdirectories of the input's parent. Symlinked directories count.
pub async fn dir_completions(fs: &dyn FileSystem, input: &Path) -> Vec<PathBuf> {
    let mut items = Vec::new();

    let search_dir = match fs.stat_entry(input).await {
        Ok(meta) if meta.is_dir => {
            items.push(input.to_path_buf());
            input.to_path_buf()
        }
        _ => match input.parent() {
            Some(parent) => parent.to_path_buf(),
            None => return items,
        },
    };

    let Ok(names) = fs.list_directory(&search_dir).await else {
        return items;
    };
    for name in names {
        let candidate = search_dir.join(&name);
        if matches!(fs.stat_entry(&candidate).await, Ok(meta) if meta.is_dir) {
            items.push(candidate);
        }
    }
    items
}
