//! Paginated, mode switchable list of notes behind the browsing pages.
//!
//! The collection never performs I/O itself. Operations that need data hand
//! back a [`FetchRequest`]; the caller runs it against a source and passes the
//! outcome to [`PagedNoteCollection::apply`] together with the request's
//! [`FetchTicket`]. Tickets that no longer match the collection's generation
//! are dropped, so a slow page can never overwrite a newer reload.

use tracing::debug;

use super::{
    fields::FieldNameConfig,
    note::{
        Note,
        NoteKey,
    },
};
use crate::{
    core::AnkimorphError,
    sources::FetchTarget,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Primary,
    Filtered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    Empty,
    Primary { has_more: bool },
    Filtered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Reload,
    Append,
    Filter,
}

/// Identifies one issued fetch. Only the collection that issued it can tell
/// whether it is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub kind: FetchKind,
    epoch: u64,
    serial: u64,
    start: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub target: FetchTarget,
    pub query: String,
    pub start: usize,
    pub end: usize,
}

/// What applying a fetch outcome did to the collection.
#[derive(Debug)]
pub enum Applied {
    Loaded(usize),
    NoResults,
    Stale,
    Failed(AnkimorphError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterRefused {
    NoNote,
    NoMorphs,
}

pub struct PagedNoteCollection {
    query: String,
    page_size: usize,
    primary: Vec<Note>,
    filtered: Vec<Note>,
    mode: Mode,
    cursor: usize,
    saved_cursor: usize,
    watermark: usize,
    has_more: bool,
    epoch: u64,
    filter_serial: u64,
    pending_append: Option<usize>,
    loading: bool,
}

impl PagedNoteCollection {
    pub fn new(page_size: usize) -> Self {
        Self {
            query: String::new(),
            page_size: page_size.max(1),
            primary: Vec::new(),
            filtered: Vec::new(),
            mode: Mode::Primary,
            cursor: 0,
            saved_cursor: 0,
            watermark: 0,
            has_more: false,
            epoch: 0,
            filter_serial: 0,
            pending_append: None,
            loading: false,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn state(&self) -> CollectionState {
        if self.active().is_empty() {
            return CollectionState::Empty;
        }
        match self.mode {
            Mode::Primary => CollectionState::Primary { has_more: self.has_more },
            Mode::Filtered => CollectionState::Filtered,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn watermark(&self) -> usize {
        self.watermark
    }

    /// The sequence the cursor currently indexes.
    pub fn notes(&self) -> &[Note] {
        self.active()
    }

    pub fn len(&self) -> usize {
        self.active().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active().is_empty()
    }

    /// Looked up by index on every call so it stays valid across list mutations.
    pub fn current(&self) -> Option<&Note> {
        self.active().get(self.cursor)
    }

    /// Empties the collection for a new page size. Generation counters keep
    /// counting, so requests issued before the reset come back stale.
    pub fn reset(&mut self, page_size: usize) {
        self.query.clear();
        self.page_size = page_size.max(1);
        self.primary.clear();
        self.filtered.clear();
        self.mode = Mode::Primary;
        self.cursor = 0;
        self.saved_cursor = 0;
        self.watermark = 0;
        self.has_more = false;
        self.epoch += 1;
        self.filter_serial += 1;
        self.pending_append = None;
        self.loading = false;
    }

    /// Clears everything and requests the first page of `query` from the backend.
    pub fn reload(&mut self, query: impl Into<String>) -> FetchRequest {
        self.query = query.into();
        self.primary.clear();
        self.filtered.clear();
        self.mode = Mode::Primary;
        self.cursor = 0;
        self.saved_cursor = 0;
        self.watermark = 0;
        self.has_more = false;
        self.epoch += 1;
        self.filter_serial += 1;
        self.pending_append = None;
        self.loading = true;

        FetchRequest {
            ticket: self.ticket(FetchKind::Reload, 0),
            target: FetchTarget::Backend,
            query: self.query.clone(),
            start: 0,
            end: self.page_size - 1,
        }
    }

    /// Moves the cursor by `delta`, clamped to the loaded rows.
    ///
    /// Returns the next page request when the cursor lands on the last loaded
    /// primary row.
    pub fn advance(&mut self, delta: isize) -> Option<FetchRequest> {
        let len = self.len();
        if len == 0 {
            return None;
        }
        let target = self.cursor as isize + delta;
        self.cursor = target.clamp(0, len as isize - 1) as usize;
        self.fetch_ahead()
    }

    pub fn select(&mut self, index: usize) -> Option<FetchRequest> {
        let len = self.len();
        if len == 0 {
            return None;
        }
        self.cursor = index.min(len - 1);
        self.fetch_ahead()
    }

    /// Next page request if the cursor sits on the last loaded row and no
    /// request for that page is already in flight.
    pub fn fetch_ahead(&mut self) -> Option<FetchRequest> {
        if self.mode != Mode::Primary
            || !self.has_more
            || self.pending_append.is_some()
            || self.watermark == 0
            || self.cursor + 1 != self.watermark
        {
            return None;
        }

        let start = self.watermark;
        self.pending_append = Some(start);
        debug!("Fetching ahead from offset {}", start);

        Some(FetchRequest {
            ticket: self.ticket(FetchKind::Append, start),
            target: FetchTarget::Backend,
            query: self.query.clone(),
            start,
            end: start + self.page_size - 1,
        })
    }

    /// Requests the notes sharing the current note's morphs.
    ///
    /// Backend searches combine `search_query` with the morphs; provider
    /// searches use the morphs verbatim.
    pub fn enter_filtered(
        &mut self,
        names: &FieldNameConfig,
        search_query: &str,
        target: FetchTarget,
    ) -> Result<FetchRequest, FilterRefused> {
        let morphs = self.current().ok_or(FilterRefused::NoNote)?.morphs(names).trim().to_string();
        if morphs.is_empty() && self.mode != Mode::Filtered {
            return Err(FilterRefused::NoMorphs);
        }

        if self.mode == Mode::Primary {
            self.saved_cursor = self.cursor;
        }
        self.filter_serial += 1;

        let query = match target {
            FetchTarget::Backend => morph_query(search_query, &morphs),
            FetchTarget::External => morphs,
        };

        Ok(FetchRequest {
            ticket: self.ticket(FetchKind::Filter, 0),
            target,
            query,
            start: 0,
            end: self.page_size - 1,
        })
    }

    /// Leaves filtered mode and restores the primary cursor. Returns false
    /// when not filtered.
    pub fn exit_filtered(&mut self) -> bool {
        if self.mode != Mode::Filtered {
            return false;
        }
        self.filtered.clear();
        self.filter_serial += 1;
        self.mode = Mode::Primary;
        self.cursor = clamp_index(self.saved_cursor, self.primary.len());
        true
    }

    /// Drops the note under the cursor from the local lists.
    ///
    /// A backend note deleted while filtered is also removed from the primary
    /// list by key, so leaving filtered mode shows the backend's view.
    pub fn delete_current(&mut self) -> Option<Note> {
        let key = self.current()?.key().clone();
        self.delete(&key)
    }

    /// Drops the note with `key` from the visible list. The cursor stays on
    /// the same note when an earlier row goes away.
    pub fn delete(&mut self, key: &NoteKey) -> Option<Note> {
        let index = self.active().iter().position(|n| n.key() == key)?;

        let removed = match self.mode {
            Mode::Primary => {
                let removed = self.primary.remove(index);
                self.watermark = self.watermark.saturating_sub(1);
                removed
            }
            Mode::Filtered => {
                let removed = self.filtered.remove(index);
                if removed.origin.is_backend() {
                    self.remove_from_primary(removed.key());
                }
                removed
            }
        };

        if index < self.cursor {
            self.cursor -= 1;
        }
        self.cursor = clamp_index(self.cursor, self.len());
        Some(removed)
    }

    fn remove_from_primary(&mut self, key: &NoteKey) {
        let Some(index) = self.primary.iter().position(|n| n.key() == key) else {
            return;
        };
        self.primary.remove(index);
        self.watermark = self.watermark.saturating_sub(1);
        if index < self.saved_cursor {
            self.saved_cursor -= 1;
        }
        self.saved_cursor = clamp_index(self.saved_cursor, self.primary.len());
    }

    /// Applies the outcome of a request issued by this collection.
    pub fn apply(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Note>, AnkimorphError>,
    ) -> Applied {
        if ticket.epoch != self.epoch {
            return Applied::Stale;
        }

        match ticket.kind {
            FetchKind::Reload => self.apply_reload(result),
            FetchKind::Append => self.apply_append(ticket, result),
            FetchKind::Filter => self.apply_filter(ticket, result),
        }
    }

    fn apply_reload(&mut self, result: Result<Vec<Note>, AnkimorphError>) -> Applied {
        self.loading = false;
        let notes = match result {
            Ok(notes) => notes,
            Err(err) => return Applied::Failed(err),
        };

        self.has_more = notes.len() >= self.page_size;
        self.watermark = notes.len();
        self.primary = notes;
        self.cursor = 0;

        if self.primary.is_empty() {
            Applied::NoResults
        } else {
            Applied::Loaded(self.primary.len())
        }
    }

    fn apply_append(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Note>, AnkimorphError>,
    ) -> Applied {
        if self.pending_append != Some(ticket.start) {
            return Applied::Stale;
        }
        self.pending_append = None;

        // Rows were deleted while the page was in flight; its offsets are off.
        if ticket.start != self.watermark {
            return Applied::Stale;
        }

        let notes = match result {
            Ok(notes) => notes,
            Err(err) => return Applied::Failed(err),
        };

        self.has_more = notes.len() >= self.page_size;
        let count = notes.len();
        self.watermark += count;
        self.primary.extend(notes);

        if count == 0 {
            Applied::NoResults
        } else {
            Applied::Loaded(count)
        }
    }

    fn apply_filter(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Note>, AnkimorphError>,
    ) -> Applied {
        if ticket.serial != self.filter_serial {
            return Applied::Stale;
        }

        let notes = match result {
            Ok(notes) => notes,
            Err(err) => return Applied::Failed(err),
        };

        if notes.is_empty() {
            self.filtered.clear();
            self.mode = Mode::Primary;
            self.cursor = clamp_index(self.saved_cursor, self.primary.len());
            return Applied::NoResults;
        }

        let count = notes.len();
        self.filtered = notes;
        self.mode = Mode::Filtered;
        self.cursor = 0;
        Applied::Loaded(count)
    }

    fn active(&self) -> &[Note] {
        match self.mode {
            Mode::Primary => &self.primary,
            Mode::Filtered => &self.filtered,
        }
    }

    fn ticket(&self, kind: FetchKind, start: usize) -> FetchTicket {
        FetchTicket { kind, epoch: self.epoch, serial: self.filter_serial, start }
    }
}

/// Backend search for notes sharing any of the space separated `morphs`.
pub fn morph_query(search_query: &str, morphs: &str) -> String {
    let alternatives = morphs.split_whitespace().collect::<Vec<_>>().join(" or ");
    format!("{} {}", search_query.trim(), alternatives).trim().to_string()
}

fn clamp_index(index: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        index.min(len - 1)
    }
}
