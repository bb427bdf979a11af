use std::{
    sync::Arc,
    time::Instant,
};

use crossterm::event::{
    KeyCode,
    KeyEvent,
};
use ratatui::{
    layout::{
        Constraint,
        Layout,
        Rect,
    },
    style::Style,
    text::{
        Line,
        Span,
    },
    widgets::{
        Clear,
        Paragraph,
        TableState,
    },
    Frame,
};
use tracing::{
    debug,
    info,
};

use super::{
    config_page::{
        ConfigForm,
        FormOutcome,
    },
    image::ImageCells,
    input::InputLine,
    keys::{
        self,
        Action,
    },
    modal::{
        Confirm,
        ConfirmAction,
        Modal,
        ModalOutcome,
    },
    note_page::{
        self,
        NoteView,
    },
    query_page,
    theme::Theme,
};
use crate::{
    config::Settings,
    core::{
        tasks::{
            TaskManager,
            TaskResult,
        },
        AnkimorphError,
        AppContext,
        NoticeBoard,
        Severity,
    },
    notes::{
        Applied,
        FetchKind,
        FetchRequest,
        FilterRefused,
        Mode,
        Note,
        NoteKey,
        PagedNoteCollection,
    },
    pitch::{
        dictionary::tokenizer_dict_dir,
        PitchState,
        ReadingTokenizer,
    },
    playback::PlaybackArbiter,
    sources::FetchTarget,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Query,
    Note,
    Config,
}

pub struct App {
    context: AppContext,
    tasks: TaskManager,
    collection: PagedNoteCollection,
    arbiter: Option<Arc<PlaybackArbiter>>,
    notices: NoticeBoard,
    theme: Theme,

    page: Page,
    modal: Option<Modal>,
    search: Option<InputLine>,
    /// Search bar text for this session, appended to the mining query.
    search_text: String,
    config_form: Option<ConfigForm>,
    table_state: TableState,

    /// Note last shown on the note page.
    shown_key: Option<NoteKey>,
    image_requested: Option<NoteKey>,
    image_cells: ImageCells,

    pitch: PitchState,
    tokenizer: Option<Arc<ReadingTokenizer>>,
    tokenizer_loading: bool,

    should_quit: bool,
}

impl App {
    /// Without an arbiter there is no audio output; playing reports an error.
    pub fn new(context: AppContext, arbiter: Option<Arc<PlaybackArbiter>>) -> Result<Self, AnkimorphError> {
        let collection = PagedNoteCollection::new(context.settings.page_size);
        Ok(Self {
            context,
            tasks: TaskManager::new()?,
            collection,
            arbiter,
            notices: NoticeBoard::new(),
            theme: Theme::default(),
            page: Page::Query,
            modal: None,
            search: None,
            search_text: String::new(),
            config_form: None,
            table_state: TableState::default(),
            shown_key: None,
            image_requested: None,
            image_cells: ImageCells::default(),
            pitch: PitchState::default(),
            tokenizer: None,
            tokenizer_loading: false,
            should_quit: false,
        })
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn collection(&self) -> &PagedNoteCollection {
        &self.collection
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    /// Clears the collection and fetches the first page of the mining query.
    pub fn reload(&mut self) {
        let query = self.context.settings.effective_query(&self.search_text);
        if query.is_empty() {
            self.notices.info("Mining query is empty.");
            return;
        }
        let request = self.collection.reload(query);
        self.fetch(request);
    }

    fn fetch(&self, request: FetchRequest) {
        self.tasks.fetch(self.context.sources.clone(), request);
    }

    /// Drains finished tasks and expires notices. Called every UI tick.
    pub fn tick(&mut self) {
        for result in self.tasks.poll_results() {
            debug!("Task finished: {}", result.task_type());
            self.on_task_result(result);
        }
        self.notices.prune(Instant::now());
        if let Some(arbiter) = &self.arbiter {
            arbiter.is_playing();
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if let Some(modal) = self.modal.take() {
            match modal.handle_key(key) {
                ModalOutcome::Open(modal) => self.modal = Some(modal),
                ModalOutcome::Closed => {}
                ModalOutcome::Confirmed(action) => self.on_confirm(action),
            }
            return;
        }

        if let Some(input) = self.search.as_mut() {
            match key.code {
                KeyCode::Enter => {
                    let query = input.value();
                    self.search = None;
                    self.apply_search(query);
                }
                KeyCode::Esc => self.search = None,
                _ => {
                    input.handle_key(key);
                }
            }
            return;
        }

        if self.page == Page::Config {
            let outcome = match self.config_form.as_mut() {
                Some(form) => form.handle_key(key),
                None => FormOutcome::Cancel,
            };
            match outcome {
                FormOutcome::Continue => {}
                FormOutcome::Cancel => {
                    self.config_form = None;
                    self.page = Page::Query;
                }
                FormOutcome::Save(settings) => self.save_settings(settings),
            }
            return;
        }

        if let Some(action) = keys::action_for(self.page, key) {
            self.perform(action);
        }
    }

    fn perform(&mut self, action: Action) {
        match action {
            Action::Next => self.advance(1),
            Action::Prev => self.advance(-1),
            Action::OpenNote => {
                if self.collection.current().is_some() {
                    self.page = Page::Note;
                    self.show_note();
                }
            }
            Action::PlayAudio => {
                if let Some(note) = self.collection.current().cloned() {
                    self.play(note);
                }
            }
            Action::MorphFilter(target) => self.filter_by_morphs(target),
            Action::Back => match self.page {
                Page::Note | Page::Config => self.page = Page::Query,
                Page::Query => {
                    if self.collection.exit_filtered() {
                        self.on_cursor_moved();
                    }
                }
            },
            Action::Mine => {
                if let Some(note) = self.collection.current() {
                    let text = format!(
                        "Add image and sentence to last added card?\n\n{}",
                        query_page::single_line(note.sentence(&self.context.names))
                    );
                    self.modal = Some(Modal::Confirm(Confirm::new(text, ConfirmAction::Mine(note.clone()))));
                }
            }
            Action::MarkKnown => {
                if let Some(note) = self.collection.current().cloned() {
                    if note.origin.is_backend() {
                        self.tasks.mark_known(self.context.clone(), note);
                    } else {
                        self.notices.info("Only Anki notes can be marked as known");
                    }
                }
            }
            Action::Delete => {
                if let Some(note) = self.collection.current() {
                    let text = format!(
                        "Delete this note?\n\n{}",
                        query_page::single_line(note.sentence(&self.context.names))
                    );
                    self.modal = Some(Modal::Confirm(Confirm::new(text, ConfirmAction::Delete(note.clone()))));
                }
            }
            Action::Browse => {
                if let Some(note) = self.collection.current() {
                    if note.origin.is_backend() {
                        self.tasks.browse(self.context.clone(), note.id);
                    } else {
                        self.notices.info("This note is not in Anki");
                    }
                }
            }
            Action::BrowseLastAdded => self.tasks.browse_last_added(self.context.clone()),
            Action::Search => self.search = Some(InputLine::new(&self.search_text)),
            Action::Config => {
                self.config_form = Some(ConfigForm::new((*self.context.settings).clone()));
                self.page = Page::Config;
            }
            Action::Help => self.modal = Some(Modal::Help(self.page)),
            Action::Quit => self.should_quit = true,
            Action::TogglePitch => self.toggle_pitch(),
            Action::PitchLeft => {
                if let Some(annotation) = self.pitch.active() {
                    annotation.move_left();
                }
            }
            Action::PitchRight => {
                if let Some(annotation) = self.pitch.active() {
                    annotation.move_right();
                }
            }
            Action::PitchDrop => {
                if let Some(annotation) = self.pitch.active() {
                    annotation.add_drop();
                }
            }
            Action::PitchUndo => {
                if let Some(annotation) = self.pitch.active() {
                    annotation.undo_drop();
                }
            }
        }
    }

    fn advance(&mut self, delta: isize) {
        if let Some(request) = self.collection.advance(delta) {
            self.fetch(request);
        }
        self.on_cursor_moved();
    }

    fn on_cursor_moved(&mut self) {
        if self.page == Page::Note {
            self.show_note();
        }
    }

    /// Refreshes the note page for the current note: resets pitch state,
    /// requests the image and auto-plays audio when the note changed.
    fn show_note(&mut self) {
        let Some(note) = self.collection.current().cloned() else {
            self.page = Page::Query;
            return;
        };
        if self.shown_key.as_ref() == Some(note.key()) {
            return;
        }
        self.shown_key = Some(note.key().clone());
        self.pitch.reset();

        if note.cached_image().is_none() && self.image_requested.as_ref() != Some(note.key()) {
            self.image_requested = Some(note.key().clone());
            self.tasks.load_image(note.clone(), self.context.names.clone(), self.context.media_dir.clone());
        }

        if self.context.settings.play_audio_automatically {
            self.play(note);
        }
    }

    fn play(&mut self, note: Note) {
        match &self.arbiter {
            Some(arbiter) => self.tasks.play(arbiter.clone(), note, self.context.names.clone()),
            None => self.notices.error(&AnkimorphError::Playback("No audio output device".to_string())),
        }
    }

    fn filter_by_morphs(&mut self, target: FetchTarget) {
        if target == FetchTarget::External && !self.context.sources.has_external() {
            self.notices.info("No external source configured, set a BrigadaSOS API key");
            return;
        }
        let search_query = self.context.settings.search_query.clone();
        match self.collection.enter_filtered(&self.context.names, &search_query, target) {
            Ok(request) => {
                self.notices.info("Fetching morphs...");
                self.fetch(request);
            }
            Err(FilterRefused::NoMorphs) => self.notices.info("The selected note has no morphs"),
            Err(FilterRefused::NoNote) => {}
        }
    }

    fn toggle_pitch(&mut self) {
        if !self.pitch.toggle() {
            return;
        }
        match self.tokenizer.clone() {
            Some(tokenizer) => self.compute_reading(&tokenizer),
            None if self.tokenizer_loading => {}
            None => {
                self.tokenizer_loading = true;
                self.tasks.load_tokenizer(tokenizer_dict_dir());
            }
        }
    }

    fn compute_reading(&mut self, tokenizer: &ReadingTokenizer) {
        if let Some(note) = self.collection.current() {
            let reading = tokenizer.readings(note.sentence(&self.context.names));
            self.pitch.set_reading(&reading);
        }
    }

    fn apply_search(&mut self, query: String) {
        self.search_text = query.trim().to_string();
        self.reload();
    }

    fn save_settings(&mut self, settings: Settings) {
        if let Err(e) = settings.save() {
            self.notices.error(&e);
            return;
        }
        self.apply_settings(settings);
    }

    /// Swaps in saved settings and reloads. Fetches still in flight belong to
    /// the old query and are dropped when they arrive.
    fn apply_settings(&mut self, settings: Settings) {
        let url_changed = settings.anki_url != self.context.settings.anki_url;

        match self.context.with_settings(settings) {
            Ok(context) => {
                self.context = context;
                self.config_form = None;
                self.page = Page::Query;
                self.collection.reset(self.context.settings.page_size);
                self.shown_key = None;
                self.image_requested = None;
                self.pitch.reset();
                self.notices.info("Settings saved");
                if url_changed {
                    self.notices.info("The AnkiConnect URL is used after a restart");
                }
                self.reload();
            }
            Err(e) => self.notices.error(&e),
        }
    }

    fn on_confirm(&mut self, action: ConfirmAction) {
        match action {
            ConfirmAction::Mine(note) => {
                self.notices.info("Mining...");
                self.tasks.mine(self.context.clone(), note);
            }
            ConfirmAction::Delete(note) => {
                if note.origin.is_backend() {
                    self.tasks.delete(self.context.clone(), note);
                } else {
                    self.remove_note(note.key());
                    self.notices.info("Note removed");
                }
            }
        }
    }

    fn remove_note(&mut self, key: &NoteKey) {
        self.collection.delete(key);
        if self.collection.is_empty() {
            self.page = Page::Query;
        }
        self.on_cursor_moved();
    }

    fn on_task_result(&mut self, result: TaskResult) {
        match result {
            TaskResult::Fetch { ticket, result } => match self.collection.apply(ticket, result) {
                Applied::Loaded(count) => {
                    debug!("Loaded {} notes", count);
                    if ticket.kind != FetchKind::Append {
                        self.shown_key = None;
                        self.on_cursor_moved();
                    }
                }
                Applied::NoResults => {
                    if ticket.kind != FetchKind::Append {
                        self.notices.info("No notes were found with that query");
                    }
                }
                Applied::Stale => debug!("Dropped stale {:?} result", ticket.kind),
                Applied::Failed(e) => self.notices.error(&e),
            },
            TaskResult::Mined(Ok(card)) => {
                info!("Mined into {} with tags {:?}", card.note_id, card.tags);
                self.notices.info("Image and sentence added to last added card");
            }
            TaskResult::MarkedKnown { note_id, result } => match result {
                Ok(_) => self.notices.info(format!(
                    "Card set as known ({}) [{}]",
                    self.context.names.known_tag, note_id
                )),
                Err(e) => self.notices.error(&e),
            },
            TaskResult::Deleted { key, result } => match result {
                Ok(_) => {
                    self.remove_note(&key);
                    self.notices.info("Note deleted");
                }
                Err(e) => self.notices.error(&e),
            },
            TaskResult::Played(Ok(false)) => self.notices.info("This note has no audio"),
            TaskResult::ImageLoaded { key, result } => match result {
                Ok(Some(image)) => {
                    if let Some(note) = self.collection.notes().iter().find(|n| n.key() == &key) {
                        note.cache_image(image);
                    }
                }
                Ok(None) => {}
                Err(e) => self.notices.error(&e),
            },
            TaskResult::TokenizerLoaded(result) => {
                self.tokenizer_loading = false;
                match result {
                    Ok(tokenizer) => {
                        if self.pitch.enabled && self.pitch.annotation.is_none() {
                            self.compute_reading(&tokenizer);
                        }
                        self.tokenizer = Some(tokenizer);
                    }
                    Err(e) => {
                        self.pitch.enabled = false;
                        self.notices.error(&e);
                    }
                }
            }
            TaskResult::LoadingMessage(message) => self.notices.info(message),
            TaskResult::Mined(Err(e)) | TaskResult::Browsed(Err(e)) | TaskResult::Played(Err(e)) => {
                self.notices.error(&e)
            }
            TaskResult::Browsed(Ok(())) | TaskResult::Played(Ok(true)) => {}
        }
    }

    pub fn draw(&mut self, f: &mut Frame) {
        let [header, main, footer] =
            Layout::vertical([Constraint::Length(1), Constraint::Min(5), Constraint::Length(1)]).areas(f.area());

        self.draw_header(f, header);

        match self.page {
            Page::Query => query_page::draw(
                f,
                main,
                &self.collection,
                &mut self.table_state,
                &self.context.names,
                &self.theme,
            ),
            Page::Note => {
                let view = NoteView {
                    note: self.collection.current(),
                    names: &self.context.names,
                    pitch: &self.pitch,
                    tokenizer_loading: self.tokenizer_loading,
                    position: (self.collection.cursor() + 1, self.collection.len()),
                };
                note_page::draw(f, main, view, &mut self.image_cells, &self.theme);
            }
            Page::Config => {
                if let Some(form) = &self.config_form {
                    form.draw(f, main, &self.theme);
                }
            }
        }

        self.draw_footer(f, footer);
        self.draw_notices(f, main);

        if let Some(modal) = &self.modal {
            modal.draw(f, &self.theme);
        }
    }

    fn draw_header(&self, f: &mut Frame, area: Rect) {
        let th = &self.theme;
        let mut spans = vec![
            Span::styled(" ankimorph ", th.title()),
            Span::styled(" | query: ", th.dim()),
            Span::styled(self.context.settings.effective_query(&self.search_text), th.text()),
            Span::styled(" | total: ", th.dim()),
            Span::styled(self.collection.len().to_string(), th.text()),
        ];
        if self.collection.mode() == Mode::Filtered {
            spans.push(Span::styled(" [MORPHS]", Style::default().fg(th.warn)));
        }
        if self.collection.is_loading() {
            spans.push(Span::styled(" loading...", th.dim()));
        }
        f.render_widget(Paragraph::new(Line::from(spans)).style(th.bar()), area);
    }

    fn draw_footer(&self, f: &mut Frame, area: Rect) {
        let th = &self.theme;
        let line = match &self.search {
            Some(input) => {
                let mut spans = vec![Span::styled(" search: ", Style::default().fg(th.accent))];
                spans.extend(input.spans(th.text(), Style::default().fg(th.accent)));
                Line::from(spans)
            }
            None => Line::from(Span::styled(keys::short_help(self.page), th.dim())),
        };
        f.render_widget(Paragraph::new(line).style(th.bar()), area);
    }

    fn draw_notices(&self, f: &mut Frame, area: Rect) {
        if self.notices.is_empty() {
            return;
        }
        let th = &self.theme;
        let mut lines: Vec<Line> = self
            .notices
            .visible()
            .iter()
            .map(|notice| {
                let color = match notice.severity {
                    Severity::Info => th.good,
                    Severity::Error => th.error,
                };
                Line::from(Span::styled(format!(" {} ", notice.text), Style::default().fg(color)))
            })
            .collect();
        if let Some(overflow) = self.notices.overflow_line() {
            lines.push(Line::from(Span::styled(format!(" {} ", overflow), th.dim())));
        }

        let width = lines.iter().map(|l| l.width() as u16).max().unwrap_or(0).min(area.width);
        let height = (lines.len() as u16).min(area.height);
        let rect = Rect {
            x: area.x + area.width.saturating_sub(width + 1),
            y: area.y + 1,
            width,
            height,
        };
        f.render_widget(Clear, rect);
        f.render_widget(Paragraph::new(lines).style(th.bar()), rect);
    }
}
