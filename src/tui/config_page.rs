use crossterm::event::{
    KeyCode,
    KeyEvent,
    KeyModifiers,
};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{
        Line,
        Span,
    },
    widgets::{
        Block,
        Borders,
        Paragraph,
    },
    Frame,
};

use super::{
    input::InputLine,
    theme::Theme,
};
use crate::config::{
    SettingKey,
    Settings,
};

#[derive(Debug, PartialEq, Eq)]
pub enum FormOutcome {
    Continue,
    Save(Settings),
    Cancel,
}

/// Edits a draft copy of the settings. Nothing is applied until saved.
pub struct ConfigForm {
    draft: Settings,
    focused: usize,
    editing: Option<InputLine>,
    error: Option<String>,
}

impl ConfigForm {
    pub fn new(settings: Settings) -> Self {
        Self { draft: settings, focused: 0, editing: None, error: None }
    }

    /// Index of the save button, after the last field.
    fn save_index() -> usize {
        SettingKey::ALL.len()
    }

    fn focused_key(&self) -> Option<SettingKey> {
        SettingKey::ALL.get(self.focused).copied()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormOutcome {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
            if self.editing.is_some() && !self.commit() {
                return FormOutcome::Continue;
            }
            return FormOutcome::Save(self.draft.clone());
        }

        if let Some(input) = self.editing.as_mut() {
            match key.code {
                KeyCode::Enter | KeyCode::Tab => {
                    if self.commit() {
                        self.move_focus(1);
                    }
                }
                KeyCode::Esc => {
                    self.editing = None;
                    self.error = None;
                }
                _ => {
                    input.handle_key(key);
                }
            }
            return FormOutcome::Continue;
        }

        match key.code {
            KeyCode::Esc => return FormOutcome::Cancel,
            KeyCode::Char('j') | KeyCode::Down | KeyCode::Tab => self.move_focus(1),
            KeyCode::Char('k') | KeyCode::Up | KeyCode::BackTab => self.move_focus(-1),
            KeyCode::Enter => match self.focused_key() {
                None => return FormOutcome::Save(self.draft.clone()),
                Some(SettingKey::PlayAudioAutomatically) => {
                    self.draft.play_audio_automatically = !self.draft.play_audio_automatically;
                }
                Some(key) => self.editing = Some(InputLine::new(&self.draft.value(key))),
            },
            _ => {}
        }
        FormOutcome::Continue
    }

    /// Writes the input into the draft. Returns false and keeps editing
    /// when the value does not parse.
    fn commit(&mut self) -> bool {
        let (Some(key), Some(input)) = (self.focused_key(), self.editing.as_ref()) else {
            return true;
        };
        match self.draft.set(key, &input.value()) {
            Ok(()) => {
                self.editing = None;
                self.error = None;
                true
            }
            Err(e) => {
                self.error = Some(e.to_string());
                false
            }
        }
    }

    fn move_focus(&mut self, delta: isize) {
        let last = Self::save_index() as isize;
        self.focused = (self.focused as isize + delta).clamp(0, last) as usize;
    }

    pub fn draw(&self, f: &mut Frame, area: Rect, theme: &Theme) {
        let width = SettingKey::ALL.iter().map(|k| k.label().len()).max().unwrap_or(0);
        let mut lines = Vec::new();

        for (i, key) in SettingKey::ALL.iter().enumerate() {
            let focused = i == self.focused;
            let label_style = if focused { Style::default().fg(theme.accent) } else { theme.dim() };
            let mut spans = vec![Span::styled(format!(" {:<width$}  ", key.label(), width = width), label_style)];

            match (&self.editing, focused) {
                (Some(input), true) => spans.extend(input.spans(theme.text(), Style::default().fg(theme.accent))),
                _ => {
                    let value = self.draft.value(*key);
                    let shown = if key.is_secret() && !value.is_empty() { "•".repeat(8) } else { value };
                    spans.push(Span::styled(shown, if focused { theme.selected() } else { theme.text() }));
                }
            }
            lines.push(Line::from(spans));
        }

        lines.push(Line::from(""));
        let save_style = if self.focused == Self::save_index() { theme.selected() } else { theme.dim() };
        lines.push(Line::from(Span::styled(" [ Save ] ", save_style)));

        if let Some(error) = &self.error {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(format!(" {}", error), Style::default().fg(theme.error))));
        }

        let block = Block::default()
            .title(Span::styled(" Config ", theme.title()))
            .borders(Borders::ALL)
            .border_style(theme.dim());
        f.render_widget(Paragraph::new(lines).block(block), area);
    }
}
