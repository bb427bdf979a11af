use crossterm::event::{
    KeyCode,
    KeyEvent,
};
use ratatui::{
    layout::{
        Alignment,
        Constraint,
        Direction,
        Layout,
        Rect,
    },
    style::{
        Modifier,
        Style,
    },
    text::{
        Line,
        Span,
    },
    widgets::{
        Block,
        Borders,
        Clear,
        Paragraph,
        Wrap,
    },
    Frame,
};

use super::{
    app::Page,
    keys,
    theme::Theme,
};
use crate::notes::Note;

#[derive(Debug, Clone)]
pub enum ConfirmAction {
    Mine(Note),
    Delete(Note),
}

#[derive(Debug, Clone)]
pub struct Confirm {
    pub text: String,
    pub ok_text: &'static str,
    pub cancel_text: &'static str,
    pub action: ConfirmAction,
    ok_selected: bool,
}

impl Confirm {
    pub fn new(text: impl Into<String>, action: ConfirmAction) -> Self {
        Self { text: text.into(), ok_text: "Yes", cancel_text: "No", action, ok_selected: true }
    }
}

#[derive(Debug, Clone)]
pub enum Modal {
    Confirm(Confirm),
    Help(Page),
}

#[derive(Debug)]
pub enum ModalOutcome {
    Open(Modal),
    Closed,
    Confirmed(ConfirmAction),
}

impl Modal {
    pub fn handle_key(self, key: KeyEvent) -> ModalOutcome {
        match self {
            Modal::Help(_) => ModalOutcome::Closed,
            Modal::Confirm(mut confirm) => match key.code {
                KeyCode::Char('y') => ModalOutcome::Confirmed(confirm.action),
                KeyCode::Char('n') | KeyCode::Esc => ModalOutcome::Closed,
                KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::Char('h') | KeyCode::Char('l') => {
                    confirm.ok_selected = !confirm.ok_selected;
                    ModalOutcome::Open(Modal::Confirm(confirm))
                }
                KeyCode::Enter if confirm.ok_selected => ModalOutcome::Confirmed(confirm.action),
                KeyCode::Enter => ModalOutcome::Closed,
                _ => ModalOutcome::Open(Modal::Confirm(confirm)),
            },
        }
    }

    pub fn draw(&self, f: &mut Frame, theme: &Theme) {
        match self {
            Modal::Confirm(confirm) => draw_confirm(f, confirm, theme),
            Modal::Help(page) => draw_help(f, *page, theme),
        }
    }
}

fn draw_confirm(f: &mut Frame, confirm: &Confirm, theme: &Theme) {
    let area = centered_rect(60, 40, f.area());
    f.render_widget(Clear, area);

    let focused = Style::default().fg(theme.accent).add_modifier(Modifier::UNDERLINED);
    let button = |text: &str, selected: bool| {
        if selected {
            Span::styled(format!("[ {} ]", text), focused)
        } else {
            Span::styled(format!("  {}  ", text), theme.dim())
        }
    };

    let mut lines: Vec<Line> = confirm.text.lines().map(|l| Line::from(l.to_string())).collect();
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        button(confirm.ok_text, confirm.ok_selected),
        Span::raw("   "),
        button(confirm.cancel_text, !confirm.ok_selected),
    ]));

    let block = Block::default().borders(Borders::ALL).border_style(theme.dim());
    let para = Paragraph::new(lines)
        .block(block)
        .style(theme.text())
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false });
    f.render_widget(para, area);
}

fn draw_help(f: &mut Frame, page: Page, theme: &Theme) {
    let area = centered_rect(60, 70, f.area());
    f.render_widget(Clear, area);

    let lines: Vec<Line> = keys::help(page)
        .iter()
        .map(|(key, what)| {
            Line::from(vec![
                Span::styled(format!("{:>12}  ", key), Style::default().fg(theme.accent)),
                Span::styled(*what, theme.text()),
            ])
        })
        .collect();

    let block = Block::default()
        .title(Span::styled(" Keys (any key closes) ", theme.title()))
        .borders(Borders::ALL)
        .border_style(theme.dim());
    f.render_widget(Paragraph::new(lines).block(block), area);
}

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vert[1]);
    horiz[1]
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;

    use super::*;
    use crate::anki::testing::MemoryAnki;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn confirm() -> Modal {
        let note = Note::from_anki(MemoryAnki::note(3, &[("Expression", "猫")], &[]));
        Modal::Confirm(Confirm::new("Delete?", ConfirmAction::Delete(note)))
    }

    #[test]
    fn test_enter_confirms_by_default() {
        match confirm().handle_key(key(KeyCode::Enter)) {
            ModalOutcome::Confirmed(ConfirmAction::Delete(note)) => assert_eq!(note.id, 3),
            other => panic!("Expected confirmation, got {:?}", other),
        }
    }

    #[test]
    fn test_switching_to_cancel() {
        let ModalOutcome::Open(modal) = confirm().handle_key(key(KeyCode::Right)) else {
            panic!("Modal should stay open");
        };
        assert!(matches!(modal.handle_key(key(KeyCode::Enter)), ModalOutcome::Closed));
        assert!(matches!(confirm().handle_key(key(KeyCode::Esc)), ModalOutcome::Closed));
        assert!(matches!(confirm().handle_key(key(KeyCode::Char('y'))), ModalOutcome::Confirmed(_)));
    }

    #[test]
    fn test_help_closes_on_any_key() {
        assert!(matches!(Modal::Help(Page::Note).handle_key(key(KeyCode::Char('x'))), ModalOutcome::Closed));
    }
}
