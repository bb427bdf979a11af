use ratatui::{
    layout::{
        Constraint,
        Rect,
    },
    text::Span,
    widgets::{
        Block,
        Borders,
        Cell,
        Paragraph,
        Row,
        Table,
        TableState,
    },
    Frame,
};

use super::theme::Theme;
use crate::notes::{
    CollectionState,
    FieldNameConfig,
    PagedNoteCollection,
};

/// Sentence list of the active sequence with the cursor row highlighted.
pub fn draw(
    f: &mut Frame,
    area: Rect,
    collection: &PagedNoteCollection,
    table_state: &mut TableState,
    names: &FieldNameConfig,
    theme: &Theme,
) {
    if collection.is_empty() {
        let text = if collection.is_loading() { "Loading notes..." } else { "No notes" };
        let para = Paragraph::new(Span::styled(text, theme.dim()))
            .block(Block::default().borders(Borders::ALL).border_style(theme.dim()));
        f.render_widget(para, area);
        return;
    }

    let rows = collection.notes().iter().enumerate().map(|(i, note)| {
        Row::new(vec![
            Cell::from(format!("#{}", i + 1)),
            Cell::from(single_line(note.sentence(names))),
            Cell::from(note.morphs(names).to_string()),
            Cell::from(note.tags.join(", ")),
        ])
    });

    let title = match collection.state() {
        CollectionState::Filtered => " Morphs ",
        CollectionState::Primary { has_more: true } => " Notes (more on demand) ",
        _ => " Notes ",
    };

    let table = Table::new(
        rows,
        [Constraint::Length(6), Constraint::Percentage(50), Constraint::Percentage(20), Constraint::Percentage(30)],
    )
    .header(Row::new(vec!["#", "Sentence", "Morphs", "Tags"]).style(theme.title()))
    .block(
        Block::default()
            .title(Span::styled(title, theme.title()))
            .borders(Borders::ALL)
            .border_style(theme.dim()),
    )
    .row_highlight_style(theme.selected());

    table_state.select(Some(collection.cursor()));
    f.render_stateful_widget(table, area, table_state);
}

/// Field values may hold markup line breaks; rows are one line tall.
pub fn single_line(text: &str) -> String {
    text.replace("<br>", " ").replace(['\n', '\r'], " ")
}
