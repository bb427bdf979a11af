use ratatui::{
    layout::{
        Alignment,
        Constraint,
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
        Paragraph,
        Wrap,
    },
    Frame,
};

use super::{
    image::ImageCells,
    query_page::single_line,
    theme::Theme,
};
use crate::{
    notes::{
        FieldNameConfig,
        Note,
    },
    pitch::{
        PitchAnnotation,
        PitchState,
        DROP_MARK,
    },
};

pub struct NoteView<'a> {
    pub note: Option<&'a Note>,
    pub names: &'a FieldNameConfig,
    pub pitch: &'a PitchState,
    pub tokenizer_loading: bool,
    pub position: (usize, usize),
}

pub fn draw(f: &mut Frame, area: Rect, view: NoteView<'_>, cells: &mut ImageCells, theme: &Theme) {
    let block = Block::default()
        .title(Span::styled(format!(" Note {}/{} ", view.position.0, view.position.1), theme.title()))
        .borders(Borders::ALL)
        .border_style(theme.dim());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(note) = view.note else {
        f.render_widget(Paragraph::new(Span::styled("No note selected", theme.dim())), inner);
        return;
    };

    let [image_area, text_area] = Layout::vertical([Constraint::Percentage(65), Constraint::Min(6)]).areas(inner);

    match note.cached_image() {
        Some(image) => {
            let lines = cells.get(note.key(), &image, image_area.width, image_area.height).to_vec();
            f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), image_area);
        }
        None => {
            let text = if note.image_ref(view.names).is_empty() { "no image" } else { "loading image..." };
            f.render_widget(
                Paragraph::new(Span::styled(text, theme.dim())).alignment(Alignment::Center),
                image_area,
            );
        }
    }

    let morphs = note.morphs(view.names);
    let mut lines = vec![
        field_line("morphs", if morphs.is_empty() { "-" } else { morphs }, theme),
        field_line("sentence", &single_line(note.sentence(view.names)), theme),
    ];

    if view.pitch.enabled {
        lines.push(match &view.pitch.annotation {
            Some(annotation) => pitch_line(annotation, theme),
            None if view.tokenizer_loading => field_line("pitch", "loading tokenizer...", theme),
            None => field_line("pitch", "-", theme),
        });
    }

    lines.push(field_line("tags", &note.tags.join(", "), theme));
    lines.push(field_line("source", &note.origin.to_string(), theme));

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), text_area);
}

fn field_line(label: &str, value: &str, theme: &Theme) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", label), theme.dim()),
        Span::styled(value.to_string(), theme.text()),
    ])
}

/// Reading with the cursor character highlighted and a drop mark after
/// every marked character.
pub fn pitch_line(annotation: &PitchAnnotation, theme: &Theme) -> Line<'static> {
    let mut spans = vec![Span::styled("pitch: ", theme.dim())];
    for cell in annotation.cells() {
        let style = if cell.under_cursor {
            Style::default().fg(theme.cursor_fg).add_modifier(Modifier::REVERSED)
        } else {
            theme.text()
        };
        spans.push(Span::styled(cell.ch.to_string(), style));
        if cell.dropped {
            spans.push(Span::styled(DROP_MARK.to_string(), Style::default().fg(theme.warn)));
        }
    }
    Line::from(spans)
}
