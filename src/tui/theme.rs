use ratatui::style::{
    Color,
    Modifier,
    Style,
};

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub fg: Color,
    pub muted: Color,
    pub accent: Color,
    pub bar_bg: Color,
    pub selection_fg: Color,
    pub selection_bg: Color,
    pub good: Color,
    pub warn: Color,
    pub error: Color,
    pub cursor_fg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: Color::Rgb(220, 220, 220),
            muted: Color::Rgb(140, 140, 140),
            accent: Color::Rgb(95, 175, 255),
            bar_bg: Color::Rgb(35, 40, 46),
            selection_fg: Color::Rgb(255, 255, 175),
            selection_bg: Color::Rgb(95, 0, 255),
            good: Color::Rgb(130, 200, 120),
            warn: Color::Rgb(255, 200, 110),
            error: Color::Rgb(240, 110, 110),
            cursor_fg: Color::Rgb(98, 98, 98),
        }
    }
}

impl Theme {
    pub fn text(&self) -> Style {
        Style::default().fg(self.fg)
    }

    pub fn dim(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn title(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    pub fn selected(&self) -> Style {
        Style::default().fg(self.selection_fg).bg(self.selection_bg)
    }

    pub fn bar(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bar_bg)
    }
}
