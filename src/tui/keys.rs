use crossterm::event::{
    KeyCode,
    KeyEvent,
    KeyModifiers,
};

use super::app::Page;
use crate::sources::FetchTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Next,
    Prev,
    OpenNote,
    PlayAudio,
    MorphFilter(FetchTarget),
    Back,
    Mine,
    MarkKnown,
    Delete,
    Browse,
    BrowseLastAdded,
    Search,
    Config,
    Help,
    Quit,
    TogglePitch,
    PitchLeft,
    PitchRight,
    PitchDrop,
    PitchUndo,
}

/// Maps a key press on the browsing pages. The config page reads keys itself.
pub fn action_for(page: Page, key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('n') => Some(Action::Mine),
            KeyCode::Char('k') => Some(Action::MarkKnown),
            KeyCode::Char('c') => Some(Action::Quit),
            _ => None,
        };
    }

    let common = match key.code {
        KeyCode::Char('j') | KeyCode::Down => Some(Action::Next),
        KeyCode::Char('k') | KeyCode::Up => Some(Action::Prev),
        KeyCode::Char('o') | KeyCode::Enter => Some(Action::OpenNote),
        KeyCode::Char('p') => Some(Action::PlayAudio),
        KeyCode::Char('m') => Some(Action::MorphFilter(FetchTarget::Backend)),
        KeyCode::Char('M') => Some(Action::MorphFilter(FetchTarget::External)),
        KeyCode::Esc => Some(Action::Back),
        KeyCode::Char('d') => Some(Action::Delete),
        KeyCode::Char('g') => Some(Action::Browse),
        KeyCode::Char('G') => Some(Action::BrowseLastAdded),
        KeyCode::Char('/') => Some(Action::Search),
        KeyCode::Char('c') => Some(Action::Config),
        KeyCode::Char('?') => Some(Action::Help),
        KeyCode::Char('q') => Some(Action::Quit),
        _ => None,
    };
    if common.is_some() || page != Page::Note {
        return common;
    }

    match key.code {
        KeyCode::Char('i') => Some(Action::TogglePitch),
        KeyCode::Char('h') | KeyCode::Left => Some(Action::PitchLeft),
        KeyCode::Char('l') | KeyCode::Right => Some(Action::PitchRight),
        KeyCode::Char('a') => Some(Action::PitchDrop),
        KeyCode::Char('u') => Some(Action::PitchUndo),
        _ => None,
    }
}

const QUERY_HELP: &[(&str, &str)] = &[
    ("j / ↓", "Next note"),
    ("k / ↑", "Previous note"),
    ("o / Enter", "Open note"),
    ("p", "Play audio"),
    ("m", "Notes sharing these morphs"),
    ("M", "Sentences with these morphs from external sources"),
    ("Esc", "Leave morph mode"),
    ("Ctrl-n", "Mine to last added card"),
    ("Ctrl-k", "Mark as known"),
    ("d", "Delete note"),
    ("g", "See in Anki"),
    ("G", "See last added card in Anki"),
    ("/", "Search"),
    ("c", "Config"),
    ("?", "Help"),
    ("q / Ctrl-c", "Quit"),
];

const NOTE_HELP: &[(&str, &str)] = &[
    ("j / k", "Next / previous note"),
    ("p", "Play audio"),
    ("Ctrl-n", "Mine to last added card"),
    ("g", "See in Anki"),
    ("i", "Pitch mode"),
    ("h / l", "Move pitch cursor"),
    ("a", "Add pitch drop"),
    ("u", "Undo last drop"),
    ("Esc", "Return"),
];

const CONFIG_HELP: &[(&str, &str)] = &[
    ("j / k", "Move between fields"),
    ("Enter", "Edit field / toggle / save"),
    ("Ctrl-s", "Save"),
    ("Esc", "Cancel"),
];

pub fn help(page: Page) -> &'static [(&'static str, &'static str)] {
    match page {
        Page::Query => QUERY_HELP,
        Page::Note => NOTE_HELP,
        Page::Config => CONFIG_HELP,
    }
}

/// One line of the most used bindings for the footer.
pub fn short_help(page: Page) -> &'static str {
    match page {
        Page::Query => " j/k move  o open  p play  m morphs  M external  / search  c config  ? help  q quit ",
        Page::Note => " j/k move  p play  i pitch  h/l cursor  a drop  u undo  Ctrl-n mine  esc return ",
        Page::Config => " j/k move  enter edit  ctrl-s save  esc cancel ",
    }
}
