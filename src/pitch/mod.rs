//! Pitch-accent annotation of the current sentence.
//!
//! The sentence is rewritten as katakana readings separated by ideographic
//! spaces. A cursor walks the reading and the user marks the mora after
//! which the pitch drops.

pub mod dictionary;
pub mod tokenizer;

pub use tokenizer::ReadingTokenizer;

/// Ends every token of a reading.
pub const SEPARATOR: char = '　';

pub const DROP_MARK: char = '↓';

/// One character of a rendered reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchCell {
    pub ch: char,
    pub under_cursor: bool,
    pub dropped: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PitchAnnotation {
    reading: Vec<char>,
    cursor: usize,
    drops: Vec<usize>,
}

impl PitchAnnotation {
    pub fn new(reading: &str) -> Self {
        let reading: Vec<char> = reading.chars().collect();
        let cursor = reading.iter().position(|c| *c != SEPARATOR).unwrap_or(0);
        Self { reading, cursor, drops: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.reading.iter().all(|c| *c == SEPARATOR)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn drops(&self) -> &[usize] {
        &self.drops
    }

    /// Moves to the next character, stepping over separators. Stays put at
    /// the last one.
    pub fn move_right(&mut self) {
        if let Some(next) = (self.cursor + 1..self.reading.len()).find(|i| self.reading[*i] != SEPARATOR) {
            self.cursor = next;
        }
    }

    pub fn move_left(&mut self) {
        if let Some(prev) = (0..self.cursor).rev().find(|i| self.reading[*i] != SEPARATOR) {
            self.cursor = prev;
        }
    }

    /// Marks a drop after the character under the cursor. Marking the same
    /// position twice is a no-op.
    pub fn add_drop(&mut self) {
        if self.is_empty() || self.drops.contains(&self.cursor) {
            return;
        }
        self.drops.push(self.cursor);
    }

    /// Removes the most recent drop.
    pub fn undo_drop(&mut self) -> Option<usize> {
        self.drops.pop()
    }

    pub fn cells(&self) -> Vec<PitchCell> {
        self.reading
            .iter()
            .enumerate()
            .map(|(i, ch)| PitchCell {
                ch: *ch,
                under_cursor: i == self.cursor,
                dropped: self.drops.contains(&i),
            })
            .collect()
    }

    /// Plain rendering with a drop mark after every marked character.
    pub fn marked(&self) -> String {
        let mut out = String::new();
        for cell in self.cells() {
            out.push(cell.ch);
            if cell.dropped {
                out.push(DROP_MARK);
            }
        }
        out
    }
}

/// Per-note pitch mode. Readings are computed lazily the first time the
/// mode is switched on for a note.
#[derive(Debug, Clone, Default)]
pub struct PitchState {
    pub enabled: bool,
    pub annotation: Option<PitchAnnotation>,
}

impl PitchState {
    /// Flips the mode and reports whether readings are still missing.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled && self.annotation.is_none()
    }

    pub fn set_reading(&mut self, reading: &str) {
        self.annotation = Some(PitchAnnotation::new(reading));
    }

    pub fn active(&mut self) -> Option<&mut PitchAnnotation> {
        if self.enabled {
            self.annotation.as_mut()
        } else {
            None
        }
    }

    /// Called whenever another note becomes current.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_skips_separators() {
        let mut pitch = PitchAnnotation::new("ネコ　ダ　");
        assert_eq!(pitch.cursor(), 0);

        pitch.move_right();
        pitch.move_right();
        assert_eq!(pitch.cursor(), 3);

        pitch.move_right();
        assert_eq!(pitch.cursor(), 3);

        pitch.move_left();
        assert_eq!(pitch.cursor(), 1);
        pitch.move_left();
        pitch.move_left();
        assert_eq!(pitch.cursor(), 0);
    }

    #[test]
    fn test_drops_render_after_character() {
        let mut pitch = PitchAnnotation::new("ネコ　ダ　");
        pitch.add_drop();
        pitch.add_drop();
        pitch.move_right();
        pitch.move_right();
        pitch.add_drop();
        assert_eq!(pitch.marked(), "ネ↓コ　ダ↓　");

        assert_eq!(pitch.undo_drop(), Some(3));
        assert_eq!(pitch.marked(), "ネ↓コ　ダ　");
        assert_eq!(pitch.drops(), &[0]);
    }

    #[test]
    fn test_cells_track_cursor() {
        let mut pitch = PitchAnnotation::new("アメ　");
        pitch.move_right();
        let cells = pitch.cells();
        assert!(!cells[0].under_cursor);
        assert!(cells[1].under_cursor);
        assert_eq!(cells.len(), 3);
    }

    #[test]
    fn test_empty_reading_ignores_drops() {
        let mut pitch = PitchAnnotation::new("");
        pitch.move_right();
        pitch.move_left();
        pitch.add_drop();
        assert!(pitch.drops().is_empty());
        assert!(pitch.is_empty());
    }

    #[test]
    fn test_state_is_lazy_and_resettable() {
        let mut state = PitchState::default();
        assert!(state.toggle());
        state.set_reading("ネコ　");
        assert!(state.active().is_some());

        assert!(!state.toggle());
        assert!(state.active().is_none());
        assert!(!state.toggle());

        state.reset();
        assert!(!state.enabled);
        assert!(state.annotation.is_none());
    }
}
