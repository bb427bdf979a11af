use std::{
    sync::Arc,
    time::Instant,
};

use async_trait::async_trait;
use rayon::iter::{
    IntoParallelIterator,
    ParallelIterator,
};
use tracing::debug;

use super::NoteSource;
use crate::{
    anki::AnkiApi,
    core::AnkimorphError,
    notes::Note,
};

const SOURCE_NAME: &str = "Anki";

/// Notes from the local Anki collection.
///
/// `findNotes` is not paginated, so every page runs the full search and
/// slices the id list before asking for the note contents.
pub struct BackendSource {
    api: Arc<dyn AnkiApi>,
}

impl BackendSource {
    pub fn new(api: Arc<dyn AnkiApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl NoteSource for BackendSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch_page(
        &self,
        query: &str,
        start: usize,
        end: usize,
    ) -> Result<Vec<Note>, AnkimorphError> {
        let started = Instant::now();
        let ids = self.api.find_notes(query).await.map_err(|e| e.into_fetch_error(SOURCE_NAME))?;

        if start >= ids.len() || end < start {
            return Ok(Vec::new());
        }
        let page = &ids[start..=end.min(ids.len() - 1)];

        let notes = self.api.notes_info(page).await.map_err(|e| e.into_fetch_error(SOURCE_NAME))?;
        let notes: Vec<Note> = notes.into_par_iter().map(Note::from_anki).collect();

        debug!(
            "Loaded {} of {} notes for {:?} in {:?}",
            notes.len(),
            ids.len(),
            query,
            started.elapsed()
        );
        Ok(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anki::testing::{
        Call,
        MemoryAnki,
    };

    fn anki() -> Arc<MemoryAnki> {
        let notes = (1..=5).map(|id| MemoryAnki::note(id, &[("Expression", "文")], &[])).collect();
        Arc::new(MemoryAnki::with_notes(notes))
    }

    #[tokio::test]
    async fn test_fetch_page_slices_inclusive_range() {
        let anki = anki();
        let source = BackendSource::new(anki.clone());

        let notes = source.fetch_page("deck:x", 1, 3).await.unwrap();
        let ids: Vec<i64> = notes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![2, 3, 4]);
        assert!(anki.calls().contains(&Call::NotesInfo(vec![2, 3, 4])));
    }

    #[tokio::test]
    async fn test_fetch_page_past_the_end() {
        let anki = anki();
        let source = BackendSource::new(anki.clone());

        let tail = source.fetch_page("deck:x", 3, 99).await.unwrap();
        assert_eq!(tail.len(), 2);

        let none = source.fetch_page("deck:x", 5, 9).await.unwrap();
        assert!(none.is_empty());
        assert!(!anki.calls().contains(&Call::NotesInfo(vec![])));
    }

    #[tokio::test]
    async fn test_search_failure_is_fetch_error() {
        let anki = anki();
        *anki.fail_find.lock().unwrap() = true;
        let source = BackendSource::new(anki);

        match source.fetch_page("deck:x", 0, 9).await {
            Err(AnkimorphError::SourceFetch { source_name, message }) => {
                assert_eq!(source_name, "Anki");
                assert!(message.contains("connection refused"));
            }
            other => panic!("Expected SourceFetch, got {:?}", other.map(|n| n.len())),
        }
    }

    #[tokio::test]
    async fn test_note_info_failure_is_fetch_error() {
        let anki = anki();
        *anki.fail_info.lock().unwrap() = true;
        let source = BackendSource::new(anki.clone());

        match source.fetch_page("deck:x", 0, 1).await {
            Err(AnkimorphError::SourceFetch { source_name, message }) => {
                assert_eq!(source_name, "Anki");
                assert!(message.contains("collection is not available"));
            }
            other => panic!("Expected SourceFetch, got {:?}", other.map(|n| n.len())),
        }
        assert_eq!(anki.calls(), vec![Call::FindNotes("deck:x".to_string()), Call::NotesInfo(vec![1, 2])]);
    }
}
