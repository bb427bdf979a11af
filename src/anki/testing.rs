//! In-memory AnkiConnect used by unit tests.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::Mutex,
};

use async_trait::async_trait;

use super::{
    types::{
        AnkiNote,
        Field,
    },
    AnkiApi,
};
use crate::core::AnkimorphError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FindNotes(String),
    NotesInfo(Vec<i64>),
    DeleteNotes(Vec<i64>),
    UpdateNoteFields(i64, HashMap<String, String>),
    AddTags(i64, String),
    GuiBrowse(String),
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(self, Call::DeleteNotes(_) | Call::UpdateNoteFields(..) | Call::AddTags(..))
    }
}

/// Every query matches every stored note (ordered by insertion) unless a
/// canned answer was registered for it with `answer`.
#[derive(Default)]
pub struct MemoryAnki {
    pub notes: Mutex<Vec<AnkiNote>>,
    pub answers: Mutex<HashMap<String, Vec<i64>>>,
    pub calls: Mutex<Vec<Call>>,
    pub fail_find: Mutex<bool>,
    pub fail_info: Mutex<bool>,
    pub fail_tag: Mutex<Option<String>>,
}

impl MemoryAnki {
    pub fn with_notes(notes: Vec<AnkiNote>) -> Self {
        Self { notes: Mutex::new(notes), ..Default::default() }
    }

    pub fn note(id: i64, fields: &[(&str, &str)], tags: &[&str]) -> AnkiNote {
        AnkiNote {
            note_id: id,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            fields: fields
                .iter()
                .enumerate()
                .map(|(i, (k, v))| (k.to_string(), Field::new(*v, i as u32)))
                .collect(),
            model_name: "Sentence".to_string(),
        }
    }

    pub fn answer(self, query: &str, ids: Vec<i64>) -> Self {
        self.answers.lock().unwrap().insert(query.to_string(), ids);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AnkiApi for MemoryAnki {
    async fn find_notes(&self, query: &str) -> Result<Vec<i64>, AnkimorphError> {
        self.record(Call::FindNotes(query.to_string()));
        if *self.fail_find.lock().unwrap() {
            return Err(AnkimorphError::Backend {
                action: "findNotes",
                message: "connection refused".to_string(),
            });
        }
        if let Some(ids) = self.answers.lock().unwrap().get(query) {
            return Ok(ids.clone());
        }
        Ok(self.notes.lock().unwrap().iter().map(|n| n.note_id).collect())
    }

    async fn notes_info(&self, note_ids: &[i64]) -> Result<Vec<AnkiNote>, AnkimorphError> {
        self.record(Call::NotesInfo(note_ids.to_vec()));
        if *self.fail_info.lock().unwrap() {
            return Err(AnkimorphError::Backend {
                action: "notesInfo",
                message: "collection is not available".to_string(),
            });
        }
        let notes = self.notes.lock().unwrap();
        Ok(note_ids
            .iter()
            .filter_map(|id| notes.iter().find(|n| n.note_id == *id).cloned())
            .collect())
    }

    async fn delete_notes(&self, note_ids: &[i64]) -> Result<(), AnkimorphError> {
        self.record(Call::DeleteNotes(note_ids.to_vec()));
        self.notes.lock().unwrap().retain(|n| !note_ids.contains(&n.note_id));
        Ok(())
    }

    async fn update_note_fields(
        &self,
        note_id: i64,
        fields: &HashMap<String, String>,
    ) -> Result<(), AnkimorphError> {
        self.record(Call::UpdateNoteFields(note_id, fields.clone()));
        let mut notes = self.notes.lock().unwrap();
        if let Some(note) = notes.iter_mut().find(|n| n.note_id == note_id) {
            for (name, value) in fields {
                let order = note.fields.len() as u32;
                note.fields
                    .entry(name.clone())
                    .and_modify(|f| f.value = value.clone())
                    .or_insert_with(|| Field::new(value.clone(), order));
            }
        }
        Ok(())
    }

    async fn add_tags(&self, note_id: i64, tags: &str) -> Result<(), AnkimorphError> {
        self.record(Call::AddTags(note_id, tags.to_string()));
        if self.fail_tag.lock().unwrap().as_deref() == Some(tags) {
            return Err(AnkimorphError::BackendWrite {
                action: "addTags",
                message: "database is locked".to_string(),
            });
        }
        Ok(())
    }

    async fn gui_browse(&self, query: &str) -> Result<(), AnkimorphError> {
        self.record(Call::GuiBrowse(query.to_string()));
        Ok(())
    }

    async fn media_dir_path(&self) -> Result<PathBuf, AnkimorphError> {
        Ok(PathBuf::from("/tmp/collection.media"))
    }
}
