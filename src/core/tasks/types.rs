use std::sync::Arc;

use image::DynamicImage;

use crate::{
    core::AnkimorphError,
    mining::MinedCard,
    notes::{
        FetchTicket,
        Note,
        NoteKey,
    },
    pitch::ReadingTokenizer,
};

#[derive(Debug)]
pub enum TaskResult {
    Fetch { ticket: FetchTicket, result: Result<Vec<Note>, AnkimorphError> },

    Mined(Result<MinedCard, AnkimorphError>),
    MarkedKnown { note_id: i64, result: Result<bool, AnkimorphError> },
    Deleted { key: NoteKey, result: Result<bool, AnkimorphError> },
    Browsed(Result<(), AnkimorphError>),

    Played(Result<bool, AnkimorphError>),
    ImageLoaded { key: NoteKey, result: Result<Option<Arc<DynamicImage>>, AnkimorphError> },

    TokenizerLoaded(Result<Arc<ReadingTokenizer>, AnkimorphError>),
    LoadingMessage(String),
}

impl TaskResult {
    pub fn task_type(&self) -> &'static str {
        match self {
            TaskResult::Fetch { .. } => "fetch",
            TaskResult::Mined(_) => "mine",
            TaskResult::MarkedKnown { .. } => "mark_known",
            TaskResult::Deleted { .. } => "delete",
            TaskResult::Browsed(_) => "browse",
            TaskResult::Played(_) => "play",
            TaskResult::ImageLoaded { .. } => "image",
            TaskResult::TokenizerLoaded(_) => "tokenizer",
            TaskResult::LoadingMessage(_) => "loading_message",
        }
    }
}
