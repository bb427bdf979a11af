use thiserror::Error;

use crate::notes::MediaSlot;

#[derive(Error, Debug)]
pub enum AnkimorphError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(Box<reqwest::Error>),

    #[error("Vibrato error: {0}")]
    Vibrato(Box<vibrato::errors::VibratoError>),

    #[error("AnkiConnect {action} failed: {message}")]
    Backend { action: &'static str, message: String },

    #[error("Failed to fetch notes from {source_name}: {message}")]
    SourceFetch { source_name: String, message: String },

    #[error("Media error: {0}")]
    MediaDecode(String),

    #[error("No {0} found for this note, check the field names in the config")]
    MissingMedia(MediaSlot),

    #[error("Could not write to Anki ({action}): {message}")]
    BackendWrite { action: &'static str, message: String },

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("AnkimorphError: {0}")]
    Custom(String),
}

impl AnkimorphError {
    /// Reclassifies a failed request as a fetch failure of the named source.
    pub fn into_fetch_error(self, source_name: &str) -> Self {
        match self {
            fetch @ AnkimorphError::SourceFetch { .. } => fetch,
            other => AnkimorphError::SourceFetch {
                source_name: source_name.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Reclassifies a failed request as a write failure for `action`.
    pub fn into_write_error(self, action: &'static str) -> Self {
        match self {
            write @ AnkimorphError::BackendWrite { .. } => write,
            AnkimorphError::Backend { message, .. } => {
                AnkimorphError::BackendWrite { action, message }
            }
            other => AnkimorphError::BackendWrite { action, message: other.to_string() },
        }
    }
}

impl From<std::io::Error> for AnkimorphError {
    fn from(error: std::io::Error) -> Self {
        AnkimorphError::Io(Box::new(error))
    }
}

impl From<reqwest::Error> for AnkimorphError {
    fn from(error: reqwest::Error) -> Self {
        AnkimorphError::Reqwest(Box::new(error))
    }
}

impl From<vibrato::errors::VibratoError> for AnkimorphError {
    fn from(error: vibrato::errors::VibratoError) -> Self {
        AnkimorphError::Vibrato(Box::new(error))
    }
}

impl From<image::ImageError> for AnkimorphError {
    fn from(error: image::ImageError) -> Self {
        AnkimorphError::MediaDecode(error.to_string())
    }
}
