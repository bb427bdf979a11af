use std::collections::HashMap;

use serde::{
    Deserialize,
    Serialize,
};

use crate::core::AnkimorphError;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Field {
    pub value: String,
    pub order: u32,
}

impl Field {
    pub fn new(value: impl Into<String>, order: u32) -> Self {
        Self { value: value.into(), order }
    }
}

/// A note as returned by `notesInfo`. Ids that no longer exist come back as
/// `{}`, which deserializes with `note_id == 0`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnkiNote {
    #[serde(default)]
    pub note_id: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub fields: HashMap<String, Field>,
    #[serde(default)]
    pub model_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Turns a non-null `error` into an error value; a null result is `None`.
    pub fn into_result(self, action: &'static str) -> Result<Option<T>, AnkimorphError> {
        match self.error {
            Some(message) => Err(AnkimorphError::Backend { action, message }),
            None => Ok(self.result),
        }
    }
}
