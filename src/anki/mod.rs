use std::{
    collections::HashMap,
    path::PathBuf,
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{
    info,
    warn,
};

use crate::core::AnkimorphError;

pub mod api;
#[cfg(test)]
pub(crate) mod testing;
pub mod types;

pub use api::AnkiConnect;
pub use types::{
    AnkiNote,
    Field,
};

/// Search matching notes added during the last two days; the newest one is the
/// card the user just created.
pub const RECENTLY_ADDED_QUERY: &str = "added:2";

/// The subset of the AnkiConnect API used by the application.
#[async_trait]
pub trait AnkiApi: Send + Sync {
    async fn find_notes(&self, query: &str) -> Result<Vec<i64>, AnkimorphError>;

    async fn notes_info(&self, note_ids: &[i64]) -> Result<Vec<AnkiNote>, AnkimorphError>;

    async fn delete_notes(&self, note_ids: &[i64]) -> Result<(), AnkimorphError>;

    async fn update_note_fields(
        &self,
        note_id: i64,
        fields: &HashMap<String, String>,
    ) -> Result<(), AnkimorphError>;

    async fn add_tags(&self, note_id: i64, tags: &str) -> Result<(), AnkimorphError>;

    /// Opens the Anki browser with `query`. Fire and forget.
    async fn gui_browse(&self, query: &str) -> Result<(), AnkimorphError>;

    async fn media_dir_path(&self) -> Result<PathBuf, AnkimorphError>;
}

/// Newest note among the recently added ones.
///
/// Best effort: a note added concurrently from elsewhere is
/// indistinguishable from the one the user just created.
pub async fn last_added_note(api: &dyn AnkiApi) -> Result<AnkiNote, AnkimorphError> {
    let newest = api
        .find_notes(RECENTLY_ADDED_QUERY)
        .await?
        .into_iter()
        .max()
        .ok_or_else(|| AnkimorphError::Custom("No recently added card found".to_string()))?;

    api.notes_info(&[newest])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AnkimorphError::Custom(format!("Note {} no longer exists", newest)))
}

pub fn browse_query(note_id: i64) -> String {
    format!("nid:{}", note_id)
}

pub async fn wait_awake(
    client: &AnkiConnect,
    wait_time: u64,
    max_attempts: u32,
) -> Result<u32, AnkimorphError> {
    let mut last_error = None;
    for attempt in 1..=max_attempts {
        match client.version().await {
            Ok(version) => {
                info!("AnkiConnect is online. Version: {}", version);
                return Ok(version);
            }
            Err(err) => {
                warn!(
                    "AnkiConnect attempt {} of {} failed. Retrying in {} seconds... Error: {}",
                    attempt, max_attempts, wait_time, err
                );
                last_error = Some(err);
                if attempt < max_attempts {
                    sleep(Duration::from_secs(wait_time)).await;
                }
            }
        }
    }
    Err(last_error.unwrap_or_else(|| {
        AnkimorphError::Custom(format!("AnkiConnect not reachable at {}", client.url()))
    }))
}
