use std::{
    collections::HashMap,
    path::PathBuf,
    time::Duration,
};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{
    types::{
        AnkiNote,
        ApiResponse,
    },
    AnkiApi,
};
use crate::core::AnkimorphError;

const API_VERSION: u32 = 6;

/// HTTP client for the AnkiConnect add-on.
#[derive(Debug, Clone)]
pub struct AnkiConnect {
    url: String,
    client: Client,
}

impl AnkiConnect {
    pub fn new(url: impl Into<String>) -> Result<Self, AnkimorphError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { url: url.into(), client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn make_request<T: for<'de> Deserialize<'de>>(
        &self,
        action: &'static str,
        params: Option<serde_json::Value>,
    ) -> Result<ApiResponse<T>, AnkimorphError> {
        let mut body = serde_json::Map::new();
        body.insert("action".to_string(), serde_json::Value::String(action.to_string()));
        body.insert("version".to_string(), serde_json::Value::Number(API_VERSION.into()));

        if let Some(params) = params {
            body.insert("params".to_string(), params);
        }

        debug!(action, "AnkiConnect request");
        let response: ApiResponse<T> =
            self.client.post(&self.url).json(&body).send().await?.json().await?;

        Ok(response)
    }

    /// Requests whose result is not used; only the `error` member matters.
    async fn command(
        &self,
        action: &'static str,
        params: serde_json::Value,
    ) -> Result<(), AnkimorphError> {
        let response: ApiResponse<serde_json::Value> =
            self.make_request(action, Some(params)).await?;
        response.into_result(action)?;
        Ok(())
    }

    //Used to check if ankiconnect is online
    pub async fn version(&self) -> Result<u32, AnkimorphError> {
        let response: ApiResponse<u32> = self.make_request("version", None).await?;
        Ok(response.into_result("version")?.unwrap_or_default())
    }
}

#[async_trait]
impl AnkiApi for AnkiConnect {
    async fn find_notes(&self, query: &str) -> Result<Vec<i64>, AnkimorphError> {
        let params = serde_json::json!({ "query": query });
        let response: ApiResponse<Vec<i64>> = self.make_request("findNotes", Some(params)).await?;
        Ok(response.into_result("findNotes")?.unwrap_or_default())
    }

    async fn notes_info(&self, note_ids: &[i64]) -> Result<Vec<AnkiNote>, AnkimorphError> {
        if note_ids.is_empty() {
            return Ok(Vec::new());
        }
        let params = serde_json::json!({ "notes": note_ids });
        let response: ApiResponse<Vec<AnkiNote>> =
            self.make_request("notesInfo", Some(params)).await?;
        Ok(response
            .into_result("notesInfo")?
            .unwrap_or_default()
            .into_iter()
            .filter(|note| note.note_id != 0)
            .collect())
    }

    async fn delete_notes(&self, note_ids: &[i64]) -> Result<(), AnkimorphError> {
        self.command("deleteNotes", serde_json::json!({ "notes": note_ids }))
            .await
            .map_err(|e| e.into_write_error("deleteNotes"))
    }

    async fn update_note_fields(
        &self,
        note_id: i64,
        fields: &HashMap<String, String>,
    ) -> Result<(), AnkimorphError> {
        let params = serde_json::json!({ "note": { "id": note_id, "fields": fields } });
        self.command("updateNoteFields", params)
            .await
            .map_err(|e| e.into_write_error("updateNoteFields"))
    }

    async fn add_tags(&self, note_id: i64, tags: &str) -> Result<(), AnkimorphError> {
        let params = serde_json::json!({ "notes": [note_id], "tags": tags });
        self.command("addTags", params).await.map_err(|e| e.into_write_error("addTags"))
    }

    async fn gui_browse(&self, query: &str) -> Result<(), AnkimorphError> {
        self.command("guiBrowse", serde_json::json!({ "query": query })).await
    }

    async fn media_dir_path(&self) -> Result<PathBuf, AnkimorphError> {
        let response: ApiResponse<String> =
            self.make_request("getMediaDirPath", Some(serde_json::json!({}))).await?;
        response
            .into_result("getMediaDirPath")?
            .map(PathBuf::from)
            .ok_or_else(|| AnkimorphError::Backend {
                action: "getMediaDirPath",
                message: "empty media directory path".to_string(),
            })
    }
}
