use std::path::Path;

use serde::{
    Deserialize,
    Serialize,
};
use tracing::info;

use crate::{
    core::AnkimorphError,
    notes::FieldNameConfig,
    persistence::{
        get_app_config_dir,
        load_json_in,
        save_json_in,
    },
};

pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub anki_url: String,
    pub page_size: usize,
    pub mining_query: String,
    /// Scope prepended to backend morph searches.
    pub search_query: String,
    pub morph_field_name: String,
    pub sentence_field_name: String,
    pub image_field_name: String,
    pub audio_field_name: String,
    pub known_tag: String,
    pub mining_image_field_name: String,
    pub mining_audio_field_name: String,
    pub play_audio_automatically: bool,
    pub brigada_api_key: String,
    pub prefetch_concurrency: usize,
    pub prefetch_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            anki_url: "http://localhost:8765".to_string(),
            page_size: 100,
            mining_query: "deck:ankimorph tag:1T -tag:MT".to_string(),
            search_query: String::new(),
            morph_field_name: "am-unknowns".to_string(),
            sentence_field_name: "Expression".to_string(),
            image_field_name: "Screenshot".to_string(),
            audio_field_name: "Audio_Sentence".to_string(),
            known_tag: "am-known-manually".to_string(),
            mining_image_field_name: "Picture".to_string(),
            mining_audio_field_name: "SentenceAudio".to_string(),
            play_audio_automatically: false,
            brigada_api_key: String::new(),
            prefetch_concurrency: 8,
            prefetch_timeout_secs: 15,
        }
    }
}

/// Editable keys, in the order the config form shows them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    AnkiUrl,
    PageSize,
    MiningQuery,
    SearchQuery,
    MorphFieldName,
    SentenceFieldName,
    ImageFieldName,
    AudioFieldName,
    KnownTag,
    MiningImageFieldName,
    MiningAudioFieldName,
    PlayAudioAutomatically,
    BrigadaApiKey,
    PrefetchConcurrency,
    PrefetchTimeoutSecs,
}

impl SettingKey {
    pub const ALL: [SettingKey; 15] = [
        SettingKey::AnkiUrl,
        SettingKey::PageSize,
        SettingKey::MiningQuery,
        SettingKey::SearchQuery,
        SettingKey::MorphFieldName,
        SettingKey::SentenceFieldName,
        SettingKey::ImageFieldName,
        SettingKey::AudioFieldName,
        SettingKey::KnownTag,
        SettingKey::MiningImageFieldName,
        SettingKey::MiningAudioFieldName,
        SettingKey::PlayAudioAutomatically,
        SettingKey::BrigadaApiKey,
        SettingKey::PrefetchConcurrency,
        SettingKey::PrefetchTimeoutSecs,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SettingKey::AnkiUrl => "AnkiConnect URL",
            SettingKey::PageSize => "Page size",
            SettingKey::MiningQuery => "Mining query",
            SettingKey::SearchQuery => "Morph search query",
            SettingKey::MorphFieldName => "Morph field",
            SettingKey::SentenceFieldName => "Sentence field",
            SettingKey::ImageFieldName => "Image field",
            SettingKey::AudioFieldName => "Audio field",
            SettingKey::KnownTag => "Known tag",
            SettingKey::MiningImageFieldName => "Mining image field",
            SettingKey::MiningAudioFieldName => "Mining audio field",
            SettingKey::PlayAudioAutomatically => "Play audio automatically",
            SettingKey::BrigadaApiKey => "BrigadaSOS API key",
            SettingKey::PrefetchConcurrency => "Prefetch concurrency",
            SettingKey::PrefetchTimeoutSecs => "Prefetch timeout (s)",
        }
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, SettingKey::BrigadaApiKey)
    }
}

impl Settings {
    /// Loads `settings.json` from the config directory, writing the
    /// defaults there on first run.
    pub fn load() -> Result<Self, AnkimorphError> {
        Self::load_from(&get_app_config_dir())
    }

    pub fn save(&self) -> Result<(), AnkimorphError> {
        self.save_to(&get_app_config_dir())
    }

    pub fn load_from(dir: &Path) -> Result<Self, AnkimorphError> {
        if !dir.join(SETTINGS_FILE).exists() {
            info!("No settings found, writing defaults");
            let settings = Settings::default();
            settings.save_to(dir)?;
            return Ok(settings);
        }
        load_json_in(dir, SETTINGS_FILE)
    }

    pub fn save_to(&self, dir: &Path) -> Result<(), AnkimorphError> {
        save_json_in(dir, self, SETTINGS_FILE)
    }

    pub fn field_names(&self) -> FieldNameConfig {
        FieldNameConfig::from_settings(self)
    }

    /// Mining query refined by the session's search bar text.
    pub fn effective_query(&self, search: &str) -> String {
        format!("{} {}", self.mining_query.trim(), search.trim()).trim().to_string()
    }

    pub fn value(&self, key: SettingKey) -> String {
        match key {
            SettingKey::AnkiUrl => self.anki_url.clone(),
            SettingKey::PageSize => self.page_size.to_string(),
            SettingKey::MiningQuery => self.mining_query.clone(),
            SettingKey::SearchQuery => self.search_query.clone(),
            SettingKey::MorphFieldName => self.morph_field_name.clone(),
            SettingKey::SentenceFieldName => self.sentence_field_name.clone(),
            SettingKey::ImageFieldName => self.image_field_name.clone(),
            SettingKey::AudioFieldName => self.audio_field_name.clone(),
            SettingKey::KnownTag => self.known_tag.clone(),
            SettingKey::MiningImageFieldName => self.mining_image_field_name.clone(),
            SettingKey::MiningAudioFieldName => self.mining_audio_field_name.clone(),
            SettingKey::PlayAudioAutomatically => self.play_audio_automatically.to_string(),
            SettingKey::BrigadaApiKey => self.brigada_api_key.clone(),
            SettingKey::PrefetchConcurrency => self.prefetch_concurrency.to_string(),
            SettingKey::PrefetchTimeoutSecs => self.prefetch_timeout_secs.to_string(),
        }
    }

    /// Parses `raw` into `key`. Numbers must be positive.
    pub fn set(&mut self, key: SettingKey, raw: &str) -> Result<(), AnkimorphError> {
        let raw = raw.trim();
        match key {
            SettingKey::AnkiUrl => self.anki_url = raw.to_string(),
            SettingKey::PageSize => self.page_size = parse_positive(key, raw)? as usize,
            SettingKey::MiningQuery => self.mining_query = raw.to_string(),
            SettingKey::SearchQuery => self.search_query = raw.to_string(),
            SettingKey::MorphFieldName => self.morph_field_name = raw.to_string(),
            SettingKey::SentenceFieldName => self.sentence_field_name = raw.to_string(),
            SettingKey::ImageFieldName => self.image_field_name = raw.to_string(),
            SettingKey::AudioFieldName => self.audio_field_name = raw.to_string(),
            SettingKey::KnownTag => self.known_tag = raw.to_string(),
            SettingKey::MiningImageFieldName => self.mining_image_field_name = raw.to_string(),
            SettingKey::MiningAudioFieldName => self.mining_audio_field_name = raw.to_string(),
            SettingKey::PlayAudioAutomatically => {
                self.play_audio_automatically = match raw.to_lowercase().as_str() {
                    "true" | "yes" | "y" | "1" | "on" => true,
                    "false" | "no" | "n" | "0" | "off" | "" => false,
                    _ => {
                        return Err(AnkimorphError::Custom(format!(
                            "{} expects yes or no, got '{}'",
                            key.label(),
                            raw
                        )))
                    }
                }
            }
            SettingKey::BrigadaApiKey => self.brigada_api_key = raw.to_string(),
            SettingKey::PrefetchConcurrency => {
                self.prefetch_concurrency = parse_positive(key, raw)? as usize
            }
            SettingKey::PrefetchTimeoutSecs => self.prefetch_timeout_secs = parse_positive(key, raw)?,
        }
        Ok(())
    }
}

fn parse_positive(key: SettingKey, raw: &str) -> Result<u64, AnkimorphError> {
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(AnkimorphError::Custom(format!(
            "{} expects a positive number, got '{}'",
            key.label(),
            raw
        ))),
    }
}
