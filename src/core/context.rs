use std::{
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use tracing::info;

use super::{
    http,
    AnkimorphError,
};
use crate::{
    anki::AnkiApi,
    config::Settings,
    notes::FieldNameConfig,
    sources::{
        BackendSource,
        BrigadaSource,
        PrefetchPolicy,
        SourceSet,
    },
};

const MEDIA_TIMEOUT: Duration = Duration::from_secs(60);

/// Everything the pages and background tasks share. Built once at startup
/// and rebuilt when settings are saved.
#[derive(Clone)]
pub struct AppContext {
    pub settings: Arc<Settings>,
    pub names: Arc<FieldNameConfig>,
    pub anki: Arc<dyn AnkiApi>,
    pub media_dir: PathBuf,
    pub sources: SourceSet,
    pub client: reqwest::Client,
}

impl AppContext {
    /// Registers the backend source, plus BrigadaSOS when an API key is set.
    pub fn new(settings: Settings, anki: Arc<dyn AnkiApi>, media_dir: PathBuf) -> Result<Self, AnkimorphError> {
        let mut sources = SourceSet::new(Arc::new(BackendSource::new(anki.clone())));
        if !settings.brigada_api_key.trim().is_empty() {
            let brigada = BrigadaSource::new(
                settings.brigada_api_key.trim(),
                PrefetchPolicy::from_settings(&settings),
            )?;
            sources = sources.with_external(Arc::new(brigada));
            info!("BrigadaSOS source registered");
        }

        Ok(Self {
            names: Arc::new(settings.field_names()),
            settings: Arc::new(settings),
            anki,
            media_dir,
            sources,
            client: http::async_client(MEDIA_TIMEOUT)?,
        })
    }

    /// Same backend and media folder, new settings.
    pub fn with_settings(&self, settings: Settings) -> Result<Self, AnkimorphError> {
        Self::new(settings, self.anki.clone(), self.media_dir.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anki::testing::MemoryAnki;

    #[test]
    fn test_external_source_needs_api_key() {
        let anki: Arc<dyn AnkiApi> = Arc::new(MemoryAnki::with_notes(Vec::new()));
        let context = AppContext::new(Settings::default(), anki, PathBuf::from("/media")).unwrap();
        assert!(!context.sources.has_external());

        let settings = Settings { brigada_api_key: "key".to_string(), ..Settings::default() };
        let context = context.with_settings(settings).unwrap();
        assert!(context.sources.has_external());
        assert_eq!(context.media_dir, PathBuf::from("/media"));
        assert_eq!(context.names.audio.candidates(), &["Audio_Sentence"]);
    }
}
