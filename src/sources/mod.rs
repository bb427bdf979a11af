use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    core::AnkimorphError,
    notes::Note,
};

pub mod backend;
pub mod brigada;
pub mod prefetch;
#[cfg(test)]
pub(crate) mod test_server;

pub use backend::BackendSource;
pub use brigada::BrigadaSource;
pub use prefetch::PrefetchPolicy;

/// Anything that can return a page of notes for a query.
///
/// `start` and `end` are inclusive offsets into the full result set, so
/// `end - start + 1` notes are requested. Sources may return fewer.
#[async_trait]
pub trait NoteSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_page(
        &self,
        query: &str,
        start: usize,
        end: usize,
    ) -> Result<Vec<Note>, AnkimorphError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTarget {
    Backend,
    External,
}

/// The backend plus every registered external provider.
#[derive(Clone)]
pub struct SourceSet {
    backend: Arc<dyn NoteSource>,
    external: Vec<Arc<dyn NoteSource>>,
}

impl SourceSet {
    pub fn new(backend: Arc<dyn NoteSource>) -> Self {
        Self { backend, external: Vec::new() }
    }

    pub fn with_external(mut self, source: Arc<dyn NoteSource>) -> Self {
        self.external.push(source);
        self
    }

    pub fn has_external(&self) -> bool {
        !self.external.is_empty()
    }

    pub async fn fetch(
        &self,
        target: FetchTarget,
        query: &str,
        start: usize,
        end: usize,
    ) -> Result<Vec<Note>, AnkimorphError> {
        match target {
            FetchTarget::Backend => self.backend.fetch_page(query, start, end).await,
            FetchTarget::External => self.fetch_external(query, start, end).await,
        }
    }

    /// Queries providers in registration order and concatenates their pages.
    async fn fetch_external(
        &self,
        query: &str,
        start: usize,
        end: usize,
    ) -> Result<Vec<Note>, AnkimorphError> {
        if self.external.is_empty() {
            return Err(AnkimorphError::SourceFetch {
                source_name: "external".to_string(),
                message: "no external source is configured".to_string(),
            });
        }

        let mut notes = Vec::new();
        for source in &self.external {
            let page = source.fetch_page(query, start, end).await?;
            debug!("{} returned {} notes for {:?}", source.name(), page.len(), query);
            notes.extend(page);
        }
        Ok(notes)
    }
}
