use std::{
    sync::Arc,
    time::Duration,
};

use image::DynamicImage;
use tokio::{
    sync::Semaphore,
    task,
    time::timeout,
};
use tracing::{
    debug,
    warn,
};

use crate::{
    config::Settings,
    core::{
        http,
        AnkimorphError,
    },
    notes::Note,
};

/// Limits for eager image downloads of provider notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchPolicy {
    pub concurrency: usize,
    pub timeout: Duration,
}

impl Default for PrefetchPolicy {
    fn default() -> Self {
        Self { concurrency: 8, timeout: Duration::from_secs(15) }
    }
}

impl PrefetchPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            concurrency: settings.prefetch_concurrency.max(1),
            timeout: Duration::from_secs(settings.prefetch_timeout_secs.max(1)),
        }
    }
}

/// Downloads and decodes the image of every provider note, one task per note
/// and at most `policy.concurrency` at once. Waits for all of them.
///
/// Failures only leave the note without a cached image. Returns the number
/// of images cached.
pub async fn prefetch_images(client: &reqwest::Client, notes: &[Note], policy: PrefetchPolicy) -> usize {
    let semaphore = Arc::new(Semaphore::new(policy.concurrency.max(1)));

    let handles: Vec<_> = notes
        .iter()
        .enumerate()
        .filter_map(|(index, note)| note.remote_image_url().map(|url| (index, url)))
        .map(|(index, url)| {
            let client = client.clone();
            let semaphore = semaphore.clone();
            task::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| AnkimorphError::Custom(e.to_string()))?;
                let image = timeout(policy.timeout, download_image(&client, &url))
                    .await
                    .map_err(|_| AnkimorphError::MediaDecode(format!("Timed out fetching {}", url)))??;
                Ok::<_, AnkimorphError>((index, image))
            })
        })
        .collect();

    let mut cached = 0;
    for result in futures::future::join_all(handles).await {
        match result {
            Ok(Ok((index, image))) => {
                notes[index].cache_image(Arc::new(image));
                cached += 1;
            }
            Ok(Err(err)) => warn!("Image prefetch failed: {}", err),
            Err(err) => warn!("Image prefetch task panicked: {}", err),
        }
    }

    debug!("Prefetched {} of {} images", cached, notes.len());
    cached
}

async fn download_image(client: &reqwest::Client, url: &str) -> Result<DynamicImage, AnkimorphError> {
    let bytes = http::fetch_bytes(client, url).await?;
    task::spawn_blocking(move || image::load_from_memory(&bytes))
        .await
        .map_err(|e| AnkimorphError::MediaDecode(e.to_string()))?
        .map_err(AnkimorphError::from)
}
