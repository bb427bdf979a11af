use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{
    debug,
    info,
};

use super::{
    prefetch::{
        prefetch_images,
        PrefetchPolicy,
    },
    NoteSource,
};
use crate::{
    core::AnkimorphError,
    notes::{
        Note,
        ProviderKind,
        ResolvedFields,
    },
};

pub const BRIGADA_ENDPOINT: &str = "https://api.brigadasos.xyz/api/v1/api/search/anime/sentence";

/// Sentence search of the BrigadaSOS anime corpus.
pub struct BrigadaSource {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    prefetch: PrefetchPolicy,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    sentences: Vec<Sentence>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Sentence {
    basic_info: BasicInfo,
    segment_info: SegmentInfo,
    media_info: MediaInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BasicInfo {
    name_anime_jp: String,
    name_anime_en: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SegmentInfo {
    content_jp: String,
    start_time: String,
    end_time: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MediaInfo {
    path_image: String,
    path_audio: String,
}

impl BrigadaSource {
    pub fn new(api_key: impl Into<String>, prefetch: PrefetchPolicy) -> Result<Self, AnkimorphError> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client, endpoint: BRIGADA_ENDPOINT.to_string(), api_key: api_key.into(), prefetch })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn search(&self, query: &str, limit: usize) -> Result<SearchResponse, AnkimorphError> {
        let body = serde_json::json!({
            "query": query,
            "exact_match": 0,
            "limit": limit,
            "content_sort": null,
            "random_seed": null,
            "season": null,
            "episode": null,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AnkimorphError::Custom(format!("HTTP error {}", response.status())));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl NoteSource for BrigadaSource {
    fn name(&self) -> &str {
        ProviderKind::BrigadaSos.name()
    }

    /// The provider has no offset parameter; only the page length is sent.
    async fn fetch_page(
        &self,
        query: &str,
        start: usize,
        end: usize,
    ) -> Result<Vec<Note>, AnkimorphError> {
        let limit = end.saturating_sub(start) + 1;
        let response =
            self.search(query, limit).await.map_err(|e| e.into_fetch_error(self.name()))?;

        let notes = notes_from_response(response);
        info!("{} returned {} sentences for {:?}", self.name(), notes.len(), query);

        let cached = prefetch_images(&self.client, &notes, self.prefetch).await;
        debug!("{} images ready", cached);
        Ok(notes)
    }
}

fn notes_from_response(response: SearchResponse) -> Vec<Note> {
    response
        .sentences
        .into_iter()
        .enumerate()
        .map(|(index, sentence)| {
            let stem = media_stem(
                &sentence.basic_info.name_anime_en,
                &sentence.segment_info.start_time,
                &sentence.segment_info.end_time,
            );
            let mut tags = vec![sentence.basic_info.name_anime_jp];
            tags.retain(|tag| !tag.is_empty());

            let resolved = ResolvedFields {
                sentence: sentence.segment_info.content_jp,
                morphs: String::new(),
                audio: sentence.media_info.path_audio,
                image: sentence.media_info.path_image,
            };
            Note::external(ProviderKind::BrigadaSos, index as i64, resolved, tags, stem)
        })
        .collect()
}

/// File name stem for media copied into the Anki media folder, built from
/// the English title and the segment's time codes.
pub fn media_stem(title_en: &str, start_time: &str, end_time: &str) -> String {
    let title: String = title_en
        .chars()
        .filter_map(|c| match c {
            ' ' | ':' => Some('_'),
            '/' | '\'' | '!' | '?' | '.' | ',' | '(' | ')' | '\\' => None,
            other => Some(other),
        })
        .collect();
    let time = |t: &str| t.replace([':', '.'], "_");
    format!("{}_{}_{}", title, time(start_time), time(end_time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        notes::{
            FieldNameConfig,
            MediaReference,
        },
        sources::test_server::{
            png_bytes,
            Route,
            TestServer,
        },
    };

    fn response_json(image_url: &str) -> Vec<u8> {
        serde_json::json!({
            "sentences": [
                {
                    "basic_info": { "name_anime_jp": "進撃の巨人", "name_anime_en": "Attack on Titan" },
                    "segment_info": {
                        "content_jp": "心臓を捧げよ",
                        "is_nsfw": false,
                        "actor_ja": "梶裕貴",
                        "actor_en": "Yuki Kaji",
                        "actor_es": "",
                        "start_time": "0:01:02.500",
                        "end_time": "0:01:04.000"
                    },
                    "media_info": {
                        "path_image": image_url,
                        "path_audio": "https://cdn.example.org/a.mp3",
                        "path_video": "https://cdn.example.org/a.mp4"
                    }
                },
                {
                    "basic_info": { "name_anime_jp": "", "name_anime_en": "K-On!" },
                    "segment_info": { "content_jp": "けいおん", "start_time": "0:00:01", "end_time": "0:00:02" },
                    "media_info": { "path_audio": "https://cdn.example.org/b.mp3" }
                }
            ]
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_media_stem_sanitizes_title_and_times() {
        assert_eq!(
            media_stem("Re:Zero (Season 2), Part 1!", "0:01:02.500", "0:01:04.000"),
            "Re_Zero_Season_2_Part_1_0_01_02_500_0_01_04_000"
        );
        assert_eq!(media_stem("Mob Psycho 100", "1", "2"), "Mob_Psycho_100_1_2");
    }

    #[tokio::test]
    async fn test_fetch_page_posts_query_and_maps_sentences() {
        let media = TestServer::start(vec![Route::ok("/image.png", "image/png", png_bytes(4, 3))]).await;
        let server = TestServer::start(vec![Route::ok(
            "/search",
            "application/json",
            response_json(&media.url("/image.png")),
        )])
        .await;

        let source = BrigadaSource::new("secret", PrefetchPolicy::default())
            .unwrap()
            .with_endpoint(server.url("/search"));
        let notes = source.fetch_page("心臓", 10, 14).await.unwrap();

        assert_eq!(notes.len(), 2);
        let names = FieldNameConfig::default();
        assert_eq!(notes[0].sentence(&names), "心臓を捧げよ");
        assert_eq!(notes[0].tags, vec!["進撃の巨人".to_string()]);
        assert_eq!(notes[0].media_stem.as_deref(), Some("Attack_on_Titan_0_01_02_500_0_01_04_000"));
        assert_eq!(notes[0].audio_ref(&names), MediaReference::Remote("https://cdn.example.org/a.mp3".into()));
        assert_eq!(notes[0].cached_image().unwrap().height(), 3);
        assert_eq!(notes[1].id, 1);
        assert!(notes[1].tags.is_empty());
        assert!(notes[1].image_ref(&names).is_empty());

        let request = server.requests().into_iter().next().unwrap();
        assert_eq!(request.path, "/search");
        assert_eq!(request.method, "POST");
        assert_eq!(request.header("x-api-key"), Some("secret"));
        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["query"], "心臓");
        assert_eq!(body["limit"], 5);
        assert_eq!(body["exact_match"], 0);
        assert!(body["season"].is_null());
    }

    #[tokio::test]
    async fn test_http_error_is_fetch_error() {
        let server = TestServer::start(vec![]).await;
        let source = BrigadaSource::new("secret", PrefetchPolicy::default())
            .unwrap()
            .with_endpoint(server.url("/search"));

        let err = source.fetch_page("猫", 0, 9).await.unwrap_err();
        match err {
            AnkimorphError::SourceFetch { source_name, .. } => assert_eq!(source_name, "BrigadaSOS"),
            other => panic!("Expected SourceFetch, got {:?}", other),
        }
    }
}
