//! Actions that write back to Anki: mining media onto the newest card,
//! marking notes as known and deleting them.

use std::{
    collections::HashMap,
    path::Path,
};

use tracing::info;

use crate::{
    anki::{
        last_added_note,
        AnkiApi,
    },
    core::{
        http,
        AnkimorphError,
    },
    notes::{
        media::{
            encode_audio_ref,
            encode_image_ref,
        },
        FieldNameConfig,
        MediaReference,
        MediaSlot,
        Note,
    },
};

/// Tags the exclude-known workflow puts on sentence cards. They describe the
/// source card's state and are never copied.
pub const SESSION_TAGS: [&str; 3] = ["1T", "MT", "0T"];

const DEFAULT_AUDIO_EXTENSION: &str = "mp3";
const DEFAULT_IMAGE_EXTENSION: &str = "webp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinedCard {
    pub note_id: i64,
    pub tags: Vec<String>,
}

pub fn transferable_tags(tags: &[String]) -> Vec<String> {
    tags.iter().filter(|tag| !SESSION_TAGS.contains(&tag.as_str())).cloned().collect()
}

/// Copies the audio and image of `note` onto the most recently added card,
/// then copies its tags.
///
/// Fails before any lookup or write when either slot is empty. A failed
/// write stops the sequence; earlier writes stay applied.
pub async fn mine_to_last_card(
    api: &dyn AnkiApi,
    client: &reqwest::Client,
    note: &Note,
    names: &FieldNameConfig,
    media_dir: &Path,
) -> Result<MinedCard, AnkimorphError> {
    let audio = note.audio_ref(names);
    if audio.is_empty() {
        return Err(AnkimorphError::MissingMedia(MediaSlot::Audio));
    }
    let image = note.image_ref(names);
    if image.is_empty() {
        return Err(AnkimorphError::MissingMedia(MediaSlot::Image));
    }

    let stem = note.media_stem.clone().unwrap_or_else(|| format!("ankimorph_{}", note.id));
    let audio = materialize(client, audio, MediaSlot::Audio, &stem, media_dir).await?;
    let image = materialize(client, image, MediaSlot::Image, &stem, media_dir).await?;

    let target = last_added_note(api).await?;
    let audio_field = names.mining_audio_target.pick_target(target.fields.keys());
    let image_field = names.mining_image_target.pick_target(target.fields.keys());
    let (Some(audio_field), Some(image_field)) = (audio_field, image_field) else {
        return Err(AnkimorphError::Custom("Mining field names are not configured".to_string()));
    };

    let mut fields = HashMap::new();
    fields.insert(audio_field.to_string(), encode_audio_ref(&audio));
    fields.insert(image_field.to_string(), encode_image_ref(&image));
    api.update_note_fields(target.note_id, &fields).await?;

    let tags = transferable_tags(&note.tags);
    for tag in &tags {
        api.add_tags(target.note_id, tag).await?;
    }

    info!("Mined note {} into card {}", note.id, target.note_id);
    Ok(MinedCard { note_id: target.note_id, tags })
}

/// File name inside the media folder holding the referenced media. Remote
/// media is downloaded there first.
async fn materialize(
    client: &reqwest::Client,
    reference: MediaReference,
    slot: MediaSlot,
    stem: &str,
    media_dir: &Path,
) -> Result<String, AnkimorphError> {
    match reference {
        MediaReference::Empty => Err(AnkimorphError::MissingMedia(slot)),
        MediaReference::Local(name) => Ok(name),
        MediaReference::Remote(url) => {
            let extension = match slot {
                MediaSlot::Audio => DEFAULT_AUDIO_EXTENSION,
                MediaSlot::Image => DEFAULT_IMAGE_EXTENSION,
            };
            let filename = format!("{}.{}", stem, extension);
            let bytes = http::fetch_bytes(client, &url).await?;
            tokio::fs::write(media_dir.join(&filename), bytes).await?;
            info!("Saved {} to the media folder", filename);
            Ok(filename)
        }
    }
}

/// Tags a backend note with the configured known tag. Provider notes are
/// left alone and `Ok(false)` is returned.
pub async fn mark_known(
    api: &dyn AnkiApi,
    note: &Note,
    names: &FieldNameConfig,
) -> Result<bool, AnkimorphError> {
    if !note.origin.is_backend() {
        return Ok(false);
    }
    if names.known_tag.is_empty() {
        return Err(AnkimorphError::Custom("Known tag is not configured".to_string()));
    }
    api.add_tags(note.id, &names.known_tag).await?;
    Ok(true)
}

/// Deletes a backend note from Anki. Provider notes only exist locally, so
/// nothing is sent and `Ok(false)` is returned.
pub async fn delete_note(api: &dyn AnkiApi, note: &Note) -> Result<bool, AnkimorphError> {
    if !note.origin.is_backend() {
        return Ok(false);
    }
    api.delete_notes(&[note.id]).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        anki::testing::{
            Call,
            MemoryAnki,
        },
        notes::{
            FieldList,
            ProviderKind,
            ResolvedFields,
        },
        sources::test_server::{
            Route,
            TestServer,
        },
    };

    fn names() -> FieldNameConfig {
        FieldNameConfig {
            sentence: FieldList::parse("Expression"),
            audio: FieldList::parse("Audio_Sentence"),
            image: FieldList::parse("Screenshot"),
            known_tag: "am-known-manually".to_string(),
            mining_audio_target: FieldList::parse("SentenceAudio"),
            mining_image_target: FieldList::parse("Picture,Image"),
            ..Default::default()
        }
    }

    fn source_note(audio: &str, image: &str) -> Note {
        Note::from_anki(MemoryAnki::note(
            5,
            &[("Expression", "猫だ"), ("Audio_Sentence", audio), ("Screenshot", image)],
            &["1T", "anime", "MT", "0T", "ghibli"],
        ))
    }

    fn anki() -> MemoryAnki {
        MemoryAnki::with_notes(vec![
            MemoryAnki::note(100, &[("Word", "猫"), ("Image", "")], &[]),
            MemoryAnki::note(300, &[("Word", "犬"), ("Image", "")], &[]),
        ])
    }

    #[test]
    fn test_session_tags_are_not_transferred() {
        let tags: Vec<String> = ["1T", "anime", "MT", "0T", "1t"].iter().map(|t| t.to_string()).collect();
        assert_eq!(transferable_tags(&tags), vec!["anime".to_string(), "1t".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_media_fails_before_any_call() {
        let anki = anki();
        let client = reqwest::Client::new();

        let err = mine_to_last_card(&anki, &client, &source_note("", ""), &names(), Path::new("/tmp"))
            .await
            .unwrap_err();
        assert!(matches!(err, AnkimorphError::MissingMedia(MediaSlot::Audio)));

        let err = mine_to_last_card(
            &anki,
            &client,
            &source_note("[sound:a.mp3]", "not markup"),
            &names(),
            Path::new("/tmp"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AnkimorphError::MissingMedia(MediaSlot::Image)));

        assert!(anki.calls().is_empty());
    }

    #[tokio::test]
    async fn test_mines_into_newest_card() {
        let anki = anki();
        let note = source_note("[sound:a.mp3]", "<img src=\"a.webp\">");

        let mined = mine_to_last_card(&anki, &reqwest::Client::new(), &note, &names(), Path::new("/tmp"))
            .await
            .unwrap();
        assert_eq!(mined.note_id, 300);

        let mut expected = HashMap::new();
        expected.insert("SentenceAudio".to_string(), "[sound:a.mp3]".to_string());
        expected.insert("Image".to_string(), "<img src=\"a.webp\">".to_string());
        assert_eq!(
            anki.writes(),
            vec![
                Call::UpdateNoteFields(300, expected),
                Call::AddTags(300, "anime".to_string()),
                Call::AddTags(300, "ghibli".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_tag_failure_stops_remaining_writes() {
        let anki = anki();
        *anki.fail_tag.lock().unwrap() = Some("anime".to_string());
        let note = source_note("[sound:a.mp3]", "<img src=\"a.webp\">");

        let err = mine_to_last_card(&anki, &reqwest::Client::new(), &note, &names(), Path::new("/tmp"))
            .await
            .unwrap_err();
        assert!(matches!(err, AnkimorphError::BackendWrite { action: "addTags", .. }));

        let writes = anki.writes();
        assert_eq!(writes.len(), 2);
        assert!(matches!(writes[0], Call::UpdateNoteFields(300, _)));
        assert!(!writes.contains(&Call::AddTags(300, "ghibli".to_string())));
    }

    #[tokio::test]
    async fn test_remote_media_is_downloaded_first() {
        let server = TestServer::start(vec![
            Route::ok("/clip.mp3", "audio/mpeg", b"ID3 audio".to_vec()),
            Route::ok("/shot.webp", "image/webp", b"RIFF image".to_vec()),
        ])
        .await;
        let media_dir = tempfile::tempdir().unwrap();
        let resolved = ResolvedFields {
            sentence: "行くぞ".to_string(),
            morphs: String::new(),
            audio: server.url("/clip.mp3"),
            image: server.url("/shot.webp"),
        };
        let note = Note::external(
            ProviderKind::BrigadaSos,
            0,
            resolved,
            vec!["進撃の巨人".to_string()],
            "Attack_on_Titan_0_01_0_02".to_string(),
        );
        let anki = anki();

        mine_to_last_card(&anki, &reqwest::Client::new(), &note, &names(), media_dir.path())
            .await
            .unwrap();

        let audio = std::fs::read(media_dir.path().join("Attack_on_Titan_0_01_0_02.mp3")).unwrap();
        assert_eq!(audio, b"ID3 audio");
        assert!(media_dir.path().join("Attack_on_Titan_0_01_0_02.webp").exists());

        let stored = anki.notes.lock().unwrap().iter().find(|n| n.note_id == 300).cloned().unwrap();
        assert_eq!(stored.fields["SentenceAudio"].value, "[sound:Attack_on_Titan_0_01_0_02.mp3]");
        assert_eq!(stored.fields["Image"].value, "<img src=\"Attack_on_Titan_0_01_0_02.webp\">");
        assert!(anki.writes().contains(&Call::AddTags(300, "進撃の巨人".to_string())));
    }

    #[tokio::test]
    async fn test_mark_known_and_delete() {
        let anki = anki();
        let note = source_note("", "");

        assert!(mark_known(&anki, &note, &names()).await.unwrap());
        assert!(delete_note(&anki, &note).await.unwrap());

        let external = Note::external(ProviderKind::BrigadaSos, 0, ResolvedFields::default(), vec![], "x".to_string());
        assert!(!mark_known(&anki, &external, &names()).await.unwrap());
        assert!(!delete_note(&anki, &external).await.unwrap());

        assert_eq!(
            anki.writes(),
            vec![Call::AddTags(5, "am-known-manually".to_string()), Call::DeleteNotes(vec![5])]
        );
    }
}
