use std::{
    collections::HashMap,
    fmt,
    path::Path,
    sync::{
        Arc,
        OnceLock,
    },
};

use image::DynamicImage;

use super::{
    fields::{
        FieldNameConfig,
        ResolvedFields,
    },
    media::{
        decode_audio_ref,
        decode_image_ref,
        MediaReference,
    },
};
use crate::{
    anki::types::{
        AnkiNote,
        Field,
    },
    core::{
        http,
        AnkimorphError,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    BrigadaSos,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::BrigadaSos => "BrigadaSOS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NoteOrigin {
    #[default]
    Backend,
    Provider(ProviderKind),
}

impl NoteOrigin {
    pub fn is_backend(&self) -> bool {
        matches!(self, NoteOrigin::Backend)
    }
}

impl fmt::Display for NoteOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteOrigin::Backend => write!(f, "Anki"),
            NoteOrigin::Provider(provider) => write!(f, "{}", provider.name()),
        }
    }
}

/// Identity that survives refetches. Provider notes are keyed by their media
/// locator because their numeric ids restart at 0 on every fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NoteKey {
    Backend(i64),
    Provider { provider: ProviderKind, locator: String },
}

/// One flashcard record, either from Anki or from an external provider.
#[derive(Debug, Clone)]
pub struct Note {
    pub id: i64,
    pub fields: HashMap<String, Field>,
    pub tags: Vec<String>,
    pub origin: NoteOrigin,
    /// Filename stem used when provider media is copied into the Anki media folder.
    pub media_stem: Option<String>,
    key: NoteKey,
    resolved: OnceLock<ResolvedFields>,
    image: OnceLock<Arc<DynamicImage>>,
}

impl Note {
    pub fn from_anki(note: AnkiNote) -> Self {
        Self {
            id: note.note_id,
            fields: note.fields,
            tags: dedup_tags(note.tags),
            origin: NoteOrigin::Backend,
            media_stem: None,
            key: NoteKey::Backend(note.note_id),
            resolved: OnceLock::new(),
            image: OnceLock::new(),
        }
    }

    /// Builds a provider note whose slots are already known.
    pub fn external(
        provider: ProviderKind,
        id: i64,
        resolved: ResolvedFields,
        tags: Vec<String>,
        media_stem: String,
    ) -> Self {
        let locator = if resolved.audio.is_empty() {
            format!("{}#{}", resolved.image, resolved.sentence)
        } else {
            resolved.audio.clone()
        };

        Self {
            id,
            fields: HashMap::new(),
            tags: dedup_tags(tags),
            origin: NoteOrigin::Provider(provider),
            media_stem: Some(media_stem),
            key: NoteKey::Provider { provider, locator },
            resolved: OnceLock::from(resolved),
            image: OnceLock::new(),
        }
    }

    pub fn key(&self) -> &NoteKey {
        &self.key
    }

    pub fn resolved(&self, names: &FieldNameConfig) -> &ResolvedFields {
        self.resolved.get_or_init(|| ResolvedFields::resolve_all(&self.fields, names))
    }

    pub fn sentence<'a>(&'a self, names: &FieldNameConfig) -> &'a str {
        &self.resolved(names).sentence
    }

    pub fn morphs<'a>(&'a self, names: &FieldNameConfig) -> &'a str {
        &self.resolved(names).morphs
    }

    pub fn audio_ref(&self, names: &FieldNameConfig) -> MediaReference {
        decode_audio_ref(&self.origin, &self.resolved(names).audio)
    }

    pub fn image_ref(&self, names: &FieldNameConfig) -> MediaReference {
        decode_image_ref(&self.origin, &self.resolved(names).image)
    }

    /// Image URL of a provider note, known without any field configuration.
    pub fn remote_image_url(&self) -> Option<String> {
        let resolved = self.resolved.get()?;
        match decode_image_ref(&self.origin, &resolved.image) {
            MediaReference::Remote(url) => Some(url),
            _ => None,
        }
    }

    pub fn cached_image(&self) -> Option<Arc<DynamicImage>> {
        self.image.get().cloned()
    }

    /// Stores a decoded image. The first stored image wins.
    pub fn cache_image(&self, image: Arc<DynamicImage>) -> Arc<DynamicImage> {
        self.image.get_or_init(|| image).clone()
    }

    /// Decodes the note image once and keeps it for the lifetime of the note.
    pub fn load_image(
        &self,
        names: &FieldNameConfig,
        media_dir: &Path,
    ) -> Result<Option<Arc<DynamicImage>>, AnkimorphError> {
        if let Some(image) = self.cached_image() {
            return Ok(Some(image));
        }

        let decoded = match self.image_ref(names) {
            MediaReference::Empty => return Ok(None),
            MediaReference::Local(name) => decode_image_file(&media_dir.join(name))?,
            MediaReference::Remote(url) => {
                let client = http::blocking_client()?;
                let bytes = http::get_bytes(&client, &url)?;
                image::load_from_memory(&bytes)?
            }
        };

        Ok(Some(self.cache_image(Arc::new(decoded))))
    }
}

pub fn decode_image_file(path: &Path) -> Result<DynamicImage, AnkimorphError> {
    let reader = image::ImageReader::open(path)
        .map_err(|e| AnkimorphError::MediaDecode(format!("Cannot open {:?}: {}", path, e)))?
        .with_guessed_format()
        .map_err(|e| AnkimorphError::MediaDecode(format!("Cannot read {:?}: {}", path, e)))?;
    Ok(reader.decode()?)
}

fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !unique.contains(&tag) {
            unique.push(tag);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::fields::FieldList;

    fn names() -> FieldNameConfig {
        FieldNameConfig {
            sentence: FieldList::parse("Expression"),
            morphs: FieldList::parse("am-unknowns"),
            audio: FieldList::parse("Audio_Sentence"),
            image: FieldList::parse("Screenshot"),
            ..Default::default()
        }
    }

    fn anki_note(id: i64, fields: &[(&str, &str)]) -> AnkiNote {
        AnkiNote {
            note_id: id,
            tags: vec!["1T".to_string(), "anime".to_string(), "1T".to_string()],
            fields: fields
                .iter()
                .enumerate()
                .map(|(i, (k, v))| (k.to_string(), Field::new(*v, i as u32)))
                .collect(),
            model_name: "Japanese sentences".to_string(),
        }
    }

    #[test]
    fn test_backend_note_resolves_and_memoizes() {
        let note = Note::from_anki(anki_note(
            7,
            &[
                ("Expression", "猫がいる"),
                ("am-unknowns", "猫"),
                ("Audio_Sentence", "[sound:neko.mp3]"),
                ("Screenshot", "<img src=\"neko.webp\">"),
            ],
        ));

        assert_eq!(note.key(), &NoteKey::Backend(7));
        assert_eq!(note.tags, vec!["1T".to_string(), "anime".to_string()]);
        assert_eq!(note.sentence(&names()), "猫がいる");
        assert_eq!(note.audio_ref(&names()), MediaReference::Local("neko.mp3".into()));
        assert_eq!(note.image_ref(&names()), MediaReference::Local("neko.webp".into()));

        // Resolution is cached per instance.
        let other_names = FieldNameConfig::default();
        assert_eq!(note.morphs(&other_names), "猫");
    }

    #[test]
    fn test_external_note_keeps_preset_fields() {
        let resolved = ResolvedFields {
            sentence: "行くぞ".to_string(),
            morphs: String::new(),
            audio: "https://cdn.example.org/a.mp3".to_string(),
            image: "https://cdn.example.org/a.webp".to_string(),
        };
        let note = Note::external(
            ProviderKind::BrigadaSos,
            0,
            resolved,
            vec!["作品".to_string()],
            "Show_0_00_01_000".to_string(),
        );

        assert_eq!(note.origin.to_string(), "BrigadaSOS");
        assert_eq!(note.sentence(&names()), "行くぞ");
        assert_eq!(
            note.audio_ref(&names()),
            MediaReference::Remote("https://cdn.example.org/a.mp3".into())
        );
        assert_eq!(
            note.key(),
            &NoteKey::Provider {
                provider: ProviderKind::BrigadaSos,
                locator: "https://cdn.example.org/a.mp3".to_string(),
            }
        );
    }

    #[test]
    fn test_load_image_without_reference_is_none() {
        let note = Note::from_anki(anki_note(1, &[("Expression", "文")]));
        let loaded = note.load_image(&names(), Path::new("/nonexistent")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_image_decodes_local_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        image::RgbImage::from_pixel(4, 4, image::Rgb([200, 10, 10])).save(&path).unwrap();

        let note = Note::from_anki(anki_note(2, &[("Screenshot", "<img src=\"shot.png\">")]));
        let first = note.load_image(&names(), dir.path()).unwrap().unwrap();
        std::fs::remove_file(&path).unwrap();
        let second = note.load_image(&names(), dir.path()).unwrap().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.width(), 4);
    }

    #[test]
    fn test_missing_local_image_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let note = Note::from_anki(anki_note(3, &[("Screenshot", "<img src=\"gone.png\">")]));
        let err = note.load_image(&names(), dir.path()).unwrap_err();
        assert!(matches!(err, AnkimorphError::MediaDecode(_)));
    }
}
