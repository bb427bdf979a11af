use std::collections::HashMap;

use crate::{
    anki::types::Field,
    config::Settings,
};

/// Ordered candidate field names parsed from a comma separated config value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldList {
    candidates: Vec<String>,
}

impl FieldList {
    pub fn parse(raw: &str) -> Self {
        let candidates = raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        Self { candidates }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// First candidate present in `available`, falling back to the first candidate.
    pub fn pick_target<'k>(&self, available: impl IntoIterator<Item = &'k String>) -> Option<&str> {
        let available: Vec<&String> = available.into_iter().collect();
        self.candidates
            .iter()
            .find(|name| available.contains(name))
            .or_else(|| self.candidates.first())
            .map(String::as_str)
    }
}

impl From<&str> for FieldList {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

/// Candidate field names for every logical slot of a note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldNameConfig {
    pub sentence: FieldList,
    pub morphs: FieldList,
    pub audio: FieldList,
    pub image: FieldList,
    pub known_tag: String,
    pub mining_audio_target: FieldList,
    pub mining_image_target: FieldList,
}

impl FieldNameConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            sentence: FieldList::parse(&settings.sentence_field_name),
            morphs: FieldList::parse(&settings.morph_field_name),
            audio: FieldList::parse(&settings.audio_field_name),
            image: FieldList::parse(&settings.image_field_name),
            known_tag: settings.known_tag.trim().to_string(),
            mining_audio_target: FieldList::parse(&settings.mining_audio_field_name),
            mining_image_target: FieldList::parse(&settings.mining_image_field_name),
        }
    }
}

/// Returns the value of the first candidate that exists in `fields`.
///
/// A present but empty field still counts as found.
pub fn resolve<'a>(fields: &'a HashMap<String, Field>, candidates: &FieldList) -> Option<&'a str> {
    candidates
        .candidates()
        .iter()
        .find_map(|name| fields.get(name))
        .map(|field| field.value.as_str())
}

/// Slot values of a note, resolved once per note instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFields {
    pub sentence: String,
    pub morphs: String,
    pub audio: String,
    pub image: String,
}

impl ResolvedFields {
    pub fn resolve_all(fields: &HashMap<String, Field>, names: &FieldNameConfig) -> Self {
        let get = |list: &FieldList| resolve(fields, list).unwrap_or_default().to_string();
        Self {
            sentence: get(&names.sentence),
            morphs: get(&names.morphs),
            audio: get(&names.audio),
            image: get(&names.image),
        }
    }
}
