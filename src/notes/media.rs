//! Parsing and encoding of the media markup Anki stores inside note fields.
//!
//! Images are stored as `<img src="name.jpg">` and audio as `[sound:name.mp3]`.
//! Notes coming from external providers carry plain URLs instead.

use std::{
    fmt,
    path::{
        Path,
        PathBuf,
    },
};

use super::note::NoteOrigin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaSlot {
    Audio,
    Image,
}

impl fmt::Display for MediaSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaSlot::Audio => write!(f, "audio"),
            MediaSlot::Image => write!(f, "image"),
        }
    }
}

/// Pointer to a media file, either in the Anki media folder or on a remote host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MediaReference {
    #[default]
    Empty,
    Local(String),
    Remote(String),
}

impl MediaReference {
    pub fn is_empty(&self) -> bool {
        matches!(self, MediaReference::Empty)
    }

    /// Absolute path of a local reference inside `media_dir`.
    pub fn local_path(&self, media_dir: &Path) -> Option<PathBuf> {
        match self {
            MediaReference::Local(name) => Some(media_dir.join(name)),
            _ => None,
        }
    }
}

pub fn decode_image_ref(origin: &NoteOrigin, value: &str) -> MediaReference {
    decode_with(origin, value, parse_img_tag)
}

pub fn decode_audio_ref(origin: &NoteOrigin, value: &str) -> MediaReference {
    decode_with(origin, value, parse_sound_tag)
}

pub fn encode_image_ref(filename: &str) -> String {
    format!("<img src=\"{}\">", filename)
}

pub fn encode_audio_ref(filename: &str) -> String {
    format!("[sound:{}]", filename)
}

fn decode_with(
    origin: &NoteOrigin,
    value: &str,
    parse: fn(&str) -> Option<&str>,
) -> MediaReference {
    let value = value.trim();
    if value.is_empty() {
        return MediaReference::Empty;
    }

    match origin {
        NoteOrigin::Provider(_) => MediaReference::Remote(value.to_string()),
        NoteOrigin::Backend => match parse(value) {
            Some(name) if !name.trim().is_empty() => MediaReference::Local(name.to_string()),
            _ => MediaReference::Empty,
        },
    }
}

/// `[sound:NAME]`
fn parse_sound_tag(value: &str) -> Option<&str> {
    let inner = value.strip_prefix("[sound:")?.strip_suffix(']')?;
    if inner.contains(['[', ']']) {
        return None;
    }
    Some(inner)
}

/// `<img src="NAME">`, tolerating single quotes, bare values, extra
/// attributes, whitespace around `=` and a self-closing slash.
fn parse_img_tag(value: &str) -> Option<&str> {
    let head = value.get(..4)?;
    if !head.eq_ignore_ascii_case("<img") {
        return None;
    }
    let body = value[4..].strip_suffix('>')?;
    if !body.starts_with(char::is_whitespace) || body.contains(['<', '>']) {
        return None;
    }
    let body = body.trim_end().trim_end_matches('/');

    let mut rest = body;
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return None;
        }

        let name_end = rest.find(|c: char| c == '=' || c.is_whitespace()).unwrap_or(rest.len());
        let name = &rest[..name_end];
        rest = rest[name_end..].trim_start();

        let Some(after_eq) = rest.strip_prefix('=') else {
            // Attribute without a value, e.g. `<img hidden src=...>`
            continue;
        };
        let (attr_value, remainder) = split_attr_value(after_eq.trim_start())?;
        if name.eq_ignore_ascii_case("src") {
            return Some(attr_value);
        }
        rest = remainder;
    }
}

fn split_attr_value(input: &str) -> Option<(&str, &str)> {
    let mut chars = input.chars();
    match chars.next()? {
        quote @ ('"' | '\'') => {
            let inner = &input[1..];
            let end = inner.find(quote)?;
            Some((&inner[..end], &inner[end + 1..]))
        }
        _ => {
            let end = input.find(char::is_whitespace).unwrap_or(input.len());
            Some((&input[..end], &input[end..]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::note::ProviderKind;

    fn local(name: &str) -> MediaReference {
        MediaReference::Local(name.to_string())
    }

    #[test]
    fn test_decode_image_markup() {
        let backend = NoteOrigin::Backend;
        assert_eq!(decode_image_ref(&backend, "<img src=\"shot.webp\">"), local("shot.webp"));
        assert_eq!(decode_image_ref(&backend, "<img src='shot.jpg' />"), local("shot.jpg"));
        assert_eq!(decode_image_ref(&backend, "<IMG  src = \"a b.png\" >"), local("a b.png"));
        assert_eq!(
            decode_image_ref(&backend, "<img class=\"x\" src=\"shot.png\" alt=\"\">"),
            local("shot.png")
        );
        assert_eq!(decode_image_ref(&backend, "<img src=bare.png>"), local("bare.png"));
    }

    #[test]
    fn test_decode_image_rejects_other_shapes() {
        let backend = NoteOrigin::Backend;
        assert_eq!(decode_image_ref(&backend, ""), MediaReference::Empty);
        assert_eq!(decode_image_ref(&backend, "shot.png"), MediaReference::Empty);
        assert_eq!(decode_image_ref(&backend, "<img src=\"\">"), MediaReference::Empty);
        assert_eq!(decode_image_ref(&backend, "<imgsrc=\"a.png\">"), MediaReference::Empty);
        assert_eq!(decode_image_ref(&backend, "<img alt=\"a.png\">"), MediaReference::Empty);
        assert_eq!(decode_image_ref(&backend, "<img src=\"a.png\"><br>"), MediaReference::Empty);
    }

    #[test]
    fn test_decode_audio_markup() {
        let backend = NoteOrigin::Backend;
        assert_eq!(decode_audio_ref(&backend, "[sound:line_01.mp3]"), local("line_01.mp3"));
        assert_eq!(decode_audio_ref(&backend, "  [sound:x.ogg] "), local("x.ogg"));
        assert_eq!(decode_audio_ref(&backend, "[sound:]"), MediaReference::Empty);
        assert_eq!(decode_audio_ref(&backend, "sound:x.mp3"), MediaReference::Empty);
        assert_eq!(decode_audio_ref(&backend, "[sound:a.mp3][sound:b.mp3]"), MediaReference::Empty);
    }

    #[test]
    fn test_external_values_are_remote_urls() {
        let origin = NoteOrigin::Provider(ProviderKind::BrigadaSos);
        let url = "https://cdn.example.org/media/anime/clip.mp3";
        assert_eq!(decode_audio_ref(&origin, url), MediaReference::Remote(url.to_string()));
        assert_eq!(decode_image_ref(&origin, url), MediaReference::Remote(url.to_string()));
        assert_eq!(decode_image_ref(&origin, ""), MediaReference::Empty);
    }

    #[test]
    fn test_encode_round_trip() {
        let backend = NoteOrigin::Backend;
        for name in ["a.png", "Show_00_01_02_5.webp", "猫 の 写真.jpg", "x"] {
            assert_eq!(decode_image_ref(&backend, &encode_image_ref(name)), local(name));
            assert_eq!(decode_audio_ref(&backend, &encode_audio_ref(name)), local(name));
        }
    }

    #[test]
    fn test_local_path_joins_media_dir() {
        let dir = Path::new("/home/user/Anki2/User 1/collection.media");
        assert_eq!(local("a.mp3").local_path(dir), Some(dir.join("a.mp3")));
        assert_eq!(MediaReference::Remote("https://x".into()).local_path(dir), None);
    }
}
