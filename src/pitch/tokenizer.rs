use std::{
    fmt,
    path::Path,
};

use vibrato::Tokenizer;
use wana_kana::{
    ConvertJapanese,
    IsJapaneseStr,
};

use super::{
    dictionary::{
        ensure_dictionary,
        load_dictionary,
        ProgressCallback,
    },
    SEPARATOR,
};
use crate::core::AnkimorphError;

/// Katakana reading column of an IPADIC feature string.
const READING_FEATURE: usize = 7;

/// Turns sentences into katakana readings, one token per segment.
pub struct ReadingTokenizer {
    tokenizer: Tokenizer,
}

impl fmt::Debug for ReadingTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReadingTokenizer")
    }
}

impl ReadingTokenizer {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }

    pub fn load(dict_dir: &Path, progress_callback: Option<ProgressCallback>) -> Result<Self, AnkimorphError> {
        let dict_path = ensure_dictionary(dict_dir, progress_callback)?;
        let dict = load_dictionary(&dict_path)?;
        Ok(Self::new(Tokenizer::new(dict)))
    }

    /// Readings of every token, each followed by an ideographic space.
    pub fn readings(&self, sentence: &str) -> String {
        let input: String = sentence.chars().filter(|c| *c != ' ' && *c != SEPARATOR).collect();
        if input.is_empty() {
            return String::new();
        }

        let mut worker = self.tokenizer.new_worker();
        worker.reset_sentence(&input);
        worker.tokenize();

        let mut out = String::new();
        for token in worker.token_iter() {
            out.push_str(&reading_of(token.feature(), token.surface()));
            out.push(SEPARATOR);
        }
        out
    }
}

/// IPADIC reading of a token. Unknown words keep their surface, with kana
/// normalized to katakana.
pub fn reading_of(feature: &str, surface: &str) -> String {
    match feature.split(',').nth(READING_FEATURE) {
        Some(reading) if !reading.is_empty() && reading != "*" => reading.to_string(),
        _ if surface.is_kana() => surface.to_katakana(),
        _ => surface.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_column() {
        let feature = "名詞,一般,*,*,*,*,猫,ネコ,ネコ";
        assert_eq!(reading_of(feature, "猫"), "ネコ");
    }

    #[test]
    fn test_unknown_word_keeps_surface() {
        assert_eq!(reading_of("名詞,固有名詞,一般,*,*,*,*", "ジョン"), "ジョン");
        assert_eq!(reading_of("名詞,一般,*,*,*,*,*", "ぴょん"), "ピョン");
        assert_eq!(reading_of("記号,一般", "ABC"), "ABC");
    }
}
