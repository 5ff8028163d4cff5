use crate::text::normalize::TextNormalizer;

/// Languages whose romanization benefits from an explicit language hint.
/// Their romanized output goes through [`normalize_romanized`] instead of the
/// rule table.
pub const LANGUAGE_HINTED: &[&str] = &[
    "ara", "bel", "bul", "deu", "ell", "eng", "fas", "grc", "heb", "kaz", "kir", "lav", "lit",
    "mkd", "mkd2", "oss", "pnt", "pus", "rus", "srp", "srp2", "tur", "uig", "ukr", "yid",
];

/// Transliteration seam; implementations typically wrap an external
/// romanizer (uroman or similar).
pub trait Romanizer: Send + Sync {
    fn romanize(&self, text: &str, lang_hint: Option<&str>) -> String;
}

/// Leaves text untouched, for corpora already in a Latin script.
pub struct PassthroughRomanizer;

impl Romanizer for PassthroughRomanizer {
    fn romanize(&self, text: &str, _lang_hint: Option<&str>) -> String {
        text.to_string()
    }
}

/// Lower-cases and keeps only `a-z`, apostrophe and space.
pub fn normalize_romanized(text: &str) -> String {
    let lowered = text.to_lowercase();
    let kept: String = lowered
        .chars()
        .map(|c| match c {
            'a'..='z' | '\'' | ' ' => c,
            _ => ' ',
        })
        .collect();
    kept.split(' ')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turns a raw verse into the text that is tokenized for alignment.
pub struct VersePreprocessor {
    normalizer: TextNormalizer,
    romanizer: Box<dyn Romanizer>,
}

impl VersePreprocessor {
    pub fn new(normalizer: TextNormalizer, romanizer: Box<dyn Romanizer>) -> Self {
        Self {
            normalizer,
            romanizer,
        }
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    pub fn preprocess(&self, text: &str, lang: &str) -> String {
        if LANGUAGE_HINTED.contains(&lang) {
            let romanized = self.romanizer.romanize(text, Some(lang));
            normalize_romanized(&romanized)
        } else {
            let romanized = self.romanizer.romanize(text, None);
            self.normalizer.normalize(&romanized, lang)
        }
    }
}
