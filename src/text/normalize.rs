use deunicode::deunicode_with_tofu;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::AlignmentError;
use crate::text::norm_config::{CharSet, NormalizationConfig, NormalizationTable, UnicodeForm};
use crate::text::WILDCARD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub lower_case: bool,
    pub remove_numbers: bool,
    pub remove_brackets: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            lower_case: true,
            remove_numbers: true,
            remove_brackets: false,
        }
    }
}

/// Rule-driven verse cleanup; see [`NormalizationTable`] for the rules.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    table: NormalizationTable,
    bracket_with_digit: Regex,
    any_bracket: Regex,
}

impl TextNormalizer {
    pub fn new(table: NormalizationTable) -> Result<Self, AlignmentError> {
        Ok(Self {
            table,
            bracket_with_digit: compile(r"\([^)]*\d[^)]*\)")?,
            any_bracket: compile(r"\([^)]*\)")?,
        })
    }

    pub fn builtin() -> Result<Self, AlignmentError> {
        Self::new(NormalizationTable::builtin()?)
    }

    pub fn table(&self) -> &NormalizationTable {
        &self.table
    }

    pub fn normalize(&self, text: &str, lang: &str) -> String {
        self.normalize_with(text, lang, NormalizeOptions::default())
    }

    pub fn normalize_with(&self, text: &str, lang: &str, options: NormalizeOptions) -> String {
        let config = self.table.resolve(lang);

        let mut text = self.clean(&unicode_normalize(text, config.unicode_norm), config, options);

        // Transliteration can yield new punctuation or digits, so the
        // cleanup runs again on its ASCII output.
        if config.strip_diacritics {
            text = self.clean(&transliterate(&text), config, options);
        }

        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn clean(&self, text: &str, config: &NormalizationConfig, options: NormalizeOptions) -> String {
        let mut text = text.to_string();

        if config.lower_case && options.lower_case {
            text = text.to_lowercase();
        }

        // Parenthesized spans with digits are cross references such as "(2 Sam 23:17)".
        text = self.bracket_with_digit.replace_all(&text, " ").into_owned();
        if options.remove_brackets {
            text = self.any_bracket.replace_all(&text, " ").into_owned();
        }

        for substitution in &config.mapping {
            text = substitution
                .pattern
                .replace_all(&text, substitution.replacement.as_str())
                .into_owned();
        }

        text = apply_char_sets(&text, config);

        if options.remove_numbers {
            text = replace_digit_tokens(&text, &config.digits);
        }
        text
    }
}

fn compile(pattern: &str) -> Result<Regex, AlignmentError> {
    Regex::new(pattern)
        .map_err(|e| AlignmentError::config(format!("pattern {pattern:?} is malformed: {e}")))
}

fn unicode_normalize(text: &str, form: UnicodeForm) -> String {
    match form {
        UnicodeForm::Nfc => text.nfc().collect(),
        UnicodeForm::Nfd => text.nfd().collect(),
        UnicodeForm::Nfkc => text.nfkc().collect(),
        UnicodeForm::Nfkd => text.nfkd().collect(),
    }
}

/// Punctuation becomes a space; delete-set characters vanish.
fn apply_char_sets(text: &str, config: &NormalizationConfig) -> String {
    text.chars()
        .map(|c| if config.punctuation.contains(c) { ' ' } else { c })
        .filter(|&c| !config.delete.contains(c))
        .collect()
}

/// Replaces whitespace-delimited all-digit tokens with the wildcard.
///
/// A run only qualifies when it touches whitespace on at least one side, so a
/// text that is nothing but one digit run is returned unchanged.
fn replace_digit_tokens(text: &str, digits: &CharSet) -> String {
    let is_digit_token =
        |token: &str| !token.is_empty() && token.chars().all(|c| digits.contains(c));
    if is_digit_token(text) {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let push_token = |out: &mut String, token: &str| {
        if is_digit_token(token) {
            out.push(WILDCARD);
        } else {
            out.push_str(token);
        }
    };

    let mut token_start: Option<usize> = None;
    for (idx, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(start) = token_start.take() {
                push_token(&mut out, &text[start..idx]);
            }
            out.push(c);
        } else if token_start.is_none() {
            token_start = Some(idx);
        }
    }
    if let Some(start) = token_start {
        push_token(&mut out, &text[start..]);
    }
    out
}

/// Drops combining marks, then maps what is left to ASCII. Characters with no
/// ASCII rendering are removed.
fn transliterate(text: &str) -> String {
    let unmarked: String = text.nfd().filter(|&c| !is_combining_mark(c)).nfc().collect();
    deunicode_with_tofu(&unmarked, "")
}
