use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::error::AlignmentError;
use crate::text::WILDCARD;

const BUILTIN_TABLE: &str = include_str!("norm_config.json");
pub const FALLBACK_LANGUAGE: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum UnicodeForm {
    #[serde(rename = "NFC")]
    Nfc,
    #[serde(rename = "NFD")]
    Nfd,
    #[serde(rename = "NFKC")]
    Nfkc,
    #[serde(rename = "NFKD")]
    Nfkd,
}

/// Set of characters stored as inclusive ranges.
///
/// Table entries are either a single character or a three-character range
/// `a-z`; a lone `-` is the hyphen itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharSet {
    ranges: Vec<(char, char)>,
}

impl CharSet {
    pub fn parse(entries: &[String]) -> Result<Self, AlignmentError> {
        let mut ranges = Vec::with_capacity(entries.len());
        for entry in entries {
            let chars: Vec<char> = entry.chars().collect();
            let range = match chars.as_slice() {
                [c] => (*c, *c),
                [lo, '-', hi] if lo <= hi => (*lo, *hi),
                [lo, '-', hi] => {
                    return Err(AlignmentError::config(format!(
                        "character range '{lo}-{hi}' is reversed"
                    )))
                }
                _ => {
                    return Err(AlignmentError::config(format!(
                        "set entry {entry:?} must be one character or a 'a-z' range"
                    )))
                }
            };
            ranges.push(range);
        }
        Ok(Self { ranges })
    }

    pub fn contains(&self, c: char) -> bool {
        self.ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Substitution {
    pub pattern: Regex,
    pub replacement: String,
}

/// Fully-resolved normalization rules for one language.
#[derive(Debug, Clone)]
pub struct NormalizationConfig {
    pub lower_case: bool,
    pub punctuation: CharSet,
    pub delete: CharSet,
    pub mapping: Vec<Substitution>,
    pub digits: CharSet,
    pub unicode_norm: UnicodeForm,
    pub strip_diacritics: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    lower_case: Option<bool>,
    punctuation: Option<Vec<String>>,
    #[serde(default)]
    extra_punctuation: Vec<String>,
    delete: Option<Vec<String>>,
    #[serde(default)]
    extra_delete: Vec<String>,
    mapping: Option<Vec<(String, String)>>,
    #[serde(default)]
    extra_mapping: Vec<(String, String)>,
    digits: Option<Vec<String>>,
    unicode_norm: Option<UnicodeForm>,
    strip_diacritics: Option<bool>,
}

/// Raw fields after inheritance, before compilation.
#[derive(Debug, Clone)]
struct InheritedConfig {
    lower_case: bool,
    punctuation: Vec<String>,
    delete: Vec<String>,
    mapping: Vec<(String, String)>,
    digits: Vec<String>,
    unicode_norm: UnicodeForm,
    strip_diacritics: bool,
}

impl InheritedConfig {
    fn from_fallback(raw: &RawConfig) -> Result<Self, AlignmentError> {
        fn required<T: Clone>(value: &Option<T>, field: &str) -> Result<T, AlignmentError> {
            value.clone().ok_or_else(|| {
                AlignmentError::config(format!("fallback config '*' is missing field '{field}'"))
            })
        }
        let base = Self {
            lower_case: required(&raw.lower_case, "lower_case")?,
            punctuation: required(&raw.punctuation, "punctuation")?,
            delete: required(&raw.delete, "delete")?,
            mapping: required(&raw.mapping, "mapping")?,
            digits: required(&raw.digits, "digits")?,
            unicode_norm: required(&raw.unicode_norm, "unicode_norm")?,
            strip_diacritics: required(&raw.strip_diacritics, "strip_diacritics")?,
        };
        Ok(base.with_extras(raw))
    }

    fn inherit(&self, raw: &RawConfig) -> Self {
        let merged = Self {
            lower_case: raw.lower_case.unwrap_or(self.lower_case),
            punctuation: raw
                .punctuation
                .clone()
                .unwrap_or_else(|| self.punctuation.clone()),
            delete: raw.delete.clone().unwrap_or_else(|| self.delete.clone()),
            mapping: raw.mapping.clone().unwrap_or_else(|| self.mapping.clone()),
            digits: raw.digits.clone().unwrap_or_else(|| self.digits.clone()),
            unicode_norm: raw.unicode_norm.unwrap_or(self.unicode_norm),
            strip_diacritics: raw.strip_diacritics.unwrap_or(self.strip_diacritics),
        };
        merged.with_extras(raw)
    }

    fn with_extras(mut self, raw: &RawConfig) -> Self {
        self.punctuation.extend(raw.extra_punctuation.iter().cloned());
        self.delete.extend(raw.extra_delete.iter().cloned());
        self.mapping.extend(raw.extra_mapping.iter().cloned());
        self
    }

    fn compile(self, lang: &str) -> Result<NormalizationConfig, AlignmentError> {
        let punctuation = CharSet::parse(&self.punctuation)?;
        let delete = CharSet::parse(&self.delete)?;
        let digits = CharSet::parse(&self.digits)?;
        for (name, set) in [
            ("punctuation", &punctuation),
            ("delete", &delete),
            ("digits", &digits),
        ] {
            if set.contains(WILDCARD) {
                return Err(AlignmentError::config(format!(
                    "'{lang}' {name} set contains the wildcard '{WILDCARD}'"
                )));
            }
        }

        let mapping = self
            .mapping
            .into_iter()
            .map(|(pattern, replacement)| {
                let compiled = Regex::new(&pattern).map_err(|e| {
                    AlignmentError::config(format!(
                        "'{lang}' substitution pattern {pattern:?} is malformed: {e}"
                    ))
                })?;
                Ok(Substitution {
                    pattern: compiled,
                    replacement,
                })
            })
            .collect::<Result<Vec<_>, AlignmentError>>()?;

        Ok(NormalizationConfig {
            lower_case: self.lower_case,
            punctuation,
            delete,
            mapping,
            digits,
            unicode_norm: self.unicode_norm,
            strip_diacritics: self.strip_diacritics,
        })
    }
}

/// Per-language normalization rules keyed by ISO 639-3 code.
#[derive(Debug, Clone)]
pub struct NormalizationTable {
    fallback: NormalizationConfig,
    languages: HashMap<String, NormalizationConfig>,
}

impl NormalizationTable {
    pub fn builtin() -> Result<Self, AlignmentError> {
        Self::from_json_str(BUILTIN_TABLE)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, AlignmentError> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            AlignmentError::io(format!("read normalization table {}", path.display()), e)
        })?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> Result<Self, AlignmentError> {
        let raw: BTreeMap<String, RawConfig> = serde_json::from_str(data)
            .map_err(|e| AlignmentError::config(format!("normalization table: {e}")))?;
        let fallback_raw = raw.get(FALLBACK_LANGUAGE).ok_or_else(|| {
            AlignmentError::config("normalization table has no '*' fallback entry")
        })?;
        let base = InheritedConfig::from_fallback(fallback_raw)?;

        let mut languages = HashMap::with_capacity(raw.len().saturating_sub(1));
        for (lang, entry) in &raw {
            if lang == FALLBACK_LANGUAGE {
                continue;
            }
            languages.insert(lang.clone(), base.inherit(entry).compile(lang)?);
        }

        Ok(Self {
            fallback: base.compile(FALLBACK_LANGUAGE)?,
            languages,
        })
    }

    /// Unknown codes resolve to the fallback entry.
    pub fn resolve(&self, lang: &str) -> &NormalizationConfig {
        self.languages.get(lang).unwrap_or(&self.fallback)
    }

    pub fn has_language(&self, lang: &str) -> bool {
        self.languages.contains_key(lang)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_loads() {
        let table = NormalizationTable::builtin().expect("builtin table");
        assert!(table.has_language("heb"));
        assert!(table.resolve("jav").strip_diacritics);
        assert!(!table.resolve("eng").strip_diacritics);
    }

    #[test]
    fn partial_entries_inherit_and_extend_fallback() {
        let table = NormalizationTable::builtin().expect("builtin table");
        let fallback = table.resolve("xyz");
        let mongolian = table.resolve("mon");
        assert!(mongolian.delete.contains('\u{00AD}'));
        assert!(!fallback.delete.contains('\u{00AD}'));
        assert!(mongolian.delete.contains('\u{200B}'));
        assert!(mongolian.punctuation.contains('.'));
        assert_eq!(mongolian.unicode_norm, UnicodeForm::Nfkc);

        let arabic = table.resolve("ara");
        assert_eq!(arabic.mapping.len(), fallback.mapping.len() + 1);
    }

    #[test]
    fn char_set_ranges_and_hyphen() {
        let set = CharSet::parse(&["a-c".to_string(), "-".to_string()]).unwrap();
        assert!(set.contains('b'));
        assert!(set.contains('-'));
        assert!(!set.contains('d'));
    }

    #[test]
    fn malformed_set_entry_is_config_error() {
        let err = CharSet::parse(&["abcd".to_string()]).unwrap_err();
        assert!(matches!(err, AlignmentError::Config { .. }));
    }

    const MINIMAL_FALLBACK: &str = r#"
        "*": {
            "lower_case": true,
            "punctuation": ["."],
            "delete": [],
            "mapping": [],
            "digits": ["0-9"],
            "unicode_norm": "NFC",
            "strip_diacritics": false
        }"#;

    #[test]
    fn malformed_substitution_pattern_fails_at_load() {
        let json = format!(r#"{{ {MINIMAL_FALLBACK}, "xyz": {{ "mapping": [["(unclosed", ""]] }} }}"#);
        let err = NormalizationTable::from_json_str(&json).unwrap_err();
        assert!(matches!(err, AlignmentError::Config { .. }));
        assert!(err.to_string().contains("xyz"));
    }

    #[test]
    fn unknown_field_fails_at_load() {
        let json = format!(r#"{{ {MINIMAL_FALLBACK}, "xyz": {{ "upper_case": true }} }}"#);
        let err = NormalizationTable::from_json_str(&json).unwrap_err();
        assert!(matches!(err, AlignmentError::Config { .. }));
    }

    #[test]
    fn incomplete_fallback_fails_at_load() {
        let err = NormalizationTable::from_json_str(r#"{ "*": { "lower_case": true } }"#)
            .unwrap_err();
        assert!(err.to_string().contains("punctuation"));
    }

    #[test]
    fn wildcard_in_punctuation_is_rejected() {
        let json = format!(r#"{{ {MINIMAL_FALLBACK}, "xyz": {{ "extra_punctuation": ["*"] }} }}"#);
        assert!(NormalizationTable::from_json_str(&json).is_err());
    }
}
