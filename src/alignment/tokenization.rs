use std::collections::HashMap;
use std::path::Path;

use crate::error::AlignmentError;
use crate::text::WILDCARD;

const BLANK_KEYS: [&str; 3] = ["<blank>", "<pad>", "-"];

/// Character-to-id vocabulary of the acoustic model.
#[derive(Debug, Clone)]
pub struct Dictionary {
    ids: HashMap<char, usize>,
    blank_id: usize,
    size: usize,
    case: CaseFold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaseFold {
    Lower,
    Upper,
}

/// Token ids for a word sequence, with each word's token count so spans can
/// be regrouped per word afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedWords {
    pub tokens: Vec<usize>,
    pub word_lengths: Vec<usize>,
}

impl Dictionary {
    pub const DEFAULT_BLANK_ID: usize = 0;

    pub fn new(ids: HashMap<char, usize>, blank_id: usize) -> Self {
        let size = ids
            .values()
            .copied()
            .chain(std::iter::once(blank_id))
            .max()
            .map_or(0, |max| max + 1);

        let mut has_upper = false;
        let mut has_lower = false;
        for c in ids.keys().copied().filter(|c| c.is_alphabetic()) {
            if c.is_uppercase() {
                has_upper = true;
            }
            if c.is_lowercase() {
                has_lower = true;
            }
        }
        let case = if has_upper && !has_lower {
            CaseFold::Upper
        } else {
            CaseFold::Lower
        };

        Self {
            ids,
            blank_id,
            size,
            case,
        }
    }

    /// Loads a `{token: id}` JSON vocabulary. Multi-character keys other than
    /// the blank marker are ignored.
    pub fn from_json_file(path: &Path) -> Result<Self, AlignmentError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| AlignmentError::io(format!("read vocabulary {}", path.display()), e))?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> Result<Self, AlignmentError> {
        let raw: HashMap<String, usize> =
            serde_json::from_str(data).map_err(|e| AlignmentError::json("parse vocabulary", e))?;

        let blank_id = BLANK_KEYS
            .iter()
            .find_map(|key| raw.get(*key).copied())
            .unwrap_or(Self::DEFAULT_BLANK_ID);

        let ids = raw
            .into_iter()
            .filter_map(|(k, v)| {
                let mut it = k.chars();
                let c = it.next()?;
                if it.next().is_some() {
                    return None;
                }
                Some((c, v))
            })
            .collect();
        Ok(Self::new(ids, blank_id))
    }

    pub fn blank_id(&self) -> usize {
        self.blank_id
    }

    /// Vocabulary size, i.e. the width an emission row must have.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, c: char) -> Option<usize> {
        self.ids.get(&c).copied().filter(|&id| id != self.blank_id)
    }

    pub fn has_wildcard(&self) -> bool {
        self.get(WILDCARD).is_some()
    }

    /// Tokenizes each word character by character. Characters missing from the
    /// vocabulary are dropped, so a word may end up with zero tokens.
    pub fn tokenize_words<S: AsRef<str>>(&self, words: &[S]) -> TokenizedWords {
        let mut tokens = Vec::new();
        let mut word_lengths = Vec::with_capacity(words.len());
        for word in words {
            let word = word.as_ref();
            let folded = match self.case {
                CaseFold::Lower if word == word.to_lowercase() => word.to_string(),
                CaseFold::Lower => word.to_lowercase(),
                CaseFold::Upper => word.to_uppercase(),
            };
            let before = tokens.len();
            for c in folded.chars() {
                match self.get(c) {
                    Some(id) => tokens.push(id),
                    None => tracing::debug!(word, char = %c, "dropping character missing from vocabulary"),
                }
            }
            word_lengths.push(tokens.len() - before);
        }
        TokenizedWords {
            tokens,
            word_lengths,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mms_dictionary() -> Dictionary {
        Dictionary::from_json_str(r#"{"-": 0, "a": 1, "b": 2, "c": 3, "'": 4, "*": 5}"#)
            .expect("vocabulary")
    }

    #[test]
    fn blank_detected_from_marker_key() {
        let dict = mms_dictionary();
        assert_eq!(dict.blank_id(), 0);
        assert_eq!(dict.len(), 6);
        assert!(dict.has_wildcard());
        // The blank marker never tokenizes as text.
        assert_eq!(dict.get('-'), None);
    }

    #[test]
    fn multi_char_keys_are_filtered_but_pad_is_blank() {
        let dict =
            Dictionary::from_json_str(r#"{"<pad>": 0, "<s>": 1, "|": 2, "A": 3, "B": 4}"#).unwrap();
        assert_eq!(dict.blank_id(), 0);
        assert_eq!(dict.get('A'), Some(3));
        assert!(!dict.has_wildcard());
    }

    #[test]
    fn uppercase_vocab_uppercases_words() {
        let dict =
            Dictionary::from_json_str(r#"{"<pad>": 0, "A": 1, "B": 2}"#).unwrap();
        let tokenized = dict.tokenize_words(&["ab", "ba"]);
        assert_eq!(tokenized.tokens, vec![1, 2, 2, 1]);
        assert_eq!(tokenized.word_lengths, vec![2, 2]);
    }

    #[test]
    fn unknown_chars_dropped_and_counted_per_word() {
        let dict = mms_dictionary();
        let tokenized = dict.tokenize_words(&["*", "abx", "zz", "c'"]);
        assert_eq!(tokenized.tokens, vec![5, 1, 2, 3, 4]);
        assert_eq!(tokenized.word_lengths, vec![1, 2, 0, 2]);
    }

    #[test]
    fn missing_vocab_file_is_io_error() {
        let err = Dictionary::from_json_file(Path::new("/nonexistent/vocab.json")).unwrap_err();
        assert!(matches!(err, AlignmentError::Io { .. }));
    }
}
