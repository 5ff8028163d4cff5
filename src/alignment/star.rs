//! Wildcard ("star") augmentation of a chapter's token stream.
//!
//! A wildcard word is placed before every verse so the aligner has a free
//! anchor for chapter headings, spoken verse numbers and pauses. The inverse
//! direction drops the wildcard spans and slices the remaining word spans back
//! into verses.

use crate::error::AlignmentError;
use crate::text::WILDCARD_TOKEN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarEncoding {
    augmented: Vec<String>,
    per_verse_words: Vec<Vec<String>>,
}

/// Builds the augmented stream from normalized verses, keeping the word split
/// of the original verses for transcripts and regrouping.
pub fn encode<N, O>(normalized: &[N], originals: &[O]) -> Result<StarEncoding, AlignmentError>
where
    N: AsRef<str>,
    O: AsRef<str>,
{
    if normalized.len() != originals.len() {
        return Err(AlignmentError::invalid_input(format!(
            "star encoding needs one normalized text per verse: {} normalized, {} original",
            normalized.len(),
            originals.len()
        )));
    }

    let mut augmented = Vec::with_capacity(normalized.len() * 2);
    for verse in normalized {
        augmented.push(WILDCARD_TOKEN.to_string());
        augmented.push(verse.as_ref().to_string());
    }

    let per_verse_words = originals
        .iter()
        .map(|verse| {
            verse
                .as_ref()
                .split_whitespace()
                .map(str::to_string)
                .collect()
        })
        .collect();

    Ok(StarEncoding {
        augmented,
        per_verse_words,
    })
}

impl StarEncoding {
    /// Two entries per verse: the wildcard, then the whole normalized verse.
    pub fn augmented(&self) -> &[String] {
        &self.augmented
    }

    pub fn per_verse_words(&self) -> &[Vec<String>] {
        &self.per_verse_words
    }

    pub fn verse_count(&self) -> usize {
        self.per_verse_words.len()
    }

    /// Number of wildcard anchors, one per verse by construction.
    pub fn anchor_count(&self) -> usize {
        self.augmented
            .iter()
            .step_by(2)
            .filter(|entry| entry.as_str() == WILDCARD_TOKEN)
            .count()
    }

    /// The augmented stream split into the words handed to the aligner.
    pub fn augmented_words(&self) -> Vec<String> {
        self.augmented
            .iter()
            .flat_map(|entry| entry.split_whitespace())
            .map(str::to_string)
            .collect()
    }

    pub fn total_verse_words(&self) -> usize {
        self.per_verse_words.iter().map(Vec::len).sum()
    }

    /// Slices per-word groups into per-verse groups.
    ///
    /// Each verse consumes as many groups as it has original words. Slices clamp
    /// at the end of `word_groups`, so a count mismatch shows up as short or
    /// empty verse slices rather than an error.
    pub fn regroup<'a, T>(&self, word_groups: &'a [T]) -> Vec<&'a [T]> {
        let mut cursor = 0usize;
        self.per_verse_words
            .iter()
            .map(|words| {
                let start = cursor.min(word_groups.len());
                let end = (cursor + words.len()).min(word_groups.len());
                cursor += words.len();
                &word_groups[start..end]
            })
            .collect()
    }
}

/// Drops the groups whose word is a wildcard, keeping order.
pub fn strip_wildcards<T>(words: &[String], groups: Vec<T>) -> Vec<T> {
    words
        .iter()
        .zip(groups)
        .filter(|(word, _)| word.as_str() != WILDCARD_TOKEN)
        .map(|(_, group)| group)
        .collect()
}
