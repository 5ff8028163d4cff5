use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::error::AlignmentError;
use crate::types::VerseRecord;

/// `{book}_{chapter:03}`, e.g. `MAT_019`; names one chapter's audio file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChapterKey(String);

impl ChapterKey {
    /// `MAT.19.1 -> MAT_019`. Ids with fewer than two dot-separated parts
    /// belong to no chapter.
    pub fn from_verse_id(verse_id: &str) -> Option<Self> {
        let mut parts = verse_id.split('.');
        let book = parts.next().filter(|b| !b.is_empty())?;
        let chapter = parts.next().filter(|c| !c.is_empty())?;
        Some(Self(format!("{book}_{chapter:0>3}")))
    }

    /// Wraps an existing key such as an audio file stem.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File stem for one verse of this chapter: `MAT.1.2 -> MAT_001_002`.
    pub fn verse_file_stem(&self, verse_id: &str) -> String {
        let verse_number = verse_id.rsplit('.').next().unwrap_or(verse_id);
        format!("{}_{verse_number:0>3}", self.0)
    }
}

impl fmt::Display for ChapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Deserialize)]
struct RawVerse {
    #[serde(rename = "numVerset")]
    verse_id: String,
    #[serde(rename = "verset")]
    text: String,
}

/// All verses of one book, in source order.
#[derive(Debug, Clone)]
pub struct VerseIndex {
    book: String,
    records: Vec<VerseRecord>,
}

impl VerseIndex {
    /// Loads `{book}.json`; the file stem names the book.
    pub fn load(path: &Path) -> Result<Self, AlignmentError> {
        let book = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .ok_or_else(|| {
                AlignmentError::invalid_input(format!(
                    "verse index path {} has no file name",
                    path.display()
                ))
            })?;
        let data = std::fs::read_to_string(path)
            .map_err(|e| AlignmentError::io(format!("read verse index {}", path.display()), e))?;
        Self::from_json_str(book, &data)
    }

    pub fn from_json_str(book: impl Into<String>, data: &str) -> Result<Self, AlignmentError> {
        let raw: Vec<RawVerse> =
            serde_json::from_str(data).map_err(|e| AlignmentError::json("parse verse index", e))?;
        let records = raw
            .into_iter()
            .map(|r| VerseRecord {
                verse_id: r.verse_id,
                text: r.text,
            })
            .collect();
        Ok(Self::from_records(book, records))
    }

    pub fn from_records(book: impl Into<String>, records: Vec<VerseRecord>) -> Self {
        Self {
            book: book.into(),
            records,
        }
    }

    pub fn book(&self) -> &str {
        &self.book
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Verses of one chapter, in source order.
    pub fn chapter(&self, key: &ChapterKey) -> Vec<&VerseRecord> {
        self.records
            .iter()
            .filter(|r| ChapterKey::from_verse_id(&r.verse_id).as_ref() == Some(key))
            .collect()
    }

    /// Distinct chapter keys in order of first appearance.
    pub fn chapter_keys(&self) -> Vec<ChapterKey> {
        let mut keys: Vec<ChapterKey> = Vec::new();
        for record in &self.records {
            if let Some(key) = ChapterKey::from_verse_id(&record.verse_id) {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MATTHEW: &str = r#"[
        {"numVerset": "MAT.1.1", "verset": "The book of the generation of Jesus Christ."},
        {"numVerset": "MAT.1.2", "verset": "Abraham begat Isaac;"},
        {"numVerset": "MAT.2.1", "verset": "Now when Jesus was born in Bethlehem"},
        {"numVerset": "MAT.1.3", "verset": "And Judas begat Phares"},
        {"numVerset": "MAT", "verset": "heading"}
    ]"#;

    #[test]
    fn chapter_key_from_verse_id() {
        assert_eq!(
            ChapterKey::from_verse_id("MAT.19.1").unwrap().as_str(),
            "MAT_019"
        );
        assert_eq!(
            ChapterKey::from_verse_id("PSA.119.176").unwrap().as_str(),
            "PSA_119"
        );
        assert_eq!(ChapterKey::from_verse_id("MAT"), None);
        assert_eq!(ChapterKey::from_verse_id(".1.1"), None);
    }

    #[test]
    fn verse_file_stem_pads_verse_number() {
        let key = ChapterKey::new("MAT_001");
        assert_eq!(key.verse_file_stem("MAT.1.2"), "MAT_001_002");
        assert_eq!(key.verse_file_stem("MAT.1.1234"), "MAT_001_1234");
    }

    #[test]
    fn chapter_filters_in_source_order() {
        let index = VerseIndex::from_json_str("MAT", MATTHEW).unwrap();
        assert_eq!(index.book(), "MAT");
        let chapter = index.chapter(&ChapterKey::new("MAT_001"));
        let ids: Vec<&str> = chapter.iter().map(|r| r.verse_id.as_str()).collect();
        assert_eq!(ids, ["MAT.1.1", "MAT.1.2", "MAT.1.3"]);
        assert!(index.chapter(&ChapterKey::new("MAT_003")).is_empty());
    }

    #[test]
    fn chapter_keys_in_first_appearance_order() {
        let index = VerseIndex::from_json_str("MAT", MATTHEW).unwrap();
        let keys: Vec<String> = index
            .chapter_keys()
            .into_iter()
            .map(|k| k.as_str().to_string())
            .collect();
        assert_eq!(keys, ["MAT_001", "MAT_002"]);
    }

    #[test]
    fn malformed_index_is_json_error() {
        let err = VerseIndex::from_json_str("MAT", r#"[{"numVerset": "MAT.1.1"}]"#).unwrap_err();
        assert!(matches!(err, AlignmentError::Json { .. }));
    }
}
