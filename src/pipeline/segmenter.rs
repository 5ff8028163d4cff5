use std::path::{Path, PathBuf};

use crate::alignment::mapper::SegmentMapper;
use crate::alignment::star;
use crate::alignment::tokenization::Dictionary;
use crate::audio::{load_wav, write_wav};
use crate::config::SegmentationConfig;
use crate::corpus::{ChapterKey, VerseIndex};
use crate::error::AlignmentError;
use crate::pipeline::emission::EmissionAssembler;
use crate::pipeline::traits::{Aligner, EmissionModel};
use crate::text::VersePreprocessor;
use crate::types::VerseOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterStatus {
    Segmented,
    /// The output directory already had files; nothing was done.
    AlreadySegmented,
    /// The verse index has no verses for this chapter.
    NoVerses,
}

#[derive(Debug, Clone)]
pub struct ChapterReport {
    pub chapter: ChapterKey,
    pub status: ChapterStatus,
    pub outcomes: Vec<VerseOutcome>,
    pub written: Vec<PathBuf>,
}

impl ChapterReport {
    fn empty(chapter: ChapterKey, status: ChapterStatus) -> Self {
        Self {
            chapter,
            status,
            outcomes: Vec::new(),
            written: Vec::new(),
        }
    }

    pub fn aligned_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.segment().is_some()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.aligned_count()
    }
}

#[derive(Debug, Default)]
pub struct BookReport {
    pub chapters: Vec<ChapterReport>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Cuts chapter recordings into per-verse audio and transcript files.
pub struct ChapterSegmenter {
    config: SegmentationConfig,
    model: Box<dyn EmissionModel>,
    aligner: Box<dyn Aligner>,
    dictionary: Dictionary,
    preprocessor: VersePreprocessor,
}

pub(crate) struct SegmenterParts {
    pub config: SegmentationConfig,
    pub model: Box<dyn EmissionModel>,
    pub aligner: Box<dyn Aligner>,
    pub dictionary: Dictionary,
    pub preprocessor: VersePreprocessor,
}

impl ChapterSegmenter {
    pub(crate) fn from_parts(parts: SegmenterParts) -> Self {
        Self {
            config: parts.config,
            model: parts.model,
            aligner: parts.aligner,
            dictionary: parts.dictionary,
            preprocessor: parts.preprocessor,
        }
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn chapter_output_dir(&self, book: &str, chapter: &ChapterKey) -> PathBuf {
        self.config.output_root.join(book).join(chapter.as_str())
    }

    /// Segments `{book}/{chapter}.wav` using the verses of `index`.
    ///
    /// A chapter whose output directory already holds files is left alone, so
    /// an interrupted run can be restarted.
    pub fn segment_chapter(
        &self,
        audio_path: &Path,
        index: &VerseIndex,
    ) -> Result<ChapterReport, AlignmentError> {
        let stem = audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| {
                AlignmentError::invalid_input(format!(
                    "audio path {} has no file name",
                    audio_path.display()
                ))
            })?;
        let chapter = ChapterKey::new(stem);
        let out_dir = self.chapter_output_dir(index.book(), &chapter);

        if dir_has_entries(&out_dir) {
            tracing::info!(chapter = %chapter, "output exists, skipping chapter");
            return Ok(ChapterReport::empty(chapter, ChapterStatus::AlreadySegmented));
        }

        let verses = index.chapter(&chapter);
        if verses.is_empty() {
            tracing::warn!(chapter = %chapter, book = index.book(), "no verses for chapter");
            return Ok(ChapterReport::empty(chapter, ChapterStatus::NoVerses));
        }

        let audio = load_wav(audio_path)?;
        let emission = EmissionAssembler::new(self.model.as_ref(), self.config.window_seconds)
            .assemble(&audio.samples, audio.sample_rate_hz)?;

        let verse_ids: Vec<String> = verses.iter().map(|v| v.verse_id.clone()).collect();
        let originals: Vec<&str> = verses.iter().map(|v| v.text.as_str()).collect();
        let normalized: Vec<String> = originals
            .iter()
            .map(|text| self.preprocessor.preprocess(text, &self.config.language))
            .collect();
        let encoding = star::encode(&normalized, &originals)?;

        let outcomes = SegmentMapper::new(self.aligner.as_ref(), &self.dictionary).map(
            &emission,
            &encoding,
            &verse_ids,
            audio.samples.len(),
        )?;

        std::fs::create_dir_all(&out_dir)
            .map_err(|e| AlignmentError::io(format!("create {}", out_dir.display()), e))?;

        let mut written = Vec::new();
        for outcome in &outcomes {
            match outcome {
                VerseOutcome::Aligned(segment) => {
                    let stem = chapter.verse_file_stem(&segment.verse_id);
                    let wav_path = out_dir.join(format!("{stem}.wav"));
                    let txt_path = out_dir.join(format!("{stem}.txt"));
                    write_wav(
                        &wav_path,
                        &audio.samples[segment.start_sample..segment.end_sample],
                        audio.sample_rate_hz,
                    )?;
                    std::fs::write(&txt_path, &segment.transcript).map_err(|e| {
                        AlignmentError::io(format!("write {}", txt_path.display()), e)
                    })?;
                    written.push(wav_path);
                    written.push(txt_path);
                }
                VerseOutcome::Skipped { verse_id, reason } => {
                    tracing::warn!(verse = %verse_id, reason = %reason, "skipping verse");
                }
            }
        }

        let report = ChapterReport {
            chapter,
            status: ChapterStatus::Segmented,
            outcomes,
            written,
        };
        tracing::info!(
            chapter = %report.chapter,
            aligned = report.aligned_count(),
            skipped = report.skipped_count(),
            "chapter segmented"
        );
        Ok(report)
    }

    /// Segments every `.wav` in `audio_dir`, in file name order. Chapters that
    /// fail on their own inputs are logged and recorded; environment failures
    /// abort the run.
    pub fn segment_book(
        &self,
        audio_dir: &Path,
        index: &VerseIndex,
    ) -> Result<BookReport, AlignmentError> {
        let mut audio_files: Vec<PathBuf> = std::fs::read_dir(audio_dir)
            .map_err(|e| AlignmentError::io(format!("list {}", audio_dir.display()), e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "wav"))
            .collect();
        audio_files.sort();

        let mut report = BookReport::default();
        for audio_path in audio_files {
            match self.segment_chapter(&audio_path, index) {
                Ok(chapter) => report.chapters.push(chapter),
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(audio = %audio_path.display(), error = %e, "chapter failed, continuing");
                    report.failed.push((audio_path, e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }
}

fn dir_has_entries(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}
