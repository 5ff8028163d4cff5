use crate::alignment::spans::unflatten;
use crate::alignment::star::{strip_wildcards, StarEncoding};
use crate::alignment::tokenization::Dictionary;
use crate::error::AlignmentError;
use crate::pipeline::emission::Emission;
use crate::pipeline::traits::Aligner;
use crate::types::{Segment, SkipReason, TokenSpan, VerseOutcome};

/// Turns a chapter emission and its star encoding into per-verse sample ranges.
pub struct SegmentMapper<'a> {
    aligner: &'a dyn Aligner,
    dictionary: &'a Dictionary,
}

impl<'a> SegmentMapper<'a> {
    pub fn new(aligner: &'a dyn Aligner, dictionary: &'a Dictionary) -> Self {
        Self {
            aligner,
            dictionary,
        }
    }

    /// Aligns `words` against the emission and returns one span group per word.
    /// Words with no known character get an empty group.
    pub fn word_spans(
        &self,
        log_probs: &[Vec<f32>],
        words: &[String],
    ) -> Result<Vec<Vec<TokenSpan>>, AlignmentError> {
        let tokenized = self.dictionary.tokenize_words(words);
        if tokenized.tokens.is_empty() {
            return Ok(vec![Vec::new(); words.len()]);
        }
        let alignment =
            self.aligner
                .align(log_probs, &tokenized.tokens, self.dictionary.blank_id())?;
        let spans = alignment.token_spans(self.dictionary.blank_id());
        unflatten(spans, &tokenized.word_lengths)
    }

    pub fn map(
        &self,
        emission: &Emission,
        encoding: &StarEncoding,
        verse_ids: &[String],
        total_input_samples: usize,
    ) -> Result<Vec<VerseOutcome>, AlignmentError> {
        if verse_ids.len() != encoding.verse_count() {
            return Err(AlignmentError::invalid_input(format!(
                "{} verse ids for {} encoded verses",
                verse_ids.len(),
                encoding.verse_count()
            )));
        }
        if emission.vocab_size() != self.dictionary.len() {
            return Err(AlignmentError::invalid_input(format!(
                "emission vocabulary {} does not match dictionary size {}",
                emission.vocab_size(),
                self.dictionary.len()
            )));
        }

        let words = encoding.augmented_words();
        let log_probs = emission.log_probs()?;
        let groups = self.word_spans(&log_probs, &words)?;
        let word_groups = strip_wildcards(&words, groups);
        Ok(map_verse_spans(
            encoding,
            &word_groups,
            verse_ids,
            total_input_samples,
            emission.num_frames(),
        ))
    }
}

/// Scales per-verse span groups from frames to input samples.
pub fn map_verse_spans(
    encoding: &StarEncoding,
    word_groups: &[Vec<TokenSpan>],
    verse_ids: &[String],
    total_input_samples: usize,
    num_frames: usize,
) -> Vec<VerseOutcome> {
    let per_verse = encoding.regroup(word_groups);
    per_verse
        .into_iter()
        .zip(encoding.per_verse_words())
        .zip(verse_ids)
        .map(|((verse_spans, words), verse_id)| {
            let skipped = |reason| VerseOutcome::Skipped {
                verse_id: verse_id.clone(),
                reason,
            };

            if verse_spans.is_empty() {
                return skipped(SkipReason::EmptySpans);
            }
            let (Some(first), Some(last)) = (
                verse_spans.first().and_then(|g| g.first()),
                verse_spans.last().and_then(|g| g.last()),
            ) else {
                return skipped(SkipReason::UnresolvedSpans);
            };
            if verse_spans.iter().any(Vec::is_empty) {
                return skipped(SkipReason::UnresolvedSpans);
            }

            match scale_to_samples(first.start, last.end, total_input_samples, num_frames) {
                Some((start_sample, end_sample)) => VerseOutcome::Aligned(Segment {
                    verse_id: verse_id.clone(),
                    start_sample,
                    end_sample,
                    transcript: words.join(" "),
                }),
                None => skipped(SkipReason::OffsetOutOfRange),
            }
        })
        .collect()
}

/// `round(total / frames * frame)` for both ends; `None` when the result is
/// not a non-empty interval inside the recording.
pub fn scale_to_samples(
    start_frame: usize,
    end_frame: usize,
    total_input_samples: usize,
    num_frames: usize,
) -> Option<(usize, usize)> {
    if num_frames == 0 {
        return None;
    }
    let ratio = total_input_samples as f64 / num_frames as f64;
    let start = (ratio * start_frame as f64).round();
    let end = (ratio * end_frame as f64).round();
    if start < 0.0 || end > total_input_samples as f64 || end <= start {
        return None;
    }
    Some((start as usize, end as usize))
}
