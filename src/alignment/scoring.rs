use std::path::{Path, PathBuf};

use crate::alignment::tokenization::Dictionary;
use crate::audio::load_wav;
use crate::error::AlignmentError;
use crate::pipeline::emission::EmissionAssembler;
use crate::pipeline::traits::{AcceptabilityScorer, Aligner, EmissionModel};
use crate::text::VersePreprocessor;

/// Per-frame probability of the forced path. A transcript the emission is too
/// short for gets zero confidence on every frame instead of an error.
pub fn compute_alignment_scores(
    aligner: &dyn Aligner,
    log_probs: &[Vec<f32>],
    tokens: &[usize],
    blank_id: usize,
) -> Result<Vec<f32>, AlignmentError> {
    if tokens.is_empty() {
        return Ok(vec![0.0; log_probs.len()]);
    }
    match aligner.align(log_probs, tokens, blank_id) {
        Ok(alignment) => Ok(alignment.frame_probabilities()),
        Err(AlignmentError::TargetsTooLong {
            targets,
            required,
            frames,
        }) => {
            tracing::debug!(targets, required, frames, "emission too short, scoring as zero confidence");
            Ok(vec![0.0; log_probs.len()])
        }
        Err(e) => Err(e),
    }
}

/// Mean forced-path probability minus mean greedy (best-class) probability.
/// Zero means the transcript explains the audio as well as free decoding does.
pub fn probability_difference(log_probs: &[Vec<f32>], forced: &[f32]) -> f32 {
    if log_probs.is_empty() {
        return 0.0;
    }
    let frames = log_probs.len() as f32;
    let greedy = log_probs
        .iter()
        .map(|row| row.iter().copied().fold(f32::NEG_INFINITY, f32::max).exp())
        .sum::<f32>()
        / frames;
    let forced = forced.iter().sum::<f32>() / frames;
    forced - greedy
}

/// Scores a `(wav, transcript)` pair with the acoustic model.
pub struct ProbabilityDifferenceScorer {
    model: Box<dyn EmissionModel>,
    aligner: Box<dyn Aligner>,
    dictionary: Dictionary,
    preprocessor: VersePreprocessor,
    language: String,
    window_seconds: f32,
}

impl ProbabilityDifferenceScorer {
    pub fn new(
        model: Box<dyn EmissionModel>,
        aligner: Box<dyn Aligner>,
        dictionary: Dictionary,
        preprocessor: VersePreprocessor,
        language: impl Into<String>,
        window_seconds: f32,
    ) -> Self {
        Self {
            model,
            aligner,
            dictionary,
            preprocessor,
            language: language.into(),
            window_seconds,
        }
    }
}

impl ProbabilityDifferenceScorer {
    fn log_probs(&self, audio_path: &Path) -> Result<Vec<Vec<f32>>, AlignmentError> {
        let audio = load_wav(audio_path)?;
        let emission = EmissionAssembler::new(self.model.as_ref(), self.window_seconds)
            .assemble(&audio.samples, audio.sample_rate_hz)?;
        let log_probs = emission.log_probs()?;
        if log_probs.is_empty() {
            return Err(AlignmentError::invalid_input(format!(
                "no emission frames for {}",
                audio_path.display()
            )));
        }
        Ok(log_probs)
    }

    fn tokens(&self, transcript: &str) -> Vec<usize> {
        let normalized = self.preprocessor.preprocess(transcript, &self.language);
        let words: Vec<&str> = normalized.split_whitespace().collect();
        self.dictionary.tokenize_words(&words).tokens
    }

    fn difference(&self, log_probs: &[Vec<f32>], tokens: &[usize]) -> Result<f32, AlignmentError> {
        let forced = compute_alignment_scores(
            self.aligner.as_ref(),
            log_probs,
            tokens,
            self.dictionary.blank_id(),
        )?;
        Ok(probability_difference(log_probs, &forced))
    }
}

impl AcceptabilityScorer for ProbabilityDifferenceScorer {
    fn score(&self, audio_path: &Path, transcript: &str) -> Result<f32, AlignmentError> {
        let log_probs = self.log_probs(audio_path)?;
        self.difference(&log_probs, &self.tokens(transcript))
    }

    /// Runs inference for the whole batch first, then aligns every item.
    fn score_batch(&self, items: &[(PathBuf, String)]) -> Vec<Result<f32, AlignmentError>> {
        let emissions: Vec<_> = items
            .iter()
            .map(|(audio, transcript)| {
                self.log_probs(audio)
                    .map(|log_probs| (log_probs, self.tokens(transcript)))
            })
            .collect();
        emissions
            .into_iter()
            .map(|prepared| {
                let (log_probs, tokens) = prepared?;
                self.difference(&log_probs, &tokens)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::defaults::ViterbiAligner;

    fn rows(peaks: &[usize], vocab: usize, peak: f32) -> Vec<Vec<f32>> {
        let rest = (1.0 - peak) / (vocab - 1) as f32;
        peaks
            .iter()
            .map(|&p| (0..vocab).map(|v| if v == p { peak.ln() } else { rest.ln() }).collect())
            .collect()
    }

    #[test]
    fn matching_transcript_scores_zero() {
        let lp = rows(&[0, 1, 0, 2, 0], 3, 0.8);
        let forced = compute_alignment_scores(&ViterbiAligner, &lp, &[1, 2], 0).unwrap();
        assert!(probability_difference(&lp, &forced).abs() < 1e-5);
    }

    #[test]
    fn mismatched_transcript_scores_negative() {
        let lp = rows(&[0, 1, 0, 1, 0], 3, 0.8);
        let forced = compute_alignment_scores(&ViterbiAligner, &lp, &[2, 2], 0).unwrap();
        assert!(probability_difference(&lp, &forced) < -0.2);
    }

    #[test]
    fn too_long_transcript_is_zero_confidence() {
        let lp = rows(&[1, 2], 3, 0.8);
        let forced = compute_alignment_scores(&ViterbiAligner, &lp, &[1, 2, 1, 2], 0).unwrap();
        assert_eq!(forced, vec![0.0, 0.0]);
        assert!((probability_difference(&lp, &forced) + 0.8).abs() < 1e-5);
    }

    struct FlatModel;

    impl EmissionModel for FlatModel {
        fn sample_rate_hz(&self) -> u32 {
            16_000
        }

        fn infer(&self, window: &candle_core::Tensor) -> Result<candle_core::Tensor, AlignmentError> {
            let (_, len) = window.dims2().map_err(|e| AlignmentError::runtime("dims", e))?;
            let frames = len / 320;
            candle_core::Tensor::from_vec(
                vec![(0.25f32).ln(); frames * 4],
                (1, frames, 4),
                &candle_core::Device::Cpu,
            )
            .map_err(|e| AlignmentError::runtime("tensor", e))
        }
    }

    fn scorer() -> ProbabilityDifferenceScorer {
        let dictionary = Dictionary::from_json_str(r#"{"-": 0, "a": 1, "b": 2, "*": 3}"#).unwrap();
        let preprocessor = VersePreprocessor::new(
            crate::text::TextNormalizer::builtin().unwrap(),
            Box::new(crate::text::PassthroughRomanizer),
        );
        ProbabilityDifferenceScorer::new(
            Box::new(FlatModel),
            Box::new(ViterbiAligner),
            dictionary,
            preprocessor,
            "*",
            1.0,
        )
    }

    #[test]
    fn scorer_reads_audio_and_scores_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("MAT_001_001.wav");
        // 3200 samples -> 10 frames.
        crate::audio::write_wav(&path, &vec![0.1f32; 3_200], 16_000).unwrap();

        let scorer = scorer();
        // A flat emission gives every path the same probability.
        assert!(scorer.score(&path, "Ab, ba.").unwrap().abs() < 1e-5);
        // Twelve tokens cannot fit in ten frames.
        let too_long = scorer.score(&path, "abababababab").unwrap();
        assert!((too_long + 0.25).abs() < 1e-5);
        assert!(scorer.score(&dir.path().join("missing.wav"), "ab").is_err());
    }

    #[test]
    fn batch_scores_match_single_scores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("MAT_001_001.wav");
        crate::audio::write_wav(&path, &vec![0.1f32; 3_200], 16_000).unwrap();

        let scorer = scorer();
        let items = vec![
            (path.clone(), "Ab, ba.".to_string()),
            (dir.path().join("missing.wav"), "ab".to_string()),
            (path.clone(), "abababababab".to_string()),
        ];
        let batch = scorer.score_batch(&items);
        assert_eq!(batch.len(), 3);
        assert!(batch[1].is_err());
        for index in [0, 2] {
            let (audio, transcript) = &items[index];
            let single = scorer.score(audio, transcript).unwrap();
            assert_eq!(*batch[index].as_ref().unwrap(), single);
        }
    }

    #[test]
    fn other_alignment_errors_propagate() {
        let lp = rows(&[1, 2], 3, 0.8);
        assert!(compute_alignment_scores(&ViterbiAligner, &lp, &[7], 0).is_err());
    }
}
