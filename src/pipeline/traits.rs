use std::path::{Path, PathBuf};

use candle_core::{Device, Tensor};

use crate::alignment::viterbi::FrameAlignment;
use crate::error::AlignmentError;

/// Shortest window the acoustic model accepts, in samples.
pub const MIN_WINDOW_SAMPLES: usize = 400;

/// Acoustic model producing per-frame log-probabilities.
pub trait EmissionModel: Send + Sync {
    fn sample_rate_hz(&self) -> u32;

    fn min_window_samples(&self) -> usize {
        MIN_WINDOW_SAMPLES
    }

    fn device(&self) -> Device {
        Device::Cpu
    }

    /// `window` is `[1, samples]`; the result is `[1, frames, vocab]`.
    fn infer(&self, window: &Tensor) -> Result<Tensor, AlignmentError>;
}

pub trait Aligner: Send + Sync {
    fn align(
        &self,
        log_probs: &[Vec<f32>],
        tokens: &[usize],
        blank_id: usize,
    ) -> Result<FrameAlignment, AlignmentError>;
}

/// Scores how well a transcript fits its audio; higher is better.
pub trait AcceptabilityScorer: Send + Sync {
    fn score(&self, audio_path: &Path, transcript: &str) -> Result<f32, AlignmentError>;

    /// One result per item, in order.
    fn score_batch(&self, items: &[(PathBuf, String)]) -> Vec<Result<f32, AlignmentError>> {
        items
            .iter()
            .map(|(audio, transcript)| self.score(audio, transcript))
            .collect()
    }
}
