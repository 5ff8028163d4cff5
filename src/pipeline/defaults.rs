use crate::alignment::viterbi::{forced_align, FrameAlignment};
use crate::error::AlignmentError;
use crate::pipeline::traits::Aligner;

pub struct ViterbiAligner;

impl Aligner for ViterbiAligner {
    fn align(
        &self,
        log_probs: &[Vec<f32>],
        tokens: &[usize],
        blank_id: usize,
    ) -> Result<FrameAlignment, AlignmentError> {
        forced_align(log_probs, tokens, blank_id)
    }
}
