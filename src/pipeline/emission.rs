use std::ops::Range;

use candle_core::{DType, Tensor};

use crate::audio::resample;
use crate::error::AlignmentError;
use crate::pipeline::traits::EmissionModel;

/// Frame-level log-probabilities, `[1, frames, vocab]`.
#[derive(Debug, Clone)]
pub struct Emission {
    tensor: Tensor,
    num_frames: usize,
    vocab_size: usize,
}

impl Emission {
    pub fn new(tensor: Tensor) -> Result<Self, AlignmentError> {
        let (batch, num_frames, vocab_size) = tensor
            .dims3()
            .map_err(|e| AlignmentError::runtime("emission shape", e))?;
        if batch != 1 {
            return Err(AlignmentError::invalid_input(format!(
                "emission batch must be 1, got {batch}"
            )));
        }
        Ok(Self {
            tensor,
            num_frames,
            vocab_size,
        })
    }

    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Host copy as `[frames][vocab]`.
    pub fn log_probs(&self) -> Result<Vec<Vec<f32>>, AlignmentError> {
        self.tensor
            .squeeze(0)
            .and_then(|t| t.to_dtype(DType::F32))
            .and_then(|t| t.to_vec2::<f32>())
            .map_err(|e| AlignmentError::runtime("emission to host", e))
    }
}

/// Contiguous windows of `window` samples covering `total`, without the
/// windows shorter than `min_len` (only the last one can be).
pub fn plan_windows(total: usize, window: usize, min_len: usize) -> Vec<Range<usize>> {
    if window == 0 {
        return Vec::new();
    }
    (0..total)
        .step_by(window)
        .map(|start| start..(start + window).min(total))
        .filter(|range| range.len() >= min_len)
        .collect()
}

/// Runs the model over fixed-duration windows and stitches the outputs.
pub struct EmissionAssembler<'a> {
    model: &'a dyn EmissionModel,
    window_seconds: f32,
}

impl<'a> EmissionAssembler<'a> {
    pub fn new(model: &'a dyn EmissionModel, window_seconds: f32) -> Self {
        Self {
            model,
            window_seconds,
        }
    }

    pub fn window_samples(&self) -> usize {
        (self.window_seconds * self.model.sample_rate_hz() as f32).round() as usize
    }

    pub fn assemble(&self, samples: &[f32], input_rate_hz: u32) -> Result<Emission, AlignmentError> {
        let window = self.window_samples();
        if window == 0 {
            return Err(AlignmentError::invalid_input(format!(
                "window of {}s at {} Hz is empty",
                self.window_seconds,
                self.model.sample_rate_hz()
            )));
        }

        let model_rate = self.model.sample_rate_hz();
        let resampled = resample(samples, input_rate_hz, model_rate);
        let min_len = self.model.min_window_samples();
        let windows = plan_windows(resampled.len(), window, min_len);
        let dropped = resampled.len().div_ceil(window) - windows.len();
        if dropped > 0 {
            tracing::debug!(
                dropped,
                min_window_samples = min_len,
                "dropping windows too short for the model"
            );
        }
        if windows.is_empty() {
            return Err(AlignmentError::invalid_input(format!(
                "audio of {} samples has no window of at least {min_len} samples",
                resampled.len()
            )));
        }

        let device = self.model.device();
        let mut parts = Vec::with_capacity(windows.len());
        let mut vocab_size = None;
        for range in windows {
            let len = range.len();
            let input = Tensor::from_slice(&resampled[range], (1, len), &device)
                .map_err(|e| AlignmentError::runtime("window tensor", e))?;
            let output = self.model.infer(&input)?;
            let (batch, _, vocab) = output
                .dims3()
                .map_err(|e| AlignmentError::runtime("window emission shape", e))?;
            if batch != 1 {
                return Err(AlignmentError::invalid_input(format!(
                    "window emission batch must be 1, got {batch}"
                )));
            }
            match vocab_size {
                Some(expected) if expected != vocab => {
                    return Err(AlignmentError::invalid_input(format!(
                        "window emissions disagree on vocabulary size: {expected} vs {vocab}"
                    )));
                }
                _ => vocab_size = Some(vocab),
            }
            parts.push(output);
        }

        let tensor =
            Tensor::cat(&parts, 1).map_err(|e| AlignmentError::runtime("concatenate emissions", e))?;
        Emission::new(tensor)
    }
}
