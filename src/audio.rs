//! WAV I/O and resampling.

use std::path::Path;

use crate::error::AlignmentError;

/// Mono samples in `[-1, 1]` with their sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate_hz: u32,
}

impl AudioBuffer {
    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate_hz == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate_hz as f32
    }
}

/// Reads a WAV file, averaging all channels into one.
pub fn load_wav(path: &Path) -> Result<AudioBuffer, AlignmentError> {
    let context = || format!("reading {}", path.display());
    let mut reader = hound::WavReader::open(path).map_err(|e| AlignmentError::audio(context(), e))?;
    let spec = reader.spec();
    if spec.sample_rate == 0 || spec.channels == 0 {
        return Err(AlignmentError::audio(
            context(),
            format!(
                "invalid format: {} Hz, {} channels",
                spec.sample_rate, spec.channels
            ),
        ));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<_, _>>()
        }
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>(),
    }
    .map_err(|e| AlignmentError::audio(context(), e))?;

    let channels = spec.channels as usize;
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    Ok(AudioBuffer {
        samples,
        sample_rate_hz: spec.sample_rate,
    })
}

/// Writes mono 32-bit float samples.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate_hz: u32) -> Result<(), AlignmentError> {
    let context = || format!("writing {}", path.display());
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: sample_rate_hz,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer =
        hound::WavWriter::create(path, spec).map_err(|e| AlignmentError::audio(context(), e))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| AlignmentError::audio(context(), e))?;
    }
    writer
        .finalize()
        .map_err(|e| AlignmentError::audio(context(), e))
}

/// Band-limited sinc resampling; falls back to linear interpolation when the
/// sinc resampler cannot be built or fails mid-stream.
pub fn resample(samples: &[f32], src_rate: u32, target_rate: u32) -> Vec<f32> {
    if src_rate == target_rate || samples.is_empty() {
        return samples.to_vec();
    }

    use rubato::{
        Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
    };

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Cubic,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / src_rate as f64;
    let chunk_size = 4096.min(samples.len());

    let mut resampler = match SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 1) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, src_rate, target_rate, "sinc resampler unavailable, using linear");
            return resample_linear(samples, src_rate, target_rate);
        }
    };

    // The sinc filter delays its output; zero chunks flush the tail so the
    // delayed prefix can be dropped without losing the end of the signal.
    let delay = resampler.output_delay();
    let expected_len = (samples.len() as f64 * ratio).round() as usize;
    let max_flushes = (delay as f64 / (chunk_size as f64 * ratio)).ceil() as usize + 2;
    let mut output = Vec::with_capacity(delay + expected_len + chunk_size);
    let mut pos = 0;
    let mut flushes = 0;

    while output.len() < delay + expected_len {
        let processed = if pos < samples.len() {
            let end = (pos + chunk_size).min(samples.len());
            let chunk = [&samples[pos..end]];
            pos = end;
            if chunk[0].len() == chunk_size {
                resampler.process(&chunk[..], None)
            } else {
                resampler.process_partial(Some(&chunk[..]), None)
            }
        } else if flushes < max_flushes {
            flushes += 1;
            resampler.process_partial(None::<&[&[f32]]>, None)
        } else {
            break;
        };
        match processed {
            Ok(out) => {
                if let Some(channel) = out.first() {
                    output.extend_from_slice(channel);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "sinc resampling failed, using linear");
                return resample_linear(samples, src_rate, target_rate);
            }
        }
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected_len);
    output
}

fn resample_linear(samples: &[f32], src_rate: u32, target_rate: u32) -> Vec<f32> {
    if src_rate == target_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = src_rate as f64 / target_rate as f64;
    let out_len = (samples.len() as f64 / ratio).ceil() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let src_idx = i as f64 * ratio;
            let lo = (src_idx.floor() as usize).min(last);
            let hi = (lo + 1).min(last);
            let frac = (src_idx - lo as f64) as f32;
            samples[lo] * (1.0 - frac) + samples[hi] * frac
        })
        .collect()
}
