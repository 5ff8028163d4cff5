use crate::alignment::spans::merge_tokens;
use crate::error::AlignmentError;
use crate::types::TokenSpan;

/// Best CTC path: one label and its log-probability per emission frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAlignment {
    pub labels: Vec<usize>,
    pub log_probs: Vec<f32>,
}

impl FrameAlignment {
    pub fn num_frames(&self) -> usize {
        self.labels.len()
    }

    /// Per-frame probabilities along the path.
    pub fn frame_probabilities(&self) -> Vec<f32> {
        self.log_probs.iter().map(|lp| lp.exp()).collect()
    }

    pub fn token_spans(&self, blank_id: usize) -> Vec<TokenSpan> {
        merge_tokens(self, blank_id)
    }
}

/// Frames a CTC path needs for `targets`: one per token plus one blank
/// between each pair of identical neighbours.
pub fn required_frames(targets: &[usize]) -> usize {
    let repeats = targets.windows(2).filter(|w| w[0] == w[1]).count();
    targets.len() + repeats
}

/// Aligns `targets` to `log_probs` (`[frames][vocab]`).
pub fn forced_align(
    log_probs: &[Vec<f32>],
    targets: &[usize],
    blank_id: usize,
) -> Result<FrameAlignment, AlignmentError> {
    if targets.is_empty() {
        return Err(AlignmentError::invalid_input("cannot align an empty target sequence"));
    }
    let vocab = log_probs.first().map_or(0, Vec::len);
    if let Some(bad) = targets.iter().chain(std::iter::once(&blank_id)).find(|&&t| t >= vocab) {
        return Err(AlignmentError::invalid_input(format!(
            "token id {bad} outside emission vocabulary of {vocab}"
        )));
    }
    if let Some(frame) = log_probs.iter().position(|row| row.len() != vocab) {
        return Err(AlignmentError::invalid_input(format!(
            "emission frame {frame} has {} classes, expected {vocab}",
            log_probs[frame].len()
        )));
    }

    let required = required_frames(targets);
    if log_probs.len() < required {
        return Err(AlignmentError::TargetsTooLong {
            targets: targets.len(),
            required,
            frames: log_probs.len(),
        });
    }

    let mut states = Vec::with_capacity(2 * targets.len() + 1);
    states.push(blank_id);
    for &t in targets {
        states.push(t);
        states.push(blank_id);
    }

    let path = viterbi_path(log_probs, &states);
    let labels: Vec<usize> = path.iter().map(|&(s, _)| states[s]).collect();
    let scores = path
        .iter()
        .zip(&labels)
        .map(|(&(_, t), &label)| log_probs[t][label])
        .collect();
    Ok(FrameAlignment {
        labels,
        log_probs: scores,
    })
}

/// Viterbi over a blank-interleaved state sequence. Returns `(state, frame)`
/// for every frame.
fn viterbi_path(log_probs: &[Vec<f32>], states: &[usize]) -> Vec<(usize, usize)> {
    let t_len = log_probs.len();
    let s_len = states.len();
    if t_len == 0 || s_len == 0 {
        return Vec::new();
    }

    let mut prev = vec![f32::NEG_INFINITY; s_len];
    let mut curr = vec![f32::NEG_INFINITY; s_len];
    let mut bp = vec![0u8; t_len * s_len];

    prev[0] = log_probs[0][states[0]];
    if s_len > 1 {
        prev[1] = log_probs[0][states[1]];
    }

    let mut prev_start = 0usize;
    let mut prev_end = if s_len > 1 { 1 } else { 0 };
    let final_floor_state = s_len.saturating_sub(2);

    for t in 1..t_len {
        let row = &log_probs[t];
        let remaining = t_len - 1 - t;
        let curr_start = final_floor_state.saturating_sub(2 * remaining);
        let curr_end = (2 * t + 1).min(s_len - 1);

        curr.fill(f32::NEG_INFINITY);
        let bp_offset = t * s_len;
        for s in curr_start..=curr_end {
            let (best, step) = best_transition(&prev, s, prev_start, prev_end, states);
            curr[s] = best + row[states[s]];
            bp[bp_offset + s] = step;
        }

        std::mem::swap(&mut prev, &mut curr);
        prev_start = curr_start;
        prev_end = curr_end;
    }

    let mut s = s_len - 1;
    if s_len >= 2 && prev[s_len - 2] > prev[s_len - 1] {
        s = s_len - 2;
    }

    let mut path = Vec::with_capacity(t_len);
    path.push((s, t_len - 1));
    for t in (1..t_len).rev() {
        s = match bp[t * s_len + s] {
            1 => s.saturating_sub(1),
            2 => s.saturating_sub(2),
            _ => s,
        };
        path.push((s, t - 1));
    }
    path.reverse();
    path
}

#[inline(always)]
fn best_transition(
    prev: &[f32],
    s: usize,
    prev_start: usize,
    prev_end: usize,
    states: &[usize],
) -> (f32, u8) {
    let in_window = |p: usize| p >= prev_start && p <= prev_end;
    let mut best = f32::NEG_INFINITY;
    let mut step = 0u8;

    if in_window(s) {
        best = prev[s];
    }
    if s >= 1 && in_window(s - 1) && prev[s - 1] > best {
        best = prev[s - 1];
        step = 1;
    }
    // Skipping the blank is only legal between distinct labels.
    if s >= 2 && states[s] != states[s - 2] && in_window(s - 2) && prev[s - 2] > best {
        best = prev[s - 2];
        step = 2;
    }

    (best, step)
}
