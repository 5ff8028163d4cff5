use crate::alignment::viterbi::FrameAlignment;
use crate::error::AlignmentError;
use crate::types::TokenSpan;

/// Collapses a frame-level path into one span per emitted token.
///
/// Consecutive frames with the same non-blank label form one span; a blank
/// between two identical labels starts a new one. The span score is the mean
/// frame probability.
pub fn merge_tokens(alignment: &FrameAlignment, blank_id: usize) -> Vec<TokenSpan> {
    let mut spans = Vec::new();
    let mut start = 0usize;
    let labels = &alignment.labels;

    for t in 0..=labels.len() {
        let boundary = t == labels.len() || (t > 0 && labels[t] != labels[t - 1]);
        if !boundary {
            continue;
        }
        if t > start && labels[start] != blank_id {
            let probs = &alignment.log_probs[start..t];
            let score = probs.iter().map(|lp| lp.exp()).sum::<f32>() / probs.len() as f32;
            spans.push(TokenSpan {
                token: labels[start],
                start,
                end: t,
                score,
            });
        }
        start = t;
    }
    spans
}

/// Splits a flat span list into consecutive groups of the given lengths.
pub fn unflatten(
    spans: Vec<TokenSpan>,
    lengths: &[usize],
) -> Result<Vec<Vec<TokenSpan>>, AlignmentError> {
    let expected: usize = lengths.iter().sum();
    if expected != spans.len() {
        return Err(AlignmentError::runtime(
            "unflatten",
            format!("{} spans for {expected} tokens", spans.len()),
        ));
    }
    let mut rest = spans.into_iter();
    Ok(lengths
        .iter()
        .map(|&n| rest.by_ref().take(n).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alignment(labels: &[usize]) -> FrameAlignment {
        FrameAlignment {
            labels: labels.to_vec(),
            log_probs: vec![0.5f32.ln(); labels.len()],
        }
    }

    #[test]
    fn merges_runs_and_skips_blanks() {
        let spans = merge_tokens(&alignment(&[0, 3, 3, 0, 0, 5, 0]), 0);
        let got: Vec<(usize, usize, usize)> =
            spans.iter().map(|s| (s.token, s.start, s.end)).collect();
        assert_eq!(got, vec![(3, 1, 3), (5, 5, 6)]);
        assert!((spans[0].score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn blank_splits_repeated_tokens() {
        let spans = merge_tokens(&alignment(&[2, 2, 0, 2]), 0);
        assert_eq!(spans.len(), 2);
        assert_eq!((spans[1].start, spans[1].end), (3, 4));
    }

    #[test]
    fn span_score_is_mean_probability() {
        let a = FrameAlignment {
            labels: vec![1, 1],
            log_probs: vec![0.2f32.ln(), 0.6f32.ln()],
        };
        let spans = merge_tokens(&a, 0);
        assert!((spans[0].score - 0.4).abs() < 1e-6);
    }

    #[test]
    fn unflatten_keeps_empty_groups() {
        let spans = merge_tokens(&alignment(&[1, 2, 3]), 0);
        let groups = unflatten(spans, &[1, 0, 2]).unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].len(), 1);
        assert!(groups[1].is_empty());
        assert_eq!(groups[2][1].token, 3);
    }

    #[test]
    fn unflatten_rejects_count_mismatch() {
        let spans = merge_tokens(&alignment(&[1, 2]), 0);
        assert!(unflatten(spans, &[3]).is_err());
    }
}
