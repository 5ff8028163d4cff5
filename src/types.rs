use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerseRecord {
    pub verse_id: String,
    pub text: String,
}

/// One token's run of frames, as merged from a frame-level CTC path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenSpan {
    pub token: usize,
    /// Frame interval is [start, end), i.e. start inclusive/end exclusive.
    pub start: usize,
    pub end: usize,
    /// Mean per-frame probability over the span.
    pub score: f32,
}

impl TokenSpan {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A verse's slice of the original recording, in input sample-rate units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub verse_id: String,
    /// Sample interval is [start_sample, end_sample).
    pub start_sample: usize,
    pub end_sample: usize,
    pub transcript: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The verse's word cursor ran past the aligned words.
    EmptySpans,
    /// At least one word of the verse received no token span.
    UnresolvedSpans,
    /// Frame-to-sample scaling produced an unusable interval.
    OffsetOutOfRange,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptySpans => "empty_spans",
            Self::UnresolvedSpans => "unresolved_spans",
            Self::OffsetOutOfRange => "offset_out_of_range",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VerseOutcome {
    Aligned(Segment),
    Skipped { verse_id: String, reason: SkipReason },
}

impl VerseOutcome {
    pub fn verse_id(&self) -> &str {
        match self {
            Self::Aligned(segment) => &segment.verse_id,
            Self::Skipped { verse_id, .. } => verse_id,
        }
    }

    pub fn segment(&self) -> Option<&Segment> {
        match self {
            Self::Aligned(segment) => Some(segment),
            Self::Skipped { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Retained,
    Rejected,
}

impl Decision {
    /// Higher scores are better; ties with the threshold are rejected.
    pub fn from_score(score: f32, threshold: f32) -> Self {
        if score > threshold {
            Self::Retained
        } else {
            Self::Rejected
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookStats {
    pub book: String,
    pub retained: u32,
    pub rejected: u32,
}

impl BookStats {
    pub fn new(book: impl Into<String>) -> Self {
        Self {
            book: book.into(),
            retained: 0,
            rejected: 0,
        }
    }

    pub fn total(&self) -> u32 {
        self.retained + self.rejected
    }
}
