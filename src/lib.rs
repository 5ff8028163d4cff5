pub mod alignment;
pub mod audio;
pub mod config;
pub mod corpus;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod text;
pub mod types;

pub use config::{FilterConfig, SegmentationConfig};
pub use corpus::{ChapterKey, VerseIndex};
pub use error::AlignmentError;
pub use filter::{PrecomputedScorer, QualityFilter};
pub use pipeline::builder::SegmenterBuilder;
pub use pipeline::segmenter::ChapterSegmenter;
pub use pipeline::traits::{AcceptabilityScorer, Aligner, EmissionModel};
pub use text::TextNormalizer;
pub use types::{BookStats, Decision, Segment, SkipReason, TokenSpan, VerseOutcome, VerseRecord};
