pub mod audit;
pub mod bookkeeper;
pub mod precomputed;
pub mod quality;

pub use bookkeeper::BookTracker;
pub use precomputed::PrecomputedScorer;
pub use quality::{discover_pairs, FilterProgress, FilterSummary, QualityFilter, SegmentPair};
