pub mod norm_config;
pub mod normalize;
pub mod romanize;

/// Placeholder that aligns against anything: inserted between verses and in
/// place of bare numbers.
pub const WILDCARD: char = '*';
pub const WILDCARD_TOKEN: &str = "*";

pub use norm_config::{NormalizationConfig, NormalizationTable, UnicodeForm};
pub use normalize::{NormalizeOptions, TextNormalizer};
pub use romanize::{normalize_romanized, PassthroughRomanizer, Romanizer, VersePreprocessor};
