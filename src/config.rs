use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SegmentationConfig {
    pub output_root: PathBuf,
    /// Path to a `{char: id}` JSON vocabulary. Ignored when the builder is
    /// handed a dictionary directly.
    pub vocab_path: String,
    /// ISO 639-3 code used for romanization and normalization.
    pub language: String,
    pub window_seconds: f32,
}

impl SegmentationConfig {
    pub const DEFAULT_WINDOW_SECONDS: f32 = 15.0;
    pub const DEFAULT_LANGUAGE: &'static str = "*";
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("outputs/segments"),
            vocab_path: String::new(),
            language: Self::DEFAULT_LANGUAGE.to_string(),
            window_seconds: Self::DEFAULT_WINDOW_SECONDS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Root of a segmented corpus laid out as `{book}/{chapter}/{stem}.wav|.txt`.
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    pub threshold: f32,
    pub batched: bool,
    pub batch_size: usize,
}

impl FilterConfig {
    pub const DEFAULT_THRESHOLD: f32 = -0.2;
    pub const DEFAULT_BATCH_SIZE: usize = 16;
    pub const REJECTION_LOG_FILE: &'static str = "log_file.txt";
    pub const STATS_FILE: &'static str = "history.csv";
    pub const DECISIONS_FILE: &'static str = "results.csv";
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            input_root: PathBuf::new(),
            output_root: PathBuf::from("outputs/data_filtered"),
            threshold: Self::DEFAULT_THRESHOLD,
            batched: false,
            batch_size: Self::DEFAULT_BATCH_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segmentation_config_default() {
        let config = SegmentationConfig::default();
        assert!(config.vocab_path.is_empty());
        assert_eq!(config.language, "*");
        assert_eq!(
            config.window_seconds,
            SegmentationConfig::DEFAULT_WINDOW_SECONDS
        );
    }

    #[test]
    fn filter_config_default() {
        let config = FilterConfig::default();
        assert_eq!(config.threshold, -0.2);
        assert!(!config.batched);
        assert_eq!(config.batch_size, 16);
    }
}
