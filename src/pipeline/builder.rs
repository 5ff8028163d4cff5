use std::path::Path;

use crate::alignment::tokenization::Dictionary;
use crate::config::SegmentationConfig;
use crate::error::AlignmentError;
use crate::pipeline::defaults::ViterbiAligner;
use crate::pipeline::segmenter::{ChapterSegmenter, SegmenterParts};
use crate::pipeline::traits::{Aligner, EmissionModel};
use crate::text::{NormalizationTable, PassthroughRomanizer, Romanizer, TextNormalizer, VersePreprocessor};

pub struct SegmenterBuilder {
    config: SegmentationConfig,
    model: Option<Box<dyn EmissionModel>>,
    aligner: Option<Box<dyn Aligner>>,
    romanizer: Option<Box<dyn Romanizer>>,
    dictionary: Option<Dictionary>,
    normalization_table: Option<NormalizationTable>,
}

impl SegmenterBuilder {
    pub fn new(config: SegmentationConfig) -> Self {
        Self {
            config,
            model: None,
            aligner: None,
            romanizer: None,
            dictionary: None,
            normalization_table: None,
        }
    }

    pub fn with_emission_model(mut self, model: Box<dyn EmissionModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_aligner(mut self, aligner: Box<dyn Aligner>) -> Self {
        self.aligner = Some(aligner);
        self
    }

    pub fn with_romanizer(mut self, romanizer: Box<dyn Romanizer>) -> Self {
        self.romanizer = Some(romanizer);
        self
    }

    pub fn with_dictionary(mut self, dictionary: Dictionary) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    pub fn with_normalization_table(mut self, table: NormalizationTable) -> Self {
        self.normalization_table = Some(table);
        self
    }

    pub fn build(self) -> Result<ChapterSegmenter, AlignmentError> {
        let model = self
            .model
            .ok_or_else(|| AlignmentError::config("segmenter needs an emission model"))?;
        if !(self.config.window_seconds > 0.0) {
            return Err(AlignmentError::config(format!(
                "window length must be positive, got {}s",
                self.config.window_seconds
            )));
        }

        let dictionary = match self.dictionary {
            Some(dictionary) => dictionary,
            None if self.config.vocab_path.is_empty() => {
                return Err(AlignmentError::config(
                    "segmenter needs a dictionary or a vocabulary path",
                ));
            }
            None => Dictionary::from_json_file(Path::new(&self.config.vocab_path))?,
        };
        if !dictionary.has_wildcard() {
            tracing::warn!("dictionary has no wildcard token; verse anchors will not be aligned");
        }

        let table = match self.normalization_table {
            Some(table) => table,
            None => NormalizationTable::builtin()?,
        };
        let preprocessor = VersePreprocessor::new(
            TextNormalizer::new(table)?,
            self.romanizer
                .unwrap_or_else(|| Box::new(PassthroughRomanizer)),
        );

        Ok(ChapterSegmenter::from_parts(SegmenterParts {
            config: self.config,
            model,
            aligner: self.aligner.unwrap_or_else(|| Box::new(ViterbiAligner)),
            dictionary,
            preprocessor,
        }))
    }
}
