use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::FilterConfig;
use crate::error::AlignmentError;
use crate::filter::audit::{DecisionWriter, RejectionLog, StatsWriter};
use crate::filter::bookkeeper::BookTracker;
use crate::pipeline::traits::AcceptabilityScorer;
use crate::types::{BookStats, Decision};

/// A segmented verse: `{root}/{book}/{chapter}/{stem}.wav` plus its `.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentPair {
    pub audio_path: PathBuf,
    pub transcript_path: PathBuf,
    pub book: String,
    pub chapter: String,
}

impl SegmentPair {
    fn from_audio(audio_path: PathBuf) -> Self {
        let transcript_path = audio_path.with_extension("txt");
        let name_of = |p: Option<&Path>| {
            p.and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        let parent = audio_path.parent();
        let chapter = name_of(parent);
        let book = name_of(parent.and_then(Path::parent));
        Self {
            audio_path,
            transcript_path,
            book,
            chapter,
        }
    }
}

/// Pairs found under the input root plus the audio files lacking a transcript.
#[derive(Debug, Default)]
pub struct Discovery {
    pub pairs: Vec<SegmentPair>,
    pub missing_transcripts: Vec<PathBuf>,
}

/// Recursively lists `.wav` files under `root` in sorted path order.
pub fn discover_pairs(root: &Path) -> Result<Discovery, AlignmentError> {
    let mut wavs = Vec::new();
    collect_wavs(root, &mut wavs)?;
    wavs.sort();

    let mut discovery = Discovery::default();
    for wav in wavs {
        let pair = SegmentPair::from_audio(wav);
        if pair.transcript_path.is_file() {
            discovery.pairs.push(pair);
        } else {
            tracing::warn!(audio = %pair.audio_path.display(), "transcript not found, skipping");
            discovery.missing_transcripts.push(pair.audio_path);
        }
    }
    Ok(discovery)
}

fn collect_wavs(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), AlignmentError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| AlignmentError::io(format!("list {}", dir.display()), e))?;
    for entry in entries {
        let path = entry
            .map_err(|e| AlignmentError::io(format!("list {}", dir.display()), e))?
            .path();
        if path.is_dir() {
            collect_wavs(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "wav") {
            out.push(path);
        }
    }
    Ok(())
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilterSummary {
    pub retained: u32,
    pub rejected: u32,
    pub missing_transcripts: usize,
    /// Pairs whose output chapter directory was already populated.
    pub already_filtered: usize,
    pub failed: usize,
    pub books: Vec<BookStats>,
}

pub enum FilterProgress<'p> {
    Discovered(usize),
    Processed(&'p SegmentPair),
}

/// Scores segmented verses and keeps those above the threshold.
pub struct QualityFilter<'a> {
    config: FilterConfig,
    scorer: &'a dyn AcceptabilityScorer,
    rejection_log: RejectionLog,
    stats: StatsWriter,
    decisions: DecisionWriter,
}

impl<'a> QualityFilter<'a> {
    pub fn new(
        config: FilterConfig,
        scorer: &'a dyn AcceptabilityScorer,
    ) -> Result<Self, AlignmentError> {
        std::fs::create_dir_all(&config.output_root).map_err(|e| {
            AlignmentError::io(format!("create {}", config.output_root.display()), e)
        })?;
        let rejection_log =
            RejectionLog::open(config.output_root.join(FilterConfig::REJECTION_LOG_FILE))?;
        let stats = StatsWriter::open(config.output_root.join(FilterConfig::STATS_FILE))?;
        let decisions =
            DecisionWriter::open(config.output_root.join(FilterConfig::DECISIONS_FILE))?;
        Ok(Self {
            config,
            scorer,
            rejection_log,
            stats,
            decisions,
        })
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    fn chapter_output_dir(&self, pair: &SegmentPair) -> PathBuf {
        self.config
            .output_root
            .join(&pair.book)
            .join(&pair.chapter)
    }

    /// Copies a retained pair into the filtered corpus or logs a rejection.
    /// Either way the score is appended to the decisions CSV.
    pub fn decide(&self, pair: &SegmentPair, score: f32) -> Result<Decision, AlignmentError> {
        let decision = Decision::from_score(score, self.config.threshold);
        match decision {
            Decision::Retained => {
                let out_dir = self.chapter_output_dir(pair);
                std::fs::create_dir_all(&out_dir)
                    .map_err(|e| AlignmentError::io(format!("create {}", out_dir.display()), e))?;
                for source in [&pair.audio_path, &pair.transcript_path] {
                    let Some(name) = source.file_name() else {
                        continue;
                    };
                    std::fs::copy(source, out_dir.join(name)).map_err(|e| {
                        AlignmentError::io(format!("copy {}", source.display()), e)
                    })?;
                }
            }
            Decision::Rejected => self.rejection_log.record(&pair.audio_path, score)?,
        }
        self.decisions.append(&pair.audio_path, score, decision)?;
        Ok(decision)
    }

    pub fn run(&self) -> Result<FilterSummary, AlignmentError> {
        self.run_with_progress(|_| {})
    }

    pub fn run_with_progress<F>(&self, mut on_progress: F) -> Result<FilterSummary, AlignmentError>
    where
        F: FnMut(FilterProgress<'_>),
    {
        let discovery = discover_pairs(&self.config.input_root)?;
        let mut summary = FilterSummary {
            missing_transcripts: discovery.missing_transcripts.len(),
            ..FilterSummary::default()
        };

        // Populated-ness is fixed at the start so chapters filled by this run
        // keep being processed.
        let mut populated: HashMap<PathBuf, bool> = HashMap::new();
        let mut pending = Vec::with_capacity(discovery.pairs.len());
        for pair in discovery.pairs {
            let out_dir = self.chapter_output_dir(&pair);
            let is_populated = *populated
                .entry(out_dir)
                .or_insert_with_key(|dir| dir_has_entries(dir));
            if is_populated {
                summary.already_filtered += 1;
            } else {
                pending.push(pair);
            }
        }
        if summary.already_filtered > 0 {
            tracing::info!(
                skipped = summary.already_filtered,
                "skipping pairs whose chapter is already filtered"
            );
        }
        on_progress(FilterProgress::Discovered(pending.len()));

        let mut tracker = BookTracker::new();
        let batch_size = if self.config.batched {
            self.config.batch_size.max(1)
        } else {
            1
        };
        for batch in pending.chunks(batch_size) {
            let scores = self.score_batch(batch);
            for (pair, score) in batch.iter().zip(scores) {
                match score {
                    Ok(score) => {
                        let decision = self.decide(pair, score)?;
                        match decision {
                            Decision::Retained => summary.retained += 1,
                            Decision::Rejected => summary.rejected += 1,
                        }
                        if let Some(stats) = tracker.record(&pair.book, decision) {
                            self.flush(stats, &mut summary)?;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            audio = %pair.audio_path.display(),
                            error = %e,
                            "scoring failed, skipping"
                        );
                        summary.failed += 1;
                    }
                }
                on_progress(FilterProgress::Processed(pair));
            }
        }
        if let Some(stats) = tracker.finish() {
            self.flush(stats, &mut summary)?;
        }

        tracing::info!(
            retained = summary.retained,
            rejected = summary.rejected,
            missing = summary.missing_transcripts,
            failed = summary.failed,
            "filtering finished"
        );
        Ok(summary)
    }

    fn score_batch(&self, batch: &[SegmentPair]) -> Vec<Result<f32, AlignmentError>> {
        let mut items = Vec::with_capacity(batch.len());
        let mut slots = Vec::with_capacity(batch.len());
        for pair in batch {
            match std::fs::read_to_string(&pair.transcript_path) {
                Ok(text) => {
                    slots.push(Ok(items.len()));
                    items.push((pair.audio_path.clone(), text));
                }
                Err(e) => slots.push(Err(AlignmentError::io(
                    format!("read {}", pair.transcript_path.display()),
                    e,
                ))),
            }
        }

        let mut scores: Vec<Option<Result<f32, AlignmentError>>> = if self.config.batched {
            self.scorer.score_batch(&items)
        } else {
            items
                .iter()
                .map(|(audio, text)| self.scorer.score(audio, text))
                .collect()
        }
        .into_iter()
        .map(Some)
        .collect();

        slots
            .into_iter()
            .map(|slot| {
                let index = slot?;
                scores
                    .get_mut(index)
                    .and_then(Option::take)
                    .unwrap_or_else(|| {
                        Err(AlignmentError::runtime(
                            "score batch",
                            "scorer returned fewer results than items",
                        ))
                    })
            })
            .collect()
    }

    fn flush(&self, stats: BookStats, summary: &mut FilterSummary) -> Result<(), AlignmentError> {
        self.stats.append(&stats)?;
        summary.books.push(stats);
        Ok(())
    }
}

fn dir_has_entries(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}
