use std::collections::HashMap;
use std::path::{Path, PathBuf};

use candle_core::{Device, Tensor};
use verse_aligner::alignment::Dictionary;
use verse_aligner::audio::{load_wav, write_wav};
use verse_aligner::pipeline::segmenter::ChapterStatus;
use verse_aligner::{
    AlignmentError, EmissionModel, FilterConfig, PrecomputedScorer, QualityFilter,
    SegmentationConfig, SegmenterBuilder, SkipReason, VerseIndex, VerseOutcome,
};

const VOCAB: &str = "-abcdefghijklmnopqrstuvwxyz'*";
const SAMPLE_RATE: u32 = 16_000;

/// One frame per 320 samples with a flat distribution over the vocabulary.
struct FlatModel {
    vocab: usize,
}

impl EmissionModel for FlatModel {
    fn sample_rate_hz(&self) -> u32 {
        SAMPLE_RATE
    }

    fn infer(&self, window: &Tensor) -> Result<Tensor, AlignmentError> {
        let (_, len) = window
            .dims2()
            .map_err(|e| AlignmentError::invalid_input(e.to_string()))?;
        let frames = len / 320;
        let value = -(self.vocab as f32).ln();
        Tensor::from_vec(
            vec![value; frames * self.vocab],
            (1, frames, self.vocab),
            &Device::Cpu,
        )
        .map_err(|e| AlignmentError::invalid_input(e.to_string()))
    }
}

fn dictionary() -> Dictionary {
    let ids = VOCAB.chars().enumerate().map(|(i, c)| (c, i)).collect();
    Dictionary::new(ids, 0)
}

fn verse_index(dir: &Path) -> VerseIndex {
    let path = dir.join("MAT.json");
    std::fs::write(
        &path,
        r#"[
            {"numVerset": "MAT.1.1", "verset": "In the beginning,"},
            {"numVerset": "MAT.1.2", "verset": "ΩΨ"},
            {"numVerset": "MAT.1.3", "verset": "And the earth was void."},
            {"numVerset": "MAT.2.1", "verset": "Now when Jesus was born"}
        ]"#,
    )
    .unwrap();
    VerseIndex::load(&path).unwrap()
}

fn write_tone(path: &Path, samples: usize) {
    let tone: Vec<f32> = (0..samples).map(|i| (i as f32 * 0.03).sin() * 0.3).collect();
    write_wav(path, &tone, SAMPLE_RATE).unwrap();
}

fn segmenter(output_root: &Path) -> verse_aligner::ChapterSegmenter {
    let config = SegmentationConfig {
        output_root: output_root.to_path_buf(),
        window_seconds: 1.0,
        ..SegmentationConfig::default()
    };
    SegmenterBuilder::new(config)
        .with_emission_model(Box::new(FlatModel {
            vocab: VOCAB.chars().count(),
        }))
        .with_dictionary(dictionary())
        .build()
        .unwrap()
}

fn sorted_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn chapter_is_cut_into_verse_files_and_not_redone() {
    let work = tempfile::tempdir().unwrap();
    let index = verse_index(work.path());
    let audio_path = work.path().join("MAT_001.wav");
    write_tone(&audio_path, 3 * SAMPLE_RATE as usize);
    let out = work.path().join("segments");
    let segmenter = segmenter(&out);

    let report = segmenter.segment_chapter(&audio_path, &index).unwrap();
    assert_eq!(report.status, ChapterStatus::Segmented);
    let ids: Vec<&str> = report.outcomes.iter().map(VerseOutcome::verse_id).collect();
    assert_eq!(ids, ["MAT.1.1", "MAT.1.2", "MAT.1.3"]);
    assert_eq!(
        report.outcomes[1],
        VerseOutcome::Skipped {
            verse_id: "MAT.1.2".into(),
            reason: SkipReason::UnresolvedSpans
        }
    );

    let chapter_dir = out.join("MAT").join("MAT_001");
    assert_eq!(
        sorted_files(&chapter_dir),
        ["MAT_001_001.txt", "MAT_001_001.wav", "MAT_001_003.txt", "MAT_001_003.wav"]
    );
    assert_eq!(
        std::fs::read_to_string(chapter_dir.join("MAT_001_003.txt")).unwrap(),
        "And the earth was void."
    );

    let first = report.outcomes[0].segment().unwrap();
    let third = report.outcomes[2].segment().unwrap();
    assert!(first.start_sample < first.end_sample);
    assert!(first.end_sample <= third.start_sample);
    assert!(third.end_sample <= 3 * SAMPLE_RATE as usize);

    let clip = load_wav(&chapter_dir.join("MAT_001_001.wav")).unwrap();
    assert_eq!(clip.sample_rate_hz, SAMPLE_RATE);
    assert_eq!(clip.samples.len(), first.end_sample - first.start_sample);

    let again = segmenter.segment_chapter(&audio_path, &index).unwrap();
    assert_eq!(again.status, ChapterStatus::AlreadySegmented);
    assert!(again.written.is_empty());
    assert_eq!(sorted_files(&chapter_dir).len(), 4);
}

#[test]
fn book_run_continues_past_broken_chapters() {
    let work = tempfile::tempdir().unwrap();
    let index = verse_index(work.path());
    let audio_dir = work.path().join("MAT");
    std::fs::create_dir_all(&audio_dir).unwrap();
    write_tone(&audio_dir.join("MAT_001.wav"), 2 * SAMPLE_RATE as usize + 399);
    std::fs::write(audio_dir.join("MAT_002.wav"), b"not a wav file").unwrap();
    write_tone(&audio_dir.join("MAT_009.wav"), SAMPLE_RATE as usize);

    let out = work.path().join("segments");
    let report = segmenter(&out).segment_book(&audio_dir, &index).unwrap();

    let statuses: Vec<(String, ChapterStatus)> = report
        .chapters
        .iter()
        .map(|c| (c.chapter.to_string(), c.status))
        .collect();
    assert_eq!(
        statuses,
        [
            ("MAT_001".to_string(), ChapterStatus::Segmented),
            ("MAT_009".to_string(), ChapterStatus::NoVerses),
        ]
    );
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].0.ends_with("MAT_002.wav"));
    // The 399-sample tail is below the model minimum and never reaches it.
    assert!(report.chapters[0].aligned_count() >= 1);
}

fn segmented_corpus(root: &Path) {
    let chapter = root.join("MAT").join("MAT_001");
    std::fs::create_dir_all(&chapter).unwrap();
    for (stem, text) in [("MAT_001_001", "In the beginning"), ("MAT_001_002", "And the earth")] {
        write_tone(&chapter.join(format!("{stem}.wav")), 800);
        std::fs::write(chapter.join(format!("{stem}.txt")), text).unwrap();
    }
    let other = root.join("MRK").join("MRK_001");
    std::fs::create_dir_all(&other).unwrap();
    write_tone(&other.join("MRK_001_001.wav"), 800);
    std::fs::write(other.join("MRK_001_001.txt"), "The beginning").unwrap();
}

fn scorer() -> PrecomputedScorer {
    PrecomputedScorer::new(HashMap::from([
        ("MAT_001_001".to_string(), -0.1),
        ("MAT_001_002".to_string(), -0.35),
        ("MRK_001_001".to_string(), -0.25),
    ]))
}

/// Returns the book statistics and the per-pair decision rows.
fn run_filter(input: &Path, output: PathBuf, batched: bool) -> (String, String) {
    let scorer = scorer();
    let config = FilterConfig {
        input_root: input.to_path_buf(),
        output_root: output.clone(),
        batched,
        batch_size: 2,
        ..FilterConfig::default()
    };
    QualityFilter::new(config, &scorer).unwrap().run().unwrap();
    (
        std::fs::read_to_string(output.join(FilterConfig::STATS_FILE)).unwrap(),
        std::fs::read_to_string(output.join(FilterConfig::DECISIONS_FILE)).unwrap(),
    )
}

#[test]
fn filter_keeps_verses_above_threshold_and_records_books() {
    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("segments");
    segmented_corpus(&input);
    let output = work.path().join("filtered");

    let (history, decisions) = run_filter(&input, output.clone(), false);
    assert_eq!(history, "Book,Retained,Rejected\nMAT,1,1\nMRK,0,1\n");
    assert_eq!(
        decisions,
        "filename,folder,probability_difference,status\n\
         MAT_001_001.wav,MAT_001,-0.1000,Retained\n\
         MAT_001_002.wav,MAT_001,-0.3500,Rejected\n\
         MRK_001_001.wav,MRK_001,-0.2500,Rejected\n"
    );

    assert!(output.join("MAT/MAT_001/MAT_001_001.wav").is_file());
    assert!(output.join("MAT/MAT_001/MAT_001_001.txt").is_file());
    assert!(!output.join("MAT/MAT_001/MAT_001_002.wav").exists());

    let log = std::fs::read_to_string(output.join(FilterConfig::REJECTION_LOG_FILE)).unwrap();
    let rejected: Vec<&str> = log.lines().filter(|l| l.contains("Rejected:")).collect();
    assert_eq!(rejected.len(), 2);
    assert!(rejected[0].contains("MAT_001_002.wav (Difference: -0.35)"));
}

#[test]
fn batched_and_per_file_filtering_agree() {
    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("segments");
    segmented_corpus(&input);

    let per_file = run_filter(&input, work.path().join("per_file"), false);
    let batched = run_filter(&input, work.path().join("batched"), true);
    assert_eq!(per_file, batched);
    assert_eq!(
        sorted_files(&work.path().join("per_file/MAT/MAT_001")),
        sorted_files(&work.path().join("batched/MAT/MAT_001"))
    );
}
