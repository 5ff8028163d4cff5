use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;
use verse_aligner::alignment::star;
use verse_aligner::filter::FilterProgress;
use verse_aligner::text::{NormalizationTable, NormalizeOptions};
use verse_aligner::{
    ChapterKey, FilterConfig, PrecomputedScorer, QualityFilter, TextNormalizer, VerseIndex,
};

#[derive(Debug, Parser)]
#[command(name = "verse_aligner")]
#[command(about = "Prepare verse-aligned speech corpora from chapter recordings")]
#[command(long_about = "Prepare verse-aligned speech corpora from chapter recordings.\n\n\
Cutting chapters into verses needs an acoustic model, so it is driven from the \
library: implement `EmissionModel`, pass it to `SegmenterBuilder` and call \
`ChapterSegmenter::segment_book`. This binary covers text preparation and \
quality filtering of an already segmented corpus.")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Normalize text the way verses are normalized before alignment.
    Normalize(NormalizeArgs),
    /// List the chapters of a verse index with their verse counts.
    Chapters {
        #[arg(long, env = "VERSE_ALIGNER_INDEX")]
        index: PathBuf,
    },
    /// Print the wildcard-augmented token stream of one chapter as JSON.
    Encode {
        #[arg(long, env = "VERSE_ALIGNER_INDEX")]
        index: PathBuf,
        /// Chapter key such as `MAT_001`.
        #[arg(long)]
        chapter: String,
        #[arg(long, env = "VERSE_ALIGNER_LANGUAGE", default_value = "*")]
        lang: String,
        #[arg(long, env = "VERSE_ALIGNER_NORM_CONFIG")]
        norm_config: Option<PathBuf>,
    },
    /// Keep segmented verses whose score clears the threshold.
    Filter(FilterArgs),
}

#[derive(Debug, Args)]
struct NormalizeArgs {
    #[arg(long, env = "VERSE_ALIGNER_LANGUAGE", default_value = "*")]
    lang: String,
    #[arg(long, env = "VERSE_ALIGNER_NORM_CONFIG")]
    norm_config: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    keep_case: bool,
    #[arg(long, default_value_t = false)]
    keep_numbers: bool,
    #[arg(long, default_value_t = false)]
    remove_brackets: bool,
    #[arg(required = true)]
    text: Vec<String>,
}

#[derive(Debug, Args)]
struct FilterArgs {
    /// Segmented corpus root, laid out as `{book}/{chapter}/{stem}.wav`.
    #[arg(long, env = "VERSE_ALIGNER_FILTER_INPUT")]
    input_dir: PathBuf,
    #[arg(
        long,
        env = "VERSE_ALIGNER_FILTER_OUTPUT",
        default_value = "outputs/data_filtered"
    )]
    output_dir: PathBuf,
    /// JSON map from audio file stem to acceptability score.
    #[arg(long, env = "VERSE_ALIGNER_SCORES")]
    scores: PathBuf,
    #[arg(long, default_value_t = FilterConfig::DEFAULT_THRESHOLD, allow_negative_numbers = true)]
    threshold: f32,
    #[arg(long, default_value_t = false)]
    batched: bool,
    #[arg(long, default_value_t = FilterConfig::DEFAULT_BATCH_SIZE)]
    batch_size: usize,
}

fn main() {
    if let Err(message) = run() {
        eprintln!("error: {message}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Normalize(args) => normalize(args),
        Command::Chapters { index } => chapters(index),
        Command::Encode {
            index,
            chapter,
            lang,
            norm_config,
        } => encode(index, chapter, lang, norm_config),
        Command::Filter(args) => filter(args),
    }
}

fn load_normalizer(norm_config: Option<&PathBuf>) -> Result<TextNormalizer, String> {
    let table = match norm_config {
        Some(path) => NormalizationTable::from_json_file(path),
        None => NormalizationTable::builtin(),
    }
    .map_err(|e| e.to_string())?;
    TextNormalizer::new(table).map_err(|e| e.to_string())
}

fn normalize(args: NormalizeArgs) -> Result<(), String> {
    let normalizer = load_normalizer(args.norm_config.as_ref())?;
    let options = NormalizeOptions {
        lower_case: !args.keep_case,
        remove_numbers: !args.keep_numbers,
        remove_brackets: args.remove_brackets,
    };
    println!(
        "{}",
        normalizer.normalize_with(&args.text.join(" "), &args.lang, options)
    );
    Ok(())
}

fn chapters(index: PathBuf) -> Result<(), String> {
    let index = VerseIndex::load(&index).map_err(|e| e.to_string())?;
    for key in index.chapter_keys() {
        println!("{key}\t{}", index.chapter(&key).len());
    }
    Ok(())
}

fn encode(
    index: PathBuf,
    chapter: String,
    lang: String,
    norm_config: Option<PathBuf>,
) -> Result<(), String> {
    let normalizer = load_normalizer(norm_config.as_ref())?;
    let index = VerseIndex::load(&index).map_err(|e| e.to_string())?;
    let verses = index.chapter(&ChapterKey::new(chapter.as_str()));
    if verses.is_empty() {
        return Err(format!("no verses for chapter {chapter} in {}", index.book()));
    }

    let originals: Vec<&str> = verses.iter().map(|v| v.text.as_str()).collect();
    let normalized: Vec<String> = originals
        .iter()
        .map(|text| normalizer.normalize(text, &lang))
        .collect();
    let encoding = star::encode(&normalized, &originals).map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(encoding.augmented()).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn filter(args: FilterArgs) -> Result<(), String> {
    if args.batched && args.batch_size == 0 {
        return Err("--batch-size must be >= 1.".to_string());
    }
    if !args.input_dir.is_dir() {
        return Err(format!("input directory {} not found", args.input_dir.display()));
    }
    let scorer = PrecomputedScorer::from_json_file(&args.scores).map_err(|e| e.to_string())?;
    let config = FilterConfig {
        input_root: args.input_dir,
        output_root: args.output_dir,
        threshold: args.threshold,
        batched: args.batched,
        batch_size: args.batch_size,
    };
    let quality_filter = QualityFilter::new(config, &scorer).map_err(|e| e.to_string())?;

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-"),
    );
    progress.set_message("discovering...");

    let summary = quality_filter
        .run_with_progress(|event| match event {
            FilterProgress::Discovered(total) => progress.set_length(total as u64),
            FilterProgress::Processed(pair) => {
                progress.set_message(pair.chapter.clone());
                progress.inc(1);
            }
        })
        .map_err(|e| e.to_string())?;
    progress.finish_with_message("filtering complete");

    for book in &summary.books {
        println!("{}\t{} retained\t{} rejected", book.book, book.retained, book.rejected);
    }
    Ok(())
}
