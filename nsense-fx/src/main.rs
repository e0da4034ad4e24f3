//! nsense-fx - feature pipeline command line
//!
//! Dataset inspection, feature extraction, epoch dry-runs and dataset
//! tooling on top of the `nsense_fx` library.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use nsense_common::config::{resolve_data_root, write_toml_config, ConfigResolver, TomlConfig};
use nsense_common::{LabelSpace, Note};
use nsense_fx::dataset::{
    import_nsynth, split_dataset, write_manifest, AudioFileScanner, BatchGenerator, DatasetIndex,
    GeneratorMode, SplitRatios,
};
use nsense_fx::synth::{write_note_set, SynthSpec};
use nsense_fx::{FeaturePipeline, PipelineConfig};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", ",
    env!("BUILD_PROFILE"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

/// Command-line arguments for nsense-fx
#[derive(Parser, Debug)]
#[command(name = "nsense-fx")]
#[command(about = "Single-note audio feature pipeline")]
#[command(version, long_version = LONG_VERSION)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index a dataset root and report label counts
    Scan {
        #[arg(long)]
        data_root: Option<PathBuf>,
    },
    /// Extract features for one file (inference path, no augmentation)
    Extract {
        file: PathBuf,
        /// Print the full tensor as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run every batch of one or more epochs and report batch statistics
    Epoch {
        #[arg(long)]
        data_root: Option<PathBuf>,
        /// Apply augmentation
        #[arg(long)]
        train: bool,
        #[arg(long, default_value_t = 1)]
        epochs: u64,
        /// Overrides the configured seed
        #[arg(long)]
        seed: Option<u64>,
        /// Process each batch's samples on the rayon pool
        #[arg(long)]
        parallel: bool,
    },
    /// Copy a dataset into seeded train/validation/test splits
    Split {
        source: PathBuf,
        dest: PathBuf,
        #[arg(long, default_value_t = 0.70)]
        train: f64,
        #[arg(long, default_value_t = 0.15)]
        val: f64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Write a JSON manifest for a dataset split
    Manifest { root: PathBuf, out: PathBuf },
    /// Copy keyboard and string notes from an extracted NSynth split
    Import {
        /// Directory holding examples.json and audio/
        nsynth_dir: PathBuf,
        dest: PathBuf,
    },
    /// Write synthetic harmonic notes for every instrument
    Synth {
        dest: PathBuf,
        /// Comma-separated note names
        #[arg(long, value_delimiter = ',', default_value = "C4,D4,E4,F4,G4")]
        notes: Vec<String>,
    },
    /// Write the default configuration as TOML
    InitConfig { path: PathBuf },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let loaded = ConfigResolver::new(args.config.clone())
        .resolve()
        .context("Failed to load configuration")?;
    nsense_common::logging::init_tracing(&loaded.config.logging)
        .context("Failed to initialize logging")?;

    info!(source = ?loaded.source, "nsense-fx {}", env!("CARGO_PKG_VERSION"));

    let toml = loaded.config;
    match args.command {
        Command::Scan { data_root } => scan(&toml, data_root.as_deref()),
        Command::Extract { file, json } => extract(&toml, &file, json),
        Command::Epoch {
            data_root,
            train,
            epochs,
            seed,
            parallel,
        } => epoch(&toml, data_root.as_deref(), train, epochs, seed, parallel),
        Command::Split {
            source,
            dest,
            train,
            val,
            seed,
        } => split(&toml, &source, &dest, train, val, seed),
        Command::Manifest { root, out } => manifest(&toml, &root, &out),
        Command::Import { nsynth_dir, dest } => import(&nsynth_dir, &dest),
        Command::Synth { dest, notes } => synth(&toml, &dest, &notes),
        Command::InitConfig { path } => {
            write_toml_config(&TomlConfig::default(), &path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote default configuration to {}", path.display());
            Ok(())
        }
    }
}

fn pipeline_config(toml: &TomlConfig) -> Result<PipelineConfig> {
    PipelineConfig::from_toml(toml).context("Invalid pipeline configuration")
}

fn scanner(config: &PipelineConfig) -> AudioFileScanner {
    AudioFileScanner::new(&config.dataset.extensions)
}

fn scan(toml: &TomlConfig, data_root: Option<&Path>) -> Result<()> {
    let config = pipeline_config(toml)?;
    let root = resolve_data_root(data_root, toml);
    let index = DatasetIndex::build(&root, &scanner(&config))
        .with_context(|| format!("Failed to index {}", root.display()))?;

    println!("Dataset: {}", root.display());
    println!("Samples: {}", index.len());
    for (instrument, count) in index.counts_by_instrument() {
        println!("  {:<16} {}", instrument, count);
    }
    let notes = index.counts_by_note();
    if !notes.is_empty() {
        println!("Notes:");
        for (note, count) in notes {
            println!("  {:<4} (MIDI {}) {}", note, note.midi(), count);
        }
    }
    if !index.skipped().is_empty() {
        println!("Skipped: {}", index.skipped().len());
        for skipped in index.skipped() {
            println!("  {}: {}", skipped.path.display(), skipped.reason);
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ExtractReport {
    file: PathBuf,
    shape: [usize; 3],
    degenerate: bool,
    values: Vec<Vec<f32>>,
}

fn extract(toml: &TomlConfig, file: &Path, json: bool) -> Result<()> {
    let pipeline = FeaturePipeline::new(pipeline_config(toml)?)?;
    let extracted = pipeline
        .process_file(file)
        .with_context(|| format!("Failed to extract features from {}", file.display()))?;
    let tensor = &extracted.tensor;

    if json {
        let report = ExtractReport {
            file: file.to_path_buf(),
            shape: tensor.shape(),
            degenerate: extracted.degenerate,
            values: tensor.spectrogram().to_nested(),
        };
        println!("{}", serde_json::to_string(&report)?);
        return Ok(());
    }

    let (min, max) = tensor.spectrogram().min_max();
    let sum: f64 = tensor.as_slice().iter().map(|&v| v as f64).sum();
    let mean = sum / tensor.len().max(1) as f64;
    println!("File:       {}", file.display());
    println!("Shape:      {:?}", tensor.shape());
    println!("Range:      [{:.4}, {:.4}]", min, max);
    println!("Mean:       {:.4}", mean);
    println!("Degenerate: {}", extracted.degenerate);
    Ok(())
}

fn epoch(
    toml: &TomlConfig,
    data_root: Option<&Path>,
    train: bool,
    epochs: u64,
    seed: Option<u64>,
    parallel: bool,
) -> Result<()> {
    let mut config = pipeline_config(toml)?;
    if seed.is_some() {
        config.dataset.seed = seed;
    }

    let root = resolve_data_root(data_root, toml);
    let index = DatasetIndex::build(&root, &scanner(&config))
        .with_context(|| format!("Failed to index {}", root.display()))?;
    if index.is_empty() {
        bail!("No labeled samples found under {}", root.display());
    }

    let dataset_config = config.dataset.clone();
    let pipeline = Arc::new(FeaturePipeline::new(config)?);
    let mode = if train {
        GeneratorMode::Training
    } else {
        GeneratorMode::Evaluation
    };
    let mut generator = BatchGenerator::new(index, pipeline, &dataset_config, mode)?;

    println!(
        "{} samples, {} batches per epoch, seed {}",
        generator.sample_count(),
        generator.len(),
        generator.seed()
    );

    for _ in 0..epochs {
        let mut produced = 0usize;
        let mut skipped = 0usize;
        for i in 0..generator.len() {
            let batch = if parallel {
                generator.get_parallel(i)?
            } else {
                generator.get(i)?
            };
            info!(
                epoch = generator.epoch(),
                batch = i,
                size = batch.len(),
                skipped = batch.skipped,
                "Batch ready"
            );
            produced += batch.len();
            skipped += batch.skipped;
        }
        println!(
            "Epoch {}: {} samples, {} skipped",
            generator.epoch(),
            produced,
            skipped
        );
        generator.reshuffle();
    }
    Ok(())
}

fn split(
    toml: &TomlConfig,
    source: &Path,
    dest: &Path,
    train: f64,
    val: f64,
    seed: u64,
) -> Result<()> {
    let config = pipeline_config(toml)?;
    let ratios = SplitRatios::new(train, val)?;
    let summary = split_dataset(source, dest, ratios, seed, &scanner(&config))
        .with_context(|| format!("Failed to split {}", source.display()))?;
    println!(
        "train {}, validation {}, test {}",
        summary.train, summary.validation, summary.test
    );
    Ok(())
}

fn manifest(toml: &TomlConfig, root: &Path, out: &Path) -> Result<()> {
    let config = pipeline_config(toml)?;
    let index = DatasetIndex::build(root, &scanner(&config))
        .with_context(|| format!("Failed to index {}", root.display()))?;
    let rows = write_manifest(&index, out)
        .with_context(|| format!("Failed to write {}", out.display()))?;
    println!("{} samples -> {}", rows, out.display());
    Ok(())
}

fn import(nsynth_dir: &Path, dest: &Path) -> Result<()> {
    let summary = import_nsynth(nsynth_dir, dest)
        .with_context(|| format!("Failed to import {}", nsynth_dir.display()))?;
    for (instrument, count) in &summary.copied {
        println!("  {:<16} {}", instrument, count);
    }
    println!(
        "Copied {} files ({} out of range, {} other families, {} missing audio)",
        summary.total_copied(),
        summary.out_of_range,
        summary.other_family,
        summary.missing_audio
    );
    Ok(())
}

fn synth(toml: &TomlConfig, dest: &Path, names: &[String]) -> Result<()> {
    let notes = names
        .iter()
        .map(|name| name.trim().parse::<Note>())
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid note name")?;
    if notes.is_empty() {
        bail!("No notes given (choose from {} names, C3..B5)", Note::COUNT);
    }

    let spec = SynthSpec {
        sample_rate: toml.audio.sample_rate,
        duration_seconds: toml.audio.duration_seconds as f32,
    };
    let written = write_note_set(dest, &notes, &spec)?;
    println!("Wrote {} files under {}", written.len(), dest.display());
    Ok(())
}
