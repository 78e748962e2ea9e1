use anyhow::{Context, Result};
use clap::Parser;
use img_shrink::batch::BatchResult;
use img_shrink::cli::{Args, Commands, CommonArgs};
use img_shrink::constants::{
    COMPRESSED_SIZE_PREFIX, DEFAULT_QUALITY, ERROR_PREFIX, INFO_PREFIX, ORIGINAL_SIZE_PREFIX,
    PROGRESS_BAR_TEMPLATE, SUCCESS_PREFIX, WARNING_PREFIX,
};
use img_shrink::record::RecordStatus;
use img_shrink::{
    collect_dropped, expand_inputs, format_bytes, format_reduction, logger, Collection,
    CompressionOptions, IntakeLimits, Observer, Quality, RecordId, Workspace,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(args.quiet, args.verbose);

    match args.command {
        Commands::Compress { common, quality } => {
            let quality = Quality::new(quality.unwrap_or(DEFAULT_QUALITY))
                .context("Invalid --quality")?;
            run_compress(&common, quality, args.quiet)
        }
        Commands::Sweep { common, qualities } => {
            let qualities = qualities
                .into_iter()
                .map(Quality::new)
                .collect::<img_shrink::Result<Vec<_>>>()
                .context("Invalid --quality")?;
            run_sweep(&common, &qualities, args.quiet)
        }
    }
}

/// Drives an indicatif bar from workspace events.
struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        if let Ok(style) = ProgressStyle::default_bar().template(PROGRESS_BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("#>-"));
        }
        Self { bar }
    }
}

impl Observer for ProgressObserver {
    fn collection_changed(&self, collection: &Collection) {
        let in_flight = collection.count_with_status(RecordStatus::Compressing);
        if in_flight > 0 {
            self.bar.reset();
            self.bar.set_length(in_flight as u64);
            self.bar.set_message("compressing");
        } else {
            self.bar.finish_and_clear();
        }
    }

    fn record_resolved(&self, _result: &BatchResult) {
        self.bar.inc(1);
    }
}

fn build_workspace(common: &CommonArgs, quality: Quality, quiet: bool) -> Workspace {
    let options = CompressionOptions::new(
        common.max_dimension,
        common.max_size_kb.map(|kb| kb.saturating_mul(1024)),
        common.passes,
    );

    Workspace::new(quality, options)
        .with_threads(common.threads)
        .with_batch_timeout(common.timeout.map(Duration::from_secs))
        .with_observer(Arc::new(ProgressObserver::new(quiet)))
}

fn intake(common: &CommonArgs, quiet: bool) -> Result<Vec<img_shrink::SourceFile>> {
    let paths = expand_inputs(&common.inputs).context("Failed to resolve inputs")?;
    let limits = IntakeLimits::new(common.max_depth, common.max_files);
    let sources = collect_dropped(&paths, &limits);

    if !quiet {
        println!(
            "{} Accepted {} image files from {} inputs",
            INFO_PREFIX,
            sources.len(),
            paths.len()
        );
    }
    Ok(sources)
}

fn run_compress(common: &CommonArgs, quality: Quality, quiet: bool) -> Result<()> {
    let start_time = Instant::now();
    let sources = intake(common, quiet)?;
    if sources.is_empty() {
        if !quiet {
            println!("{}  No supported images found in the inputs", WARNING_PREFIX);
        }
        return Ok(());
    }

    let mut workspace = build_workspace(common, quality, quiet);
    let (_, summary) = workspace.add(sources);

    if !quiet {
        print_records(&workspace.collection());
        println!(
            "\n{} {} completed, {} failed at quality {} in {:.2?}",
            INFO_PREFIX,
            summary.completed,
            summary.failed,
            quality,
            start_time.elapsed()
        );
    }

    save_results(&workspace, &common.output, quiet)
}

fn run_sweep(common: &CommonArgs, qualities: &[Quality], quiet: bool) -> Result<()> {
    let Some((&first, rest)) = qualities.split_first() else {
        return Ok(());
    };

    let sources = intake(common, quiet)?;
    if sources.is_empty() {
        if !quiet {
            println!("{}  No supported images found in the inputs", WARNING_PREFIX);
        }
        return Ok(());
    }

    let mut workspace = build_workspace(common, first, quiet);
    let mut columns: Vec<(Quality, HashMap<RecordId, Option<u64>>)> = Vec::new();

    workspace.add(sources);
    columns.push((first, sizes_by_id(&workspace.collection())));

    for &quality in rest {
        workspace.set_quality(quality);
        columns.push((quality, sizes_by_id(&workspace.collection())));
    }

    if !quiet {
        print_sweep_table(&workspace.collection(), &columns);
    }

    save_results(&workspace, &common.output, quiet)
}

fn sizes_by_id(collection: &Collection) -> HashMap<RecordId, Option<u64>> {
    collection
        .iter()
        .map(|r| (r.id.clone(), r.compressed_size()))
        .collect()
}

fn print_records(collection: &Collection) {
    for record in collection.iter() {
        let original = record.original.size;
        match record.status() {
            RecordStatus::Completed => println!(
                "{} {}: {} {} -> {} {} ({})",
                SUCCESS_PREFIX,
                record.original.name,
                ORIGINAL_SIZE_PREFIX,
                format_bytes(original),
                COMPRESSED_SIZE_PREFIX,
                record.compressed_size().map(format_bytes).unwrap_or_default(),
                format_reduction(Some(original), record.compressed_size())
            ),
            _ => println!(
                "{} {}: {}",
                ERROR_PREFIX,
                record.original.name,
                record.error_message().unwrap_or("not processed")
            ),
        }
    }
}

fn print_sweep_table(collection: &Collection, columns: &[(Quality, HashMap<RecordId, Option<u64>>)]) {
    let header: Vec<String> = columns.iter().map(|(q, _)| format!("q{:>3}", q.get())).collect();
    println!("\n{:<32} {:>12}  {}", "file", "original", header.join("  "));

    for record in collection.iter() {
        let cells: Vec<String> = columns
            .iter()
            .map(|(_, sizes)| match sizes.get(&record.id).copied().flatten() {
                Some(size) => format!(
                    "{} ({})",
                    format_bytes(size),
                    format_reduction(Some(record.original.size), Some(size))
                ),
                None => "error".to_string(),
            })
            .collect();
        println!(
            "{:<32} {:>12}  {}",
            record.original.name,
            format_bytes(record.original.size),
            cells.join("  ")
        );
    }
}

fn save_results(workspace: &Workspace, output: &Path, quiet: bool) -> Result<()> {
    let artifact = workspace
        .export_all()
        .context("Failed to bundle compressed images")?;

    match artifact {
        Some(artifact) => {
            let path = artifact
                .save_to(output)
                .with_context(|| format!("Failed to write into {}", output.display()))?;
            if !quiet {
                println!(
                    "{} Saved {} ({})",
                    SUCCESS_PREFIX,
                    path.display(),
                    format_bytes(artifact.len())
                );
            }
        }
        None => {
            if !quiet {
                println!("{}  No compressed images to save", WARNING_PREFIX);
            }
        }
    }

    Ok(())
}
