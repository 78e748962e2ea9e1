use crate::cancel::CancelToken;
use crate::constants::{
    LARGE_IMAGE_THRESHOLD_MIB, MAX_CONCURRENT_LARGE_IMAGES, MIN_AVAILABLE_MEMORY_MIB,
};
use crate::formats::ImageKind;
use crate::processing::{compress_source, CompressedOutput, CompressionOptions, Quality};
use crate::record::{RecordId, SourceFile};
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use sysinfo::{MemoryRefreshKind, RefreshKind, System};
use tracing::{debug, warn};

/// One record scheduled for the pipeline.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub id: RecordId,
    pub source: Arc<SourceFile>,
}

/// Resolution of one job. Errors are already rendered to a message.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub id: RecordId,
    pub outcome: std::result::Result<CompressedOutput, String>,
}

impl BatchResult {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Estimates decoded memory for a source without decoding it.
fn estimate_memory_mib(source: &SourceFile) -> f64 {
    let size_mib = source.size as f64 / (1024.0 * 1024.0);

    // Decoded pixels are usually several times the compressed size
    let multiplier = match ImageKind::from_mime(&source.mime) {
        Some(ImageKind::Jpeg) => 4.0,
        Some(ImageKind::Png) => 3.0,
        Some(ImageKind::WebP) => 3.5,
        None => 3.0,
    };

    size_mib * multiplier
}

fn available_memory_mib() -> u64 {
    let mut sys =
        System::new_with_specifics(RefreshKind::new().with_memory(MemoryRefreshKind::new()));
    sys.refresh_memory();
    sys.available_memory() / (1024 * 1024)
}

/// Chooses how many jobs may run at once.
///
/// Starts from the requested thread count (or the CPU count), then limits
/// concurrent large images and keeps the estimated working set inside
/// available memory.
pub fn plan_parallelism(jobs: &[BatchJob], threads: Option<usize>) -> usize {
    if jobs.is_empty() {
        return 1;
    }

    let baseline = threads
        .filter(|&t| t > 0)
        .unwrap_or_else(num_cpus::get)
        .min(jobs.len())
        .max(1);

    let estimates: Vec<f64> = jobs.iter().map(|j| estimate_memory_mib(&j.source)).collect();
    let total_mib: f64 = estimates.iter().sum();
    let large_count = estimates
        .iter()
        .filter(|&&m| m > LARGE_IMAGE_THRESHOLD_MIB)
        .count();

    let large_cap = if large_count >= MAX_CONCURRENT_LARGE_IMAGES {
        MAX_CONCURRENT_LARGE_IMAGES
    } else {
        baseline
    };

    let avg_per_job_mib = ((total_mib / jobs.len() as f64).ceil() as u64).max(1);
    let mem_cap = (available_memory_mib().saturating_sub(MIN_AVAILABLE_MEMORY_MIB)
        / avg_per_job_mib)
        .clamp(1, baseline as u64) as usize;

    large_cap.min(mem_cap).max(1)
}

/// Runs one job to a resolution. Errors and panics both become messages.
pub fn run_job(
    job: &BatchJob,
    quality: Quality,
    options: &CompressionOptions,
    cancel: &CancelToken,
) -> BatchResult {
    let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
        compress_source(&job.source, quality, options, cancel)
    }));

    let outcome = match attempt {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(format!("Failed to compress {}: {}", job.source.name, e)),
        Err(_) => Err(format!(
            "Failed to compress {}: encoder panicked",
            job.source.name
        )),
    };

    if let Err(message) = &outcome {
        warn!("{}", message);
    }

    BatchResult {
        id: job.id.clone(),
        outcome,
    }
}

/// Processes every job concurrently and returns once all of them resolve.
///
/// Result order is unspecified. `on_resolved` fires from worker threads as
/// each job finishes.
pub fn run_batch<F>(
    jobs: Vec<BatchJob>,
    quality: Quality,
    options: &CompressionOptions,
    cancel: &CancelToken,
    threads: Option<usize>,
    on_resolved: F,
) -> Vec<BatchResult>
where
    F: Fn(&BatchResult) + Sync,
{
    if jobs.is_empty() {
        return Vec::new();
    }

    let start_time = Instant::now();
    let parallelism = plan_parallelism(&jobs, threads);
    debug!(
        "Running batch of {} jobs at quality {} with {} threads",
        jobs.len(),
        quality,
        parallelism
    );

    let process = |job: &BatchJob| {
        let result = run_job(job, quality, options, cancel);
        on_resolved(&result);
        result
    };

    let results: Vec<BatchResult> = match rayon::ThreadPoolBuilder::new()
        .num_threads(parallelism)
        .build()
    {
        Ok(pool) => pool.install(|| jobs.par_iter().map(process).collect()),
        Err(e) => {
            warn!("Failed to build thread pool, running sequentially: {}", e);
            jobs.iter().map(process).collect()
        }
    };

    debug!(
        "Batch resolved: {} ok, {} failed in {:?}",
        results.iter().filter(|r| r.is_ok()).count(),
        results.iter().filter(|r| !r.is_ok()).count(),
        start_time.elapsed()
    );

    results
}
