//! The single owner of the record collection and the global quality.
//!
//! All mutations go through `&mut self` and replace the shared snapshot
//! wholesale, so readers holding an `Arc<Collection>` never see a
//! half-applied batch.

use crate::batch::{run_batch, BatchResult};
use crate::cancel::CancelToken;
use crate::error::Result;
use crate::export::{self, Artifact};
use crate::processing::{CompressionOptions, Quality};
use crate::record::{ImageRecord, RecordId, RecordStatus, SourceFile};
use crate::state::Collection;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Receives state changes published by a [`Workspace`].
pub trait Observer: Send + Sync {
    /// Called after every swap of the collection snapshot.
    fn collection_changed(&self, _collection: &Collection) {}

    /// Called from worker threads as each job of a batch resolves.
    fn record_resolved(&self, _result: &BatchResult) {}
}

/// Counts for one finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub completed: usize,
    pub failed: usize,
}

pub struct Workspace {
    collection: Arc<Collection>,
    quality: Quality,
    options: CompressionOptions,
    threads: Option<usize>,
    batch_timeout: Option<Duration>,
    processing: bool,
    observer: Option<Arc<dyn Observer>>,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(Quality::default(), CompressionOptions::default())
    }
}

impl Workspace {
    pub fn new(quality: Quality, options: CompressionOptions) -> Self {
        Self {
            collection: Arc::new(Collection::new()),
            quality,
            options,
            threads: None,
            batch_timeout: None,
            processing: false,
            observer: None,
        }
    }

    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    /// Records still running when the timeout elapses resolve to an error.
    pub fn with_batch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.batch_timeout = timeout;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Current snapshot of the collection.
    pub fn collection(&self) -> Arc<Collection> {
        Arc::clone(&self.collection)
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Appends one pending record per source, publishes them, then runs a
    /// batch over the collection at the current quality.
    ///
    /// Returns the ids of the new records together with the batch counts.
    pub fn add(&mut self, sources: Vec<SourceFile>) -> (Vec<RecordId>, BatchSummary) {
        let records: Vec<ImageRecord> = sources.into_iter().map(ImageRecord::pending).collect();
        let ids: Vec<RecordId> = records.iter().map(|r| r.id.clone()).collect();
        if ids.is_empty() {
            return (ids, BatchSummary::default());
        }

        info!("Adding {} files", ids.len());
        let next = self.collection.add(records);
        self.publish(next);

        let summary = self.run_pending_batch();
        (ids, summary)
    }

    /// Removes one record. Nothing is re-processed.
    pub fn remove(&mut self, id: &RecordId) -> bool {
        if self.collection.get(id).is_none() {
            return false;
        }
        let next = self.collection.remove(id);
        self.publish(next);
        true
    }

    /// Applies a new global quality. A value equal to the current one does nothing.
    pub fn set_quality(&mut self, quality: Quality) -> BatchSummary {
        if quality == self.quality {
            debug!("Quality unchanged at {}", quality);
            return BatchSummary::default();
        }

        info!("Quality changed from {} to {}", self.quality, quality);
        self.quality = quality;
        self.run_pending_batch()
    }

    pub fn export_one(&self, id: &RecordId) -> Option<Artifact> {
        self.collection.get(id).and_then(export::export_one)
    }

    pub fn export_all(&self) -> Result<Option<Artifact>> {
        export::export_all(&self.collection)
    }

    fn run_pending_batch(&mut self) -> BatchSummary {
        let (scheduled, jobs) = self.collection.set_quality(self.quality);
        if jobs.is_empty() {
            return BatchSummary::default();
        }

        // Compressing state is visible before any work starts
        self.processing = true;
        self.publish(scheduled);

        let cancel = match self.batch_timeout {
            Some(timeout) => CancelToken::with_timeout(timeout),
            None => CancelToken::new(),
        };
        let observer = self.observer.clone();
        let results = run_batch(
            jobs,
            self.quality,
            &self.options,
            &cancel,
            self.threads,
            |result| {
                if let Some(observer) = &observer {
                    observer.record_resolved(result);
                }
            },
        );

        let summary = BatchSummary {
            processed: results.len(),
            completed: results.iter().filter(|r| r.is_ok()).count(),
            failed: results.iter().filter(|r| !r.is_ok()).count(),
        };

        let resolved = self.collection.resolve_batch(results);
        self.processing = false;
        self.publish(resolved);

        debug!(
            "Batch at quality {}: {} completed, {} failed, {} records total ({} in error)",
            self.quality,
            summary.completed,
            summary.failed,
            self.collection.len(),
            self.collection.count_with_status(RecordStatus::Error)
        );
        summary
    }

    fn publish(&mut self, next: Collection) {
        self.collection = Arc::new(next);
        if let Some(observer) = &self.observer {
            observer.collection_changed(&self.collection);
        }
    }
}
