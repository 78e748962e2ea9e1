//! The ordered record collection and its transitions.
//!
//! Every transition borrows the current collection and returns a new one, so
//! a snapshot held by a reader never changes underneath it.

use crate::batch::{BatchJob, BatchResult};
use crate::processing::Quality;
use crate::record::{ImageRecord, RecordId, RecordState, RecordStatus};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct Collection {
    records: Vec<ImageRecord>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends records after the existing ones.
    pub fn add(&self, records: impl IntoIterator<Item = ImageRecord>) -> Self {
        let mut next = self.records.clone();
        next.extend(records);
        Self { records: next }
    }

    /// Drops exactly the record with `id`; a missing id leaves the collection as is.
    pub fn remove(&self, id: &RecordId) -> Self {
        Self {
            records: self
                .records
                .iter()
                .filter(|r| &r.id != id)
                .cloned()
                .collect(),
        }
    }

    /// Marks every record that needs processing at `quality` as compressing
    /// and returns the jobs to run.
    ///
    /// Scheduled records drop any previous payload and take `quality` as
    /// their `quality_used`, so the attempted quality is kept on failure too.
    pub fn set_quality(&self, quality: Quality) -> (Self, Vec<BatchJob>) {
        let mut jobs = Vec::new();
        let records = self
            .records
            .iter()
            .map(|record| {
                if !record.needs_processing(quality) {
                    return record.clone();
                }
                jobs.push(BatchJob {
                    id: record.id.clone(),
                    source: Arc::clone(&record.original),
                });
                ImageRecord {
                    state: RecordState::Compressing,
                    quality_used: Some(quality),
                    ..record.clone()
                }
            })
            .collect();

        (Self { records }, jobs)
    }

    /// Applies a whole batch of results in one step. Results for ids that are
    /// no longer present are ignored.
    pub fn resolve_batch(&self, results: Vec<BatchResult>) -> Self {
        let mut by_id: HashMap<RecordId, BatchResult> =
            results.into_iter().map(|r| (r.id.clone(), r)).collect();

        let records = self
            .records
            .iter()
            .map(|record| match by_id.remove(&record.id) {
                Some(result) => ImageRecord {
                    state: match result.outcome {
                        Ok(output) => RecordState::Completed(output),
                        Err(message) => RecordState::Error(message),
                    },
                    ..record.clone()
                },
                None => record.clone(),
            })
            .collect();

        Self { records }
    }

    pub fn get(&self, id: &RecordId) -> Option<&ImageRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn completed(&self) -> impl Iterator<Item = &ImageRecord> {
        self.records
            .iter()
            .filter(|r| r.status() == RecordStatus::Completed)
    }

    pub fn count_with_status(&self, status: RecordStatus) -> usize {
        self.records.iter().filter(|r| r.status() == status).count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
