//! Per-file records tracked through the pipeline.
//!
//! A record's compressed payload and error message live inside [`RecordState`],
//! so a payload can only exist on a completed record and a message only on a
//! failed one.

use crate::constants::MAX_FILE_SIZE;
use crate::error::{CompressionError, Result};
use crate::formats::mime_for_path;
use crate::processing::{data_url, CompressedOutput, Quality};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

static NEXT_RECORD_SEQ: AtomicU64 = AtomicU64::new(0);

/// Stable record identifier: `<name>-<unix-millis>-<seq>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl RecordId {
    pub fn generate(name: &str) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let seq = NEXT_RECORD_SEQ.fetch_add(1, Ordering::Relaxed);
        Self(format!("{}-{}-{}", name, millis, seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// An accepted input file: immutable bytes plus the metadata the pipeline needs.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub mime: String,
    pub size: u64,
    pub bytes: Arc<[u8]>,
    pub path: Option<PathBuf>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            size: bytes.len() as u64,
            bytes: Arc::from(bytes),
            path: None,
        }
    }

    /// Reads a file from disk, assigning its MIME type from the extension.
    /// Files without an accepted extension get `application/octet-stream`.
    pub fn read(path: &Path) -> Result<Self> {
        let metadata =
            fs::metadata(path).map_err(|_| CompressionError::FileNotFound(path.to_path_buf()))?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(CompressionError::FileTooLarge(metadata.len(), MAX_FILE_SIZE));
        }

        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        let mime = mime_for_path(path).unwrap_or("application/octet-stream");

        let mut source = Self::new(name, mime, bytes);
        source.path = Some(path.to_path_buf());
        Ok(source)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Pending,
    Compressing,
    Completed,
    Error,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Compressing => "compressing",
            RecordStatus::Completed => "completed",
            RecordStatus::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub enum RecordState {
    Pending,
    Compressing,
    Completed(CompressedOutput),
    Error(String),
}

#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub id: RecordId,
    pub original: Arc<SourceFile>,
    pub original_preview: Arc<str>,
    pub state: RecordState,
    pub quality_used: Option<Quality>,
}

impl ImageRecord {
    /// Creates a pending record and computes the original preview.
    pub fn pending(source: SourceFile) -> Self {
        let original_preview = Arc::from(data_url(&source.mime, &source.bytes));
        Self {
            id: RecordId::generate(&source.name),
            original: Arc::new(source),
            original_preview,
            state: RecordState::Pending,
            quality_used: None,
        }
    }

    pub fn status(&self) -> RecordStatus {
        match self.state {
            RecordState::Pending => RecordStatus::Pending,
            RecordState::Compressing => RecordStatus::Compressing,
            RecordState::Completed(_) => RecordStatus::Completed,
            RecordState::Error(_) => RecordStatus::Error,
        }
    }

    pub fn output(&self) -> Option<&CompressedOutput> {
        match &self.state {
            RecordState::Completed(output) => Some(output),
            _ => None,
        }
    }

    pub fn compressed_payload(&self) -> Option<&[u8]> {
        self.output().map(|o| o.payload.as_ref())
    }

    pub fn compressed_preview(&self) -> Option<&str> {
        self.output().map(|o| o.preview.as_ref())
    }

    pub fn compressed_size(&self) -> Option<u64> {
        self.output().map(|o| o.payload.len() as u64)
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            RecordState::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Whether a batch at `quality` should (re)process this record.
    pub fn needs_processing(&self, quality: Quality) -> bool {
        match self.state {
            RecordState::Pending => true,
            RecordState::Compressing => false,
            RecordState::Completed(_) | RecordState::Error(_) => {
                self.quality_used != Some(quality)
            }
        }
    }
}
