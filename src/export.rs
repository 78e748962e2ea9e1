//! Turning completed records into saveable artifacts.

use crate::constants::{ARCHIVE_MIME, ARCHIVE_NAME, OUTPUT_PREFIX};
use crate::error::{CompressionError, Result};
use crate::formats::extension_for_mime;
use crate::record::ImageRecord;
use crate::state::Collection;
use std::collections::HashSet;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// A named payload ready to be saved.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

impl Artifact {
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Writes the artifact into `dir` under its file name.
    ///
    /// The bytes go to a temporary file in the same directory first and are
    /// then persisted, so a failed save never leaves a truncated file behind.
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .map_err(|_| CompressionError::DirectoryCreationFailed(dir.to_path_buf()))?;

        let target = dir.join(&self.file_name);
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(&self.bytes)?;
        temp.flush()?;
        temp.persist(&target).map_err(|e| CompressionError::Io(e.error))?;

        info!("Saved {} ({} bytes)", target.display(), self.len());
        Ok(target)
    }
}

/// `compressed_<stem>.<ext>`, with the extension taken from the output MIME type.
pub fn derive_output_name(original_name: &str, mime: &str) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| original_name.to_string());

    format!("{}{}.{}", OUTPUT_PREFIX, stem, extension_for_mime(mime))
}

/// The artifact for a single record, or `None` unless it has completed.
pub fn export_one(record: &ImageRecord) -> Option<Artifact> {
    let output = record.output()?;
    Some(Artifact {
        file_name: derive_output_name(&record.original.name, output.mime_type()),
        mime: output.mime_type().to_string(),
        bytes: Arc::clone(&output.payload),
    })
}

/// Exports every completed record.
///
/// Zero completed records yields `Ok(None)`; exactly one yields the same
/// artifact as [`export_one`]; more are bundled into a single archive.
pub fn export_all(collection: &Collection) -> Result<Option<Artifact>> {
    let artifacts: Vec<Artifact> = collection.completed().filter_map(export_one).collect();

    match artifacts.len() {
        0 => {
            debug!("Nothing to export");
            Ok(None)
        }
        1 => Ok(artifacts.into_iter().next()),
        count => {
            let bytes = build_archive(&artifacts)?;
            debug!("Bundled {} files into {} bytes", count, bytes.len());
            Ok(Some(Artifact {
                file_name: ARCHIVE_NAME.to_string(),
                mime: ARCHIVE_MIME.to_string(),
                bytes: Arc::from(bytes),
            }))
        }
    }
}

/// Builds an in-memory zip with one stored entry per artifact.
///
/// Entries are already compressed images, so they are stored rather than
/// deflated. Repeated names get a numeric suffix.
pub fn build_archive(artifacts: &[Artifact]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut used = HashSet::new();

    for artifact in artifacts {
        let name = unique_entry_name(&artifact.file_name, &mut used);
        writer.start_file(name, options)?;
        writer.write_all(&artifact.bytes)?;
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

fn unique_entry_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }

    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut n = 2;
    loop {
        let candidate = match &extension {
            Some(ext) => format!("{}_{}.{}", stem, n, ext),
            None => format!("{}_{}", stem, n),
        };
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
