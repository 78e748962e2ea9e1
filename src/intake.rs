//! Intake: turns dropped paths or a picked file list into accepted sources.
//!
//! Only JPEG, PNG and WebP are accepted. Everything else is dropped without
//! an error.

use crate::constants::{DEFAULT_MAX_INTAKE_FILES, DEFAULT_MAX_WALK_DEPTH};
use crate::error::{CompressionError, Result};
use crate::formats::{is_supported_mime, mime_for_path};
use crate::record::SourceFile;
use glob::glob;
use std::fs;
use std::path::{Path, PathBuf};
use std::vec;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Bounds on directory traversal.
#[derive(Debug, Clone)]
pub struct IntakeLimits {
    pub max_depth: usize,
    pub max_files: usize,
}

impl Default for IntakeLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_WALK_DEPTH,
            max_files: DEFAULT_MAX_INTAKE_FILES,
        }
    }
}

impl IntakeLimits {
    pub fn new(max_depth: Option<usize>, max_files: Option<usize>) -> Self {
        let defaults = Self::default();
        Self {
            max_depth: max_depth.unwrap_or(defaults.max_depth),
            max_files: max_files.unwrap_or(defaults.max_files).max(1),
        }
    }
}

/// Lazy walk over dropped items, yielding accepted image paths.
///
/// Directories are walked depth-first up to `max_depth`, and every file
/// inside is judged by the same MIME filter, dot-prefixed or not. An item whose metadata cannot be read is treated as a plain
/// file. The walk stops after `max_files` accepted paths and cannot be
/// restarted.
pub struct DropWalker {
    items: vec::IntoIter<PathBuf>,
    current: Option<walkdir::IntoIter>,
    max_depth: usize,
    remaining: usize,
}

impl DropWalker {
    pub fn new(items: &[PathBuf], limits: &IntakeLimits) -> Self {
        Self {
            items: items.to_vec().into_iter(),
            current: None,
            max_depth: limits.max_depth,
            remaining: limits.max_files,
        }
    }

    fn accept(&mut self, path: PathBuf) -> Option<PathBuf> {
        if mime_for_path(&path).is_some() {
            self.remaining -= 1;
            Some(path)
        } else {
            trace!("Skipping unsupported entry {:?}", path);
            None
        }
    }
}

impl Iterator for DropWalker {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        while self.remaining > 0 {
            if let Some(walker) = self.current.as_mut() {
                match walker.next() {
                    Some(Ok(entry)) => {
                        if entry.file_type().is_dir() {
                            continue;
                        }
                        if let Some(path) = self.accept(entry.into_path()) {
                            return Some(path);
                        }
                        continue;
                    }
                    Some(Err(e)) => {
                        warn!("Skipping unreadable entry: {}", e);
                        continue;
                    }
                    None => self.current = None,
                }
            }

            let item = self.items.next()?;
            match fs::metadata(&item) {
                Ok(metadata) if metadata.is_dir() => {
                    debug!("Walking directory {:?}", item);
                    let walker = WalkDir::new(&item).max_depth(self.max_depth).into_iter();
                    self.current = Some(walker);
                }
                _ => {
                    if let Some(path) = self.accept(item) {
                        return Some(path);
                    }
                }
            }
        }

        None
    }
}

/// Collects sources from dropped files and directories.
///
/// Accepted files that cannot be read are skipped with a warning.
pub fn collect_dropped(items: &[PathBuf], limits: &IntakeLimits) -> Vec<SourceFile> {
    read_sources(DropWalker::new(items, limits))
}

/// Collects sources from a flat picked list. Directories are ignored.
pub fn collect_picked(files: &[PathBuf]) -> Vec<SourceFile> {
    read_sources(
        files
            .iter()
            .filter(|path| !path.is_dir())
            .filter(|path| mime_for_path(path).is_some())
            .cloned(),
    )
}

fn read_sources(paths: impl Iterator<Item = PathBuf>) -> Vec<SourceFile> {
    paths
        .filter_map(|path| match SourceFile::read(&path) {
            Ok(source) => Some(source),
            Err(e) => {
                warn!("Skipping {:?}: {}", path, e);
                None
            }
        })
        .collect()
}

/// Keeps only in-memory sources whose MIME type is accepted.
pub fn filter_supported(files: impl IntoIterator<Item = SourceFile>) -> Vec<SourceFile> {
    files
        .into_iter()
        .filter(|f| is_supported_mime(&f.mime))
        .collect()
}

/// Expands command-line inputs: existing paths are kept, anything else is
/// treated as a glob pattern.
pub fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for input in inputs {
        let path = Path::new(input);
        if path.exists() {
            paths.push(path.to_path_buf());
            continue;
        }

        let matches: Vec<PathBuf> = glob(input)?.flatten().collect();
        if matches.is_empty() {
            warn!("No files match {}", input);
        }
        paths.extend(matches);
    }

    if paths.is_empty() && !inputs.is_empty() {
        return Err(CompressionError::FileNotFound(PathBuf::from(inputs.join(" "))));
    }

    Ok(paths)
}
