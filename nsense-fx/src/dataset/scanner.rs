//! Audio file discovery
//!
//! Lists allow-listed audio files inside one directory level. Extension
//! matching is case-insensitive; hidden files and OS clutter are ignored.
//! Results are sorted by file name so index order is reproducible across
//! filesystems.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{FeatureError, FeatureResult};

/// Default extension allow-list
pub const DEFAULT_EXTENSIONS: [&str; 4] = ["wav", "mp3", "ogg", "flac"];

/// Audio file scanner
#[derive(Debug, Clone)]
pub struct AudioFileScanner {
    /// Lowercase extensions without the leading dot
    extensions: Vec<String>,
    ignore_patterns: Vec<String>,
}

impl AudioFileScanner {
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                "desktop.ini".to_string(),
            ],
        }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Allow-listed files directly inside `dir`, sorted by file name
    pub fn scan_dir(&self, dir: &Path) -> FeatureResult<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(FeatureError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("not a directory: {}", dir.display()),
            )));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_ignored(e));

        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    if self.has_allowed_extension(entry.path()) {
                        files.push(entry.into_path());
                    } else {
                        debug!(path = %entry.path().display(), "Skipping non-audio file");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Error accessing entry");
                }
            }
        }

        Ok(files)
    }

    /// Immediate subdirectories of `root`, sorted by name
    pub fn subdirectories(&self, root: &Path) -> FeatureResult<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                let path = entry.path();
                let hidden = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.starts_with('.'));
                if !hidden {
                    dirs.push(path);
                }
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    pub fn has_allowed_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .map_or(false, |ext| self.extensions.iter().any(|allowed| *allowed == ext))
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        name.starts_with('.') || self.ignore_patterns.iter().any(|p| name == p.as_str())
    }
}

impl Default for AudioFileScanner {
    fn default() -> Self {
        Self::new(&DEFAULT_EXTENSIONS)
    }
}
