use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::safety::CleanupDecision;

/// Raster formats eligible for migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Determine format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    /// Determine format from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// The two raw sets a run starts from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResult {
    /// Absolute paths of candidate image files
    pub image_files: Vec<PathBuf>,

    /// Absolute paths of candidate source files
    pub code_files: Vec<PathBuf>,
}

/// Result of re-encoding one used image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutcome {
    /// Image that was converted
    pub original_path: PathBuf,

    /// Where the re-encoded image lives (or would live in a dry run)
    pub new_path: PathBuf,

    /// Size of the original in bytes
    pub original_size: u64,

    /// Size of the re-encoded buffer in bytes
    pub new_size: u64,

    /// True if re-encoding did not shrink the file or failed
    pub skipped: bool,

    /// Error message if any step failed
    pub error: Option<String>,
}

impl ConversionOutcome {
    /// Outcome for an image whose conversion failed
    pub fn failed(original_path: PathBuf, error: impl ToString) -> Self {
        Self {
            original_path,
            new_path: PathBuf::new(),
            original_size: 0,
            new_size: 0,
            skipped: true,
            error: Some(error.to_string()),
        }
    }

    /// Bytes saved by this conversion, zero when skipped
    pub fn saved_bytes(&self) -> u64 {
        if self.skipped {
            0
        } else {
            self.original_size.saturating_sub(self.new_size)
        }
    }
}

/// Partition of the image inventory into used and unused images
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub used: Vec<PathBuf>,
    pub unused: Vec<PathBuf>,

    /// Dynamic reference detections
    pub warnings: Vec<String>,

    /// Source files (relative to the target dir) that failed to parse
    pub parse_failure_files: Vec<PathBuf>,
}

/// Result of the codemod pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RewriteResult {
    pub updated_files_count: usize,
    pub parse_failure_files: Vec<PathBuf>,

    /// Source files whose rewritten text could not be saved
    pub write_failure_files: Vec<PathBuf>,

    /// Source files still referencing a converted image in a form that could not be rewritten
    pub unedited_files: Vec<PathBuf>,
}

/// Informational summary of a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub images_found: usize,
    pub code_files_found: usize,
    pub used_images: usize,
    pub unused_images: Vec<PathBuf>,
    pub converted: usize,
    pub bytes_saved: u64,
    pub updated_files: usize,
    pub warnings: Vec<String>,
    pub conversion_errors: Vec<String>,
    pub tracker_parse_failures: Vec<PathBuf>,
    pub codemod_parse_failures: Vec<PathBuf>,
    pub codemod_write_failures: Vec<PathBuf>,
    pub codemod_unedited_files: Vec<PathBuf>,
    pub cleanup: CleanupDecision,
    pub deleted_originals: usize,
    pub deleted_unused: usize,
}

impl RunSummary {
    /// Summary for a scan that found nothing to do
    pub fn empty(scan: &ScanResult) -> Self {
        Self {
            images_found: scan.image_files.len(),
            code_files_found: scan.code_files.len(),
            used_images: 0,
            unused_images: Vec::new(),
            converted: 0,
            bytes_saved: 0,
            updated_files: 0,
            warnings: Vec::new(),
            conversion_errors: Vec::new(),
            tracker_parse_failures: Vec::new(),
            codemod_parse_failures: Vec::new(),
            codemod_write_failures: Vec::new(),
            codemod_unedited_files: Vec::new(),
            cleanup: CleanupDecision::NotRequested,
            deleted_originals: 0,
            deleted_unused: 0,
        }
    }

    /// Total number of source files the parser skipped during the run
    pub fn parse_failure_count(&self) -> usize {
        self.tracker_parse_failures.len() + self.codemod_parse_failures.len()
    }

    /// Saved space in megabytes, as displayed to the operator
    pub fn saved_megabytes(&self) -> f64 {
        self.bytes_saved as f64 / 1024.0 / 1024.0
    }
}
