//! Core functionality for migrating web images to WebP.
//!
//! This library provides the components of a migration run:
//! - Source inventory (image and JS/TS file discovery)
//! - Reference extraction from parsed source files
//! - Used/unused classification under common framework path conventions
//! - Image conversion
//! - Reference rewriting
//! - Safety-gated cleanup

// -- External Dependencies --
use log::{info, warn};
use std::path::PathBuf;

// -- Internal Modules --
mod error;

// -- Public Re-exports --
pub use config::*;
pub use converter::{Converter, WebpConverter};
pub use error::{Error, Result};
pub use safety::{CleanupDecision, SafetyGate};
pub use types::*;

// -- Public Modules --
pub mod codemod;
pub mod config;
pub mod converter;
pub mod discovery;
pub mod logging;
pub mod references;
pub mod resolver;
pub mod safety;
pub mod tracker;
pub mod types;

/// Main entry point for a migration run
pub struct Migrator<C: Converter = WebpConverter> {
    config: Config,
    converter: C,
    safety_gate: SafetyGate,
}

impl Migrator<WebpConverter> {
    /// Create a new Migrator that converts to WebP
    pub fn new(config: Config) -> Self {
        Self::with_converter(config, WebpConverter)
    }
}

impl<C: Converter> Migrator<C> {
    /// Create a new Migrator with a custom converter
    pub fn with_converter(config: Config, converter: C) -> Self {
        let safety_gate = SafetyGate::new(&config);
        Self {
            config,
            converter,
            safety_gate,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Discover images and source files in the target directory
    pub fn scan(&self) -> Result<ScanResult> {
        let target_dir = discovery::absolute_dir(&self.config.target_dir)?;
        discovery::scan(&target_dir, &self.config)
    }

    /// Run the full pipeline: scan, classify, convert, rewrite, clean up
    ///
    /// Only a failing scan aborts the run. Per-file problems end up in the
    /// returned summary.
    pub fn run(&self) -> Result<RunSummary> {
        let target_dir = discovery::absolute_dir(&self.config.target_dir)?;

        // Phase 1: Scan
        info!("Scanning {} for images and source files...", target_dir.display());
        let scan = discovery::scan(&target_dir, &self.config)?;
        info!(
            "Found {} images and {} source files",
            scan.image_files.len(),
            scan.code_files.len()
        );

        let mut summary = RunSummary::empty(&scan);
        if scan.image_files.is_empty() {
            info!("No images found to process");
            return Ok(summary);
        }

        // Phase 2: Analyze
        let classification = tracker::track_and_reconcile_images(
            &scan.code_files,
            &scan.image_files,
            &target_dir,
            &self.config,
        );
        info!(
            "Identified {} used images and {} unused images",
            classification.used.len(),
            classification.unused.len()
        );
        summary.used_images = classification.used.len();
        summary.unused_images = classification.unused.clone();
        summary.warnings = classification.warnings.clone();
        summary.tracker_parse_failures = classification.parse_failure_files.clone();

        if classification.used.is_empty() {
            info!("No used images found in code; skipping conversion");
            let decision = self
                .safety_gate
                .evaluate(&classification, &RewriteResult::default());
            summary.deleted_unused = self
                .safety_gate
                .delete_files(decision, &classification.unused);
            summary.cleanup = decision;
            return Ok(summary);
        }

        // Phase 3: Convert
        info!(
            "Converting {} used images to {}...",
            classification.used.len(),
            self.converter.extension()
        );
        let conversions = converter::convert_images(
            &classification.used,
            &self.converter,
            self.config.quality,
            self.config.dry_run,
        );
        let successful: Vec<ConversionOutcome> =
            conversions.iter().filter(|c| !c.skipped).cloned().collect();
        summary.converted = successful.len();
        summary.bytes_saved = successful.iter().map(ConversionOutcome::saved_bytes).sum();
        summary.conversion_errors = conversions
            .iter()
            .filter_map(|c| {
                c.error
                    .as_ref()
                    .map(|e| format!("{}: {}", c.original_path.display(), e))
            })
            .collect();
        info!(
            "Converted {} images (saved {:.2} MB)",
            summary.converted,
            summary.saved_megabytes()
        );

        // Phase 4: Rewrite references
        let rewrite = if successful.is_empty() {
            RewriteResult::default()
        } else {
            info!("Updating source references...");
            codemod::update_code_references(
                &scan.code_files,
                &successful,
                &target_dir,
                self.config.dry_run,
            )
        };
        info!("Updated {} source files", rewrite.updated_files_count);
        summary.updated_files = rewrite.updated_files_count;
        summary.codemod_parse_failures = rewrite.parse_failure_files.clone();
        summary.codemod_write_failures = rewrite.write_failure_files.clone();
        summary.codemod_unedited_files = rewrite.unedited_files.clone();

        // Phase 5: Cleanup originals and unused images
        let decision = self.safety_gate.evaluate(&classification, &rewrite);
        if decision.is_allowed() {
            let originals: Vec<PathBuf> =
                successful.iter().map(|c| c.original_path.clone()).collect();
            summary.deleted_originals = self.safety_gate.delete_files(decision, &originals);
            summary.deleted_unused = self
                .safety_gate
                .delete_files(decision, &classification.unused);
            info!(
                "Deleted {} converted originals and {} unused images",
                summary.deleted_originals, summary.deleted_unused
            );
        } else if summary.parse_failure_count() > 0 {
            warn!(
                "Parser skipped {} source files during this run",
                summary.parse_failure_count()
            );
        }
        summary.cleanup = decision;

        Ok(summary)
    }
}
