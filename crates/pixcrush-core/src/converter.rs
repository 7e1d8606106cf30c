use image::codecs::webp::{WebPEncoder, WebPQuality};
use image::ColorType;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::logging::{log_file_error, log_fs_change, FileOp};
use crate::types::ConversionOutcome;

/// Re-encodes one image into a new format
pub trait Converter: Sync {
    /// Extension of produced files, without the dot
    fn extension(&self) -> &str;

    /// Encode the image at `path`; must be deterministic for a given input and quality
    fn encode(&self, path: &Path, quality: u8) -> Result<Vec<u8>>;
}

/// Lossy WebP encoding through the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct WebpConverter;

impl Converter for WebpConverter {
    fn extension(&self) -> &str {
        "webp"
    }

    fn encode(&self, path: &Path, quality: u8) -> Result<Vec<u8>> {
        let rgba = image::open(path)?.to_rgba8();

        let mut buffer = Vec::new();
        let encoder = WebPEncoder::new_with_quality(&mut buffer, WebPQuality::lossy(quality));
        encoder.encode(rgba.as_raw(), rgba.width(), rgba.height(), ColorType::Rgba8)?;

        Ok(buffer)
    }
}

/// Convert every used image, one outcome per input in input order
///
/// Re-encoded files are only written when they are strictly smaller than the
/// original and the run is not a dry run. Originals are never touched here.
pub fn convert_images<C: Converter>(
    images: &[PathBuf],
    converter: &C,
    quality: u8,
    dry_run: bool,
) -> Vec<ConversionOutcome> {
    let targets: Vec<PathBuf> = images
        .iter()
        .map(|image| image.with_extension(converter.extension()))
        .collect();

    // `a.png` and `a.jpg` in one directory would both become `a.webp`
    let mut target_counts: HashMap<&Path, usize> = HashMap::new();
    for target in &targets {
        *target_counts.entry(target.as_path()).or_default() += 1;
    }

    let progress_bar = ProgressBar::new(images.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{eta}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    progress_bar.set_message(format!("Converting to {}...", converter.extension()));

    let outcomes = images
        .par_iter()
        .zip(targets.par_iter())
        .map(|(image, target)| {
            let outcome = if target_counts.get(target.as_path()).copied().unwrap_or(0) > 1 {
                ConversionOutcome::failed(
                    image.clone(),
                    format!("{} would be produced by more than one image", target.display()),
                )
            } else {
                convert_one(image, target, converter, quality, dry_run)
            };
            progress_bar.inc(1);
            outcome
        })
        .collect();

    progress_bar.finish_and_clear();
    outcomes
}

fn convert_one<C: Converter>(
    image: &Path,
    target: &Path,
    converter: &C,
    quality: u8,
    dry_run: bool,
) -> ConversionOutcome {
    let original_size = match std::fs::metadata(image) {
        Ok(metadata) => metadata.len(),
        Err(e) => {
            log_file_error(image, FileOp::Stat, &e);
            return ConversionOutcome::failed(image.to_path_buf(), e);
        }
    };

    let encoded = match converter.encode(image, quality) {
        Ok(encoded) => encoded,
        Err(e) => {
            log_file_error(image, FileOp::Encode, &e);
            return ConversionOutcome::failed(image.to_path_buf(), e);
        }
    };
    let new_size = encoded.len() as u64;

    let mut outcome = ConversionOutcome {
        original_path: image.to_path_buf(),
        new_path: target.to_path_buf(),
        original_size,
        new_size,
        skipped: false,
        error: None,
    };

    if new_size >= original_size {
        log::info!(
            "Keeping {} ({} bytes); re-encoded size would be {} bytes",
            image.display(),
            original_size,
            new_size
        );
        outcome.skipped = true;
        return outcome;
    }

    if !dry_run {
        if let Err(e) = std::fs::write(target, &encoded) {
            log_file_error(target, FileOp::Write, &e);
            outcome.skipped = true;
            outcome.error = Some(e.to_string());
            return outcome;
        }
        log_fs_change(
            FileOp::Write,
            target,
            Some(&format!("{} -> {} bytes", original_size, new_size)),
        );
    }

    outcome
}
