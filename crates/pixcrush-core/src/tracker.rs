use indexmap::IndexSet;
use log::{debug, info};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::logging::{log_file_error, log_parse_failure, FileOp, Phase};
use crate::references::{parse_literals, ReferenceKind};
use crate::resolver::{self, ResolveContext};
use crate::types::ClassificationResult;

/// Paths referenced by the code base, gathered over all source files
#[derive(Debug, Default)]
struct UsageIndex {
    /// Union of all candidate paths
    candidates: HashSet<PathBuf>,
    /// Root-absolute suffixes kept for suffix matching
    public_usages: IndexSet<String>,
    warnings: Vec<String>,
    parse_failure_files: Vec<PathBuf>,
}

/// Classify every image as used or unused by the given source files
pub fn track_and_reconcile_images(
    code_files: &[PathBuf],
    image_files: &[PathBuf],
    target_dir: &Path,
    config: &Config,
) -> ClassificationResult {
    let index = index_usages(code_files, target_dir);

    let images: IndexSet<PathBuf> = image_files.iter().map(|p| resolver::normalize(p)).collect();

    if config.verbose {
        info!("Target dir: {}", target_dir.display());
        info!("Normalized inventory images: {:?}", images);
        info!("Normalized candidate paths: {:?}", index.candidates);
        info!("Public usages: {:?}", index.public_usages);
    }

    let (used, unused): (Vec<PathBuf>, Vec<PathBuf>) = images
        .into_iter()
        .partition(|image| is_used(image, &index));

    ClassificationResult {
        used,
        unused,
        warnings: index.warnings,
        parse_failure_files: index.parse_failure_files,
    }
}

fn is_used(image: &Path, index: &UsageIndex) -> bool {
    index.candidates.contains(image)
        || index
            .public_usages
            .iter()
            .any(|usage| resolver::ends_with_public_usage(image, usage))
}

fn index_usages(code_files: &[PathBuf], target_dir: &Path) -> UsageIndex {
    let mut index = UsageIndex::default();

    for file in code_files {
        let relative = relative_to(file, target_dir);

        let source = match std::fs::read_to_string(file) {
            Ok(source) => source,
            Err(e) => {
                log_file_error(file, FileOp::Read, &e);
                index.parse_failure_files.push(relative);
                continue;
            }
        };

        let literals = match parse_literals(file, &source) {
            Ok(literals) => literals,
            Err(e) => {
                log_parse_failure(file, Phase::Analysis, &e.to_string());
                index.parse_failure_files.push(relative);
                continue;
            }
        };

        let ctx = ResolveContext {
            target_dir,
            source_file: file,
        };

        for reference in literals.iter().flat_map(|literal| literal.references()) {
            match reference.kind {
                ReferenceKind::Dynamic => {
                    debug!("Dynamic reference {:?} in {}", reference.raw_text, file.display());
                    index
                        .warnings
                        .push(format!("Dynamic `src` found in {}", relative.display()));
                }
                ReferenceKind::Static => {
                    if reference.is_root_absolute() {
                        index
                            .public_usages
                            .insert(resolver::public_suffix(&reference).to_string());
                    }
                    index.candidates.extend(resolver::candidates(&reference, &ctx));
                }
            }
        }
    }

    index
}

/// Path relative to the project directory, for operator-facing messages
pub fn relative_to(path: &Path, target_dir: &Path) -> PathBuf {
    path.strip_prefix(target_dir).unwrap_or(path).to_path_buf()
}
