use once_cell::sync::Lazy;
use path_clean::PathClean;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{ImageFormat, ScanResult};

/// Build output and dependency directories that are never scanned
pub const IGNORED_DIRS: &[&str] = &["node_modules", "dist", "build", ".next", ".git"];

/// Source file extensions that are parsed for references
pub const CODE_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx"];

// Framework metadata and manifest icons are picked up by naming convention,
// never through an import, so they must not be treated as unused.
static RESERVED_IMAGE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(favicon|apple-icon|apple-touch-icon|icon|opengraph-image|twitter-image|android-chrome-|mstile-|web-app-manifest-).*\.(png|jpe?g|ico)$",
    )
    .expect("reserved image name pattern is valid")
});

/// Scan a project directory for image and source files
pub fn scan(target_dir: &Path, config: &Config) -> Result<ScanResult> {
    if !target_dir.is_dir() {
        return Err(Error::FileNotFound(target_dir.to_path_buf()));
    }
    let root = absolute_dir(target_dir)?;

    let (image_files, code_files) = rayon::join(
        || collect_files(&root, config, is_image_path),
        || collect_files(&root, config, is_code_path),
    );

    Ok(ScanResult {
        image_files,
        code_files,
    })
}

/// Walk the directory and keep every file accepted by `keep`
fn collect_files(root: &Path, config: &Config, keep: fn(&Path) -> bool) -> Vec<PathBuf> {
    let max_depth = config.max_depth.unwrap_or(usize::MAX);

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(|e| !is_ignored_dir(e, config))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping unreadable entry during scan: {}", e);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| keep(path))
        .collect();

    files.sort();
    files
}

fn is_ignored_dir(entry: &DirEntry, config: &Config) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    IGNORED_DIRS.contains(&name.as_ref())
        || config.extra_ignored_dirs.iter().any(|dir| dir == name.as_ref())
}

/// Returns if the given path is a migratable image that is not framework-reserved
pub fn is_image_path(path: &Path) -> bool {
    if ImageFormat::from_path(path).is_none() {
        return false;
    }
    match path.file_name().and_then(|name| name.to_str()) {
        Some(name) => !RESERVED_IMAGE_NAME.is_match(name),
        None => false,
    }
}

/// Returns if the given path is a JS/TS source file
pub fn is_code_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| CODE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Make a directory path absolute and lexically normalized
pub fn absolute_dir(dir: &Path) -> Result<PathBuf> {
    if dir.is_absolute() {
        Ok(dir.clean())
    } else {
        Ok(std::env::current_dir()?.join(dir).clean())
    }
}

// -- Tests --
