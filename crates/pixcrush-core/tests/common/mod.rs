#![allow(dead_code)]

use pixcrush_core::{Config, Converter, Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Size of every fake image written by [`Project::image`]
pub const IMAGE_SIZE: usize = 1000;

/// Produces a buffer of fixed size without decoding anything
pub struct FakeConverter {
    pub output_size: usize,
}

impl FakeConverter {
    pub fn shrinking() -> Self {
        Self { output_size: 100 }
    }

    pub fn growing() -> Self {
        Self {
            output_size: IMAGE_SIZE * 2,
        }
    }
}

impl Converter for FakeConverter {
    fn extension(&self) -> &str {
        "webp"
    }

    fn encode(&self, path: &Path, _quality: u8) -> Result<Vec<u8>> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        Ok(vec![0u8; self.output_size])
    }
}

/// A throwaway web project on disk
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    pub fn image(&self, relative: &str) -> PathBuf {
        self.write_bytes(relative, &[7u8; IMAGE_SIZE])
    }

    pub fn source(&self, relative: &str, contents: &str) -> PathBuf {
        self.write_bytes(relative, contents.as_bytes())
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    pub fn config(&self) -> Config {
        Config::for_dir(self.root())
    }

    fn write_bytes(&self, relative: &str, bytes: &[u8]) -> PathBuf {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();
        path
    }
}
