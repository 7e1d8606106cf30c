use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::Config;
use crate::logging::{log_file_error, log_fs_change, FileOp};
use crate::types::{ClassificationResult, RewriteResult};

/// Whether destructive cleanup may run at the end of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CleanupDecision {
    /// Deletion was not asked for
    NotRequested,
    /// Deletion was asked for, but nothing is ever deleted in a dry run
    DryRun,
    /// Some source files could not be analyzed or rewritten
    Blocked {
        unparseable_files: usize,
        unwritten_files: usize,
        /// Files still referencing a converted original
        unedited_files: usize,
    },
    /// Deletion may proceed
    Allowed,
}

impl CleanupDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CleanupDecision::Allowed)
    }
}

/// Withholds deletion whenever any source file was skipped during the run
pub struct SafetyGate {
    delete_requested: bool,
    dry_run: bool,
}

impl SafetyGate {
    /// Create a new SafetyGate with the provided configuration
    pub fn new(config: &Config) -> Self {
        Self {
            delete_requested: config.delete_originals,
            dry_run: config.dry_run,
        }
    }

    /// Decide on cleanup from the failures of both source passes
    pub fn evaluate(
        &self,
        classification: &ClassificationResult,
        rewrite: &RewriteResult,
    ) -> CleanupDecision {
        if !self.delete_requested {
            return CleanupDecision::NotRequested;
        }
        if self.dry_run {
            return CleanupDecision::DryRun;
        }

        let unparseable_files =
            classification.parse_failure_files.len() + rewrite.parse_failure_files.len();
        let unwritten_files = rewrite.write_failure_files.len();
        let unedited_files = rewrite.unedited_files.len();

        if unparseable_files > 0 || unwritten_files > 0 || unedited_files > 0 {
            log::warn!(
                "Skipped deleting originals/unused images: {} source files could not be parsed, {} could not be written, {} still reference converted images.",
                unparseable_files,
                unwritten_files,
                unedited_files
            );
            return CleanupDecision::Blocked {
                unparseable_files,
                unwritten_files,
                unedited_files,
            };
        }

        CleanupDecision::Allowed
    }

    /// Delete the given files if the decision allows it, returning how many were removed
    pub fn delete_files(&self, decision: CleanupDecision, paths: &[PathBuf]) -> usize {
        if !decision.is_allowed() {
            return 0;
        }
        delete_files(paths)
    }
}

/// Unlink each path independently; failures are logged and not counted
fn delete_files(paths: &[PathBuf]) -> usize {
    let mut deleted = 0;
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => {
                log_fs_change(FileOp::Delete, path, None);
                deleted += 1;
            }
            Err(e) => {
                log::warn!("Failed to delete file {}: {}", path.display(), e);
                log_file_error(path, FileOp::Delete, &e);
            }
        }
    }
    deleted
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn gate(delete: bool, dry_run: bool) -> SafetyGate {
        let mut config = Config::default();
        config.delete_originals = delete;
        config.dry_run = dry_run;
        SafetyGate::new(&config)
    }

    fn failures(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("src/f{}.tsx", i))).collect()
    }

    #[test]
    fn test_not_requested() {
        let decision = gate(false, false).evaluate(
            &ClassificationResult::default(),
            &RewriteResult::default(),
        );
        assert_eq!(decision, CleanupDecision::NotRequested);
    }

    #[test]
    fn test_dry_run_never_deletes() {
        let decision = gate(true, true).evaluate(
            &ClassificationResult::default(),
            &RewriteResult::default(),
        );
        assert_eq!(decision, CleanupDecision::DryRun);
        assert!(!decision.is_allowed());
    }

    #[test]
    fn test_allowed_without_failures() {
        let decision = gate(true, false).evaluate(
            &ClassificationResult::default(),
            &RewriteResult::default(),
        );
        assert_eq!(decision, CleanupDecision::Allowed);
    }

    #[test]
    fn test_blocked_counts_failures_from_both_passes() {
        let classification = ClassificationResult {
            parse_failure_files: failures(2),
            ..Default::default()
        };
        let rewrite = RewriteResult {
            parse_failure_files: failures(1),
            ..Default::default()
        };

        let decision = gate(true, false).evaluate(&classification, &rewrite);

        assert_eq!(
            decision,
            CleanupDecision::Blocked {
                unparseable_files: 3,
                unwritten_files: 0,
                unedited_files: 0
            }
        );
    }

    #[test]
    fn test_blocked_by_rewrite_failures_alone() {
        let rewrite = RewriteResult {
            parse_failure_files: failures(1),
            ..Default::default()
        };

        let decision = gate(true, false).evaluate(&ClassificationResult::default(), &rewrite);

        assert!(matches!(decision, CleanupDecision::Blocked { unparseable_files: 1, .. }));
    }

    #[test]
    fn test_blocked_by_unedited_references() {
        let rewrite = RewriteResult {
            unedited_files: failures(1),
            ..Default::default()
        };

        let decision = gate(true, false).evaluate(&ClassificationResult::default(), &rewrite);

        assert_eq!(
            decision,
            CleanupDecision::Blocked {
                unparseable_files: 0,
                unwritten_files: 0,
                unedited_files: 1
            }
        );
    }

    #[test]
    fn test_blocked_decision_deletes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.png");
        fs::write(&path, b"PNG").unwrap();

        let deleted = gate(true, false).delete_files(
            CleanupDecision::Blocked {
                unparseable_files: 1,
                unwritten_files: 0,
                unedited_files: 0,
            },
            &[path.clone()],
        );

        assert_eq!(deleted, 0);
        assert!(path.exists());
    }

    #[test]
    fn test_delete_failure_does_not_stop_the_rest() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a.png");
        let missing = dir.path().join("missing.png");
        let last = dir.path().join("b.jpg");
        fs::write(&first, b"PNG").unwrap();
        fs::write(&last, b"JPG").unwrap();

        let deleted = gate(true, false).delete_files(
            CleanupDecision::Allowed,
            &[first.clone(), missing, last.clone()],
        );

        assert_eq!(deleted, 2);
        assert!(!first.exists());
        assert!(!last.exists());
    }
}
