//! Log output for a migration run.
//!
//! Every file pixcrush writes, rewrites or deletes is reported through
//! [`log_fs_change`].

use log::{error, info, warn, LevelFilter};
use std::fmt;
use std::path::{Path, PathBuf};

use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::filter::threshold::ThresholdFilter;

use crate::error::{Error, Result};

const LOG_FILE_NAME: &str = "pixcrush.log";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEPT_ARCHIVES: u32 = 5;

/// Filesystem operations performed during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Read,
    Stat,
    Encode,
    Write,
    Rewrite,
    Delete,
}

impl fmt::Display for FileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileOp::Read => "read",
            FileOp::Stat => "stat",
            FileOp::Encode => "encode",
            FileOp::Write => "write",
            FileOp::Rewrite => "rewrite",
            FileOp::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Pass over the source files that hit a parse failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Analysis,
    Codemod,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Analysis => f.write_str("analysis"),
            Phase::Codemod => f.write_str("codemod"),
        }
    }
}

/// Send logs to a size-rotated file in `log_dir`
///
/// Warnings and errors are mirrored to stderr. Returns the path of the
/// active log file.
pub fn init_logger(log_dir: &Path, level: LevelFilter) -> Result<PathBuf> {
    std::fs::create_dir_all(log_dir)?;

    let log_file = log_dir.join(LOG_FILE_NAME);
    let archive_pattern = log_dir.join("pixcrush.{}.log");

    let roller = FixedWindowRoller::builder()
        .build(&archive_pattern.to_string_lossy(), KEPT_ARCHIVES)
        .map_err(|e| Error::Configuration(format!("log roller: {}", e)))?;
    let policy = CompoundPolicy::new(
        Box::new(SizeTrigger::new(ROTATE_AT_BYTES)),
        Box::new(roller),
    );

    let file = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] [{M}:{L}] - {m}{n}",
        )))
        .build(&log_file, Box::new(policy))
        .map_err(|e| Error::Configuration(format!("log file {}: {}", log_file.display(), e)))?;

    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("[{l}] {m}{n}")))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(file)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Warn)))
                .build("stderr", Box::new(console)),
        )
        .build(
            Root::builder()
                .appender("file")
                .appender("stderr")
                .build(level),
        )
        .map_err(|e| Error::Configuration(format!("log config: {}", e)))?;

    log4rs::init_config(config).map_err(|e| Error::Configuration(e.to_string()))?;

    info!("Logging to file: {}", log_file.display());
    Ok(log_file)
}

/// Log a filesystem operation that failed
pub fn log_file_error(path: &Path, op: FileOp, error: &dyn std::error::Error) {
    error!("{} failed for {}: {}", op, path.display(), error);
}

/// Log a source file the parser could not handle
pub fn log_parse_failure(path: &Path, phase: Phase, message: &str) {
    warn!("Parse failed during {} for {}: {}", phase, path.display(), message);
}

/// Log a change pixcrush made on disk
pub fn log_fs_change(op: FileOp, path: &Path, details: Option<&str>) {
    match details {
        Some(details) => info!("FS CHANGE {} {} ({})", op, path.display(), details),
        None => info!("FS CHANGE {} {}", op, path.display()),
    }
}
