use clap::{Parser, Subcommand};
use log::info;
use pixcrush_core::config::LogLevel;
use pixcrush_core::{CleanupDecision, Config, Migrator, RunSummary};
use std::fmt::Display;
use std::path::{Path, PathBuf};

const MAX_LISTED: usize = 5;

#[derive(Parser)]
#[command(name = "pixcrush")]
#[command(about = "Convert PNG/JPEG images in a web project to WebP and update references")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert used images and rewrite the source files that reference them
    Run {
        /// Project directory to migrate [default: config file's target_dir, else "."]
        dir: Option<PathBuf>,

        /// Report what would change without touching any file
        #[arg(long)]
        dry_run: bool,

        /// WebP quality (0-100)
        #[arg(short, long)]
        quality: Option<u8>,

        /// Delete converted originals and unused images when it is safe to do so
        #[arg(long)]
        delete_originals: bool,

        /// Verbosity level
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write a rotating log file into this directory instead of stderr
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "pixcrush.json")]
        path: PathBuf,
    },
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            dir,
            dry_run,
            quality,
            delete_originals,
            verbose,
            config,
            log_dir,
            json,
        } => {
            // Set up configuration
            let mut config = if let Some(config_path) = config {
                Config::from_file(&config_path)?
            } else {
                Config::default()
            };

            // Override config with command line arguments
            if let Some(dir) = dir {
                config.target_dir = dir;
            }
            config.dry_run |= dry_run;
            config.delete_originals |= delete_originals;
            if let Some(quality) = quality {
                config.quality = quality;
            }
            if verbose > 0 {
                config.verbose = true;
                config.log_level = match verbose {
                    1 => LogLevel::Debug,
                    _ => LogLevel::Trace,
                };
            }

            init_logging(log_dir.as_deref(), config.log_level)?;
            config.validate()?;

            let migrator = Migrator::new(config);

            info!("Starting WebP migration...");
            let summary = migrator.run()?;
            info!("Migration complete");

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary, migrator.config());
            }

            Ok(())
        }

        Commands::GenerateConfig { path } => {
            let config = Config::default();
            config.save_to_file(&path)?;
            println!("Configuration file generated at: {}", path.display());
            Ok(())
        }
    }
}

fn init_logging(log_dir: Option<&Path>, level: LogLevel) -> Result<(), anyhow::Error> {
    match log_dir {
        Some(log_dir) => {
            pixcrush_core::logging::init_logger(log_dir, level.to_level_filter())?;
            Ok(())
        }
        None => {
            env_logger::Builder::new()
                .filter_level(level.to_level_filter())
                .parse_default_env()
                .init();
            Ok(())
        }
    }
}

fn print_summary(summary: &RunSummary, config: &Config) {
    if config.dry_run {
        println!("Dry run: no files were written or deleted.");
    }

    if summary.images_found == 0 {
        println!("No PNG/JPEG images found.");
        return;
    }

    println!(
        "Converted {}/{} used images to WebP",
        summary.converted, summary.used_images
    );
    println!("Saved {:.2} MB", summary.saved_megabytes());
    println!("Updated {} source files", summary.updated_files);

    if !summary.conversion_errors.is_empty() {
        println!("\n{} images could not be converted:", summary.conversion_errors.len());
        for error in &summary.conversion_errors {
            println!("  - {}", error);
        }
    }

    if !summary.warnings.is_empty() {
        println!("\nWarnings:");
        print_capped(summary.warnings.iter());
    }

    if !summary.unused_images.is_empty() {
        let root = pixcrush_core::discovery::absolute_dir(&config.target_dir)
            .unwrap_or_else(|_| config.target_dir.clone());
        println!("\n{} unused images:", summary.unused_images.len());
        print_capped(
            summary
                .unused_images
                .iter()
                .map(|image| image.strip_prefix(&root).unwrap_or(image).display()),
        );
    }

    match summary.cleanup {
        CleanupDecision::NotRequested | CleanupDecision::DryRun => {
            if summary.cleanup == CleanupDecision::DryRun {
                println!("\nDeletion skipped: dry run.");
            }
            if summary.parse_failure_count() > 0 {
                println!(
                    "\nParser skipped {} source files. Review warnings before running with --delete-originals.",
                    summary.parse_failure_count()
                );
            }
        }
        CleanupDecision::Blocked {
            unparseable_files,
            unwritten_files,
            unedited_files,
        } => {
            println!(
                "\nSafety gate: skipped deleting originals/unused images. {} source files could not be parsed, {} could not be written and {} still reference converted images.",
                unparseable_files, unwritten_files, unedited_files
            );
            let files: Vec<_> = summary
                .tracker_parse_failures
                .iter()
                .chain(&summary.codemod_parse_failures)
                .chain(&summary.codemod_write_failures)
                .chain(&summary.codemod_unedited_files)
                .map(|file| file.display())
                .collect();
            print_capped(files.iter());
        }
        CleanupDecision::Allowed => {
            println!(
                "\nDeleted {} converted originals and {} unused images",
                summary.deleted_originals, summary.deleted_unused
            );
        }
    }
}

/// Print the first few items of a list, then how many were left out
fn print_capped<T: Display>(items: impl ExactSizeIterator<Item = T>) {
    for line in capped_lines(items) {
        println!("{}", line);
    }
}

fn capped_lines<T: Display>(items: impl ExactSizeIterator<Item = T>) -> Vec<String> {
    let total = items.len();
    let mut lines: Vec<String> = items
        .take(MAX_LISTED)
        .map(|item| format!("  - {}", item))
        .collect();
    if total > MAX_LISTED {
        lines.push(format!("  ...and {} more", total - MAX_LISTED));
    }
    lines
}
