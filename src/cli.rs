//! Command-line interface module for dirsort.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Configuration and log file setup
//! - Organize and undo orchestration
//! - Console rendering of progress and results

use crate::config::{ConfigError, OrganizerConfig};
use crate::events::{Event, EventSink, Severity, Stage, TracingSink};
use crate::file_organizer::{OrganizeError, Organizer};
use crate::logging::{self, LogTarget};
use crate::output::OutputFormatter;
use crate::undo::{UndoManager, UndoOutcome};
use clap::Parser;
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Sort the files of a directory into category folders by extension.
#[derive(Parser, Debug)]
#[command(name = "dirsort", author, version, about)]
#[command(
    after_help = "Each run records its moves in .dirsort_history.json inside the organized \
                  directory; --undo replays it. Do not run two instances on the same directory."
)]
pub struct Cli {
    /// Directory to organize
    #[arg(
        short = 'p',
        long,
        value_name = "DIR",
        required_unless_present = "create_config"
    )]
    pub path: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Show what would be moved without touching anything
    #[arg(short = 'd', long, conflicts_with = "undo")]
    pub dry_run: bool,

    /// Revert the most recent organize run
    #[arg(short = 'u', long)]
    pub undo: bool,

    /// Also organize files in subdirectories
    #[arg(short = 'r', long, conflicts_with = "undo")]
    pub recursive: bool,

    /// Print every move
    #[arg(short = 'v', long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Print errors only
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Write the default configuration to FILE and exit
    #[arg(
        long,
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = "config.json"
    )]
    pub create_config: Option<PathBuf>,
}

impl Cli {
    /// The organize or undo command selected by the flags.
    pub fn command(&self) -> OrganizeCommand {
        if self.undo {
            OrganizeCommand::Undo
        } else {
            OrganizeCommand::Organize {
                dry_run: self.dry_run,
                recursive: self.recursive,
            }
        }
    }

    pub fn options(&self) -> RunOptions {
        RunOptions {
            verbose: self.verbose,
            quiet: self.quiet,
        }
    }
}

/// Represents a CLI command to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizeCommand {
    /// Organize files in a directory.
    Organize {
        /// If true, simulate the operation without making changes.
        dry_run: bool,
        recursive: bool,
    },
    /// Undo the previous organization.
    Undo,
}

/// Console verbosity.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub verbose: bool,
    pub quiet: bool,
}

/// How a run ended, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// At least one file failed, or the history could not be saved.
    Failed,
    Interrupted,
}

impl RunStatus {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Success => 0,
            RunStatus::Failed => 1,
            RunStatus::Interrupted => 130,
        }
    }
}

/// Errors that abort a run before or instead of processing files.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Organize(#[from] OrganizeError),
}

/// Renders core events on the console and forwards them to the log.
struct ConsoleSink {
    options: RunOptions,
    progress: Option<ProgressBar>,
}

impl ConsoleSink {
    fn new(options: RunOptions) -> Self {
        Self {
            options,
            progress: None,
        }
    }

    fn print(&self, event: &Event) {
        let show = match event.severity {
            Severity::Error => true,
            Severity::Warning => !self.options.quiet,
            Severity::Info => self.options.verbose,
            Severity::Debug => false,
        };
        if !show {
            return;
        }

        let render = || match event.severity {
            Severity::Error => OutputFormatter::error(&event.message),
            Severity::Warning => OutputFormatter::warning(&event.message),
            _ => OutputFormatter::detail(&event.message),
        };
        match &self.progress {
            Some(pb) => pb.suspend(render),
            None => render(),
        }
    }

    fn finish(&mut self) {
        if let Some(pb) = self.progress.take() {
            pb.finish_and_clear();
        }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&mut self, event: Event) {
        self.print(&event);
        TracingSink.emit(event);
    }

    fn progress(&mut self, done: usize, total: usize) {
        // per-file lines replace the bar in verbose mode
        if self.options.quiet || self.options.verbose {
            return;
        }
        let pb = self
            .progress
            .get_or_insert_with(|| OutputFormatter::create_progress_bar(total as u64));
        pb.set_position(done as u64);
    }
}

/// Runs the parsed command line.
///
/// Handles `--create-config`, loads the configuration, installs the log file
/// and then organizes or undoes.
pub fn run(cli: &Cli, interrupt: Arc<AtomicBool>) -> Result<RunStatus, CliError> {
    let options = cli.options();

    if let Some(path) = &cli.create_config {
        if OrganizerConfig::write_default(path)? {
            OutputFormatter::success(&format!("Default configuration written to {}", path.display()));
            return Ok(RunStatus::Success);
        }
        OutputFormatter::error(&format!(
            "{} already exists; refusing to overwrite it",
            path.display()
        ));
        return Ok(RunStatus::Failed);
    }

    let Some(dir_path) = cli.path.as_deref() else {
        OutputFormatter::error("no directory given; use --path DIR");
        return Ok(RunStatus::Failed);
    };

    let config = OrganizerConfig::load(cli.config.as_deref())?;

    if dir_path.is_dir() {
        match logging::init(&config.log, dir_path, options.quiet) {
            LogTarget::File(path) => {
                tracing::info!(log_file = %path.display(), "dirsort {} started", env!("CARGO_PKG_VERSION"));
            }
            LogTarget::Stderr { path, reason } if !options.quiet => OutputFormatter::warning(
                &format!("Could not open log file {}: {}", path.display(), reason),
            ),
            _ => {}
        }
    }

    execute(cli.command(), dir_path, &config, options, Some(interrupt))
}

/// Runs `command` on `dir_path` with the configuration at `config_path`.
///
/// Without a path the usual lookup applies (see [`OrganizerConfig::load`]).
/// Does not install a log file.
///
/// # Examples
///
/// ```no_run
/// use dirsort::cli::{run_cli_with_config, OrganizeCommand, RunOptions};
/// use std::path::Path;
///
/// let status = run_cli_with_config(
///     OrganizeCommand::Organize { dry_run: true, recursive: false },
///     Path::new("/path/to/directory"),
///     None,
///     RunOptions::default(),
/// );
/// match status {
///     Ok(status) => std::process::exit(status.exit_code()),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli_with_config(
    command: OrganizeCommand,
    dir_path: &Path,
    config_path: Option<&Path>,
    options: RunOptions,
) -> Result<RunStatus, CliError> {
    let config = OrganizerConfig::load(config_path)?;
    execute(command, dir_path, &config, options, None)
}

fn execute(
    command: OrganizeCommand,
    dir_path: &Path,
    config: &OrganizerConfig,
    options: RunOptions,
    interrupt: Option<Arc<AtomicBool>>,
) -> Result<RunStatus, CliError> {
    let mut sink = ConsoleSink::new(options);

    for conflict in config.categories.conflicts() {
        sink.warning(
            Stage::Organize,
            format!(
                "Extension .{} is listed under both {} and {}; {} wins",
                conflict.extension, conflict.winner, conflict.shadowed, conflict.winner
            ),
        );
    }

    match command {
        OrganizeCommand::Organize { dry_run, recursive } => {
            organize_directory(dir_path, config, dry_run, recursive, interrupt, &mut sink)
        }
        OrganizeCommand::Undo => undo_organization(dir_path, config, &mut sink),
    }
}

fn organize_directory(
    dir_path: &Path,
    config: &OrganizerConfig,
    dry_run: bool,
    recursive: bool,
    interrupt: Option<Arc<AtomicBool>>,
    sink: &mut ConsoleSink,
) -> Result<RunStatus, CliError> {
    let quiet = sink.options.quiet;
    if !quiet {
        if dry_run {
            OutputFormatter::dry_run_notice(&format!("Analyzing contents of: {}", dir_path.display()));
        } else {
            OutputFormatter::info(&format!("Organizing contents of: {}", dir_path.display()));
        }
    }

    let mut organizer = Organizer::new(config, dry_run);
    if let Some(flag) = interrupt {
        organizer = organizer.with_interrupt(flag);
    }
    let result = organizer.organize(dir_path, recursive, sink);
    sink.finish();
    let stats = result?;

    if !quiet {
        OutputFormatter::summary_table(&stats);
        if dry_run {
            OutputFormatter::dry_run_notice("No files were modified.");
        } else if stats.history_file.is_some() {
            OutputFormatter::success(&format!(
                "History saved. Run 'dirsort --path {} --undo' to revert.",
                dir_path.display()
            ));
        }
    }

    if stats.interrupted {
        return Ok(RunStatus::Interrupted);
    }
    if !stats.is_success() {
        if let Some(reason) = &stats.history_error {
            OutputFormatter::error(&format!("Undo will not be available: {}", reason));
        }
        if stats.errors > 0 {
            OutputFormatter::error(&format!(
                "{} file(s) could not be organized. Please review errors above.",
                stats.errors
            ));
        }
        return Ok(RunStatus::Failed);
    }
    Ok(RunStatus::Success)
}

fn undo_organization(
    dir_path: &Path,
    config: &OrganizerConfig,
    sink: &mut ConsoleSink,
) -> Result<RunStatus, CliError> {
    let quiet = sink.options.quiet;
    if !quiet {
        OutputFormatter::info("Undoing previous organization...");
    }

    match UndoManager::undo(dir_path, config, sink)? {
        UndoOutcome::NothingToUndo => {
            if !quiet {
                OutputFormatter::info("Nothing to undo.");
            }
            Ok(RunStatus::Success)
        }
        UndoOutcome::Completed(report) => {
            if !quiet {
                OutputFormatter::undo_summary(&report);
            }
            if report.failed.is_empty() {
                Ok(RunStatus::Success)
            } else {
                Ok(RunStatus::Failed)
            }
        }
    }
}

/// True once the interrupt flag has been raised.
pub fn interrupted(flag: &AtomicBool) -> bool {
    flag.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_from_flags() {
        let cli = Cli::parse_from(["dirsort", "-p", "/tmp/x", "-d", "-r"]);
        assert_eq!(
            cli.command(),
            OrganizeCommand::Organize {
                dry_run: true,
                recursive: true
            }
        );

        let cli = Cli::parse_from(["dirsort", "--path", "/tmp/x", "--undo"]);
        assert_eq!(cli.command(), OrganizeCommand::Undo);
    }

    #[test]
    fn test_path_required_without_create_config() {
        assert!(Cli::try_parse_from(["dirsort"]).is_err());

        let cli = Cli::try_parse_from(["dirsort", "--create-config"]).expect("parse");
        assert_eq!(cli.create_config, Some(PathBuf::from("config.json")));

        let cli = Cli::try_parse_from(["dirsort", "--create-config", "mine.json"]).expect("parse");
        assert_eq!(cli.create_config, Some(PathBuf::from("mine.json")));
    }

    #[test]
    fn test_conflicting_flags_rejected() {
        assert!(Cli::try_parse_from(["dirsort", "-p", "x", "-u", "-d"]).is_err());
        assert!(Cli::try_parse_from(["dirsort", "-p", "x", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunStatus::Success.exit_code(), 0);
        assert_eq!(RunStatus::Failed.exit_code(), 1);
        assert_eq!(RunStatus::Interrupted.exit_code(), 130);
    }

    #[test]
    fn test_interrupted_reads_flag() {
        let flag = AtomicBool::new(false);
        assert!(!interrupted(&flag));
        flag.store(true, Ordering::SeqCst);
        assert!(interrupted(&flag));
    }
}
