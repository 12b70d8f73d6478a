//! Output formatting and styling module.
//!
//! Every line the command-line tool prints goes through [`OutputFormatter`],
//! so colors, symbols and table layout are decided in one place.

use crate::file_organizer::Statistics;
use crate::undo::UndoReport;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗, on stderr)
/// - Warning messages (yellow with ⚠)
/// - Progress bars and summary tables
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirsort::output::OutputFormatter;
    /// OutputFormatter::success("Organization complete");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a dimmed detail line, used for per-file messages in verbose mode.
    pub fn detail(message: &str) {
        println!("  {}", message.dimmed());
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar for `total` files.
    ///
    /// ```no_run
    /// use dirsort::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Prints the counters of an organize run and the per-category table.
    ///
    /// Categories are listed by descending file count.
    pub fn summary_table(stats: &Statistics) {
        Self::header(if stats.preview {
            "SUMMARY (preview)"
        } else {
            "SUMMARY"
        });

        println!("  Total files: {}", stats.total);
        println!("  Organized:   {}", stats.organized.to_string().green());
        println!("  Skipped:     {}", stats.skipped.to_string().yellow());
        let errors = if stats.errors > 0 {
            stats.errors.to_string().red()
        } else {
            stats.errors.to_string().normal()
        };
        println!("  Errors:      {}", errors);
        println!("  Time:        {:.2}s", stats.elapsed.as_secs_f64());

        let categories = stats.categories_by_count();
        if categories.is_empty() {
            return;
        }

        let width = categories
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max(8); // "Category"

        println!();
        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));
        for (category, count) in &categories {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }
        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            stats.organized.to_string().green().bold(),
            plural(stats.organized),
            width = width
        );
    }

    /// Prints the outcome of an undo run.
    pub fn undo_summary(report: &UndoReport) {
        Self::header("UNDO SUMMARY");
        let (restored, attempted) = report.counts();
        println!(
            "  Restored: {}/{}",
            if restored == attempted {
                restored.to_string().green()
            } else {
                restored.to_string().yellow()
            },
            attempted
        );

        if !report.missing.is_empty() {
            println!("  Not found: {}", report.missing.len());
            for path in &report.missing {
                println!("    - {}", path.display());
            }
        }
        if !report.failed.is_empty() {
            println!("  Failed: {}", report.failed.len().to_string().red());
            for (path, reason) in &report.failed {
                eprintln!("    - {}: {}", path.display(), reason);
            }
        }
        if !report.backups.is_empty() {
            println!("  Moved aside: {}", report.backups.len());
            for path in &report.backups {
                println!("    - {}", path.display());
            }
        }
        if !report.removed_dirs.is_empty() {
            println!("  Removed empty folders: {}", report.removed_dirs.len());
        }
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
