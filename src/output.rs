//! Progress bars, colored output, and summary formatting.
//!
//! This module provides visual feedback during a batch run including
//! the progress bar, verbose step lines, and the colored summary.

use crate::batch::BatchReport;
use crate::config::Config;
use crate::constants::{MAX_VISIBLE_COMPLETIONS, PROGRESS_TICK_MS};
use crate::repo::{RepositoryOutcome, RepositoryTask, UpdateCallbacks, UpdateStep};
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// No-op callbacks for when progress tracking is not needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoOpCallbacks;

impl UpdateCallbacks for NoOpCallbacks {}

/// Prints a step progress line in verbose mode.
fn print_step(repo_name: &str, step: &UpdateStep) {
    eprintln!(
        "{} {}...",
        format!("[{}]", repo_name).white().bold(),
        step.to_string().dimmed()
    );
}

/// Consolidated state for batch progress tracking.
/// One lock covers the related fields so redraws see a consistent view.
struct CompletionState {
    /// Recently completed repos for display (bounded by MAX_VISIBLE_COMPLETIONS)
    repos: VecDeque<(String, bool)>,
    /// Count of failed repos for status message
    failed_count: usize,
    /// Total completed for determining ellipsis display
    total_completed: usize,
}

/// Thread-safe progress tracker for a batch run.
/// Shows a progress bar with the completion count and recent results.
pub struct BatchProgress {
    _multi: MultiProgress,
    main_bar: ProgressBar,
    completion_slots: Vec<ProgressBar>,
    state: Mutex<CompletionState>,
    verbose: bool,
}

impl BatchProgress {
    pub fn mark_completed(&self, repo_name: &str, success: bool) {
        self.main_bar.inc(1);

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if !success {
            state.failed_count += 1;
            self.main_bar
                .set_message(format!("│ {} failed", state.failed_count).red().to_string());
        }

        state.total_completed += 1;
        state.repos.push_back((repo_name.to_string(), success));

        while state.repos.len() > MAX_VISIBLE_COMPLETIONS {
            state.repos.pop_front();
        }

        self.redraw_completions(&state);
    }

    pub fn finish(&self) {
        self.main_bar.finish_and_clear();
        for slot in &self.completion_slots {
            slot.finish_and_clear();
        }
    }

    fn redraw_completions(&self, state: &CompletionState) {
        let show_ellipsis = state.total_completed > MAX_VISIBLE_COMPLETIONS;

        for (i, slot) in self.completion_slots.iter().enumerate() {
            if i == 0 && show_ellipsis {
                slot.set_message("...".dimmed().to_string());
            } else {
                let idx = if show_ellipsis { i - 1 } else { i };
                if idx < state.repos.len() {
                    let (name, success) = &state.repos[idx];
                    let symbol = if *success { "✓".green() } else { "✗".red() };
                    slot.set_message(format!("{} {}", symbol, name));
                } else {
                    slot.set_message("");
                }
            }
        }
    }
}

impl UpdateCallbacks for BatchProgress {
    fn on_step(&self, task: &RepositoryTask, step: &UpdateStep) {
        if self.verbose {
            print_step(task.name(), step);
        }
    }

    fn on_complete(&self, outcome: &RepositoryOutcome) {
        let name = RepositoryTask::new(outcome.path()).name().to_string();
        self.mark_completed(&name, outcome.is_success());
    }
}

/// Creates a progress bar for a batch showing completion count.
/// Returns hidden progress bars in quiet or verbose mode.
#[must_use]
pub fn create_batch_progress(total: usize, config: &Config) -> BatchProgress {
    let multi = MultiProgress::new();
    let hide_progress = config.is_quiet() || config.is_verbose();

    let main_bar = if hide_progress {
        ProgressBar::hidden()
    } else {
        let bar = multi.add(ProgressBar::new(total as u64));
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{bar:40.cyan/blue} {pos}/{len} updated {spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█░"),
        );
        bar.enable_steady_tick(Duration::from_millis(PROGRESS_TICK_MS));
        bar
    };

    let completion_slots: Vec<ProgressBar> = if hide_progress {
        vec![]
    } else {
        (0..MAX_VISIBLE_COMPLETIONS)
            .map(|_| {
                let slot = multi.add(ProgressBar::new_spinner());
                slot.set_style(
                    ProgressStyle::default_spinner()
                        .template("  {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                slot
            })
            .collect()
    };

    BatchProgress {
        _multi: multi,
        main_bar,
        completion_slots,
        state: Mutex::new(CompletionState {
            repos: VecDeque::new(),
            failed_count: 0,
            total_completed: 0,
        }),
        verbose: config.is_verbose(),
    }
}

pub fn print_working_dir(path: &Path, config: &Config) {
    if config.is_quiet() {
        return;
    }
    println!(
        "{} {}",
        "Searching in:".cyan(),
        path.display().to_string().white().bold()
    )
}

pub fn print_agent_ready(socket: &Path, config: &Config) {
    if config.is_quiet() {
        return;
    }
    println!(
        "{} {}",
        "SSH agent ready:".cyan(),
        socket.display().to_string().dimmed()
    )
}

pub fn print_discovery(count: usize, elapsed: Duration, config: &Config) {
    if config.is_quiet() {
        return;
    }
    if count == 0 {
        print_no_repos()
    } else {
        println!(
            "{}",
            format!(
                "Found {} repositories in {}",
                count,
                format_duration(elapsed)
            )
            .dimmed()
        )
    }
}

/// Prints a run-aborting error. Shown even in quiet mode.
pub fn print_fatal(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message);
}

pub fn print_summary(report: &BatchReport, duration: Duration, config: &Config) {
    if config.is_quiet() {
        print_quiet_summary(report);
    } else {
        print_normal_summary(report, duration);
    }
}

fn print_quiet_summary(report: &BatchReport) {
    // Always print count to stdout
    println!(
        "{}/{} repositories updated",
        report.succeeded.len(),
        report.total()
    );

    // Print failures to stderr
    for outcome in &report.failed {
        eprintln!("error: {}: {}", outcome.path().display(), outcome.reason());
    }
}

fn print_normal_summary(report: &BatchReport, duration: Duration) {
    print_section("Summary");
    println!(
        "Done. {} updated, {} failed.\n",
        report.succeeded.len().to_string().green().bold(),
        report.failed.len().to_string().red().bold()
    );

    print_successes(&report.succeeded);
    print_failures(&report.failed);

    println!(
        "{}: {}/{} repos in {}",
        "Total".white().bold(),
        report.succeeded.len(),
        report.total(),
        format_duration(duration)
    );
}

fn print_no_repos() {
    println!("{}", "No git repositories found".yellow().bold())
}

fn format_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f32())
}

fn print_section(title: &str) {
    let line = "=".repeat(50).cyan().dimmed();
    let padding = (50 - title.len()) / 2;
    let centered = format!("{:>width$}", title, width = padding + title.len());
    println!("\n{}\n{}\n{}\n", line, centered.cyan().bold(), line);
}

fn format_success(outcome: &RepositoryOutcome) -> String {
    format!(
        "  {} {} {}",
        "OK".green().bold(),
        outcome.path().display().to_string().white(),
        format!("(branch: {})", outcome.branch()).cyan(),
    )
}

fn format_failure(outcome: &RepositoryOutcome) -> String {
    format!(
        "  {} {} {}",
        "FAIL".red().bold(),
        outcome.path().display().to_string().white(),
        format!("(reason: {})", outcome.reason()).red(),
    )
}

fn print_successes(successes: &[RepositoryOutcome]) {
    if successes.is_empty() {
        return;
    }
    println!(
        "{}",
        format!("Succeeded ({}):", successes.len()).green().bold()
    );
    for outcome in successes {
        println!("{}", format_success(outcome));
    }
    println!();
}

fn print_failures(failures: &[RepositoryOutcome]) {
    if failures.is_empty() {
        return;
    }
    println!("{}", format!("Failed ({}):", failures.len()).red().bold());
    for outcome in failures {
        println!("{}", format_failure(outcome));
    }
    println!();
}
