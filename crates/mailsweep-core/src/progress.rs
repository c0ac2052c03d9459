//! Progress callbacks.
//!
//! Reporters are called from whichever task finishes a unit of work, so
//! they must be `Send + Sync`. Every method defaults to doing nothing.

use std::fmt;

use mailsweep_imap::Uid;
use serde::Serialize;

/// Run parameters announced before the first folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Move-phase workers.
    pub max_workers: usize,
    /// Header-fetch workers.
    pub header_fetch_workers: usize,
    /// Messages per batch.
    pub batch_size: usize,
    /// CPUs detected.
    pub cpu_count: usize,
    /// Most sessions open at once.
    pub total_connections: usize,
    /// Nothing will be changed.
    pub dry_run: bool,
    /// Minimum message age in days.
    pub age_days: u32,
    /// Folders to scan, in order.
    pub source_folders: Vec<String>,
    /// Where matches go.
    pub target_folder: String,
}

/// Pipeline phase within a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Running searches.
    Searching,
    /// Fetching sender and subject.
    FetchingHeaders,
    /// Classifying.
    Deciding,
    /// Moving (or reporting would-be moves).
    Executing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Searching => "searching",
            Self::FetchingHeaders => "fetching headers",
            Self::Deciding => "classifying",
            Self::Executing => "moving",
        })
    }
}

/// What happened to one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailAction {
    /// Left in place.
    Skip,
    /// Would have been moved.
    DryRun,
    /// Moved.
    Moved,
    /// Move attempted and failed.
    Failed,
}

impl fmt::Display for EmailAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Skip => "skip",
            Self::DryRun => "dry-run",
            Self::Moved => "moved",
            Self::Failed => "failed",
        })
    }
}

/// Receives progress events from a run.
#[allow(unused_variables)]
pub trait ProgressReporter: Send + Sync {
    /// Run is starting.
    fn on_start(&self, stats: &RunStats) {}

    /// Folder `index` (1-based) of `total_folders` is starting.
    fn on_folder_start(&self, folder: &str, total_folders: usize, index: usize) {}

    /// A phase is starting with `items` units of work.
    fn on_phase_start(&self, phase: Phase, items: usize) {}

    /// `current` of `total` units done.
    fn on_progress(&self, current: usize, total: usize, message: &str) {}

    /// A message was skipped, moved, or would have been.
    fn on_email_processed(
        &self,
        action: EmailAction,
        uid: Uid,
        sender: &str,
        subject: &str,
        reason: &str,
    ) {
    }

    /// Folder finished.
    fn on_folder_complete(&self, folder: &str, candidates: usize, moved: usize) {}

    /// Run finished.
    fn on_complete(&self, candidates: usize, moved: usize) {}

    /// Run-ending error.
    fn on_error(&self, error: &str, details: &str) {}
}

/// Ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {}
