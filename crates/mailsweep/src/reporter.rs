//! Console progress output.

use mailsweep_core::{EmailAction, Phase, ProgressReporter, RunStats, Uid};

/// Prints progress to stdout and errors to stderr.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    /// Per-message lines are printed only when `verbose`.
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleReporter {
    fn on_start(&self, stats: &RunStats) {
        println!(
            "[i] {} workers, {} header workers, batches of {}, up to {} connections ({} CPUs)",
            stats.max_workers,
            stats.header_fetch_workers,
            stats.batch_size,
            stats.total_connections,
            stats.cpu_count
        );
        println!(
            "[i] Folders: {} -> {} | older than {} days{}",
            stats.source_folders.join(", "),
            stats.target_folder,
            stats.age_days,
            if stats.dry_run { " | DRY RUN" } else { "" }
        );
    }

    fn on_folder_start(&self, folder: &str, total_folders: usize, index: usize) {
        println!("[i] Folder {index}/{total_folders}: {folder}");
    }

    fn on_phase_start(&self, phase: Phase, items: usize) {
        if self.verbose {
            println!("    {phase} ({items})");
        }
    }

    fn on_email_processed(
        &self,
        action: EmailAction,
        uid: Uid,
        sender: &str,
        subject: &str,
        reason: &str,
    ) {
        if !self.verbose {
            return;
        }
        match action {
            EmailAction::Skip => println!("  - SKIP ({reason}): {sender} | {subject}"),
            EmailAction::DryRun => {
                println!("  - DRY-RUN would move UID {uid} | {sender} | {reason} | {subject}");
            }
            EmailAction::Moved => println!("  - Moved UID {uid} | {reason}"),
            EmailAction::Failed => println!("  - FAILED UID {uid} | {sender} | {subject}"),
        }
    }

    fn on_folder_complete(&self, folder: &str, candidates: usize, moved: usize) {
        println!("[✓] {folder}: {candidates} candidates, {moved} moved");
    }

    fn on_error(&self, error: &str, details: &str) {
        eprintln!("[!] {error}: {details}");
    }
}
