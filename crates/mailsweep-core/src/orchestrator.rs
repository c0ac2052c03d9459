//! Runs the cleanup over every source folder.
//!
//! Each folder goes through four phases:
//!
//! 1. **Searching**: the unsubscribe, subject and domain searches run on
//!    the run's main session and give three UID sets.
//! 2. **Fetching headers**: candidates are split into batches fetched in
//!    parallel, each batch on its own pooled session.
//! 3. **Deciding**: every fetched message is classified in one pass.
//! 4. **Executing**: moves run in parallel batches, each batch opening
//!    the folder read-write on its own session. A dry run only reports.
//!
//! Batches finish in any order; totals are plain sums. Cancellation is
//! checked between folders and never interrupts a running phase.

use std::collections::HashMap;
use std::ops::AddAssign;
use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use mailsweep_imap::Uid;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::classify::{Decision, MatchSets, Rules, Verdict, classify};
use crate::config::{Config, available_cpus};
use crate::error::{Error, Result};
use crate::pool::SessionPool;
use crate::progress::{EmailAction, NoopReporter, Phase, ProgressReporter, RunStats};
use crate::protocol::{
    FolderSearch, HeaderRecord, ensure_folder_exists, fetch_headers_batch, folder_exists,
    move_message,
};
use crate::query::{FolderQueries, cutoff_date};
use crate::session::{Connector, MailSession};

/// Candidates found and messages moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    /// Messages classified for moving.
    pub candidates: usize,
    /// Messages moved, or that would have been in a dry run.
    pub moved: usize,
}

impl AddAssign for Totals {
    fn add_assign(&mut self, other: Self) {
        self.candidates += other.candidates;
        self.moved += other.moved;
    }
}

/// Everything a run needs from the configuration, resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Folders to scan, in order.
    pub source_folders: Vec<String>,
    /// Where matches go.
    pub target_folder: String,
    /// Minimum message age.
    pub age_days: u32,
    /// Report only.
    pub dry_run: bool,
    /// Total attempts per search.
    pub search_max_attempts: u32,
    /// Subject keywords per OR-combined search.
    pub max_search_keywords: usize,
    /// Messages per batch.
    pub batch_size: usize,
    /// Concurrent move batches.
    pub max_workers: usize,
    /// Concurrent header-fetch batches.
    pub header_fetch_workers: usize,
    /// CPUs the worker counts were derived from.
    pub cpu_count: usize,
    /// Subject trigger keywords.
    pub subject_keywords: Vec<String>,
    /// Deletion domains.
    pub delete_domains: Vec<String>,
}

impl RunSettings {
    /// Resolves worker counts for `cpus` CPUs.
    #[must_use]
    pub fn from_config(config: &Config, cpus: usize) -> Self {
        let cleanup = &config.cleanup_settings;
        Self {
            source_folders: config.mail_settings.source_folders.clone(),
            target_folder: config.mail_settings.target_folder.clone(),
            age_days: cleanup.age_days,
            dry_run: cleanup.dry_run,
            search_max_attempts: cleanup.search_max_attempts,
            max_search_keywords: cleanup.max_search_keywords,
            batch_size: cleanup.batch_size.max(1),
            max_workers: config.max_workers(cpus),
            header_fetch_workers: config.header_fetch_workers(cpus),
            cpu_count: cpus,
            subject_keywords: config.subject_keywords.clone(),
            delete_domains: config.delete_domains.clone(),
        }
    }

    /// Sessions the pool may hold at once.
    #[must_use]
    pub const fn total_connections(&self) -> usize {
        self.max_workers + self.header_fetch_workers
    }
}

/// Drives a cleanup run.
pub struct Orchestrator<C: Connector> {
    pool: Arc<SessionPool<C>>,
    rules: Arc<Rules>,
    reporter: Arc<dyn ProgressReporter>,
    settings: RunSettings,
    verbose: bool,
    cancel: CancellationToken,
    today: NaiveDate,
}

impl<C: Connector> Orchestrator<C> {
    /// Creates an orchestrator for this machine's CPU count.
    #[must_use]
    pub fn new(connector: C, config: &Config, rules: Rules) -> Self {
        Self::with_settings(
            connector,
            RunSettings::from_config(config, available_cpus()),
            rules,
        )
        .verbose(config.cleanup_settings.verbose)
    }

    /// Creates an orchestrator from resolved settings.
    #[must_use]
    pub fn with_settings(connector: C, settings: RunSettings, rules: Rules) -> Self {
        let pool = SessionPool::new(connector, settings.total_connections());
        Self {
            pool: Arc::new(pool),
            rules: Arc::new(rules),
            reporter: Arc::new(NoopReporter),
            settings,
            verbose: false,
            cancel: CancellationToken::new(),
            today: Utc::now().date_naive(),
        }
    }

    /// Sends progress events to `reporter`.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Uses `token` to stop between folders.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Logs every decision at info instead of debug.
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Token that stops the run before the next folder.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The session pool.
    #[must_use]
    pub const fn pool(&self) -> &Arc<SessionPool<C>> {
        &self.pool
    }

    /// Resolved settings.
    #[must_use]
    pub const fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Run parameters as announced to the reporter.
    #[must_use]
    pub fn stats(&self) -> RunStats {
        RunStats {
            max_workers: self.settings.max_workers,
            header_fetch_workers: self.settings.header_fetch_workers,
            batch_size: self.settings.batch_size,
            cpu_count: self.settings.cpu_count,
            total_connections: self.settings.total_connections(),
            dry_run: self.settings.dry_run,
            age_days: self.settings.age_days,
            source_folders: self.settings.source_folders.clone(),
            target_folder: self.settings.target_folder.clone(),
        }
    }

    /// Processes every source folder and returns the run totals.
    ///
    /// The pool is closed when this returns.
    ///
    /// # Errors
    ///
    /// Fails when a session cannot be acquired. Phases already running
    /// finish first; later folders are not processed.
    pub async fn run(&self) -> Result<Totals> {
        let stats = self.stats();
        tracing::info!(
            folders = ?stats.source_folders,
            target = %stats.target_folder,
            dry_run = stats.dry_run,
            age_days = stats.age_days,
            workers = stats.max_workers,
            header_workers = stats.header_fetch_workers,
            batch_size = stats.batch_size,
            "starting cleanup"
        );
        self.reporter.on_start(&stats);

        let mut main = match self.pool.acquire().await {
            Ok(session) => session,
            Err(e) => return Err(self.abort(e).await),
        };

        self.prepare_target(&mut *main).await;

        let mut totals = Totals::default();
        let folder_count = self.settings.source_folders.len();
        for (index, folder) in self.settings.source_folders.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!(folder = %folder, "cancelled, skipping remaining folders");
                break;
            }

            self.reporter.on_folder_start(folder, folder_count, index + 1);
            match self.process_folder(&mut *main, folder).await {
                Ok(folder_totals) => {
                    self.reporter.on_folder_complete(
                        folder,
                        folder_totals.candidates,
                        folder_totals.moved,
                    );
                    totals += folder_totals;
                }
                Err(e) => {
                    self.pool.release(main).await;
                    return Err(self.abort(e).await);
                }
            }
        }

        self.pool.release(main).await;
        self.pool.close_all().await;

        tracing::info!(
            candidates = totals.candidates,
            moved = totals.moved,
            connections = self.pool.connections_opened(),
            "cleanup complete"
        );
        self.reporter.on_complete(totals.candidates, totals.moved);
        Ok(totals)
    }

    /// Creates the target folder; a dry run only checks for it.
    async fn prepare_target(&self, session: &mut C::Session) {
        let target = self.settings.target_folder.as_str();
        if self.settings.dry_run {
            match folder_exists(session, target).await {
                Ok(true) => {}
                Ok(false) => tracing::warn!(target, "target folder does not exist"),
                Err(e) => tracing::warn!(target, error = %e, "could not check target folder"),
            }
        } else if let Err(e) = ensure_folder_exists(session, target).await {
            tracing::warn!(target, error = %e, "could not create target folder");
        }
    }

    async fn process_folder(&self, main: &mut C::Session, folder: &str) -> Result<Totals> {
        let started = Instant::now();
        let settings = &self.settings;
        let attempts = settings.search_max_attempts;

        let queries = FolderQueries::build(
            cutoff_date(self.today, settings.age_days),
            &settings.subject_keywords,
            settings.max_search_keywords,
            &settings.delete_domains,
        );
        self.reporter.on_phase_start(Phase::Searching, queries.len());

        let mut search = FolderSearch::new(main, folder, attempts);
        let unsubscribe = search.search(&queries.unsubscribe).await;
        if search.is_unavailable() {
            return Ok(Totals::default());
        }
        let sets = MatchSets {
            unsubscribe,
            subject: search.union(&queries.subject).await,
            domain: search.union(&queries.domain).await,
        };
        let candidates: Vec<Uid> = sets.candidates().into_iter().collect();
        tracing::info!(
            folder,
            unsubscribe = sets.unsubscribe.len(),
            subject = sets.subject.len(),
            domain = sets.domain.len(),
            candidates = candidates.len(),
            "searches done"
        );
        if candidates.is_empty() {
            return Ok(Totals::default());
        }

        let headers = self.fetch_phase(folder, &candidates).await?;
        let actions = self.decide(&candidates, &headers, &sets);
        let found = actions.len();
        let moved = self.execute_phase(folder, actions).await?;

        tracing::info!(
            folder,
            candidates = found,
            moved,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "folder done"
        );
        Ok(Totals {
            candidates: found,
            moved,
        })
    }

    async fn fetch_phase(&self, folder: &str, uids: &[Uid]) -> Result<HashMap<Uid, HeaderRecord>> {
        self.reporter.on_phase_start(Phase::FetchingHeaders, uids.len());
        let slots = Arc::new(Semaphore::new(self.settings.header_fetch_workers.max(1)));
        let mut tasks = JoinSet::new();

        for batch in partition(uids, self.settings.batch_size) {
            let pool = Arc::clone(&self.pool);
            let slots = Arc::clone(&slots);
            let folder = folder.to_string();
            tasks.spawn(async move {
                let _slot = slots.acquire_owned().await.map_err(|_| Error::PoolClosed)?;
                fetch_headers_batch(&pool, &folder, &batch).await
            });
        }

        let mut headers = HashMap::with_capacity(uids.len());
        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(records)) => {
                    headers.extend(records);
                    self.reporter
                        .on_progress(headers.len(), uids.len(), "headers fetched");
                }
                Ok(Err(e)) => {
                    tracing::error!(folder, error = %e, "header batch failed");
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
                Err(e) => tracing::error!(folder, error = %e, "header batch task panicked"),
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(headers),
        }
    }

    fn decide(
        &self,
        candidates: &[Uid],
        headers: &HashMap<Uid, HeaderRecord>,
        sets: &MatchSets,
    ) -> Vec<Decision> {
        self.reporter.on_phase_start(Phase::Deciding, headers.len());
        let mut actions = Vec::new();

        for &uid in candidates {
            let Some(record) = headers.get(&uid) else {
                continue;
            };
            let Some(decision) = classify(
                uid,
                record.from.as_deref(),
                record.subject.as_deref(),
                &self.rules,
                sets,
            ) else {
                tracing::debug!(uid = uid.get(), "no sender, excluded");
                continue;
            };

            match &decision.verdict {
                Verdict::Skip(reason) => {
                    let reason = reason.to_string();
                    self.log_decision("skip", &decision, &reason);
                    self.reporter.on_email_processed(
                        EmailAction::Skip,
                        uid,
                        &decision.address,
                        &decision.subject,
                        &reason,
                    );
                }
                Verdict::Process(_) => actions.push(decision),
            }
        }

        actions
    }

    async fn execute_phase(&self, folder: &str, actions: Vec<Decision>) -> Result<usize> {
        if actions.is_empty() {
            return Ok(0);
        }
        self.reporter.on_phase_start(Phase::Executing, actions.len());

        if self.settings.dry_run {
            for decision in &actions {
                let reason = decision.verdict.to_string();
                self.log_decision("dry-run", decision, &reason);
                self.reporter.on_email_processed(
                    EmailAction::DryRun,
                    decision.uid,
                    &decision.address,
                    &decision.subject,
                    &reason,
                );
            }
            return Ok(actions.len());
        }

        let slots = Arc::new(Semaphore::new(self.settings.max_workers.max(1)));
        let mut tasks = JoinSet::new();
        for batch in partition(&actions, self.settings.batch_size) {
            let pool = Arc::clone(&self.pool);
            let slots = Arc::clone(&slots);
            let reporter = Arc::clone(&self.reporter);
            let folder = folder.to_string();
            let target = self.settings.target_folder.clone();
            let verbose = self.verbose;
            tasks.spawn(async move {
                let _slot = slots.acquire_owned().await.map_err(|_| Error::PoolClosed)?;
                let mut session = pool.acquire().await?;
                let moved =
                    move_batch(&mut *session, &folder, &target, &batch, &*reporter, verbose).await;
                pool.release(session).await;
                Ok::<usize, Error>(moved)
            });
        }

        let mut moved = 0;
        let mut finished = 0;
        let mut failure = None;
        let batches = tasks.len();
        while let Some(joined) = tasks.join_next().await {
            finished += 1;
            match joined {
                Ok(Ok(count)) => {
                    moved += count;
                    self.reporter.on_progress(finished, batches, "batches moved");
                }
                Ok(Err(e)) => {
                    tracing::error!(folder, error = %e, "move batch failed");
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
                Err(e) => tracing::error!(folder, error = %e, "move batch task panicked"),
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(moved),
        }
    }

    fn log_decision(&self, action: &str, decision: &Decision, reason: &str) {
        if self.verbose {
            tracing::info!(
                action,
                uid = decision.uid.get(),
                sender = %decision.address,
                subject = %decision.subject,
                reason,
                "decision"
            );
        } else {
            tracing::debug!(
                action,
                uid = decision.uid.get(),
                sender = %decision.address,
                subject = %decision.subject,
                reason,
                "decision"
            );
        }
    }

    async fn abort(&self, error: Error) -> Error {
        tracing::error!(error = %error, "cleanup aborted");
        self.reporter
            .on_error("cleanup aborted", &error.to_string());
        self.pool.close_all().await;
        error
    }
}

impl<C: Connector> std::fmt::Debug for Orchestrator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("settings", &self.settings)
            .field("verbose", &self.verbose)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

/// Opens `folder` read-write and moves each message; returns how many
/// moved. A folder that cannot be opened fails the whole batch.
async fn move_batch<S: MailSession + ?Sized>(
    session: &mut S,
    folder: &str,
    target: &str,
    batch: &[Decision],
    reporter: &dyn ProgressReporter,
    verbose: bool,
) -> usize {
    if let Err(e) = session.select(folder).await {
        tracing::warn!(folder, batch = batch.len(), error = %e, "could not open folder for moving");
        for decision in batch {
            reporter.on_email_processed(
                EmailAction::Failed,
                decision.uid,
                &decision.address,
                &decision.subject,
                "folder not writable",
            );
        }
        return 0;
    }

    let mut moved = 0;
    for decision in batch {
        let reason = decision.verdict.to_string();
        let ok = move_message(session, decision.uid, target).await;
        let action = if ok {
            moved += 1;
            EmailAction::Moved
        } else {
            EmailAction::Failed
        };

        if verbose && ok {
            tracing::info!(uid = decision.uid.get(), target, reason = %reason, "moved");
        } else if ok {
            tracing::debug!(uid = decision.uid.get(), target, reason = %reason, "moved");
        }
        reporter.on_email_processed(
            action,
            decision.uid,
            &decision.address,
            &decision.subject,
            &reason,
        );
    }
    moved
}

/// Splits `items` into batches of at most `size` (at least one) items,
/// keeping order.
#[must_use]
pub fn partition<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(<[T]>::to_vec).collect()
}
