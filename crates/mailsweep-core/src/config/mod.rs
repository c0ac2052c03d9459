//! Run configuration.
//!
//! The JSON layout groups settings in sections:
//!
//! ```json
//! {
//!   "mail_settings": { "imap_host": "...", "source_folders": ["INBOX"] },
//!   "cleanup_settings": { "age_days": 365, "dry_run": true, "max_workers": "auto" },
//!   "subject_keywords": ["newsletter"],
//!   "protect_keywords": ["invoice"],
//!   "whitelist_settings": { "whitelist_file": "whitelist.txt", "additional_whitelist": [] },
//!   "delete_domains": []
//! }
//! ```
//!
//! Every field has a default, so any subset may be given.

mod load;
mod validation;

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use self::load::merge_json;
pub use self::validation::{ValidationError, ValidationResult};
use crate::error::Result;

/// Lower and upper bound for any worker pool.
pub const MIN_WORKERS: usize = 1;
/// Upper bound for any worker pool.
pub const MAX_WORKERS: usize = 20;

/// Complete configuration for one run. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server and folders.
    pub mail_settings: MailSettings,
    /// Pipeline tuning.
    pub cleanup_settings: CleanupSettings,
    /// Subject words that make a message a candidate.
    pub subject_keywords: Vec<String>,
    /// Subject words that keep a message where it is.
    pub protect_keywords: Vec<String>,
    /// Senders never touched.
    pub whitelist_settings: WhitelistSettings,
    /// Sender domains whose mail is always a candidate.
    pub delete_domains: Vec<String>,
}

/// Server address and folders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    /// IMAP server hostname.
    pub imap_host: String,
    /// IMAP server port (implicit TLS).
    pub imap_port: u16,
    /// Folders scanned, in order.
    pub source_folders: Vec<String>,
    /// Where matching messages are moved.
    pub target_folder: String,
}

/// Pipeline tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupSettings {
    /// Only messages older than this many days are considered.
    pub age_days: u32,
    /// Classify and report, but never change the mailbox.
    pub dry_run: bool,
    /// Log every decision at info level.
    pub verbose: bool,
    /// Per-command timeout in seconds.
    pub search_timeout: u64,
    /// Total attempts per search when the network fails.
    pub search_max_attempts: u32,
    /// Subject keywords per OR-combined search.
    pub max_search_keywords: usize,
    /// Workers for the move phase.
    pub max_workers: WorkerCount,
    /// Messages per batch in both parallel phases.
    pub batch_size: usize,
    /// Workers for the header fetch phase.
    pub header_fetch_workers: WorkerCount,
}

/// Whitelist sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhitelistSettings {
    /// One address or domain per line; `#` starts a comment line.
    pub whitelist_file: PathBuf,
    /// Extra entries.
    pub additional_whitelist: Vec<String>,
}

/// A worker count: a number, or `"auto"` for half the CPUs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkerCount {
    /// Explicit count. Non-positive values fall back to auto.
    Count(i64),
    /// `"auto"`; any other string is rejected by validation.
    Keyword(String),
}

impl WorkerCount {
    /// `"auto"`.
    #[must_use]
    pub fn auto() -> Self {
        Self::Keyword("auto".to_string())
    }

    /// Resolves to a concrete count for a machine with `cpus` CPUs,
    /// clamped to [`MIN_WORKERS`, `MAX_WORKERS`].
    #[must_use]
    pub fn resolve(&self, cpus: usize) -> usize {
        match self {
            Self::Count(n) if *n > 0 => {
                usize::try_from(*n).map_or(MAX_WORKERS, |n| n.clamp(MIN_WORKERS, MAX_WORKERS))
            }
            _ => (cpus / 2).clamp(MIN_WORKERS, MAX_WORKERS),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mail_settings: MailSettings::default(),
            cleanup_settings: CleanupSettings::default(),
            subject_keywords: to_strings(DEFAULT_SUBJECT_KEYWORDS),
            protect_keywords: to_strings(DEFAULT_PROTECT_KEYWORDS),
            whitelist_settings: WhitelistSettings::default(),
            delete_domains: Vec::new(),
        }
    }
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            imap_host: "imap.mail.me.com".to_string(),
            imap_port: 993,
            source_folders: vec!["INBOX".to_string(), "Archive".to_string()],
            target_folder: "Review/Delete".to_string(),
        }
    }
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self {
            age_days: 365,
            dry_run: true,
            verbose: true,
            search_timeout: 30,
            search_max_attempts: 3,
            max_search_keywords: 10,
            max_workers: WorkerCount::auto(),
            batch_size: 50,
            header_fetch_workers: WorkerCount::auto(),
        }
    }
}

impl Default for WhitelistSettings {
    fn default() -> Self {
        Self {
            whitelist_file: PathBuf::from("whitelist.txt"),
            additional_whitelist: Vec::new(),
        }
    }
}

impl CleanupSettings {
    /// Per-command timeout.
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout)
    }
}

impl Config {
    /// Checks every setting and reports all problems at once.
    ///
    /// # Errors
    ///
    /// Returns the list of problems found.
    pub fn validate(&self) -> ValidationResult {
        validation::validate(self)
    }

    /// Processing workers for a machine with `cpus` CPUs.
    #[must_use]
    pub fn max_workers(&self, cpus: usize) -> usize {
        self.cleanup_settings.max_workers.resolve(cpus)
    }

    /// Header fetch workers for a machine with `cpus` CPUs.
    #[must_use]
    pub fn header_fetch_workers(&self, cpus: usize) -> usize {
        self.cleanup_settings.header_fetch_workers.resolve(cpus)
    }

    /// Whitelist entries: `additional_whitelist` plus the lines of the
    /// whitelist file, trimmed and lowercased. A missing file is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read.
    pub fn load_whitelist(&self) -> Result<HashSet<String>> {
        let settings = &self.whitelist_settings;
        let mut entries: HashSet<String> = settings
            .additional_whitelist
            .iter()
            .map(|entry| entry.trim().to_lowercase())
            .filter(|entry| !entry.is_empty())
            .collect();

        match std::fs::read_to_string(&settings.whitelist_file) {
            Ok(text) => {
                let before = entries.len();
                entries.extend(parse_whitelist(&text));
                tracing::debug!(
                    file = %settings.whitelist_file.display(),
                    added = entries.len() - before,
                    "loaded whitelist file"
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(file = %settings.whitelist_file.display(), "no whitelist file");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(entries)
    }
}

/// Parses whitelist file content.
#[must_use]
pub fn parse_whitelist(text: &str) -> HashSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_lowercase)
        .collect()
}

/// Number of CPUs, or 4 when it cannot be determined.
#[must_use]
pub fn available_cpus() -> usize {
    std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get)
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

const DEFAULT_SUBJECT_KEYWORDS: &[&str] = &[
    "unsubscribe",
    "newsletter",
    "nieuwsbrief",
    "promo",
    "promotion",
    "actie",
    "deal",
    "korting",
    "sale",
    "update",
    "digest",
    "marketing",
    "leveringsupdate",
    "tracking",
    "pakket",
    "afgeleverd",
    "bezorgd",
    "shipping",
    "delivered",
    "transactiebevestiging",
    "bevestiging",
    "reactie",
    "kopie",
    "bestelling",
    "order",
    "verzending",
    "bezorging",
    "behandeling",
    "bedankt",
    "thank",
    "confirmation",
    "confirmed",
    "shipment",
    "delivery",
    "processing",
    "Wat vond u",
];

const DEFAULT_PROTECT_KEYWORDS: &[&str] = &[
    "factuur",
    "rekening",
    "nota",
    "bill",
    "invoice",
    "belasting",
    "btw",
    "tax",
    "vat",
    "aanslag",
    "incasso",
    "aanmaning",
    "reminder",
    "overdue",
    "refund",
    "terugbetaling",
    "chargeback",
    "saldo",
    "afschrift",
    "account statement",
];
