//! Configuration validation.

use super::{Config, WorkerCount};

/// A problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// IMAP host is empty.
    EmptyImapHost,
    /// IMAP port is zero.
    InvalidImapPort,
    /// No folder to scan.
    NoSourceFolders,
    /// Target folder is empty.
    EmptyTargetFolder,
    /// Target folder is also a source folder.
    TargetIsSource,
    /// Age is zero days.
    InvalidAge,
    /// Timeout is zero seconds.
    InvalidTimeout,
    /// Fewer than one search attempt.
    InvalidAttempts,
    /// Zero keywords per search.
    InvalidKeywordChunk,
    /// Zero messages per batch.
    InvalidBatchSize,
    /// Worker count is a string other than `"auto"`.
    InvalidWorkers,
    /// Header worker count is a string other than `"auto"`.
    InvalidHeaderWorkers,
}

impl ValidationError {
    /// Human-readable message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptyImapHost => "IMAP server is required",
            Self::InvalidImapPort => "IMAP port must be 1-65535",
            Self::NoSourceFolders => "At least one source folder is required",
            Self::EmptyTargetFolder => "Target folder is required",
            Self::TargetIsSource => "Target folder must not be a source folder",
            Self::InvalidAge => "Age must be at least one day",
            Self::InvalidTimeout => "Search timeout must be at least one second",
            Self::InvalidAttempts => "Search attempts must be at least 1",
            Self::InvalidKeywordChunk => "Keywords per search must be at least 1",
            Self::InvalidBatchSize => "Batch size must be at least 1",
            Self::InvalidWorkers => "Workers must be a number or \"auto\"",
            Self::InvalidHeaderWorkers => "Header fetch workers must be a number or \"auto\"",
        }
    }

    /// The setting this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyImapHost => "imap_host",
            Self::InvalidImapPort => "imap_port",
            Self::NoSourceFolders => "source_folders",
            Self::EmptyTargetFolder | Self::TargetIsSource => "target_folder",
            Self::InvalidAge => "age_days",
            Self::InvalidTimeout => "search_timeout",
            Self::InvalidAttempts => "search_max_attempts",
            Self::InvalidKeywordChunk => "max_search_keywords",
            Self::InvalidBatchSize => "batch_size",
            Self::InvalidWorkers => "max_workers",
            Self::InvalidHeaderWorkers => "header_fetch_workers",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field(), self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Result of validating a configuration.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

pub(super) fn validate(config: &Config) -> ValidationResult {
    let mut errors = Vec::new();
    let mail = &config.mail_settings;
    let cleanup = &config.cleanup_settings;

    if mail.imap_host.trim().is_empty() {
        errors.push(ValidationError::EmptyImapHost);
    }
    if mail.imap_port == 0 {
        errors.push(ValidationError::InvalidImapPort);
    }
    if mail.source_folders.iter().all(|f| f.trim().is_empty()) {
        errors.push(ValidationError::NoSourceFolders);
    }
    if mail.target_folder.trim().is_empty() {
        errors.push(ValidationError::EmptyTargetFolder);
    } else if mail.source_folders.iter().any(|f| f == &mail.target_folder) {
        errors.push(ValidationError::TargetIsSource);
    }

    if cleanup.age_days == 0 {
        errors.push(ValidationError::InvalidAge);
    }
    if cleanup.search_timeout == 0 {
        errors.push(ValidationError::InvalidTimeout);
    }
    if cleanup.search_max_attempts == 0 {
        errors.push(ValidationError::InvalidAttempts);
    }
    if cleanup.max_search_keywords == 0 {
        errors.push(ValidationError::InvalidKeywordChunk);
    }
    if cleanup.batch_size == 0 {
        errors.push(ValidationError::InvalidBatchSize);
    }
    if !is_valid_workers(&cleanup.max_workers) {
        errors.push(ValidationError::InvalidWorkers);
    }
    if !is_valid_workers(&cleanup.header_fetch_workers) {
        errors.push(ValidationError::InvalidHeaderWorkers);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_workers(workers: &WorkerCount) -> bool {
    match workers {
        WorkerCount::Count(_) => true,
        WorkerCount::Keyword(word) => word.eq_ignore_ascii_case("auto"),
    }
}
