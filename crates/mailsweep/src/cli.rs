//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;
use mailsweep_core::Config;

/// Moves old newsletters, promotions and notifications out of IMAP
/// folders into a review folder.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Base configuration file.
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// Local overrides applied on top of the base configuration.
    #[arg(long, default_value = "config.local.json")]
    pub local_config: PathBuf,

    /// Report what would move without changing anything.
    #[arg(long, conflicts_with = "execute")]
    pub dry_run: bool,

    /// Actually move messages.
    #[arg(long)]
    pub execute: bool,

    /// Print every decision.
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Print only the summary.
    #[arg(short, long)]
    pub quiet: bool,

    /// Log in once and exit.
    #[arg(long)]
    pub check: bool,

    /// IMAP login name.
    #[arg(long, env = "IMAP_USER", hide_env_values = true)]
    pub user: String,

    /// IMAP password, usually an app-specific password.
    #[arg(long, env = "IMAP_PASS", hide_env_values = true)]
    pub password: String,
}

impl Args {
    /// Default log filter, known before any configuration is read so that
    /// problems with the configuration files are logged. `RUST_LOG`
    /// overrides it.
    pub const fn log_filter(&self) -> &'static str {
        if self.verbose {
            "mailsweep=debug,mailsweep_core=debug"
        } else if self.quiet {
            "mailsweep=warn,mailsweep_core=warn"
        } else {
            "mailsweep=info,mailsweep_core=info"
        }
    }

    /// Lets command line flags override the loaded configuration.
    pub const fn apply(&self, config: &mut Config) {
        if self.dry_run {
            config.cleanup_settings.dry_run = true;
        }
        if self.execute {
            config.cleanup_settings.dry_run = false;
        }
        if self.verbose {
            config.cleanup_settings.verbose = true;
        }
        if self.quiet {
            config.cleanup_settings.verbose = false;
        }
    }
}
