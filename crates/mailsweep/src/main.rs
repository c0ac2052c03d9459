//! `mailsweep` - moves old bulk mail out of IMAP folders for review.
//!
//! Messages older than the configured age that carry a `List-Unsubscribe`
//! header, have a trigger word in the subject, or come from a listed
//! domain are moved to a review folder. Whitelisted senders and subjects
//! with protect words stay put. Runs are dry by default.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;
mod reporter;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mailsweep_core::{Config, ImapConnector, Orchestrator, Rules, SessionPool};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Args;
use reporter::ConsoleReporter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_filter());

    let mut config = Config::load(&args.config, &args.local_config)
        .context("failed to load configuration")?;
    args.apply(&mut config);
    let verbose = config.cleanup_settings.verbose;

    config
        .validate()
        .map_err(mailsweep_core::Error::Invalid)
        .context("configuration is invalid")?;

    let connector = ImapConnector::new(&config, &args.user, &args.password);

    if args.check {
        return check_connection(connector, &config).await;
    }

    let whitelist = config
        .load_whitelist()
        .context("failed to read whitelist")?;
    info!(entries = whitelist.len(), "whitelist loaded");
    let rules = Rules::from_config(&config, whitelist);

    let orchestrator = Orchestrator::new(connector, &config, rules)
        .with_reporter(Arc::new(ConsoleReporter::new(verbose)));

    let token = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping after the current folder");
            token.cancel();
        }
    });

    let totals = orchestrator.run().await.context("cleanup failed")?;

    println!();
    println!("Candidates considered: {}", totals.candidates);
    if config.cleanup_settings.dry_run {
        println!(
            "DRY RUN: nothing was moved. {} messages would have moved; pass --execute to move them.",
            totals.moved
        );
    } else {
        println!("Actually moved: {}", totals.moved);
    }

    Ok(())
}

fn init_logging(default: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn check_connection(connector: ImapConnector, config: &Config) -> anyhow::Result<()> {
    let host = config.mail_settings.imap_host.clone();
    let pool = SessionPool::new(connector, 1);
    let result = pool.check_connection().await;
    pool.close_all().await;

    result.with_context(|| format!("could not log in to {host}"))?;
    println!("Connection to {host} OK");
    Ok(())
}
