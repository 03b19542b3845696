//! # Schriftje
//!
//! Forwards the daycare's daily journal ("schriftje") from the parent portal
//! to a list of Signal recipients.
//!
//! ## Features
//!
//! - Logs in to the parent portal and fetches today's (or a given day's) journal
//! - Splits the journal into general notes, personal notes and activity rows
//! - Sends each new or edited item as its own Signal message
//! - Sends each new photo once, and keeps every photo in a local archive
//! - Remembers what was delivered in Redis, so runs can be repeated freely
//!
//! ## Usage
//!
//! ```sh
//! */15 7-19 * * 1-5  schriftje -c /etc/schriftje.yaml
//! ```
//!
//! ## Architecture
//!
//! Every invocation is one sequential pass:
//! 1. **Login**: Authenticate against the portal with a cookie session
//! 2. **Fetch**: Load the journal page for the day
//! 3. **Extract**: Parse sections, activity rows and gallery references
//! 4. **Dispatch**: Compare against the ledger and send what is new or changed
//!
//! Overlapping runs are not safe; the scheduler must not start a run while
//! the previous one is still going.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod dispatch;
mod gateway;
mod ledger;
mod models;
mod outputs;
mod run;
mod scrapers;
#[cfg(test)]
mod testing;
mod utils;

use cli::Cli;
use config::Config;
use dispatch::Dispatcher;
use gateway::SignalGateway;
use ledger::RedisLedger;
use outputs::photos::FsPhotoStore;
use run::RunOutcome;
use scrapers::session::PortalSession;
use utils::ensure_writable_dir;

#[tokio::main(flavor = "current_thread")]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("schriftje starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.date, "Parsed CLI arguments");

    let config = Config::load(&args.config).await.inspect_err(|e| {
        error!(path = %args.config.display(), error = %e, "Cannot load configuration");
    })?;

    if let Err(e) = ensure_writable_dir(&config.photos.dir).await {
        error!(
            path = %config.photos.dir.display(),
            error = %e,
            "Photo directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    // Collaborators live for exactly this run and are dropped on every exit path.
    let session = PortalSession::new(&config.portal)?;
    let ledger = RedisLedger::connect(&config.ledger.redis_url)
        .await
        .inspect_err(|e| error!(error = %e, "Cannot reach the ledger"))?;
    let gateway = SignalGateway::new(&config.gateway.rpc_url, config.gateway.account.clone());
    let store = FsPhotoStore::new(&config.photos.dir)?;
    debug!(dir = %store.dir().display(), "Photo archive ready");
    let dispatcher = Dispatcher::new(
        ledger,
        gateway,
        store,
        config.recipients.clone(),
        config.delivery_order,
        &config.photos.caption,
    );

    let outcome = run::run(&config.portal, &session, &dispatcher, args.date)
        .await
        .inspect_err(|e| error!(error = %e, "Run failed"))?;

    let elapsed = start_time.elapsed();
    match outcome {
        RunOutcome::NoJournalToday { date } => {
            info!(%date, ?elapsed, "No journal yet, try again later");
        }
        RunOutcome::Dispatched(result) => {
            info!(
                dispatched = result.dispatched.len(),
                skipped = result.skipped,
                ?elapsed,
                "Execution complete"
            );
            debug!(keys = ?result.dispatched, "Dispatched keys");
        }
    }

    Ok(())
}
