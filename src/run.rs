//! One invocation: log in, fetch the journal, dispatch what is new.
//!
//! # Stages
//!
//! ```text
//! Start → Authenticated → PageFetched → JournalLocated ─┬→ NoJournalToday
//!                                                       └→ ItemsExtracted → Dispatched
//! ```
//!
//! `NoJournalToday` and `Dispatched` both end the run successfully. Any error
//! on the way ends it with that error; nothing is retried within a run.

use chrono::NaiveDate;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::PortalConfig;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::gateway::Gateway;
use crate::ledger::Ledger;
use crate::models::{PhotoItem, RunResult};
use crate::outputs::photos::PhotoStore;
use crate::scrapers::journal::{ExtractError, Extraction, extract_journal, extract_journal_key};
use crate::scrapers::session::{JOURNAL_CHOICE_PATH, SERVICE_PATH, SessionError, SessionProvider};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("portal session: {0}")]
    Session(#[from] SessionError),
    #[error("journal page: {0}")]
    Extract(#[from] ExtractError),
    #[error("dispatch: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("photo URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    Authenticated,
    PageFetched,
    JournalLocated,
    NoJournalToday,
    ItemsExtracted,
    Dispatched,
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The portal has nothing for the requested day yet.
    NoJournalToday { date: String },
    Dispatched(RunResult),
}

/// Run the fetch-extract-dispatch cycle once.
///
/// `date` selects a specific journal day; `None` asks the portal for today.
#[instrument(level = "info", skip_all, fields(date = ?date))]
pub async fn run<P, L, G, S>(
    portal: &PortalConfig,
    session: &P,
    dispatcher: &Dispatcher<L, G, S>,
    date: Option<NaiveDate>,
) -> Result<RunOutcome, RunError>
where
    P: SessionProvider,
    L: Ledger,
    G: Gateway,
    S: PhotoStore,
{
    let t0 = Instant::now();
    let mut stage = Stage::Start;
    debug!(?stage);

    session.authenticate(&portal.login).await?;
    advance(&mut stage, Stage::Authenticated);

    let choice = session.fetch(JOURNAL_CHOICE_PATH).await?;
    let pk = extract_journal_key(&choice)?;
    debug!(%pk, "Found journal key");

    let day = date.map(|d| d.format("%Y-%m-%d").to_string());
    let mut form = vec![("methode", "get-schriftje"), ("pk", pk.as_str())];
    if let Some(day) = day.as_deref() {
        form.push(("datum", day));
    }
    let page = session.fetch_form(SERVICE_PATH, &form).await?;
    advance(&mut stage, Stage::PageFetched);

    let extraction = extract_journal(&page)?;
    advance(&mut stage, Stage::JournalLocated);

    let journal = match extraction {
        Extraction::NoJournalToday { date } => {
            advance(&mut stage, Stage::NoJournalToday);
            info!(%date, "No journal yet; nothing to send");
            return Ok(RunOutcome::NoJournalToday { date });
        }
        Extraction::Journal(journal) => journal,
    };
    advance(&mut stage, Stage::ItemsExtracted);

    let mut result = RunResult::default();
    for item in journal.items() {
        let key = item.key();
        let sent = dispatcher.dispatch_text(&key, &item.text).await?;
        result.record(key, sent);
    }

    let base = Url::parse(&portal.base_url)?;
    for src in &journal.photos {
        let url = base.join(src)?;
        let photo = PhotoItem {
            date: journal.date.clone(),
            content: session.fetch_bytes(url.as_str()).await?,
        };
        let sent = dispatcher.dispatch_photo(&photo.date, &photo.content).await?;
        result.record(photo.key(), sent);
    }
    advance(&mut stage, Stage::Dispatched);

    info!(
        date = %journal.date,
        dispatched = result.dispatched.len(),
        skipped = result.skipped,
        elapsed = ?t0.elapsed(),
        "Run complete"
    );
    Ok(RunOutcome::Dispatched(result))
}

fn advance(stage: &mut Stage, next: Stage) {
    debug!(from = ?*stage, to = ?next, "Stage");
    *stage = next;
}
