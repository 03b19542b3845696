//! Deduplicating dispatcher.
//!
//! Decides for every extracted item whether it still has to be delivered,
//! delivers it through the [`Gateway`] and records the fact in the [`Ledger`].
//!
//! # Dedup Policy
//!
//! | Item | Ledger key | Sent when |
//! |------|------------|-----------|
//! | Text | `{date}:{category}:{slot}` | key absent, or stored text differs |
//! | Photo | content hash | key absent |
//!
//! Photos have no update semantics: once a hash is in the ledger the photo is
//! never sent again, whatever date it shows up under.

use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::DeliveryOrder;
use crate::gateway::{Gateway, GatewayError};
use crate::ledger::{Ledger, LedgerError};
use crate::models::content_hash;
use crate::outputs::photos::{PhotoStore, StoreError};
use crate::utils::truncate_for_log;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),
    #[error("gateway: {0}")]
    Gateway(#[from] GatewayError),
    #[error("photo store: {0}")]
    Store(#[from] StoreError),
}

/// Sends new and changed items to a fixed recipient list.
pub struct Dispatcher<L, G, S> {
    ledger: L,
    gateway: G,
    store: S,
    recipients: Vec<String>,
    order: DeliveryOrder,
    photo_caption: String,
}

impl<L, G, S> Dispatcher<L, G, S>
where
    L: Ledger,
    G: Gateway,
    S: PhotoStore,
{
    pub fn new(
        ledger: L,
        gateway: G,
        store: S,
        recipients: Vec<String>,
        order: DeliveryOrder,
        photo_caption: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            gateway,
            store,
            recipients,
            order,
            photo_caption: photo_caption.into(),
        }
    }

    #[cfg(test)]
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    #[cfg(test)]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Deliver `text` under `key` unless the ledger already holds exactly
    /// this text for it.
    ///
    /// Returns whether a message was sent.
    #[instrument(level = "info", skip(self, text))]
    pub async fn dispatch_text(&self, key: &str, text: &str) -> Result<bool, DispatchError> {
        let stored = self.ledger.get(key).await?;
        if stored.as_deref() == Some(text) {
            debug!("Already delivered");
            return Ok(false);
        }

        info!(
            update = stored.is_some(),
            text = %truncate_for_log(text, 80),
            "Sending message"
        );
        self.deliver(key, text, text, &[]).await?;
        Ok(true)
    }

    /// Archive `content` and deliver it unless its hash is already recorded.
    ///
    /// The archive write happens first and unconditionally. If it fails the
    /// ledger is left alone, so a later run will try the photo again.
    ///
    /// Returns whether a message was sent.
    #[instrument(level = "info", skip(self, content), fields(bytes = content.len()))]
    pub async fn dispatch_photo(&self, date: &str, content: &[u8]) -> Result<bool, DispatchError> {
        let hash = content_hash(content);
        let path = self.store.write(date, &hash, content).await?;

        if self.ledger.exists(&hash).await? {
            debug!(%hash, "Photo already delivered");
            return Ok(false);
        }

        info!(%hash, path = %path.display(), "Sending photo");
        self.deliver(&hash, date, &self.photo_caption, &[path]).await?;
        Ok(true)
    }

    async fn deliver(
        &self,
        key: &str,
        value: &str,
        text: &str,
        attachments: &[PathBuf],
    ) -> Result<(), DispatchError> {
        match self.order {
            DeliveryOrder::SendThenRecord => {
                self.gateway.send(text, attachments, &self.recipients).await?;
                self.ledger.set(key, value).await?;
            }
            DeliveryOrder::RecordThenSend => {
                self.ledger.set(key, value).await?;
                self.gateway.send(text, attachments, &self.recipients).await?;
            }
        }
        Ok(())
    }
}
