//! In-memory collaborators for tests.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::gateway::{Gateway, GatewayError};
use crate::ledger::{Ledger, LedgerError};
use crate::outputs::photos::{PhotoStore, StoreError};
use crate::scrapers::session::{SessionError, SessionProvider};

#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Mutex<HashMap<String, String>>,
    failing: AtomicBool,
}

impl MemoryLedger {
    pub fn insert(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), LedgerError> {
        if self.failing.load(Ordering::SeqCst) {
            let err = redis::RedisError::from((redis::ErrorKind::IoError, "injected failure"));
            return Err(err.into());
        }
        Ok(())
    }
}

impl Ledger for MemoryLedger {
    async fn exists(&self, key: &str) -> Result<bool, LedgerError> {
        self.check()?;
        Ok(self.entries.lock().unwrap().contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, LedgerError> {
        self.check()?;
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), LedgerError> {
        self.check()?;
        self.insert(key, value);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub text: String,
    pub attachments: Vec<PathBuf>,
    pub recipients: Vec<String>,
}

#[derive(Debug, Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<SentMessage>>,
    failing: AtomicBool,
}

impl RecordingGateway {
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.text).collect()
    }

    pub fn fail_sends(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Gateway for RecordingGateway {
    async fn send(
        &self,
        text: &str,
        attachments: &[PathBuf],
        recipients: &[String],
    ) -> Result<(), GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Rpc {
                code: -1,
                message: "injected failure".to_string(),
            });
        }
        self.sent.lock().unwrap().push(SentMessage {
            text: text.to_string(),
            attachments: attachments.to_vec(),
            recipients: recipients.to_vec(),
        });
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryPhotoStore {
    writes: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
}

impl MemoryPhotoStore {
    /// `(date, hash)` of every write, in order.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl PhotoStore for MemoryPhotoStore {
    async fn write(&self, date: &str, hash: &str, _content: &[u8]) -> Result<PathBuf, StoreError> {
        let path = PathBuf::from(format!("/photos/{date}-{hash}.jpg"));
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                path: path.display().to_string(),
                source: io::Error::other("injected failure"),
            });
        }
        self.writes
            .lock()
            .unwrap()
            .push((date.to_string(), hash.to_string()));
        Ok(path)
    }
}

/// Serves canned bodies by path and records every request.
#[derive(Debug, Default)]
pub struct FakeSession {
    pages: BTreeMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
    forms: Mutex<Vec<Vec<(String, String)>>>,
}

impl FakeSession {
    pub fn with_page(mut self, path: &str, body: impl Into<Vec<u8>>) -> Self {
        self.pages.insert(path.to_string(), body.into());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn forms(&self) -> Vec<Vec<(String, String)>> {
        self.forms.lock().unwrap().clone()
    }

    fn serve(&self, path: &str) -> Result<Vec<u8>, SessionError> {
        self.requests.lock().unwrap().push(path.to_string());
        self.pages
            .get(path)
            .cloned()
            .ok_or_else(|| SessionError::Status {
                url: path.to_string(),
                status: 404,
            })
    }
}

impl SessionProvider for FakeSession {
    async fn authenticate(
        &self,
        _credentials: &BTreeMap<String, String>,
    ) -> Result<(), SessionError> {
        self.requests.lock().unwrap().push("<login>".to_string());
        Ok(())
    }

    async fn fetch(&self, path: &str) -> Result<String, SessionError> {
        Ok(String::from_utf8(self.serve(path)?).expect("canned pages are UTF-8"))
    }

    async fn fetch_form(&self, path: &str, form: &[(&str, &str)]) -> Result<String, SessionError> {
        self.forms.lock().unwrap().push(
            form.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self.fetch(path).await
    }

    async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>, SessionError> {
        self.serve(path)
    }
}
