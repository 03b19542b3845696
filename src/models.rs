//! Data models for journal entries, photos and run bookkeeping.
//!
//! This module defines the core data structures used throughout the application:
//! - [`JournalItem`]: One text unit of the day's journal with its ledger key
//! - [`Journal`]: Everything extracted from one journal page
//! - [`PhotoItem`]: Photo bytes fetched from the gallery
//! - [`RunResult`]: What one invocation dispatched, for logging
//!
//! Items are created fresh on every run and dropped once the dispatch
//! decisions are made. Only the ledger outlives a run.

use sha2::{Digest, Sha256};
use std::fmt;

/// Separator between the parts of a ledger key.
pub const KEY_SEPARATOR: char = ':';

/// The kind of journal section an item came from.
///
/// The [`Display`](fmt::Display) form is the token used inside ledger keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Group-wide notes written for every child.
    General,
    /// Notes about this child only.
    Personal,
    /// A row of the activity table.
    Activity,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Personal => "personal",
            Category::Activity => "activity",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discrete text unit of a journal page.
///
/// Two items with the same [`key`](JournalItem::key) occupy the same logical
/// slot: a different `text` under an existing key is an update, not a new item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalItem {
    /// The journal date as published by the portal.
    pub date: String,
    /// Which section the item belongs to.
    pub category: Category,
    /// Sentence index for notes, time label for activities.
    pub slot: String,
    /// The text that gets delivered.
    pub text: String,
}

impl JournalItem {
    /// Ledger key: `{date}:{category}:{slot}`.
    pub fn key(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.date,
            self.category,
            self.slot,
            sep = KEY_SEPARATOR
        )
    }
}

/// A single row of the activity table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    /// Time label from the first column, e.g. `"10:30"`.
    pub time: String,
    /// Activity label from the third column.
    pub label: String,
}

/// Everything extracted from one published journal page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Journal {
    pub date: String,
    pub general: Vec<String>,
    pub personal: Vec<String>,
    pub activities: Vec<Activity>,
    /// Raw `src` attributes of the gallery images, in document order.
    pub photos: Vec<String>,
}

impl Journal {
    /// All text items in dispatch order: general notes, personal notes,
    /// then activity rows.
    ///
    /// Notes are keyed by their position within the category. Activities are
    /// keyed by time label; a repeated time label gets an occurrence suffix
    /// (`10:00#2`) so two rows never share a slot.
    pub fn items(&self) -> Vec<JournalItem> {
        let notes = |category: Category, lines: &[String]| {
            lines
                .iter()
                .enumerate()
                .map(|(i, line)| JournalItem {
                    date: self.date.clone(),
                    category,
                    slot: i.to_string(),
                    text: line.clone(),
                })
                .collect::<Vec<_>>()
        };

        let mut items = notes(Category::General, &self.general);
        items.extend(notes(Category::Personal, &self.personal));

        let mut seen: Vec<(&str, usize)> = Vec::new();
        for activity in &self.activities {
            let occurrence = match seen.iter_mut().find(|(t, _)| *t == activity.time) {
                Some((_, n)) => {
                    *n += 1;
                    *n
                }
                None => {
                    seen.push((activity.time.as_str(), 1));
                    1
                }
            };
            let slot = if occurrence == 1 {
                activity.time.clone()
            } else {
                format!("{}#{}", activity.time, occurrence)
            };
            items.push(JournalItem {
                date: self.date.clone(),
                category: Category::Activity,
                slot,
                text: format!("{}: {}", activity.time, activity.label),
            });
        }
        items
    }
}

/// Photo bytes fetched from the gallery of a journal page.
#[derive(Debug, Clone)]
pub struct PhotoItem {
    pub date: String,
    pub content: Vec<u8>,
}

impl PhotoItem {
    /// Ledger key of the photo: hex SHA-256 of its bytes.
    ///
    /// Gallery URLs rotate on every page load, so the content is the only
    /// stable identity.
    pub fn key(&self) -> String {
        content_hash(&self.content)
    }
}

/// Deterministic hex digest of `content`.
pub fn content_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Transient summary of one invocation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Ledger keys of the items sent, in dispatch order.
    pub dispatched: Vec<String>,
    /// Items whose key was already delivered with the same content.
    pub skipped: usize,
}

impl RunResult {
    pub fn record(&mut self, key: String, sent: bool) {
        if sent {
            self.dispatched.push(key);
        } else {
            self.skipped += 1;
        }
    }
}
