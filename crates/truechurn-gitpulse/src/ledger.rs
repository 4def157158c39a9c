//! Sparse per-line bookkeeping for a single analysis run.
//!
//! Each `(file, position)` that an edit touches gets a [`LedgerEntry`]. A
//! position's live counter goes up when a line is added there and down when a
//! removal at that position is classified as churn. A removal at a position
//! with no live lines is a plain removal of code that predates the window.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use truechurn_core::{ChurnError, Result};

/// Composite ledger key: a file path and a 1-based line position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LineKey {
    /// Repository-relative file path.
    pub file: String,
    /// 1-based line position.
    pub position: u32,
}

impl LineKey {
    /// Build a key.
    pub fn new(file: impl Into<String>, position: u32) -> Self {
        Self {
            file: file.into(),
            position,
        }
    }
}

/// History of one `(file, position)` within the run.
///
/// Invariant: `churned <= added` and `live == added - churned`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Lines added here in-window and not yet rewritten.
    pub live: u32,
    /// Lines added here in-window.
    pub added: u32,
    /// Removals here classified as churn.
    pub churned: u32,
    /// Removals here of lines that predate the window.
    pub plain_removed: u32,
}

impl LedgerEntry {
    fn spend(&mut self, key: &LineKey) -> Result<()> {
        let live = self.live.checked_sub(1).ok_or_else(|| {
            ChurnError::Ledger(format!(
                "{}:{} has no live lines to rewrite",
                key.file, key.position
            ))
        })?;
        if self.churned >= self.added {
            return Err(ChurnError::Ledger(format!(
                "{}:{} would be rewritten more often than written ({} added, {} churned)",
                key.file, key.position, self.added, self.churned
            )));
        }
        self.live = live;
        self.churned += 1;
        Ok(())
    }
}

/// Outcome of recording a removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The position held a line added earlier in the window.
    Churn,
    /// The position held no in-window line.
    PlainRemoval,
}

/// Sparse `(file, position)` map shared by every author in a run.
///
/// # Examples
///
/// ```
/// use truechurn_gitpulse::ledger::{Ledger, Verdict};
///
/// let mut ledger = Ledger::new();
/// ledger.record_add("a.py", 10);
/// assert_eq!(ledger.record_remove("a.py", 10).unwrap(), Verdict::Churn);
/// assert_eq!(ledger.record_remove("a.py", 10).unwrap(), Verdict::PlainRemoval);
/// assert_eq!(ledger.record_remove("a.py", 5).unwrap(), Verdict::PlainRemoval);
/// ```
#[derive(Debug, Default)]
pub struct Ledger {
    entries: HashMap<LineKey, LedgerEntry>,
}

impl Ledger {
    /// An empty ledger for a fresh run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a line newly introduced at `position` of `file`.
    pub fn record_add(&mut self, file: &str, position: u32) {
        let entry = self.entries.entry(LineKey::new(file, position)).or_default();
        entry.live += 1;
        entry.added += 1;
    }

    /// Record a line removed at `position` of `file` and classify it.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Ledger`] if spending the position would break the
    /// entry's counting invariant. That indicates a bookkeeping defect and is
    /// never clamped.
    pub fn record_remove(&mut self, file: &str, position: u32) -> Result<Verdict> {
        let key = LineKey::new(file, position);
        let entry = self.entries.entry(key.clone()).or_default();
        if entry.live > 0 {
            entry.spend(&key)?;
            Ok(Verdict::Churn)
        } else {
            entry.plain_removed += 1;
            Ok(Verdict::PlainRemoval)
        }
    }

    /// The entry for a position, if it has been touched.
    pub fn entry(&self, file: &str, position: u32) -> Option<&LedgerEntry> {
        self.entries.get(&LineKey::new(file, position))
    }

    /// Number of touched positions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct files with at least one touched position.
    pub fn files(&self) -> HashSet<&str> {
        self.entries.keys().map(|k| k.file.as_str()).collect()
    }
}
