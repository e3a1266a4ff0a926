//! In-memory record of what has already been forwarded to the target.

use std::collections::HashMap;

/// Last successfully forwarded timestamp per validator pubkey.
///
/// Owned exclusively by the sync engine and mutated only after a confirmed
/// acceptance. Created empty at process start and never persisted: a restart
/// re-forwards the full source set, which is safe because submission is
/// idempotent at the target.
#[derive(Debug, Default)]
pub struct SyncState {
    forwarded: HashMap<String, u64>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `timestamp` is strictly newer than what was last forwarded
    /// for `pubkey`, or nothing was forwarded for it yet. Ties are not newer.
    pub fn needs_forward(&self, pubkey: &str, timestamp: u64) -> bool {
        match self.forwarded.get(pubkey) {
            Some(last) => timestamp > *last,
            None => true,
        }
    }

    /// Record a confirmed acceptance. Never moves a key backwards.
    pub fn record_forwarded(&mut self, pubkey: &str, timestamp: u64) {
        let last = self.forwarded.entry(pubkey.to_string()).or_insert(timestamp);
        if timestamp > *last {
            *last = timestamp;
        }
    }

    #[cfg(test)]
    pub(crate) fn last_forwarded(&self, pubkey: &str) -> Option<u64> {
        self.forwarded.get(pubkey).copied()
    }

    /// Number of pubkeys ever forwarded.
    pub fn len(&self) -> usize {
        self.forwarded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forwarded.is_empty()
    }
}
