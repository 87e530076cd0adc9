//! In-memory reference implementation of [`KeyValueLedger`].
//!
//! Deterministic and test-friendly: MVCC read-set validation on commit, a
//! monotonically increasing block height, and a state root that lets two
//! replicas compare world state byte for byte.

use crate::model::{CommitReceipt, LedgerEntry, LedgerKey, VersionedValue, WriteSet};
use crate::traits::{KeyValueLedger, RangeCursor};
use crate::{LedgerError, LedgerResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct LedgerState {
    entries: BTreeMap<LedgerKey, VersionedValue>,
    height: u64,
}

/// In-memory ordered ledger.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from an exported snapshot.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> LedgerResult<Self> {
        let mut entries = BTreeMap::new();
        for entry in snapshot.entries {
            if entry.version > snapshot.height {
                return Err(LedgerError::Serialization(format!(
                    "entry {} has version {} above snapshot height {}",
                    entry.key, entry.version, snapshot.height
                )));
            }
            entries.insert(
                LedgerKey::from(entry.key),
                VersionedValue {
                    value: entry.value.into_bytes(),
                    version: entry.version,
                },
            );
        }
        Ok(Self {
            state: RwLock::new(LedgerState {
                entries,
                height: snapshot.height,
            }),
        })
    }

    /// Export committed state. Keys and values must be UTF-8.
    pub fn snapshot(&self) -> LedgerResult<LedgerSnapshot> {
        let guard = self.read_state()?;
        let entries = guard
            .entries
            .iter()
            .map(|(key, versioned)| {
                Ok(SnapshotEntry {
                    key: utf8(key.as_bytes(), "key")?,
                    value: utf8(&versioned.value, "value")?,
                    version: versioned.version,
                })
            })
            .collect::<LedgerResult<Vec<_>>>()?;
        Ok(LedgerSnapshot {
            height: guard.height,
            entries,
        })
    }

    /// Current block height (number of applied write sets).
    pub fn height(&self) -> LedgerResult<u64> {
        Ok(self.read_state()?.height)
    }

    /// BLAKE3 digest over every committed `(key, value)` pair in key order.
    ///
    /// Versions are excluded: two replicas that applied the same operations
    /// in different batches still agree on the root.
    pub fn state_root(&self) -> LedgerResult<String> {
        let guard = self.read_state()?;
        let mut hasher = blake3::Hasher::new();
        for (key, versioned) in &guard.entries {
            hasher.update(&(key.as_bytes().len() as u64).to_le_bytes());
            hasher.update(key.as_bytes());
            hasher.update(&(versioned.value.len() as u64).to_le_bytes());
            hasher.update(&versioned.value);
        }
        Ok(hasher.finalize().to_hex().to_string())
    }

    fn read_state(&self) -> LedgerResult<std::sync::RwLockReadGuard<'_, LedgerState>> {
        self.state
            .read()
            .map_err(|_| LedgerError::Backend("ledger lock poisoned".to_string()))
    }
}

#[async_trait]
impl KeyValueLedger for InMemoryLedger {
    async fn get(&self, key: &LedgerKey) -> LedgerResult<Option<VersionedValue>> {
        Ok(self.read_state()?.entries.get(key).cloned())
    }

    async fn range_scan(
        &self,
        start: &LedgerKey,
        end: &LedgerKey,
    ) -> LedgerResult<Box<dyn RangeCursor>> {
        if start > end {
            return Err(LedgerError::InvalidRange(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        let guard = self.read_state()?;
        let entries = guard
            .entries
            .range(start.clone()..end.clone())
            .map(|(key, versioned)| LedgerEntry {
                key: key.clone(),
                value: versioned.value.clone(),
            })
            .collect();
        Ok(Box::new(SnapshotCursor::new(entries)))
    }

    async fn commit(&self, write_set: WriteSet) -> LedgerResult<CommitReceipt> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| LedgerError::Backend("ledger lock poisoned".to_string()))?;

        for (key, seen) in &write_set.reads {
            let current = guard.entries.get(key).map(|v| v.version);
            if current != *seen {
                debug!(
                    tx_id = %write_set.tx_id,
                    key = %key,
                    seen = ?seen,
                    current = ?current,
                    "rejecting stale read set"
                );
                return Err(LedgerError::Conflict(key.to_string()));
            }
        }

        if write_set.is_read_only() {
            return Ok(CommitReceipt {
                tx_id: write_set.tx_id,
                height: guard.height,
                keys_written: 0,
            });
        }

        guard.height += 1;
        let height = guard.height;
        let keys_written = write_set.writes.len();
        for (key, value) in write_set.writes {
            guard.entries.insert(
                key,
                VersionedValue {
                    value,
                    version: height,
                },
            );
        }

        debug!(tx_id = %write_set.tx_id, height, keys_written, "write set applied");

        Ok(CommitReceipt {
            tx_id: write_set.tx_id,
            height,
            keys_written,
        })
    }
}

/// Cursor over a materialized slice of the ledger taken at scan time.
#[derive(Debug)]
pub struct SnapshotCursor {
    entries: VecDeque<LedgerEntry>,
    closed: bool,
}

impl SnapshotCursor {
    pub fn new(entries: Vec<LedgerEntry>) -> Self {
        Self {
            entries: entries.into(),
            closed: false,
        }
    }
}

#[async_trait]
impl RangeCursor for SnapshotCursor {
    async fn next(&mut self) -> LedgerResult<Option<LedgerEntry>> {
        if self.closed {
            return Err(LedgerError::CursorClosed);
        }
        Ok(self.entries.pop_front())
    }

    async fn close(&mut self) -> LedgerResult<()> {
        self.closed = true;
        self.entries.clear();
        Ok(())
    }
}

/// Portable export of committed ledger state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub height: u64,
    pub entries: Vec<SnapshotEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub key: String,
    pub value: String,
    pub version: u64,
}

fn utf8(bytes: &[u8], what: &str) -> LedgerResult<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| LedgerError::Serialization(format!("{} is not valid UTF-8", what)))
}
