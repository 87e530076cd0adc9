//! Transaction-scoped ledger access.
//!
//! A [`TxContext`] is created per operation and never outlives it. Writes are
//! buffered and become visible to later reads in the same context; nothing
//! reaches the ledger until [`TxContext::commit`]. Dropping the context (or
//! calling [`TxContext::abort`]) discards every buffered write.

use crate::model::{CommitReceipt, LedgerEntry, LedgerKey, Version, WriteSet};
use crate::traits::{KeyValueLedger, RangeCursor};
use crate::{LedgerError, LedgerResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// Envelope data supplied by the ledger for one transaction.
///
/// The timestamp is the proposal time agreed by all replicas, so it is the
/// only clock entity code may read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHeader {
    pub tx_id: String,
    pub timestamp: DateTime<Utc>,
}

impl TxHeader {
    pub fn new(tx_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            tx_id: tx_id.into(),
            timestamp,
        }
    }
}

/// Read-your-writes view over one ledger snapshot.
pub struct TxContext {
    ledger: Arc<dyn KeyValueLedger>,
    header: TxHeader,
    reads: BTreeMap<LedgerKey, Option<Version>>,
    writes: BTreeMap<LedgerKey, Vec<u8>>,
}

impl TxContext {
    pub fn new(ledger: Arc<dyn KeyValueLedger>, header: TxHeader) -> Self {
        Self {
            ledger,
            header,
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
        }
    }

    pub fn header(&self) -> &TxHeader {
        &self.header
    }

    pub fn tx_id(&self) -> &str {
        &self.header.tx_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.header.timestamp
    }

    /// Read a key, preferring this transaction's own pending write.
    pub async fn get(&mut self, key: &LedgerKey) -> LedgerResult<Option<Vec<u8>>> {
        if let Some(pending) = self.writes.get(key) {
            return Ok(Some(pending.clone()));
        }
        let found = self.ledger.get(key).await?;
        self.reads
            .entry(key.clone())
            .or_insert_with(|| found.as_ref().map(|v| v.version));
        Ok(found.map(|v| v.value))
    }

    /// Buffer a write. Later writes to the same key replace earlier ones.
    pub fn put(&mut self, key: LedgerKey, value: Vec<u8>) {
        self.writes.insert(key, value);
    }

    /// Fresh ascending scan over `[start, end)` merging committed state with
    /// this transaction's pending writes.
    pub async fn range_scan(
        &mut self,
        start: &LedgerKey,
        end: &LedgerKey,
    ) -> LedgerResult<TxRangeScan> {
        if start > end {
            return Err(LedgerError::InvalidRange(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        let committed = self.ledger.range_scan(start, end).await?;
        let overlay = self
            .writes
            .range(start.clone()..end.clone())
            .map(|(key, value)| LedgerEntry {
                key: key.clone(),
                value: value.clone(),
            })
            .collect();
        Ok(TxRangeScan {
            committed,
            committed_done: false,
            peeked: None,
            overlay,
            closed: false,
        })
    }

    pub fn has_writes(&self) -> bool {
        !self.writes.is_empty()
    }

    pub fn into_write_set(self) -> WriteSet {
        WriteSet {
            tx_id: self.header.tx_id,
            reads: self.reads,
            writes: self.writes,
        }
    }

    /// Hand the buffered read and write sets to the ledger as one unit.
    pub async fn commit(self) -> LedgerResult<CommitReceipt> {
        let ledger = Arc::clone(&self.ledger);
        ledger.commit(self.into_write_set()).await
    }

    /// Discard every buffered write.
    pub fn abort(self) {
        debug!(
            tx_id = %self.header.tx_id,
            discarded = self.writes.len(),
            "transaction aborted"
        );
    }
}

/// Merged cursor produced by [`TxContext::range_scan`].
pub struct TxRangeScan {
    committed: Box<dyn RangeCursor>,
    committed_done: bool,
    peeked: Option<LedgerEntry>,
    overlay: VecDeque<LedgerEntry>,
    closed: bool,
}

impl TxRangeScan {
    pub async fn next(&mut self) -> LedgerResult<Option<LedgerEntry>> {
        if self.closed {
            return Err(LedgerError::CursorClosed);
        }
        if self.peeked.is_none() && !self.committed_done {
            self.peeked = self.committed.next().await?;
            self.committed_done = self.peeked.is_none();
        }

        let order = match (&self.peeked, self.overlay.front()) {
            (None, None) => return Ok(None),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(committed), Some(pending)) => committed.key.cmp(&pending.key),
        };

        match order {
            Ordering::Less => Ok(self.peeked.take()),
            Ordering::Equal => {
                self.peeked = None;
                Ok(self.overlay.pop_front())
            }
            Ordering::Greater => Ok(self.overlay.pop_front()),
        }
    }

    /// Release the underlying ledger cursor.
    pub async fn close(&mut self) -> LedgerResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.peeked = None;
        self.overlay.clear();
        self.committed.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryLedger;

    fn header(tx_id: &str) -> TxHeader {
        TxHeader::new(tx_id, Utc::now())
    }

    async fn seeded() -> Arc<InMemoryLedger> {
        let ledger = Arc::new(InMemoryLedger::new());
        let mut tx = TxContext::new(ledger.clone(), header("seed"));
        tx.put(LedgerKey::from("k/a"), b"1".to_vec());
        tx.put(LedgerKey::from("k/c"), b"3".to_vec());
        tx.commit().await.unwrap();
        ledger
    }

    #[tokio::test]
    async fn reads_see_own_writes() {
        let ledger = seeded().await;
        let mut tx = TxContext::new(ledger.clone(), header("tx"));
        tx.put(LedgerKey::from("k/a"), b"updated".to_vec());
        assert_eq!(tx.get(&LedgerKey::from("k/a")).await.unwrap().unwrap(), b"updated");

        let committed = ledger.get(&LedgerKey::from("k/a")).await.unwrap().unwrap();
        assert_eq!(committed.value, b"1");
    }

    #[tokio::test]
    async fn dropping_context_discards_writes() {
        let ledger = seeded().await;
        let root = ledger.state_root().unwrap();
        {
            let mut tx = TxContext::new(ledger.clone(), header("tx"));
            tx.put(LedgerKey::from("k/z"), b"x".to_vec());
            tx.abort();
        }
        assert_eq!(ledger.state_root().unwrap(), root);
    }

    #[tokio::test]
    async fn range_scan_merges_pending_writes() {
        let ledger = seeded().await;
        let mut tx = TxContext::new(ledger, header("tx"));
        tx.put(LedgerKey::from("k/b"), b"2".to_vec());
        tx.put(LedgerKey::from("k/c"), b"33".to_vec());
        tx.put(LedgerKey::from("other"), b"-".to_vec());

        let mut scan = tx
            .range_scan(&LedgerKey::from("k/"), &LedgerKey::from("k0"))
            .await
            .unwrap();
        let mut seen = vec![];
        while let Some(entry) = scan.next().await.unwrap() {
            seen.push((entry.key.to_string(), String::from_utf8(entry.value).unwrap()));
        }
        scan.close().await.unwrap();

        assert_eq!(
            seen,
            vec![
                ("k/a".to_string(), "1".to_string()),
                ("k/b".to_string(), "2".to_string()),
                ("k/c".to_string(), "33".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn concurrent_contexts_conflict_on_shared_read() {
        let ledger = seeded().await;

        let mut first = TxContext::new(ledger.clone(), header("first"));
        let mut second = TxContext::new(ledger.clone(), header("second"));
        first.get(&LedgerKey::from("k/a")).await.unwrap();
        second.get(&LedgerKey::from("k/a")).await.unwrap();
        first.put(LedgerKey::from("k/a"), b"first".to_vec());
        second.put(LedgerKey::from("k/a"), b"second".to_vec());

        first.commit().await.unwrap();
        assert!(matches!(second.commit().await, Err(LedgerError::Conflict(_))));

        let value = ledger.get(&LedgerKey::from("k/a")).await.unwrap().unwrap();
        assert_eq!(value.value, b"first");
    }
}
