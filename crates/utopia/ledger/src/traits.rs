use crate::model::{CommitReceipt, LedgerEntry, LedgerKey, VersionedValue, WriteSet};
use crate::LedgerResult;
use async_trait::async_trait;

/// Ordered key-value store of record.
///
/// The store owns atomicity and ordering: a write set is either applied in
/// full or not at all, and conflicting concurrent write sets are rejected.
#[async_trait]
pub trait KeyValueLedger: Send + Sync {
    /// Point lookup of committed state.
    async fn get(&self, key: &LedgerKey) -> LedgerResult<Option<VersionedValue>>;

    /// Fresh cursor over committed entries in `[start, end)`, ascending.
    async fn range_scan(
        &self,
        start: &LedgerKey,
        end: &LedgerKey,
    ) -> LedgerResult<Box<dyn RangeCursor>>;

    /// Validate the read set and apply the writes atomically.
    async fn commit(&self, write_set: WriteSet) -> LedgerResult<CommitReceipt>;
}

/// Finite ascending cursor returned by [`KeyValueLedger::range_scan`].
///
/// Callers must `close` the cursor once done; a closed cursor yields
/// [`crate::LedgerError::CursorClosed`].
#[async_trait]
pub trait RangeCursor: Send {
    async fn next(&mut self) -> LedgerResult<Option<LedgerEntry>>;

    async fn close(&mut self) -> LedgerResult<()>;
}
