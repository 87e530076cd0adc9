//! Shared fixtures for registry unit tests.

use crate::SequenceAllocator;
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use utopia_ledger::{InMemoryLedger, TxContext, TxHeader};

pub(crate) fn tx(ledger: &Arc<InMemoryLedger>) -> TxContext {
    let timestamp = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    TxContext::new(ledger.clone(), TxHeader::new("test", timestamp))
}

pub(crate) async fn bootstrapped() -> Arc<InMemoryLedger> {
    let ledger = Arc::new(InMemoryLedger::new());
    let mut ctx = tx(&ledger);
    SequenceAllocator::bootstrap(&mut ctx).await.unwrap();
    ctx.commit().await.unwrap();
    ledger
}
