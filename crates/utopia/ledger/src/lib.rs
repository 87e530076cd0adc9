//! Utopia Ledger - the ordered key-value store the workspace runs on.
//!
//! This crate defines the contract the domain logic consumes:
//! - point reads, buffered writes and half-open range scans
//! - atomic, MVCC-validated commit of a transaction's read/write sets
//! - canonical value encoding so replicas agree on bytes
//!
//! The consensus layer that orders transactions lives outside this crate;
//! [`memory::InMemoryLedger`] is the reference backend used by tests and the CLI.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod codec;
mod error;
pub mod memory;
mod model;
mod traits;
mod tx;

pub use error::{LedgerError, LedgerResult};
pub use memory::{InMemoryLedger, LedgerSnapshot, SnapshotEntry};
pub use model::{CommitReceipt, LedgerEntry, LedgerKey, Version, VersionedValue, WriteSet};
pub use traits::{KeyValueLedger, RangeCursor};
pub use tx::{TxContext, TxHeader, TxRangeScan};
