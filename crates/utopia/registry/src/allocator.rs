//! Ledger-resident ID sequences.
//!
//! Counters live on the ledger next to the entities they number, and are
//! read and written inside the same transaction as the entity write. An
//! aborted operation therefore never consumes a sequence number.

use crate::keys::{counter_key, entity_key, INIT_KEY};
use crate::store;
use crate::{RegistryError, RegistryResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utopia_ledger::{codec, LedgerKey, TxContext};
use utopia_types::EntityKind;

/// How entity IDs are chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdMode {
    /// IDs come only from the sequence allocator.
    #[default]
    Allocated,
    /// Creation requests may name their own ID; unnamed requests are allocated.
    CallerSupplied,
}

#[derive(Debug, Serialize, Deserialize)]
struct Counter {
    count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct InitMarker {
    initialized: bool,
}

/// Issues monotonically increasing sequence numbers per entity kind.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequenceAllocator;

impl SequenceAllocator {
    /// Write the bootstrap marker and a zeroed counter for every kind.
    pub async fn bootstrap(tx: &mut TxContext) -> RegistryResult<()> {
        if Self::is_initialized(tx).await? {
            return Err(RegistryError::AlreadyInitialized);
        }
        tx.put(
            LedgerKey::from(INIT_KEY),
            codec::encode(&InitMarker { initialized: true })?,
        );
        for kind in EntityKind::ALL {
            tx.put(counter_key(kind), codec::encode(&Counter { count: 0 })?);
        }
        info!(tx_id = %tx.tx_id(), "ledger bootstrapped");
        Ok(())
    }

    pub async fn is_initialized(tx: &mut TxContext) -> RegistryResult<bool> {
        Ok(tx.get(&LedgerKey::from(INIT_KEY)).await?.is_some())
    }

    /// Number of entities of `kind` created so far.
    pub async fn current(tx: &mut TxContext, kind: EntityKind) -> RegistryResult<u64> {
        let key = counter_key(kind);
        let bytes = tx
            .get(&key)
            .await?
            .ok_or_else(|| RegistryError::NotInitialized(key.to_string()))?;
        let counter: Counter = codec::decode(&bytes)?;
        Ok(counter.count)
    }

    /// Consume the next sequence number for `kind`.
    pub async fn next(tx: &mut TxContext, kind: EntityKind) -> RegistryResult<u64> {
        let sequence = Self::current(tx, kind).await?;
        let advanced = sequence.checked_add(1).ok_or_else(|| {
            RegistryError::InvalidArgument(format!("{} sequence exhausted", kind))
        })?;
        tx.put(counter_key(kind), codec::encode(&Counter { count: advanced })?);
        debug!(kind = %kind, sequence, "sequence number issued");
        Ok(sequence)
    }

    /// Resolve the ID of a new entity and advance the kind's counter.
    ///
    /// Must run before any write that references the new ID.
    pub async fn assign(
        tx: &mut TxContext,
        kind: EntityKind,
        mode: IdMode,
        requested: Option<&str>,
    ) -> RegistryResult<String> {
        let sequence = Self::next(tx, kind).await?;
        let id = match requested {
            None => format!("{}{}", kind.prefix(), sequence),
            Some(id) => {
                validate_supplied(kind, mode, id)?;
                id.to_string()
            }
        };
        if store::exists(tx, kind, &id).await? {
            return Err(RegistryError::AlreadyExists(format!(
                "{} {} already exists",
                kind, id
            )));
        }
        debug!(key = %entity_key(kind, &id), "id assigned");
        Ok(id)
    }
}

fn validate_supplied(kind: EntityKind, mode: IdMode, id: &str) -> RegistryResult<()> {
    if mode != IdMode::CallerSupplied {
        return Err(RegistryError::InvalidArgument(format!(
            "caller-supplied {} id {} is not accepted in allocated id mode",
            kind, id
        )));
    }
    if id.trim().is_empty() || id.contains('/') {
        return Err(RegistryError::InvalidArgument(format!(
            "{} id {:?} must be non-empty and must not contain '/'",
            kind, id
        )));
    }
    if kind.is_allocated_id(id) {
        return Err(RegistryError::InvalidArgument(format!(
            "{} id {} is reserved for allocated ids",
            kind, id
        )));
    }
    Ok(())
}
