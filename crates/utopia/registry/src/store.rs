//! Typed entity access on top of a transaction context.

use crate::keys::{entity_key, kind_range};
use crate::{RegistryError, RegistryResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use utopia_ledger::{codec, TxContext, TxRangeScan};
use utopia_types::EntityKind;

pub(crate) async fn load<T: DeserializeOwned>(
    tx: &mut TxContext,
    kind: EntityKind,
    id: &str,
) -> RegistryResult<Option<T>> {
    match tx.get(&entity_key(kind, id)).await? {
        Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
        None => Ok(None),
    }
}

pub(crate) async fn fetch<T: DeserializeOwned>(
    tx: &mut TxContext,
    kind: EntityKind,
    id: &str,
) -> RegistryResult<T> {
    load(tx, kind, id)
        .await?
        .ok_or_else(|| RegistryError::NotFound(format!("{} {} does not exist", kind, id)))
}

pub(crate) async fn exists(tx: &mut TxContext, kind: EntityKind, id: &str) -> RegistryResult<bool> {
    Ok(tx.get(&entity_key(kind, id)).await?.is_some())
}

pub(crate) fn save<T: Serialize>(
    tx: &mut TxContext,
    kind: EntityKind,
    id: &str,
    entity: &T,
) -> RegistryResult<()> {
    tx.put(entity_key(kind, id), codec::encode(entity)?);
    Ok(())
}

/// Lazy, finite sequence of every entity of one kind in key order.
///
/// Each `list` call opens a fresh scan, so sequences are restartable by
/// asking again. Call [`EntityIter::close`] (or [`EntityIter::collect_all`],
/// which closes for you) to release the ledger cursor.
pub struct EntityIter<T> {
    scan: TxRangeScan,
    _entity: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> EntityIter<T> {
    pub(crate) async fn open(tx: &mut TxContext, kind: EntityKind) -> RegistryResult<Self> {
        let (start, end) = kind_range(kind);
        Ok(Self {
            scan: tx.range_scan(&start, &end).await?,
            _entity: PhantomData,
        })
    }

    pub async fn next(&mut self) -> RegistryResult<Option<T>> {
        match self.scan.next().await? {
            Some(entry) => Ok(Some(codec::decode(&entry.value)?)),
            None => Ok(None),
        }
    }

    pub async fn close(mut self) -> RegistryResult<()> {
        self.scan.close().await?;
        Ok(())
    }

    /// Drain the remaining entities and release the cursor, even on failure.
    pub async fn collect_all(mut self) -> RegistryResult<Vec<T>> {
        let mut items = Vec::new();
        let drained = loop {
            match self.next().await {
                Ok(Some(item)) => items.push(item),
                Ok(None) => break Ok(()),
                Err(err) => break Err(err),
            }
        };
        let closed = self.scan.close().await;
        drained?;
        closed?;
        Ok(items)
    }
}
