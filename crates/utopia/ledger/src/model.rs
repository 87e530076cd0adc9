use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An ordered byte-string ledger key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LedgerKey(Vec<u8>);

impl LedgerKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<&str> for LedgerKey {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<String> for LedgerKey {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Commit height at which a key was last written.
pub type Version = u64;

/// A stored value together with the version that wrote it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedValue {
    pub value: Vec<u8>,
    pub version: Version,
}

/// One `(key, value)` pair yielded by a range scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerEntry {
    pub key: LedgerKey,
    pub value: Vec<u8>,
}

/// Everything a transaction read and wrote, submitted as one atomic unit.
#[derive(Clone, Debug, Default)]
pub struct WriteSet {
    pub tx_id: String,
    /// Keys read through point lookups and the version observed (`None` = absent).
    pub reads: BTreeMap<LedgerKey, Option<Version>>,
    pub writes: BTreeMap<LedgerKey, Vec<u8>>,
}

impl WriteSet {
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Acknowledgement of an applied write set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub tx_id: String,
    pub height: u64,
    pub keys_written: usize,
}
