//! File persistence for the in-memory ledger.

use crate::error::CliResult;
use std::path::{Path, PathBuf};
use tracing::debug;
use utopia_ledger::{InMemoryLedger, LedgerSnapshot};

/// Load the ledger stored at `path`, or an empty one when the file does not exist.
pub fn open(path: &Path) -> CliResult<InMemoryLedger> {
    if !path.exists() {
        debug!(path = %path.display(), "no snapshot, starting empty");
        return Ok(InMemoryLedger::new());
    }
    let contents = std::fs::read_to_string(path)?;
    let snapshot: LedgerSnapshot = serde_json::from_str(&contents)?;
    Ok(InMemoryLedger::from_snapshot(snapshot)?)
}

/// Write the committed state to `path`, replacing the previous file in one rename.
pub fn persist(path: &Path, ledger: &InMemoryLedger) -> CliResult<()> {
    let snapshot = ledger.snapshot()?;
    let staging = staging_path(path);
    std::fs::write(&staging, serde_json::to_vec_pretty(&snapshot)?)?;
    std::fs::rename(&staging, path)?;
    debug!(path = %path.display(), height = snapshot.height, "snapshot persisted");
    Ok(())
}

/// Sibling of `path` with `.tmp` appended to the full file name, so it never
/// equals `path` itself.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
