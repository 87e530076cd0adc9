//! Ledger key layout.
//!
//! ```text
//! meta/initialized            bootstrap marker
//! counter/<kind>              {"count": n}
//! entity/<kind>/<id>          canonical entity JSON
//! ```

use utopia_ledger::LedgerKey;
use utopia_types::EntityKind;

pub const INIT_KEY: &str = "meta/initialized";

pub fn counter_key(kind: EntityKind) -> LedgerKey {
    LedgerKey::from(format!("counter/{}", kind.prefix()))
}

pub fn entity_key(kind: EntityKind, id: &str) -> LedgerKey {
    LedgerKey::from(format!("entity/{}/{}", kind.prefix(), id))
}

/// Half-open range covering every entity of `kind`. `'0'` is the byte after `'/'`.
pub fn kind_range(kind: EntityKind) -> (LedgerKey, LedgerKey) {
    (
        LedgerKey::from(format!("entity/{}/", kind.prefix())),
        LedgerKey::from(format!("entity/{}0", kind.prefix())),
    )
}
