//! Canonical value encoding.
//!
//! Values are JSON with object keys sorted at every depth and no whitespace,
//! so logically identical entities always produce identical bytes on every
//! replica. Going through `serde_json::Value` gives the sorting for free: its
//! map type is ordered.

use crate::{LedgerError, LedgerResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encode a value into canonical bytes.
pub fn encode<T: Serialize>(value: &T) -> LedgerResult<Vec<u8>> {
    let tree = serde_json::to_value(value)?;
    Ok(serde_json::to_vec(&tree)?)
}

/// Decode canonical (or any valid JSON) bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> LedgerResult<T> {
    serde_json::from_slice(bytes).map_err(|e| LedgerError::Serialization(e.to_string()))
}

/// BLAKE3 hex digest of a value's canonical encoding.
pub fn digest<T: Serialize>(value: &T) -> LedgerResult<String> {
    Ok(blake3::hash(&encode(value)?).to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::Deserialize;
    use std::collections::{BTreeMap, HashMap};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        zeta: u64,
        alpha: String,
        nested: Nested,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Nested {
        y: bool,
        b: Vec<u32>,
    }

    #[test]
    fn keys_are_sorted_recursively() {
        let record = Record {
            zeta: 1,
            alpha: "a".into(),
            nested: Nested {
                y: true,
                b: vec![2, 1],
            },
        };
        let bytes = encode(&record).unwrap();
        assert_eq!(
            String::from_utf8(bytes.clone()).unwrap(),
            r#"{"alpha":"a","nested":{"b":[2,1],"y":true},"zeta":1}"#
        );
        assert_eq!(decode::<Record>(&bytes).unwrap(), record);
    }

    #[test]
    fn malformed_bytes_are_a_serialization_error() {
        let result = decode::<Record>(b"{not json");
        assert!(matches!(result, Err(LedgerError::Serialization(_))));
    }

    proptest! {
        #[test]
        fn encoding_ignores_insertion_order(entries in proptest::collection::vec(("[a-z]{1,6}", any::<u32>()), 0..16)) {
            let hashed: HashMap<String, u32> = entries.iter().cloned().collect();
            let ordered: BTreeMap<String, u32> = entries.into_iter().collect();
            prop_assert_eq!(encode(&hashed).unwrap(), encode(&ordered).unwrap());
            prop_assert_eq!(digest(&hashed).unwrap(), digest(&ordered).unwrap());
        }
    }
}
