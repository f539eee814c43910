//! Deterministic digest of a visible state.
//!
//! Two states hash equal iff they hold the same records in the same order.
//! Used to detect whether a pull changed anything and to compare replicas.

use std::fmt;

use crate::record::Record;

/// Blake3 hash over the canonical JSON of each record, in order.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotDigest(pub [u8; 32]);

impl SnapshotDigest {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for SnapshotDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SnapshotDigest({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for SnapshotDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Compute the digest of a record list.
///
/// Field maps are ordered (`serde_json::Map` is a `BTreeMap`), so the
/// encoding is canonical without extra work.
pub fn snapshot_digest(records: &[Record]) -> SnapshotDigest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"ledgerline-snapshot-v0:");
    hasher.update(&(records.len() as u64).to_le_bytes());

    for record in records {
        let encoded = serde_json::to_vec(record).unwrap_or_default();
        hasher.update(&(encoded.len() as u64).to_le_bytes());
        hasher.update(&encoded);
    }

    SnapshotDigest(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn test_digest_is_deterministic() {
        let records = vec![
            Record::with_id("a", Map::new()).set("x", 1).set("y", 2),
            Record::with_id("b", Map::new()),
        ];
        assert_eq!(snapshot_digest(&records), snapshot_digest(&records.clone()));
    }

    #[test]
    fn test_digest_depends_on_order_and_content() {
        let a = Record::with_id("a", Map::new());
        let b = Record::with_id("b", Map::new());

        let ab = snapshot_digest(&[a.clone(), b.clone()]);
        let ba = snapshot_digest(&[b.clone(), a.clone()]);
        assert_ne!(ab, ba);

        let changed = snapshot_digest(&[a.set("x", 1), b]);
        assert_ne!(ab, changed);
    }

    #[test]
    fn test_empty_digest_display() {
        let d = snapshot_digest(&[]);
        assert_eq!(format!("{}", d).len(), 16);
    }
}
