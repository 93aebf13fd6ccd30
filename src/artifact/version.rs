//! Content-addressed artifact versioning.
//!
//! One build is identified by a SHA-256 over everything that shapes the
//! artifact: the per-field configs, the store projection cap, and the
//! canonicalized dataset. Records are sorted by id before hashing so the
//! version is independent of dataset input order. Equality is semantic:
//! equal hashes mean equivalent content, which is exactly the weak-equality
//! guarantee the hosting layer's freshness header needs.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::artifact::shard::FieldConfig;
use crate::model::MessageRecord;

/// Identity of one built artifact.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtifactVersion([u8; 32]);

impl ArtifactVersion {
    pub fn as_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Weak validator form for the hosting layer's freshness header,
    /// e.g. `W/"90f3ac71d2b84c5e"`.
    pub fn weak_etag(&self) -> String {
        format!("W/\"{}\"", &self.as_hex()[..16])
    }
}

impl fmt::Display for ArtifactVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_hex())
    }
}

impl fmt::Debug for ArtifactVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArtifactVersion({})", self.as_hex())
    }
}

impl Serialize for ArtifactVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Compute the version for a build.
///
/// Hash input is newline-delimited JSON: each field config in priority
/// order, the store body cap, then every record ascending by id. JSON string
/// escaping guarantees no payload piece contains a raw newline, so the
/// framing is unambiguous.
pub fn content_version(
    configs: &[FieldConfig],
    store_body_max: usize,
    records: &[MessageRecord],
) -> serde_json::Result<ArtifactVersion> {
    let mut hasher = Sha256::new();
    for config in configs {
        hasher.update(serde_json::to_vec(config)?);
        hasher.update(b"\n");
    }
    hasher.update(store_body_max.to_string().as_bytes());
    hasher.update(b"\n");

    let mut ordered: Vec<&MessageRecord> = records.iter().collect();
    ordered.sort_by_key(|record| record.id);
    for record in ordered {
        hasher.update(serde_json::to_vec(record)?);
        hasher.update(b"\n");
    }

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    Ok(ArtifactVersion(digest))
}
