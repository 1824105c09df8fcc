use std::path::Path;

use schemars::schema::RootSchema;
use schemars::schema_for;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::schema::MetadataSnapshot;
use crate::validation::{validate_snapshot, validate_snapshot_json};

/// Emit the JSON Schema for metadata snapshot documents.
pub fn snapshot_json_schema() -> RootSchema {
    schema_for!(MetadataSnapshot)
}

/// Parse and validate a snapshot document.
///
/// The document is checked against the JSON contract before deserialization,
/// then checked for internal consistency.
pub fn parse_snapshot(document: Value) -> Result<MetadataSnapshot> {
    validate_snapshot_json(&document)?;
    let snapshot: MetadataSnapshot = serde_json::from_value(document)?;
    validate_snapshot(&snapshot)?;
    Ok(snapshot)
}

/// Read, parse and validate a snapshot file.
pub fn load_snapshot(path: &Path) -> Result<MetadataSnapshot> {
    let contents = std::fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(&contents)?;
    parse_snapshot(document)
}

/// Stable SHA-256 fingerprint of a snapshot, hex encoded.
pub fn snapshot_fingerprint(snapshot: &MetadataSnapshot) -> Result<String> {
    let bytes = serde_json::to_vec(snapshot)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
