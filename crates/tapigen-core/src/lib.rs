//! Core contracts for tapigen.
//!
//! This crate defines the metadata snapshot consumed by the generator (tables,
//! ordered columns and key constraints), its JSON contract, and the
//! consistency checks applied before any code is generated.

pub mod constraints;
pub mod error;
pub mod schema;
pub mod snapshot;
pub mod types;
pub mod validation;

pub use constraints::{Constraint, PrimaryKey, UniqueConstraint};
pub use error::{Error, Result};
pub use schema::{Column, MetadataSnapshot, Schema, Table, TableKind};
pub use snapshot::{load_snapshot, parse_snapshot, snapshot_fingerprint, snapshot_json_schema};
pub use types::{ColumnType, IdentityGeneration};
pub use validation::{validate_snapshot, validate_snapshot_json};

/// Current contract version for metadata snapshot documents.
pub const SNAPSHOT_VERSION: &str = "0.1";
