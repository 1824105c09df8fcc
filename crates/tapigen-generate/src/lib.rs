//! Table API generation engine for tapigen.
//!
//! Consumes a metadata snapshot and an effective policy to produce package
//! specifications and bodies, triggers and views from fragment templates,
//! gated by a CSV file control ledger.

pub mod atomic;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod model;
pub mod output;
pub mod render;
pub mod roles;
pub mod sentinel;
pub mod signature;
pub mod template;

pub use engine::{GenerationEngine, TableSelection};
pub use errors::{GenerationError, Result};
pub use ledger::{ArtifactKind, FileLedger, LedgerEntry};
pub use model::{GenerationIssue, GenerationReport, IssueLevel, TableReport};
pub use output::{OutputWriter, RenderedUnit, UnitKind};
pub use render::{RunContext, TableContext};
pub use roles::{ClassifiedColumn, ColumnRole, classify, classify_table};
pub use sentinel::SentinelSpec;
pub use signature::{Direction, ParamType, Parameter, Signature, build};
pub use template::{Bindings, FragmentKind, TemplateSet, render};
