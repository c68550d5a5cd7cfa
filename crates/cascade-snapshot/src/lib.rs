//! Cascade Snapshot
//!
//! Serialization of full graph state — nodes, edges, groups, presentation
//! metadata and variable bindings — to and from a structured document.
//! Snapshots are deterministic (stable ordering throughout), preserve node
//! identity (UUIDs survive the round trip), and restore all-or-nothing: a
//! bad document leaves the prior graph untouched.

mod codec;
mod document;
mod error;

pub use codec::{restore, restore_vars, snapshot};
pub use document::{
  EdgeRecord, GroupRecord, NodeRecord, OutputRecord, PortRecord, Snapshot, SnapshotMeta, VarRecord,
};
pub use error::SnapshotError;
