//! The snapshot document types.
//!
//! These mirror the persisted wire format key for key. RANGE values are a
//! two-element array of strings-or-nulls; an absent range is `null`, never
//! `[]`. The meta blobs belong to the presentation layer and pass through
//! the codec untouched.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cascade_packet::SeqRange;

/// The persisted state of a whole graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct Snapshot {
  pub nodes: Vec<NodeRecord>,
  pub edges: Vec<EdgeRecord>,
  pub groups: Vec<GroupRecord>,
  #[serde(default)]
  pub node_meta: Option<serde_json::Value>,
  #[serde(default)]
  pub connection_meta: Option<serde_json::Value>,
  #[serde(default)]
  pub variable_substitutions: Vec<VarRecord>,
}

impl Snapshot {
  pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(text)
  }

  pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(self)
  }
}

/// Opaque presentation-layer blobs threaded through a snapshot unchanged.
#[derive(Debug, Clone, Default)]
pub struct SnapshotMeta {
  pub node_meta: Option<serde_json::Value>,
  pub connection_meta: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct NodeRecord {
  pub name: String,
  #[serde(rename = "TYPE")]
  pub type_name: String,
  pub uuid: Uuid,
  pub inputs: Vec<PortRecord>,
  pub outputs: Vec<OutputRecord>,
  pub attributes: Vec<PortRecord>,
}

/// An input or attribute: one string value plus an optional range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct PortRecord {
  pub name: String,
  pub value: String,
  pub range: Option<SeqRange>,
}

/// An output: one path per filename role, one shared range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct OutputRecord {
  pub name: String,
  pub value: std::collections::BTreeMap<String, String>,
  pub range: Option<SeqRange>,
}

/// One dependency edge: FROM depends on TO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct EdgeRecord {
  pub from: Uuid,
  pub to: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct GroupRecord {
  pub name: String,
  pub nodes: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct VarRecord {
  pub name: String,
  pub value: String,
}
