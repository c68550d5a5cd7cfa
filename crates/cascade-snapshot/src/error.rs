use thiserror::Error;
use uuid::Uuid;

use cascade_graph::GraphError;
use cascade_node::NodeError;

/// Errors raised while encoding or restoring a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
  #[error("snapshot names node type '{type_name}', which is not in the registry")]
  UnknownNodeType { type_name: String },

  #[error("snapshot references node UUID {uuid}, which it does not define")]
  DanglingReference { uuid: Uuid },

  #[error(transparent)]
  Node(#[from] NodeError),

  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error("failed to parse snapshot document")]
  Parse(#[from] serde_json::Error),
}
