use thiserror::Error;

use cascade_node::NodeError;
use cascade_packet::PacketType;

use crate::execute::RunnerError;

/// Errors raised by graph mutation, evaluation and execution.
///
/// Structural mutations either complete or leave the graph exactly as it was
/// before the call — a rejected connect never leaves a partial edge behind.
#[derive(Debug, Error)]
pub enum GraphError {
  #[error("a node named '{name}' already exists in the graph")]
  DuplicateName { name: String },

  #[error("node '{node}' does not exist in the graph")]
  UnknownNode { node: String },

  #[error("the connection already exists")]
  DuplicateEdge,

  #[error("the connection does not exist")]
  MissingEdge,

  #[error("the connection would make the graph cyclic")]
  CycleDetected,

  #[error("a group named '{name}' already exists")]
  DuplicateGroupName { name: String },

  #[error("group '{name}' does not exist")]
  UnknownGroup { name: String },

  #[error("node '{node}' already belongs to group '{group}'")]
  DuplicateGroupMembership { node: String, group: String },

  #[error(transparent)]
  Node(#[from] NodeError),

  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("execution halted at node '{node}'")]
  Execution {
    node: String,
    #[source]
    source: RunnerError,
  },
}

/// A failed pre-execution sanity check.
///
/// Checks run fail-fast in a documented order; the first violation aborts
/// the entire pending run before any node executes.
#[derive(Debug, Error)]
pub enum ValidationError {
  #[error("variable '${name}' used in node '{node}' does not exist in the current session")]
  UnresolvedVariable { node: String, name: String },

  #[error("environment variable '$${name}' used in node '{node}' is not set")]
  UnresolvedEnvVariable { node: String, name: String },

  #[error("node '{node}' is missing a required input ('{input}')")]
  MissingRequiredInput { node: String, input: String },

  #[error("input '{input}' of node '{node}' receives a {found} packet, which it does not accept")]
  TypeMismatch {
    node: String,
    input: String,
    found: PacketType,
  },

  #[error(
    "input range of node '{node}' input '{input}' extends beyond the bounds of the output of node '{upstream}'"
  )]
  RangeOutOfBounds {
    node: String,
    input: String,
    upstream: String,
  },

  #[error("parallel node '{node}' trims its input '{input}' against the output it feeds")]
  ParallelRangeMismatch { node: String, input: String },

  #[error("output '{output}' of node '{node}' uses frame symbols but declares no sequence range")]
  FrameSymbolsWithoutRange { node: String, output: String },

  #[error("node '{node}' did not pass its validation hook: {message}")]
  CustomValidation { node: String, message: String },

  #[error("node '{node}' in group '{group}' is not embarrassingly parallel")]
  GroupNotParallel { node: String, group: String },

  #[error("sequence ranges in group '{group}' do not match; detected on node '{node}'")]
  GroupRangeMismatch { group: String, node: String },

  #[error("node '{node}' is present in multiple groups")]
  DuplicateGroupMembership { node: String },
}
