use thiserror::Error;

/// Errors raised by node property access and registry lookups.
#[derive(Debug, Error)]
pub enum NodeError {
  #[error("node '{node}' has no input named '{name}'")]
  UnknownInput { node: String, name: String },

  #[error("node '{node}' has no output named '{name}'")]
  UnknownOutput { node: String, name: String },

  #[error("node '{node}' has no attribute named '{name}'")]
  UnknownAttribute { node: String, name: String },

  #[error("output '{output}' of node '{node}' has no filename role '{role}'")]
  UnknownRole {
    node: String,
    output: String,
    role: String,
  },

  #[error("unknown node type '{type_name}'")]
  UnknownType { type_name: String },

  #[error("node type '{type_name}' is already registered")]
  DuplicateType { type_name: String },
}
