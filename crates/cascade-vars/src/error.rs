use thiserror::Error;

/// Errors raised by [`crate::VarTable`] mutations.
#[derive(Debug, Error)]
pub enum VarError {
  #[error("variable '{name}' does not exist")]
  UnknownVariable { name: String },

  #[error("variable '{name}' is read-only")]
  ReadOnly { name: String },
}
