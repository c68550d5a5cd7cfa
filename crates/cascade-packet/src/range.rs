use std::fmt;

use serde::{Deserialize, Serialize};

use cascade_vars::VarTable;

/// An inclusive [start, end] frame span.
///
/// Endpoints are stored as strings because they may contain `$VAR` tokens;
/// either endpoint may be unset. Serializes as a two-element array of
/// strings-or-nulls — an absent range is represented by `Option<SeqRange>`
/// and serializes as `null`, never `[]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeqRange(pub Option<String>, pub Option<String>);

impl SeqRange {
  pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
    SeqRange(Some(start.into()), Some(end.into()))
  }

  pub fn start(&self) -> Option<&str> {
    self.0.as_deref()
  }

  pub fn end(&self) -> Option<&str> {
    self.1.as_deref()
  }

  /// Both endpoints set.
  pub fn is_complete(&self) -> bool {
    self.0.is_some() && self.1.is_some()
  }

  /// A copy with variables substituted in both endpoints.
  pub fn substituted(&self, vars: &VarTable) -> SeqRange {
    SeqRange(
      self.0.as_deref().map(|s| vars.substitute(s)),
      self.1.as_deref().map(|s| vars.substitute(s)),
    )
  }

  /// Parse both endpoints as frame numbers, without substitution.
  pub fn numeric_raw(&self) -> Option<(i64, i64)> {
    let start = self.0.as_deref()?.trim().parse().ok()?;
    let end = self.1.as_deref()?.trim().parse().ok()?;
    Some((start, end))
  }

  /// Parse both endpoints as frame numbers after variable substitution.
  pub fn numeric(&self, vars: &VarTable) -> Option<(i64, i64)> {
    self.substituted(vars).numeric_raw()
  }
}

impl fmt::Display for SeqRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "[{}, {}]",
      self.0.as_deref().unwrap_or("-"),
      self.1.as_deref().unwrap_or("-")
    )
  }
}
