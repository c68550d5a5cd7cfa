use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::VarError;

static DOUBLE_DOLLAR: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\$\$([A-Za-z_][A-Za-z0-9_]*)").unwrap());
static SINGLE_DOLLAR: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").unwrap());

#[derive(Debug, Clone)]
struct VarEntry {
  value: String,
  read_only: bool,
}

/// A table of workflow variables.
///
/// Created at session start and passed explicitly to every call that needs
/// substitution. Read-only entries are the built-ins an embedder installs at
/// startup; they are skipped by [`VarTable::clear`] and excluded from
/// [`VarTable::bindings`].
#[derive(Debug, Clone, Default)]
pub struct VarTable {
  entries: HashMap<String, VarEntry>,
}

impl VarTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add an empty variable. Adding an existing name is a no-op.
  pub fn add(&mut self, name: impl Into<String>) {
    self.entries.entry(name.into()).or_insert(VarEntry {
      value: String::new(),
      read_only: false,
    });
  }

  /// Set the value of an existing variable.
  pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<(), VarError> {
    let entry = self
      .entries
      .get_mut(name)
      .ok_or_else(|| VarError::UnknownVariable {
        name: name.to_string(),
      })?;
    if entry.read_only {
      return Err(VarError::ReadOnly {
        name: name.to_string(),
      });
    }
    entry.value = value.into();
    Ok(())
  }

  /// Install a built-in variable, overwriting any previous entry.
  pub fn set_read_only(&mut self, name: impl Into<String>, value: impl Into<String>) {
    self.entries.insert(
      name.into(),
      VarEntry {
        value: value.into(),
        read_only: true,
      },
    );
  }

  /// Remove a variable. Read-only entries cannot be removed.
  pub fn remove(&mut self, name: &str) -> Result<(), VarError> {
    match self.entries.get(name) {
      None => Err(VarError::UnknownVariable {
        name: name.to_string(),
      }),
      Some(entry) if entry.read_only => Err(VarError::ReadOnly {
        name: name.to_string(),
      }),
      Some(_) => {
        self.entries.remove(name);
        Ok(())
      }
    }
  }

  /// Drop every non-read-only entry.
  pub fn clear(&mut self) {
    self.entries.retain(|_, entry| entry.read_only);
  }

  pub fn value(&self, name: &str) -> Option<&str> {
    self.entries.get(name).map(|e| e.value.as_str())
  }

  pub fn contains(&self, name: &str) -> bool {
    self.entries.contains_key(name)
  }

  pub fn is_read_only(&self, name: &str) -> bool {
    self.entries.get(name).is_some_and(|e| e.read_only)
  }

  /// All variable names, sorted.
  pub fn names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.entries.keys().cloned().collect();
    names.sort();
    names
  }

  /// The non-built-in (name, value) pairs, sorted by name. This is what a
  /// snapshot persists.
  pub fn bindings(&self) -> Vec<(String, String)> {
    let mut bindings: Vec<(String, String)> = self
      .entries
      .iter()
      .filter(|(_, e)| !e.read_only)
      .map(|(k, e)| (k.clone(), e.value.clone()))
      .collect();
    bindings.sort();
    bindings
  }

  /// Substitute `$$ENVVAR` tokens from the process environment, then `$NAME`
  /// tokens from this table. Unknown tokens are left verbatim so validation
  /// can report them.
  pub fn substitute(&self, text: &str) -> String {
    let env_pass = DOUBLE_DOLLAR.replace_all(text, |caps: &regex::Captures| {
      let name = &caps[1];
      std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
    });
    SINGLE_DOLLAR
      .replace_all(&env_pass, |caps: &regex::Captures| {
        let name = &caps[1];
        match self.value(name) {
          Some(value) => value.to_string(),
          None => caps[0].to_string(),
        }
      })
      .into_owned()
  }

  /// Substitute an optional string, passing `None` through.
  pub fn substitute_opt(&self, text: Option<&str>) -> Option<String> {
    text.map(|t| self.substitute(t))
  }
}

/// Scan a string for variable tokens.
///
/// Returns the `$NAME` token names and the `$$NAME` token names, each
/// deduplicated in discovery order.
pub fn present(text: &str) -> (Vec<String>, Vec<String>) {
  let mut doubles = Vec::new();
  for caps in DOUBLE_DOLLAR.captures_iter(text) {
    let name = caps[1].to_string();
    if !doubles.contains(&name) {
      doubles.push(name);
    }
  }
  // Strip the double-dollar tokens so the single-dollar scan does not see
  // their trailing `$NAME` half.
  let stripped = DOUBLE_DOLLAR.replace_all(text, "");
  let mut singles = Vec::new();
  for caps in SINGLE_DOLLAR.captures_iter(&stripped) {
    let name = caps[1].to_string();
    if !singles.contains(&name) {
      singles.push(name);
    }
  }
  (singles, doubles)
}
