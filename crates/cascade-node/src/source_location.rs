//! Source-location strings.
//!
//! An input's value addresses the upstream output feeding it as
//! `node_name.output_name`. The node name itself may contain dots, so the
//! split is on the *last* dot. The graph layer resolves the node name to an
//! actual node.

/// Split a source-location string into (node name, output name).
///
/// Returns `None` for empty or malformed values.
pub fn parse(value: &str) -> Option<(&str, &str)> {
  let (node, output) = value.rsplit_once('.')?;
  if node.is_empty() || output.is_empty() {
    return None;
  }
  Some((node, output))
}

/// Format a (node name, output name) pair as a source-location string.
pub fn format(node_name: &str, output_name: &str) -> String {
  format!("{node_name}.{output_name}")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_round_trip() {
    assert_eq!(parse(&format("Scan", "File")), Some(("Scan", "File")));
  }

  #[test]
  fn test_node_names_may_contain_dots() {
    assert_eq!(parse("plate.v2.Out"), Some(("plate.v2", "Out")));
  }

  #[test]
  fn test_malformed_values() {
    assert_eq!(parse(""), None);
    assert_eq!(parse("NoDotHere"), None);
    assert_eq!(parse(".Out"), None);
    assert_eq!(parse("Node."), None);
  }
}
