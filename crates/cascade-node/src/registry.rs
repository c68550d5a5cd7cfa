use std::collections::BTreeMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::NodeError;
use crate::node::Node;
use crate::spec::NodeSpec;

/// The node type registry: a mapping from type-name string to constructible
/// node type.
///
/// The core engine only ever consults this table — discovery of node types
/// (plugin loading, scanning, static registration) is the embedder's
/// concern. Snapshot restore uses it to rebuild nodes from their type tags.
#[derive(Default)]
pub struct NodeRegistry {
  specs: BTreeMap<String, Arc<dyn NodeSpec>>,
}

impl NodeRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a node type. Registering a name twice is an error — two
  /// plugins claiming one tag is a configuration bug worth surfacing.
  pub fn register(&mut self, spec: Arc<dyn NodeSpec>) -> Result<(), NodeError> {
    let type_name = spec.type_name().to_string();
    if self.specs.contains_key(&type_name) {
      return Err(NodeError::DuplicateType { type_name });
    }
    self.specs.insert(type_name, spec);
    Ok(())
  }

  /// Construct a fresh node of the named type.
  pub fn create(&self, type_name: &str) -> Result<Node, NodeError> {
    let spec = self
      .specs
      .get(type_name)
      .ok_or_else(|| NodeError::UnknownType {
        type_name: type_name.to_string(),
      })?;
    Ok(Node::from_spec(spec.clone()))
  }

  /// Construct a node of the named type with a caller-supplied UUID.
  /// Snapshot restore uses this to preserve identity across save/load.
  pub fn create_with_id(&self, type_name: &str, id: Uuid) -> Result<Node, NodeError> {
    let spec = self
      .specs
      .get(type_name)
      .ok_or_else(|| NodeError::UnknownType {
        type_name: type_name.to_string(),
      })?;
    Ok(Node::with_id(spec.clone(), id))
  }

  pub fn contains(&self, type_name: &str) -> bool {
    self.specs.contains_key(type_name)
  }

  /// Registered type names, sorted.
  pub fn type_names(&self) -> Vec<&str> {
    self.specs.keys().map(|k| k.as_str()).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::builtin::ListDirSpec;

  #[test]
  fn test_create_unknown_type() {
    let registry = NodeRegistry::new();
    assert!(matches!(
      registry.create("Nope"),
      Err(NodeError::UnknownType { .. })
    ));
  }

  #[test]
  fn test_duplicate_registration_rejected() {
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(ListDirSpec)).unwrap();
    assert!(matches!(
      registry.register(Arc::new(ListDirSpec)),
      Err(NodeError::DuplicateType { .. })
    ));
  }

  #[test]
  fn test_created_nodes_get_fresh_ids() {
    let mut registry = NodeRegistry::new();
    registry.register(Arc::new(ListDirSpec)).unwrap();
    let a = registry.create("ListDir").unwrap();
    let b = registry.create("ListDir").unwrap();
    assert_ne!(a.id(), b.id());
  }
}
