use std::collections::HashSet;

use tracing::{info, warn};
use uuid::Uuid;

use cascade_graph::Graph;
use cascade_node::NodeRegistry;
use cascade_vars::VarTable;

use crate::document::{
  EdgeRecord, GroupRecord, NodeRecord, OutputRecord, PortRecord, Snapshot, SnapshotMeta, VarRecord,
};
use crate::error::SnapshotError;

/// Encode the full state of a graph into a snapshot document.
///
/// Deterministic: nodes are listed by name, edges by (FROM, TO), groups by
/// name with sorted members. Two snapshots of an unchanged graph are
/// byte-identical.
pub fn snapshot(graph: &Graph, vars: &VarTable, meta: SnapshotMeta) -> Snapshot {
  let mut nodes: Vec<NodeRecord> = graph
    .nodes()
    .map(|node| NodeRecord {
      name: node.name().to_string(),
      type_name: node.type_name().to_string(),
      uuid: node.id(),
      inputs: node
        .inputs()
        .iter()
        .map(|input| PortRecord {
          name: input.name().to_string(),
          value: input.value().to_string(),
          range: input.seq_range().cloned(),
        })
        .collect(),
      outputs: node
        .outputs()
        .iter()
        .map(|output| OutputRecord {
          name: output.name().to_string(),
          value: output.values().clone(),
          range: output.seq_range().cloned(),
        })
        .collect(),
      attributes: node
        .attributes()
        .iter()
        .map(|attribute| PortRecord {
          name: attribute.name().to_string(),
          value: attribute.value().to_string(),
          range: attribute.seq_range().cloned(),
        })
        .collect(),
    })
    .collect();
  nodes.sort_by(|a, b| a.name.cmp(&b.name));

  let mut edges: Vec<EdgeRecord> = graph
    .edges()
    .into_iter()
    .map(|(from, to)| EdgeRecord { from, to })
    .collect();
  edges.sort_by_key(|edge| (edge.from, edge.to));

  let groups: Vec<GroupRecord> = graph
    .groups()
    .map(|(name, members)| GroupRecord {
      name: name.to_string(),
      nodes: members.iter().copied().collect(),
    })
    .collect();

  let variable_substitutions = vars
    .bindings()
    .into_iter()
    .map(|(name, value)| VarRecord { name, value })
    .collect();

  Snapshot {
    nodes,
    edges,
    groups,
    node_meta: meta.node_meta,
    connection_meta: meta.connection_meta,
    variable_substitutions,
  }
}

/// Rebuild a graph from a snapshot document.
///
/// Node types are looked up in the registry; every node keeps its original
/// UUID. Restore is all-or-nothing: the new state is assembled on the side
/// and only swapped into `graph` once the whole document has applied, so a
/// dangling reference or unknown type leaves the prior graph intact.
pub fn restore(
  graph: &mut Graph,
  snapshot: &Snapshot,
  registry: &NodeRegistry,
) -> Result<(), SnapshotError> {
  let mut rebuilt = Graph::new();
  let mut known: HashSet<Uuid> = HashSet::new();

  for record in &snapshot.nodes {
    if !registry.contains(&record.type_name) {
      return Err(SnapshotError::UnknownNodeType {
        type_name: record.type_name.clone(),
      });
    }
    let mut node = registry.create_with_id(&record.type_name, record.uuid)?;
    node.set_name(&record.name);
    for input in &record.inputs {
      node.set_input_value(&input.name, input.value.clone())?;
      node.set_input_range(&input.name, input.range.clone())?;
    }
    for output in &record.outputs {
      for (role, path) in &output.value {
        node.set_output_value(&output.name, role, path.clone())?;
      }
      node.set_output_range(&output.name, output.range.clone())?;
    }
    for attribute in &record.attributes {
      node.set_attribute_value(&attribute.name, attribute.value.clone())?;
      node.set_attribute_range(&attribute.name, attribute.range.clone())?;
    }
    known.insert(record.uuid);
    rebuilt.add_node(node)?;
  }

  for edge in &snapshot.edges {
    for endpoint in [edge.from, edge.to] {
      if !known.contains(&endpoint) {
        return Err(SnapshotError::DanglingReference { uuid: endpoint });
      }
    }
    rebuilt.connect(edge.from, edge.to)?;
  }

  for group in &snapshot.groups {
    for &member in &group.nodes {
      if !known.contains(&member) {
        return Err(SnapshotError::DanglingReference { uuid: member });
      }
    }
    rebuilt.add_group(group.name.clone(), group.nodes.iter().copied())?;
  }

  info!(
    nodes = snapshot.nodes.len(),
    edges = snapshot.edges.len(),
    groups = snapshot.groups.len(),
    "snapshot_restored"
  );
  *graph = rebuilt;
  Ok(())
}

/// Apply a snapshot's variable bindings to a table.
///
/// Non-built-in entries are cleared first; read-only (built-in) variables
/// are never overwritten by a document.
pub fn restore_vars(vars: &mut VarTable, snapshot: &Snapshot) {
  vars.clear();
  for record in &snapshot.variable_substitutions {
    if vars.is_read_only(&record.name) {
      warn!(name = %record.name, "snapshot variable shadows a built-in, skipped");
      continue;
    }
    vars.add(record.name.as_str());
    // The entry was just added (or already existed non-read-only).
    let _ = vars.set(&record.name, record.value.clone());
  }
}
