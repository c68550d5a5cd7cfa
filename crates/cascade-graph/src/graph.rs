use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::Direction;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use tracing::debug;
use uuid::Uuid;

use cascade_node::Node;

use crate::error::GraphError;

/// The dependency graph: nodes, directed edges, and node groups.
///
/// Edges are stored consumer→producer: an edge from X to Y means X depends
/// on Y (Y's output feeds X's input). The structure is kept acyclic — an
/// insertion that would create a cycle is rolled back and rejected.
///
/// Node lookup is by UUID (identity) or display name (unique per graph).
/// Groups are named, disjoint sets of member UUIDs; the group table holds
/// identifiers only and is not consulted by traversal.
#[derive(Default)]
pub struct Graph {
  nodes: HashMap<Uuid, Node>,
  network: DiGraph<Uuid, ()>,
  indices: HashMap<Uuid, NodeIndex>,
  groups: BTreeMap<String, BTreeSet<Uuid>>,
}

impl Graph {
  pub fn new() -> Self {
    Self::default()
  }

  ///////////////////////////////////////////////////////////////////////////
  // Nodes
  ///////////////////////////////////////////////////////////////////////////

  /// Add a node. Its display name must be unique within the graph.
  pub fn add_node(&mut self, node: Node) -> Result<Uuid, GraphError> {
    if self.node_by_name(node.name()).is_some() {
      return Err(GraphError::DuplicateName {
        name: node.name().to_string(),
      });
    }
    let id = node.id();
    let index = self.network.add_node(id);
    self.indices.insert(id, index);
    self.nodes.insert(id, node);
    Ok(id)
  }

  /// Remove a node and all of its incident edges.
  ///
  /// Cross-references beyond the edge structure (group membership, input
  /// source strings on other nodes) are the caller's to migrate — see
  /// [`crate::propagate::disconnected`].
  pub fn remove_node(&mut self, id: Uuid) -> Result<Node, GraphError> {
    let index = self.index(id)?;
    self.network.remove_node(index);
    // petgraph swap-removes: the node that held the last index now holds
    // `index`, so its entry must be repaired.
    if let Some(&moved) = self.network.node_weight(index) {
      self.indices.insert(moved, index);
    }
    self.indices.remove(&id);
    Ok(self.nodes.remove(&id).expect("node map mirrors the network"))
  }

  pub fn node(&self, id: Uuid) -> Option<&Node> {
    self.nodes.get(&id)
  }

  pub fn node_mut(&mut self, id: Uuid) -> Option<&mut Node> {
    self.nodes.get_mut(&id)
  }

  pub fn node_by_name(&self, name: &str) -> Option<&Node> {
    self.nodes.values().find(|node| node.name() == name)
  }

  /// All nodes, in no particular order.
  pub fn nodes(&self) -> impl Iterator<Item = &Node> {
    self.nodes.values()
  }

  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }

  pub(crate) fn require(&self, id: Uuid) -> Result<&Node, GraphError> {
    self.node(id).ok_or(GraphError::UnknownNode {
      node: id.to_string(),
    })
  }

  fn index(&self, id: Uuid) -> Result<NodeIndex, GraphError> {
    self.indices.get(&id).copied().ok_or(GraphError::UnknownNode {
      node: id.to_string(),
    })
  }

  /// Bump a name suggestion with a numeric suffix until it is unused.
  pub fn safe_node_name(&self, suggestion: &str) -> String {
    let mut name = suggestion.to_string();
    while self.node_by_name(&name).is_some() {
      let digits = name.chars().rev().take_while(|c| c.is_ascii_digit()).count();
      if digits == 0 {
        name.push('1');
        continue;
      }
      let split = name.len() - digits;
      let (prefix, version) = name.split_at(split);
      let next: u64 = version.parse::<u64>().unwrap_or(0) + 1;
      name = format!("{prefix}{next:0width$}", width = digits);
    }
    name
  }

  ///////////////////////////////////////////////////////////////////////////
  // Edges
  ///////////////////////////////////////////////////////////////////////////

  /// Connect `from` to `to`, meaning `from` depends on `to`.
  ///
  /// Rejected (and fully rolled back) if either endpoint is unknown, the
  /// edge already exists, or the insertion would create a cycle.
  pub fn connect(&mut self, from: Uuid, to: Uuid) -> Result<(), GraphError> {
    let from_index = self.index(from)?;
    let to_index = self.index(to)?;
    if self.network.find_edge(from_index, to_index).is_some() {
      return Err(GraphError::DuplicateEdge);
    }
    let edge = self.network.add_edge(from_index, to_index, ());
    if is_cyclic_directed(&self.network) {
      self.network.remove_edge(edge);
      return Err(GraphError::CycleDetected);
    }
    debug!(from = %from, to = %to, "edge_added");
    Ok(())
  }

  /// Remove the edge meaning `from` depends on `to`.
  pub fn disconnect(&mut self, from: Uuid, to: Uuid) -> Result<(), GraphError> {
    let from_index = self.index(from)?;
    let to_index = self.index(to)?;
    let edge = self
      .network
      .find_edge(from_index, to_index)
      .ok_or(GraphError::MissingEdge)?;
    self.network.remove_edge(edge);
    debug!(from = %from, to = %to, "edge_removed");
    Ok(())
  }

  /// Every edge as a (from, to) pair — from depends on to.
  pub fn edges(&self) -> Vec<(Uuid, Uuid)> {
    self
      .network
      .edge_indices()
      .filter_map(|edge| self.network.edge_endpoints(edge))
      .map(|(a, b)| (self.network[a], self.network[b]))
      .collect()
  }

  pub fn edge_count(&self) -> usize {
    self.network.edge_count()
  }

  pub fn has_edge(&self, from: Uuid, to: Uuid) -> bool {
    match (self.indices.get(&from), self.indices.get(&to)) {
      (Some(&a), Some(&b)) => self.network.find_edge(a, b).is_some(),
      _ => false,
    }
  }

  /// The nodes `id` depends on directly.
  pub fn direct_dependencies(&self, id: Uuid) -> Vec<Uuid> {
    match self.indices.get(&id) {
      Some(&index) => self
        .network
        .neighbors_directed(index, Direction::Outgoing)
        .map(|n| self.network[n])
        .collect(),
      None => Vec::new(),
    }
  }

  /// The nodes that depend on `id` directly.
  pub fn direct_dependents(&self, id: Uuid) -> Vec<Uuid> {
    match self.indices.get(&id) {
      Some(&index) => self
        .network
        .neighbors_directed(index, Direction::Incoming)
        .map(|n| self.network[n])
        .collect(),
      None => Vec::new(),
    }
  }

  /// Every node transitively upstream of `id` — the nodes it could use as
  /// input. Excludes `id` itself.
  pub fn upstream_of(&self, id: Uuid) -> Vec<Uuid> {
    let Ok(start) = self.index(id) else {
      return Vec::new();
    };
    let mut dfs = Dfs::new(&self.network, start);
    let mut found = Vec::new();
    while let Some(index) = dfs.next(&self.network) {
      if index != start {
        found.push(self.network[index]);
      }
    }
    found
  }

  /// Every node transitively downstream of `id` — the nodes that might rely
  /// on it for input. Excludes `id` itself.
  pub fn downstream_of(&self, id: Uuid) -> Vec<Uuid> {
    let Ok(start) = self.index(id) else {
      return Vec::new();
    };
    let reversed = Reversed(&self.network);
    let mut dfs = Dfs::new(reversed, start);
    let mut found = Vec::new();
    while let Some(index) = dfs.next(reversed) {
      if index != start {
        found.push(self.network[index]);
      }
    }
    found
  }

  pub(crate) fn network(&self) -> &DiGraph<Uuid, ()> {
    &self.network
  }

  pub(crate) fn index_of(&self, id: Uuid) -> Option<NodeIndex> {
    self.indices.get(&id).copied()
  }

  ///////////////////////////////////////////////////////////////////////////
  // Groups
  ///////////////////////////////////////////////////////////////////////////

  /// Create a named group from the given members.
  ///
  /// Members must be live graph nodes and must not already belong to any
  /// group — groups are disjoint.
  pub fn add_group(
    &mut self,
    name: impl Into<String>,
    members: impl IntoIterator<Item = Uuid>,
  ) -> Result<(), GraphError> {
    let name = name.into();
    if self.groups.contains_key(&name) {
      return Err(GraphError::DuplicateGroupName { name });
    }
    let members: BTreeSet<Uuid> = members.into_iter().collect();
    for &member in &members {
      let node = self.require(member)?;
      if let Some(group) = self.group_of(member) {
        return Err(GraphError::DuplicateGroupMembership {
          node: node.name().to_string(),
          group: group.to_string(),
        });
      }
    }
    self.groups.insert(name, members);
    Ok(())
  }

  pub fn remove_group(&mut self, name: &str) -> Result<(), GraphError> {
    self
      .groups
      .remove(name)
      .map(|_| ())
      .ok_or_else(|| GraphError::UnknownGroup {
        name: name.to_string(),
      })
  }

  /// The group a node belongs to, if any.
  pub fn group_of(&self, id: Uuid) -> Option<&str> {
    self
      .groups
      .iter()
      .find(|(_, members)| members.contains(&id))
      .map(|(name, _)| name.as_str())
  }

  pub fn group_members(&self, name: &str) -> Option<&BTreeSet<Uuid>> {
    self.groups.get(name)
  }

  /// All groups, ordered by name.
  pub fn groups(&self) -> impl Iterator<Item = (&str, &BTreeSet<Uuid>)> {
    self.groups.iter().map(|(name, members)| (name.as_str(), members))
  }

  /// How many groups a node appears in. The add path keeps this at most 1;
  /// validation re-checks it as a graph invariant.
  pub fn group_count(&self, id: Uuid) -> usize {
    self
      .groups
      .values()
      .filter(|members| members.contains(&id))
      .count()
  }

  /// Drop all nodes, edges and groups. Used by snapshot restore.
  pub fn clear(&mut self) {
    self.nodes.clear();
    self.network.clear();
    self.indices.clear();
    self.groups.clear();
  }
}
