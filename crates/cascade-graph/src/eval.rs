//! Evaluation ordering and dependency resolution.
//!
//! Everything here is a pure in-memory walk over the edge structure; the
//! only disk access is the fulfilled-input check, which asks each packet
//! whether its data is already present.

use std::collections::HashMap;

use petgraph::visit::DfsPostOrder;
use uuid::Uuid;

use cascade_node::source_location;
use cascade_packet::{DataPacket, PacketType};
use cascade_vars::VarTable;

use crate::error::GraphError;
use crate::graph::Graph;

/// Which packets [`Graph::ordered_input_packets`] keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketFilter {
  All,
  /// Only packets whose data is already on disk.
  OnlyFulfilled,
  /// Only packets whose data still has to be produced.
  OnlyUnfulfilled,
}

impl Graph {
  /// The postorder evaluation order rooted at `root`: every transitive
  /// dependency appears before any node that consumes it, and `root` is
  /// last.
  pub fn evaluation_order(&self, root: Uuid) -> Result<Vec<Uuid>, GraphError> {
    let start = self
      .index_of(root)
      .ok_or(GraphError::UnknownNode {
        node: root.to_string(),
      })?;
    let network = self.network();
    let mut postorder = DfsPostOrder::new(network, start);
    let mut order = Vec::new();
    while let Some(index) = postorder.next(network) {
      order.push(network[index]);
    }
    Ok(order)
  }

  /// Resolve an input's source-location string to the (node, output) pair
  /// feeding it. Returns `None` when the input is unconnected, the named
  /// node is gone, or the named output does not exist on it.
  pub fn input_source(&self, id: Uuid, input_name: &str) -> Option<(Uuid, String)> {
    let node = self.node(id)?;
    let value = node.input(input_name).ok()?.value();
    let (node_name, output_name) = source_location::parse(value)?;
    let source = self.node_by_name(node_name)?;
    source.output(output_name).ok()?;
    Some((source.id(), output_name.to_string()))
  }

  /// The effective packet type coming out of an output.
  ///
  /// If the declared base type has no descendants the answer is fixed.
  /// Otherwise the node's type-forwarding rule names the input whose
  /// upstream connection determines the specialization, and the question
  /// recurses up the (acyclic) graph; an unconnected forwarding input
  /// falls back to the base type.
  pub fn resolved_output_type(
    &self,
    id: Uuid,
    output_name: &str,
  ) -> Result<PacketType, GraphError> {
    let node = self.require(id)?;
    let declared = node.output(output_name)?.packet_type();
    if !declared.has_descendants() {
      return Ok(declared);
    }
    let Some(input_name) = node.spec().input_affecting_output(output_name) else {
      return Ok(declared);
    };
    let Some((source_id, source_output)) = self.input_source(id, input_name) else {
      return Ok(declared);
    };
    self.resolved_output_type(source_id, &source_output)
  }

  /// Resolved packet types for every output of a node.
  pub fn output_specializations(
    &self,
    id: Uuid,
  ) -> Result<HashMap<String, PacketType>, GraphError> {
    let node = self.require(id)?;
    let mut specializations = HashMap::new();
    for output in node.outputs() {
      let resolved = self.resolved_output_type(id, output.name())?;
      specializations.insert(output.name().to_string(), resolved);
    }
    Ok(specializations)
  }

  /// The packet a node's output produces, with its specialized type, paths
  /// and range materialized.
  pub fn output_packet(
    &self,
    id: Uuid,
    output_name: &str,
    vars: &VarTable,
  ) -> Result<DataPacket, GraphError> {
    let node = self.require(id)?;
    node.output(output_name)?;
    let specializations = self.output_specializations(id)?;
    let packet = node
      .packets(&specializations, vars)
      .into_iter()
      .find(|packet| packet.source().output == output_name)
      .expect("outputs and packets correspond one to one");
    Ok(packet)
  }

  /// The packet feeding a node's input, if the input is connected.
  pub fn input_packet(&self, id: Uuid, input_name: &str, vars: &VarTable) -> Option<DataPacket> {
    let (source_id, source_output) = self.input_source(id, input_name)?;
    self.output_packet(source_id, &source_output, vars).ok()
  }

  /// Walk the evaluation order below a node and collect the packets feeding
  /// its inputs, in upstream evaluation order.
  ///
  /// Each entry pairs the consuming input's name with the materialized
  /// packet. Packets produced by nodes that do not feed this node's inputs
  /// are skipped, as is anything filtered out by `filter`.
  pub fn ordered_input_packets(
    &self,
    id: Uuid,
    filter: PacketFilter,
    vars: &VarTable,
  ) -> Result<Vec<(String, DataPacket)>, GraphError> {
    let node = self.require(id)?;

    // Which (source node, source output) feeds which input.
    let mut feeds: Vec<(Uuid, String, String)> = Vec::new();
    for input in node.inputs() {
      if let Some((source_id, source_output)) = self.input_source(id, input.name()) {
        feeds.push((source_id, source_output, input.name().to_string()));
      }
    }

    let mut packets = Vec::new();
    for order_id in self.evaluation_order(id)? {
      if order_id == id {
        continue;
      }
      let order_node = self.require(order_id)?;
      let specializations = self.output_specializations(order_id)?;
      for packet in order_node.packets(&specializations, vars) {
        let Some((_, _, input_name)) = feeds
          .iter()
          .find(|(source_id, source_output, _)| {
            *source_id == order_id && *source_output == packet.source().output
          })
        else {
          continue;
        };
        match filter {
          PacketFilter::OnlyFulfilled if !packet.data_present() => continue,
          PacketFilter::OnlyUnfulfilled if packet.data_present() => continue,
          _ => {}
        }
        packets.push((input_name.clone(), packet));
      }
    }
    Ok(packets)
  }

  /// The minimal ordered list of nodes that must execute before `id` can.
  ///
  /// Starts from the unfulfilled input packets' source nodes and expands
  /// each source's own unfulfilled dependencies, deduplicating by source
  /// node while preserving discovery order; the result is reversed so the
  /// earliest dependency comes first. With `only_unfulfilled` false the
  /// walk covers every connected dependency regardless of disk state.
  ///
  /// Idempotent: repeated calls without graph mutation return the same
  /// list.
  pub fn required_dependencies(
    &self,
    id: Uuid,
    include_self: bool,
    only_unfulfilled: bool,
    vars: &VarTable,
  ) -> Result<Vec<Uuid>, GraphError> {
    let filter = if only_unfulfilled {
      PacketFilter::OnlyUnfulfilled
    } else {
      PacketFilter::All
    };

    let mut required: Vec<DataPacket> = self
      .ordered_input_packets(id, filter, vars)?
      .into_iter()
      .map(|(_, packet)| packet)
      .collect();

    // Expand each collected packet's own dependencies in place; the cursor
    // walk is recursion flattened into a loop.
    let mut cursor = 0;
    while cursor < required.len() {
      let source_id = required[cursor].source().node_id;
      for (_, packet) in self.ordered_input_packets(source_id, filter, vars)? {
        let already = required
          .iter()
          .any(|known| known.source().node_id == packet.source().node_id);
        if !already {
          required.push(packet);
        }
      }
      cursor += 1;
    }

    let mut order: Vec<Uuid> = Vec::new();
    for packet in required.iter().rev() {
      let source_id = packet.source().node_id;
      if !order.contains(&source_id) {
        order.push(source_id);
      }
    }
    if include_self {
      order.push(id);
    }
    Ok(order)
  }

  /// Every node anywhere downstream that actually *uses* this node's
  /// output — not merely reachable — determined by membership in each
  /// candidate's full dependency closure. This is the set to mark dirty
  /// when the node's output changes.
  pub fn dependent_nodes(&self, id: Uuid, vars: &VarTable) -> Result<Vec<Uuid>, GraphError> {
    let mut dependents = Vec::new();
    for candidate in self.downstream_of(id) {
      let closure = self.required_dependencies(candidate, false, false, vars)?;
      if closure.contains(&id) {
        dependents.push(candidate);
      }
    }
    Ok(dependents)
  }

  /// Downstream nodes with an input directly sourced from `id`.
  pub fn direct_dependents_using(&self, id: Uuid) -> Vec<Uuid> {
    let mut dependents = Vec::new();
    for candidate in self.downstream_of(id) {
      let Some(node) = self.node(candidate) else {
        continue;
      };
      let uses = node.inputs().iter().any(|input| {
        self
          .input_source(candidate, input.name())
          .is_some_and(|(source_id, _)| source_id == id)
      });
      if uses {
        dependents.push(candidate);
      }
    }
    dependents
  }

  /// Which (node, input) pairs consume the given output.
  pub fn consumers_of_output(&self, id: Uuid, output_name: &str) -> Vec<(Uuid, String)> {
    let mut consumers = Vec::new();
    for candidate in self.direct_dependents_using(id) {
      let Some(node) = self.node(candidate) else {
        continue;
      };
      for input in node.inputs() {
        if let Some((source_id, source_output)) = self.input_source(candidate, input.name()) {
          if source_id == id && source_output == output_name {
            consumers.push((candidate, input.name().to_string()));
          }
        }
      }
    }
    consumers
  }

  /// Whether every required input of a node is connected and resolvable.
  pub fn required_inputs_connected(&self, id: Uuid, vars: &VarTable) -> Result<bool, GraphError> {
    let node = self.require(id)?;
    let packets = self.ordered_input_packets(id, PacketFilter::All, vars)?;
    for input in node.inputs() {
      if !input.required() {
        continue;
      }
      let fed = packets.iter().any(|(name, _)| name == input.name());
      if !fed {
        return Ok(false);
      }
    }
    Ok(true)
  }
}
