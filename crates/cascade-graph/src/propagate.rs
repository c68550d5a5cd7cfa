//! Dirty-propagation.
//!
//! Two events drive propagation: a node being disconnected, and a property
//! edit on an input or output. Every entry point returns the set of
//! affected nodes, in discovery order, so the embedder can refresh whatever
//! cached display or validation state it keeps. The graph's edge structure
//! is never modified here — only node property values and ranges.
//!
//! Propagation always moves downstream through direct structural
//! dependents, so the cascades terminate on an acyclic graph.

use tracing::debug;
use uuid::Uuid;

use cascade_vars::VarTable;

use crate::error::GraphError;
use crate::graph::Graph;

/// Handle a node about to be disconnected (or deleted).
///
/// Every downstream node with an input sourced from `id` — or from anything
/// in `id`'s own upstream set — has that input's value and range cleared,
/// with [`input_changed`] cascading from each cleared input. Call this
/// *before* removing edges or the node itself, while the structure still
/// resolves.
pub fn disconnected(graph: &mut Graph, id: Uuid, vars: &VarTable) -> Result<Vec<Uuid>, GraphError> {
  let mut affected = vec![id];

  let after = graph.downstream_of(id);
  let mut before = graph.upstream_of(id);
  before.push(id);

  for after_id in after {
    let input_names: Vec<String> = match graph.node(after_id) {
      Some(node) => node.inputs().iter().map(|i| i.name().to_string()).collect(),
      None => continue,
    };
    for input_name in input_names {
      let Some((source_id, _)) = graph.input_source(after_id, &input_name) else {
        continue;
      };
      if !before.contains(&source_id) {
        continue;
      }
      debug!(node = %after_id, input = %input_name, "input_cleared");
      let node = graph.node_mut(after_id).expect("downstream node is live");
      node.set_input_value(&input_name, "")?;
      node.set_input_range(&input_name, None)?;
      affected.push(after_id);
      affected.extend(input_changed(graph, after_id, &input_name, vars)?);
    }
  }
  Ok(affected)
}

/// Handle a changed input.
///
/// The input's sequence range is re-synced from the upstream packet's range.
/// If the node associates this input with one of its outputs, the range is
/// pushed onto that output (every role of an output shares one range) and
/// [`output_changed`] runs for it.
pub fn input_changed(
  graph: &mut Graph,
  id: Uuid,
  input_name: &str,
  vars: &VarTable,
) -> Result<Vec<Uuid>, GraphError> {
  let mut affected = Vec::new();

  let affected_output = graph
    .require(id)?
    .spec()
    .output_affected_by_input(input_name)
    .map(str::to_string);

  if let Some(packet) = graph.input_packet(id, input_name, vars) {
    if let Some(range) = packet.seq_range().cloned() {
      let node = graph.node_mut(id).expect("node is live");
      node.set_input_range(input_name, Some(range.clone()))?;
      if let Some(output_name) = &affected_output {
        node.set_output_range(output_name, Some(range))?;
      }
      affected.push(id);
    }
  }

  if let Some(output_name) = affected_output {
    affected.extend(output_changed(graph, id, &output_name, vars)?);
  }
  Ok(affected)
}

/// Handle a changed output (type or range).
///
/// Direct structural dependents only: each of their inputs is re-synced
/// (cascading [`input_changed`]), inputs whose resolved upstream type is no
/// longer acceptable are cleared, and each directly-fed input's range is
/// clamped to its upstream output's range. The changed node and its direct
/// dependents are always reported affected — data that used to exist may
/// not exist any more.
pub fn output_changed(
  graph: &mut Graph,
  id: Uuid,
  output_name: &str,
  vars: &VarTable,
) -> Result<Vec<Uuid>, GraphError> {
  let _ = graph.require(id)?.output(output_name)?;
  let mut affected = Vec::new();

  let dependents = graph.direct_dependents_using(id);
  for &dependent in &dependents {
    let input_names: Vec<String> = match graph.node(dependent) {
      Some(node) => node.inputs().iter().map(|i| i.name().to_string()).collect(),
      None => continue,
    };
    for input_name in input_names {
      let incoming_type = match graph.input_source(dependent, &input_name) {
        Some((source_id, source_output)) => {
          Some(graph.resolved_output_type(source_id, &source_output)?)
        }
        None => None,
      };

      affected.extend(input_changed(graph, dependent, &input_name, vars)?);

      if let Some(incoming) = incoming_type {
        let node = graph.node_mut(dependent).expect("dependent is live");
        let accepts = node.input(&input_name)?.accepts(incoming);
        if !accepts {
          debug!(
            node = %dependent,
            input = %input_name,
            incoming = %incoming,
            "incompatible_input_cleared"
          );
          node.set_input_value(&input_name, "")?;
          node.set_input_range(&input_name, None)?;
          affected.push(dependent);
        }
      }
    }
  }

  // Clamp directly-fed input ranges to the upstream output's range.
  for &dependent in &dependents {
    let input_names: Vec<String> = match graph.node(dependent) {
      Some(node) => node.inputs().iter().map(|i| i.name().to_string()).collect(),
      None => continue,
    };
    for input_name in input_names {
      let Some((source_id, source_output)) = graph.input_source(dependent, &input_name) else {
        continue;
      };
      let upstream_range = graph
        .require(source_id)?
        .output(&source_output)?
        .seq_range()
        .cloned();
      let node = graph.node_mut(dependent).expect("dependent is live");
      if node.input(&input_name)?.seq_range() != upstream_range.as_ref() {
        node.set_input_range(&input_name, upstream_range)?;
        affected.push(dependent);
      }
    }
  }

  affected.push(id);
  affected.extend(dependents);
  Ok(affected)
}
