//! The pre-execution sanity check.
//!
//! Runs over the full ordered dependency set before anything executes.
//! Checks are fail-fast: the first violation aborts the pending run, so a
//! validation failure can never surface mid-run.

use uuid::Uuid;

use cascade_node::ExecContext;
use cascade_packet::framespec;
use cascade_vars::VarTable;

use crate::error::{GraphError, ValidationError};
use crate::eval::PacketFilter;
use crate::graph::Graph;

/// Sanity-check the given nodes (normally a full dependency ordering) plus
/// the graph's group table.
///
/// Order of checks:
/// 1. every `$variable` exists in the table,
/// 2. every `$$ENVVAR` exists in the process environment,
/// 3. required inputs are connected,
/// 4. each connected input accepts its upstream's resolved packet type,
/// 5. each input range lies within its upstream output's range,
/// 6. parallel nodes never trim: input range == affected-output range,
/// 7. outputs with frame symbols declare a sequence range,
/// 8. the per-node validation hook passes,
/// 9. group constraints (members parallel, one shared range, disjoint).
pub fn sanity_check(
  graph: &Graph,
  node_ids: &[Uuid],
  vars: &VarTable,
) -> Result<(), ValidationError> {
  check_variables(graph, node_ids, vars)?;
  check_environment(graph, node_ids)?;
  for &id in node_ids {
    check_node(graph, id, vars)?;
  }
  check_groups(graph, vars)?;
  for &id in node_ids {
    if graph.group_count(id) > 1 {
      return Err(ValidationError::DuplicateGroupMembership {
        node: node_name(graph, id),
      });
    }
  }
  Ok(())
}

fn node_name(graph: &Graph, id: Uuid) -> String {
  graph
    .node(id)
    .map(|node| node.name().to_string())
    .unwrap_or_else(|| id.to_string())
}

fn check_variables(
  graph: &Graph,
  node_ids: &[Uuid],
  vars: &VarTable,
) -> Result<(), ValidationError> {
  for &id in node_ids {
    let Some(node) = graph.node(id) else { continue };
    let (singles, _) = node.variables_used();
    for name in singles {
      if !vars.contains(&name) {
        return Err(ValidationError::UnresolvedVariable {
          node: node.name().to_string(),
          name,
        });
      }
    }
  }
  Ok(())
}

fn check_environment(graph: &Graph, node_ids: &[Uuid]) -> Result<(), ValidationError> {
  for &id in node_ids {
    let Some(node) = graph.node(id) else { continue };
    let (_, doubles) = node.variables_used();
    for name in doubles {
      if std::env::var(&name).is_err() {
        return Err(ValidationError::UnresolvedEnvVariable {
          node: node.name().to_string(),
          name,
        });
      }
    }
  }
  Ok(())
}

fn check_node(graph: &Graph, id: Uuid, vars: &VarTable) -> Result<(), ValidationError> {
  let Some(node) = graph.node(id) else {
    return Ok(());
  };

  // Required inputs must resolve to an upstream output.
  for input in node.inputs() {
    if input.required() && graph.input_source(id, input.name()).is_none() {
      return Err(ValidationError::MissingRequiredInput {
        node: node.name().to_string(),
        input: input.name().to_string(),
      });
    }
  }

  // Connected inputs must accept the resolved upstream type.
  for input in node.inputs() {
    let Some((source_id, source_output)) = graph.input_source(id, input.name()) else {
      continue;
    };
    let Ok(incoming) = graph.resolved_output_type(source_id, &source_output) else {
      continue;
    };
    if !input.accepts(incoming) {
      return Err(ValidationError::TypeMismatch {
        node: node.name().to_string(),
        input: input.name().to_string(),
        found: incoming,
      });
    }
  }

  // Input ranges must lie within the upstream output's range.
  for input in node.inputs() {
    let Some(input_range) = input.seq_range().and_then(|r| r.numeric(vars)) else {
      continue;
    };
    let Some((source_id, source_output)) = graph.input_source(id, input.name()) else {
      continue;
    };
    let upstream = graph
      .node(source_id)
      .and_then(|source| source.output(&source_output).ok());
    let Some(upstream_range) = upstream.and_then(|o| o.seq_range()).and_then(|r| r.numeric(vars))
    else {
      continue;
    };
    if input_range.0 < upstream_range.0 || input_range.1 > upstream_range.1 {
      return Err(ValidationError::RangeOutOfBounds {
        node: node.name().to_string(),
        input: input.name().to_string(),
        upstream: node_name(graph, source_id),
      });
    }
  }

  // Embarrassingly-parallel nodes may not trim: the input range must equal
  // the range of the output it feeds, frame for frame.
  if node.is_parallel() {
    for input in node.inputs() {
      let Some(input_range) = input.seq_range().and_then(|r| r.numeric(vars)) else {
        continue;
      };
      let Some(output_name) = node.spec().output_affected_by_input(input.name()) else {
        continue;
      };
      let output_range = node
        .output(output_name)
        .ok()
        .and_then(|o| o.seq_range())
        .and_then(|r| r.numeric(vars));
      if output_range != Some(input_range) {
        return Err(ValidationError::ParallelRangeMismatch {
          node: node.name().to_string(),
          input: input.name().to_string(),
        });
      }
    }
  }

  // An output path with frame symbols is meaningless without a range.
  for output in node.outputs() {
    let has_symbols = output
      .values()
      .values()
      .any(|path| framespec::has_frame_symbols(path));
    if has_symbols && output.seq_range().is_none() {
      return Err(ValidationError::FrameSymbolsWithoutRange {
        node: node.name().to_string(),
        output: output.name().to_string(),
      });
    }
  }

  // The node's own validation hook.
  let inputs = graph
    .ordered_input_packets(id, PacketFilter::All, vars)
    .unwrap_or_default();
  let ctx = ExecContext {
    node,
    inputs: &inputs,
    vars,
  };
  if let Err(message) = node.spec().validate(&ctx) {
    return Err(ValidationError::CustomValidation {
      node: node.name().to_string(),
      message,
    });
  }

  Ok(())
}

fn check_groups(graph: &Graph, vars: &VarTable) -> Result<(), ValidationError> {
  for (group_name, members) in graph.groups() {
    for &member in members {
      let Some(node) = graph.node(member) else { continue };
      if !node.is_parallel() {
        return Err(ValidationError::GroupNotParallel {
          node: node.name().to_string(),
          group: group_name.to_string(),
        });
      }
    }

    // Every output across the group shares exactly one numeric range.
    let mut ranges: Vec<(String, Option<(i64, i64)>)> = Vec::new();
    for &member in members {
      let Some(node) = graph.node(member) else { continue };
      for output in node.outputs() {
        let range = output.seq_range().and_then(|r| r.numeric(vars));
        ranges.push((node.name().to_string(), range));
      }
    }
    if let Some(reference) = ranges.iter().find_map(|(_, range)| *range) {
      for (member_name, range) in &ranges {
        if *range != Some(reference) {
          return Err(ValidationError::GroupRangeMismatch {
            group: group_name.to_string(),
            node: member_name.clone(),
          });
        }
      }
    }
  }
  Ok(())
}

/// Convenience wrapper: sanity-check everything needed to evaluate up to a
/// node.
pub fn sanity_check_for(graph: &Graph, id: Uuid, vars: &VarTable) -> Result<(), GraphError> {
  let order = graph.required_dependencies(id, true, false, vars)?;
  sanity_check(graph, &order, vars)?;
  Ok(())
}
