//! The execution driver.
//!
//! The engine computes *what* must run and in *what order*; actually
//! invoking a command is the [`CommandRunner`] collaborator's job. Per node
//! the driver sequences the three hook phases and hands every command to
//! the runner; a failing command halts the remaining nodes. Execution never
//! mutates the graph — artifacts produced by completed nodes stay in place,
//! and re-running is assumed overwrite-safe.

use std::fmt;

use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use cascade_node::{Command, ExecContext, Node};
use cascade_vars::VarTable;

use crate::error::GraphError;
use crate::eval::PacketFilter;
use crate::graph::Graph;
use crate::validate::sanity_check;

/// Which hook produced a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Pre,
  Execute,
  Post,
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Phase::Pre => f.write_str("pre"),
      Phase::Execute => f.write_str("execute"),
      Phase::Post => f.write_str("post"),
    }
  }
}

/// A failure reported by the execution collaborator.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RunnerError {
  pub message: String,
}

impl RunnerError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}

/// The execution collaborator: receives each opaque command in order.
///
/// Implementations decide what a command means — spawn a subprocess, submit
/// to a farm, record for inspection. The engine only sequences the calls.
pub trait CommandRunner {
  fn run(&mut self, node: &Node, phase: Phase, command: &Command) -> Result<(), RunnerError>;
}

/// Discards every command. Useful for dry runs and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRunner;

impl CommandRunner for NoopRunner {
  fn run(&mut self, _node: &Node, _phase: Phase, _command: &Command) -> Result<(), RunnerError> {
    Ok(())
  }
}

/// Records every command it is handed, in order.
#[derive(Debug, Default)]
pub struct RecordingRunner {
  pub commands: Vec<(String, Phase, Command)>,
}

impl CommandRunner for RecordingRunner {
  fn run(&mut self, node: &Node, phase: Phase, command: &Command) -> Result<(), RunnerError> {
    self
      .commands
      .push((node.name().to_string(), phase, command.clone()));
    Ok(())
  }
}

impl Graph {
  /// Execute everything required for — and up to — the given node.
  ///
  /// Resolves the unfulfilled dependency ordering, sanity-checks the whole
  /// list before anything runs, then drives each node's hooks through the
  /// runner. Returns the ordered list of executed nodes.
  pub fn execute_up_to(
    &self,
    id: Uuid,
    vars: &VarTable,
    runner: &mut dyn CommandRunner,
  ) -> Result<Vec<Uuid>, GraphError> {
    let order = self.required_dependencies(id, true, true, vars)?;
    self.execute_order(&order, vars, runner)
  }

  /// Execute a caller-supplied node ordering.
  ///
  /// The list should already be dependency-ordered (earliest first), as
  /// produced by [`Graph::required_dependencies`] or
  /// [`Graph::evaluation_order`]. Validation covers the entire list up
  /// front; a runner failure aborts the remaining nodes.
  pub fn execute_order(
    &self,
    order: &[Uuid],
    vars: &VarTable,
    runner: &mut dyn CommandRunner,
  ) -> Result<Vec<Uuid>, GraphError> {
    sanity_check(self, order, vars)?;

    info!(nodes = order.len(), "run_started");
    let mut executed = Vec::with_capacity(order.len());
    for &node_id in order {
      let node = self.require(node_id)?;
      let inputs = self.ordered_input_packets(node_id, PacketFilter::All, vars)?;
      let ctx = ExecContext {
        node,
        inputs: &inputs,
        vars,
      };

      info!(node = %node.name(), "node_started");
      let phases = [
        (Phase::Pre, node.spec().pre_process(&ctx)?),
        (Phase::Execute, node.spec().execute(&ctx)?),
        (Phase::Post, node.spec().post_process(&ctx)?),
      ];
      for (phase, commands) in phases {
        for command in &commands {
          if let Err(source) = runner.run(node, phase, command) {
            error!(
              node = %node.name(),
              phase = %phase,
              error = %source,
              "node_failed"
            );
            return Err(GraphError::Execution {
              node: node.name().to_string(),
              source,
            });
          }
        }
      }
      info!(node = %node.name(), "node_completed");
      executed.push(node_id);
    }
    info!(nodes = executed.len(), "run_completed");
    Ok(executed)
  }
}
