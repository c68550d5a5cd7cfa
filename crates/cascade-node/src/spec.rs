use std::fmt;

use cascade_packet::DataPacket;
use cascade_vars::VarTable;

use crate::error::NodeError;
use crate::node::Node;
use crate::port::{Attribute, Input, Output};

/// One opaque command produced by a node hook.
///
/// The engine sequences commands; it never interprets the argv payload —
/// running it is the execution collaborator's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
  pub argv: Vec<String>,
}

impl Command {
  pub fn new(argv: impl IntoIterator<Item = impl Into<String>>) -> Self {
    Self {
      argv: argv.into_iter().map(Into::into).collect(),
    }
  }
}

impl fmt::Display for Command {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.argv.join(" "))
  }
}

/// Everything a node hook can see while producing its commands: the node's
/// own properties, the resolved input packets, and the variable table.
pub struct ExecContext<'a> {
  pub node: &'a Node,
  pub inputs: &'a [(String, DataPacket)],
  pub vars: &'a VarTable,
}

impl<'a> ExecContext<'a> {
  /// The packet feeding the named input, if any.
  pub fn input_packet(&self, input: &str) -> Option<&DataPacket> {
    self
      .inputs
      .iter()
      .find(|(name, _)| name == input)
      .map(|(_, packet)| packet)
  }

  /// A substituted attribute value.
  pub fn attribute(&self, name: &str) -> Result<String, NodeError> {
    self.node.attribute_value(name, self.vars)
  }

  /// A substituted output path for one role.
  pub fn output_path(&self, output: &str, role: &str) -> Result<String, NodeError> {
    self.node.output_value(output, role, self.vars)
  }
}

/// The per-type behavior of a node: port definitions, the static
/// input→output association, and the execution-collaborator hooks.
///
/// Implementations are stateless; all mutable data lives on the [`Node`]
/// itself. One `Arc<dyn NodeSpec>` is shared by every node of a type.
pub trait NodeSpec: Send + Sync {
  /// The stable type tag, used by the registry and by snapshots.
  fn type_name(&self) -> &str;

  /// Human-readable type label, used for default node names.
  fn label(&self) -> String {
    self.type_name().to_string()
  }

  fn define_inputs(&self) -> Vec<Input> {
    Vec::new()
  }

  fn define_outputs(&self) -> Vec<Output> {
    Vec::new()
  }

  fn define_attributes(&self) -> Vec<Attribute> {
    Vec::new()
  }

  /// Which input determines the named output's effective packet type and
  /// range. This is the node's static type-forwarding rule.
  fn input_affecting_output(&self, _output: &str) -> Option<&str> {
    None
  }

  /// Inverse of [`NodeSpec::input_affecting_output`]. Types that declare an
  /// association override both directions with the same static pair.
  fn output_affected_by_input(&self, _input: &str) -> Option<&str> {
    None
  }

  /// Whether this node's work splits per-frame with no cross-frame
  /// dependency.
  fn is_parallel(&self) -> bool {
    false
  }

  /// Commands to run before [`NodeSpec::execute`].
  fn pre_process(&self, _ctx: &ExecContext<'_>) -> Result<Vec<Command>, NodeError> {
    Ok(Vec::new())
  }

  /// The node's work, as a sequence of opaque commands.
  fn execute(&self, ctx: &ExecContext<'_>) -> Result<Vec<Command>, NodeError>;

  /// Commands to run after [`NodeSpec::execute`].
  fn post_process(&self, _ctx: &ExecContext<'_>) -> Result<Vec<Command>, NodeError> {
    Ok(Vec::new())
  }

  /// Custom validation hook, run during the pre-execution sanity check.
  fn validate(&self, _ctx: &ExecContext<'_>) -> Result<(), String> {
    Ok(())
  }
}
