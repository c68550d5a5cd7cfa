use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use uuid::Uuid;

use cascade_packet::{DataPacket, PacketSource, PacketType, SeqRange};
use cascade_vars::{VarTable, present};

use crate::error::NodeError;
use crate::port::{Attribute, Input, Output};
use crate::spec::NodeSpec;

static UNSAFE_NAME_CHARS: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"[^A-Za-z0-9.]").unwrap());

/// Reduce a name suggestion to characters safe for a node name.
pub fn clean_node_name(name: &str) -> String {
  UNSAFE_NAME_CHARS.replace_all(name, "_").into_owned()
}

/// A node in the dependency graph.
///
/// Owns its property sets (inputs, outputs, attributes) and a shared handle
/// to the [`NodeSpec`] that defines its type behavior. Equality and identity
/// are based on the UUID alone — the display name is mutable and unique only
/// within a graph.
#[derive(Clone)]
pub struct Node {
  id: Uuid,
  name: String,
  inputs: Vec<Input>,
  outputs: Vec<Output>,
  attributes: Vec<Attribute>,
  spec: Arc<dyn NodeSpec>,
}

impl std::fmt::Debug for Node {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Node")
      .field("id", &self.id)
      .field("name", &self.name)
      .field("type", &self.spec.type_name())
      .finish()
  }
}

impl PartialEq for Node {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for Node {}

impl Node {
  /// Construct a node of the given type with a fresh UUID and the type's
  /// declared ports at their defaults.
  pub fn from_spec(spec: Arc<dyn NodeSpec>) -> Self {
    Self::with_id(spec, Uuid::new_v4())
  }

  /// Construct with a caller-supplied UUID (snapshot restore).
  pub fn with_id(spec: Arc<dyn NodeSpec>, id: Uuid) -> Self {
    Self {
      id,
      name: String::new(),
      inputs: spec.define_inputs(),
      outputs: spec.define_outputs(),
      attributes: spec.define_attributes(),
      spec,
    }
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Set the display name, cleaning unsafe characters. Identity (the UUID)
  /// is unaffected.
  pub fn set_name(&mut self, name: &str) {
    self.name = clean_node_name(name);
  }

  pub fn type_name(&self) -> &str {
    self.spec.type_name()
  }

  pub fn spec(&self) -> &Arc<dyn NodeSpec> {
    &self.spec
  }

  pub fn is_parallel(&self) -> bool {
    self.spec.is_parallel()
  }

  ///////////////////////////////////////////////////////////////////////////
  // Inputs
  ///////////////////////////////////////////////////////////////////////////

  pub fn inputs(&self) -> &[Input] {
    &self.inputs
  }

  pub fn input(&self, name: &str) -> Result<&Input, NodeError> {
    self
      .inputs
      .iter()
      .find(|i| i.name() == name)
      .ok_or_else(|| NodeError::UnknownInput {
        node: self.name.clone(),
        name: name.to_string(),
      })
  }

  pub fn input_mut(&mut self, name: &str) -> Result<&mut Input, NodeError> {
    let node = self.name.clone();
    self
      .inputs
      .iter_mut()
      .find(|i| i.name() == name)
      .ok_or_else(|| NodeError::UnknownInput {
        node,
        name: name.to_string(),
      })
  }

  pub fn set_input_value(&mut self, name: &str, value: impl Into<String>) -> Result<(), NodeError> {
    self.input_mut(name)?.set_value(value);
    Ok(())
  }

  pub fn set_input_range(&mut self, name: &str, range: Option<SeqRange>) -> Result<(), NodeError> {
    self.input_mut(name)?.set_seq_range(range);
    Ok(())
  }

  /// Raw source-location value of an input.
  pub fn input_value(&self, name: &str) -> Result<&str, NodeError> {
    Ok(self.input(name)?.value())
  }

  ///////////////////////////////////////////////////////////////////////////
  // Outputs
  ///////////////////////////////////////////////////////////////////////////

  pub fn outputs(&self) -> &[Output] {
    &self.outputs
  }

  pub fn output(&self, name: &str) -> Result<&Output, NodeError> {
    self
      .outputs
      .iter()
      .find(|o| o.name() == name)
      .ok_or_else(|| NodeError::UnknownOutput {
        node: self.name.clone(),
        name: name.to_string(),
      })
  }

  pub fn output_mut(&mut self, name: &str) -> Result<&mut Output, NodeError> {
    let node = self.name.clone();
    self
      .outputs
      .iter_mut()
      .find(|o| o.name() == name)
      .ok_or_else(|| NodeError::UnknownOutput {
        node,
        name: name.to_string(),
      })
  }

  pub fn set_output_value(
    &mut self,
    name: &str,
    role: &str,
    path: impl Into<String>,
  ) -> Result<(), NodeError> {
    let node = self.name.clone();
    let output = self.output_mut(name)?;
    if !output.set_value(role, path) {
      return Err(NodeError::UnknownRole {
        node,
        output: name.to_string(),
        role: role.to_string(),
      });
    }
    Ok(())
  }

  pub fn set_output_range(&mut self, name: &str, range: Option<SeqRange>) -> Result<(), NodeError> {
    self.output_mut(name)?.set_seq_range(range);
    Ok(())
  }

  /// Substituted path value of one output role.
  pub fn output_value(&self, name: &str, role: &str, vars: &VarTable) -> Result<String, NodeError> {
    let output = self.output(name)?;
    match output.value(role) {
      Some(path) => Ok(vars.substitute(path)),
      None => Err(NodeError::UnknownRole {
        node: self.name.clone(),
        output: name.to_string(),
        role: role.to_string(),
      }),
    }
  }

  ///////////////////////////////////////////////////////////////////////////
  // Attributes
  ///////////////////////////////////////////////////////////////////////////

  pub fn attributes(&self) -> &[Attribute] {
    &self.attributes
  }

  pub fn attribute(&self, name: &str) -> Result<&Attribute, NodeError> {
    self
      .attributes
      .iter()
      .find(|a| a.name() == name)
      .ok_or_else(|| NodeError::UnknownAttribute {
        node: self.name.clone(),
        name: name.to_string(),
      })
  }

  pub fn attribute_mut(&mut self, name: &str) -> Result<&mut Attribute, NodeError> {
    let node = self.name.clone();
    self
      .attributes
      .iter_mut()
      .find(|a| a.name() == name)
      .ok_or_else(|| NodeError::UnknownAttribute {
        node,
        name: name.to_string(),
      })
  }

  pub fn set_attribute_value(
    &mut self,
    name: &str,
    value: impl Into<String>,
  ) -> Result<(), NodeError> {
    self.attribute_mut(name)?.set_value(value);
    Ok(())
  }

  pub fn set_attribute_range(
    &mut self,
    name: &str,
    range: Option<SeqRange>,
  ) -> Result<(), NodeError> {
    self.attribute_mut(name)?.set_seq_range(range);
    Ok(())
  }

  /// Substituted attribute value.
  pub fn attribute_value(&self, name: &str, vars: &VarTable) -> Result<String, NodeError> {
    Ok(vars.substitute(self.attribute(name)?.value()))
  }

  pub fn attribute_value_raw(&self, name: &str) -> Result<&str, NodeError> {
    Ok(self.attribute(name)?.value())
  }

  ///////////////////////////////////////////////////////////////////////////
  // General
  ///////////////////////////////////////////////////////////////////////////

  /// A copy fit to coexist with this node in one graph: fresh UUID, name
  /// extended with the suffix, attribute and output values carried over.
  /// Inputs stay at their declared defaults — connections are never
  /// inherited.
  pub fn duplicate(&self, name_suffix: &str) -> Node {
    let mut dupe = Node::from_spec(self.spec.clone());
    dupe.set_name(&format!("{}{}", self.name, name_suffix));
    for attribute in &self.attributes {
      if let Ok(slot) = dupe.attribute_mut(attribute.name()) {
        slot.set_value(attribute.value());
        slot.set_seq_range(attribute.seq_range().cloned());
      }
    }
    for output in &self.outputs {
      if let Ok(slot) = dupe.output_mut(output.name()) {
        for (role, path) in output.values() {
          slot.set_value(role, path.clone());
        }
        slot.set_seq_range(output.seq_range().cloned());
      }
    }
    dupe
  }

  /// Materialize one data packet per output.
  ///
  /// `specializations` maps output names to resolved packet types when the
  /// caller has run type propagation; outputs not in the map fall back to
  /// their declared base type. Paths and ranges are substituted.
  pub fn packets(
    &self,
    specializations: &HashMap<String, PacketType>,
    vars: &VarTable,
  ) -> Vec<DataPacket> {
    let mut packets = Vec::with_capacity(self.outputs.len());
    for output in &self.outputs {
      let packet_type = specializations
        .get(output.name())
        .copied()
        .unwrap_or_else(|| output.packet_type());
      let mut packet = DataPacket::new(packet_type, PacketSource::new(self.id, output.name()));
      for role in packet_type.roles() {
        if let Some(path) = output.value(role) {
          // Roles the resolved type requires always exist in the value map.
          let _ = packet.set_filename(role, vars.substitute(path));
        }
      }
      packet.set_seq_range(output.seq_range().map(|r| r.substituted(vars)));
      packets.push(packet);
    }
    packets
  }

  /// Every `$` and `$$` token used across this node's property values and
  /// range endpoints, deduplicated.
  pub fn variables_used(&self) -> (Vec<String>, Vec<String>) {
    fn range_texts<'a>(range: Option<&'a SeqRange>, texts: &mut Vec<&'a str>) {
      if let Some(range) = range {
        texts.extend(range.start());
        texts.extend(range.end());
      }
    }

    let mut texts: Vec<&str> = Vec::new();
    for input in &self.inputs {
      texts.push(input.value());
      range_texts(input.seq_range(), &mut texts);
    }
    for attribute in &self.attributes {
      texts.push(attribute.value());
      range_texts(attribute.seq_range(), &mut texts);
    }
    for output in &self.outputs {
      texts.extend(output.values().values().map(|s| s.as_str()));
      range_texts(output.seq_range(), &mut texts);
    }

    let mut singles: Vec<String> = Vec::new();
    let mut doubles: Vec<String> = Vec::new();
    for text in texts {
      let (s, d) = present(text);
      for name in s {
        if !singles.contains(&name) {
          singles.push(name);
        }
      }
      for name in d {
        if !doubles.contains(&name) {
          doubles.push(name);
        }
      }
    }
    (singles, doubles)
  }
}
