use std::collections::BTreeMap;

use cascade_packet::{PacketType, SeqRange};

/// A data-flow input port.
///
/// Declares the accepted base packet type and whether the port must be
/// connected before the node can run. The `value` string is a raw source
/// location (`node_name.output_name`) addressing the upstream output; see
/// [`crate::source_location`].
#[derive(Debug, Clone)]
pub struct Input {
  name: String,
  packet_type: PacketType,
  required: bool,
  value: String,
  seq_range: Option<SeqRange>,
  doc: Option<String>,
}

impl Input {
  pub fn new(name: impl Into<String>, packet_type: PacketType, required: bool) -> Self {
    Self {
      name: name.into(),
      packet_type,
      required,
      value: String::new(),
      seq_range: None,
      doc: None,
    }
  }

  pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
    self.doc = Some(doc.into());
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// The declared base type.
  pub fn packet_type(&self) -> PacketType {
    self.packet_type
  }

  /// The base type plus every descendant — everything this port accepts.
  pub fn accepted_types(&self) -> Vec<PacketType> {
    self.packet_type.accepted_set()
  }

  pub fn accepts(&self, ty: PacketType) -> bool {
    ty.is_subtype_of(self.packet_type)
  }

  pub fn required(&self) -> bool {
    self.required
  }

  pub fn value(&self) -> &str {
    &self.value
  }

  pub fn set_value(&mut self, value: impl Into<String>) {
    self.value = value.into();
  }

  pub fn is_connected(&self) -> bool {
    !self.value.is_empty()
  }

  pub fn seq_range(&self) -> Option<&SeqRange> {
    self.seq_range.as_ref()
  }

  pub fn set_seq_range(&mut self, range: Option<SeqRange>) {
    self.seq_range = range;
  }

  pub fn doc(&self) -> Option<&str> {
    self.doc.as_deref()
  }
}

/// A data-flow output port.
///
/// Holds one path value per filename role. Because the effective packet type
/// can specialize to a descendant of the declared base (type forwarding), the
/// value map covers the roles of the base type and all of its descendants.
/// All roles share exactly one sequence range.
#[derive(Debug, Clone)]
pub struct Output {
  name: String,
  packet_type: PacketType,
  values: BTreeMap<String, String>,
  seq_range: Option<SeqRange>,
  doc: Option<String>,
}

impl Output {
  pub fn new(name: impl Into<String>, packet_type: PacketType) -> Self {
    let mut values = BTreeMap::new();
    for ty in packet_type.accepted_set() {
      for role in ty.roles() {
        values.entry(role.to_string()).or_default();
      }
    }
    Self {
      name: name.into(),
      packet_type,
      values,
      seq_range: None,
      doc: None,
    }
  }

  pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
    self.doc = Some(doc.into());
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// The declared base type; the effective type may specialize to a
  /// descendant depending on what feeds the node.
  pub fn packet_type(&self) -> PacketType {
    self.packet_type
  }

  pub fn roles(&self) -> Vec<&str> {
    self.values.keys().map(|k| k.as_str()).collect()
  }

  pub fn value(&self, role: &str) -> Option<&str> {
    self.values.get(role).map(|s| s.as_str())
  }

  pub fn values(&self) -> &BTreeMap<String, String> {
    &self.values
  }

  /// Set the path for one role. Returns false if the role is unknown to this
  /// output's type family.
  pub fn set_value(&mut self, role: &str, path: impl Into<String>) -> bool {
    match self.values.get_mut(role) {
      Some(slot) => {
        *slot = path.into();
        true
      }
      None => false,
    }
  }

  pub fn seq_range(&self) -> Option<&SeqRange> {
    self.seq_range.as_ref()
  }

  pub fn set_seq_range(&mut self, range: Option<SeqRange>) {
    self.seq_range = range;
  }

  pub fn doc(&self) -> Option<&str> {
    self.doc.as_deref()
  }
}

/// A named string property independent of graph connectivity.
#[derive(Debug, Clone)]
pub struct Attribute {
  name: String,
  value: String,
  seq_range: Option<SeqRange>,
  is_file: bool,
  doc: Option<String>,
}

impl Attribute {
  pub fn new(name: impl Into<String>, default_value: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      value: default_value.into(),
      seq_range: None,
      is_file: false,
      doc: None,
    }
  }

  pub fn file(name: impl Into<String>, default_value: impl Into<String>) -> Self {
    let mut attr = Self::new(name, default_value);
    attr.is_file = true;
    attr
  }

  pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
    self.doc = Some(doc.into());
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn value(&self) -> &str {
    &self.value
  }

  pub fn set_value(&mut self, value: impl Into<String>) {
    self.value = value.into();
  }

  pub fn seq_range(&self) -> Option<&SeqRange> {
    self.seq_range.as_ref()
  }

  pub fn set_seq_range(&mut self, range: Option<SeqRange>) {
    self.seq_range = range;
  }

  pub fn is_file(&self) -> bool {
    self.is_file
  }

  pub fn doc(&self) -> Option<&str> {
    self.doc.as_deref()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_input_acceptance_follows_lattice() {
    let input = Input::new("In", PacketType::Image, true);
    assert!(input.accepts(PacketType::Image));
    assert!(input.accepts(PacketType::Lightprobe));
    assert!(!input.accepts(PacketType::Pointcloud));
  }

  #[test]
  fn test_output_covers_descendant_roles() {
    let output = Output::new("Out", PacketType::Image);
    assert_eq!(output.roles(), vec!["filename", "transform"]);
  }

  #[test]
  fn test_output_rejects_foreign_role() {
    let mut output = Output::new("Out", PacketType::TextFile);
    assert!(!output.set_value("boundingBox", "/tmp/x"));
    assert!(output.set_value("filename", "/tmp/x"));
  }
}
