//! Built-in node types.
//!
//! One `Read<Type>` node is registered per packet type, mirroring how the
//! system auto-creates a reader for every registered data type. The command
//! nodes here are deliberately small; production node sets arrive through
//! the registry like any other plugin.

use std::sync::Arc;

use cascade_packet::PacketType;

use crate::error::NodeError;
use crate::port::{Attribute, Input, Output};
use crate::registry::NodeRegistry;
use crate::spec::{Command, ExecContext, NodeSpec};

/// A source node for data already on disk.
///
/// One reader exists per packet type (`ReadImage`, `ReadPointcloud`, ...).
/// The user fills in the output paths; there is nothing to run.
pub struct ReadSpec {
  packet_type: PacketType,
  type_name: String,
}

impl ReadSpec {
  pub fn new(packet_type: PacketType) -> Self {
    Self {
      packet_type,
      type_name: format!("Read{}", packet_type.name()),
    }
  }
}

impl NodeSpec for ReadSpec {
  fn type_name(&self) -> &str {
    &self.type_name
  }

  fn label(&self) -> String {
    format!("Read {}", self.packet_type.name())
  }

  fn define_outputs(&self) -> Vec<Output> {
    vec![Output::new(self.packet_type.name(), self.packet_type)]
  }

  fn is_parallel(&self) -> bool {
    true
  }

  fn execute(&self, _ctx: &ExecContext<'_>) -> Result<Vec<Command>, NodeError> {
    Ok(Vec::new())
  }
}

/// Lists a directory into a text file.
pub struct ListDirSpec;

impl NodeSpec for ListDirSpec {
  fn type_name(&self) -> &str {
    "ListDir"
  }

  fn define_outputs(&self) -> Vec<Output> {
    vec![Output::new("File", PacketType::TextFile)]
  }

  fn define_attributes(&self) -> Vec<Attribute> {
    vec![
      Attribute::file("listPath", "").with_doc("A path to run the listing on."),
      Attribute::new("long", "True").with_doc("Use the long listing format."),
    ]
  }

  fn execute(&self, ctx: &ExecContext<'_>) -> Result<Vec<Command>, NodeError> {
    let mut argv = vec!["ls".to_string()];
    if ctx.attribute("long")?.to_lowercase() != "false" {
      argv.push("-la".to_string());
    }
    argv.push(ctx.attribute("listPath")?);
    argv.push(">".to_string());
    argv.push(ctx.output_path("File", "filename")?);
    Ok(vec![Command { argv }])
  }
}

/// Runs an awk-style scan over an incoming text file.
pub struct TextScanSpec;

impl NodeSpec for TextScanSpec {
  fn type_name(&self) -> &str {
    "TextScan"
  }

  fn define_inputs(&self) -> Vec<Input> {
    vec![
      Input::new("File", PacketType::TextFile, true)
        .with_doc("A file or files to run the scan on."),
    ]
  }

  fn define_outputs(&self) -> Vec<Output> {
    vec![Output::new("File", PacketType::TextFile)]
  }

  fn define_attributes(&self) -> Vec<Attribute> {
    vec![Attribute::new("command", "").with_doc("The awk program to execute.")]
  }

  fn input_affecting_output(&self, output: &str) -> Option<&str> {
    (output == "File").then_some("File")
  }

  fn output_affected_by_input(&self, input: &str) -> Option<&str> {
    (input == "File").then_some("File")
  }

  fn execute(&self, ctx: &ExecContext<'_>) -> Result<Vec<Command>, NodeError> {
    let input_file = ctx
      .input_packet("File")
      .and_then(|packet| packet.filename("filename"))
      .unwrap_or_default()
      .to_string();
    let argv = vec![
      "awk".to_string(),
      format!("'{}'", ctx.attribute("command")?),
      input_file,
      ">".to_string(),
      ctx.output_path("File", "filename")?,
    ];
    Ok(vec![Command { argv }])
  }
}

/// A per-frame image operation; forwards its input's specialized type.
pub struct ImageConvertSpec;

impl NodeSpec for ImageConvertSpec {
  fn type_name(&self) -> &str {
    "ImageConvert"
  }

  fn define_inputs(&self) -> Vec<Input> {
    vec![Input::new("Image", PacketType::Image, true).with_doc("The image sequence to convert.")]
  }

  fn define_outputs(&self) -> Vec<Output> {
    vec![Output::new("Image", PacketType::Image)]
  }

  fn define_attributes(&self) -> Vec<Attribute> {
    vec![Attribute::new("arguments", "").with_doc("Extra arguments for the converter.")]
  }

  fn input_affecting_output(&self, output: &str) -> Option<&str> {
    (output == "Image").then_some("Image")
  }

  fn output_affected_by_input(&self, input: &str) -> Option<&str> {
    (input == "Image").then_some("Image")
  }

  fn is_parallel(&self) -> bool {
    true
  }

  fn execute(&self, ctx: &ExecContext<'_>) -> Result<Vec<Command>, NodeError> {
    let input_file = ctx
      .input_packet("Image")
      .and_then(|packet| packet.filename("filename"))
      .unwrap_or_default()
      .to_string();
    let mut argv = vec!["convert".to_string(), input_file];
    let extra = ctx.attribute("arguments")?;
    if !extra.is_empty() {
      argv.extend(extra.split_whitespace().map(str::to_string));
    }
    argv.push(ctx.output_path("Image", "filename")?);
    Ok(vec![Command { argv }])
  }
}

/// A registry pre-populated with every built-in node type.
pub fn builtin_registry() -> NodeRegistry {
  let mut registry = NodeRegistry::new();
  for packet_type in PacketType::ALL {
    registry
      .register(Arc::new(ReadSpec::new(packet_type)))
      .expect("built-in reader tags are unique");
  }
  registry
    .register(Arc::new(ListDirSpec))
    .expect("built-in tags are unique");
  registry
    .register(Arc::new(TextScanSpec))
    .expect("built-in tags are unique");
  registry
    .register(Arc::new(ImageConvertSpec))
    .expect("built-in tags are unique");
  registry
}
