//! End-to-end engine scenarios: ordering, dependency resolution, type
//! propagation, dirty-propagation and validation over small wired graphs.

use std::sync::Arc;

use uuid::Uuid;

use cascade_graph::{
  CommandRunner, Graph, GraphError, PacketFilter, Phase, RecordingRunner, RunnerError,
  ValidationError, propagate, validate,
};
use cascade_node::{
  Command, ExecContext, Node, NodeError, NodeSpec, builtin_registry, source_location,
};
use cascade_packet::{PacketType, SeqRange};
use cascade_vars::VarTable;

fn make_node(type_name: &str, node_name: &str) -> Node {
  let registry = builtin_registry();
  let mut node = registry.create(type_name).unwrap();
  node.set_name(node_name);
  node
}

/// Wire `to_node.output` into `from_node.input`: set the source-location
/// string and insert the dependency edge.
fn wire(graph: &mut Graph, from: Uuid, input: &str, to: Uuid, output: &str) {
  let to_name = graph.node(to).unwrap().name().to_string();
  let node = graph.node_mut(from).unwrap();
  node
    .set_input_value(input, source_location::format(&to_name, output))
    .unwrap();
  graph.connect(from, to).unwrap();
}

/// A reader feeding a text scan: Filter depends on Scan.
fn reader_and_filter() -> (Graph, Uuid, Uuid) {
  let mut graph = Graph::new();
  let reader = graph.add_node(make_node("ReadTextFile", "Scan")).unwrap();
  let filter = graph.add_node(make_node("TextScan", "Filter")).unwrap();
  graph
    .node_mut(reader)
    .unwrap()
    .set_output_value("TextFile", "filename", "/tmp/cascade-missing/scan.txt")
    .unwrap();
  graph
    .node_mut(filter)
    .unwrap()
    .set_output_value("File", "filename", "/tmp/cascade-missing/filtered.txt")
    .unwrap();
  wire(&mut graph, filter, "File", reader, "TextFile");
  (graph, reader, filter)
}

#[test]
fn test_scenario_a_postorder_evaluation() {
  let (graph, reader, filter) = reader_and_filter();
  assert_eq!(graph.evaluation_order(filter).unwrap(), vec![reader, filter]);
}

#[test]
fn test_scenario_b_reverse_connect_raises_cycle() {
  let (mut graph, reader, filter) = reader_and_filter();
  assert!(matches!(
    graph.connect(reader, filter),
    Err(GraphError::CycleDetected)
  ));
  assert_eq!(graph.edge_count(), 1);
}

#[test]
fn test_evaluation_order_places_dependencies_first() {
  // Diamond: sink depends on left and right, both depend on source.
  let mut graph = Graph::new();
  let source = graph.add_node(make_node("ReadImage", "Plate")).unwrap();
  let left = graph.add_node(make_node("ImageConvert", "Left")).unwrap();
  let right = graph.add_node(make_node("ImageConvert", "Right")).unwrap();
  let sink = graph.add_node(make_node("ImageConvert", "Sink")).unwrap();
  wire(&mut graph, left, "Image", source, "Image");
  wire(&mut graph, right, "Image", source, "Image");
  graph.connect(sink, left).unwrap();
  graph.connect(sink, right).unwrap();
  graph
    .node_mut(sink)
    .unwrap()
    .set_input_value("Image", "Left.Image")
    .unwrap();

  let order = graph.evaluation_order(sink).unwrap();
  assert_eq!(order.last(), Some(&sink));
  let position =
    |id: Uuid| order.iter().position(|&entry| entry == id).unwrap();
  assert!(position(source) < position(left));
  assert!(position(source) < position(right));
  assert!(position(left) < position(sink));
  assert!(position(right) < position(sink));
}

#[test]
fn test_required_dependencies_skip_fulfilled_inputs() {
  let dir = tempfile::tempdir().unwrap();
  let on_disk = dir.path().join("scan.txt");
  std::fs::write(&on_disk, "data").unwrap();

  // Read -> First -> Second; only the read output exists on disk.
  let mut graph = Graph::new();
  let reader = graph.add_node(make_node("ReadTextFile", "Scan")).unwrap();
  let first = graph.add_node(make_node("TextScan", "First")).unwrap();
  let second = graph.add_node(make_node("TextScan", "Second")).unwrap();
  graph
    .node_mut(reader)
    .unwrap()
    .set_output_value("TextFile", "filename", on_disk.to_string_lossy())
    .unwrap();
  graph
    .node_mut(first)
    .unwrap()
    .set_output_value("File", "filename", dir.path().join("a.txt").to_string_lossy())
    .unwrap();
  graph
    .node_mut(second)
    .unwrap()
    .set_output_value("File", "filename", dir.path().join("b.txt").to_string_lossy())
    .unwrap();
  wire(&mut graph, first, "File", reader, "TextFile");
  wire(&mut graph, second, "File", first, "File");

  let vars = VarTable::new();
  // The reader's data is fulfilled, so only First must run before Second.
  let deps = graph
    .required_dependencies(second, true, true, &vars)
    .unwrap();
  assert_eq!(deps, vec![first, second]);

  // Remove the file: the whole chain becomes unfulfilled.
  std::fs::remove_file(&on_disk).unwrap();
  let deps = graph
    .required_dependencies(second, true, true, &vars)
    .unwrap();
  assert_eq!(deps, vec![reader, first, second]);

  // Idempotent without graph mutation in between.
  let again = graph
    .required_dependencies(second, true, true, &vars)
    .unwrap();
  assert_eq!(deps, again);
}

#[test]
fn test_dependent_nodes_require_actual_use() {
  let (mut graph, reader, filter) = reader_and_filter();
  // A bystander connected by edge but consuming nothing.
  let bystander = graph.add_node(make_node("TextScan", "Bystander")).unwrap();
  graph.connect(bystander, reader).unwrap();

  let vars = VarTable::new();
  let dependents = graph.dependent_nodes(reader, &vars).unwrap();
  assert!(dependents.contains(&filter));
  assert!(!dependents.contains(&bystander));
}

#[test]
fn test_type_forwarding_through_convert_chain() {
  let mut graph = Graph::new();
  let probe = graph.add_node(make_node("ReadLightprobe", "Probe")).unwrap();
  let first = graph.add_node(make_node("ImageConvert", "First")).unwrap();
  let second = graph.add_node(make_node("ImageConvert", "Second")).unwrap();
  wire(&mut graph, first, "Image", probe, "Lightprobe");
  wire(&mut graph, second, "Image", first, "Image");

  // The specialization propagates through the chain.
  assert_eq!(
    graph.resolved_output_type(second, "Image").unwrap(),
    PacketType::Lightprobe
  );

  // Unplug the chain: the declared base type is all that remains.
  graph
    .node_mut(first)
    .unwrap()
    .set_input_value("Image", "")
    .unwrap();
  assert_eq!(
    graph.resolved_output_type(second, "Image").unwrap(),
    PacketType::Image
  );
}

#[test]
fn test_scenario_c_lattice_acceptance() {
  let mut graph = Graph::new();
  let probe = graph.add_node(make_node("ReadLightprobe", "Probe")).unwrap();
  let cloud = graph.add_node(make_node("ReadPointcloud", "Cloud")).unwrap();
  let convert = graph.add_node(make_node("ImageConvert", "Convert")).unwrap();
  wire(&mut graph, convert, "Image", probe, "Lightprobe");

  let vars = VarTable::new();
  let order = graph
    .required_dependencies(convert, true, false, &vars)
    .unwrap();
  // A Lightprobe packet satisfies an Image input.
  validate::sanity_check(&graph, &order, &vars).unwrap();

  // Re-point the input at the pointcloud reader: rejected.
  graph.disconnect(convert, probe).unwrap();
  wire(&mut graph, convert, "Image", cloud, "Pointcloud");
  let order = graph
    .required_dependencies(convert, true, false, &vars)
    .unwrap();
  assert!(matches!(
    validate::sanity_check(&graph, &order, &vars),
    Err(ValidationError::TypeMismatch { .. })
  ));
}

#[test]
fn test_scenario_d_disconnect_clears_downstream_inputs() {
  let (mut graph, reader, filter) = reader_and_filter();
  graph
    .node_mut(filter)
    .unwrap()
    .set_input_range("File", Some(SeqRange::new("1", "10")))
    .unwrap();

  let vars = VarTable::new();
  let affected = propagate::disconnected(&mut graph, reader, &vars).unwrap();
  assert!(affected.contains(&filter));

  let input = graph.node(filter).unwrap().input("File").unwrap();
  assert_eq!(input.value(), "");
  assert_eq!(input.seq_range(), None);
}

#[test]
fn test_input_changed_syncs_ranges_downstream() {
  let mut graph = Graph::new();
  let plate = graph.add_node(make_node("ReadImage", "Plate")).unwrap();
  let convert = graph.add_node(make_node("ImageConvert", "Convert")).unwrap();
  graph
    .node_mut(plate)
    .unwrap()
    .set_output_range("Image", Some(SeqRange::new("1", "48")))
    .unwrap();
  wire(&mut graph, convert, "Image", plate, "Image");

  let vars = VarTable::new();
  let affected = propagate::input_changed(&mut graph, convert, "Image", &vars).unwrap();
  assert!(affected.contains(&convert));

  let node = graph.node(convert).unwrap();
  assert_eq!(
    node.input("Image").unwrap().seq_range(),
    Some(&SeqRange::new("1", "48"))
  );
  // The affected output inherited the same range.
  assert_eq!(
    node.output("Image").unwrap().seq_range(),
    Some(&SeqRange::new("1", "48"))
  );
}

#[test]
fn test_output_changed_clears_incompatible_inputs() {
  let mut graph = Graph::new();
  let probe = graph.add_node(make_node("ReadLightprobe", "Probe")).unwrap();
  let cloud = graph.add_node(make_node("ReadPointcloud", "Cloud")).unwrap();
  let first = graph.add_node(make_node("ImageConvert", "First")).unwrap();
  let second = graph.add_node(make_node("ImageConvert", "Second")).unwrap();
  wire(&mut graph, first, "Image", probe, "Lightprobe");
  wire(&mut graph, second, "Image", first, "Image");

  // Re-point First's input at the pointcloud reader, then announce the
  // output change. Second's input type is no longer acceptable.
  graph.disconnect(first, probe).unwrap();
  graph
    .node_mut(first)
    .unwrap()
    .set_input_value("Image", "Cloud.Pointcloud")
    .unwrap();
  graph.connect(first, cloud).unwrap();

  let vars = VarTable::new();
  let affected = propagate::output_changed(&mut graph, first, "Image", &vars).unwrap();
  assert!(affected.contains(&second));
  assert_eq!(graph.node(second).unwrap().input("Image").unwrap().value(), "");
}

#[test]
fn test_scenario_e_group_range_mismatch() {
  let mut graph = Graph::new();
  let a = graph.add_node(make_node("ReadImage", "WedgeA")).unwrap();
  let b = graph.add_node(make_node("ReadImage", "WedgeB")).unwrap();
  graph
    .node_mut(a)
    .unwrap()
    .set_output_range("Image", Some(SeqRange::new("1", "10")))
    .unwrap();
  graph
    .node_mut(b)
    .unwrap()
    .set_output_range("Image", Some(SeqRange::new("1", "20")))
    .unwrap();
  graph.add_group("wedge", [a, b]).unwrap();

  let vars = VarTable::new();
  assert!(matches!(
    validate::sanity_check(&graph, &[a, b], &vars),
    Err(ValidationError::GroupRangeMismatch { .. })
  ));

  // Aligning the ranges fixes the group.
  graph
    .node_mut(b)
    .unwrap()
    .set_output_range("Image", Some(SeqRange::new("1", "10")))
    .unwrap();
  validate::sanity_check(&graph, &[a, b], &vars).unwrap();
}

#[test]
fn test_group_members_must_be_parallel() {
  let mut graph = Graph::new();
  let scan = graph.add_node(make_node("ReadTextFile", "Scan")).unwrap();
  let filter = graph.add_node(make_node("TextScan", "Filter")).unwrap();
  graph.add_group("batch", [scan, filter]).unwrap();

  let vars = VarTable::new();
  // TextScan is not embarrassingly parallel.
  assert!(matches!(
    validate::sanity_check(&graph, &[scan, filter], &vars),
    Err(ValidationError::GroupNotParallel { .. })
  ));
}

#[test]
fn test_validation_catches_unresolved_variables() {
  let (mut graph, _, filter) = reader_and_filter();
  graph
    .node_mut(filter)
    .unwrap()
    .set_attribute_value("command", "{print > \"$OUT_DIR/x\"}")
    .unwrap();

  let vars = VarTable::new();
  let result = validate::sanity_check(&graph, &[filter], &vars);
  assert!(matches!(
    result,
    Err(ValidationError::UnresolvedVariable { ref name, .. }) if name == "OUT_DIR"
  ));

  let mut vars = VarTable::new();
  vars.add("OUT_DIR");
  vars.set("OUT_DIR", "/tmp").unwrap();
  validate::sanity_check(&graph, &[filter], &vars).unwrap();
}

#[test]
fn test_validation_catches_missing_env_variables() {
  let (mut graph, _, filter) = reader_and_filter();
  graph
    .node_mut(filter)
    .unwrap()
    .set_attribute_value("command", "{print > \"$$CASCADE_UNSET_ENV_VAR/x\"}")
    .unwrap();

  let vars = VarTable::new();
  assert!(matches!(
    validate::sanity_check(&graph, &[filter], &vars),
    Err(ValidationError::UnresolvedEnvVariable { .. })
  ));
}

#[test]
fn test_validation_catches_missing_required_input() {
  let mut graph = Graph::new();
  let filter = graph.add_node(make_node("TextScan", "Filter")).unwrap();
  let vars = VarTable::new();
  assert!(matches!(
    validate::sanity_check(&graph, &[filter], &vars),
    Err(ValidationError::MissingRequiredInput { .. })
  ));
}

#[test]
fn test_validation_catches_range_out_of_bounds() {
  let (mut graph, reader, filter) = reader_and_filter();
  graph
    .node_mut(reader)
    .unwrap()
    .set_output_range("TextFile", Some(SeqRange::new("10", "20")))
    .unwrap();
  graph
    .node_mut(filter)
    .unwrap()
    .set_input_range("File", Some(SeqRange::new("5", "20")))
    .unwrap();

  let vars = VarTable::new();
  assert!(matches!(
    validate::sanity_check(&graph, &[filter], &vars),
    Err(ValidationError::RangeOutOfBounds { .. })
  ));
}

#[test]
fn test_validation_catches_parallel_trim() {
  let mut graph = Graph::new();
  let plate = graph.add_node(make_node("ReadImage", "Plate")).unwrap();
  let convert = graph.add_node(make_node("ImageConvert", "Convert")).unwrap();
  graph
    .node_mut(plate)
    .unwrap()
    .set_output_range("Image", Some(SeqRange::new("1", "100")))
    .unwrap();
  wire(&mut graph, convert, "Image", plate, "Image");
  {
    let node = graph.node_mut(convert).unwrap();
    node
      .set_input_range("Image", Some(SeqRange::new("1", "50")))
      .unwrap();
    node
      .set_output_range("Image", Some(SeqRange::new("1", "100")))
      .unwrap();
  }

  let vars = VarTable::new();
  assert!(matches!(
    validate::sanity_check(&graph, &[convert], &vars),
    Err(ValidationError::ParallelRangeMismatch { .. })
  ));
}

#[test]
fn test_validation_catches_frame_symbols_without_range() {
  let mut graph = Graph::new();
  let plate = graph.add_node(make_node("ReadImage", "Plate")).unwrap();
  graph
    .node_mut(plate)
    .unwrap()
    .set_output_value("Image", "filename", "/renders/beauty.####.exr")
    .unwrap();

  let vars = VarTable::new();
  assert!(matches!(
    validate::sanity_check(&graph, &[plate], &vars),
    Err(ValidationError::FrameSymbolsWithoutRange { .. })
  ));
}

/// A node type whose validation hook always fails.
struct BrokenSpec;

impl NodeSpec for BrokenSpec {
  fn type_name(&self) -> &str {
    "Broken"
  }

  fn execute(&self, _ctx: &ExecContext<'_>) -> Result<Vec<Command>, NodeError> {
    Ok(Vec::new())
  }

  fn validate(&self, _ctx: &ExecContext<'_>) -> Result<(), String> {
    Err("deliberately broken".to_string())
  }
}

#[test]
fn test_validation_runs_custom_hook() {
  let mut graph = Graph::new();
  let mut node = Node::from_spec(Arc::new(BrokenSpec));
  node.set_name("Cursed");
  let id = graph.add_node(node).unwrap();

  let vars = VarTable::new();
  assert!(matches!(
    validate::sanity_check(&graph, &[id], &vars),
    Err(ValidationError::CustomValidation { ref message, .. })
      if message == "deliberately broken"
  ));
}

#[test]
fn test_execute_up_to_sequences_commands() {
  let (graph, _, filter) = reader_and_filter();
  let vars = VarTable::new();
  let mut runner = RecordingRunner::default();
  let executed = graph.execute_up_to(filter, &vars, &mut runner).unwrap();
  assert_eq!(executed.len(), 2);

  // The reader contributes no commands; the filter's awk line runs in the
  // execute phase with the reader's output as its input file.
  assert_eq!(runner.commands.len(), 1);
  let (node_name, phase, command) = &runner.commands[0];
  assert_eq!(node_name, "Filter");
  assert_eq!(*phase, Phase::Execute);
  assert!(command.argv.contains(&"/tmp/cascade-missing/scan.txt".to_string()));
}

/// Fails every command for one named node.
struct FailingRunner {
  fail_node: String,
  seen: Vec<String>,
}

impl CommandRunner for FailingRunner {
  fn run(&mut self, node: &Node, _phase: Phase, _command: &Command) -> Result<(), RunnerError> {
    self.seen.push(node.name().to_string());
    if node.name() == self.fail_node {
      return Err(RunnerError::new("exit status 1"));
    }
    Ok(())
  }
}

#[test]
fn test_execution_failure_halts_remaining_nodes() {
  let mut graph = Graph::new();
  let reader = graph.add_node(make_node("ReadTextFile", "Scan")).unwrap();
  let first = graph.add_node(make_node("TextScan", "First")).unwrap();
  let second = graph.add_node(make_node("TextScan", "Second")).unwrap();
  graph
    .node_mut(reader)
    .unwrap()
    .set_output_value("TextFile", "filename", "/tmp/cascade-missing/scan.txt")
    .unwrap();
  graph
    .node_mut(first)
    .unwrap()
    .set_output_value("File", "filename", "/tmp/cascade-missing/a.txt")
    .unwrap();
  graph
    .node_mut(second)
    .unwrap()
    .set_output_value("File", "filename", "/tmp/cascade-missing/b.txt")
    .unwrap();
  wire(&mut graph, first, "File", reader, "TextFile");
  wire(&mut graph, second, "File", first, "File");

  let vars = VarTable::new();
  let mut runner = FailingRunner {
    fail_node: "First".to_string(),
    seen: Vec::new(),
  };
  let result = graph.execute_order(&[reader, first, second], &vars, &mut runner);
  assert!(matches!(result, Err(GraphError::Execution { ref node, .. }) if node == "First"));
  // Second never ran.
  assert!(!runner.seen.contains(&"Second".to_string()));
}

#[test]
fn test_validation_failure_aborts_before_any_execution() {
  let mut graph = Graph::new();
  let filter = graph.add_node(make_node("TextScan", "Filter")).unwrap();
  let vars = VarTable::new();
  let mut runner = RecordingRunner::default();
  let result = graph.execute_order(&[filter], &vars, &mut runner);
  assert!(matches!(result, Err(GraphError::Validation(_))));
  assert!(runner.commands.is_empty());
}

#[test]
fn test_ordered_input_packets_pairs_inputs_with_sources() {
  let (graph, reader, filter) = reader_and_filter();
  let vars = VarTable::new();
  let packets = graph
    .ordered_input_packets(filter, PacketFilter::All, &vars)
    .unwrap();
  assert_eq!(packets.len(), 1);
  let (input_name, packet) = &packets[0];
  assert_eq!(input_name, "File");
  assert_eq!(packet.source().node_id, reader);
  assert_eq!(packet.packet_type(), PacketType::TextFile);
}
