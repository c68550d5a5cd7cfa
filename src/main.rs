use std::path::PathBuf;
use std::process::Command as ProcessCommand;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cascade_graph::{CommandRunner, Graph, Phase, RunnerError, validate};
use cascade_node::{Command, Node, NodeRegistry, builtin_registry};
use cascade_snapshot::{Snapshot, restore, restore_vars};
use cascade_vars::VarTable;

/// Cascade - a dependency-graph workflow engine
#[derive(Parser)]
#[command(name = "cascade")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Extra workflow variables as NAME=VALUE (repeatable)
  #[arg(long = "var", global = true, value_name = "NAME=VALUE")]
  vars: Vec<String>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Sanity-check a workflow up to a target node
  Check {
    /// Path to the snapshot file (JSON)
    snapshot_file: PathBuf,

    /// The node name to check up to
    #[arg(long)]
    node: String,
  },

  /// Print the dependency ordering for a target node
  Order {
    /// Path to the snapshot file (JSON)
    snapshot_file: PathBuf,

    /// The node name to resolve
    #[arg(long)]
    node: String,

    /// Include dependencies whose data is already on disk
    #[arg(long)]
    all: bool,
  },

  /// Execute a workflow up to a target node
  Run {
    /// Path to the snapshot file (JSON)
    snapshot_file: PathBuf,

    /// The node name to execute up to
    #[arg(long)]
    node: String,

    /// Resolve and validate only; print commands without running them
    #[arg(long)]
    dry_run: bool,
  },

  /// List the node types available in the registry
  Nodes,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let cli = Cli::parse();
  let registry = builtin_registry();

  let mut vars = VarTable::new();
  vars.set_read_only(
    "CASCADE_DIR",
    std::env::current_dir()
      .map(|dir| dir.display().to_string())
      .unwrap_or_default(),
  );
  for binding in &cli.vars {
    let (name, value) = binding
      .split_once('=')
      .with_context(|| format!("--var '{}' is not NAME=VALUE", binding))?;
    vars.add(name);
    vars
      .set(name, value)
      .with_context(|| format!("cannot set variable '{}'", name))?;
  }

  match cli.command {
    Some(Commands::Check {
      snapshot_file,
      node,
    }) => {
      let (graph, vars) = load_session(&snapshot_file, &registry, vars)?;
      let target = node_named(&graph, &node)?;
      let order = graph.required_dependencies(target, true, false, &vars)?;
      validate::sanity_check(&graph, &order, &vars)?;
      println!("ok: {} node(s) pass the sanity check", order.len());
    }
    Some(Commands::Order {
      snapshot_file,
      node,
      all,
    }) => {
      let (graph, vars) = load_session(&snapshot_file, &registry, vars)?;
      let target = node_named(&graph, &node)?;
      let order = graph.required_dependencies(target, true, !all, &vars)?;
      for id in order {
        let entry = graph.node(id).expect("ordering only lists live nodes");
        println!("{}\t{}", entry.name(), entry.type_name());
      }
    }
    Some(Commands::Run {
      snapshot_file,
      node,
      dry_run,
    }) => {
      let (graph, vars) = load_session(&snapshot_file, &registry, vars)?;
      let target = node_named(&graph, &node)?;
      if dry_run {
        let mut runner = PrintingRunner;
        graph.execute_up_to(target, &vars, &mut runner)?;
      } else {
        let mut runner = ShellRunner;
        graph.execute_up_to(target, &vars, &mut runner)?;
      }
    }
    Some(Commands::Nodes) => {
      for type_name in registry.type_names() {
        println!("{type_name}");
      }
    }
    None => {
      println!("cascade - use --help to see available commands");
    }
  }

  Ok(())
}

/// Load a snapshot file into a fresh graph and apply its variable bindings.
fn load_session(
  path: &PathBuf,
  registry: &NodeRegistry,
  mut vars: VarTable,
) -> Result<(Graph, VarTable)> {
  let text = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read snapshot file: {}", path.display()))?;
  let snapshot = Snapshot::from_json(&text)
    .with_context(|| format!("failed to parse snapshot file: {}", path.display()))?;

  let mut graph = Graph::new();
  restore(&mut graph, &snapshot, registry)
    .with_context(|| format!("failed to restore snapshot: {}", path.display()))?;
  restore_vars(&mut vars, &snapshot);
  Ok((graph, vars))
}

fn node_named(graph: &Graph, name: &str) -> Result<uuid::Uuid> {
  match graph.node_by_name(name) {
    Some(node) => Ok(node.id()),
    None => bail!("no node named '{}' in the snapshot", name),
  }
}

/// Prints each command without running anything.
struct PrintingRunner;

impl CommandRunner for PrintingRunner {
  fn run(&mut self, node: &Node, phase: Phase, command: &Command) -> Result<(), RunnerError> {
    println!("[{}:{}] {}", node.name(), phase, command);
    Ok(())
  }
}

/// Runs each command line through the shell.
///
/// Commands are opaque to the engine; node types are free to emit shell
/// constructs such as redirections, so the whole line goes through `sh -c`.
struct ShellRunner;

impl CommandRunner for ShellRunner {
  fn run(&mut self, node: &Node, phase: Phase, command: &Command) -> Result<(), RunnerError> {
    let line = command.to_string();
    println!("[{}:{}] {}", node.name(), phase, line);
    let status = ProcessCommand::new("sh")
      .arg("-c")
      .arg(&line)
      .status()
      .map_err(|err| RunnerError::new(format!("failed to spawn shell: {err}")))?;
    if !status.success() {
      return Err(RunnerError::new(format!("command exited with {status}")));
    }
    Ok(())
  }
}
