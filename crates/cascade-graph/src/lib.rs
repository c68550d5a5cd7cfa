//! Cascade Graph
//!
//! The dependency graph engine. A [`Graph`] owns nodes and directed edges,
//! keeps the structure acyclic, and provides the algorithms the rest of the
//! system is built on:
//!
//! - evaluation ordering (postorder over the dependency structure),
//! - on-demand dependency resolution that skips already-fulfilled inputs,
//! - type propagation through chains of forwarding nodes,
//! - dirty-propagation when connections or values change,
//! - node grouping for embarrassingly-parallel members,
//! - the pre-run sanity check,
//! - the execution driver that sequences node hooks through a
//!   [`CommandRunner`].
//!
//! # Edge orientation
//!
//! An edge stored from X to Y means **X depends on Y**: Y's output feeds
//! X's input. Walking *along* edge direction therefore moves upstream
//! (toward producers); walking against it moves downstream (toward
//! consumers). Every traversal in this crate is written against that
//! convention — see [`Graph::upstream_of`] and [`Graph::downstream_of`].
//!
//! The graph is single-owner and single-threaded by design: mutation happens
//! under exclusive access from one logical caller, and nothing here blocks
//! or performs I/O (the only exception being fulfilled-input checks, which
//! stat files through the packet layer).

mod error;
mod eval;
mod execute;
mod graph;
pub mod propagate;
pub mod validate;

pub use error::{GraphError, ValidationError};
pub use eval::PacketFilter;
pub use execute::{CommandRunner, NoopRunner, Phase, RecordingRunner, RunnerError};
pub use graph::Graph;
