//! Cascade Node
//!
//! The unit of computation in a cascade graph. A [`Node`] owns named
//! [`Input`]s, [`Output`]s and [`Attribute`]s; its behavior — port
//! definitions, the input→output association used for type forwarding, and
//! the pre/execute/post command hooks — comes from a [`NodeSpec`]
//! implementation looked up through the [`NodeRegistry`].
//!
//! Node identity is the UUID, not the display name: renames and snapshot
//! round-trips preserve it.

mod builtin;
mod error;
mod node;
mod port;
mod registry;
pub mod source_location;
mod spec;

pub use builtin::{ImageConvertSpec, ListDirSpec, ReadSpec, TextScanSpec, builtin_registry};
pub use error::NodeError;
pub use node::{Node, clean_node_name};
pub use port::{Attribute, Input, Output};
pub use registry::NodeRegistry;
pub use spec::{Command, ExecContext, NodeSpec};
