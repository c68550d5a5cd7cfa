//! Cascade Vars
//!
//! Workflow variable substitution. A [`VarTable`] is an explicit context
//! object owned by the session: `$NAME` tokens resolve against the table,
//! `$$NAME` tokens resolve against the process environment. Built-in
//! variables are marked read-only and survive table clears; they are never
//! written to snapshots.

mod error;
mod table;

pub use error::VarError;
pub use table::{VarTable, present};
