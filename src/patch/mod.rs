//! Line-oriented source patching.
//!
//! A patch inserts a block of lines directly after a start-marker line of a
//! text file. The end marker is only a sanity boundary: it must appear after
//! the start marker, but nothing is anchored to it.
//!
//! The layer is split the same way the rest of the crate is:
//! - `spec`: what to insert and where (PatchSpec, IndentUnit)
//! - `engine`: pure functions over an in-memory line sequence
//! - `file`: read, apply, write back through a temp file

pub mod engine;
pub mod error;
pub mod file;
pub mod snippet;
pub mod spec;

pub use file::{PatchOutcome, apply};
pub use spec::{IndentUnit, PatchSpec};
