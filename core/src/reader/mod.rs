//! Reader for textual dumps of annotated program trees.
//!
//! The dump spells out everything earlier passes computed: declaration ids,
//! types, parameter and field offsets, and the position of the receiver in
//! each method's frame. See `tree.pest` for the grammar.

mod error;
pub mod reader;

pub use error::ReadError;
pub use reader::{Rule, TreeParser, read_program};
