//! Code generator for annotated programs.
//!
//! This module lowers a typed, linked tree into assembly for a stack machine
//! with a fixed register convention (see [`crate::target`]).
//!
//! ## Design
//!
//! - Single pass, exhaustive `match` per node kind
//! - Tracks the stack height statically; locals and parameters are addressed
//!   relative to the stack pointer
//! - Local frame offsets are produced into [`FrameOffsets`] rather than
//!   written back onto the tree
//! - Output goes to any [`InstructionSink`](crate::asm::InstructionSink)

mod codegen;
mod error;
mod frame;


pub use codegen::CodeGenerator;
pub use error::CodegenError;
pub use frame::FrameOffsets;
