//! mjc - stack-machine back end for a small object-oriented language
//!
//! # Overview
//!
//! mjc takes a program tree that earlier passes have already typed and linked
//! (every identifier knows its declaration, every parameter and field its
//! offset) and lowers it, in a single pass, to assembly for a MIPS-like stack
//! machine. The tree is usually read from a textual dump; hosts that build
//! trees themselves can drive [`mjc_core::CodeGenerator`] directly.
//!
//! # Quick Start
//!
//! ```
//! use mjc::{TargetConfig, compile};
//!
//! let compilation = compile(
//!     "program main { var x#1: int = 1 + 2; }",
//!     &TargetConfig::default(),
//! )?;
//! assert!(compilation.assembly.contains("jal vm_init"));
//! assert_eq!(compilation.offset_of("x"), Some(-8));
//! # Ok::<(), mjc::Error>(())
//! ```
//!
//! # Errors
//!
//! Every failure is an [`Error`]. Compilation errors carry diagnostics with
//! source spans and can be rendered with [`render_error`].

mod compile;
mod error;
mod error_renderer;

pub use compile::{Compilation, CompileOptions, LocalOffset, compile, compile_with_options};
pub use error::Error;
pub use error_renderer::{
    render_error, render_error_to, render_error_to_string, render_error_to_string_no_color,
};

// Re-export the commonly used core types
pub use mjc_core::ast::{self, DeclId};
pub use mjc_core::{ConfigError, Diagnostic, Register, Severity, TargetConfig};
