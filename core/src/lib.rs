//! Code generation core for a small object-oriented language.
//!
//! The pipeline is: [`reader`] (or [`ast::AstBuilder`]) produces an annotated
//! tree, [`compiler::CodeGenerator`] lowers it into [`asm`] lines for the
//! machine described by [`target::TargetConfig`].

pub mod asm;
pub mod ast;
pub mod compiler;
pub mod diagnostics;
pub mod reader;
pub mod target;

pub use compiler::{CodeGenerator, CodegenError, FrameOffsets};
pub use diagnostics::{Diagnostic, Severity};
pub use reader::{ReadError, read_program};
pub use target::{ConfigError, Register, TargetConfig};

/// Test utilities for enabling logging in tests
#[cfg(test)]
pub mod test_utils {
    /// Initialize tracing subscriber for tests with DEBUG level
    /// Call this at the start of tests where you want to see logging output
    ///
    /// # Example
    /// ```ignore
    /// #[test]
    /// fn test_method_frame() {
    ///     test_utils::init_test_logging();
    ///     // ... your test code
    /// }
    /// ```
    pub fn init_test_logging() {
        use tracing_subscriber::{EnvFilter, fmt};

        // Try to initialize, ignore error if already initialized
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}
