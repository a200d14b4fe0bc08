//! Public error type for the mjc API.
//!
//! Internal errors from the reader, the generator and the target
//! configuration are converted to this type at the API boundary.

use std::fmt;
use std::io;

use mjc_core::{ConfigError, Diagnostic, Severity};

/// Public error type for all mjc operations.
#[derive(Debug)]
pub enum Error {
    /// The tree dump could not be read, or the tree could not be lowered.
    ///
    /// Carries the source so that diagnostics can be rendered against it.
    Compilation {
        diagnostics: Vec<Diagnostic>,
        source: String,
    },

    /// The target configuration is inconsistent.
    Config(ConfigError),

    /// Writing the assembly failed.
    Io(io::Error),
}

impl Error {
    pub(crate) fn compilation(source: &str, diagnostic: Diagnostic) -> Self {
        Error::Compilation {
            diagnostics: vec![diagnostic],
            source: source.to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Compilation { diagnostics, .. } => {
                let error_count = diagnostics
                    .iter()
                    .filter(|d| d.severity == Severity::Error)
                    .count();
                write!(f, "Compilation failed with {} error(s)", error_count)
            }
            Error::Config(err) => write!(f, "Invalid target configuration: {}", err),
            Error::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Compilation { .. } => None,
            Error::Config(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
