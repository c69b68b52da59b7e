//! Error types for stagehand
//!
//! Uses `thiserror` for library errors. Every failure mode the engine can
//! produce is a distinct variant so the CLI layer can match on kinds, render
//! one explanatory line, and pick an exit code.

use std::path::PathBuf;
use thiserror::Error;

use crate::stage::TransportError;

/// Result type alias for stagehand operations
pub type StagehandResult<T> = Result<T, StagehandError>;

/// Main error type for stagehand operations
#[derive(Error, Debug)]
pub enum StagehandError {
    /// Bad rule or context input, detected before touching the filesystem
    #[error("invalid artifact mapping: {message}")]
    Configuration { message: String },

    /// Bundle manifest could not be parsed
    #[error("manifest parsing error: {0}")]
    Manifest(#[from] toml::de::Error),

    /// A source pattern matched nothing under the project root
    #[error("no files match source pattern '{pattern}'")]
    NoMatch { pattern: String },

    /// Two distinct sources resolved to the same destination
    #[error("destination '{destination}' is mapped from both '{first}' and '{second}'")]
    DestinationCollision {
        destination: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },

    /// A destination, or what already exists at it, resolves outside the deploy root
    #[error("path '{path}' escapes deploy root '{root}'")]
    ContainmentViolation { path: PathBuf, root: PathBuf },

    /// A file mixes both template expression syntaxes
    #[error("{file} mixes both template expression syntaxes")]
    AmbiguousSyntax { file: PathBuf },

    /// A template expression referenced a name absent from the context
    #[error("undefined variable '{name}' in {file}")]
    UndefinedVariable { name: String, file: PathBuf },

    /// Error from the stage transport, surfaced unchanged
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StagehandError {
    /// Shorthand for configuration failures built from format strings.
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_no_match() {
        let err = StagehandError::NoMatch {
            pattern: "src/*.sql".to_string(),
        };
        assert_eq!(err.to_string(), "no files match source pattern 'src/*.sql'");
    }

    #[test]
    fn display_destination_collision() {
        let err = StagehandError::DestinationCollision {
            destination: PathBuf::from("out.txt"),
            first: PathBuf::from("a/out.txt"),
            second: PathBuf::from("b/out.txt"),
        };
        assert_eq!(
            err.to_string(),
            "destination 'out.txt' is mapped from both 'a/out.txt' and 'b/out.txt'"
        );
    }

    #[test]
    fn display_containment_violation() {
        let err = StagehandError::ContainmentViolation {
            path: PathBuf::from("../outside"),
            root: PathBuf::from("/project/output/deploy"),
        };
        assert_eq!(
            err.to_string(),
            "path '../outside' escapes deploy root '/project/output/deploy'"
        );
    }

    #[test]
    fn display_undefined_variable() {
        let err = StagehandError::UndefinedVariable {
            name: "ctx.env.X".to_string(),
            file: PathBuf::from("a.sql"),
        };
        assert_eq!(err.to_string(), "undefined variable 'ctx.env.X' in a.sql");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: StagehandError = io.into();
        assert!(matches!(err, StagehandError::Io(_)));
    }
}
