//! Error types for pattern compilation and route tree builds.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by [`compile_pattern`](crate::compile_pattern).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("unbalanced brackets in segment `{segment}`")]
    UnbalancedBrackets { segment: String },

    #[error("invalid parameter token `[{token}]` in segment `{segment}`")]
    InvalidParam { segment: String, token: String },

    #[error("parameter `{name}` is declared more than once")]
    DuplicateParam { name: String },

    #[error("pattern `{pattern}` has {captures} capture groups but {params} parameters")]
    CaptureMismatch {
        pattern: String,
        captures: usize,
        params: usize,
    },

    #[error("generated regex is invalid: {0}")]
    Regex(String),
}

/// A group of route files that resolved to the same pathname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub pathname: String,
    pub files: Vec<PathBuf>,
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let files = self
            .files
            .iter()
            .map(|file| file.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "`{}` is defined by {}", self.pathname, files)
    }
}

/// Fatal errors that abort a route tree build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to read route directory {}: {source}", .path.display())]
    UnreadableRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("duplicate route pathnames: {}", format_collisions(.0))]
    Collisions(Vec<Collision>),

    #[error("invalid rewrite rule #{index}: {reason}")]
    InvalidRewrite { index: usize, reason: String },

    #[error("failed to compile route {}: {source}", .file.display())]
    Pattern {
        file: PathBuf,
        #[source]
        source: PatternError,
    },
}

fn format_collisions(collisions: &[Collision]) -> String {
    collisions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
