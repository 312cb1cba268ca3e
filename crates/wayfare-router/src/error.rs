//! Error types for routing.

use std::fmt;

use thiserror::Error;

use crate::request::Method;

/// Router construction errors.
///
/// All of these are configuration defects detected while the router is being
/// built. None of them can occur while serving requests.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The route uses a method outside the supported set.
    #[error("unsupported HTTP method '{method}' for route '{name}' ({pattern})")]
    UnsupportedMethod {
        name: String,
        method: String,
        pattern: String,
    },

    /// The route has an empty handler list.
    #[error("no handlers provided for route '{name}' ({method} {pattern})")]
    NoHandlers {
        name: String,
        method: String,
        pattern: String,
    },

    /// The same parameter name appears twice in one pattern.
    #[error(
        "duplicate URI parameter '{key}' in pattern '{pattern}' (positions {first} and {second})"
    )]
    DuplicateParameterKey {
        pattern: String,
        key: String,
        /// 1-based position of the first occurrence among the pattern's parameters.
        first: usize,
        /// 1-based position of the repeated occurrence.
        second: usize,
    },

    /// A `:` with no name after it.
    #[error("empty URI parameter name in pattern '{pattern}' at byte {position}")]
    EmptyParameterName { pattern: String, position: usize },

    /// The generated matcher expression was rejected by the regex engine.
    #[error("invalid URI pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Result type alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;

/// Non-fatal registration findings.
///
/// The router still builds; the first registered route keeps serving every
/// request it matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteWarning {
    /// Two routes share a name.
    DuplicateName { name: String },

    /// An earlier route of the same method already matches this route's pattern.
    DuplicatePattern {
        method: Method,
        pattern: String,
        duplicate: String,
    },
}

impl fmt::Display for RouteWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName { name } => write!(
                f,
                "duplicate route name \"{name}\" detected, route names should be unique"
            ),
            Self::DuplicatePattern {
                method,
                pattern,
                duplicate,
            } => write!(
                f,
                "duplicate URI pattern detected for {method}: '{pattern}' already matches '{duplicate}'"
            ),
        }
    }
}
