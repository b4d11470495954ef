//! Error types for routing.

use std::fmt;

use thiserror::Error;

use crate::schema::SchemaError;

/// A boxed error returned by a handler.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Malformed route pattern. Positions are byte offsets into the pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A `:` with no parameter name after it.
    #[error("missing parameter name at position {position}")]
    MissingName { position: usize },

    /// A parameter or query name containing characters outside `[A-Za-z0-9_]`.
    #[error("invalid name `{name}` at position {position}")]
    InvalidName { name: String, position: usize },

    /// A `(` without its closing `)`.
    #[error("unterminated type annotation at position {position}")]
    UnterminatedType { position: usize },

    /// Nested, stray or empty brackets, or text after a closing `)`.
    #[error("malformed brackets at position {position}")]
    MalformedBrackets { position: usize },

    /// The same name used twice in the path or twice in the query.
    #[error("duplicate {location} parameter `{name}`")]
    DuplicateName { name: String, location: Location },

    /// An empty segment (`//`) or a trailing slash.
    #[error("empty path segment at position {position}")]
    EmptySegment { position: usize },

    /// The path part does not start with `/`.
    #[error("pattern must start with `/`: {0}")]
    MissingLeadingSlash(String),

    /// An empty item in the query part (`?`, `&&`, trailing `&`).
    #[error("empty query item at position {position}")]
    EmptyQueryItem { position: usize },

    /// A router prefix carrying a query part.
    #[error("router prefix must not contain a query part: {0}")]
    QueryInPrefix(String),
}

/// Failure turning a parsed pattern into a matcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The pattern references a type that is not registered.
    #[error("unknown parameter type `{0}`")]
    UnknownType(String),

    /// The assembled path regex does not compile, usually because of a bad
    /// registered fragment.
    #[error("invalid regex for pattern `{pattern}`: {message}")]
    InvalidRegex { pattern: String, message: String },

    /// Override schemas were given but their count does not match the path.
    #[error("expected {expected} parameter schemas, got {found}")]
    ParamCountMismatch { expected: usize, found: usize },
}

/// Where a validated value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Path,
    Query,
    Body,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Body => "body",
        })
    }
}

/// A matched request value that failed its schema.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid {location} parameter `{name}`: {source}")]
pub struct ValidationError {
    pub location: Location,
    pub name: String,
    #[source]
    pub source: SchemaError,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(location: Location, name: impl Into<String>, source: SchemaError) -> Self {
        Self {
            location,
            name: name.into(),
            source,
        }
    }
}

/// Router-specific errors.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Invalid route pattern.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Pattern could not be compiled.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// A request value failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The handler failed.
    #[error("handler error: {0}")]
    Handler(BoxError),
}

impl RouterError {
    /// Wraps an arbitrary handler error.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }

    /// Returns the validation error, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;
