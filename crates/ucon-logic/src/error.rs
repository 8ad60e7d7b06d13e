//! Error types for the rule engine.

use ucon_types::{AttributeRefError, ValueKind};

/// An error raised while resolving a goal.
///
/// Errors abort the whole evaluation and are reported as
/// [`Solution::Halt`](crate::Solution::Halt).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("attribute provider '{0}' is not registered")]
    ProviderNotRegistered(String),

    #[error(transparent)]
    MalformedAttributeRef(#[from] AttributeRefError),

    #[error("attribute '{reference}' is not available")]
    AttributeUnavailable { reference: String },

    #[error("attribute '{reference}' is a {found}, expected a {expected}")]
    ValueTypeMismatch {
        reference: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("monitor '{0}' is not registered")]
    MonitorNotRegistered(String),

    #[error("no enforcement listener is bound to session '{0}'")]
    ListenerNotFound(String),

    #[error("unknown weekday '{0}'")]
    UnknownWeekday(String),

    #[error("invalid time of day '{0}'")]
    InvalidTimeOfDay(String),

    #[error("timestamp {0} is out of range")]
    TimestampOutOfRange(i64),

    #[error("invalid role-permission assignment: {0}")]
    InvalidRolePermissions(String),

    #[error("{predicate}: division by zero")]
    DivisionByZero { predicate: String },

    #[error("{predicate}: argument {index} is not sufficiently instantiated")]
    Instantiation { predicate: String, index: usize },

    #[error("{predicate}: argument {index} must be {expected}, found {found}")]
    TypeError {
        predicate: String,
        index: usize,
        expected: &'static str,
        found: String,
    },

    #[error("goal is not callable: {0}")]
    NotCallable(String),

    #[error("unknown procedure {0}")]
    UnknownProcedure(String),

    #[error("resolution depth limit of {0} exceeded")]
    DepthLimitExceeded(usize),

    #[error("inference limit of {0} exceeded")]
    InferenceLimitExceeded(usize),

    #[error("{0}")]
    Custom(String),
}

impl EvalError {
    /// An error raised by a custom primitive.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// Error returned when clause or goal text cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error at offset {offset}: {message}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// Errors from registering or unregistering predicate libraries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LibraryError {
    #[error("a library with alias '{0}' is already registered")]
    DuplicateAlias(String),

    #[error("no library with alias '{0}' is registered")]
    NotRegistered(String),

    #[error("the default library cannot be unregistered")]
    DefaultLibrary,
}
