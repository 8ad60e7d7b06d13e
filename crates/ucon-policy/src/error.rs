//! Error types for policy compilation.

/// Errors raised while reading or translating a policy document.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("policy document is not valid: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("policy declares {0} ongoing triggers; at most one is supported")]
    MultipleTriggers(usize),

    #[error("invalid local date-time '{0}': expected yyyy-MM-ddTHH:mm[:ss]")]
    InvalidDateTime(String),

    #[error("unsupported time zone '{0}': use UTC or a fixed offset such as +02:00")]
    UnsupportedTimeZone(String),

    #[error("invalid time of day '{0}': expected HH:mm[:ss]")]
    InvalidTimeOfDay(String),

    #[error("unknown weekday '{0}'")]
    UnknownWeekday(String),

    #[error("duration of {0} seconds is out of range")]
    DurationOutOfRange(i64),
}

pub type Result<T> = std::result::Result<T, CompileError>;
