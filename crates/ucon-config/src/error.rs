//! Configuration error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A setting is out of its accepted range.
    #[error("{field} {reason}")]
    Invalid { field: &'static str, reason: &'static str },

    /// The platform reports no home directory to hold user settings.
    #[error("no user configuration directory on this platform")]
    NoUserDirectory,
}
