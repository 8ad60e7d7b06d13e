//! Error types for the decision point.

use ucon_kernel::StateKind;
use ucon_logic::LibraryError;
use ucon_types::{ObjectId, RightId, SessionKey};

/// Why a session could not be acquired.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcquireError {
    /// Another usage under the same key is ongoing.
    #[error("session {0} is in use")]
    InUse(SessionKey),

    #[error("session {key} is {state} where initial was expected")]
    Inconsistent { key: SessionKey, state: StateKind },

    #[error("no session {0}")]
    NotFound(SessionKey),

    #[error("session {key} is {state} where accessing was expected")]
    NotAccessing { key: SessionKey, state: StateKind },
}

#[derive(Debug, thiserror::Error)]
pub enum PdpError {
    #[error("no policy applies to right {right} on object {object}")]
    PolicyMissing { object: ObjectId, right: RightId },

    #[error(transparent)]
    Session(#[from] AcquireError),

    #[error("failed to schedule re-evaluation of {key}: {source}")]
    Schedule {
        key: SessionKey,
        source: std::io::Error,
    },

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error("decision point has no policy management point")]
    MissingPolicySource,
}

pub type Result<T> = std::result::Result<T, PdpError>;
