//! Requests to and responses from the decision point.

use std::fmt::Debug;
use std::sync::Arc;

use ucon_logic::{EvalError, Solution};
use ucon_types::{
    EnforcementListener, ObjectId, ObjectRef, RevocationReason, RightId, SessionKey, SubjectId,
};

/// Asks whether `subject` may start using `right` on `object`.
#[derive(Clone)]
pub struct DecisionRequest {
    pub subject: SubjectId,
    pub object: ObjectRef,
    pub right: RightId,
    /// Told about revocations and asked to honour dependencies.
    pub listener: Arc<dyn EnforcementListener>,
}

impl DecisionRequest {
    pub fn new(
        subject: impl Into<SubjectId>,
        object: impl Into<ObjectRef>,
        right: impl Into<RightId>,
        listener: Arc<dyn EnforcementListener>,
    ) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
            right: right.into(),
            listener,
        }
    }

    pub fn session_key(&self) -> SessionKey {
        SessionKey::derive(&self.subject, &self.object.id, &self.right)
    }
}

impl Debug for DecisionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionRequest")
            .field("subject", &self.subject)
            .field("object", &self.object)
            .field("right", &self.right)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecisionResponse {
    Permitted { key: SessionKey },
    /// No candidate policy permitted. `halts` lists the evaluation errors
    /// of candidates that were aborted rather than refused.
    Denied {
        key: SessionKey,
        halts: Vec<EvalError>,
    },
    /// A usage under the same key is already ongoing.
    InUse { key: SessionKey },
}

impl DecisionResponse {
    pub fn key(&self) -> &SessionKey {
        match self {
            DecisionResponse::Permitted { key }
            | DecisionResponse::Denied { key, .. }
            | DecisionResponse::InUse { key } => key,
        }
    }

    pub fn is_permitted(&self) -> bool {
        matches!(self, DecisionResponse::Permitted { .. })
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, DecisionResponse::Denied { .. })
    }

    pub fn is_in_use(&self) -> bool {
        matches!(self, DecisionResponse::InUse { .. })
    }
}

/// Ends an ongoing usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndRequest {
    pub subject: SubjectId,
    pub object: ObjectId,
    pub right: RightId,
}

impl EndRequest {
    pub fn new(
        subject: impl Into<SubjectId>,
        object: impl Into<ObjectId>,
        right: impl Into<RightId>,
    ) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
            right: right.into(),
        }
    }

    pub fn session_key(&self) -> SessionKey {
        SessionKey::derive(&self.subject, &self.object, &self.right)
    }
}

impl From<&DecisionRequest> for EndRequest {
    fn from(request: &DecisionRequest) -> Self {
        Self {
            subject: request.subject.clone(),
            object: request.object.id.clone(),
            right: request.right.clone(),
        }
    }
}

/// Outcome of the post-access-ended goal.
#[derive(Debug, Clone, PartialEq)]
pub struct EndResponse {
    pub key: SessionKey,
    pub solution: Solution,
}

/// What a periodic re-evaluation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReevaluationOutcome {
    /// The ongoing goal still holds.
    Continued,
    /// Access was revoked and the listener notified.
    Revoked(RevocationReason),
    /// The schedule had been cancelled before the session was locked.
    Skipped,
}
