//! # ucon
//!
//! A usage-control decision engine. Given a (subject, object, right) request
//! it decides whether usage may begin, keeps re-validating the decision while
//! usage is ongoing, and reacts to revocation or voluntary termination.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                    PolicyDecisionPoint                        │
//! │  ┌──────────────┐   ┌───────────┐   ┌──────────┐   ┌────────┐ │
//! │  │  Sessions    │ → │  Kernel   │   │  Policy  │ → │ Logic  │ │
//! │  │ (coordinator)│   │(pure FSM) │   │  (PMP)   │   │(engine)│ │
//! │  └──────────────┘   └───────────┘   └──────────┘   └────────┘ │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **PEP**: the caller, an [`EnforcementListener`] told about revocations
//! - **PIP**: [`AttributeProvider`]s registered in a [`ComponentRegistry`]
//! - **PMP**: a [`PolicyManagementPoint`] such as [`PolicyStore`]
//!
//! # Concurrency
//!
//! Requests for different keys run fully in parallel. Requests for the same
//! key are serialized in arrival order; a second request while a usage is
//! ongoing is answered with [`DecisionResponse::InUse`].
//!
//! Attribute providers are called while the session lock is held and must
//! not call back into the decision point for the same key.

mod coordinator;
mod error;
mod messages;
mod pdp;
mod session_pip;
mod timer;

pub use coordinator::{LockedSession, ReleaseOutcome, SessionCoordinator, SessionHandle};
pub use error::{AcquireError, PdpError, Result};
pub use messages::{
    DecisionRequest, DecisionResponse, EndRequest, EndResponse, ReevaluationOutcome,
};
pub use pdp::{PdpBuilder, PolicyDecisionPoint};

// Re-export the building blocks callers need alongside the decision point
pub use ucon_config::{CombiningAlgorithm, ConfigLoader, UconConfig};
pub use ucon_kernel::StateKind;
pub use ucon_logic::{ComponentRegistry, EvalError, Library, Solution, Term};
pub use ucon_policy::{
    JsonPolicyLanguage, Policy, PolicyContext, PolicyLanguage, PolicyManagementPoint, PolicyStore,
};
pub use ucon_types::{
    AttributeProvider, EnforcementListener, MonitorClient, ObjectId, ObjectRef, Revocation,
    RevocationReason, RightId, SessionKey, SubjectId, Value,
};
