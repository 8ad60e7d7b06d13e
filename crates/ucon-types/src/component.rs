//! Interfaces of the external collaborators the engine talks to.
//!
//! Implementations live outside this workspace (databases, sensors,
//! notification transports, enforcement points). Every trait is object safe
//! and `Send + Sync` so implementations can be shared between decision
//! threads and re-evaluation timers.

use std::fmt::Display;
use std::sync::Arc;

use crate::{SessionKey, Value};

/// A Policy Information Point.
///
/// Providers are called while the caller holds a session lock. They must not
/// re-enter the decision engine for the same session key, or the call
/// deadlocks.
pub trait AttributeProvider: Send + Sync {
    /// Returns the current value of `attribute`, if the provider knows it.
    fn query(&self, attribute: &str) -> Option<Value>;

    /// Applies a provider-defined mutation.
    ///
    /// `description` is the verb (`"increment"`, `"decrement"`, `"append"`,
    /// `"remove"`, or anything the provider understands).
    fn update(&self, attribute: &str, description: &str, value: Option<Value>) -> bool;

    /// Returns the enforcement listener this provider fronts, if any.
    fn enforcement_listener(&self) -> Option<Arc<dyn EnforcementListener>> {
        None
    }
}

/// A Policy Enforcement Point callback.
pub trait EnforcementListener: Send + Sync {
    /// Called exactly once when an ongoing usage is revoked.
    fn on_revocation(&self, revocation: &Revocation);

    /// Asks the enforcement point to carry out a dependent obligation.
    fn do_dependency(&self, dependency: &str) -> bool;
}

/// A notification sink.
pub trait MonitorClient: Send + Sync {
    fn notify(&self, message: &str) -> bool;
}

/// Message handed to [`EnforcementListener::on_revocation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revocation {
    pub key: SessionKey,
    pub reason: RevocationReason,
}

/// Why an ongoing usage was revoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevocationReason {
    /// The ongoing goal evaluated to no.
    OngoingDenied,
    /// The ongoing goal raised an evaluation error.
    OngoingHalted { error: String },
}

impl Display for RevocationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RevocationReason::OngoingDenied => f.write_str("ongoing conditions no longer hold"),
            RevocationReason::OngoingHalted { error } => {
                write!(f, "ongoing evaluation halted: {error}")
            }
        }
    }
}
