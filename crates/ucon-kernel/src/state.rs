//! Session states, events and the payload bound while access is ongoing.

use std::fmt::{Debug, Display};
use std::sync::Arc;

use ucon_policy::Policy;
use ucon_types::EnforcementListener;

/// Handle to a scheduled periodic re-evaluation.
pub trait Schedule: Send + Sync {
    /// Stops the schedule. No re-evaluation starts after this returns.
    fn cancel(&self);

    fn is_cancelled(&self) -> bool;
}

/// What an `Accessing` session is bound to.
///
/// Immutable once bound. Dropping the grant cancels its schedule, so every
/// way out of `Accessing` stops periodic re-evaluation.
pub struct AccessGrant {
    policy: Arc<Policy>,
    listener: Arc<dyn EnforcementListener>,
    schedule: Option<Box<dyn Schedule>>,
}

impl AccessGrant {
    pub fn new(
        policy: Arc<Policy>,
        listener: Arc<dyn EnforcementListener>,
        schedule: Option<Box<dyn Schedule>>,
    ) -> Self {
        Self {
            policy,
            listener,
            schedule,
        }
    }

    /// The instantiated policy access was granted under.
    pub fn policy(&self) -> &Arc<Policy> {
        &self.policy
    }

    pub fn listener(&self) -> &Arc<dyn EnforcementListener> {
        &self.listener
    }

    pub fn schedule(&self) -> Option<&dyn Schedule> {
        self.schedule.as_deref()
    }
}

impl Drop for AccessGrant {
    fn drop(&mut self) {
        if let Some(schedule) = &self.schedule {
            schedule.cancel();
        }
    }
}

impl Debug for AccessGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGrant")
            .field("policy", &self.policy)
            .field("scheduled", &self.schedule.is_some())
            .finish_non_exhaustive()
    }
}

/// State of a usage session.
#[derive(Debug, Default)]
pub enum State {
    #[default]
    Initial,
    Requesting,
    Denied,
    Accessing(AccessGrant),
    Revoked,
    End,
    /// Reached by any event the current state does not accept. Terminal.
    Error,
}

impl State {
    pub fn kind(&self) -> StateKind {
        match self {
            State::Initial => StateKind::Initial,
            State::Requesting => StateKind::Requesting,
            State::Denied => StateKind::Denied,
            State::Accessing(_) => StateKind::Accessing,
            State::Revoked => StateKind::Revoked,
            State::End => StateKind::End,
            State::Error => StateKind::Error,
        }
    }
}

/// [`State`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Initial,
    Requesting,
    Denied,
    Accessing,
    Revoked,
    End,
    Error,
}

impl StateKind {
    /// Denied, revoked, ended and error sessions take no further events.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StateKind::Denied | StateKind::Revoked | StateKind::End | StateKind::Error
        )
    }
}

impl Display for StateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StateKind::Initial => "initial",
            StateKind::Requesting => "requesting",
            StateKind::Denied => "denied",
            StateKind::Accessing => "accessing",
            StateKind::Revoked => "revoked",
            StateKind::End => "end",
            StateKind::Error => "error",
        })
    }
}

/// Inputs of the session state machine.
#[derive(Debug)]
pub enum Event {
    TryAccess,
    DenyAccess,
    PermitAccess(AccessGrant),
    RevokeAccess,
    EndAccess,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::TryAccess => "try_access",
            Event::DenyAccess => "deny_access",
            Event::PermitAccess(_) => "permit_access",
            Event::RevokeAccess => "revoke_access",
            Event::EndAccess => "end_access",
        }
    }
}
