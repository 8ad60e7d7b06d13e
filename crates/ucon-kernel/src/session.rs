//! The usage session and its transition function.

use ucon_types::SessionKey;

use crate::state::{AccessGrant, Event, State, StateKind};

/// Applies `event` to `state`.
///
/// Pairs outside the transition table lead to [`State::Error`]. A state or
/// event payload that does not survive the transition is dropped, which
/// cancels its schedule.
pub fn transition(state: State, event: Event) -> State {
    match (state, event) {
        (State::Initial, Event::TryAccess) => State::Requesting,
        (State::Requesting, Event::DenyAccess) => State::Denied,
        (State::Requesting, Event::PermitAccess(grant)) => State::Accessing(grant),
        (State::Accessing(_), Event::RevokeAccess) => State::Revoked,
        (State::Accessing(_), Event::EndAccess) => State::End,
        (_, _) => State::Error,
    }
}

/// One subject's usage of one right on one object.
///
/// Not synchronized: callers hold the session's lock while feeding events.
#[derive(Debug)]
pub struct UsageSession {
    key: SessionKey,
    state: State,
}

impl UsageSession {
    pub fn new(key: SessionKey) -> Self {
        Self {
            key,
            state: State::Initial,
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn kind(&self) -> StateKind {
        self.state.kind()
    }

    /// The bound payload while `Accessing`.
    pub fn grant(&self) -> Option<&AccessGrant> {
        match &self.state {
            State::Accessing(grant) => Some(grant),
            _ => None,
        }
    }

    /// Feeds `event` and returns the resulting state.
    pub fn feed(&mut self, event: Event) -> StateKind {
        let state = std::mem::take(&mut self.state);
        self.state = transition(state, event);
        self.kind()
    }

    /// Forces the session back to `Initial`, discarding any bound grant.
    pub fn reset(&mut self) {
        self.state = State::Initial;
    }
}
