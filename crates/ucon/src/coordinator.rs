//! The registry of live usage sessions and their per-key locks.
//!
//! Each key maps to a slot holding the session body plus a FIFO ticket lock.
//! A caller takes a ticket while the registry is locked, then waits until its
//! ticket is served. Releasing a session that left `Accessing` either resets
//! it for the next waiter or removes it from the registry; the waiter check
//! and the hand-over happen under both locks, so no waiter can slip in
//! between them.
//!
//! Lock order: registry, then slot.

use std::collections::HashMap;
use std::fmt::Debug;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::trace;
use ucon_kernel::{StateKind, UsageSession};
use ucon_types::SessionKey;

use crate::error::AcquireError;

/// What [`SessionCoordinator::release`] did with the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Still accessing; kept registered for ongoing use.
    Retained,
    /// Reset to `Initial` and handed to the next waiter.
    Reset,
    /// Dropped from the registry.
    Removed,
}

struct SessionSlot {
    inner: Mutex<SlotInner>,
    turn: Condvar,
}

struct SlotInner {
    /// `None` while a caller holds the session.
    session: Option<UsageSession>,
    next_ticket: u64,
    serving: u64,
    /// State as of the last release.
    kind: StateKind,
}

impl SessionSlot {
    fn new(key: SessionKey) -> Self {
        Self {
            inner: Mutex::new(SlotInner {
                session: Some(UsageSession::new(key)),
                next_ticket: 0,
                serving: 0,
                kind: StateKind::Initial,
            }),
            turn: Condvar::new(),
        }
    }

    fn take_ticket(&self) -> u64 {
        let mut inner = self.inner.lock();
        let ticket = inner.next_ticket;
        inner.next_ticket += 1;
        ticket
    }

    fn wait_turn(&self, ticket: u64) -> UsageSession {
        let mut inner = self.inner.lock();
        while inner.serving != ticket {
            self.turn.wait(&mut inner);
        }
        let Some(session) = inner.session.take() else {
            unreachable!("session body is returned before the next ticket is served");
        };
        session
    }

    fn serve_next(&self, inner: &mut SlotInner, session: UsageSession) {
        inner.kind = session.kind();
        inner.session = Some(session);
        inner.serving += 1;
        self.turn.notify_all();
    }
}

/// Keeps at most one [`UsageSession`] per key and serializes access to it.
#[derive(Default)]
pub struct SessionCoordinator {
    sessions: Mutex<HashMap<SessionKey, Arc<SessionSlot>>>,
}

impl SessionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the session for `key`, creating it if needed, and checks that
    /// it is `Initial`.
    ///
    /// Blocks until every earlier caller for `key` has released it. A session
    /// found `Accessing` is released untouched and reported as
    /// [`AcquireError::InUse`].
    pub fn acquire_initial(&self, key: &SessionKey) -> Result<LockedSession<'_>, AcquireError> {
        let (slot, ticket) = {
            let mut sessions = self.sessions.lock();
            let slot = sessions.entry(key.clone()).or_insert_with(|| {
                trace!(%key, "created session");
                Arc::new(SessionSlot::new(key.clone()))
            });
            let ticket = slot.take_ticket();
            (Arc::clone(slot), ticket)
        };

        let session = self.lock(slot, ticket);
        match session.kind() {
            StateKind::Initial => Ok(session),
            StateKind::Accessing => {
                self.release(session);
                Err(AcquireError::InUse(key.clone()))
            }
            state => {
                self.release(session);
                Err(AcquireError::Inconsistent {
                    key: key.clone(),
                    state,
                })
            }
        }
    }

    /// Locks the existing session for `key` and checks that it is
    /// `Accessing`.
    pub fn acquire_continuous(&self, key: &SessionKey) -> Result<LockedSession<'_>, AcquireError> {
        let (slot, ticket) = {
            let sessions = self.sessions.lock();
            let slot = sessions
                .get(key)
                .ok_or_else(|| AcquireError::NotFound(key.clone()))?;
            (Arc::clone(slot), slot.take_ticket())
        };

        let session = self.lock(slot, ticket);
        match session.kind() {
            StateKind::Accessing => Ok(session),
            state => {
                self.release(session);
                Err(AcquireError::NotAccessing {
                    key: key.clone(),
                    state,
                })
            }
        }
    }

    /// Unlocks `session`, keeping it if it is still `Accessing`.
    ///
    /// Any other state ends the session: with callers queued it is reset to
    /// `Initial` and handed to the first of them, otherwise it is removed.
    ///
    /// # Panics
    ///
    /// Panics if `session` was acquired from another coordinator.
    pub fn release(&self, mut session: LockedSession<'_>) -> ReleaseOutcome {
        assert!(
            std::ptr::eq(self, session.coordinator),
            "session {} released through a foreign coordinator",
            session.key()
        );
        match session.finish() {
            Some(outcome) => outcome,
            None => unreachable!("a locked session is released once"),
        }
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    pub fn contains(&self, key: &SessionKey) -> bool {
        self.sessions.lock().contains_key(key)
    }

    /// A handle on the registered session for `key`, without locking it.
    pub fn get(&self, key: &SessionKey) -> Option<SessionHandle> {
        self.sessions.lock().get(key).map(|slot| SessionHandle {
            key: key.clone(),
            slot: Arc::clone(slot),
        })
    }

    fn lock(&self, slot: Arc<SessionSlot>, ticket: u64) -> LockedSession<'_> {
        let session = slot.wait_turn(ticket);
        trace!(key = %session.key(), ticket, state = ?session.kind(), "locked session");
        LockedSession {
            coordinator: self,
            slot,
            session: Some(session),
        }
    }
}

impl Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("sessions", &self.len())
            .finish()
    }
}

/// Exclusive access to one session. Dropping it releases the session.
pub struct LockedSession<'a> {
    coordinator: &'a SessionCoordinator,
    slot: Arc<SessionSlot>,
    session: Option<UsageSession>,
}

impl LockedSession<'_> {
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            key: self.key().clone(),
            slot: Arc::clone(&self.slot),
        }
    }

    fn finish(&mut self) -> Option<ReleaseOutcome> {
        let mut session = self.session.take()?;
        let key = session.key().clone();

        if session.kind() == StateKind::Accessing {
            let mut inner = self.slot.inner.lock();
            self.slot.serve_next(&mut inner, session);
            trace!(%key, "released accessing session");
            return Some(ReleaseOutcome::Retained);
        }

        let mut sessions = self.coordinator.sessions.lock();
        let mut inner = self.slot.inner.lock();
        let waiters = inner.next_ticket - inner.serving - 1;
        let outcome = if waiters > 0 {
            assert!(
                sessions.get(&key).is_some_and(|s| Arc::ptr_eq(s, &self.slot)),
                "session {key} has waiters but is not registered"
            );
            session.reset();
            ReleaseOutcome::Reset
        } else {
            if sessions.get(&key).is_some_and(|s| Arc::ptr_eq(s, &self.slot)) {
                sessions.remove(&key);
            }
            ReleaseOutcome::Removed
        };
        self.slot.serve_next(&mut inner, session);
        trace!(%key, waiters, ?outcome, "released session");
        Some(outcome)
    }
}

impl Deref for LockedSession<'_> {
    type Target = UsageSession;

    fn deref(&self) -> &UsageSession {
        match &self.session {
            Some(session) => session,
            None => unreachable!("session accessed after release"),
        }
    }
}

impl DerefMut for LockedSession<'_> {
    fn deref_mut(&mut self) -> &mut UsageSession {
        match &mut self.session {
            Some(session) => session,
            None => unreachable!("session accessed after release"),
        }
    }
}

impl Drop for LockedSession<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

impl Debug for LockedSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockedSession")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Observes a registered session without locking it.
#[derive(Clone)]
pub struct SessionHandle {
    key: SessionKey,
    slot: Arc<SessionSlot>,
}

impl SessionHandle {
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// State as of the last release.
    pub fn state(&self) -> StateKind {
        self.slot.inner.lock().kind
    }

    /// Callers queued behind the current holder, if any.
    pub fn waiters(&self) -> u64 {
        let inner = self.slot.inner.lock();
        inner.next_ticket - inner.serving - u64::from(inner.session.is_none())
    }

    /// Whether both handles refer to the same session object.
    pub fn same_session(&self, other: &SessionHandle) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("key", &self.key)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    use ucon_kernel::Event;

    use super::*;

    fn key(text: &str) -> SessionKey {
        SessionKey::from(text)
    }

    fn wait_for_waiters(handle: &SessionHandle, count: u64) {
        while handle.waiters() < count {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn initial_session_is_created_and_removed() {
        let coordinator = SessionCoordinator::new();
        let k = key("s/o/r");

        let session = coordinator.acquire_initial(&k).unwrap();
        assert_eq!(session.kind(), StateKind::Initial);
        assert!(coordinator.contains(&k));

        assert_eq!(coordinator.release(session), ReleaseOutcome::Removed);
        assert!(coordinator.is_empty());
    }

    #[test]
    fn continuous_acquire_requires_a_registered_session() {
        let coordinator = SessionCoordinator::new();
        assert_eq!(
            coordinator.acquire_continuous(&key("missing")).unwrap_err(),
            AcquireError::NotFound(key("missing"))
        );
    }

    #[test]
    fn dropping_a_locked_session_releases_it() {
        let coordinator = SessionCoordinator::new();
        let k = key("s/o/r");
        {
            let mut session = coordinator.acquire_initial(&k).unwrap();
            session.feed(Event::TryAccess);
            session.feed(Event::DenyAccess);
        }
        assert!(!coordinator.contains(&k));
        assert!(coordinator.acquire_initial(&k).is_ok());
    }

    #[test]
    fn acquirers_are_mutually_exclusive() {
        let coordinator = SessionCoordinator::new();
        let k = key("s/o/r");
        let inside = AtomicUsize::new(0);
        let entered = AtomicUsize::new(0);

        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        let session = coordinator.acquire_initial(&k).unwrap();
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        entered.fetch_add(1, Ordering::SeqCst);
                        thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                        coordinator.release(session);
                    }
                });
            }
        });

        assert_eq!(entered.load(Ordering::SeqCst), 400);
        assert!(coordinator.is_empty());
    }

    #[test]
    fn waiters_are_served_in_arrival_order() {
        let coordinator = SessionCoordinator::new();
        let k = key("s/o/r");
        let order = Mutex::new(Vec::new());

        let first = coordinator.acquire_initial(&k).unwrap();
        let handle = first.handle();

        thread::scope(|scope| {
            for id in 0..4 {
                let (coordinator, k, order) = (&coordinator, &k, &order);
                scope.spawn(move || {
                    let session = coordinator.acquire_initial(k).unwrap();
                    order.lock().push(id);
                    coordinator.release(session);
                });
                wait_for_waiters(&handle, id + 1);
            }
            assert_eq!(coordinator.release(first), ReleaseOutcome::Reset);
        });

        assert_eq!(*order.lock(), [0, 1, 2, 3]);
    }
}
