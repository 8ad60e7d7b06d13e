//! Shared fixtures for the decision point integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use ucon::{
    AttributeProvider, DecisionRequest, EnforcementListener, Policy, PolicyContext, PolicyStore,
    Revocation, RightId, Term, Value,
};

/// Records every revocation and answers dependencies with a fixed verdict.
#[derive(Default)]
pub struct RecordingListener {
    pub revocations: Mutex<Vec<Revocation>>,
    pub dependencies: Mutex<Vec<String>>,
    pub refuse_dependencies: AtomicBool,
}

impl RecordingListener {
    pub fn revocation_count(&self) -> usize {
        self.revocations.lock().len()
    }
}

impl EnforcementListener for RecordingListener {
    fn on_revocation(&self, revocation: &Revocation) {
        self.revocations.lock().push(revocation.clone());
    }

    fn do_dependency(&self, dependency: &str) -> bool {
        self.dependencies.lock().push(dependency.to_string());
        !self.refuse_dependencies.load(Ordering::SeqCst)
    }
}

/// An attribute provider backed by a map, recording every update.
#[derive(Default)]
pub struct MapPip {
    pub values: Mutex<HashMap<String, Value>>,
    pub updates: Mutex<Vec<(String, String)>>,
    pub queries: AtomicUsize,
}

impl MapPip {
    pub fn with(self, attribute: &str, value: impl Into<Value>) -> Self {
        self.set(attribute, value);
        self
    }

    pub fn set(&self, attribute: &str, value: impl Into<Value>) {
        self.values.lock().insert(attribute.to_string(), value.into());
    }

    pub fn updates(&self) -> Vec<(String, String)> {
        self.updates.lock().clone()
    }
}

impl AttributeProvider for MapPip {
    fn query(&self, identifier: &str) -> Option<Value> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.values.lock().get(identifier).cloned()
    }

    fn update(&self, identifier: &str, description: &str, _value: Option<Value>) -> bool {
        self.updates
            .lock()
            .push((identifier.to_string(), description.to_string()));
        true
    }
}

pub fn goal(text: &str) -> Term {
    Term::parse(text).unwrap()
}

/// A store holding `policy` for `right` on object `object`.
pub fn store_with(object: &str, right: &str, policy: Policy) -> Arc<PolicyStore> {
    let store = Arc::new(PolicyStore::new());
    store.insert(
        "policy",
        vec![PolicyContext::ObjectId {
            value: object.into(),
        }],
        [RightId::new(right)],
        policy,
    );
    store
}

pub fn request(
    subject: &str,
    object: &str,
    right: &str,
    listener: &Arc<RecordingListener>,
) -> DecisionRequest {
    let listener: Arc<dyn EnforcementListener> = listener.clone();
    DecisionRequest::new(subject, object, right, listener)
}

/// Polls `condition` until it holds or `timeout` elapses.
pub fn eventually(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
