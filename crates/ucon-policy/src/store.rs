//! Policy management: where the decision point pulls candidate policies from.

use parking_lot::RwLock;
use tracing::info;
use ucon_types::{ObjectRef, RightId};

use crate::document::PolicyContext;
use crate::error::Result;
use crate::language::{JsonPolicyLanguage, PolicyLanguage};
use crate::policy::Policy;

/// Source of the generic policies applicable to a request.
pub trait PolicyManagementPoint: Send + Sync {
    /// Candidate policies for `right` on `object`, in evaluation order.
    fn pull_policy(&self, object: &ObjectRef, right: &RightId) -> Vec<Policy>;
}

#[derive(Debug, Clone)]
struct StoredPolicy {
    id: String,
    contexts: Vec<PolicyContext>,
    rights: Vec<RightId>,
    policy: Policy,
}

impl StoredPolicy {
    fn applies_to(&self, object: &ObjectRef, right: &RightId) -> bool {
        self.rights.contains(right) && self.contexts.iter().any(|c| c.matches(object))
    }
}

/// An in-memory policy store.
///
/// Policies are returned in insertion order. A policy without contexts
/// applies to no object.
#[derive(Debug, Default)]
pub struct PolicyStore {
    policies: RwLock<Vec<StoredPolicy>>,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a compiled policy, replacing any policy with the same id.
    pub fn insert(
        &self,
        id: impl Into<String>,
        contexts: Vec<PolicyContext>,
        rights: impl IntoIterator<Item = RightId>,
        policy: Policy,
    ) {
        let stored = StoredPolicy {
            id: id.into(),
            contexts,
            rights: rights.into_iter().collect(),
            policy,
        };
        info!(policy = %stored.id, "stored policy");

        let mut policies = self.policies.write();
        match policies.iter_mut().find(|p| p.id == stored.id) {
            Some(existing) => *existing = stored,
            None => policies.push(stored),
        }
    }

    /// Compiles a signed JSON policy document and stores it under its id.
    pub fn load_json(&self, text: &str) -> Result<String> {
        let language = JsonPolicyLanguage;
        let signed = language.deserialize(text)?;
        let policy = language.translate(&signed)?;
        let document = signed.policy;
        self.insert(
            document.id.clone(),
            document.contexts,
            document.rights.into_iter().map(RightId::new),
            policy,
        );
        Ok(document.id)
    }

    pub fn remove(&self, id: &str) -> Option<Policy> {
        let mut policies = self.policies.write();
        let position = policies.iter().position(|p| p.id == id)?;
        Some(policies.remove(position).policy)
    }

    pub fn len(&self) -> usize {
        self.policies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.read().is_empty()
    }
}

impl PolicyManagementPoint for PolicyStore {
    fn pull_policy(&self, object: &ObjectRef, right: &RightId) -> Vec<Policy> {
        self.policies
            .read()
            .iter()
            .filter(|p| p.applies_to(object, right))
            .map(|p| p.policy.clone())
            .collect()
    }
}
