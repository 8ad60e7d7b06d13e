//! # ucon-policy: Usage-control policies
//!
//! A [`Policy`] bundles the goals the decision point evaluates over the
//! lifetime of one usage: before access, once after permit, periodically
//! while access is ongoing, and after the usage was revoked or ended.
//!
//! Policies are authored as JSON documents ([`SignedPolicy`]) and compiled
//! by a [`PolicyLanguage`] into goal trees for the rule engine. Goals refer
//! to the request through the `$SUBJECT`, `$OBJECT` and `$RIGHT`
//! placeholders until [`Policy::instantiate`] binds them.
//!
//! ```
//! use ucon_policy::{JsonPolicyLanguage, PolicyLanguage};
//!
//! let policy = JsonPolicyLanguage
//!     .compile(r#"{ "signature": "", "policy": { "id": "p", "preAccess": { "predicates": [
//!         { "type": "notification", "monitor": "audit", "message": "opened" } ] } } }"#)
//!     .unwrap();
//! assert_eq!(policy.pre_access.to_string(), "notify_monitor(opened, audit)");
//! ```

mod compiler;
mod document;
mod error;
mod language;
mod policy;
mod store;

pub use compiler::compile;
pub use document::{
    Argument, OngoingBlock, PolicyContext, PolicyDocument, Predicate, PredicateBlock,
    SignedPolicy, Trigger,
};
pub use error::{CompileError, Result};
pub use language::{JsonPolicyLanguage, PolicyLanguage};
pub use policy::{OBJECT_PLACEHOLDER, Policy, RIGHT_PLACEHOLDER, SUBJECT_PLACEHOLDER, substitute};
pub use store::{PolicyManagementPoint, PolicyStore};
