//! Wire schema of policy documents.
//!
//! Documents are JSON objects whose polymorphic parts carry a `"type"`
//! discriminator:
//!
//! ```json
//! { "type": "dayTime", "timePip": "clock", "startDayTime": "07:00",
//!   "endDayTime": "18:00", "days": ["Monday", "Friday"] }
//! ```

use serde::{Deserialize, Serialize};
use ucon_types::ObjectRef;

/// A policy document together with its issuer signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedPolicy {
    pub policy: PolicyDocument,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    pub id: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub contexts: Vec<PolicyContext>,
    #[serde(default)]
    pub rights: Vec<String>,
    #[serde(default)]
    pub pre_access: PredicateBlock,
    #[serde(default)]
    pub ongoing_access: OngoingBlock,
    #[serde(default)]
    pub post_access: PredicateBlock,
    #[serde(default)]
    pub post_revocation: PredicateBlock,
}

/// Which objects a policy applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PolicyContext {
    ObjectId { value: String },
    ObjectClass { value: String },
}

impl PolicyContext {
    pub fn matches(&self, object: &ObjectRef) -> bool {
        match self {
            PolicyContext::ObjectId { value } => object.id.as_str() == value,
            PolicyContext::ObjectClass { value } => object.class.as_deref() == Some(value.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredicateBlock {
    #[serde(default)]
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OngoingBlock {
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    #[serde(default)]
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Trigger {
    /// Re-evaluate every `period` milliseconds.
    Period {
        #[serde(alias = "periodMs")]
        period: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Predicate {
    Notification {
        monitor: String,
        message: String,
    },
    UsageNotification {
        monitor: String,
        time_pip: String,
        subject_attr_pip: String,
        object_attr_pip: String,
    },
    /// Local date-times `yyyy-MM-ddTHH:mm[:ss]` read in `time_zone`.
    TimeInterval {
        time_pip: String,
        #[serde(alias = "start")]
        start_time: String,
        #[serde(alias = "end")]
        end_time: String,
        #[serde(alias = "tz")]
        time_zone: String,
    },
    Duration {
        time_pip: String,
        #[serde(alias = "start")]
        start_time: String,
        /// Seconds.
        #[serde(alias = "seconds")]
        duration: i64,
        #[serde(alias = "tz")]
        time_zone: String,
    },
    DayTime {
        time_pip: String,
        start_day_time: String,
        end_day_time: String,
        days: Vec<String>,
    },
    And {
        #[serde(alias = "a")]
        first: Box<Predicate>,
        #[serde(alias = "b")]
        second: Box<Predicate>,
    },
    Or {
        #[serde(alias = "a")]
        first: Box<Predicate>,
        #[serde(alias = "b")]
        second: Box<Predicate>,
    },
    Not {
        #[serde(alias = "p")]
        value: Box<Predicate>,
    },
    Custom {
        functor: String,
        #[serde(default)]
        args: Vec<Argument>,
    },
}

/// An argument of a custom predicate.
///
/// Resolvers read `attr` from the provider `pip` into a fresh variable; a
/// semaphore passes the raw `pip:attr` reference to counter predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Argument {
    ResolveString { pip: String, attr: String },
    ResolveStringList { pip: String, attr: String },
    ResolveInt { pip: String, attr: String },
    ResolveReal { pip: String, attr: String },
    ResolveTruth { pip: String, attr: String },
    ResolveSemaphore { pip: String, attr: String },
    LString { value: String },
    LInt { value: i64 },
}
