//! # ucon-types: Core types for `ucon`
//!
//! This crate contains the vocabulary shared by every layer of the engine:
//! - Usage identities ([`SubjectId`], [`ObjectId`], [`ObjectRef`], [`RightId`])
//! - Session identity ([`SessionKey`])
//! - Attribute addressing ([`AttributeRef`])
//! - Attribute values ([`Value`])
//! - External collaborators ([`AttributeProvider`], [`EnforcementListener`],
//!   [`MonitorClient`]) and the [`Revocation`] message handed to listeners

mod component;
mod value;

use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

pub use component::{
    AttributeProvider, EnforcementListener, MonitorClient, Revocation, RevocationReason,
};
pub use value::{RolePermission, Value, ValueKind};

// ============================================================================
// Usage Identities
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Identity of the subject (user, service) requesting usage.
    SubjectId
);

string_id!(
    /// Identity of the object whose usage is controlled.
    ObjectId
);

string_id!(
    /// The right under which the object is used (`read`, `write`, ...).
    RightId
);

/// An object as seen by the decision engine: its identity plus an optional
/// class used for class-wide policy contexts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: ObjectId,
    pub class: Option<String>,
}

impl ObjectRef {
    pub fn new(id: impl Into<ObjectId>) -> Self {
        Self {
            id: id.into(),
            class: None,
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }
}

impl From<&str> for ObjectRef {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ============================================================================
// Session Identity
// ============================================================================

/// Key of a usage session.
///
/// Derived from the subject, object and right identities; two requests with
/// the same triple address the same session. Each identity is written with
/// backslashes and slashes escaped, so distinct triples never share a key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn derive(subject: &SubjectId, object: &ObjectId, right: &RightId) -> Self {
        let parts = [subject.as_str(), object.as_str(), right.as_str()];
        let mut key = String::with_capacity(parts.iter().map(|part| part.len() + 1).sum());
        for (index, part) in parts.into_iter().enumerate() {
            if index > 0 {
                key.push('/');
            }
            for ch in part.chars() {
                if matches!(ch, '\\' | '/') {
                    key.push('\\');
                }
                key.push(ch);
            }
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

// ============================================================================
// Attribute Addressing
// ============================================================================

/// Error returned when an attribute reference does not have the
/// `<provider-id>:<attribute-id>` shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed attribute reference '{0}': expected '<provider>:<attribute>'")]
pub struct AttributeRefError(pub String);

/// A `<provider-id>:<attribute-id>` address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeRef {
    provider: String,
    attribute: String,
}

impl AttributeRef {
    pub fn new(provider: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            attribute: attribute.into(),
        }
    }

    /// Parses the wire form. Exactly one `:` separator is accepted and neither
    /// side may be empty.
    pub fn parse(raw: &str) -> Result<Self, AttributeRefError> {
        let mut parts = raw.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(provider), Some(attribute), None)
                if !provider.is_empty() && !attribute.is_empty() =>
            {
                Ok(Self::new(provider, attribute))
            }
            _ => Err(AttributeRefError(raw.to_string())),
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

impl Display for AttributeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.provider, self.attribute)
    }
}

impl std::str::FromStr for AttributeRef {
    type Err = AttributeRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
