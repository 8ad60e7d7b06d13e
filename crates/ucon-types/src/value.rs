//! Attribute values returned by attribute providers.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

/// A role together with the rights it grants.
pub type RolePermission = (String, Vec<String>);

/// A dynamically typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Real(f64),
    Truth(bool),
    String(String),
    StringList(Vec<String>),
    /// Subject identity to the set of rights it holds.
    RightsMap(BTreeMap<String, BTreeSet<String>>),
    /// Role-permission assignments, ordered from the lowest role upwards.
    RolePermissions(Vec<RolePermission>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Real(_) => ValueKind::Real,
            Value::Truth(_) => ValueKind::Truth,
            Value::String(_) => ValueKind::String,
            Value::StringList(_) => ValueKind::StringList,
            Value::RightsMap(_) => ValueKind::RightsMap,
            Value::RolePermissions(_) => ValueKind::RolePermissions,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Truth(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Value::StringList(value)
    }
}

/// The runtime type of a [`Value`], used in type-mismatch diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Real,
    Truth,
    String,
    StringList,
    RightsMap,
    RolePermissions,
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueKind::Int => "int",
            ValueKind::Real => "real",
            ValueKind::Truth => "truth",
            ValueKind::String => "string",
            ValueKind::StringList => "string list",
            ValueKind::RightsMap => "rights map",
            ValueKind::RolePermissions => "role permissions",
        };
        f.write_str(name)
    }
}
