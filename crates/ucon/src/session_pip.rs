//! Attribute provider registered under a session key while access is ongoing.

use std::sync::Arc;

use ucon_types::{AttributeProvider, EnforcementListener, Value};

/// Exposes the session's enforcement listener to `dependency/2`.
pub(crate) struct SessionPip {
    listener: Arc<dyn EnforcementListener>,
}

impl SessionPip {
    pub(crate) fn new(listener: Arc<dyn EnforcementListener>) -> Self {
        Self { listener }
    }
}

impl AttributeProvider for SessionPip {
    fn query(&self, _identifier: &str) -> Option<Value> {
        None
    }

    fn update(&self, _identifier: &str, _description: &str, _value: Option<Value>) -> bool {
        false
    }

    fn enforcement_listener(&self) -> Option<Arc<dyn EnforcementListener>> {
        Some(Arc::clone(&self.listener))
    }
}
