//! Registry of attribute providers and monitors reachable from predicates.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use ucon_types::{AttributeProvider, MonitorClient};

/// Attribute providers and notification sinks, addressed by identifier.
///
/// One registry is shared by a rule engine and the decision point that owns
/// it; independent engines use independent registries.
#[derive(Default)]
pub struct ComponentRegistry {
    providers: RwLock<HashMap<String, Arc<dyn AttributeProvider>>>,
    monitors: RwLock<HashMap<String, Arc<dyn MonitorClient>>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `provider` under `id`, returning the provider it replaced.
    pub fn register_provider(
        &self,
        id: impl Into<String>,
        provider: Arc<dyn AttributeProvider>,
    ) -> Option<Arc<dyn AttributeProvider>> {
        let id = id.into();
        debug!(provider = %id, "registering attribute provider");
        self.providers.write().insert(id, provider)
    }

    pub fn unregister_provider(&self, id: &str) -> Option<Arc<dyn AttributeProvider>> {
        debug!(provider = %id, "unregistering attribute provider");
        self.providers.write().remove(id)
    }

    pub fn provider(&self, id: &str) -> Option<Arc<dyn AttributeProvider>> {
        self.providers.read().get(id).cloned()
    }

    /// Registers `monitor` under `id`, returning the monitor it replaced.
    pub fn register_monitor(
        &self,
        id: impl Into<String>,
        monitor: Arc<dyn MonitorClient>,
    ) -> Option<Arc<dyn MonitorClient>> {
        let id = id.into();
        debug!(monitor = %id, "registering monitor");
        self.monitors.write().insert(id, monitor)
    }

    pub fn unregister_monitor(&self, id: &str) -> Option<Arc<dyn MonitorClient>> {
        self.monitors.write().remove(id)
    }

    pub fn monitor(&self, id: &str) -> Option<Arc<dyn MonitorClient>> {
        self.monitors.read().get(id).cloned()
    }
}

impl Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut providers: Vec<String> = self.providers.read().keys().cloned().collect();
        let mut monitors: Vec<String> = self.monitors.read().keys().cloned().collect();
        providers.sort();
        monitors.sort();
        f.debug_struct("ComponentRegistry")
            .field("providers", &providers)
            .field("monitors", &monitors)
            .finish()
    }
}
