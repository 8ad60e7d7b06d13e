//! Configuration management for ucon
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (`UCON_<SECTION>__<KEY>`, highest precedence)
//! 2. ucon.local.toml (gitignored, local overrides)
//! 3. ucon.toml (git-tracked, project config)
//! 4. ~/.config/ucon/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::{ConfigLayer, user_config_dir};

/// Main ucon configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UconConfig {
    pub engine: EngineConfig,
    pub decision: DecisionConfig,
    pub scheduler: SchedulerConfig,
}

/// Resource limits of a single rule evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_depth: usize,
    pub max_inferences: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 1024,
            max_inferences: 100_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub combining: CombiningAlgorithm,
    pub evaluate_post_permit: bool,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            combining: CombiningAlgorithm::FirstApplicable,
            evaluate_post_permit: true,
        }
    }
}

/// How the candidate policies of one request are combined
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CombiningAlgorithm {
    /// The first candidate whose pre-access goal holds is bound.
    #[default]
    FirstApplicable,
    /// All candidates are merged by conjunction and must hold together.
    DenyOverrides,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Delay before the first re-evaluation; one period when unset.
    pub initial_delay_ms: Option<u64>,
    /// Shorter re-evaluation periods are raised to this.
    pub min_period_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: None,
            min_period_ms: 10,
        }
    }
}

impl SchedulerConfig {
    pub fn initial_delay(&self) -> Option<Duration> {
        self.initial_delay_ms.map(Duration::from_millis)
    }

    pub fn min_period(&self) -> Duration {
        Duration::from_millis(self.min_period_ms)
    }

    /// `period` clamped to the configured minimum.
    pub fn effective_period(&self, period: Duration) -> Duration {
        period.max(self.min_period())
    }
}

impl UconConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Generous limits and fast re-evaluation for local experiments
    pub fn development() -> Self {
        Self {
            engine: EngineConfig {
                max_inferences: 1_000_000,
                ..Default::default()
            },
            scheduler: SchedulerConfig {
                min_period_ms: 1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Conservative limits; every applicable policy must permit
    pub fn production() -> Self {
        Self {
            engine: EngineConfig {
                max_depth: 512,
                max_inferences: 50_000,
            },
            decision: DecisionConfig {
                combining: CombiningAlgorithm::DenyOverrides,
                evaluate_post_permit: true,
            },
            scheduler: SchedulerConfig {
                min_period_ms: 100,
                ..Default::default()
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "engine.max_depth",
                reason: "must be positive",
            });
        }
        if self.engine.max_inferences == 0 {
            return Err(ConfigError::Invalid {
                field: "engine.max_inferences",
                reason: "must be positive",
            });
        }
        if self.scheduler.min_period_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "scheduler.min_period_ms",
                reason: "must be positive",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UconConfig::default();
        assert_eq!(config.engine.max_depth, 1024);
        assert_eq!(config.engine.max_inferences, 100_000);
        assert_eq!(config.decision.combining, CombiningAlgorithm::FirstApplicable);
        assert!(config.decision.evaluate_post_permit);
        assert_eq!(config.scheduler.min_period_ms, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_development_config() {
        let config = UconConfig::development();
        assert_eq!(config.engine.max_inferences, 1_000_000);
        assert_eq!(config.scheduler.min_period(), Duration::from_millis(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_config() {
        let config = UconConfig::production();
        assert_eq!(config.decision.combining, CombiningAlgorithm::DenyOverrides);
        assert_eq!(config.engine.max_depth, 512);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_effective_period_is_clamped() {
        let scheduler = SchedulerConfig::default();
        assert_eq!(
            scheduler.effective_period(Duration::from_millis(1)),
            Duration::from_millis(10)
        );
        assert_eq!(
            scheduler.effective_period(Duration::from_secs(2)),
            Duration::from_secs(2)
        );
        assert_eq!(scheduler.initial_delay(), None);
    }

    #[test]
    fn test_validate_names_the_field() {
        let mut config = UconConfig::default();
        config.scheduler.min_period_ms = 0;
        let error = config.validate().unwrap_err();
        assert_eq!(error.to_string(), "scheduler.min_period_ms must be positive");
    }

    #[test]
    fn test_toml_round_trip() {
        let config = UconConfig::production();
        let text = toml::to_string(&config).expect("Failed to serialize");
        assert!(text.contains("combining = \"deny-overrides\""));
        let parsed: UconConfig = toml::from_str(&text).expect("Failed to parse");
        assert_eq!(parsed, config);
    }
}
