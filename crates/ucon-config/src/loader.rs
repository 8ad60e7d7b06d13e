//! Layered loading of [`UconConfig`]

use crate::{ConfigLayer, UconConfig};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Merges defaults, file layers and environment overrides into a
/// validated [`UconConfig`].
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    user_config: bool,
}

impl ConfigLoader {
    /// A loader rooted at the current directory, reading the user layer and
    /// `UCON_*` variables.
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "UCON".to_string(),
            user_config: true,
        }
    }

    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Skip the per-user layer.
    pub fn without_user_config(mut self) -> Self {
        self.user_config = false;
        self
    }

    fn layer_files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        ConfigLayer::ALL
            .into_iter()
            .filter(|layer| self.user_config || *layer != ConfigLayer::User)
            .filter_map(|layer| layer.path(&self.project_dir).ok())
            .filter(|file| file.exists())
    }

    pub fn load(self) -> Result<UconConfig> {
        let defaults = config::Config::try_from(&UconConfig::default())
            .context("serializing built-in defaults")?;
        let mut builder = config::Config::builder().add_source(defaults);

        for file in self.layer_files() {
            builder = builder.add_source(
                config::File::from(file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // UCON_ENGINE__MAX_DEPTH=64 overrides engine.max_depth
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: UconConfig = builder
            .build()
            .and_then(config::Config::try_deserialize)
            .with_context(|| format!("reading configuration for {}", self.project_dir.display()))?;
        loaded.validate().context("validating configuration")?;
        Ok(loaded)
    }

    /// Like [`load`](Self::load), falling back to defaults on any error.
    pub fn load_or_default(self) -> UconConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
