//! Where configuration layers live on disk

use crate::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// A file-backed configuration layer, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    /// `~/.config/ucon/config.toml` or the platform equivalent
    User,
    /// `ucon.toml`, shared with the project
    Project,
    /// `ucon.local.toml`, machine-local overrides
    Local,
}

impl ConfigLayer {
    pub const ALL: [ConfigLayer; 3] = [ConfigLayer::User, ConfigLayer::Project, ConfigLayer::Local];

    /// Path of this layer for a project rooted at `project_dir`.
    pub fn path(self, project_dir: &Path) -> Result<PathBuf, ConfigError> {
        match self {
            ConfigLayer::User => user_config_dir().map(|dir| dir.join("config.toml")),
            ConfigLayer::Project => Ok(project_dir.join("ucon.toml")),
            ConfigLayer::Local => Ok(project_dir.join("ucon.local.toml")),
        }
    }
}

/// Per-user configuration directory.
pub fn user_config_dir() -> Result<PathBuf, ConfigError> {
    ProjectDirs::from("rs", "ucon", "ucon")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(ConfigError::NoUserDirectory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_project_layers() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let dir = temp_dir.path();

        assert_eq!(ConfigLayer::Project.path(dir).unwrap(), dir.join("ucon.toml"));
        assert_eq!(ConfigLayer::Local.path(dir).unwrap(), dir.join("ucon.local.toml"));
    }

    #[test]
    fn test_user_layer_ignores_project_dir() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        if let Ok(file) = ConfigLayer::User.path(temp_dir.path()) {
            assert!(file.ends_with("config.toml"));
            assert!(!file.starts_with(temp_dir.path()));
        }
    }

    #[test]
    fn test_layers_are_ordered_by_precedence() {
        assert_eq!(
            ConfigLayer::ALL,
            [ConfigLayer::User, ConfigLayer::Project, ConfigLayer::Local]
        );
    }
}
