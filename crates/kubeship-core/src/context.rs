//! Application context shared by frontends.

use std::path::PathBuf;

use crate::config::paths::default_global_config_dir;
use crate::config::{ConfigScope, ConfigStore, KubeshipConfig, merge_configs};

/// Paths a frontend resolves once and hands to every command.
#[derive(Debug, Clone)]
pub struct AppContext {
    project_root: PathBuf,
    global_config_dir: PathBuf,
}

impl AppContext {
    /// Context for `project_root` with the user's global config directory.
    pub fn new(project_root: PathBuf) -> anyhow::Result<Self> {
        Ok(Self {
            project_root,
            global_config_dir: default_global_config_dir()?,
        })
    }

    /// Create context with custom global config directory (for testing).
    pub fn with_global_config_dir(project_root: PathBuf, global_config_dir: PathBuf) -> Self {
        Self {
            project_root,
            global_config_dir,
        }
    }

    /// Get a ConfigStore for the given scope.
    pub fn config_store(&self, scope: ConfigScope) -> ConfigStore {
        ConfigStore::from_paths(scope, &self.global_config_dir, &self.project_root)
    }

    /// Global and project configuration merged, then validated.
    pub fn load_config(&self) -> anyhow::Result<KubeshipConfig> {
        let global = self.load_scope(ConfigScope::Global)?;
        let project = self.load_scope(ConfigScope::Project)?;
        let merged = merge_configs(global, project);
        merged.validate()?;
        Ok(merged)
    }

    fn load_scope(&self, scope: ConfigScope) -> anyhow::Result<Option<KubeshipConfig>> {
        let store = self.config_store(scope);
        if !store.exists() {
            return Ok(None);
        }
        tracing::debug!(path = %store.config_path().display(), ?scope, "loading config");
        store.load().map(Some)
    }
}
