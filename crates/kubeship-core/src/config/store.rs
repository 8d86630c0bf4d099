//! Config store for loading and saving kubeship.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{ConfigScope, KubeshipConfig, parser, paths};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    pub fn from_paths(scope: ConfigScope, global_dir: &Path, project_root: &Path) -> Self {
        Self {
            config_path: paths::config_path_for_scope(scope, global_dir, project_root),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }

    pub fn load(&self) -> anyhow::Result<KubeshipConfig> {
        if !self.config_path.exists() {
            return Ok(KubeshipConfig::new());
        }
        parser::parse_kubeship_toml(&self.config_path)
    }

    pub fn save(&self, config: &KubeshipConfig) -> anyhow::Result<()> {
        let content = parser::to_toml(config).context("Failed to serialize config to TOML")?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;
        Ok(())
    }
}
