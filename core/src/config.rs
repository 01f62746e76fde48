//! The `[storage]`/`[sync]` TOML schema of spec §6, shared by `dex-cli` and
//! whatever else needs to resolve store location and sync policy. Layering
//! (global then project, `config` crate `Environment` overrides) lives in
//! `dex-cli`; this module only owns the shape and defaults.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DexConfig {
    pub storage: StorageConfig,
    pub sync: SyncConfig,
}

impl Default for DexConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub engine: StorageEngine,
    pub file: FileStorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            engine: StorageEngine::File,
            file: FileStorageConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageEngine {
    File,
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::File
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileStorageConfig {
    pub mode: StoreMode,
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        Self {
            mode: StoreMode::InRepo,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StoreMode {
    InRepo,
    Centralized,
}

impl Default for StoreMode {
    fn default() -> Self {
        Self::InRepo
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    pub github: GithubSyncConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            github: GithubSyncConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GithubSyncConfig {
    pub enabled: bool,
    pub token_env: String,
    pub label_prefix: String,
    pub auto: AutoSyncConfig,
}

impl Default for GithubSyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token_env: "GITHUB_TOKEN".to_string(),
            label_prefix: "dex".to_string(),
            auto: AutoSyncConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AutoSyncConfig {
    pub on_change: bool,
    pub max_age: Option<String>,
}

impl Default for AutoSyncConfig {
    fn default() -> Self {
        Self {
            on_change: true,
            max_age: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let config = DexConfig::default();
        assert_eq!(config.storage.engine, StorageEngine::File);
        assert_eq!(config.storage.file.mode, StoreMode::InRepo);
        assert!(!config.sync.github.enabled);
        assert_eq!(config.sync.github.token_env, "GITHUB_TOKEN");
        assert_eq!(config.sync.github.label_prefix, "dex");
        assert!(config.sync.github.auto.on_change);
        assert!(config.sync.github.auto.max_age.is_none());
    }

    #[test]
    fn deserializes_partial_toml_with_defaults() {
        let toml_str = r#"
            [sync.github]
            enabled = true
            label_prefix = "work"
        "#;
        let config: DexConfig = toml::from_str(toml_str).expect("config parses");
        assert!(config.sync.github.enabled);
        assert_eq!(config.sync.github.label_prefix, "work");
        assert_eq!(config.storage.file.mode, StoreMode::InRepo);
    }
}
