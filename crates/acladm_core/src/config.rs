//! Process configuration.
//!
//! Built once at startup from an optional TOML file plus environment
//! overrides, then passed by reference. Nothing in the engine reads the
//! environment on its own.

use crate::error::{AclError, AclResult};
use crate::mapping::normalize_path;
use acladm_hal::facl::{DEFAULT_GETFACL, DEFAULT_SETFACL};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `EnvFilter` directive, e.g. `info` or `acladm_core=debug`
    pub level: String,
    pub format: LogFormat,
    /// Also write logs to this file
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub getfacl: String,
    pub setfacl: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            getfacl: DEFAULT_GETFACL.to_string(),
            setfacl: DEFAULT_SETFACL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub dataset_root: PathBuf,
    pub shared_apps_root: PathBuf,
    pub database_path: PathBuf,
    pub facl_user_domain: String,
    pub admin_group: Option<String>,
    pub tools: ToolSettings,
    pub logging: LogSettings,
}

/// Config as read from file, every field optional until validated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    pub dataset_root: Option<PathBuf>,
    pub shared_apps_root: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub facl_user_domain: Option<String>,
    pub admin_group: Option<String>,
    pub tools: ToolSettings,
    pub logging: LogSettings,
}

impl RawConfig {
    pub fn from_toml_str(text: &str) -> AclResult<Self> {
        toml::from_str(text).map_err(|e| AclError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> AclResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| AclError::io(path, e))?;
        toml::from_str(&text).map_err(|e| AclError::Config(format!("{}: {e}", path.display())))
    }

    /// Apply overrides from `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get("APP_DATASET_ROOT") {
            self.dataset_root = Some(PathBuf::from(v));
        }
        if let Some(v) = get("SHARED_APPS_ROOT") {
            self.shared_apps_root = Some(PathBuf::from(v));
        }
        if let Some(v) = get("DATABASE_PATH") {
            self.database_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("FACL_USER_DOMAIN") {
            self.facl_user_domain = Some(v);
        }
        if let Some(v) = get("ADMIN_GROUP") {
            self.admin_group = Some(v);
        }
        if let Some(v) = get("ACLADM_LOG") {
            self.logging.level = v;
        }
    }

    pub fn finish(self) -> AclResult<Config> {
        let dataset_root = require_absolute("dataset_root (APP_DATASET_ROOT)", self.dataset_root)?;
        let shared_apps_root =
            require_absolute("shared_apps_root (SHARED_APPS_ROOT)", self.shared_apps_root)?;
        let database_path = match self.database_path {
            Some(path) => require_absolute("database_path (DATABASE_PATH)", Some(path))?,
            None => shared_apps_root.join("mappings.json"),
        };
        let facl_user_domain = self
            .facl_user_domain
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .ok_or_else(|| AclError::Config("facl_user_domain (FACL_USER_DOMAIN) is required".into()))?;

        Ok(Config {
            dataset_root,
            shared_apps_root,
            database_path,
            facl_user_domain,
            admin_group: self.admin_group.filter(|g| !g.trim().is_empty()),
            tools: self.tools,
            logging: self.logging,
        })
    }
}

fn require_absolute(name: &str, value: Option<PathBuf>) -> AclResult<PathBuf> {
    let path = value.ok_or_else(|| AclError::Config(format!("{name} is required")))?;
    if !path.is_absolute() {
        return Err(AclError::Config(format!(
            "{name} must be an absolute path, got {}",
            path.display()
        )));
    }
    Ok(normalize_path(&path))
}

impl Config {
    /// File (if any), then process environment.
    pub fn load(file: Option<&Path>) -> AclResult<Self> {
        let mut raw = match file {
            Some(path) => RawConfig::from_file(path)?,
            None => RawConfig::default(),
        };
        raw.apply_env(|key| std::env::var(key).ok());
        raw.finish()
    }
}
