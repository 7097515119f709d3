//! Optional `.keycloak.toml` settings with `KEYCLOAK_*` environment overrides.
//!
//! ```toml
//! key_file = "keys.txt"
//! key_env = "AGE_KEY"
//! path = "secrets"
//! mac_label = "1234567890"
//! delete_key_after_use = false
//! ```
//!
//! Command-line flags take precedence over both.

use crate::error::{KeycloakError, Result};
use crate::keys::DEFAULT_KEY_ENV;
use crate::mac::{MacLabel, DEFAULT_MAC_LABEL};

use config::{Config, File, FileFormat};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE: &str = ".keycloak.toml";
const ENV_PREFIX: &str = "KEYCLOAK_";

/// Default subtree path, matching the conventional `secrets:` top-level key.
pub const DEFAULT_PATH: &str = "secrets";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub key_file: Option<PathBuf>,
    #[serde(default = "default_key_env")]
    pub key_env: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_mac_label")]
    pub mac_label: String,
    #[serde(default)]
    pub delete_key_after_use: bool,
}

fn default_key_env() -> String {
    DEFAULT_KEY_ENV.to_string()
}

fn default_path() -> String {
    DEFAULT_PATH.to_string()
}

fn default_mac_label() -> String {
    DEFAULT_MAC_LABEL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            key_file: None,
            key_env: default_key_env(),
            path: default_path(),
            mac_label: default_mac_label(),
            delete_key_after_use: false,
        }
    }
}

impl Settings {
    pub fn mac_label(&self) -> MacLabel {
        MacLabel::new(self.mac_label.clone())
    }
}

/// Load settings from `dir/.keycloak.toml` (if present), then apply
/// environment overrides.
pub fn load_settings(dir: &Path) -> Result<Settings> {
    let config_path = dir.join(CONFIG_FILE);

    let mut settings = if config_path.exists() {
        debug!(path = %config_path.display(), "loading settings");
        Config::builder()
            .add_source(File::new(
                config_path
                    .to_str()
                    .ok_or_else(|| KeycloakError::Config("Invalid config path".into()))?,
                FileFormat::Toml,
            ))
            .build()
            .and_then(|cfg| cfg.try_deserialize::<Settings>())
            .map_err(|err| KeycloakError::Config(format!("Failed to load config file: {err}")))?
    } else {
        Settings::default()
    };

    if let Ok(key_file) = env::var(format!("{ENV_PREFIX}KEY_FILE")) {
        settings.key_file = Some(PathBuf::from(key_file));
    }
    if let Ok(key_env) = env::var(format!("{ENV_PREFIX}KEY_ENV")) {
        settings.key_env = key_env;
    }
    if let Ok(path) = env::var(format!("{ENV_PREFIX}PATH")) {
        settings.path = path;
    }
    if let Ok(label) = env::var(format!("{ENV_PREFIX}MAC_LABEL")) {
        settings.mac_label = label;
    }
    if let Some(delete) = env::var(format!("{ENV_PREFIX}DELETE_KEY_AFTER_USE"))
        .ok()
        .and_then(|v| v.parse().ok())
    {
        settings.delete_key_after_use = delete;
    }

    Ok(settings)
}
