//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Config file: `--config <file>`, else `$XDG_CONFIG_HOME/jarvice/jarvice.toml`
//! 3. Environment variables: `JARVICE_*` prefix
//! 4. Command line flags (applied by the caller)

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::services::WaitOptions;
use crate::application::ApplicationError;
use crate::domain::{Credentials, DomainError, VaultAddress};

pub const DEFAULT_APIURL: &str = "https://api.jarvice.com";
pub const DEFAULT_VAULT: &str = "drop.jarvice.com";
pub const ENV_PREFIX: &str = "JARVICE";

/// Pacing of `wait_for`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WaitSettings {
    /// Seconds between two status queries
    pub interval_secs: u64,
    /// Consecutive failed status queries before giving up
    pub max_errors: u32,
    /// Give up after this many seconds (unset: wait indefinitely)
    pub timeout_secs: Option<u64>,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            max_errors: 3,
            timeout_secs: None,
        }
    }
}

/// Raw wait settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawWaitSettings {
    pub interval_secs: Option<u64>,
    pub max_errors: Option<u32>,
    pub timeout_secs: Option<u64>,
}

/// Raw settings for intermediate parsing.
///
/// `None` means "not specified in this layer, inherit from below".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub username: Option<String>,
    pub apikey: Option<String>,
    pub apiurl: Option<String>,
    pub vault: Option<String>,
    pub timeout_secs: Option<u64>,
    pub wait: RawWaitSettings,
}

/// Unified configuration for jarvice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Account name
    pub username: Option<String>,
    /// API key (also the vault password)
    pub apikey: Option<String>,
    /// Base URL of the job API
    pub apiurl: String,
    /// Vault address: `host[:port]` or `file://<dir>`
    pub vault: String,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
    pub wait: WaitSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            username: None,
            apikey: None,
            apiurl: DEFAULT_APIURL.into(),
            vault: DEFAULT_VAULT.into(),
            timeout_secs: 60,
            wait: WaitSettings::default(),
        }
    }
}

/// Get the XDG config directory for jarvice.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "jarvice").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("jarvice.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// An explicit `config_file` must exist; the global file is optional.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        match config_file {
            Some(path) => {
                if !path.is_file() {
                    return Err(ApplicationError::Config {
                        message: format!("config file not found: {}", path.display()),
                    });
                }
                current = current.merge_with(&load_raw_settings(path)?);
            }
            None => {
                if let Some(global_path) = global_config_path() {
                    if global_path.exists() {
                        current = current.merge_with(&load_raw_settings(&global_path)?);
                    }
                }
            }
        }

        current = current.apply_env(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )?;

        current.expand_paths();
        Ok(current)
    }

    /// Overlay values specified in `overlay`; everything else is kept.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            username: overlay.username.clone().or_else(|| self.username.clone()),
            apikey: overlay.apikey.clone().or_else(|| self.apikey.clone()),
            apiurl: overlay
                .apiurl
                .clone()
                .unwrap_or_else(|| self.apiurl.clone()),
            vault: overlay.vault.clone().unwrap_or_else(|| self.vault.clone()),
            timeout_secs: overlay.timeout_secs.unwrap_or(self.timeout_secs),
            wait: WaitSettings {
                interval_secs: overlay.wait.interval_secs.unwrap_or(self.wait.interval_secs),
                max_errors: overlay.wait.max_errors.unwrap_or(self.wait.max_errors),
                timeout_secs: overlay.wait.timeout_secs.or(self.wait.timeout_secs),
            },
        }
    }

    /// Apply `JARVICE_*` variables from `env` as explicit overrides.
    ///
    /// Nested keys use `__`: `JARVICE_WAIT__INTERVAL_SECS`.
    pub fn apply_env(mut self, env: Environment) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(env)
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("username") {
            self.username = Some(val);
        }
        if let Ok(val) = config.get_string("apikey") {
            self.apikey = Some(val);
        }
        if let Ok(val) = config.get_string("apiurl") {
            self.apiurl = val;
        }
        if let Ok(val) = config.get_string("vault") {
            self.vault = val;
        }
        if let Some(val) = get_opt::<u64>(&config, "timeout_secs")? {
            self.timeout_secs = val;
        }
        if let Some(val) = get_opt::<u64>(&config, "wait.interval_secs")? {
            self.wait.interval_secs = val;
        }
        if let Some(val) = get_opt::<u32>(&config, "wait.max_errors")? {
            self.wait.max_errors = val;
        }
        if let Some(val) = get_opt::<u64>(&config, "wait.timeout_secs")? {
            self.wait.timeout_secs = Some(val);
        }

        Ok(self)
    }

    /// Expand `~` and `$VAR` in the vault address.
    fn expand_paths(&mut self) {
        self.vault = match self.vault.strip_prefix("file://") {
            Some(dir) => format!("file://{}", expand(dir)),
            None => expand(&self.vault),
        };
    }

    /// Final credentials: command line flags win over loaded settings.
    pub fn resolve_credentials(
        &self,
        username: Option<String>,
        apikey: Option<String>,
        apiurl: Option<String>,
    ) -> Result<Credentials, DomainError> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        let username = non_empty(username)
            .or_else(|| non_empty(self.username.clone()))
            .ok_or(DomainError::MissingCredential("username"))?;
        let apikey = non_empty(apikey)
            .or_else(|| non_empty(self.apikey.clone()))
            .ok_or(DomainError::MissingCredential("apikey"))?;
        let apiurl = non_empty(apiurl).unwrap_or_else(|| self.apiurl.clone());
        Ok(Credentials {
            username,
            apikey,
            apiurl,
        })
    }

    pub fn vault_address(&self) -> Result<VaultAddress, DomainError> {
        VaultAddress::parse(&self.vault)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            interval: Duration::from_secs(self.wait.interval_secs),
            max_consecutive_errors: self.wait.max_errors.max(1),
            timeout: self.wait.timeout_secs.map(Duration::from_secs),
        }
    }

    /// Show the effective configuration as TOML, API key masked.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        let mut shown = self.clone();
        if shown.apikey.is_some() {
            shown.apikey = Some("********".into());
        }
        toml::to_string_pretty(&shown).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# jarvice configuration
#
# Locations (by precedence, lowest to highest):
#   File: ~/.config/jarvice/jarvice.toml  (or --config <file>)
#   Env:  JARVICE_* environment variables, nested keys with "__"
#         (JARVICE_APIKEY, JARVICE_WAIT__INTERVAL_SECS)
#   Command line flags: --username, --apikey, --apiurl

# Account name
# username = "jdoe"

# API key, also used as the vault password
# apikey = "..."

# Base URL of the job API
# apiurl = "https://api.jarvice.com"

# Vault address: host[:port] for SFTP, or file://<dir> for a mounted vault
# vault = "drop.jarvice.com"

# HTTP request timeout in seconds
# timeout_secs = 60

[wait]
# Seconds between two status queries
# interval_secs = 5

# Consecutive failed status queries before giving up
# max_errors = 3

# Give up after this many seconds (default: wait indefinitely)
# timeout_secs = 3600
"#
        .to_string()
    }
}

fn expand(raw: &str) -> String {
    shellexpand::full(raw)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

fn get_opt<T: serde::de::DeserializeOwned>(
    config: &Config,
    key: &str,
) -> Result<Option<T>, ApplicationError> {
    match config.get::<T>(key) {
        Ok(val) => Ok(Some(val)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(config_err(e)),
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .source(Some(source))
    }

    #[test]
    fn given_defaults_when_created_then_point_at_public_service() {
        let settings = Settings::default();
        assert_eq!(settings.apiurl, "https://api.jarvice.com");
        assert_eq!(settings.vault, "drop.jarvice.com");
        assert_eq!(settings.wait, WaitSettings::default());
        assert_eq!(settings.wait_options(), WaitOptions::default());
    }

    #[test]
    fn given_partial_overlay_when_merging_then_unspecified_fields_kept() {
        let overlay: RawSettings = toml::from_str(
            r#"
username = "jdoe"
[wait]
interval_secs = 30
"#,
        )
        .unwrap();

        let merged = Settings::default().merge_with(&overlay);

        assert_eq!(merged.username.as_deref(), Some("jdoe"));
        assert_eq!(merged.wait.interval_secs, 30);
        assert_eq!(merged.wait.max_errors, 3);
        assert_eq!(merged.apiurl, DEFAULT_APIURL);
    }

    #[test]
    fn given_env_vars_when_applied_then_override_file_values() {
        let base = Settings {
            username: Some("from-file".into()),
            ..Settings::default()
        };

        let settings = base
            .apply_env(env(&[
                ("JARVICE_USERNAME", "from-env"),
                ("JARVICE_APIKEY", "k3y"),
                ("JARVICE_WAIT__MAX_ERRORS", "7"),
                ("OTHER_VAR", "ignored"),
            ]))
            .unwrap();

        assert_eq!(settings.username.as_deref(), Some("from-env"));
        assert_eq!(settings.apikey.as_deref(), Some("k3y"));
        assert_eq!(settings.wait.max_errors, 7);
    }

    #[test]
    fn given_flags_when_resolving_credentials_then_flags_win() {
        let settings = Settings {
            username: Some("cfg-user".into()),
            apikey: Some("cfg-key".into()),
            ..Settings::default()
        };

        let creds = settings
            .resolve_credentials(Some("flag-user".into()), None, Some("http://localhost".into()))
            .unwrap();

        assert_eq!(creds.username, "flag-user");
        assert_eq!(creds.apikey, "cfg-key");
        assert_eq!(creds.apiurl, "http://localhost");
    }

    #[test]
    fn given_no_apikey_when_resolving_credentials_then_missing_credential() {
        let settings = Settings {
            username: Some("jdoe".into()),
            ..Settings::default()
        };

        let err = settings.resolve_credentials(None, Some(String::new()), None).unwrap_err();

        assert!(matches!(err, DomainError::MissingCredential("apikey")));
    }

    #[test]
    fn given_apikey_when_showing_config_then_masked() {
        let settings = Settings {
            apikey: Some("secret-key".into()),
            ..Settings::default()
        };

        let shown = settings.to_toml().unwrap();

        assert!(!shown.contains("secret-key"));
        assert!(shown.contains("********"));
    }

    #[test]
    fn given_template_when_parsed_then_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).unwrap();
        assert!(raw.username.is_none());
    }

    #[test]
    fn given_tilde_in_file_vault_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            vault: "file://~/mnt/vault".into(),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        assert_eq!(settings.vault, format!("file://{home}/mnt/vault"));
    }
}
