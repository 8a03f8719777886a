//! Layered configuration
//!
//! Defaults, then the TOML file, then `MULTIHOL_` environment variables
//! (`__` separates sections, e.g. `MULTIHOL_MOVES__MAX_CREATE_ATTEMPTS=3`).

use crate::paths;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use multihol_core::catalog::{CatalogConfig, DEFAULT_BASE_URL, ErrorCodeMap};
use multihol_core::ids::IdRules;
use multihol_core::mover::MoveConfig;
use multihol_core::security::DEFAULT_ACCOUNT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "MULTIHOL_";

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub catalog: CatalogSettings,

    #[serde(default)]
    pub moves: MoveSettings,

    #[serde(default)]
    pub backup: BackupSettings,

    #[serde(default)]
    pub ids: IdRules,

    #[serde(default)]
    pub credentials: CredentialSettings,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CatalogSettings {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub min_request_interval_ms: u64,
    /// Remote error codes behind each retried failure
    pub error_codes: ErrorCodeMap,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct MoveSettings {
    pub post_delete_delay_ms: u64,
    pub create_retry_delay_ms: u64,
    pub max_create_attempts: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct BackupSettings {
    pub directory: PathBuf,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CredentialSettings {
    /// Account the API key is stored under
    pub account: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: 30,
            min_request_interval_ms: 100,
            error_codes: ErrorCodeMap::default(),
        }
    }
}

impl Default for MoveSettings {
    fn default() -> Self {
        Self {
            post_delete_delay_ms: 1000,
            create_retry_delay_ms: 2000,
            max_create_attempts: 5,
        }
    }
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            directory: paths::get_backup_dir(),
        }
    }
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            account: DEFAULT_ACCOUNT.to_string(),
        }
    }
}

impl AppConfig {
    pub fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig {
            base_url: self.catalog.base_url.clone(),
            timeout: Duration::from_secs(self.catalog.timeout_seconds),
            min_request_interval: Duration::from_millis(self.catalog.min_request_interval_ms),
        }
    }

    pub fn move_config(&self) -> Result<MoveConfig> {
        let config = MoveConfig {
            post_delete_delay: Duration::from_millis(self.moves.post_delete_delay_ms),
            create_retry_delay: Duration::from_millis(self.moves.create_retry_delay_ms),
            max_create_attempts: self.moves.max_create_attempts,
            codes: self.catalog.error_codes.clone(),
        };
        config.validate().context("Invalid [moves] configuration")?;
        Ok(config)
    }
}

/// Reads and edits the configuration file
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config_path: paths::get_config_path(),
        }
    }

    /// Use a specific file, for tests
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn get_config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    /// Load configuration with layered priority: ENV > File > Defaults
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment.extract().context("Failed to load configuration")
    }

    /// Get a configuration value by dotted key
    pub fn get(&self, key: &str) -> Result<String> {
        let value = self.effective_values()?;

        let mut current = &value;
        for part in key.split('.') {
            match current {
                toml::Value::Table(table) => {
                    current = table
                        .get(part)
                        .ok_or_else(|| anyhow::anyhow!("Key '{}' not found", key))?;
                }
                _ => anyhow::bail!("Invalid key path: {}", key),
            }
        }

        render_value(current)
            .ok_or_else(|| anyhow::anyhow!("Value at '{}' is not a simple type", key))
    }

    /// Set a configuration value by dotted key and write the file
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        Self::validate_config_value(key, value)?;

        let mut config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path).with_context(|| {
                format!("Failed to read {}", self.config_path.display())
            })?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", self.config_path.display()))?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let parts: Vec<&str> = key.split('.').collect();
        let Some((last, sections)) = parts.split_last() else {
            anyhow::bail!("Empty key");
        };

        let mut current = &mut config;
        for part in sections {
            let toml::Value::Table(table) = current else {
                anyhow::bail!("Invalid key path: expected table at '{}'", part);
            };
            current = table
                .entry(part.to_string())
                .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
        }

        let toml::Value::Table(table) = current else {
            anyhow::bail!("Cannot set value on non-table");
        };
        table.insert(last.to_string(), Self::parse_config_value(key, value)?);

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let toml_string = toml::to_string_pretty(&config)?;
        fs::write(&self.config_path, toml_string)
            .with_context(|| format!("Failed to write {}", self.config_path.display()))?;

        // Reject files the loader could no longer read
        self.load()?;
        Ok(())
    }

    /// All effective values as sorted `(key, value)` pairs
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let value = self.effective_values()?;

        let mut items = Vec::new();
        Self::collect_values(&value, String::new(), &mut items);
        items.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(items)
    }

    fn effective_values(&self) -> Result<toml::Value> {
        let config = self.load()?;
        let toml_string = toml::to_string(&config).context("Failed to render configuration")?;
        Ok(toml::from_str(&toml_string)?)
    }

    fn collect_values(value: &toml::Value, prefix: String, items: &mut Vec<(String, String)>) {
        if let toml::Value::Table(table) = value {
            for (key, val) in table {
                let new_prefix = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                Self::collect_values(val, new_prefix, items);
            }
        } else if let Some(rendered) = render_value(value) {
            items.push((prefix, rendered));
        }
    }

    fn validate_config_value(key: &str, value: &str) -> Result<()> {
        match key {
            "catalog.base_url" => {
                if !(value.starts_with("https://") || value.starts_with("http://")) {
                    anyhow::bail!("base_url must be an http(s) URL");
                }
            }
            "catalog.timeout_seconds" => {
                let timeout: u64 = value
                    .parse()
                    .context("timeout_seconds must be a positive integer")?;
                if timeout == 0 {
                    anyhow::bail!("timeout_seconds must be greater than 0");
                }
            }
            "catalog.min_request_interval_ms"
            | "moves.post_delete_delay_ms"
            | "moves.create_retry_delay_ms" => {
                let _: u64 = value
                    .parse()
                    .context("Value must be a non-negative integer (milliseconds)")?;
            }
            "moves.max_create_attempts" => {
                let attempts: u32 = value
                    .parse()
                    .context("max_create_attempts must be a positive integer")?;
                if attempts == 0 {
                    anyhow::bail!("max_create_attempts must be at least 1");
                }
            }
            "ids.bib_prefix" | "ids.institution_suffix" | "ids.holding_prefix" => {
                if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
                    anyhow::bail!("{key} must consist of digits");
                }
            }
            "credentials.account" => {
                if value.trim().is_empty() {
                    anyhow::bail!("account must not be empty");
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn parse_config_value(key: &str, value: &str) -> Result<toml::Value> {
        match key {
            k if k.starts_with("catalog.error_codes.") => Ok(toml::Value::Array(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|code| !code.is_empty())
                    .map(|code| toml::Value::String(code.to_string()))
                    .collect(),
            )),
            // Digit strings that must stay strings
            k if k.starts_with("ids.") => Ok(toml::Value::String(value.to_string())),
            k if k.ends_with("_ms") || k.ends_with("_seconds") || k.ends_with("_attempts") => {
                let num: i64 = value.parse().context("Expected integer value")?;
                Ok(toml::Value::Integer(num))
            }
            _ => {
                if let Ok(b) = value.parse::<bool>() {
                    Ok(toml::Value::Boolean(b))
                } else if let Ok(i) = value.parse::<i64>() {
                    Ok(toml::Value::Integer(i))
                } else {
                    Ok(toml::Value::String(value.to_string()))
                }
            }
        }
    }
}

fn render_value(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Array(values) => Some(
            values
                .iter()
                .filter_map(render_value)
                .collect::<Vec<_>>()
                .join(","),
        ),
        _ => None,
    }
}

/// Load the configuration from the default location
pub fn get_config() -> Result<AppConfig> {
    ConfigManager::new().load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn manager(temp: &TempDir) -> ConfigManager {
        ConfigManager::with_path(temp.path().join("config.toml"))
    }

    #[test]
    #[serial]
    fn test_defaults() {
        let temp = TempDir::new().unwrap();
        let config = manager(&temp).load().unwrap();

        assert_eq!(config.catalog.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.moves.max_create_attempts, 5);
        assert_eq!(config.ids, IdRules::default());
        assert_eq!(config.credentials.account, "bib-sandbox");

        let moves = config.move_config().unwrap();
        assert_eq!(moves.post_delete_delay, Duration::from_secs(1));
        assert_eq!(moves.create_retry_delay, Duration::from_secs(2));
    }

    #[test]
    #[serial]
    fn test_set_and_get() {
        let temp = TempDir::new().unwrap();
        let mut manager = manager(&temp);

        manager.set("moves.max_create_attempts", "3").unwrap();
        manager.set("ids.holding_prefix", "22").unwrap();
        manager
            .set("catalog.error_codes.barcode_conflict", "401873, 401874")
            .unwrap();

        assert_eq!(manager.get("moves.max_create_attempts").unwrap(), "3");
        assert_eq!(manager.get("ids.holding_prefix").unwrap(), "22");
        assert_eq!(
            manager.get("catalog.error_codes.barcode_conflict").unwrap(),
            "401873,401874"
        );

        let config = manager.load().unwrap();
        assert_eq!(config.moves.max_create_attempts, 3);
        assert_eq!(
            config.catalog.error_codes.barcode_conflict,
            vec!["401873", "401874"]
        );
        assert_eq!(
            config.catalog.error_codes.policy_blocked,
            ErrorCodeMap::default().policy_blocked
        );
    }

    #[test]
    #[serial]
    fn test_invalid_values_rejected() {
        let temp = TempDir::new().unwrap();
        let mut manager = manager(&temp);

        assert!(manager.set("moves.max_create_attempts", "0").is_err());
        assert!(manager.set("catalog.timeout_seconds", "soon").is_err());
        assert!(manager.set("ids.bib_prefix", "9a").is_err());
        assert!(manager.set("catalog.base_url", "ftp://x").is_err());
        assert!(!temp.path().join("config.toml").exists());
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let temp = TempDir::new().unwrap();
        let mut manager = manager(&temp);
        manager.set("moves.post_delete_delay_ms", "500").unwrap();

        unsafe { std::env::set_var("MULTIHOL_MOVES__POST_DELETE_DELAY_MS", "0") };
        let config = manager.load();
        unsafe { std::env::remove_var("MULTIHOL_MOVES__POST_DELETE_DELAY_MS") };

        assert_eq!(config.unwrap().moves.post_delete_delay_ms, 0);
    }

    #[test]
    #[serial]
    fn test_list_includes_sections() {
        let temp = TempDir::new().unwrap();
        let items = manager(&temp).list().unwrap();
        let keys: Vec<_> = items.iter().map(|(k, _)| k.as_str()).collect();

        assert!(keys.contains(&"catalog.base_url"));
        assert!(keys.contains(&"catalog.error_codes.policy_blocked"));
        assert!(keys.contains(&"moves.max_create_attempts"));
        assert!(keys.contains(&"backup.directory"));
        assert!(keys.contains(&"ids.institution_suffix"));
        assert!(keys.contains(&"credentials.account"));
    }

    #[test]
    #[serial]
    fn test_unknown_key() {
        let temp = TempDir::new().unwrap();
        assert!(manager(&temp).get("catalog.nope").is_err());
    }
}
