//! Configuration management for entregas.
//!
//! Loads configuration from ${ENTREGAS_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Env var overriding `[api].base_url`.
pub const BASE_URL_ENV: &str = "ENTREGAS_API_BASE_URL";
/// Env var overriding `[api].timeout_secs`.
pub const TIMEOUT_ENV: &str = "ENTREGAS_API_TIMEOUT_SECS";
/// Production backend.
pub const DEFAULT_BASE_URL: &str = "https://entregasplus.onrender.com";

pub mod paths {
    //! Path resolution for entregas configuration and data directories.
    //!
    //! ENTREGAS_HOME resolution order:
    //! 1. ENTREGAS_HOME environment variable (if set)
    //! 2. ~/.config/entregas (default)
    //! 3. ./.entregas when no home directory can be determined

    use std::path::PathBuf;

    pub fn entregas_home() -> PathBuf {
        if let Ok(home) = std::env::var("ENTREGAS_HOME") {
            if !home.trim().is_empty() {
                return PathBuf::from(home);
            }
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".entregas"),
            |h| h.join(".config").join("entregas"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        entregas_home().join("config.toml")
    }

    /// Returns the path to the persisted key-value store.
    pub fn storage_path() -> PathBuf {
        entregas_home().join("storage.json")
    }

    /// Returns the directory for rolling log files.
    pub fn logs_dir() -> PathBuf {
        entregas_home().join("logs")
    }
}

/// How a stored session is treated at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RestorePolicy {
    /// Keep the session only if the previous run went to the background
    /// within the grace window.
    #[default]
    Lifecycle,
    /// Trust any stored token.
    Always,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: Config::DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub restore_policy: RestorePolicy,
    pub background_grace_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            restore_policy: RestorePolicy::Lifecycle,
            background_grace_secs: Config::DEFAULT_BACKGROUND_GRACE_SECS,
        }
    }
}

impl SessionConfig {
    pub fn background_grace(&self) -> Duration {
        Duration::from_secs(self.background_grace_secs)
    }
}

/// Device identity reported with login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: None,
            kind: "desktop".to_string(),
        }
    }
}

impl DeviceConfig {
    /// Configured name, else `HOSTNAME`, else a fixed label.
    pub fn effective_name(&self) -> String {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| {
                std::env::var("HOSTNAME")
                    .ok()
                    .filter(|h| !h.trim().is_empty())
            })
            .unwrap_or_else(|| "entregas-cli".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: false,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub device: DeviceConfig,
    pub log: LoggingConfig,
}

fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Merges user config values into the default template, keeping the
/// template's comments and any sections the user file lacks.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;
    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source.iter() {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

impl Config {
    const DEFAULT_TIMEOUT_SECS: u64 = 60;
    const DEFAULT_BACKGROUND_GRACE_SECS: u64 = 300;

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Base URL: env var, then `[api].base_url`, then the production backend.
    ///
    /// # Errors
    /// Returns an error if the chosen URL does not parse.
    pub fn effective_base_url(&self) -> Result<String> {
        resolve_base_url(self.api.base_url.as_deref(), BASE_URL_ENV, DEFAULT_BASE_URL)
    }

    /// Request timeout: env var, then `[api].timeout_secs`.
    ///
    /// Unparseable or zero env values fall back to the config value.
    pub fn effective_timeout(&self) -> Duration {
        let secs = std::env::var(TIMEOUT_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|s| *s > 0)
            .unwrap_or(self.api.timeout_secs);
        Duration::from_secs(if secs == 0 {
            Self::DEFAULT_TIMEOUT_SECS
        } else {
            secs
        })
    }

    /// Saves only `[api].base_url` to the config file, preserving comments.
    pub fn save_base_url(url: &str) -> Result<()> {
        Self::save_base_url_to(&paths::config_path(), url)
    }

    /// Saves only `[api].base_url` to a specific config file path.
    ///
    /// Creates the file with default template if it doesn't exist.
    /// If file exists, merges user values into the latest template.
    pub fn save_base_url_to(path: &Path, url: &str) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        let trimmed = url.trim();
        url::Url::parse(trimmed).with_context(|| format!("Invalid base URL: {trimmed}"))?;

        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        doc["api"]["base_url"] = value(trimmed);

        Self::write_config(path, &doc.to_string())
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Generates a fresh config TOML from Rust defaults.
    ///
    /// Used by `xtask update-default-config` to keep `default_config.toml`
    /// in sync with `Config::default()`.
    pub fn generate() -> Result<String> {
        use toml_edit::DocumentMut;

        let generated_toml = toml::to_string(&Config::default())
            .context("Failed to serialize default config to TOML")?;

        let mut doc: DocumentMut = default_config_template()
            .parse()
            .context("Failed to parse default config template")?;
        let generated_doc: DocumentMut = generated_toml
            .parse()
            .context("Failed to parse generated config")?;

        merge_items(doc.as_table_mut(), generated_doc.as_table());

        Ok(doc.to_string())
    }

    /// Writes config content via a temp file + rename, creating parent
    /// directories as needed.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to move {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

/// Resolves a base URL from env var, config value, or default.
///
/// # Errors
/// Returns an error if an env or config URL is malformed.
pub fn resolve_base_url(
    config_base_url: Option<&str>,
    env_var: &str,
    default_url: &str,
) -> Result<String> {
    if let Ok(env_url) = std::env::var(env_var) {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    if let Some(config_url) = config_base_url {
        let trimmed = config_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    Ok(default_url.to_string())
}

fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid base URL: {url}"))?;
    Ok(())
}
