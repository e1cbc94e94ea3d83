use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::constants::*;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{0} is required")]
    Missing(String),
    #[error("{key} must be a boolean, got '{value}'")]
    InvalidBool { key: String, value: String },
    #[error("publish target '{0}' is invalid (allowed: default, trustedTesters)")]
    InvalidPublishTarget(String),
    #[error("failed to read config file: {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML config: {}", path.display())]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to parse YAML config: {}", path.display())]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Shape of the config file. Unknown keys are ignored.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SettingsFile {
    pub extension: ExtensionSection,
    pub google: GoogleSection,
    pub log: LogSection,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExtensionSection {
    pub id: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GoogleSection {
    pub client: ClientSection,
    pub refresh: RefreshSection,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    pub id: Option<String>,
    pub secret: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RefreshSection {
    pub token: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub level: Option<String>,
    pub timestamp: Option<bool>,
}

impl SettingsFile {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// An empty document is an empty config.
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str::<Option<Self>>(text)?.unwrap_or_default())
    }

    /// File value behind one of the dotted setting keys.
    fn value(&self, key: &str) -> Option<String> {
        match key {
            EXTENSION_ID_KEY => self.extension.id.clone(),
            CLIENT_ID_KEY => self.google.client.id.clone(),
            CLIENT_SECRET_KEY => self.google.client.secret.clone(),
            REFRESH_TOKEN_KEY => self.google.refresh.token.clone(),
            LOG_LEVEL_KEY => self.log.level.clone(),
            LOG_TIMESTAMP_KEY => self.log.timestamp.map(|b| b.to_string()),
            _ => None,
        }
    }
}

/// Layered settings for a single run.
///
/// Keys are dotted paths (`google.client.id`). An environment variable
/// named after the key, upper-cased with dots replaced by underscores
/// (`GOOGLE_CLIENT_ID`), takes precedence over the file value.
#[derive(Debug, Default, Clone)]
pub struct Settings {
    file: SettingsFile,
    env: HashMap<String, String>,
    source: Option<PathBuf>,
}

impl Settings {
    /// Loads the config file and captures the process environment.
    ///
    /// An explicit path must exist. Without one, the first of
    /// `$HOME/.cws-publish.{yaml,yml,toml}` is used when present.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        let settings = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) => Self::from_file(&path)?,
                None => {
                    debug!("no config file found, using environment only");
                    Self::default()
                }
            },
        };

        Ok(settings.with_env(std::env::vars()))
    }

    /// Reads a config file; `.yaml`/`.yml` as YAML, anything else as TOML.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let file = if is_yaml(path) {
            SettingsFile::from_yaml_str(&text).map_err(|source| SettingsError::ParseYaml {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            SettingsFile::from_toml_str(&text).map_err(|source| SettingsError::ParseToml {
                path: path.to_path_buf(),
                source,
            })?
        };

        debug!("initialize config from {}", path.display());
        Ok(Self {
            file,
            source: Some(path.to_path_buf()),
            ..Self::default()
        })
    }

    pub fn from_file_settings(file: SettingsFile) -> Self {
        Self {
            file,
            ..Self::default()
        }
    }

    /// Replaces the environment layer.
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = vars
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self
    }

    /// The config file these settings were read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Looks up a dotted key. Empty environment values count as unset.
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.env.get(&env_key(key)).filter(|v| !v.is_empty()) {
            return Some(value.clone());
        }
        self.file.value(key)
    }

    /// Returns the non-empty value of `key` or [`SettingsError::Missing`].
    pub fn require(&self, key: &str) -> Result<String, SettingsError> {
        self.get(key)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| SettingsError::Missing(key.to_string()))
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, SettingsError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };

        match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(SettingsError::InvalidBool {
                key: key.to_string(),
                value,
            }),
        }
    }
}

/// First existing `$HOME/.cws-publish.{yaml,yml,toml}`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().and_then(|home| find_config_in(&home))
}

fn find_config_in(dir: &Path) -> Option<PathBuf> {
    ["yaml", "yml", "toml"]
        .iter()
        .map(|ext| dir.join(format!(".{APP_NAME}.{ext}")))
        .find(|path| path.is_file())
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

fn env_key(key: &str) -> String {
    key.replace('.', "_").to_ascii_uppercase()
}
