use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::*;
use crate::settings::{Settings, SettingsError};

/// OAuth2 client credentials for the refresh-token grant.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Audience of a publish call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PublishTarget {
    #[default]
    Default,
    TrustedTesters,
}

impl PublishTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::TrustedTesters => "trustedTesters",
        }
    }
}

impl FromStr for PublishTarget {
    type Err = SettingsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "default" => Ok(Self::Default),
            "trustedTesters" => Ok(Self::TrustedTesters),
            other => Err(SettingsError::InvalidPublishTarget(other.to_string())),
        }
    }
}

impl fmt::Display for PublishTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the `upload` command needs, validated once up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishConfig {
    pub extension_id: String,
    pub credentials: OAuthCredentials,
    pub zip_path: PathBuf,
    pub publish: bool,
    pub target: PublishTarget,
}

impl PublishConfig {
    pub fn from_settings(
        settings: &Settings,
        zip_path: PathBuf,
        publish: bool,
        target: &str,
    ) -> Result<Self, SettingsError> {
        let extension_id = settings.require(EXTENSION_ID_KEY)?;
        let credentials = OAuthCredentials {
            client_id: settings.require(CLIENT_ID_KEY)?,
            client_secret: settings.require(CLIENT_SECRET_KEY)?,
            refresh_token: settings.require(REFRESH_TOKEN_KEY)?,
        };

        if zip_path.as_os_str().is_empty() {
            return Err(SettingsError::Missing(ZIP_PATH_FLAG.to_string()));
        }
        let target = target.parse()?;

        Ok(Self {
            extension_id,
            credentials,
            zip_path,
            publish,
            target,
        })
    }
}

/// Source and destination directories for `build-store-configs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
}

impl ResolverConfig {
    pub fn new(source_dir: PathBuf, dest_dir: PathBuf) -> Result<Self, SettingsError> {
        if source_dir.as_os_str().is_empty() {
            return Err(SettingsError::Missing(SRC_FLAG.to_string()));
        }
        if dest_dir.as_os_str().is_empty() {
            return Err(SettingsError::Missing(DEST_FLAG.to_string()));
        }
        Ok(Self {
            source_dir,
            dest_dir,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    pub timestamp: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            timestamp: true,
        }
    }
}

impl LogConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, SettingsError> {
        let defaults = Self::default();
        Ok(Self {
            level: settings.get(LOG_LEVEL_KEY).unwrap_or(defaults.level),
            timestamp: settings
                .get_bool(LOG_TIMESTAMP_KEY)?
                .unwrap_or(defaults.timestamp),
        })
    }
}
