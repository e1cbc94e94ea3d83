//! Constants used across the cws-publish workspace.

/// Binary name, also used to derive the default config file name.
pub const APP_NAME: &str = "cws-publish";

/// Chrome Web Store item the `upload` command targets.
pub const EXTENSION_ID_KEY: &str = "extension.id";

/// OAuth2 client credentials used for the refresh-token grant.
pub const CLIENT_ID_KEY: &str = "google.client.id";
pub const CLIENT_SECRET_KEY: &str = "google.client.secret";
pub const REFRESH_TOKEN_KEY: &str = "google.refresh.token";

/// Logging knobs.
pub const LOG_LEVEL_KEY: &str = "log.level";
pub const LOG_TIMESTAMP_KEY: &str = "log.timestamp";

pub const DEFAULT_LOG_LEVEL: &str = "debug";

/// Flag names reported when a required command-line value is empty.
pub const ZIP_PATH_FLAG: &str = "zipPath";
pub const SRC_FLAG: &str = "src";
pub const DEST_FLAG: &str = "dest";
