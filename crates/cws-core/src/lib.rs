//! Shared configuration layer for cws-publish.
//!
//! This crate loads layered settings (TOML file plus environment overrides)
//! and turns them into the validated per-command configurations consumed by
//! the store publisher and the store-config resolver.

pub mod config;
pub mod constants;
pub mod settings;

pub use config::{LogConfig, OAuthCredentials, PublishConfig, PublishTarget, ResolverConfig};
pub use settings::{Settings, SettingsError, SettingsFile};
