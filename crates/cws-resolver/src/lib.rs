//! Store-config resolution.
//!
//! Each `{src}/*/manifest.json` names its providers and rule sets. The
//! desktop rule set picks a provider, whose script is copied to
//! `{dest}/{provider}.js`. Any missing link in that chain is a skip, not
//! an error.

pub mod manifest;
pub mod resolver;

pub use manifest::{Manifest, RuleSet};
pub use resolver::{
    find_manifests, resolve, resolve_one, Resolution, ResolveError, ResolveReport, SkipReason,
};
