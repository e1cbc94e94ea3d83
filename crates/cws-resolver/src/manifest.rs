use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

/// Rule-set keys containing this tag apply to the desktop store.
pub const DESKTOP_TAG: &str = "desktop";

/// Per-variant store descriptor, read from `manifest.json`.
///
/// Maps are ordered so lookups over them are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    /// Logical provider name to script path, relative to the manifest.
    #[serde(default, deserialize_with = "nullable")]
    pub providers: BTreeMap<String, String>,
    /// Rule-set key to YAML path, relative to the manifest.
    #[serde(
        default,
        rename = "rulesets",
        alias = "ruleSets",
        deserialize_with = "nullable"
    )]
    pub rule_sets: BTreeMap<String, String>,
}

impl Manifest {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Nothing declared at all.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty() && self.rule_sets.is_empty()
    }

    /// File of the lexicographically first rule set tagged `desktop`.
    ///
    /// An empty file name counts as no selection.
    pub fn desktop_rule_set(&self) -> Option<&str> {
        self.rule_sets
            .iter()
            .find(|(key, _)| key.contains(DESKTOP_TAG))
            .map(|(_, file)| file.as_str())
            .filter(|file| !file.is_empty())
    }

    pub fn provider(&self, name: &str) -> Option<&str> {
        self.providers.get(name).map(String::as_str)
    }
}

/// The part of a rule-set YAML file the resolver cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RuleSet {
    /// Empty when no external provider applies.
    #[serde(
        default,
        rename = "loadExternalProvider",
        deserialize_with = "nullable"
    )]
    pub provider_name: String,
}

impl RuleSet {
    /// Parses a rule set; an empty or `null` document yields the empty rule set.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if is_blank_document(text) {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str::<Option<Self>>(text)?.unwrap_or_default())
    }
}

/// Only whitespace, comments and document markers.
fn is_blank_document(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#') || line == "---" || line == "...")
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
