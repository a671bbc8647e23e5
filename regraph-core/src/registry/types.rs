use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical component metadata, after wire-format quirks are normalized.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRecord {
    pub code_url: Option<String>,
    pub global_css_url: Option<String>,
    pub tailwind_config_url: Option<String>,
    pub npm_dependencies: BTreeMap<String, String>,
    pub registry_dependencies: Vec<String>,
}

/// Component metadata as the lookup service sends it.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentPayload {
    #[serde(default)]
    pub code_url: Option<String>,
    #[serde(default, alias = "cssUrl")]
    pub global_css_url: Option<String>,
    #[serde(default, alias = "tailwindConfigExtensionUrl")]
    pub tailwind_config_url: Option<String>,
    #[serde(default, alias = "dependencies")]
    pub npm_dependencies: Option<DependencyMap>,
    #[serde(default, alias = "directRegistryDependencies")]
    pub registry_dependencies: Option<RegistryDependencies>,
}

/// Registry dependency declarations arrive either as a list or as a JSON
/// string holding that list.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum RegistryDependencies {
    List(Vec<String>),
    Serialized(String),
}

impl RegistryDependencies {
    pub fn normalize(self, origin: &str) -> Vec<String> {
        let list = match self {
            RegistryDependencies::List(list) => list,
            RegistryDependencies::Serialized(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Vec::new();
                }

                match serde_json::from_str::<Vec<String>>(trimmed) {
                    Ok(list) => list,
                    Err(err) => {
                        tracing::warn!(
                            component = origin,
                            error = %err,
                            "malformed registry dependency declaration, treating as empty"
                        );
                        return Vec::new();
                    }
                }
            }
        };

        let mut seen = Vec::with_capacity(list.len());
        for entry in list {
            let entry = entry.trim().to_string();
            if !entry.is_empty() && !seen.contains(&entry) {
                seen.push(entry);
            }
        }
        seen
    }
}

/// npm dependencies share the same list-or-string ambiguity.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum DependencyMap {
    Map(BTreeMap<String, String>),
    Serialized(String),
}

impl DependencyMap {
    pub fn normalize(self, origin: &str) -> BTreeMap<String, String> {
        match self {
            DependencyMap::Map(map) => map,
            DependencyMap::Serialized(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return BTreeMap::new();
                }

                serde_json::from_str(trimmed).unwrap_or_else(|err| {
                    tracing::warn!(
                        component = origin,
                        error = %err,
                        "malformed npm dependency declaration, treating as empty"
                    );
                    BTreeMap::new()
                })
            }
        }
    }
}

impl ComponentPayload {
    pub fn into_record(self, origin: &str) -> ComponentRecord {
        ComponentRecord {
            code_url: non_empty(self.code_url),
            global_css_url: non_empty(self.global_css_url),
            tailwind_config_url: non_empty(self.tailwind_config_url),
            npm_dependencies: self
                .npm_dependencies
                .map(|deps| deps.normalize(origin))
                .unwrap_or_default(),
            registry_dependencies: self
                .registry_dependencies
                .map(|deps| deps.normalize(origin))
                .unwrap_or_default(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
