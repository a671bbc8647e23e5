use super::{ComponentLookup, ComponentPayload, DependencyMap, Lookup, RegistryDependencies};
use crate::fetch::ArtifactFetcher;
use crate::{RegraphError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// One component as written in a fixture file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureComponent {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub global_css: Option<String>,
    #[serde(default)]
    pub tailwind_config: Option<String>,
    #[serde(default)]
    pub npm_dependencies: Option<DependencyMap>,
    #[serde(default)]
    pub registry_dependencies: Option<RegistryDependencies>,
}

impl FixtureComponent {
    pub fn code(code: &str) -> Self {
        FixtureComponent {
            code: Some(code.to_string()),
            ..FixtureComponent::default()
        }
    }

    pub fn depends_on(mut self, deps: &[&str]) -> Self {
        self.registry_dependencies = Some(RegistryDependencies::List(
            deps.iter().map(|d| d.to_string()).collect(),
        ));
        self
    }

    pub fn with_tailwind(mut self, config: &str) -> Self {
        self.tailwind_config = Some(config.to_string());
        self
    }

    pub fn with_css(mut self, css: &str) -> Self {
        self.global_css = Some(css.to_string());
        self
    }

    pub fn with_npm(mut self, name: &str, range: &str) -> Self {
        let mut map = match self.npm_dependencies.take() {
            Some(deps) => deps.normalize("fixture"),
            None => BTreeMap::new(),
        };
        map.insert(name.to_string(), range.to_string());
        self.npm_dependencies = Some(DependencyMap::Map(map));
        self
    }
}

#[derive(Debug, Default, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    components: BTreeMap<String, FixtureComponent>,
}

/// In-process registry serving both metadata and artifacts.
///
/// Artifacts live under synthetic `memory://author/slug/<kind>` URLs.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    records: BTreeMap<(String, String), ComponentPayload>,
    artifacts: BTreeMap<String, String>,
    broken: BTreeSet<String>,
    unavailable: AtomicBool,
    lookups: AtomicUsize,
    fetches: AtomicUsize,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        MemoryRegistry::default()
    }

    pub fn from_fixture(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|source| RegraphError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        let file: FixtureFile =
            serde_json::from_str(&data).map_err(|source| RegraphError::ParseJson {
                path: path.to_path_buf(),
                source,
            })?;

        let mut registry = MemoryRegistry::new();

        for (key, component) in file.components {
            let Some((author, slug)) = key.split_once('/') else {
                return Err(RegraphError::Fixture {
                    path: path.to_path_buf(),
                    reason: format!("component key `{key}` is not author/slug"),
                });
            };
            registry.insert(author, slug, component);
        }

        Ok(registry)
    }

    pub fn with_component(mut self, identifier: &str, component: FixtureComponent) -> Self {
        if let Some((author, slug)) = identifier.split_once('/') {
            self.insert(author, slug, component);
        }
        self
    }

    pub fn insert(&mut self, author: &str, slug: &str, component: FixtureComponent) {
        let mut payload = ComponentPayload {
            npm_dependencies: component.npm_dependencies,
            registry_dependencies: component.registry_dependencies,
            ..ComponentPayload::default()
        };

        if let Some(code) = component.code {
            let url = artifact_url(author, slug, "code.tsx");
            self.artifacts.insert(url.clone(), code);
            payload.code_url = Some(url);
        }

        if let Some(css) = component.global_css {
            let url = artifact_url(author, slug, "globals.css");
            self.artifacts.insert(url.clone(), css);
            payload.global_css_url = Some(url);
        }

        if let Some(config) = component.tailwind_config {
            let url = artifact_url(author, slug, "tailwind.config.js");
            self.artifacts.insert(url.clone(), config);
            payload.tailwind_config_url = Some(url);
        }

        self.records
            .insert((author.to_string(), slug.to_string()), payload);
    }

    /// Makes every artifact of `identifier` fail to fetch while keeping its metadata.
    pub fn break_artifacts(mut self, identifier: &str) -> Self {
        let prefix = format!("memory://{}/", identifier);
        let urls: Vec<String> = self
            .artifacts
            .keys()
            .filter(|url| url.starts_with(&prefix))
            .cloned()
            .collect();
        self.broken.extend(urls);
        self
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn artifact_url(author: &str, slug: &str, kind: &str) -> String {
    format!("memory://{}/{}/{}", author, slug, kind)
}

impl ComponentLookup for MemoryRegistry {
    async fn lookup(&self, author: &str, slug: &str) -> Result<Lookup> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RegraphError::ServiceUnavailable {
                url: format!("memory://{}/{}", author, slug),
                reason: "registry marked unavailable".into(),
            });
        }

        if let Some(payload) = self.records.get(&(author.to_string(), slug.to_string())) {
            let origin = format!("{author}/{slug}");
            return Ok(Lookup::Found(payload.clone().into_record(&origin)));
        }

        if self.records.keys().any(|(a, _)| a == author) {
            Ok(Lookup::ComponentNotFound)
        } else {
            Ok(Lookup::UserNotFound)
        }
    }
}

impl ArtifactFetcher for MemoryRegistry {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if self.broken.contains(url) {
            return Err(RegraphError::Fetch {
                url: url.to_string(),
                reason: "artifact storage returned an error".into(),
            });
        }

        self.artifacts
            .get(url)
            .cloned()
            .ok_or_else(|| RegraphError::Fetch {
                url: url.to_string(),
                reason: "no such artifact".into(),
            })
    }
}
