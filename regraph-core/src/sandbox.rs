use crate::flatten::FlatDependencySet;
use crate::style::MergedStyleBundle;
use crate::{RegraphError, Result};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_PATH: &str = "/App.tsx";
pub const TAILWIND_PATH: &str = "/tailwind.config.js";
pub const CSS_PATH: &str = "/globals.css";
pub const MANIFEST_PATH: &str = "/package.json";

/// Slash-rooted path → file content, ready for a preview compiler.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SandboxFiles {
    files: BTreeMap<String, String>,
}

impl SandboxFiles {
    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Writes every file below `dir`, returning the paths written.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.files.len());

        for (path, content) in &self.files {
            let target = dir.join(path.trim_start_matches('/'));

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|source| RegraphError::WriteFile {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }

            fs::write(&target, content).map_err(|source| RegraphError::WriteFile {
                path: target.clone(),
                source,
            })?;

            written.push(target);
        }

        Ok(written)
    }
}

pub fn component_path(author: &str, slug: &str) -> String {
    format!(
        "/components/{}/{}.tsx",
        sanitize_segment(author),
        sanitize_segment(slug)
    )
}

pub(crate) fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@') {
                c
            } else {
                '-'
            }
        })
        .collect();

    if cleaned.chars().all(|c| c == '.') {
        cleaned.replace('.', "_")
    } else {
        cleaned
    }
}

/// Appends `-2`, `-3`, ... to the file stem until `path` is unused.
fn free_path(files: &BTreeMap<String, String>, path: String) -> String {
    if !files.contains_key(&path) {
        return path;
    }

    let stem = path.trim_end_matches(".tsx").to_string();
    let mut n = 2;
    loop {
        let candidate = format!("{stem}-{n}.tsx");
        if !files.contains_key(&candidate) {
            tracing::warn!(%path, %candidate, "sandbox path already taken, using a suffixed path");
            return candidate;
        }
        n += 1;
    }
}

/// Unions npm dependencies in order; on a clash the newer constraint is kept.
pub fn merge_npm_dependencies<'a, I>(sources: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (&'a str, &'a BTreeMap<String, String>)>,
{
    let mut merged: BTreeMap<String, String> = BTreeMap::new();

    for (origin, deps) in sources {
        for (name, range) in deps {
            let Some(current) = merged.get(name) else {
                merged.insert(name.clone(), range.clone());
                continue;
            };

            if current == range {
                continue;
            }

            let winner = regraph_semver::newer_constraint(current, range).to_string();
            if winner != *current {
                tracing::debug!(
                    package = %name,
                    from = %current,
                    to = %winner,
                    component = origin,
                    "npm constraint raised"
                );
                merged.insert(name.clone(), winner);
            }
        }
    }

    merged
}

pub fn assemble(
    root_code: &str,
    flat: &FlatDependencySet,
    styles: &MergedStyleBundle,
    npm_dependencies: &BTreeMap<String, String>,
) -> SandboxFiles {
    let mut files = BTreeMap::new();
    files.insert(APP_PATH.to_string(), root_code.to_string());

    for (identifier, node) in flat.iter() {
        let Some(code) = &node.code else {
            tracing::warn!(%identifier, "component has no code, leaving it out of the sandbox");
            continue;
        };

        let path = free_path(&files, component_path(&node.author, &node.component_slug));
        files.insert(path, code.clone());
    }

    files.insert(TAILWIND_PATH.to_string(), styles.tailwind_config.clone());
    files.insert(CSS_PATH.to_string(), styles.global_css.clone());

    let sources = std::iter::once(("root", npm_dependencies)).chain(
        flat.iter()
            .map(|(identifier, node)| (identifier, &node.npm_dependencies)),
    );
    let dependencies = merge_npm_dependencies(sources);

    let manifest = json!({
        "name": "regraph-preview",
        "private": true,
        "main": APP_PATH,
        "dependencies": dependencies,
    });
    files.insert(MANIFEST_PATH.to_string(), format!("{:#}\n", manifest));

    SandboxFiles { files }
}
