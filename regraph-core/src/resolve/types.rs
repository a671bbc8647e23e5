use crate::identifier::ComponentIdentifier;
use crate::style::StyleFragment;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// One node of a resolved dependency graph.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedComponent {
    pub identifier: ComponentIdentifier,
    pub author: String,
    pub component_slug: String,
    pub code: Option<String>,
    pub global_css: Option<String>,
    pub tailwind_config: Option<String>,
    pub npm_dependencies: BTreeMap<String, String>,
    pub registry_dependency_identifiers: Vec<String>,
    pub registry_dependency_tree: DependencyTree,
}

impl ResolvedComponent {
    pub fn style_fragment(&self) -> StyleFragment {
        StyleFragment {
            origin: self.identifier.to_string(),
            tailwind_config: self.tailwind_config.clone(),
            global_css: self.global_css.clone(),
        }
    }

    /// Number of nodes in this subtree, counting repeated dependencies each time.
    pub fn node_count(&self) -> usize {
        1 + self
            .registry_dependency_tree
            .iter()
            .filter_map(|(_, child)| child)
            .map(ResolvedComponent::node_count)
            .sum::<usize>()
    }
}

/// Declared dependency → resolved child, in declaration order. `None` marks a
/// dependency that could not be resolved or was cut off.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DependencyTree {
    entries: IndexMap<String, Option<ResolvedComponent>>,
}

impl DependencyTree {
    pub fn push(&mut self, identifier: String, node: Option<ResolvedComponent>) {
        self.entries.insert(identifier, node);
    }

    pub fn get(&self, identifier: &str) -> Option<&Option<ResolvedComponent>> {
        self.entries.get(identifier)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&ResolvedComponent>)> {
        self.entries
            .iter()
            .map(|(key, node)| (key.as_str(), node.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum IssueKind {
    InvalidIdentifier,
    Cycle,
    DepthLimit,
    UserNotFound,
    ComponentNotFound,
    FetchFailed { url: String },
}

/// A data failure that was recovered during resolution.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ResolutionIssue {
    pub depth: usize,
    pub identifier: String,
    #[serde(flatten)]
    pub kind: IssueKind,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Resolution {
    pub root: Option<ResolvedComponent>,
    pub issues: Vec<ResolutionIssue>,
}
