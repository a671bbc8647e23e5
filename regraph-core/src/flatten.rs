use crate::resolve::ResolvedComponent;
use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::Serialize;

/// Identifier → node, without duplicates, in depth-first pre-order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FlatDependencySet {
    nodes: IndexMap<String, ResolvedComponent>,
}

impl FlatDependencySet {
    fn insert(&mut self, node: &ResolvedComponent) -> bool {
        match self.nodes.entry(node.identifier.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(node.clone());
                true
            }
        }
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.nodes.contains_key(identifier)
    }

    pub fn get(&self, identifier: &str) -> Option<&ResolvedComponent> {
        self.nodes.get(identifier)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResolvedComponent)> {
        self.nodes.iter().map(|(key, node)| (key.as_str(), node))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ResolvedComponent> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Collects every resolved node under `root`. A node already collected is not
/// traversed again; absent dependencies are skipped.
pub fn flatten(root: Option<&ResolvedComponent>, exclude_root: bool) -> FlatDependencySet {
    let mut set = FlatDependencySet::default();

    let Some(root) = root else {
        return set;
    };

    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if !set.insert(node) {
            continue;
        }

        let children: Vec<&ResolvedComponent> = node
            .registry_dependency_tree
            .iter()
            .filter_map(|(_, child)| child)
            .collect();
        stack.extend(children.into_iter().rev());
    }

    if exclude_root {
        set.nodes.shift_remove(&root.identifier.to_string());
    }

    tracing::debug!(
        root = %root.identifier,
        nodes = set.len(),
        exclude_root,
        "dependency tree flattened"
    );

    set
}
