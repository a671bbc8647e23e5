use super::resolve::resolve_component;
use crate::config::RegraphConfig;
use crate::fetch::ArtifactFetcher;
use crate::flatten::{FlatDependencySet, flatten};
use crate::registry::ComponentLookup;
use crate::resolve::{ResolutionIssue, ResolvedComponent};
use crate::sandbox::{SandboxFiles, assemble};
use crate::style::{MergedStyleBundle, StyleFragment, StyleMerger};
use crate::Result;
use serde::Serialize;

/// Everything needed to render one component and to explain how it was built.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewBundle {
    pub identifier: String,
    pub root: Option<ResolvedComponent>,
    pub dependencies: FlatDependencySet,
    #[serde(skip)]
    pub styles: MergedStyleBundle,
    pub files: SandboxFiles,
    pub issues: Vec<ResolutionIssue>,
}

impl PreviewBundle {
    pub fn is_resolved(&self) -> bool {
        self.root.is_some()
    }
}

/// Style fragments in merge order: the root first, then its dependencies.
pub fn collect_fragments(
    root: &ResolvedComponent,
    dependencies: &FlatDependencySet,
) -> Vec<StyleFragment> {
    std::iter::once(root)
        .chain(dependencies.nodes())
        .filter(|node| node.tailwind_config.is_some() || node.global_css.is_some())
        .map(ResolvedComponent::style_fragment)
        .collect()
}

pub async fn build_preview<L, F>(
    config: &RegraphConfig,
    lookup: &L,
    fetcher: &F,
    identifier: &str,
) -> Result<PreviewBundle>
where
    L: ComponentLookup,
    F: ArtifactFetcher,
{
    let merger = StyleMerger::from_config(config)?;
    let resolution = resolve_component(config, lookup, fetcher, identifier).await?;

    let Some(root) = resolution.root else {
        tracing::warn!(%identifier, "root component did not resolve, nothing to preview");
        return Ok(PreviewBundle {
            identifier: identifier.to_string(),
            root: None,
            dependencies: FlatDependencySet::default(),
            styles: merger.merge(&[]),
            files: SandboxFiles::default(),
            issues: resolution.issues,
        });
    };

    let dependencies = flatten(Some(&root), true);
    let fragments = collect_fragments(&root, &dependencies);
    let styles = merger.merge(&fragments);

    let root_code = match root.code.as_deref() {
        Some(code) => code,
        None => {
            tracing::warn!(%identifier, "root component has no code, App.tsx left empty");
            ""
        }
    };

    let files = assemble(root_code, &dependencies, &styles, &root.npm_dependencies);

    tracing::debug!(
        %identifier,
        dependencies = dependencies.len(),
        style_fragments = fragments.len(),
        files = files.len(),
        fell_back = styles.fell_back,
        "preview assembled"
    );

    Ok(PreviewBundle {
        identifier: identifier.to_string(),
        root: Some(root),
        dependencies,
        styles,
        files,
        issues: resolution.issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RegraphError;
    use crate::registry::{FixtureComponent, MemoryRegistry};
    use crate::resolve::IssueKind;
    use crate::style::{DEFAULT_GLOBAL_CSS, DEFAULT_TAILWIND_CONFIG};

    fn graph() -> MemoryRegistry {
        MemoryRegistry::new()
            .with_component(
                "acme/a",
                FixtureComponent::code("export default function A() {}")
                    .depends_on(&["acme/b", "acme/c"])
                    .with_npm("react", "^18.2.0"),
            )
            .with_component(
                "acme/b",
                FixtureComponent::code("export const B = 1")
                    .depends_on(&["acme/c"])
                    .with_npm("framer-motion", "^10.0.0"),
            )
            .with_component(
                "acme/c",
                FixtureComponent::code("export const C = 1")
                    .with_tailwind(
                        "module.exports = { theme: { extend: { colors: { brand: '#123456' } } } }",
                    )
                    .with_npm("framer-motion", "^11.0.0"),
            )
    }

    #[tokio::test]
    async fn shared_dependency_with_brand_color() {
        let registry = graph();
        let bundle = build_preview(&RegraphConfig::default(), &registry, &registry, "acme/a")
            .await
            .unwrap();

        let flat: Vec<&str> = bundle.dependencies.identifiers().collect();
        assert_eq!(flat, vec!["acme/b", "acme/c"]);
        assert!(!bundle.dependencies.contains("acme/a"));

        let config = bundle.files.get("/tailwind.config.js").unwrap();
        assert_eq!(config.matches("brand: \"#123456\"").count(), 1);
        assert_eq!(bundle.files.get("/globals.css"), Some(DEFAULT_GLOBAL_CSS));

        assert_eq!(
            bundle.files.get("/App.tsx"),
            Some("export default function A() {}")
        );
        assert!(bundle.files.get("/components/acme/b.tsx").is_some());
        assert!(bundle.files.get("/components/acme/c.tsx").is_some());

        let manifest: serde_json::Value =
            serde_json::from_str(bundle.files.get("/package.json").unwrap()).unwrap();
        assert_eq!(manifest["dependencies"]["framer-motion"], "^11.0.0");
        assert_eq!(manifest["dependencies"]["react"], "^18.2.0");
        assert!(bundle.issues.is_empty());
    }

    #[tokio::test]
    async fn unresolved_root_yields_empty_bundle() {
        let registry = graph();
        for id in ["invalid-slug-format", "acme/missing", "nobody/x"] {
            let bundle = build_preview(&RegraphConfig::default(), &registry, &registry, id)
                .await
                .unwrap();
            assert!(!bundle.is_resolved());
            assert!(bundle.dependencies.is_empty());
            assert!(bundle.files.is_empty());
            assert_eq!(bundle.styles.tailwind_config, DEFAULT_TAILWIND_CONFIG);
        }
    }

    #[tokio::test]
    async fn shallow_depth_truncates_flat_set() {
        let registry = graph();
        let depth = |max_depth| RegraphConfig {
            max_depth,
            ..RegraphConfig::default()
        };

        // The root still resolves at depth 0; its children are cut off.
        let bundle = build_preview(&depth(1), &registry, &registry, "acme/a").await.unwrap();
        let root = bundle.root.as_ref().unwrap();
        assert_eq!(root.registry_dependency_tree.len(), 2);
        assert_eq!(root.registry_dependency_tree.get("acme/b"), Some(&None));
        assert!(bundle.issues.iter().all(|i| i.kind == IssueKind::DepthLimit && i.depth == 1));
        let flat_with_root = flatten(Some(root), false);
        let with_root: Vec<&str> = flat_with_root.identifiers().collect();
        assert_eq!(with_root, vec!["acme/a"]);
        assert!(bundle.dependencies.is_empty());
        assert_eq!(bundle.files.len(), 4);

        // Depth-1 nodes resolve, anything deeper is omitted.
        let bundle = build_preview(&depth(2), &registry, &registry, "acme/a").await.unwrap();
        let flat: Vec<&str> = bundle.dependencies.identifiers().collect();
        assert_eq!(flat, vec!["acme/b", "acme/c"]);
        let b = bundle.dependencies.get("acme/b").unwrap();
        assert_eq!(b.registry_dependency_tree.get("acme/c"), Some(&None));
        assert_eq!(bundle.issues.len(), 1);
        assert_eq!(bundle.issues[0].depth, 2);
    }

    #[tokio::test]
    async fn broken_fragment_falls_back_without_failing() {
        let registry = graph().with_component(
            "acme/d",
            FixtureComponent::code("d").with_css(".broken { color: red;"),
        );
        let registry = registry.with_component(
            "acme/root",
            FixtureComponent::code("r").depends_on(&["acme/c", "acme/d"]),
        );

        let bundle = build_preview(&RegraphConfig::default(), &registry, &registry, "acme/root")
            .await
            .unwrap();
        assert!(bundle.styles.fell_back);
        assert_eq!(bundle.files.get("/tailwind.config.js"), Some(DEFAULT_TAILWIND_CONFIG));
        assert_eq!(bundle.dependencies.len(), 2);
    }

    #[tokio::test]
    async fn root_styles_come_first() {
        let registry = MemoryRegistry::new()
            .with_component(
                "x/root",
                FixtureComponent::code("r")
                    .depends_on(&["x/dep"])
                    .with_tailwind("module.exports = { theme: { extend: { colors: { brand: 'red' } } } }"),
            )
            .with_component(
                "x/dep",
                FixtureComponent::code("d")
                    .with_tailwind("module.exports = { theme: { extend: { colors: { brand: 'blue' } } } }"),
            );

        let bundle = build_preview(&RegraphConfig::default(), &registry, &registry, "x/root")
            .await
            .unwrap();
        let config = bundle.files.get("/tailwind.config.js").unwrap();
        assert!(config.contains("brand: \"red\""));
        assert!(!config.contains("blue"));
        assert_eq!(bundle.styles.notes.len(), 1);
        assert_eq!(bundle.styles.notes[0].origin, "x/dep");
    }

    #[tokio::test]
    async fn missing_base_file_is_an_error() {
        let registry = graph();
        let config = RegraphConfig {
            base_css_path: Some("/definitely/not/here.css".into()),
            ..RegraphConfig::default()
        };

        let err = build_preview(&config, &registry, &registry, "acme/a")
            .await
            .unwrap_err();
        assert!(matches!(err, RegraphError::ReadFile { .. }));
    }
}
