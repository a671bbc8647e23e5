use crate::cache::RequestCache;
use crate::config::{DEFAULT_CONCURRENCY, DEFAULT_MAX_DEPTH, RegraphConfig};
use crate::fetch::ArtifactFetcher;
use crate::identifier::ComponentIdentifier;
use crate::registry::{ComponentLookup, Lookup};
use crate::{RegraphError, Result};
use async_recursion::async_recursion;
use futures::future::try_join_all;
use futures::lock::Mutex;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tokio::sync::{Semaphore, SemaphorePermit};

pub mod types;

pub use types::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolveOptions {
    pub max_depth: usize,
    /// Upper bound on lookups and fetches in flight at once.
    pub concurrency: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ResolveOptions {
    pub fn from_config(config: &RegraphConfig) -> Self {
        ResolveOptions {
            max_depth: config.max_depth,
            concurrency: config.concurrency.max(1),
        }
    }
}

pub struct Resolver<'a, L, F> {
    lookup: &'a L,
    fetcher: &'a F,
    options: ResolveOptions,
}

impl<'a, L, F> Resolver<'a, L, F>
where
    L: ComponentLookup,
    F: ArtifactFetcher,
{
    pub fn new(lookup: &'a L, fetcher: &'a F, options: ResolveOptions) -> Self {
        Resolver {
            lookup,
            fetcher,
            options,
        }
    }

    pub fn options(&self) -> ResolveOptions {
        self.options
    }

    /// Resolves the full dependency tree of `identifier`. `Ok(None)` covers every
    /// recoverable failure of the root; `Err` only when the lookup service is
    /// unavailable.
    pub async fn resolve(&self, identifier: &str) -> Result<Option<ResolvedComponent>> {
        Ok(self.resolve_report(identifier).await?.root)
    }

    pub async fn resolve_report(&self, identifier: &str) -> Result<Resolution> {
        self.resolve_at(identifier, 0, &BTreeSet::new()).await
    }

    /// Resolves as if `identifier` sat at `current_depth` below the ancestors in
    /// `visited`. Each call gets its own request cache.
    pub async fn resolve_at(
        &self,
        identifier: &str,
        current_depth: usize,
        visited: &BTreeSet<String>,
    ) -> Result<Resolution> {
        let started = Instant::now();

        let session = Session {
            lookup: self.lookup,
            fetcher: self.fetcher,
            max_depth: self.options.max_depth,
            permits: Semaphore::new(self.options.concurrency.max(1)),
            cache: RequestCache::new(),
            issues: Mutex::new(Vec::new()),
        };

        let root = session
            .resolve_node(identifier.to_string(), current_depth, visited.clone())
            .await?;

        let lookups = session.cache.lookups.len().await;
        let mut issues = session.issues.into_inner();
        issues.sort();

        tracing::debug!(
            %identifier,
            nodes = root.as_ref().map(ResolvedComponent::node_count).unwrap_or(0),
            lookups,
            issues = issues.len(),
            elapsed = started.elapsed().as_secs_f64(),
            "resolution finished"
        );

        Ok(Resolution { root, issues })
    }

    /// Like [`Resolver::resolve_report`], abandoning all in-flight work once
    /// `timeout` elapses.
    pub async fn resolve_with_timeout(
        &self,
        identifier: &str,
        timeout: Duration,
    ) -> Result<Resolution> {
        match tokio::time::timeout(timeout, self.resolve_report(identifier)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(%identifier, ?timeout, "resolution deadline elapsed");
                Err(RegraphError::Cancelled {
                    identifier: identifier.to_string(),
                    reason: format!("deadline of {:.1}s elapsed", timeout.as_secs_f64()),
                })
            }
        }
    }
}

/// State shared by every branch of one resolution request.
struct Session<'a, L, F> {
    lookup: &'a L,
    fetcher: &'a F,
    max_depth: usize,
    permits: Semaphore,
    cache: RequestCache,
    issues: Mutex<Vec<ResolutionIssue>>,
}

impl<'a, L, F> Session<'a, L, F>
where
    L: ComponentLookup,
    F: ArtifactFetcher,
{
    async fn record(&self, depth: usize, identifier: &str, kind: IssueKind) {
        let mut issues = self.issues.lock().await;
        issues.push(ResolutionIssue {
            depth,
            identifier: identifier.to_string(),
            kind,
        });
    }

    async fn permit(&self, identifier: &str) -> Result<SemaphorePermit<'_>> {
        self.permits
            .acquire()
            .await
            .map_err(|_| RegraphError::Cancelled {
                identifier: identifier.to_string(),
                reason: "resolution was shut down".into(),
            })
    }

    /// `visited` is owned by this call: the ancestors of `identifier` on this
    /// branch only.
    #[async_recursion]
    async fn resolve_node(
        &self,
        identifier: String,
        depth: usize,
        visited: BTreeSet<String>,
    ) -> Result<Option<ResolvedComponent>> {
        let Some(id) = ComponentIdentifier::parse(&identifier) else {
            tracing::warn!(%identifier, "invalid component identifier, expected author/slug");
            self.record(depth, &identifier, IssueKind::InvalidIdentifier)
                .await;
            return Ok(None);
        };

        let key = id.to_string();

        if visited.contains(&key) {
            tracing::warn!(identifier = %key, depth, "dependency cycle detected, skipping branch");
            self.record(depth, &key, IssueKind::Cycle).await;
            return Ok(None);
        }

        if depth >= self.max_depth {
            tracing::info!(
                identifier = %key,
                depth,
                max_depth = self.max_depth,
                "maximum dependency depth reached"
            );
            self.record(depth, &key, IssueKind::DepthLimit).await;
            return Ok(None);
        }

        let record = match self.lookup_component(&id, &key).await? {
            Lookup::Found(record) => record,
            Lookup::UserNotFound => {
                tracing::warn!(identifier = %key, author = id.author(), "user not found");
                self.record(depth, &key, IssueKind::UserNotFound).await;
                return Ok(None);
            }
            Lookup::ComponentNotFound => {
                tracing::warn!(identifier = %key, "component not found");
                self.record(depth, &key, IssueKind::ComponentNotFound)
                    .await;
                return Ok(None);
            }
        };

        let mut branch = visited;
        branch.insert(key.clone());

        let artifacts = async {
            futures::join!(
                self.fetch_artifact(depth, &key, record.code_url.as_deref()),
                self.fetch_artifact(depth, &key, record.global_css_url.as_deref()),
                self.fetch_artifact(depth, &key, record.tailwind_config_url.as_deref()),
            )
        };

        let children = try_join_all(
            record
                .registry_dependencies
                .iter()
                .map(|dep| self.resolve_node(dep.clone(), depth + 1, branch.clone())),
        );

        let ((code, global_css, tailwind_config), children) =
            futures::join!(artifacts, children);
        let children = children?;

        let mut tree = DependencyTree::default();
        for (dep, child) in record.registry_dependencies.iter().zip(children) {
            tree.push(dep.clone(), child);
        }

        Ok(Some(ResolvedComponent {
            author: id.author().to_string(),
            component_slug: id.slug().to_string(),
            identifier: id,
            code,
            global_css,
            tailwind_config,
            npm_dependencies: record.npm_dependencies,
            registry_dependency_identifiers: record.registry_dependencies,
            registry_dependency_tree: tree,
        }))
    }

    async fn lookup_component(&self, id: &ComponentIdentifier, key: &str) -> Result<Lookup> {
        self.cache
            .lookups
            .get_or_try_init(key, || async move {
                let _permit = self.permit(key).await?;
                tracing::debug!(identifier = %key, "looking up component");
                self.lookup.lookup(id.author(), id.slug()).await
            })
            .await
    }

    /// A failed fetch leaves the artifact absent; it never fails the node.
    /// Every node sharing a failed URL gets its own issue entry.
    async fn fetch_artifact(&self, depth: usize, owner: &str, url: Option<&str>) -> Option<String> {
        let url = url?;

        let fetched = self
            .cache
            .artifacts
            .get_or_init(url, || async move {
                let _permit = match self.permit(owner).await {
                    Ok(permit) => permit,
                    Err(err) => {
                        tracing::warn!(identifier = %owner, %url, error = %err, "artifact fetch skipped");
                        return None;
                    }
                };

                match self.fetcher.fetch(url).await {
                    Ok(text) => Some(text),
                    Err(err) => {
                        tracing::warn!(identifier = %owner, %url, error = %err, "artifact fetch failed");
                        None
                    }
                }
            })
            .await;

        if fetched.is_none() {
            self.record(
                depth,
                owner,
                IssueKind::FetchFailed {
                    url: url.to_string(),
                },
            )
            .await;
        }

        fetched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{FixtureComponent, MemoryRegistry, RegistryDependencies};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn options(max_depth: usize) -> ResolveOptions {
        ResolveOptions {
            max_depth,
            concurrency: 4,
        }
    }

    async fn resolve(registry: &MemoryRegistry, id: &str, max_depth: usize) -> Resolution {
        Resolver::new(registry, registry, options(max_depth))
            .resolve_report(id)
            .await
            .unwrap()
    }

    fn child<'a>(node: &'a ResolvedComponent, id: &str) -> Option<&'a ResolvedComponent> {
        node.registry_dependency_tree.get(id).and_then(Option::as_ref)
    }

    #[tokio::test]
    async fn leaf_component_has_code_and_empty_tree() {
        let registry = MemoryRegistry::new()
            .with_component("shadcn/button", FixtureComponent::code("export function Button() {}"));

        let root = resolve(&registry, "shadcn/button", 10).await.root.unwrap();
        assert_eq!(root.author, "shadcn");
        assert_eq!(root.component_slug, "button");
        assert_eq!(root.code.as_deref(), Some("export function Button() {}"));
        assert!(root.registry_dependency_tree.is_empty());
        assert!(root.registry_dependency_identifiers.is_empty());
    }

    #[tokio::test]
    async fn invalid_and_missing_roots_are_absent() {
        let registry =
            MemoryRegistry::new().with_component("shadcn/button", FixtureComponent::code("x"));

        for id in [
            "invalid-slug-format",
            "nonexistent-user/x",
            "shadcn/nonexistent-component",
            "a/b/c",
            "/b",
        ] {
            let report = resolve(&registry, id, 10).await;
            assert!(report.root.is_none(), "{id} should not resolve");
            assert_eq!(report.issues.len(), 1);
        }

        let report = resolve(&registry, "nonexistent-user/x", 10).await;
        assert_eq!(report.issues[0].kind, IssueKind::UserNotFound);
        let report = resolve(&registry, "invalid-slug-format", 10).await;
        assert_eq!(report.issues[0].kind, IssueKind::InvalidIdentifier);
    }

    #[tokio::test]
    async fn depth_limit_truncates_without_lookup() {
        let registry = MemoryRegistry::new()
            .with_component("a/top", FixtureComponent::code("t").depends_on(&["a/mid"]))
            .with_component("a/mid", FixtureComponent::code("m").depends_on(&["a/leaf"]))
            .with_component("a/leaf", FixtureComponent::code("l"));

        let report = resolve(&registry, "a/top", 1).await;
        let root = report.root.unwrap();
        assert_eq!(root.registry_dependency_tree.get("a/mid"), Some(&None));
        assert_eq!(registry.lookup_count(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::DepthLimit);

        let root = resolve(&registry, "a/top", 2).await.root.unwrap();
        let mid = child(&root, "a/mid").unwrap();
        assert_eq!(mid.registry_dependency_tree.get("a/leaf"), Some(&None));

        let zero = resolve(&registry, "a/top", 0).await;
        assert!(zero.root.is_none());
    }

    #[tokio::test]
    async fn cycles_terminate_on_the_branch() {
        let registry = MemoryRegistry::new()
            .with_component("a/one", FixtureComponent::code("1").depends_on(&["a/two"]))
            .with_component("a/two", FixtureComponent::code("2").depends_on(&["a/one"]));

        let report = resolve(&registry, "a/one", 10).await;
        let root = report.root.unwrap();
        let two = child(&root, "a/two").unwrap();
        assert_eq!(two.registry_dependency_tree.get("a/one"), Some(&None));
        assert_eq!(
            report.issues,
            vec![ResolutionIssue {
                depth: 2,
                identifier: "a/one".into(),
                kind: IssueKind::Cycle,
            }]
        );
    }

    #[tokio::test]
    async fn siblings_may_share_a_dependency() {
        let registry = MemoryRegistry::new()
            .with_component("a/app", FixtureComponent::code("app").depends_on(&["a/left", "a/right"]))
            .with_component("a/left", FixtureComponent::code("l").depends_on(&["a/shared"]))
            .with_component("a/right", FixtureComponent::code("r").depends_on(&["a/shared"]))
            .with_component("a/shared", FixtureComponent::code("s"));

        let report = resolve(&registry, "a/app", 10).await;
        let root = report.root.unwrap();
        assert!(report.issues.is_empty());

        for side in ["a/left", "a/right"] {
            let node = child(&root, side).unwrap();
            assert_eq!(child(node, "a/shared").unwrap().code.as_deref(), Some("s"));
        }

        assert_eq!(root.node_count(), 5);
        assert_eq!(registry.lookup_count(), 4);
        assert_eq!(registry.fetch_count(), 4);
    }

    #[tokio::test]
    async fn tree_keeps_declaration_order() {
        let registry = MemoryRegistry::new()
            .with_component(
                "a/app",
                FixtureComponent::code("app").depends_on(&["a/zeta", "gone/x", "a/alpha"]),
            )
            .with_component("a/zeta", FixtureComponent::code("z"))
            .with_component("a/alpha", FixtureComponent::code("a"));

        let root = resolve(&registry, "a/app", 10).await.root.unwrap();
        let keys: Vec<&str> = root.registry_dependency_tree.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a/zeta", "gone/x", "a/alpha"]);
        assert_eq!(root.registry_dependency_identifiers, keys);
        assert_eq!(root.registry_dependency_tree.get("gone/x"), Some(&None));
    }

    #[tokio::test]
    async fn serialized_and_malformed_declarations() {
        let mut serialized = FixtureComponent::code("app");
        serialized.registry_dependencies =
            Some(RegistryDependencies::Serialized(r#"["a/dep"]"#.into()));
        let mut malformed = FixtureComponent::code("bad");
        malformed.registry_dependencies = Some(RegistryDependencies::Serialized("[a/dep".into()));

        let registry = MemoryRegistry::new()
            .with_component("a/app", serialized)
            .with_component("a/bad", malformed)
            .with_component("a/dep", FixtureComponent::code("d"));

        let app = resolve(&registry, "a/app", 10).await.root.unwrap();
        assert!(child(&app, "a/dep").is_some());

        let bad = resolve(&registry, "a/bad", 10).await.root.unwrap();
        assert!(bad.registry_dependency_tree.is_empty());
        assert_eq!(bad.code.as_deref(), Some("bad"));
    }

    #[tokio::test]
    async fn fetch_failure_degrades_the_node() {
        let registry = MemoryRegistry::new()
            .with_component("a/app", FixtureComponent::code("app").depends_on(&["a/dep"]))
            .with_component(
                "a/dep",
                FixtureComponent::code("d").with_css(":root { --x: 1; }"),
            )
            .break_artifacts("a/dep");

        let report = resolve(&registry, "a/app", 10).await;
        let dep = child(report.root.as_ref().unwrap(), "a/dep").unwrap();
        assert_eq!(dep.code, None);
        assert_eq!(dep.global_css, None);
        assert_eq!(report.issues.len(), 2);
        assert!(
            report
                .issues
                .iter()
                .all(|i| matches!(i.kind, IssueKind::FetchFailed { .. }))
        );
    }

    #[tokio::test]
    async fn shared_failed_fetch_is_reported_per_node() {
        let registry = MemoryRegistry::new()
            .with_component("a/app", FixtureComponent::code("app").depends_on(&["a/left", "a/right"]))
            .with_component("a/left", FixtureComponent::code("l").depends_on(&["a/shared"]))
            .with_component("a/right", FixtureComponent::code("r").depends_on(&["a/shared"]))
            .with_component("a/shared", FixtureComponent::code("s"))
            .break_artifacts("a/shared");

        let report = resolve(&registry, "a/app", 10).await;
        let root = report.root.unwrap();
        for side in ["a/left", "a/right"] {
            let shared = child(child(&root, side).unwrap(), "a/shared").unwrap();
            assert_eq!(shared.code, None);
        }

        let failed: Vec<&ResolutionIssue> = report
            .issues
            .iter()
            .filter(|i| i.identifier == "a/shared")
            .collect();
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().all(|i| i.depth == 2
            && i.kind
                == IssueKind::FetchFailed {
                    url: "memory://a/shared/code.tsx".into()
                }));
        assert_eq!(registry.fetch_count(), 4);
    }

    #[tokio::test]
    async fn unavailable_service_is_fatal() {
        let registry =
            MemoryRegistry::new().with_component("a/app", FixtureComponent::code("app"));
        registry.set_unavailable(true);

        let err = Resolver::new(&registry, &registry, options(10))
            .resolve("a/app")
            .await
            .unwrap_err();
        assert!(matches!(err, RegraphError::ServiceUnavailable { .. }));
    }

    #[tokio::test]
    async fn resolve_at_respects_given_ancestors() {
        let registry = MemoryRegistry::new()
            .with_component("a/app", FixtureComponent::code("app").depends_on(&["a/dep"]))
            .with_component("a/dep", FixtureComponent::code("d"));
        let resolver = Resolver::new(&registry, &registry, options(10));

        let visited: BTreeSet<String> = ["a/dep".to_string()].into_iter().collect();
        let report = resolver.resolve_at("a/app", 0, &visited).await.unwrap();
        assert_eq!(
            report.root.unwrap().registry_dependency_tree.get("a/dep"),
            Some(&None)
        );

        let report = resolver.resolve_at("a/app", 9, &BTreeSet::new()).await.unwrap();
        assert!(report.root.is_some());
        assert_eq!(report.issues[0].kind, IssueKind::DepthLimit);
    }

    /// Counts how many lookups run at the same time.
    struct SlowLookup {
        inner: MemoryRegistry,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        delay: Duration,
    }

    impl ComponentLookup for SlowLookup {
        async fn lookup(&self, author: &str, slug: &str) -> Result<Lookup> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.inner.lookup(author, slug).await
        }
    }

    fn fan_out(children: usize) -> MemoryRegistry {
        let ids: Vec<String> = (0..children).map(|i| format!("a/c{i}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut registry = MemoryRegistry::new()
            .with_component("a/root", FixtureComponent::code("r").depends_on(&refs));
        for id in &ids {
            registry = registry.with_component(id, FixtureComponent::code("c"));
        }
        registry
    }

    #[tokio::test]
    async fn fan_out_is_bounded() {
        let registry = fan_out(8);
        let lookup = SlowLookup {
            inner: fan_out(8),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            delay: Duration::from_millis(10),
        };

        let resolver = Resolver::new(
            &lookup,
            &registry,
            ResolveOptions {
                max_depth: 10,
                concurrency: 2,
            },
        );
        let root = resolver.resolve("a/root").await.unwrap().unwrap();

        assert_eq!(root.registry_dependency_tree.len(), 8);
        assert!(lookup.peak.load(Ordering::SeqCst) <= 2);
        assert!(lookup.peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn deadline_cancels_resolution() {
        let registry = fan_out(2);
        let lookup = SlowLookup {
            inner: fan_out(2),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            delay: Duration::from_secs(5),
        };

        let resolver = Resolver::new(&lookup, &registry, options(10));
        let err = resolver
            .resolve_with_timeout("a/root", Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, RegraphError::Cancelled { .. }));
        assert!(err.is_fatal());
    }
}
