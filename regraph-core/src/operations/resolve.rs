use crate::config::RegraphConfig;
use crate::fetch::ArtifactFetcher;
use crate::registry::ComponentLookup;
use crate::resolve::{Resolution, ResolveOptions, Resolver};
use crate::Result;

/// Resolves `identifier` with the configured depth, fan-out and deadline.
pub async fn resolve_component<L, F>(
    config: &RegraphConfig,
    lookup: &L,
    fetcher: &F,
    identifier: &str,
) -> Result<Resolution>
where
    L: ComponentLookup,
    F: ArtifactFetcher,
{
    let resolver = Resolver::new(lookup, fetcher, ResolveOptions::from_config(config));

    match config.timeout {
        Some(timeout) => resolver.resolve_with_timeout(identifier, timeout).await,
        None => resolver.resolve_report(identifier).await,
    }
}
