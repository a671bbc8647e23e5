use super::report_issues;
use anyhow::{Result, bail};
use clap::Args;
use regraph_core::operations::resolve_component;
use regraph_core::{ArtifactFetcher, ComponentLookup, RegraphConfig, console, flatten};

#[derive(Args, Debug)]
pub struct FlattenArgs {
    /// Component identifier, `author/slug`
    pub identifier: String,

    /// Keep the component itself in the list
    #[arg(long)]
    pub include_root: bool,

    /// Maximum dependency depth
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run<L, F>(
    args: FlattenArgs,
    config: &RegraphConfig,
    lookup: &L,
    fetcher: &F,
) -> Result<()>
where
    L: ComponentLookup,
    F: ArtifactFetcher,
{
    if !args.json {
        console::header("flatten", env!("CARGO_PKG_VERSION"));
    }

    let mut config = config.clone();
    if let Some(depth) = args.max_depth {
        config.max_depth = depth;
    }

    let resolution = resolve_component(&config, lookup, fetcher, &args.identifier).await?;
    let flat = flatten(resolution.root.as_ref(), !args.include_root);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&flat)?);
        return Ok(());
    }

    report_issues(&resolution.issues);

    if resolution.root.is_none() {
        bail!("{} could not be resolved", args.identifier);
    }

    for (identifier, node) in flat.iter() {
        let deps = node.npm_dependencies.len();
        let note = if deps == 0 {
            None
        } else {
            Some(format!("({} npm)", deps))
        };
        console::tree_line("  ", identifier, note.as_deref());
    }

    console::summary(
        flat.len(),
        "component",
        "components",
        console::elapsed_secs(),
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use regraph_core::registry::{FixtureComponent, MemoryRegistry};

    fn args(identifier: &str) -> FlattenArgs {
        FlattenArgs {
            identifier: identifier.to_string(),
            include_root: false,
            max_depth: None,
            json: false,
        }
    }

    #[tokio::test]
    async fn unresolved_root_fails_the_command() {
        let registry = MemoryRegistry::new().with_component(
            "acme/app",
            FixtureComponent::code("app").depends_on(&["acme/gone"]),
        );
        let config = RegraphConfig::default();

        assert!(run(args("acme/app"), &config, &registry, &registry).await.is_ok());

        let err = run(args("acme/missing"), &config, &registry, &registry)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("acme/missing could not be resolved"));
        assert!(run(args("not-an-id"), &config, &registry, &registry).await.is_err());
    }
}
