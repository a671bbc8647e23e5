use super::report_issues;
use anyhow::{Result, bail};
use clap::Args;
use regraph_core::operations::resolve_component;
use regraph_core::{ArtifactFetcher, ComponentLookup, RegraphConfig, ResolvedComponent, console};

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Component identifier, `author/slug`
    pub identifier: String,

    /// Maximum dependency depth
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run<L, F>(
    args: ResolveArgs,
    config: &RegraphConfig,
    lookup: &L,
    fetcher: &F,
) -> Result<()>
where
    L: ComponentLookup,
    F: ArtifactFetcher,
{
    if !args.json {
        console::header("resolve", env!("CARGO_PKG_VERSION"));
    }

    let mut config = config.clone();
    if let Some(depth) = args.max_depth {
        config.max_depth = depth;
    }

    let resolution = resolve_component(&config, lookup, fetcher, &args.identifier).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
        return Ok(());
    }

    report_issues(&resolution.issues);

    let Some(root) = resolution.root else {
        bail!("{} could not be resolved", args.identifier);
    };

    console::tree_line("", &root.identifier.to_string(), note(&root).as_deref());
    print_children(&root, "");

    console::summary(
        root.node_count(),
        "component",
        "components",
        console::elapsed_secs(),
    );

    Ok(())
}

fn note(node: &ResolvedComponent) -> Option<String> {
    let mut parts = Vec::new();
    if node.code.is_none() {
        parts.push("no code");
    }
    if node.tailwind_config.is_some() {
        parts.push("tailwind");
    }
    if node.global_css.is_some() {
        parts.push("css");
    }

    if parts.is_empty() {
        None
    } else {
        Some(format!("({})", parts.join(", ")))
    }
}

fn print_children(node: &ResolvedComponent, indent: &str) {
    let count = node.registry_dependency_tree.len();

    for (idx, (identifier, child)) in node.registry_dependency_tree.iter().enumerate() {
        let last = idx + 1 == count;
        let branch = if last { "└── " } else { "├── " };
        let prefix = format!("{}{}", indent, branch);

        match child {
            Some(child) => {
                console::tree_line(&prefix, identifier, note(child).as_deref());
                let next = format!("{}{}", indent, if last { "    " } else { "│   " });
                print_children(child, &next);
            }
            None => console::missing_line(&prefix, identifier),
        }
    }
}
