use super::report_issues;
use anyhow::{Result, bail};
use clap::Args;
use regraph_core::operations::build_preview;
use regraph_core::{ArtifactFetcher, ComponentLookup, RegraphConfig, console};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Component identifier, `author/slug`
    pub identifier: String,

    /// Write the sandbox files into this directory
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Write the sandbox files into the data directory
    #[arg(long, conflicts_with = "out")]
    pub save: bool,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run<L, F>(
    args: PreviewArgs,
    config: &RegraphConfig,
    lookup: &L,
    fetcher: &F,
) -> Result<()>
where
    L: ComponentLookup,
    F: ArtifactFetcher,
{
    if !args.json {
        console::header("preview", env!("CARGO_PKG_VERSION"));
    }

    let bundle = build_preview(config, lookup, fetcher, &args.identifier).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&bundle)?);
        return Ok(());
    }

    report_issues(&bundle.issues);

    if !bundle.is_resolved() {
        bail!("{} could not be resolved", args.identifier);
    }

    if bundle.styles.fell_back {
        console::warn("a style fragment could not be merged, using the base styles");
    }

    for note in &bundle.styles.notes {
        console::step(&format!(
            "{} `{}` from {} ({})",
            note.category,
            note.key,
            note.origin,
            note.policy.as_str()
        ));
    }

    let target = match (&args.out, &bundle.root) {
        (Some(dir), _) => Some(dir.clone()),
        (None, Some(root)) if args.save => Some(config.preview_dir(&root.identifier)),
        _ => None,
    };

    match target {
        Some(dir) => {
            for path in bundle.files.write_to(&dir)? {
                console::written(&path.display().to_string());
            }
        }
        None => {
            for (path, content) in bundle.files.iter() {
                let size = format!("{} bytes", content.len());
                console::tree_line("  ", path, Some(&size));
            }
        }
    }

    console::summary(
        bundle.files.len(),
        "file",
        "files",
        console::elapsed_secs(),
    );

    Ok(())
}
