use anyhow::Result;
use clap::Args;
use regraph_core::{RegraphConfig, console};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ConfigArgs {}

pub async fn run(_args: ConfigArgs, config: &RegraphConfig) -> Result<()> {
    console::header("config", env!("CARGO_PKG_VERSION"));

    console::info("paths");
    console::info(&format!("  data dir: {}", config.data_dir.display()));
    console::info(&format!(
        "  previews dir: {}",
        config.previews_dir().display()
    ));
    println!();

    console::info("registry");
    console::info(&format!("  url: {}", config.registry_url));
    console::info(&format!(
        "  api key: {}",
        if config.api_key.is_some() { "set" } else { "none" }
    ));
    println!();

    console::info("resolution");
    console::info(&format!("  max depth: {}", config.max_depth));
    console::info(&format!("  concurrency: {}", config.concurrency));
    console::info(&format!(
        "  timeout: {}",
        config
            .timeout
            .map(|timeout| format!("{}s", timeout.as_secs()))
            .unwrap_or_else(|| "none".to_string())
    ));
    println!();

    console::info("styles");
    console::info(&format!(
        "  conflict policy: {}",
        config.style_conflict.as_str()
    ));
    console::info(&format!(
        "  base tailwind config: {}",
        format_base(config.base_tailwind_path.as_ref())
    ));
    console::info(&format!(
        "  base css: {}",
        format_base(config.base_css_path.as_ref())
    ));
    println!();

    console::info("logging");
    console::info(&format!("  verbose: {}", config.verbose));
    console::info(&format!(
        "  log file: {}",
        config
            .log_file
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "none".to_string())
    ));

    Ok(())
}

fn format_base(path: Option<&PathBuf>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "built-in".to_string(),
    }
}
