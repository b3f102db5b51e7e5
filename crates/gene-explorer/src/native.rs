#![cfg(not(target_arch = "wasm32"))]

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::{DEFAULT_CONFIG_FILE, ExplorerConfig};
use crate::create_app;

/// Interactive explorer for gene clusters and their pathway enrichment.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// JSON configuration file; defaults are used when it is missing
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Override the base URL of the graph data service
    #[arg(long)]
    pub api_base: Option<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Write the effective configuration to `--config` and exit
    #[arg(long)]
    pub write_default_config: bool,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Entry point used by the native executable.
pub fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let mut config = ExplorerConfig::load_or_default(&args.config);
    if let Some(base) = args.api_base {
        config.service.base_url = base;
    }
    if args.write_default_config {
        config.save(&args.config)?;
        tracing::info!(path = %args.config.display(), "configuration written");
        return Ok(());
    }

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Gene Cluster Explorer",
        native_options,
        Box::new(|cc| Ok(Box::new(create_app(cc, config)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
    .context("failed to run the explorer window")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["native"]).unwrap();
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert_eq!(args.log_level, "info");
        assert!(args.api_base.is_none());
        assert!(!args.write_default_config);
    }

    #[test]
    fn test_args_overrides() {
        let args = Args::try_parse_from([
            "native",
            "--config",
            "other.json",
            "--api-base",
            "http://genes.local",
            "--write-default-config",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("other.json"));
        assert_eq!(args.api_base.as_deref(), Some("http://genes.local"));
        assert!(args.write_default_config);
    }
}
