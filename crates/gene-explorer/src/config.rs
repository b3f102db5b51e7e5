use anyhow::Context;
use cluster_sync::export::{EXPORT_FILE_NAME, ExportLayout};
use cluster_sync::views::DEFAULT_TOP_K;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::layout_settings::LayoutSettings;

pub const DEFAULT_CONFIG_FILE: &str = "explorer.json";

/// Where the graph data service lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub graph_endpoint: String,
    pub node_detail_endpoint: String,
    pub gene_table_endpoint: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("http://localhost:5000"),
            graph_endpoint: String::from("/api/graph-data"),
            node_detail_endpoint: String::from("/api/node-details"),
            gene_table_endpoint: String::from("/api/gene-table"),
        }
    }
}

impl ServiceConfig {
    pub fn graph_url(&self) -> String {
        join(&self.base_url, &self.graph_endpoint)
    }

    /// The node id is one path segment, so reserved characters are escaped.
    pub fn node_detail_url(&self, id: &str) -> String {
        format!(
            "{}/{}",
            join(&self.base_url, &self.node_detail_endpoint),
            urlencoding::encode(id)
        )
    }

    pub fn gene_table_url(&self) -> String {
        join(&self.base_url, &self.gene_table_endpoint)
    }
}

fn join(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/').trim_end_matches('/')
    )
}

/// Debounce windows, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub resize_debounce_ms: u64,
    pub confidence_commit_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            resize_debounce_ms: 180,
            confidence_commit_ms: 250,
        }
    }
}

impl TimingConfig {
    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn confidence_commit(&self) -> Duration {
        Duration::from_millis(self.confidence_commit_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub file_name: String,
    pub gap: f32,
    pub margin: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        let layout = ExportLayout::default();
        Self {
            file_name: String::from(EXPORT_FILE_NAME),
            gap: layout.gap,
            margin: layout.margin,
        }
    }
}

impl ExportConfig {
    pub fn layout(&self) -> ExportLayout {
        ExportLayout {
            gap: self.gap,
            margin: self.margin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub service: ServiceConfig,
    pub timing: TimingConfig,
    pub layout: LayoutSettings,
    pub export: ExportConfig,
    /// Pathways kept per cluster and source in the bar chart.
    pub top_k: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            timing: TimingConfig::default(),
            layout: LayoutSettings::default(),
            export: ExportConfig::default(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl ExplorerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config.normalized())
    }

    /// Load `path`, falling back to defaults when it is missing or
    /// unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "config loaded");
                config
            }
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "config ignored, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write config {}", path.display()))?;
        Ok(())
    }

    fn normalized(mut self) -> Self {
        self.layout = self.layout.clamped();
        self.top_k = self.top_k.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_service_urls() {
        let service = ServiceConfig::default();
        assert_eq!(service.graph_url(), "http://localhost:5000/api/graph-data");
        assert_eq!(
            service.node_detail_url("TP53"),
            "http://localhost:5000/api/node-details/TP53"
        );
        assert_eq!(service.gene_table_url(), "http://localhost:5000/api/gene-table");
    }

    #[test]
    fn test_urls_tolerate_extra_slashes() {
        let service = ServiceConfig {
            base_url: String::from("https://example.org/"),
            node_detail_endpoint: String::from("api/node-details/"),
            ..ServiceConfig::default()
        };
        assert_eq!(
            service.node_detail_url("A1"),
            "https://example.org/api/node-details/A1"
        );
    }

    #[test]
    fn test_node_id_is_one_path_segment() {
        let service = ServiceConfig::default();
        assert_eq!(
            service.node_detail_url("a/b#c?d"),
            "http://localhost:5000/api/node-details/a%2Fb%23c%3Fd"
        );
        assert_eq!(
            service.node_detail_url("HLA-DRB1 x"),
            "http://localhost:5000/api/node-details/HLA-DRB1%20x"
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: ExplorerConfig = serde_json::from_str(
            r#"{"service": {"base_url": "http://10.0.0.2:8000"}, "timing": {"resize_debounce_ms": 50}}"#,
        )
        .unwrap();

        assert_eq!(config.service.base_url, "http://10.0.0.2:8000");
        assert_eq!(config.service.graph_endpoint, "/api/graph-data");
        assert_eq!(config.timing.resize_debounce(), Duration::from_millis(50));
        assert_eq!(config.timing.confidence_commit_ms, 250);
        assert_eq!(config.export.file_name, EXPORT_FILE_NAME);
        assert_eq!(config.top_k, DEFAULT_TOP_K);
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let path = std::env::temp_dir().join("gene_explorer_config_test.json");
        let mut config = ExplorerConfig::default();
        config.service.base_url = String::from("http://127.0.0.1:9000");
        config.top_k = 5;

        config.save(&path).expect("Failed to save config");
        let loaded = ExplorerConfig::load(&path).expect("Failed to load config");
        assert_eq!(loaded, config);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_unreadable_file_falls_back_to_defaults() {
        let missing = std::env::temp_dir().join("gene_explorer_config_missing.json");
        assert_eq!(ExplorerConfig::load_or_default(&missing), ExplorerConfig::default());

        let broken = std::env::temp_dir().join("gene_explorer_config_broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(ExplorerConfig::load(&broken).is_err());
        assert_eq!(ExplorerConfig::load_or_default(&broken), ExplorerConfig::default());
        std::fs::remove_file(&broken).ok();
    }
}
