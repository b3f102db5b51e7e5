use cluster_sync::{Color, GraphPayload, NodeAttribute};
use cluster_sync::palette;
use std::collections::BTreeSet;

use crate::store::Store;
use crate::versioned::Memoized;

/// Checkbox options offered for the analysis and effect filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    pub analyses: Vec<String>,
    pub effects: Vec<String>,
}

impl FilterOptions {
    /// Tags carried by the current nodes, plus whatever is already
    /// checked so a checked box never disappears.
    pub fn collect(payload: Option<&GraphPayload>, checked_analyses: &[String], checked_effects: &[String]) -> Self {
        let mut analyses: BTreeSet<String> = checked_analyses.iter().cloned().collect();
        let mut effects: BTreeSet<String> = checked_effects.iter().cloned().collect();
        for node in payload.map(|p| p.nodes.as_slice()).unwrap_or_default() {
            analyses.extend(node.source_tags.iter().cloned());
            effects.extend(node.effect_tags.iter().cloned());
        }
        Self {
            analyses: analyses.into_iter().collect(),
            effects: effects.into_iter().collect(),
        }
    }
}

/// One legend entry per cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSummary {
    pub cluster: i64,
    pub size: usize,
    pub color: Color,
}

pub fn cluster_summaries(store: &Store) -> Vec<ClusterSummary> {
    let coordinator = store.bus.graph();
    let colors = coordinator.palettes().get(NodeAttribute::Cluster);
    coordinator
        .grouping()
        .groups()
        .map(|(cluster, members)| ClusterSummary {
            cluster,
            size: members.len(),
            color: palette::lookup(&colors, &cluster.to_string()),
        })
        .collect()
}

pub struct Cache {
    pub filter_options: Memoized<Store, (u64, u64), FilterOptions>,
    pub clusters: Memoized<Store, (u64, u64), Vec<ClusterSummary>>,
}

impl Cache {
    pub fn new() -> Self {
        let filter_options = Memoized::new(
            |s: &Store| (s.payload.version(), s.draft.version()),
            |s: &Store| {
                let draft = s.draft.get();
                FilterOptions::collect(s.payload.get().as_ref(), &draft.analyses, &draft.effects)
            },
        );

        let clusters = Memoized::new(
            |s: &Store| (s.payload.version(), s.palette_version()),
            cluster_summaries,
        );

        Self {
            filter_options,
            clusters,
        }
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}
