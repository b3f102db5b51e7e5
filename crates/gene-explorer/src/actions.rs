use cluster_sync::popover::DetailTicket;
use cluster_sync::surface::Size;
use cluster_sync::{
    Color, FetchTicket, GeneRecord, GraphPayload, NodeAttribute, NodeDetail, NodeId, RingKey,
    SyncError, ViewEvent,
};
use std::time::Duration;

use crate::effects::Effect;
use crate::layout_settings::LayoutSettings;
use crate::store::Store;

/// Actions that can be dispatched to modify the explorer state
#[derive(Debug)]
pub enum Action {
    /// Fetch the graph for the default filter and the gene table
    LoadInitial,

    // Filter Actions
    /// Toggle one interaction source in the filter
    SetEdgeSource { source: String, enabled: bool },
    /// Toggle one analysis in the filter
    SetAnalysis { name: String, enabled: bool },
    /// Toggle one effect in the filter
    SetEffect { name: String, enabled: bool },
    /// Move the confidence slider without committing
    DragConfidence { value: f32 },
    /// Slider released; commit once the value settles
    ReleaseConfidence { now: Duration },
    /// Fetch the committed filter again after a failure
    RetryFetch,

    // Timers and layout
    /// Run due debounce timers
    Tick { now: Duration },
    /// The graph panel changed size
    ContainerResized { size: Size, now: Duration },
    /// The graph view was panned, zoomed or a node was dragged
    GraphMoved,
    /// Put nodes back on their layout positions
    Relayout,
    /// Change visual or layout settings
    SetSettings { settings: LayoutSettings },

    // Decoration
    /// Show rings for an attribute, or none
    SetRingKey { key: Option<RingKey> },
    /// Override one color of a palette
    SetPaletteColor {
        attribute: NodeAttribute,
        key: String,
        color: Color,
    },
    /// Drop every palette override
    ResetPalettes,
    /// Dim every cluster but one
    HighlightCluster { cluster: Option<i64> },

    // Selection
    /// Interaction reported by one of the views
    View(ViewEvent),
    /// Select genes from outside the views
    SelectGenes { ids: Vec<NodeId> },
    ClosePopover,

    // Table
    SetSearch { query: String },
    SortBy { column: String },
    ReloadGeneTable,

    // Service replies
    GraphLoaded {
        ticket: FetchTicket,
        result: Result<GraphPayload, SyncError>,
    },
    DetailLoaded {
        ticket: DetailTicket,
        result: Result<NodeDetail, SyncError>,
    },
    GeneTableLoaded {
        result: Result<Vec<GeneRecord>, SyncError>,
    },

    // Export
    /// Compose the graph and the bar chart into one SVG and save it
    ExportSvg,
    /// Clear any error message
    ClearErrorMessage,
}

fn toggle(values: &mut Vec<String>, value: String, enabled: bool) {
    if enabled {
        if !values.contains(&value) {
            values.push(value);
        }
    } else {
        values.retain(|v| *v != value);
    }
}

fn fetch(store: &mut Store) -> Vec<Effect> {
    store.commit_filter().map(Effect::FetchGraph).into_iter().collect()
}

/// Apply a single action to modify the store state
pub fn update(store: &mut Store, action: Action) -> Vec<Effect> {
    match action {
        Action::LoadInitial => {
            let mut effects = fetch(store);
            effects.push(Effect::FetchGeneTable);
            effects
        }

        // Filter Actions
        Action::SetEdgeSource { source, enabled } => {
            toggle(&mut store.draft.get_mut().edge_sources, source, enabled);
            fetch(store)
        }
        Action::SetAnalysis { name, enabled } => {
            toggle(&mut store.draft.get_mut().analyses, name, enabled);
            fetch(store)
        }
        Action::SetEffect { name, enabled } => {
            toggle(&mut store.draft.get_mut().effects, name, enabled);
            fetch(store)
        }
        Action::DragConfidence { value } => {
            store.confidence.drag(value);
            vec![]
        }
        Action::ReleaseConfidence { now } => {
            store.confidence.release(now);
            vec![]
        }
        Action::RetryFetch => store
            .retry_fetch()
            .map(Effect::FetchGraph)
            .into_iter()
            .collect(),

        // Timers and layout
        Action::Tick { now } => {
            let mut effects = vec![];
            if let Some(value) = store.confidence.poll(now) {
                store.draft.get_mut().confidence = value;
                effects = fetch(store);
            }
            if store.bus.graph_mut().tick(now) {
                store.bus.reanchor_popover();
            }
            effects
        }
        Action::ContainerResized { size, now } => {
            let coordinator = store.bus.graph_mut();
            coordinator.factory().set_container_size(size);
            coordinator.on_container_resize(size, now);
            vec![]
        }
        Action::GraphMoved => {
            store.bus.reanchor_popover();
            vec![]
        }
        Action::Relayout => {
            store.relayout();
            vec![]
        }
        Action::SetSettings { settings } => {
            store.apply_settings(settings);
            vec![]
        }

        // Decoration
        Action::SetRingKey { key } => {
            store.draw_ring(key, Default::default());
            vec![]
        }
        Action::SetPaletteColor {
            attribute,
            key,
            color,
        } => {
            let mut mapping = store.palettes().remove(&attribute).unwrap_or_default();
            mapping.insert(key, color);
            store.set_palette(attribute, mapping);
            vec![]
        }
        Action::ResetPalettes => {
            store.reset_palettes();
            vec![]
        }
        Action::HighlightCluster { cluster } => {
            store.highlight_cluster(cluster);
            vec![]
        }

        // Selection
        Action::View(event) => {
            store.bus.dispatch(event);
            vec![]
        }
        Action::SelectGenes { ids } => {
            store.select_nodes(ids);
            vec![]
        }
        Action::ClosePopover => {
            store.bus.popover_mut().close();
            vec![]
        }

        // Table
        Action::SetSearch { query } => {
            store.bus.table_mut().set_search(query);
            vec![]
        }
        Action::SortBy { column } => {
            store.bus.table_mut().sort_by(&column);
            vec![]
        }
        Action::ReloadGeneTable => vec![Effect::FetchGeneTable],

        // Service replies
        Action::GraphLoaded { ticket, result } => {
            store.apply_graph_result(&ticket, result);
            vec![]
        }
        Action::DetailLoaded { ticket, result } => {
            store.bus.resolve_detail(&ticket, result);
            vec![]
        }
        Action::GeneTableLoaded { result } => {
            store.apply_gene_table(result);
            vec![]
        }

        // Export
        Action::ExportSvg => match store.export_svg() {
            Ok(figure) => vec![Effect::SaveSvg {
                file_name: store.export.file_name.clone(),
                svg: figure.svg,
            }],
            Err(err) => {
                tracing::warn!(error = %err, "export skipped");
                store.error_message = Some(format!("Nothing to export yet: {err}"));
                vec![]
            }
        },
        Action::ClearErrorMessage => {
            store.error_message = None;
            vec![]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExplorerConfig;
    use cluster_sync::{Edge, GraphSurface, Node, Pathway};

    fn payload() -> GraphPayload {
        GraphPayload {
            nodes: vec![
                Node::new("g1", 1).with_sources(["AD"]),
                Node::new("g2", 1),
                Node::new("g3", 2),
            ],
            edges: vec![Edge::new("g1", "g2", true)],
            enrichment: vec![Pathway {
                cluster: 2,
                pathway: String::from("Autophagy"),
                pathway_id: String::from("hsa04140"),
                source: String::from("KEGG"),
                fdr: 0.01,
                genes: vec![String::from("g3")],
            }],
        }
    }

    fn fetched(effects: &[Effect]) -> usize {
        effects.iter().filter(|e| matches!(e, Effect::FetchGraph(_))).count()
    }

    fn loaded() -> Store {
        let mut store = Store::new(&ExplorerConfig::default());
        let ticket = store.commit_filter().unwrap();
        update(
            &mut store,
            Action::GraphLoaded {
                ticket,
                result: Ok(payload()),
            },
        );
        store
    }

    #[test]
    fn test_initial_load_fetches_graph_and_table() {
        let mut store = Store::new(&ExplorerConfig::default());
        let effects = update(&mut store, Action::LoadInitial);
        assert_eq!(fetched(&effects), 1);
        assert!(matches!(effects.last(), Some(Effect::FetchGeneTable)));
        assert!(store.pipeline.is_loading());
    }

    #[test]
    fn test_toggle_keeps_values_unique() {
        let mut values = vec![String::from("a")];
        toggle(&mut values, String::from("b"), true);
        toggle(&mut values, String::from("b"), true);
        assert_eq!(values, vec!["a", "b"]);
        toggle(&mut values, String::from("a"), false);
        assert_eq!(values, vec!["b"]);
    }

    #[test]
    fn test_checkbox_round_trip_issues_one_fetch() {
        let mut store = loaded();
        let on = update(
            &mut store,
            Action::SetEffect {
                name: String::from("enhancer"),
                enabled: true,
            },
        );
        let again = update(
            &mut store,
            Action::SetEffect {
                name: String::from("enhancer"),
                enabled: true,
            },
        );
        assert_eq!(fetched(&on), 1);
        assert_eq!(fetched(&again), 0);
    }

    #[test]
    fn test_confidence_commits_after_release_settles() {
        let mut store = loaded();
        let ms = Duration::from_millis;

        update(&mut store, Action::DragConfidence { value: 0.7 });
        update(&mut store, Action::DragConfidence { value: 0.8 });
        assert_eq!(store.confidence.committed_value(), store.current_filter().confidence);
        assert_eq!(fetched(&update(&mut store, Action::Tick { now: ms(10) })), 0);

        update(&mut store, Action::ReleaseConfidence { now: ms(100) });
        assert_eq!(fetched(&update(&mut store, Action::Tick { now: ms(200) })), 0);
        let effects = update(&mut store, Action::Tick { now: ms(400) });
        assert_eq!(fetched(&effects), 1);
        assert_eq!(store.current_filter().confidence, 0.8);
    }

    #[test]
    fn test_bar_hover_dims_other_clusters() {
        let mut store = loaded();
        update(&mut store, Action::View(ViewEvent::BarHovered(0)));
        store.bus.flush();

        let scene = store.bus.graph().surface().unwrap().snapshot();
        assert!(scene.node("g1").unwrap().dimmed);
        assert!(!scene.node("g3").unwrap().dimmed);
        assert!(scene.node("g3").unwrap().selected);
    }

    #[test]
    fn test_export_without_data_reports_error() {
        let mut store = Store::new(&ExplorerConfig::default());
        let effects = update(&mut store, Action::ExportSvg);
        assert!(effects.is_empty());
        assert!(store.error_message.is_some());

        update(&mut store, Action::ClearErrorMessage);
        assert!(store.error_message.is_none());
    }

    #[test]
    fn test_export_emits_save_effect() {
        let mut store = loaded();
        let effects = update(&mut store, Action::ExportSvg);
        assert!(matches!(
            effects.as_slice(),
            [Effect::SaveSvg { file_name, .. }] if file_name == "gene-cluster-enrichment.svg"
        ));
    }

    #[test]
    fn test_palette_color_override() {
        let mut store = loaded();
        let color = Color::rgb(10, 20, 30);
        update(
            &mut store,
            Action::SetPaletteColor {
                attribute: NodeAttribute::Cluster,
                key: String::from("2"),
                color,
            },
        );
        let scene = store.bus.graph().surface().unwrap().snapshot();
        assert_eq!(scene.node("g3").unwrap().color, color);
    }
}
