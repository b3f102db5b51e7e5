use cluster_sync::export::{self, ComposedFigure};
use cluster_sync::surface::Size;
use cluster_sync::views::{BarplotModel, GeneTableModel};
use cluster_sync::{
    ConfidenceControl, CoordinatorSettings, FetchTicket, FilterPipeline, FilterState,
    GeneRecord, GraphCounts, GraphLayoutCoordinator, GraphPayload, GraphSurface, NodeAttribute,
    NodeId, Palette, Resolution, RingKey, RingSpec, SelectionBus, SyncError, TableCommands,
    ViewEvent, svg,
};
use std::collections::BTreeMap;

use crate::config::{ExplorerConfig, ExportConfig, TimingConfig};
use crate::graph_view::EguiSurfaceFactory;
use crate::layout_settings::LayoutSettings;
use crate::versioned::Versioned;

/// Size assumed for the graph panel until the first frame reports it.
const INITIAL_CONTAINER: Size = Size::new(800.0, 600.0);

pub type GraphCoordinator = GraphLayoutCoordinator<EguiSurfaceFactory>;
pub type ExplorerBus = SelectionBus<GraphCoordinator, BarplotModel, GeneTableModel>;

fn coordinator_settings(settings: &LayoutSettings, timing: &TimingConfig) -> CoordinatorSettings {
    CoordinatorSettings {
        padding: settings.layout.fit_padding,
        resize_debounce: timing.resize_debounce(),
        inter_edge_opacity: settings.layout.inter_edge_opacity,
    }
}

/// Everything the explorer knows. Mutated only through actions.
pub struct Store {
    pub bus: ExplorerBus,
    /// Last applied graph snapshot.
    pub payload: Versioned<Option<GraphPayload>>,
    /// Filter as edited in the control panel; confidence comes from the
    /// slider's committed value.
    pub draft: Versioned<FilterState>,
    pub pipeline: FilterPipeline,
    pub confidence: ConfidenceControl,
    pub ring_key: Option<RingKey>,
    pub settings: LayoutSettings,
    pub timing: TimingConfig,
    pub export: ExportConfig,
    pub error_message: Option<String>,
    /// The last graph fetch failed and can be retried.
    pub retry_available: bool,
    palette_version: u64,
}

impl Store {
    pub fn new(config: &ExplorerConfig) -> Self {
        let settings = config.layout.clone();
        let factory = EguiSurfaceFactory::new(INITIAL_CONTAINER, settings.visuals.clone());
        let coordinator = GraphLayoutCoordinator::with_layout(
            factory,
            settings.layout.to_layout(&settings.visuals),
            coordinator_settings(&settings, &config.timing),
        );
        let draft = FilterState::default();
        Self {
            bus: SelectionBus::new(
                coordinator,
                BarplotModel::new(config.top_k),
                GeneTableModel::default(),
            ),
            confidence: ConfidenceControl::new(draft.confidence, config.timing.confidence_commit()),
            payload: Versioned::new(None),
            draft: Versioned::new(draft),
            pipeline: FilterPipeline::new(),
            ring_key: None,
            settings,
            timing: config.timing.clone(),
            export: config.export.clone(),
            error_message: None,
            retry_available: false,
            palette_version: 0,
        }
    }

    // ------------------------------------------------------------------
    // Filter
    // ------------------------------------------------------------------

    /// The filter the control panel currently describes.
    pub fn current_filter(&self) -> FilterState {
        FilterState {
            confidence: self.confidence.committed_value(),
            ..self.draft.get().clone()
        }
    }

    /// Hand the current filter to the pipeline. `None` when it matches
    /// the last committed one.
    pub fn commit_filter(&mut self) -> Option<FetchTicket> {
        let ticket = self.pipeline.update(self.current_filter())?;
        tracing::info!(ticket = ticket.id, filter = %ticket.filter.fingerprint(), "filter committed");
        Some(ticket)
    }

    pub fn retry_fetch(&mut self) -> Option<FetchTicket> {
        self.error_message = None;
        self.retry_available = false;
        self.pipeline.retry()
    }

    /// Deliver a graph-data response. Stale responses are dropped; a
    /// failure keeps the previous graph and offers a retry.
    pub fn apply_graph_result(&mut self, ticket: &FetchTicket, result: Result<GraphPayload, SyncError>) {
        match self.pipeline.resolve(ticket, result) {
            Resolution::Applied(payload) => {
                self.retry_available = false;
                self.payload.set(Some(payload));
                if let Err(err) = self.rebuild_graph() {
                    tracing::warn!(error = %err, "graph not rebuilt");
                }
            }
            Resolution::Stale => {}
            Resolution::Failed(err) => {
                self.error_message = Some(format!("Could not load graph data: {err}"));
                self.retry_available = true;
            }
        }
    }

    pub fn apply_gene_table(&mut self, result: Result<Vec<GeneRecord>, SyncError>) {
        match result {
            Ok(rows) => {
                tracing::info!(rows = rows.len(), "gene table loaded");
                self.bus.table_mut().set_rows(rows);
            }
            Err(err) => {
                tracing::warn!(error = %err, "gene table unavailable");
                self.error_message = Some(format!("Could not load gene table: {err}"));
            }
        }
    }

    // ------------------------------------------------------------------
    // Graph
    // ------------------------------------------------------------------

    /// Rebuild every view from the current snapshot.
    pub fn rebuild_graph(&mut self) -> Result<GraphCounts, SyncError> {
        self.bus.reset_selection();
        let Some(payload) = self.payload.get().as_ref() else {
            return Err(SyncError::EmptyGraph);
        };
        self.bus.barplot_mut().set_pathways(&payload.enrichment);
        let (nodes, edges) = (payload.nodes.clone(), payload.edges.clone());

        let result = self.bus.graph_mut().rebuild(nodes, &edges, None);
        if result.is_ok() {
            self.palette_version += 1;
        }
        result
    }

    /// Dim every cluster but `cluster`, dropping the current selection.
    pub fn highlight_cluster(&mut self, cluster: Option<i64>) {
        self.bus.dispatch(ViewEvent::ClusterHighlighted(cluster));
    }

    /// Select one node as if it was clicked; `None` clears everything.
    pub fn select_node(&mut self, id: Option<&str>) {
        self.bus.dispatch(match id {
            Some(id) => ViewEvent::NodeClicked(id.to_string()),
            None => ViewEvent::ClearAll,
        });
    }

    /// Select a set of genes in every view.
    pub fn select_nodes(&mut self, ids: Vec<NodeId>) {
        self.bus.dispatch(ViewEvent::SelectGenes(ids));
    }

    pub fn palettes(&self) -> BTreeMap<NodeAttribute, Palette> {
        self.bus.graph().palettes().all()
    }

    pub fn set_palette(&mut self, attribute: NodeAttribute, mapping: Palette) {
        self.bus.graph_mut().set_palette_override(attribute, mapping);
        self.palette_version += 1;
    }

    pub fn reset_palettes(&mut self) {
        self.bus.graph_mut().clear_palette_overrides();
        self.palette_version += 1;
    }

    pub fn palette_version(&self) -> u64 {
        self.palette_version
    }

    /// Decorate nodes with rings for `key`; an empty palette uses the
    /// current one. `None` removes the rings.
    pub fn draw_ring(&mut self, key: Option<RingKey>, palette: Palette) {
        self.ring_key = key;
        let spec = match key {
            Some(key) => RingSpec::new(key, palette),
            None => RingSpec::none(),
        };
        self.bus.graph_mut().draw_ring(spec);
    }

    pub fn counts(&self) -> GraphCounts {
        self.bus.graph().counts()
    }

    /// Graph and bar chart side by side in one SVG document.
    pub fn export_svg(&self) -> Result<ComposedFigure, SyncError> {
        let graph = self
            .bus
            .graph()
            .surface()
            .and_then(|surface| svg::render_graph(&surface.snapshot()));
        let cluster_palette = self.bus.graph().palettes().get(NodeAttribute::Cluster);
        let barplot = svg::render_barplot(self.bus.barplot().bars(), &cluster_palette);
        export::compose(graph.as_ref(), barplot.as_ref(), &self.export.layout())
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    /// Apply new visual and layout settings. Layout changes rebuild the
    /// graph; purely visual ones restyle it in place.
    pub fn apply_settings(&mut self, settings: LayoutSettings) {
        let settings = settings.clamped();
        if settings == self.settings {
            return;
        }
        let relayout = settings.layout != self.settings.layout
            || settings.visuals.node_radius != self.settings.visuals.node_radius
            || settings.visuals.ring_width != self.settings.visuals.ring_width;

        let coordinator = self.bus.graph_mut();
        coordinator.factory_mut().set_visuals(&settings.visuals);
        if let Some(surface) = coordinator.surface_mut() {
            surface.set_visuals(&settings.visuals);
        }
        if relayout {
            coordinator.set_layout(
                settings.layout.to_layout(&settings.visuals),
                coordinator_settings(&settings, &self.timing),
            );
        }
        self.settings = settings;

        if relayout && self.payload.get().is_some() {
            if let Err(err) = self.rebuild_graph() {
                tracing::warn!(error = %err, "graph not rebuilt");
            }
        }
    }

    /// Put nodes back on their layout positions and re-fit the view.
    pub fn relayout(&mut self) {
        if let Some(surface) = self.bus.graph_mut().surface_mut() {
            surface.request_relayout();
            surface.request_fit();
        }
    }
}
