use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::commands::GraphCommands;
use crate::debounce::Debouncer;
use crate::error::SyncError;
use crate::grouping::{ClusterGrouping, EdgePartition};
use crate::layout::{self, ClusterCircleLayout, ClusterLayout};
use crate::model::{Edge, Node, NodeId};
use crate::palette::{self, NodeAttribute, Palette, Palettes};
use crate::ring::{self, RingSpec};
use crate::surface::{EdgeStyle, GraphSurface, Point, Rect, Size, SurfaceFactory};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinatorSettings {
    /// Screen padding kept around the graph when fitting.
    pub padding: f32,
    pub resize_debounce: Duration,
    pub inter_edge_opacity: f32,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            padding: 30.0,
            resize_debounce: Duration::from_millis(180),
            inter_edge_opacity: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphCounts {
    pub nodes: usize,
    pub intra_edges: usize,
    pub inter_edges: usize,
    pub clusters: usize,
}

impl GraphCounts {
    pub fn edges(&self) -> usize {
        self.intra_edges + self.inter_edges
    }
}

/// Ask the shell to open the detail popover for a node.
#[derive(Debug, Clone, PartialEq)]
pub struct PopoverRequest {
    pub node_id: NodeId,
    pub anchor: Option<Rect>,
}

/// Subscriptions attached to a live surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listener {
    ContainerResize,
    WindowResize,
}

/// Owns the graph surface and everything drawn on it.
///
/// Every rebuild tears the previous surface down before a new one is
/// created, so at most one instance is ever alive.
pub struct GraphLayoutCoordinator<F: SurfaceFactory, L: ClusterLayout = ClusterCircleLayout> {
    factory: F,
    layout: L,
    settings: CoordinatorSettings,
    surface: Option<F::Surface>,
    listeners: Vec<Listener>,
    live_surfaces: usize,

    nodes: Vec<Node>,
    grouping: ClusterGrouping,
    counts: GraphCounts,
    world_bounds: Option<Rect>,

    palettes: Palettes,
    ring: RingSpec,

    selected: BTreeSet<NodeId>,
    hovered: Option<NodeId>,
    dimmed_cluster: Option<i64>,

    resize: Debouncer<Size>,
}

impl<F: SurfaceFactory> GraphLayoutCoordinator<F, ClusterCircleLayout> {
    pub fn new(factory: F) -> Self {
        Self::with_layout(factory, ClusterCircleLayout::default(), CoordinatorSettings::default())
    }
}

impl<F: SurfaceFactory, L: ClusterLayout> GraphLayoutCoordinator<F, L> {
    pub fn with_layout(factory: F, layout: L, settings: CoordinatorSettings) -> Self {
        Self {
            factory,
            layout,
            settings,
            surface: None,
            listeners: Vec::new(),
            live_surfaces: 0,
            nodes: Vec::new(),
            grouping: ClusterGrouping::default(),
            counts: GraphCounts::default(),
            world_bounds: None,
            palettes: Palettes::default(),
            ring: RingSpec::none(),
            selected: BTreeSet::new(),
            hovered: None,
            dimmed_cluster: None,
            resize: Debouncer::new(settings.resize_debounce),
        }
    }

    /// Replace the whole graph.
    ///
    /// `grouping` overrides the cluster field of the nodes; it is repaired
    /// against the snapshot. Nothing is constructed for an empty graph.
    pub fn rebuild(
        &mut self,
        nodes: Vec<Node>,
        edges: &[Edge],
        grouping: Option<BTreeMap<i64, Vec<NodeId>>>,
    ) -> Result<GraphCounts, SyncError> {
        self.teardown();
        if nodes.is_empty() {
            return Err(SyncError::EmptyGraph);
        }

        let grouping = match grouping {
            Some(explicit) => ClusterGrouping::from_explicit(explicit, &nodes),
            None => ClusterGrouping::from_nodes(&nodes),
        };
        let partition = EdgePartition::split(edges);

        let mut surface = self.factory.create();
        self.live_surfaces += 1;
        if self.live_surfaces > 1 {
            tracing::error!(live = self.live_surfaces, "more than one graph surface alive");
        }
        debug_assert_eq!(self.live_surfaces, 1);

        for node in &nodes {
            surface.add_node(node);
        }
        for edge in &partition.intra {
            surface.add_edge(edge, EdgeStyle::INTRA);
        }

        let aspect = surface.container_size().aspect_ratio();
        let positions = self.layout.layout(&grouping, aspect);
        for (id, position) in &positions {
            surface.set_position(id, *position);
        }
        self.world_bounds = Rect::bounding(positions.iter().map(|(_, p)| *p));
        if let Some(bounds) = self.world_bounds {
            surface.fit(layout::fit_viewport(
                bounds,
                surface.container_size(),
                self.settings.padding,
            ));
        }

        // Cross-cluster links go on top of the settled layout so they
        // never influence it.
        let overlay = EdgeStyle::overlay(self.settings.inter_edge_opacity);
        for edge in &partition.inter {
            surface.add_edge(edge, overlay);
        }

        self.counts = GraphCounts {
            nodes: nodes.len(),
            intra_edges: partition.intra.len(),
            inter_edges: partition.inter.len(),
            clusters: grouping.cluster_count(),
        };
        self.surface = Some(surface);
        self.listeners = vec![Listener::ContainerResize, Listener::WindowResize];
        self.palettes.regenerate(&nodes);
        // Clusters are colored by grouping, which may differ from the
        // cluster field of the nodes.
        self.palettes.set_generated(
            NodeAttribute::Cluster,
            palette::palette_for_keys(grouping.groups().map(|(cluster, _)| cluster.to_string())),
        );
        self.nodes = nodes;
        self.grouping = grouping;

        self.apply_palette(&self.palettes.get(NodeAttribute::Cluster));
        self.redraw_ring();

        tracing::info!(
            nodes = self.counts.nodes,
            edges = self.counts.edges(),
            clusters = self.counts.clusters,
            "graph rebuilt"
        );
        Ok(self.counts)
    }

    /// Detach every listener and dispose the surface.
    pub fn teardown(&mut self) {
        self.listeners.clear();
        self.resize.cancel();
        if let Some(mut surface) = self.surface.take() {
            surface.destroy();
            self.live_surfaces = self.live_surfaces.saturating_sub(1);
            tracing::debug!("graph surface destroyed");
        }
        self.nodes.clear();
        self.grouping = ClusterGrouping::default();
        self.selected.clear();
        self.hovered = None;
        self.dimmed_cluster = None;
        self.world_bounds = None;
        self.counts = GraphCounts::default();
    }

    /// Color every node by its cluster; unknown clusters are gray.
    pub fn apply_palette(&mut self, palette: &Palette) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        for node in &self.nodes {
            let cluster = self.grouping.cluster_of(&node.id).unwrap_or(node.cluster);
            surface.set_color(&node.id, palette::lookup(palette, &cluster.to_string()));
        }
    }

    pub fn highlight_cluster(&mut self, cluster: Option<i64>) {
        self.clear_selection();
        self.set_hovered(None);
        self.dimmed_cluster = cluster;
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        for node in &self.nodes {
            let dimmed = match cluster {
                Some(c) => self.grouping.cluster_of(&node.id) != Some(c),
                None => false,
            };
            surface.set_dimmed(&node.id, dimmed);
        }
    }

    pub fn select_node(&mut self, id: Option<&str>) -> Option<PopoverRequest> {
        match id {
            Some(id) => {
                self.select_nodes(&[id.to_string()]);
                self.selected.contains(id).then(|| PopoverRequest {
                    node_id: id.to_string(),
                    anchor: self.anchor_of(id),
                })
            }
            None => {
                self.select_nodes(&[]);
                None
            }
        }
    }

    /// Replace the selection. Unknown ids are ignored; never opens a
    /// popover. Cluster dimming is left as is.
    pub fn select_nodes(&mut self, ids: &[NodeId]) {
        self.clear_selection();
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        for id in ids {
            if self.grouping.cluster_of(id).is_some() {
                surface.set_selected(id, true);
                self.selected.insert(id.clone());
            }
        }
    }

    pub fn hover_node(&mut self, id: Option<&str>) {
        self.set_hovered(id.filter(|id| self.grouping.cluster_of(id).is_some()));
    }

    fn set_hovered(&mut self, id: Option<&str>) {
        if let Some(surface) = self.surface.as_mut() {
            if let Some(previous) = self.hovered.take() {
                surface.set_hovered(&previous, false);
            }
            if let Some(id) = id {
                surface.set_hovered(id, true);
            }
        }
        self.hovered = id.map(str::to_string);
    }

    fn clear_selection(&mut self) {
        let selected = std::mem::take(&mut self.selected);
        if let Some(surface) = self.surface.as_mut() {
            for id in &selected {
                surface.set_selected(id, false);
            }
        }
    }

    /// Draw rings as described by `ring`. An empty palette means the
    /// current effective palette of the ring's attribute.
    pub fn draw_ring(&mut self, ring: RingSpec) {
        self.ring = ring;
        self.redraw_ring();
    }

    fn redraw_ring(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let spec = match self.ring.key {
            Some(key) if self.ring.palette.is_empty() => {
                RingSpec::new(key, self.palettes.get(key.attribute()))
            }
            _ => self.ring.clone(),
        };
        ring::draw(surface, &self.nodes, &spec);
    }

    pub fn ring_spec(&self) -> &RingSpec {
        &self.ring
    }

    /// Record a container size change. The view is re-fitted once the
    /// size has been stable for the debounce window.
    pub fn on_container_resize(&mut self, size: Size, now: Duration) {
        if self.listeners.contains(&Listener::ContainerResize) {
            self.resize.call(size, now);
        }
    }

    /// Run due timers. Returns true when the view was re-fitted.
    pub fn tick(&mut self, now: Duration) -> bool {
        let Some(size) = self.resize.poll(now) else {
            return false;
        };
        match (self.surface.as_mut(), self.world_bounds) {
            (Some(surface), Some(bounds)) => {
                surface.fit(layout::fit_viewport(bounds, size, self.settings.padding));
                tracing::trace!(width = size.width, height = size.height, "graph re-fitted");
                true
            }
            _ => false,
        }
    }

    /// Time until the pending re-fit is due.
    pub fn next_deadline(&self, now: Duration) -> Option<Duration> {
        self.resize.due_in(now)
    }

    pub fn counts(&self) -> GraphCounts {
        self.counts
    }

    pub fn palettes(&self) -> &Palettes {
        &self.palettes
    }

    /// Override colors of one attribute and repaint what depends on it.
    pub fn set_palette_override(&mut self, attribute: NodeAttribute, mapping: Palette) {
        self.palettes.set_override(attribute, mapping);
        match attribute {
            NodeAttribute::Cluster => self.apply_palette(&self.palettes.get(NodeAttribute::Cluster)),
            NodeAttribute::Source | NodeAttribute::Effect => self.redraw_ring(),
        }
    }

    /// Drop every override and repaint with the generated palettes.
    pub fn clear_palette_overrides(&mut self) {
        self.palettes.clear_overrides();
        self.apply_palette(&self.palettes.get(NodeAttribute::Cluster));
        self.redraw_ring();
    }

    pub fn set_layout_padding(&mut self, padding: f32) {
        self.settings.padding = padding;
    }

    /// Takes effect on the next rebuild.
    pub fn set_layout(&mut self, layout: L, settings: CoordinatorSettings) {
        self.layout = layout;
        self.settings = settings;
        self.resize = Debouncer::new(settings.resize_debounce);
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    pub fn node_ids_in_cluster(&self, cluster: i64) -> &[NodeId] {
        self.grouping.members(cluster)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn grouping(&self) -> &ClusterGrouping {
        &self.grouping
    }

    pub fn selected(&self) -> &BTreeSet<NodeId> {
        &self.selected
    }

    pub fn dimmed_cluster(&self) -> Option<i64> {
        self.dimmed_cluster
    }

    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    pub fn live_surfaces(&self) -> usize {
        self.live_surfaces
    }

    pub fn surface(&self) -> Option<&F::Surface> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut F::Surface> {
        self.surface.as_mut()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }

    /// World position of a node, for layouts that read back the scene.
    pub fn position_of(&self, id: &str) -> Option<Point> {
        self.surface
            .as_ref()?
            .snapshot()
            .node(id)
            .map(|n| n.position)
    }

    pub fn anchor_of(&self, id: &str) -> Option<Rect> {
        self.surface.as_ref()?.anchor_of(id)
    }
}

impl<F: SurfaceFactory, L: ClusterLayout> GraphCommands for GraphLayoutCoordinator<F, L> {
    fn highlight_cluster(&mut self, cluster: Option<i64>) {
        GraphLayoutCoordinator::highlight_cluster(self, cluster);
    }

    fn select_node(&mut self, id: Option<&str>) -> Option<PopoverRequest> {
        GraphLayoutCoordinator::select_node(self, id)
    }

    fn select_nodes(&mut self, ids: &[NodeId]) {
        GraphLayoutCoordinator::select_nodes(self, ids);
    }

    fn hover_node(&mut self, id: Option<&str>) {
        GraphLayoutCoordinator::hover_node(self, id);
    }

    fn anchor_of(&self, id: &str) -> Option<Rect> {
        GraphLayoutCoordinator::anchor_of(self, id)
    }
}
