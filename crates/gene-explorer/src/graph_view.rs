use cluster_sync::surface::{Rect, SceneEdge, SceneNode, SceneSnapshot, Size, Viewport};
use cluster_sync::{
    Color, Edge, GraphSurface, Node, NodeId, RingSlice, SurfaceFactory, ViewEvent,
};
use eframe::egui::{self, Pos2, Shape, Stroke};
use egui_graphs::events::Event;
use egui_graphs::{
    DefaultEdgeShape, DisplayEdge, DisplayNode, DrawContext, EdgeProps, Graph, GraphView,
    SettingsInteraction, SettingsNavigation, SettingsStyle,
};
use petgraph::graph::DefaultIx;
use petgraph::stable_graph::{IndexType, NodeIndex, StableGraph};
use petgraph::{EdgeType, Undirected};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::graph_state::{GeneEdge, GeneNode, to_color32, to_point, to_pos2};
use crate::layout_cluster::{LayoutCluster, LayoutStateCluster};
use crate::layout_settings::NodeVisualSettings;
use crate::node_shapes::RingNodeShape;

const DIMMED_EDGE_ALPHA: f32 = 0.15;
const DASH_LENGTH: f32 = 6.0;
const DASH_GAP: f32 = 4.0;

// ------------------------------------------------------------------
// Type aliases for graph types
// ------------------------------------------------------------------

pub type GeneGraph =
    Graph<GeneNode, GeneEdge, Undirected, DefaultIx, RingNodeShape, ClusterEdgeShape>;

pub type GeneGraphView<'a> = GraphView<
    'a,
    GeneNode,
    GeneEdge,
    Undirected,
    DefaultIx,
    RingNodeShape,
    ClusterEdgeShape,
    LayoutStateCluster,
    LayoutCluster,
>;

pub fn empty_graph() -> GeneGraph {
    GeneGraph::from(&StableGraph::<GeneNode, GeneEdge, Undirected>::default())
}

// ------------------------------------------------------------------
// Custom edge shape
// ------------------------------------------------------------------

/// Straight edge; cross-cluster overlay edges are dashed and faded, and
/// every edge touching a dimmed node fades with it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterEdgeShape {
    default_impl: DefaultEdgeShape,
    edge: GeneEdge,
}

impl From<EdgeProps<GeneEdge>> for ClusterEdgeShape {
    fn from(props: EdgeProps<GeneEdge>) -> Self {
        let edge = props.payload;
        let mut default_impl = DefaultEdgeShape::from(props);
        default_impl.width = if edge.overlay { 1.0 } else { 1.5 };
        Self { default_impl, edge }
    }
}

impl<Ty: EdgeType, Ix: IndexType, D: DisplayNode<GeneNode, GeneEdge, Ty, Ix>>
    DisplayEdge<GeneNode, GeneEdge, Ty, Ix, D> for ClusterEdgeShape
{
    fn is_inside(
        &self,
        start: &egui_graphs::Node<GeneNode, GeneEdge, Ty, Ix, D>,
        end: &egui_graphs::Node<GeneNode, GeneEdge, Ty, Ix, D>,
        pos: Pos2,
    ) -> bool {
        self.default_impl.is_inside(start, end, pos)
    }

    fn shapes(
        &mut self,
        start: &egui_graphs::Node<GeneNode, GeneEdge, Ty, Ix, D>,
        end: &egui_graphs::Node<GeneNode, GeneEdge, Ty, Ix, D>,
        ctx: &DrawContext,
    ) -> Vec<Shape> {
        let dimmed = start.payload().dimmed || end.payload().dimmed;
        let alpha = self.edge.opacity * if dimmed { DIMMED_EDGE_ALPHA } else { 1.0 };
        self.default_impl
            .shapes(start, end, ctx)
            .into_iter()
            .flat_map(|shape| restyle(shape, alpha, self.edge.overlay))
            .collect()
    }

    fn update(&mut self, state: &EdgeProps<GeneEdge>) {
        self.edge = state.payload;
        DisplayEdge::<GeneNode, GeneEdge, Ty, Ix, D>::update(&mut self.default_impl, state);
    }

    fn extra_bounds(
        &self,
        start: &egui_graphs::Node<GeneNode, GeneEdge, Ty, Ix, D>,
        end: &egui_graphs::Node<GeneNode, GeneEdge, Ty, Ix, D>,
    ) -> Option<(Pos2, Pos2)> {
        self.default_impl.extra_bounds(start, end)
    }
}

fn restyle(shape: Shape, alpha: f32, dashed: bool) -> Vec<Shape> {
    match shape {
        Shape::LineSegment { points, stroke } => {
            let stroke = Stroke::new(stroke.width, stroke.color.gamma_multiply(alpha));
            if dashed {
                Shape::dashed_line(&points, stroke, DASH_LENGTH, DASH_GAP)
            } else {
                vec![Shape::LineSegment { points, stroke }]
            }
        }
        other => vec![other],
    }
}

// ------------------------------------------------------------------
// Surface
// ------------------------------------------------------------------

/// Graph surface backed by an egui_graphs graph.
///
/// Layout positions are applied directly and also queued for the view,
/// which pushes them into the layout state on the next frame. Fits are
/// honoured on the next frame as well.
pub struct EguiSurface {
    graph: GeneGraph,
    index: HashMap<NodeId, NodeIndex>,
    container: Rc<Cell<Size>>,
    visuals: NodeVisualSettings,
    viewport: Viewport,
    fit_pending: bool,
    layout_pending: bool,
    destroyed: bool,
}

impl EguiSurface {
    fn new(container: Rc<Cell<Size>>, visuals: NodeVisualSettings) -> Self {
        Self {
            graph: empty_graph(),
            index: HashMap::new(),
            container,
            visuals,
            viewport: Viewport::default(),
            fit_pending: false,
            layout_pending: false,
            destroyed: false,
        }
    }

    pub fn graph_mut(&mut self) -> &mut GeneGraph {
        &mut self.graph
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn id_of(&self, index: usize) -> Option<NodeId> {
        self.graph
            .node(NodeIndex::new(index))
            .map(|node| node.payload().id.clone())
    }

    /// Ids of the nodes selected inside the view, in index order.
    pub fn view_selection(&self) -> Vec<NodeId> {
        self.graph
            .selected_nodes()
            .iter()
            .filter_map(|idx| self.id_of(idx.index()))
            .collect()
    }

    /// Put every node back on its layout position on the next frame.
    pub fn request_relayout(&mut self) {
        self.layout_pending = true;
    }

    pub fn request_fit(&mut self) {
        self.fit_pending = true;
    }

    pub fn take_layout_request(&mut self) -> Option<LayoutStateCluster> {
        if !std::mem::take(&mut self.layout_pending) {
            return None;
        }
        let positions = self
            .graph
            .nodes_iter()
            .map(|(idx, node)| (idx.index(), node.payload().home))
            .collect();
        Some(LayoutStateCluster::pending(positions))
    }

    pub fn take_fit_request(&mut self) -> bool {
        std::mem::take(&mut self.fit_pending)
    }

    pub fn set_visuals(&mut self, visuals: &NodeVisualSettings) {
        self.visuals = visuals.clone();
        let ids: Vec<NodeId> = self.index.keys().cloned().collect();
        for id in ids {
            self.with_node(&id, |node| node.visuals = visuals.clone());
        }
    }

    fn with_node(&mut self, id: &str, f: impl FnOnce(&mut GeneNode)) {
        let Some(idx) = self.index.get(id).copied() else {
            return;
        };
        if let Some(node) = self.graph.node_mut(idx) {
            f(node.payload_mut());
            let payload = node.payload().clone();
            node.display_mut().sync_payload(&payload);
        }
    }
}

impl GraphSurface for EguiSurface {
    fn add_node(&mut self, node: &Node) {
        let idx = self.graph.add_node(GeneNode::from_node(node, &self.visuals));
        if let Some(graph_node) = self.graph.node_mut(idx) {
            graph_node.set_label(node.name.clone());
        }
        self.index.insert(node.id.clone(), idx);
    }

    fn add_edge(&mut self, edge: &Edge, style: cluster_sync::surface::EdgeStyle) {
        let (Some(a), Some(b)) = (self.index.get(&edge.source), self.index.get(&edge.target)) else {
            return;
        };
        let idx = self.graph.add_edge(*a, *b, GeneEdge::from(style));
        if let Some(graph_edge) = self.graph.edge_mut(idx) {
            graph_edge.set_label(String::new());
        }
    }

    fn set_position(&mut self, id: &str, position: cluster_sync::surface::Point) {
        let Some(idx) = self.index.get(id).copied() else {
            return;
        };
        if let Some(node) = self.graph.node_mut(idx) {
            node.payload_mut().home = to_pos2(position);
            node.set_location(to_pos2(position));
        }
        self.layout_pending = true;
    }

    fn set_color(&mut self, id: &str, color: Color) {
        let Some(idx) = self.index.get(id).copied() else {
            return;
        };
        if let Some(node) = self.graph.node_mut(idx) {
            node.payload_mut().color = color;
            node.set_color(to_color32(color));
        }
    }

    fn set_dimmed(&mut self, id: &str, dimmed: bool) {
        self.with_node(id, |node| node.dimmed = dimmed);
    }

    fn set_selected(&mut self, id: &str, selected: bool) {
        if let Some(idx) = self.index.get(id).copied()
            && let Some(node) = self.graph.node_mut(idx)
        {
            node.set_selected(selected);
        }
    }

    fn set_hovered(&mut self, id: &str, hovered: bool) {
        self.with_node(id, |node| node.emphasized = hovered);
    }

    fn set_ring(&mut self, id: &str, slices: Vec<RingSlice>) {
        self.with_node(id, |node| node.ring = slices);
    }

    fn fit(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.fit_pending = true;
    }

    fn container_size(&self) -> Size {
        self.container.get()
    }

    fn anchor_of(&self, id: &str) -> Option<Rect> {
        let node = self.graph.node(*self.index.get(id)?)?;
        if let Some(rect) = node.display().screen_rect() {
            return Some(Rect::new(to_point(rect.min), to_point(rect.max)));
        }
        // Not drawn yet: derive from the fitted viewport.
        let center = self.viewport.to_screen(to_point(node.location()));
        Some(Rect::around(center, self.visuals.node_radius * self.viewport.zoom))
    }

    fn snapshot(&self) -> SceneSnapshot {
        let nodes = self
            .graph
            .nodes_iter()
            .map(|(_, node)| {
                let payload = node.payload();
                SceneNode {
                    id: payload.id.clone(),
                    label: payload.name.clone(),
                    cluster: payload.cluster,
                    position: to_point(node.location()),
                    color: payload.color,
                    dimmed: payload.dimmed,
                    selected: node.selected(),
                    hovered: payload.emphasized,
                    ring: payload.ring.clone(),
                }
            })
            .collect();
        let edges = self
            .graph
            .edges_iter()
            .filter_map(|(idx, edge)| {
                let (a, b) = self.graph.g().edge_endpoints(idx)?;
                Some(SceneEdge {
                    source: self.id_of(a.index())?,
                    target: self.id_of(b.index())?,
                    style: edge.payload().style(),
                })
            })
            .collect();
        SceneSnapshot {
            nodes,
            edges,
            viewport: self.viewport,
        }
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.graph = empty_graph();
        self.index.clear();
        self.fit_pending = false;
        self.layout_pending = false;
    }
}

/// Creates egui surfaces sharing the size of the central panel.
pub struct EguiSurfaceFactory {
    container: Rc<Cell<Size>>,
    visuals: NodeVisualSettings,
}

impl EguiSurfaceFactory {
    pub fn new(initial: Size, visuals: NodeVisualSettings) -> Self {
        Self {
            container: Rc::new(Cell::new(initial)),
            visuals,
        }
    }

    pub fn container_size(&self) -> Size {
        self.container.get()
    }

    pub fn set_container_size(&self, size: Size) {
        self.container.set(size);
    }

    pub fn set_visuals(&mut self, visuals: &NodeVisualSettings) {
        self.visuals = visuals.clone();
    }
}

impl SurfaceFactory for EguiSurfaceFactory {
    type Surface = EguiSurface;

    fn create(&mut self) -> EguiSurface {
        EguiSurface::new(Rc::clone(&self.container), self.visuals.clone())
    }
}

// ------------------------------------------------------------------
// Drawing and interaction
// ------------------------------------------------------------------

/// What happened in the graph panel this frame.
#[derive(Debug, Default)]
pub struct GraphResponse {
    pub events: Vec<ViewEvent>,
    /// The view was panned or zoomed, or a node was dragged.
    pub moved: bool,
    pub size: Size,
}

/// Fraction of the panel kept free around the graph when egui_graphs
/// fits it, given a padding in pixels.
fn fit_padding_fraction(padding: f32, size: Size) -> f32 {
    let shortest = size.width.min(size.height);
    if shortest <= 0.0 {
        return 0.0;
    }
    (2.0 * padding / shortest).clamp(0.0, 0.5)
}

pub fn show(ui: &mut egui::Ui, surface: &mut EguiSurface, padding: f32) -> GraphResponse {
    let available = ui.available_size();
    let size = Size::new(available.x, available.y);

    if let Some(state) = surface.take_layout_request() {
        egui_graphs::set_layout_state::<LayoutStateCluster>(ui, state, None);
    }
    let fit = surface.take_fit_request();

    let interaction = SettingsInteraction::new()
        .with_dragging_enabled(true)
        .with_hover_enabled(true)
        .with_node_clicking_enabled(true)
        .with_node_selection_enabled(true)
        .with_node_selection_multi_enabled(true);
    let navigation = SettingsNavigation::new()
        .with_fit_to_screen_enabled(fit)
        .with_zoom_and_pan_enabled(!fit)
        .with_fit_to_screen_padding(fit_padding_fraction(padding, size));
    let style = SettingsStyle::new().with_labels_always(false);

    let (sink, events) = crossbeam_channel::unbounded::<Event>();
    let response = ui.add(
        &mut GeneGraphView::new(surface.graph_mut())
            .with_interactions(&interaction)
            .with_navigations(&navigation)
            .with_styles(&style)
            .with_event_sink(&sink),
    );

    let mut out = GraphResponse {
        size,
        moved: fit,
        ..GraphResponse::default()
    };
    let mut clicked_node = false;
    let mut selection_changed = false;
    for event in events.try_iter() {
        match event {
            Event::NodeClick(p) => {
                if let Some(id) = surface.id_of(p.id) {
                    clicked_node = true;
                    out.events.push(ViewEvent::NodeClicked(id));
                }
            }
            Event::NodeHoverEnter(p) => {
                if let Some(id) = surface.id_of(p.id) {
                    out.events.push(ViewEvent::NodeHovered(id));
                }
            }
            Event::NodeHoverLeave(_) => out.events.push(ViewEvent::NodeUnhovered),
            Event::NodeSelect(_) | Event::NodeDeselect(_) => selection_changed = true,
            Event::Pan(_) | Event::Zoom(_) | Event::NodeMove(_) => out.moved = true,
            _ => {}
        }
    }

    if selection_changed && !clicked_node {
        let selected = surface.view_selection();
        if selected.len() > 1 {
            out.events.push(ViewEvent::NodesBoxSelected(selected));
        }
    }
    if response.clicked() && !clicked_node {
        out.events.push(ViewEvent::CanvasClicked);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_sync::surface::{EdgeStyle, Point};
    use cluster_sync::{GraphLayoutCoordinator, RingKey, RingSpec};
    use egui::Color32;

    fn factory() -> EguiSurfaceFactory {
        EguiSurfaceFactory::new(Size::new(800.0, 600.0), NodeVisualSettings::default())
    }

    fn nodes() -> Vec<Node> {
        vec![
            Node::new("g1", 1).with_name("TP53").with_sources(["AD", "PD"]),
            Node::new("g2", 1).with_sources(["AD"]),
            Node::new("g3", 2),
        ]
    }

    fn edges() -> Vec<Edge> {
        vec![Edge::new("g1", "g2", true), Edge::new("g2", "g3", false)]
    }

    #[test]
    fn test_surface_records_nodes_and_edges() {
        let mut surface = factory().create();
        for node in nodes() {
            surface.add_node(&node);
        }
        surface.add_edge(&Edge::new("g1", "g2", true), EdgeStyle::INTRA);
        surface.add_edge(&Edge::new("g1", "missing", true), EdgeStyle::INTRA);
        surface.set_position("g3", Point::new(40.0, -20.0));

        let scene = surface.snapshot();
        assert_eq!(scene.nodes.len(), 3);
        assert_eq!(scene.edges.len(), 1);
        assert_eq!(scene.node("g1").map(|n| n.label.as_str()), Some("TP53"));
        assert_eq!(scene.node("g3").map(|n| n.position), Some(Point::new(40.0, -20.0)));

        let layout = surface.take_layout_request().unwrap();
        assert_eq!(layout.positions.len(), 3);
        assert!(!layout.applied);
        assert!(surface.take_layout_request().is_none());
    }

    #[test]
    fn test_payload_edits_reach_the_scene() {
        let mut surface = factory().create();
        for node in nodes() {
            surface.add_node(&node);
        }
        surface.set_dimmed("g2", true);
        surface.set_hovered("g1", true);
        surface.set_color("g3", Color::rgb(1, 2, 3));
        surface.set_dimmed("unknown", true);

        let scene = surface.snapshot();
        assert!(scene.node("g2").unwrap().dimmed);
        assert!(scene.node("g1").unwrap().hovered);
        assert_eq!(scene.node("g3").unwrap().color, Color::rgb(1, 2, 3));
    }

    #[test]
    fn test_anchor_falls_back_to_viewport_before_first_frame() {
        let mut surface = factory().create();
        surface.add_node(&Node::new("g1", 0));
        surface.set_position("g1", Point::new(10.0, 10.0));
        surface.fit(Viewport {
            zoom: 2.0,
            pan: Point::new(100.0, 50.0),
        });

        let anchor = surface.anchor_of("g1").unwrap();
        assert_eq!(anchor.center(), Point::new(120.0, 70.0));
        assert_eq!(anchor.width(), 32.0);
        assert!(surface.take_fit_request());
        assert_eq!(surface.anchor_of("g9"), None);
    }

    #[test]
    fn test_destroy_empties_the_graph() {
        let mut surface = factory().create();
        surface.add_node(&Node::new("g1", 0));
        surface.destroy();

        assert!(surface.is_destroyed());
        assert!(surface.snapshot().is_empty());
        assert_eq!(surface.anchor_of("g1"), None);
    }

    #[test]
    fn test_coordinator_drives_egui_surface() {
        let mut coordinator = GraphLayoutCoordinator::new(factory());
        let counts = coordinator.rebuild(nodes(), &edges(), None).unwrap();
        coordinator.draw_ring(RingSpec::new(RingKey::Source, Default::default()));

        assert_eq!(counts.nodes, 3);
        assert_eq!(counts.inter_edges, 1);
        let surface = coordinator.surface().unwrap();
        let scene = surface.snapshot();
        assert_eq!(scene.edges.len(), 2);
        assert_eq!(scene.node("g1").unwrap().ring.len(), 2);
        assert!(scene.node("g3").unwrap().ring.is_empty());
        assert!(scene.viewport.zoom > 0.0);

        coordinator.highlight_cluster(Some(1));
        let scene = coordinator.surface().unwrap().snapshot();
        assert!(scene.node("g3").unwrap().dimmed);
        assert!(!scene.node("g1").unwrap().dimmed);
    }

    #[test]
    fn test_overlay_edges_are_dashed_and_faded() {
        let segment = Shape::LineSegment {
            points: [Pos2::ZERO, Pos2::new(100.0, 0.0)],
            stroke: Stroke::new(1.0, Color32::from_rgb(80, 80, 80)),
        };

        let solid = restyle(segment.clone(), 1.0, false);
        assert_eq!(solid.len(), 1);
        let dashed = restyle(segment, 0.5, true);
        assert!(dashed.len() > 1);
    }

    #[test]
    fn test_fit_padding_fraction() {
        assert_eq!(fit_padding_fraction(30.0, Size::new(600.0, 300.0)), 0.2);
        assert_eq!(fit_padding_fraction(30.0, Size::default()), 0.0);
        assert_eq!(fit_padding_fraction(500.0, Size::new(600.0, 300.0)), 0.5);
    }
}
