// The rendering-engine capability the coordinator drives, plus a headless
// implementation used for export and tests.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::model::{Edge, Node, NodeId};
use crate::palette::{Color, NEUTRAL_GRAY};
use crate::ring::RingSlice;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Width over height; degenerate sizes count as square.
    pub fn aspect_ratio(&self) -> f32 {
        if self.width > 0.0 && self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    pub const fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(
            origin,
            Point::new(origin.x + size.width, origin.y + size.height),
        )
    }

    pub fn around(center: Point, radius: f32) -> Self {
        Self::new(
            Point::new(center.x - radius, center.y - radius),
            Point::new(center.x + radius, center.y + radius),
        )
    }

    /// Smallest rect containing every point, `None` when empty.
    pub fn bounding(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        points.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => Rect::new(p, p),
                Some(r) => Rect::new(
                    Point::new(r.min.x.min(p.x), r.min.y.min(p.y)),
                    Point::new(r.max.x.max(p.x), r.max.y.max(p.y)),
                ),
            })
        })
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    pub fn expand(&self, amount: f32) -> Self {
        Self::new(
            Point::new(self.min.x - amount, self.min.y - amount),
            Point::new(self.max.x + amount, self.max.y + amount),
        )
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.min.x >= self.min.x
            && other.min.y >= self.min.y
            && other.max.x <= self.max.x
            && other.max.y <= self.max.y
    }
}

/// Maps world coordinates to screen: `screen = world * zoom + pan`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub zoom: f32,
    pub pan: Point,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Point::default(),
        }
    }
}

impl Viewport {
    pub fn to_screen(&self, world: Point) -> Point {
        Point::new(
            world.x * self.zoom + self.pan.x,
            world.y * self.zoom + self.pan.y,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeLayer {
    Intra,
    /// Cross-cluster links drawn over the settled layout.
    InterOverlay,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeStyle {
    pub layer: EdgeLayer,
    pub opacity: f32,
}

impl EdgeStyle {
    pub const INTRA: EdgeStyle = EdgeStyle {
        layer: EdgeLayer::Intra,
        opacity: 1.0,
    };

    pub fn overlay(opacity: f32) -> Self {
        Self {
            layer: EdgeLayer::InterOverlay,
            opacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: NodeId,
    pub label: String,
    pub cluster: i64,
    pub position: Point,
    pub color: Color,
    pub dimmed: bool,
    pub selected: bool,
    pub hovered: bool,
    pub ring: Vec<RingSlice>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub style: EdgeStyle,
}

/// Everything a renderer shows, in world coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneSnapshot {
    pub nodes: Vec<SceneNode>,
    pub edges: Vec<SceneEdge>,
    pub viewport: Viewport,
}

impl SceneSnapshot {
    pub fn node(&self, id: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A graph rendering engine instance.
///
/// Owned exclusively by the layout coordinator. Calls naming an unknown
/// node id are ignored.
pub trait GraphSurface {
    fn add_node(&mut self, node: &Node);
    fn add_edge(&mut self, edge: &Edge, style: EdgeStyle);
    fn set_position(&mut self, id: &str, position: Point);
    fn set_color(&mut self, id: &str, color: Color);
    fn set_dimmed(&mut self, id: &str, dimmed: bool);
    fn set_selected(&mut self, id: &str, selected: bool);
    fn set_hovered(&mut self, id: &str, hovered: bool);
    /// An empty slice list renders a solid border.
    fn set_ring(&mut self, id: &str, slices: Vec<RingSlice>);
    fn fit(&mut self, viewport: Viewport);
    /// Current pixel size of the hosting container.
    fn container_size(&self) -> Size;
    /// Screen-space bounds of a node, for anchoring overlays.
    fn anchor_of(&self, id: &str) -> Option<Rect>;
    fn snapshot(&self) -> SceneSnapshot;
    /// Release the instance and everything attached to it.
    fn destroy(&mut self);
}

/// Creates a fresh surface for every rebuild.
pub trait SurfaceFactory {
    type Surface: GraphSurface;

    fn create(&mut self) -> Self::Surface;
}

// ------------------------------------------------------------------
// Headless surface
// ------------------------------------------------------------------

/// Radius, in world units, used to anchor overlays on headless nodes.
pub const HEADLESS_NODE_RADIUS: f32 = 8.0;

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    AddNode(NodeId),
    AddEdge(NodeId, NodeId, EdgeLayer),
    Position(NodeId),
    Fit(Viewport),
    Destroy,
}

/// In-memory surface that records what was drawn.
#[derive(Debug)]
pub struct SceneSurface {
    size: Size,
    order: Vec<NodeId>,
    nodes: BTreeMap<NodeId, SceneNode>,
    edges: Vec<SceneEdge>,
    viewport: Viewport,
    ops: Vec<SurfaceOp>,
    live: Rc<Cell<usize>>,
    destroyed: bool,
}

impl SceneSurface {
    pub fn new(size: Size) -> Self {
        Self::with_counter(size, Rc::new(Cell::new(0)))
    }

    fn with_counter(size: Size, live: Rc<Cell<usize>>) -> Self {
        live.set(live.get() + 1);
        Self {
            size,
            order: Vec::new(),
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            viewport: Viewport::default(),
            ops: Vec::new(),
            live,
            destroyed: false,
        }
    }

    pub fn resize(&mut self, size: Size) {
        self.size = size;
    }

    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    pub fn node(&self, id: &str) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn with_node(&mut self, id: &str, f: impl FnOnce(&mut SceneNode)) {
        if let Some(node) = self.nodes.get_mut(id) {
            f(node);
        }
    }
}

impl GraphSurface for SceneSurface {
    fn add_node(&mut self, node: &Node) {
        self.ops.push(SurfaceOp::AddNode(node.id.clone()));
        if self.nodes.contains_key(&node.id) {
            return;
        }
        self.order.push(node.id.clone());
        self.nodes.insert(
            node.id.clone(),
            SceneNode {
                id: node.id.clone(),
                label: node.name.clone(),
                cluster: node.cluster,
                position: Point::default(),
                color: NEUTRAL_GRAY,
                dimmed: false,
                selected: false,
                hovered: false,
                ring: Vec::new(),
            },
        );
    }

    fn add_edge(&mut self, edge: &Edge, style: EdgeStyle) {
        if !self.nodes.contains_key(&edge.source)
            || !self.nodes.contains_key(&edge.target)
        {
            return;
        }
        self.ops.push(SurfaceOp::AddEdge(
            edge.source.clone(),
            edge.target.clone(),
            style.layer,
        ));
        self.edges.push(SceneEdge {
            source: edge.source.clone(),
            target: edge.target.clone(),
            style,
        });
    }

    fn set_position(&mut self, id: &str, position: Point) {
        self.ops.push(SurfaceOp::Position(id.to_string()));
        self.with_node(id, |n| n.position = position);
    }

    fn set_color(&mut self, id: &str, color: Color) {
        self.with_node(id, |n| n.color = color);
    }

    fn set_dimmed(&mut self, id: &str, dimmed: bool) {
        self.with_node(id, |n| n.dimmed = dimmed);
    }

    fn set_selected(&mut self, id: &str, selected: bool) {
        self.with_node(id, |n| n.selected = selected);
    }

    fn set_hovered(&mut self, id: &str, hovered: bool) {
        self.with_node(id, |n| n.hovered = hovered);
    }

    fn set_ring(&mut self, id: &str, slices: Vec<RingSlice>) {
        self.with_node(id, |n| n.ring = slices);
    }

    fn fit(&mut self, viewport: Viewport) {
        self.ops.push(SurfaceOp::Fit(viewport));
        self.viewport = viewport;
    }

    fn container_size(&self) -> Size {
        self.size
    }

    fn anchor_of(&self, id: &str) -> Option<Rect> {
        let node = self.nodes.get(id)?;
        let center = self.viewport.to_screen(node.position);
        Some(Rect::around(
            center,
            HEADLESS_NODE_RADIUS * self.viewport.zoom,
        ))
    }

    fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            nodes: self
                .order
                .iter()
                .filter_map(|id| self.nodes.get(id).cloned())
                .collect(),
            edges: self.edges.clone(),
            viewport: self.viewport,
        }
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.ops.push(SurfaceOp::Destroy);
        self.nodes.clear();
        self.order.clear();
        self.edges.clear();
        self.live.set(self.live.get().saturating_sub(1));
    }
}

/// Factory for headless surfaces that counts live instances.
#[derive(Debug, Clone)]
pub struct SceneSurfaceFactory {
    size: Size,
    live: Rc<Cell<usize>>,
    created: Rc<Cell<usize>>,
}

impl SceneSurfaceFactory {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            live: Rc::new(Cell::new(0)),
            created: Rc::new(Cell::new(0)),
        }
    }

    pub fn live_instances(&self) -> usize {
        self.live.get()
    }

    pub fn created_instances(&self) -> usize {
        self.created.get()
    }
}

impl SurfaceFactory for SceneSurfaceFactory {
    type Surface = SceneSurface;

    fn create(&mut self) -> SceneSurface {
        self.created.set(self.created.get() + 1);
        SceneSurface::with_counter(self.size, Rc::clone(&self.live))
    }
}
