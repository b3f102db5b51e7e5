use cluster_sync::palette::NEUTRAL_GRAY;
use cluster_sync::surface::{EdgeLayer, EdgeStyle, Point};
use cluster_sync::{Color, Node, NodeId, RingSlice};
use eframe::egui::{Color32, Pos2};
use serde::{Deserialize, Serialize};

use crate::layout_settings::NodeVisualSettings;

/// Node payload carried by the egui graph. Everything the node shape
/// draws besides what egui_graphs tracks itself lives here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneNode {
    pub id: NodeId,
    pub name: String,
    pub cluster: i64,
    /// Position assigned by the cluster layout.
    pub home: Pos2,
    pub color: Color,
    pub dimmed: bool,
    /// Hovered through another view.
    pub emphasized: bool,
    pub ring: Vec<RingSlice>,
    pub visuals: NodeVisualSettings,
}

impl Default for GeneNode {
    fn default() -> Self {
        Self {
            id: NodeId::new(),
            name: String::new(),
            cluster: 0,
            home: Pos2::ZERO,
            color: NEUTRAL_GRAY,
            dimmed: false,
            emphasized: false,
            ring: Vec::new(),
            visuals: NodeVisualSettings::default(),
        }
    }
}

impl GeneNode {
    pub fn from_node(node: &Node, visuals: &NodeVisualSettings) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            cluster: node.cluster,
            visuals: visuals.clone(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneEdge {
    pub overlay: bool,
    pub opacity: f32,
}

impl From<EdgeStyle> for GeneEdge {
    fn from(style: EdgeStyle) -> Self {
        Self {
            overlay: style.layer == EdgeLayer::InterOverlay,
            opacity: style.opacity,
        }
    }
}

impl GeneEdge {
    pub fn style(&self) -> EdgeStyle {
        if self.overlay {
            EdgeStyle::overlay(self.opacity)
        } else {
            EdgeStyle::INTRA
        }
    }
}

pub fn to_color32(color: Color) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r, color.g, color.b, color.a)
}

pub fn from_color32(color: Color32) -> Color {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    Color { r, g, b, a }
}

pub fn to_pos2(point: Point) -> Pos2 {
    Pos2::new(point.x, point.y)
}

pub fn to_point(pos: Pos2) -> Point {
    Point::new(pos.x, pos.y)
}
