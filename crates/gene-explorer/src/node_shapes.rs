use cluster_sync::RingSlice;
use eframe::egui::{
    self, Color32, FontFamily, FontId, Pos2, Shape, Stroke, Vec2,
    epaint::{CircleShape, TextShape},
};
use egui_graphs::{DisplayNode, DrawContext, NodeProps};
use petgraph::{EdgeType, stable_graph::IndexType};
use serde::{Deserialize, Serialize};

use crate::graph_state::{GeneNode, to_color32};
use crate::layout_settings::NodeVisualSettings;

const LABEL_GAP: f32 = 4.0;
const DIMMED_ALPHA: f32 = 0.2;
/// Angular resolution of ring arcs, in degrees per segment.
const ARC_STEP_DEG: f32 = 6.0;

/// Points along a ring arc. Angles are degrees clockwise from the top,
/// matching the ring slices.
pub fn arc_points(center: Pos2, radius: f32, start_deg: f32, end_deg: f32) -> Vec<Pos2> {
    let sweep = (end_deg - start_deg).max(0.0);
    let segments = ((sweep / ARC_STEP_DEG).ceil() as usize).max(1);
    (0..=segments)
        .map(|i| {
            let deg = start_deg + sweep * i as f32 / segments as f32;
            let rad = deg.to_radians();
            Pos2::new(center.x + radius * rad.sin(), center.y - radius * rad.cos())
        })
        .collect()
}

/// Gene node: a filled disc colored by cluster, an optional ring of
/// colored arcs, and a label underneath.
///
/// The last screen-space bounds are kept so overlays can anchor on the
/// node after pans and zooms.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RingNodeShape {
    pos: Pos2,
    selected: bool,
    dragged: bool,
    hovered: bool,
    color: Option<Color32>,
    label_text: String,
    dimmed: bool,
    emphasized: bool,
    ring: Vec<RingSlice>,
    visuals: NodeVisualSettings,
    #[serde(skip)]
    screen_rect: Option<egui::Rect>,
}

impl From<NodeProps<GeneNode>> for RingNodeShape {
    fn from(props: NodeProps<GeneNode>) -> Self {
        Self {
            pos: props.location(),
            selected: props.selected,
            dragged: props.dragged,
            hovered: props.hovered,
            color: props.color(),
            dimmed: props.payload.dimmed,
            emphasized: props.payload.emphasized,
            ring: props.payload.ring.clone(),
            visuals: props.payload.visuals.clone(),
            label_text: props.label,
            screen_rect: None,
        }
    }
}

impl<E: Clone, Ty: EdgeType, Ix: IndexType> DisplayNode<GeneNode, E, Ty, Ix> for RingNodeShape {
    fn closest_boundary_point(&self, dir: Vec2) -> Pos2 {
        self.pos + dir.normalized() * self.outer_radius()
    }

    fn shapes(&mut self, ctx: &DrawContext) -> Vec<Shape> {
        let mut res = Vec::with_capacity(2 + self.ring.len());
        let center = ctx.meta.canvas_to_screen_pos(self.pos);
        let radius = ctx.meta.canvas_to_screen_size(self.visuals.node_radius);
        let ring_width = ctx.meta.canvas_to_screen_size(self.visuals.ring_width);
        let outer = ctx.meta.canvas_to_screen_size(self.outer_radius());
        self.screen_rect = Some(egui::Rect::from_center_size(center, Vec2::splat(2.0 * outer)));

        let alpha = if self.dimmed { DIMMED_ALPHA } else { 1.0 };
        let fill = self.fill_color(ctx).gamma_multiply(alpha);
        let stroke = self.effective_stroke();
        res.push(
            CircleShape {
                center,
                radius,
                fill,
                stroke: Stroke::new(stroke.width, stroke.color.gamma_multiply(alpha)),
            }
            .into(),
        );

        let ring_radius = radius + ring_width / 2.0;
        match self.ring.as_slice() {
            [] => {}
            [whole] => res.push(
                CircleShape::stroke(
                    center,
                    ring_radius,
                    Stroke::new(ring_width, to_color32(whole.color).gamma_multiply(alpha)),
                )
                .into(),
            ),
            slices => {
                for slice in slices {
                    res.push(Shape::line(
                        arc_points(center, ring_radius, slice.start_deg, slice.end_deg),
                        Stroke::new(ring_width, to_color32(slice.color).gamma_multiply(alpha)),
                    ));
                }
            }
        }

        if !self.should_show_label() {
            return res;
        }
        let text_color = ctx.ctx.style().visuals.text_color().gamma_multiply(alpha);
        let galley = ctx.ctx.fonts_mut(|f| {
            f.layout_no_wrap(
                self.label_text.clone(),
                FontId::new(
                    ctx.meta.canvas_to_screen_size(self.visuals.label_font_size),
                    FontFamily::Proportional,
                ),
                text_color,
            )
        });
        let label_pos = Pos2::new(
            center.x - galley.size().x / 2.0,
            center.y + outer + ctx.meta.canvas_to_screen_size(LABEL_GAP),
        );
        res.push(TextShape::new(label_pos, galley, text_color).into());
        res
    }

    fn update(&mut self, state: &NodeProps<GeneNode>) {
        self.pos = state.location();
        self.selected = state.selected;
        self.dragged = state.dragged;
        self.hovered = state.hovered;
        self.color = state.color();
        self.label_text = state.label.clone();
        self.dimmed = state.payload.dimmed;
        self.emphasized = state.payload.emphasized;
        self.ring = state.payload.ring.clone();
        self.visuals = state.payload.visuals.clone();
    }

    fn is_inside(&self, pos: Pos2) -> bool {
        (pos - self.pos).length() <= self.outer_radius()
    }
}

impl RingNodeShape {
    pub fn screen_rect(&self) -> Option<egui::Rect> {
        self.screen_rect
    }

    /// Copy payload-driven state after the payload was edited in place.
    pub fn sync_payload(&mut self, payload: &GeneNode) {
        self.dimmed = payload.dimmed;
        self.emphasized = payload.emphasized;
        self.ring = payload.ring.clone();
        self.visuals = payload.visuals.clone();
    }

    fn outer_radius(&self) -> f32 {
        if self.ring.is_empty() {
            self.visuals.node_radius
        } else {
            self.visuals.node_radius + self.visuals.ring_width
        }
    }

    fn should_show_label(&self) -> bool {
        self.visuals.show_labels || self.selected || self.hovered || self.emphasized
    }

    fn fill_color(&self, ctx: &DrawContext) -> Color32 {
        match self.color {
            Some(c) => c,
            None => ctx.ctx.style().visuals.widgets.inactive.fg_stroke.color,
        }
    }

    fn effective_stroke(&self) -> Stroke {
        if self.selected {
            Stroke::new(3.0, Color32::from_rgb(200, 60, 70))
        } else if self.hovered || self.emphasized || self.dragged {
            Stroke::new(2.5, Color32::from_rgb(40, 40, 40))
        } else {
            Stroke::new(1.0, Color32::from_rgb(80, 80, 80))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_sync::palette::NEUTRAL_GRAY;

    fn shape(ring: Vec<RingSlice>) -> RingNodeShape {
        RingNodeShape {
            pos: Pos2::new(10.0, 10.0),
            selected: false,
            dragged: false,
            hovered: false,
            color: None,
            label_text: String::from("TP53"),
            dimmed: false,
            emphasized: false,
            ring,
            visuals: NodeVisualSettings::default(),
            screen_rect: None,
        }
    }

    #[test]
    fn test_arc_starts_at_top_and_runs_clockwise() {
        let points = arc_points(Pos2::ZERO, 10.0, 0.0, 90.0);
        let first = points[0];
        let last = points[points.len() - 1];
        assert!(first.x.abs() < 1e-4 && (first.y + 10.0).abs() < 1e-4);
        assert!((last.x - 10.0).abs() < 1e-4 && last.y.abs() < 1e-4);
        assert_eq!(points.len(), 16);
    }

    #[test]
    fn test_degenerate_arc_still_has_two_points() {
        assert_eq!(arc_points(Pos2::ZERO, 5.0, 45.0, 45.0).len(), 2);
    }

    #[test]
    fn test_ring_widens_hit_area() {
        let bare = shape(Vec::new());
        let ringed = shape(vec![RingSlice {
            start_deg: 0.0,
            end_deg: 360.0,
            color: NEUTRAL_GRAY,
        }]);
        let probe = Pos2::new(10.0, 19.5);

        assert!(!DisplayNode::<GeneNode, (), petgraph::Undirected, u32>::is_inside(&bare, probe));
        assert!(DisplayNode::<GeneNode, (), petgraph::Undirected, u32>::is_inside(&ringed, probe));
    }

    #[test]
    fn test_labels_follow_interaction_when_hidden() {
        let mut node = shape(Vec::new());
        node.visuals.show_labels = false;
        assert!(!node.should_show_label());
        node.emphasized = true;
        assert!(node.should_show_label());
    }
}
