// Vector renderings of the two exportable panels.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::export::{VectorPanel, ViewBox};
use crate::palette::{self, Palette};
use crate::ring::RingSlice;
use crate::surface::{EdgeLayer, Point, Rect, SceneSnapshot};
use crate::views::EnrichmentBar;

const NODE_RADIUS: f32 = 8.0;
const RING_WIDTH: f32 = 3.0;
const LABEL_OFFSET: f32 = 14.0;
const LABEL_SPACE: f32 = 60.0;
const DIMMED_OPACITY: f32 = 0.2;

const BAR_LABEL_WIDTH: f32 = 280.0;
const BAR_MAX_LENGTH: f32 = 320.0;
const BAR_ROW: f32 = 22.0;
const BAR_THICKNESS: f32 = 16.0;
const AXIS_SPACE: f32 = 30.0;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Point on a circle, angles in degrees clockwise from the top.
fn polar(center: Point, radius: f32, degrees: f32) -> Point {
    let radians = degrees.to_radians();
    Point::new(
        center.x + radius * radians.sin(),
        center.y - radius * radians.cos(),
    )
}

fn arc_path(center: Point, radius: f32, slice: &RingSlice) -> String {
    let start = polar(center, radius, slice.start_deg);
    let end = polar(center, radius, slice.end_deg);
    let large = if slice.sweep() > 180.0 { 1 } else { 0 };
    format!(
        "M {:.2} {:.2} A {radius} {radius} 0 {large} 1 {:.2} {:.2}",
        start.x, start.y, end.x, end.y
    )
}

fn write_ring(svg: &mut String, center: Point, slices: &[RingSlice], opacity: f32) {
    let radius = NODE_RADIUS + RING_WIDTH / 2.0;
    match slices {
        [] => {}
        // A full-circle arc degenerates, draw a plain circle instead.
        [whole] => {
            let _ = write!(
                svg,
                r#"<circle cx="{:.2}" cy="{:.2}" r="{radius}" fill="none" stroke="{}" stroke-width="{RING_WIDTH}" opacity="{opacity}"/>"#,
                center.x,
                center.y,
                whole.color.to_hex(),
            );
        }
        slices => {
            for slice in slices {
                let _ = write!(
                    svg,
                    r#"<path d="{}" fill="none" stroke="{}" stroke-width="{RING_WIDTH}" opacity="{opacity}"/>"#,
                    arc_path(center, radius, slice),
                    slice.color.to_hex(),
                );
            }
        }
    }
}

/// Render the graph scene in world coordinates. `None` when there is
/// nothing to draw.
pub fn render_graph(scene: &SceneSnapshot) -> Option<VectorPanel> {
    let bounds = Rect::bounding(scene.nodes.iter().map(|n| n.position))?
        .expand(NODE_RADIUS + RING_WIDTH + LABEL_OFFSET);
    let view_box = ViewBox::new(
        bounds.min.x - LABEL_SPACE,
        bounds.min.y,
        bounds.width() + 2.0 * LABEL_SPACE,
        bounds.height(),
    );
    let positions: HashMap<&str, Point> = scene
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n.position))
        .collect();

    let mut svg = String::new();
    svg.push_str(r##"<g class="edges" stroke="#999999">"##);
    // Intra edges first so the overlay is painted on top.
    let intra = scene.edges.iter().filter(|e| e.style.layer == EdgeLayer::Intra);
    let inter = scene.edges.iter().filter(|e| e.style.layer == EdgeLayer::InterOverlay);
    for edge in intra.chain(inter) {
        let (Some(a), Some(b)) = (
            positions.get(edge.source.as_str()),
            positions.get(edge.target.as_str()),
        ) else {
            continue;
        };
        let dash = match edge.style.layer {
            EdgeLayer::Intra => "",
            EdgeLayer::InterOverlay => r#" stroke-dasharray="4 3""#,
        };
        let _ = write!(
            svg,
            r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke-opacity="{}"{dash}/>"#,
            a.x, a.y, b.x, b.y, edge.style.opacity
        );
    }
    svg.push_str("</g>");

    svg.push_str(r#"<g class="nodes">"#);
    for node in &scene.nodes {
        let opacity = if node.dimmed { DIMMED_OPACITY } else { 1.0 };
        let stroke = if node.selected { "#000000" } else { "#ffffff" };
        let _ = write!(
            svg,
            r#"<circle cx="{:.2}" cy="{:.2}" r="{NODE_RADIUS}" fill="{}" stroke="{stroke}" opacity="{opacity}"/>"#,
            node.position.x,
            node.position.y,
            node.color.to_hex(),
        );
        write_ring(&mut svg, node.position, &node.ring, opacity);
        let _ = write!(
            svg,
            r#"<text x="{:.2}" y="{:.2}" text-anchor="middle" font-size="10" opacity="{opacity}">{}</text>"#,
            node.position.x,
            node.position.y + NODE_RADIUS + LABEL_OFFSET,
            escape(&node.label),
        );
    }
    svg.push_str("</g>");

    Some(VectorPanel::new(view_box, svg))
}

/// Render the enrichment bars, colored by cluster. `None` without bars.
pub fn render_barplot(bars: &[EnrichmentBar], cluster_palette: &Palette) -> Option<VectorPanel> {
    if bars.is_empty() {
        return None;
    }
    let max_score = bars.iter().map(EnrichmentBar::score).fold(0.0, f64::max);
    let scale = if max_score > 0.0 {
        BAR_MAX_LENGTH as f64 / max_score
    } else {
        0.0
    };

    let height = bars.len() as f32 * BAR_ROW + AXIS_SPACE;
    let width = BAR_LABEL_WIDTH + BAR_MAX_LENGTH + 20.0;
    let mut svg = String::new();

    for (row, bar) in bars.iter().enumerate() {
        let y = row as f32 * BAR_ROW;
        let length = (bar.score() * scale) as f32;
        let color = palette::lookup(cluster_palette, &bar.cluster.to_string());
        let _ = write!(
            svg,
            r#"<text x="{:.2}" y="{:.2}" text-anchor="end" font-size="11">{}</text>"#,
            BAR_LABEL_WIDTH - 6.0,
            y + BAR_THICKNESS - 4.0,
            escape(&bar.label()),
        );
        let _ = write!(
            svg,
            r#"<rect x="{BAR_LABEL_WIDTH}" y="{y}" width="{length:.2}" height="{BAR_THICKNESS}" fill="{}"><title>{}</title></rect>"#,
            color.to_hex(),
            escape(&format!("cluster {}: FDR {:.3e}", bar.cluster, bar.fdr)),
        );
    }

    let axis_y = bars.len() as f32 * BAR_ROW + 4.0;
    let _ = write!(
        svg,
        r##"<line x1="{BAR_LABEL_WIDTH}" y1="{axis_y}" x2="{:.2}" y2="{axis_y}" stroke="#333333"/>"##,
        BAR_LABEL_WIDTH + BAR_MAX_LENGTH,
    );
    let _ = write!(
        svg,
        r#"<text x="{:.2}" y="{:.2}" text-anchor="middle" font-size="11">-log10(FDR)</text>"#,
        BAR_LABEL_WIDTH + BAR_MAX_LENGTH / 2.0,
        axis_y + 18.0,
    );

    Some(VectorPanel::new(ViewBox::new(0.0, 0.0, width, height), svg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::GraphLayoutCoordinator;
    use crate::export::{self, ExportLayout};
    use crate::model::{Edge, Node, Pathway};
    use crate::palette::NodeAttribute;
    use crate::ring::{RingKey, RingSpec};
    use crate::surface::{GraphSurface, SceneSurfaceFactory, Size};
    use crate::views::BarplotModel;

    fn scene() -> SceneSnapshot {
        let mut coordinator =
            GraphLayoutCoordinator::new(SceneSurfaceFactory::new(Size::new(400.0, 300.0)));
        coordinator
            .rebuild(
                vec![
                    Node::new("g1", 0).with_name("A&B").with_sources(["AD", "PD"]),
                    Node::new("g2", 0).with_sources(["AD"]),
                    Node::new("g3", 1),
                ],
                &[Edge::new("g1", "g2", true), Edge::new("g2", "g3", false)],
                None,
            )
            .unwrap();
        coordinator.draw_ring(RingSpec::new(RingKey::Source, Palette::new()));
        coordinator.surface().unwrap().snapshot()
    }

    #[test]
    fn test_graph_panel_contains_every_element() {
        let panel = render_graph(&scene()).unwrap();

        assert!(panel.is_renderable());
        assert_eq!(panel.body.matches("<line").count(), 2);
        assert_eq!(panel.body.matches(r#"r="8""#).count(), 3);
        // two arcs for g1, a full ring for g2, none for g3
        assert_eq!(panel.body.matches("<path").count(), 2);
        assert!(panel.body.contains("A&amp;B"));
        assert!(panel.body.contains("stroke-dasharray"));
    }

    #[test]
    fn test_empty_scene_renders_nothing() {
        assert_eq!(render_graph(&SceneSnapshot::default()), None);
        assert_eq!(render_barplot(&[], &Palette::new()), None);
    }

    #[test]
    fn test_arcs_start_at_top() {
        let slice = RingSlice {
            start_deg: 0.0,
            end_deg: 90.0,
            color: palette::NEUTRAL_GRAY,
        };
        let path = arc_path(Point::new(0.0, 0.0), 10.0, &slice);
        assert!(path.starts_with("M 0.00 -10.00 A 10 10 0 0 1 10.00 "));
    }

    #[test]
    fn test_rendered_panels_compose_into_figure() {
        let mut barplot = BarplotModel::default();
        barplot.set_pathways(&[Pathway {
            cluster: 0,
            pathway: "synaptic <signaling>".into(),
            pathway_id: "GO:1".into(),
            source: "GO".into(),
            fdr: 1e-4,
            genes: vec!["g1".into()],
        }]);
        let clusters = crate::palette::generate(
            &[Node::new("g1", 0), Node::new("g3", 1)],
            NodeAttribute::Cluster,
        );

        let graph = render_graph(&scene()).unwrap();
        let bars = render_barplot(barplot.bars(), &clusters).unwrap();
        assert!(bars.body.contains(&clusters["0"].to_hex()));
        assert!(bars.body.contains("&lt;signaling&gt;"));

        let figure = export::compose(Some(&graph), Some(&bars), &ExportLayout::default()).unwrap();
        assert_eq!(
            figure.width,
            graph.view_box.width + 40.0 + bars.view_box.width
        );
        assert!(VectorPanel::parse(&figure.svg).is_ok());
    }
}
