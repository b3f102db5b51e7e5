use std::f32::consts::{PI, TAU};

use crate::grouping::ClusterGrouping;
use crate::model::NodeId;
use crate::surface::{Point, Rect, Size, Viewport};

/// Computes node positions for a grouping.
///
/// `aspect` is the width-over-height ratio of the hosting container; the
/// arrangement of clusters should roughly follow it.
pub trait ClusterLayout {
    fn layout(&self, grouping: &ClusterGrouping, aspect: f32) -> Vec<(NodeId, Point)>;
}

/// Each cluster on its own circle, clusters packed in a grid of equal
/// cells so that no two cluster discs overlap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterCircleLayout {
    /// Arc length between neighbours on a cluster circle.
    pub node_spacing: f32,
    /// Smallest circle radius for clusters of two or more nodes.
    pub min_radius: f32,
    /// Radius reserved around every node position.
    pub node_radius: f32,
    /// Empty space between neighbouring cluster discs.
    pub cluster_gap: f32,
}

impl Default for ClusterCircleLayout {
    fn default() -> Self {
        Self {
            node_spacing: 40.0,
            min_radius: 30.0,
            node_radius: 12.0,
            cluster_gap: 60.0,
        }
    }
}

impl ClusterCircleLayout {
    /// Radius of the circle the members are placed on.
    pub fn circle_radius(&self, members: usize) -> f32 {
        if members <= 1 {
            0.0
        } else {
            (members as f32 * self.node_spacing / TAU).max(self.min_radius)
        }
    }

    /// Radius of the disc a cluster occupies, node extents included.
    pub fn disc_radius(&self, members: usize) -> f32 {
        self.circle_radius(members) + self.node_radius
    }

    /// Offsets of the members around the circle center, starting at the
    /// top and going clockwise in screen coordinates.
    pub fn circle_offsets(&self, members: usize) -> Vec<Point> {
        let radius = self.circle_radius(members);
        (0..members)
            .map(|i| {
                let angle = -PI / 2.0 + TAU * i as f32 / members as f32;
                Point::new(radius * angle.cos(), radius * angle.sin())
            })
            .collect()
    }
}

/// Number of grid columns whose shape best matches the target aspect.
pub fn grid_columns(cells: usize, aspect: f32) -> usize {
    if cells == 0 {
        return 0;
    }
    let target = aspect.max(f32::EPSILON).ln();
    (1..=cells)
        .min_by(|a, b| {
            let score = |cols: usize| {
                let rows = cells.div_ceil(cols);
                ((cols as f32 / rows as f32).ln() - target).abs()
            };
            score(*a).total_cmp(&score(*b))
        })
        .unwrap_or(1)
}

impl ClusterLayout for ClusterCircleLayout {
    fn layout(&self, grouping: &ClusterGrouping, aspect: f32) -> Vec<(NodeId, Point)> {
        let cell = grouping
            .groups()
            .map(|(_, members)| self.disc_radius(members.len()))
            .fold(0.0_f32, f32::max)
            * 2.0
            + self.cluster_gap;
        let columns = grid_columns(grouping.cluster_count(), aspect);

        let mut positions = Vec::with_capacity(grouping.node_count());
        for (index, (_, members)) in grouping.groups().enumerate() {
            let column = index % columns;
            let row = index / columns;
            let center = Point::new(
                (column as f32 + 0.5) * cell,
                (row as f32 + 0.5) * cell,
            );
            for (id, offset) in members.iter().zip(self.circle_offsets(members.len())) {
                positions.push((
                    id.clone(),
                    Point::new(center.x + offset.x, center.y + offset.y),
                ));
            }
        }
        positions
    }
}

/// Zoom and pan that fit `bounds` inside `container` with `padding`
/// pixels on every side. Never zooms in past 1:1 for tiny graphs.
pub fn fit_viewport(bounds: Rect, container: Size, padding: f32) -> Viewport {
    let available = Size::new(
        (container.width - 2.0 * padding).max(1.0),
        (container.height - 2.0 * padding).max(1.0),
    );
    let width = bounds.width().max(1.0);
    let height = bounds.height().max(1.0);
    let zoom = (available.width / width).min(available.height / height).min(1.0);

    let center = bounds.center();
    Viewport {
        zoom,
        pan: Point::new(
            container.width / 2.0 - center.x * zoom,
            container.height / 2.0 - center.y * zoom,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;
    use std::collections::HashMap;

    fn grouping(sizes: &[usize]) -> ClusterGrouping {
        let nodes: Vec<Node> = sizes
            .iter()
            .enumerate()
            .flat_map(|(cluster, n)| {
                (0..*n).map(move |i| Node::new(format!("c{cluster}n{i}"), cluster as i64))
            })
            .collect();
        ClusterGrouping::from_nodes(&nodes)
    }

    fn centers(
        layout: &ClusterCircleLayout,
        grouping: &ClusterGrouping,
        positions: &[(NodeId, Point)],
    ) -> Vec<(Point, f32)> {
        let lookup: HashMap<_, _> = positions.iter().cloned().collect();
        grouping
            .groups()
            .map(|(_, members)| {
                let points: Vec<Point> = members.iter().map(|id| lookup[id]).collect();
                let n = points.len() as f32;
                let cx = points.iter().map(|p| p.x).sum::<f32>() / n;
                let cy = points.iter().map(|p| p.y).sum::<f32>() / n;
                (Point::new(cx, cy), layout.disc_radius(members.len()))
            })
            .collect()
    }

    #[test]
    fn test_every_node_gets_a_position() {
        let grouping = grouping(&[5, 1, 3]);
        let positions = ClusterCircleLayout::default().layout(&grouping, 1.5);
        assert_eq!(positions.len(), 9);
    }

    #[test]
    fn test_cluster_discs_do_not_overlap() {
        let layout = ClusterCircleLayout::default();
        let grouping = grouping(&[12, 1, 4, 30, 2, 7]);

        for aspect in [0.3, 1.0, 2.5] {
            let positions = layout.layout(&grouping, aspect);
            let discs = centers(&layout, &grouping, &positions);
            for (i, (a, ra)) in discs.iter().enumerate() {
                for (b, rb) in &discs[i + 1..] {
                    let distance = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
                    assert!(distance >= ra + rb, "overlap at aspect {aspect}");
                }
            }
        }
    }

    #[test]
    fn test_singleton_sits_at_cell_center() {
        let layout = ClusterCircleLayout::default();
        let positions = layout.layout(&grouping(&[1]), 1.0);
        let cell = layout.disc_radius(1) * 2.0 + layout.cluster_gap;
        assert_eq!(positions[0].1, Point::new(cell / 2.0, cell / 2.0));
    }

    #[test]
    fn test_first_member_starts_at_top() {
        let offsets = ClusterCircleLayout::default().circle_offsets(4);
        assert!(offsets[0].x.abs() < 1e-4);
        assert!(offsets[0].y < 0.0);
    }

    #[test]
    fn test_grid_follows_aspect_ratio() {
        assert_eq!(grid_columns(0, 1.0), 0);
        assert_eq!(grid_columns(4, 1.0), 2);
        assert_eq!(grid_columns(4, 4.0), 4);
        assert_eq!(grid_columns(4, 0.25), 1);
    }

    #[test]
    fn test_fit_centers_bounds_in_container() {
        let bounds = Rect::new(Point::new(0.0, 0.0), Point::new(400.0, 200.0));
        let viewport = fit_viewport(bounds, Size::new(220.0, 220.0), 10.0);

        assert!((viewport.zoom - 0.5).abs() < 1e-6);
        let center = viewport.to_screen(bounds.center());
        assert!((center.x - 110.0).abs() < 1e-4);
        assert!((center.y - 110.0).abs() < 1e-4);
    }
}
