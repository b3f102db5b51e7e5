use cluster_sync::layout::ClusterCircleLayout;
use serde::{Deserialize, Serialize};

/// Common slider metadata so bounds live in one place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl SliderRange {
    pub const fn new(min: f32, max: f32, step: f32) -> Self {
        Self { min, max, step }
    }

    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

// Visual ranges
pub const NODE_RADIUS_RANGE: SliderRange = SliderRange::new(4.0, 24.0, 0.5);
pub const LABEL_FONT_RANGE: SliderRange = SliderRange::new(8.0, 24.0, 1.0);
pub const RING_WIDTH_RANGE: SliderRange = SliderRange::new(1.0, 8.0, 0.5);
pub const INTER_EDGE_OPACITY_RANGE: SliderRange = SliderRange::new(0.05, 1.0, 0.05);

// Layout ranges
pub const NODE_SPACING_RANGE: SliderRange = SliderRange::new(16.0, 120.0, 2.0);
pub const CLUSTER_GAP_RANGE: SliderRange = SliderRange::new(20.0, 240.0, 5.0);
pub const FIT_PADDING_RANGE: SliderRange = SliderRange::new(0.0, 120.0, 2.0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeVisualSettings {
    pub node_radius: f32,
    pub ring_width: f32,
    pub label_font_size: f32,
    pub show_labels: bool,
}

impl Default for NodeVisualSettings {
    fn default() -> Self {
        Self {
            node_radius: 8.0,
            ring_width: 3.0,
            label_font_size: 12.0,
            show_labels: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterLayoutSettings {
    pub node_spacing: f32,
    pub cluster_gap: f32,
    pub fit_padding: f32,
    pub inter_edge_opacity: f32,
}

impl Default for ClusterLayoutSettings {
    fn default() -> Self {
        Self {
            node_spacing: 40.0,
            cluster_gap: 60.0,
            fit_padding: 30.0,
            inter_edge_opacity: 0.25,
        }
    }
}

impl ClusterLayoutSettings {
    pub fn to_layout(&self, visuals: &NodeVisualSettings) -> ClusterCircleLayout {
        ClusterCircleLayout {
            node_spacing: self.node_spacing,
            node_radius: visuals.node_radius + visuals.ring_width,
            cluster_gap: self.cluster_gap,
            ..ClusterCircleLayout::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub visuals: NodeVisualSettings,
    pub layout: ClusterLayoutSettings,
}

impl LayoutSettings {
    /// Pull every value back inside its slider range.
    pub fn clamped(mut self) -> Self {
        let v = &mut self.visuals;
        v.node_radius = NODE_RADIUS_RANGE.clamp(v.node_radius);
        v.ring_width = RING_WIDTH_RANGE.clamp(v.ring_width);
        v.label_font_size = LABEL_FONT_RANGE.clamp(v.label_font_size);
        let l = &mut self.layout;
        l.node_spacing = NODE_SPACING_RANGE.clamp(l.node_spacing);
        l.cluster_gap = CLUSTER_GAP_RANGE.clamp(l.cluster_gap);
        l.fit_padding = FIT_PADDING_RANGE.clamp(l.fit_padding);
        l.inter_edge_opacity = INTER_EDGE_OPACITY_RANGE.clamp(l.inter_edge_opacity);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_lie_inside_slider_ranges() {
        let settings = LayoutSettings::default();
        assert!(NODE_RADIUS_RANGE.contains(settings.visuals.node_radius));
        assert!(RING_WIDTH_RANGE.contains(settings.visuals.ring_width));
        assert!(LABEL_FONT_RANGE.contains(settings.visuals.label_font_size));
        assert!(NODE_SPACING_RANGE.contains(settings.layout.node_spacing));
        assert!(CLUSTER_GAP_RANGE.contains(settings.layout.cluster_gap));
        assert!(FIT_PADDING_RANGE.contains(settings.layout.fit_padding));
        assert!(INTER_EDGE_OPACITY_RANGE.contains(settings.layout.inter_edge_opacity));
        assert_eq!(settings.clone().clamped(), settings);
    }

    #[test]
    fn test_clamped_pulls_values_into_range() {
        let mut settings = LayoutSettings::default();
        settings.visuals.node_radius = 100.0;
        settings.layout.inter_edge_opacity = 0.0;

        let clamped = settings.clamped();
        assert_eq!(clamped.visuals.node_radius, NODE_RADIUS_RANGE.max);
        assert_eq!(clamped.layout.inter_edge_opacity, INTER_EDGE_OPACITY_RANGE.min);
    }

    #[test]
    fn test_layout_reserves_room_for_rings() {
        let settings = LayoutSettings::default();
        let layout = settings.layout.to_layout(&settings.visuals);
        assert_eq!(layout.node_radius, 11.0);
        assert_eq!(layout.node_spacing, 40.0);
        assert_eq!(layout.cluster_gap, 60.0);
    }
}
