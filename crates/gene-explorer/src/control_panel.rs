use cluster_sync::filter::EDGE_SOURCES;
use cluster_sync::{NodeAttribute, Palette, RingKey};
use eframe::egui;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::actions::Action;
use crate::cache::{ClusterSummary, FilterOptions};
use crate::graph_state::{from_color32, to_color32};
use crate::layout_settings::{
    CLUSTER_GAP_RANGE, FIT_PADDING_RANGE, INTER_EDGE_OPACITY_RANGE, LABEL_FONT_RANGE,
    NODE_RADIUS_RANGE, NODE_SPACING_RANGE, RING_WIDTH_RANGE, SliderRange,
};
use crate::store::Store;

const SWATCH_SIZE: f32 = 12.0;

fn ring_label(key: Option<RingKey>) -> &'static str {
    match key {
        None => "None",
        Some(RingKey::Source) => "Analysis",
        Some(RingKey::Effect) => "Effect",
    }
}

/// Actions for one frame of slider interaction. Dragging only moves the
/// displayed value; letting go, or a keyboard change, commits it.
fn confidence_actions(value: f32, changed: bool, dragged: bool, drag_stopped: bool, now: Duration) -> Vec<Action> {
    let mut actions = Vec::new();
    if changed {
        actions.push(Action::DragConfidence { value });
    }
    if drag_stopped || (changed && !dragged) {
        actions.push(Action::ReleaseConfidence { now });
    }
    actions
}

fn range_slider(ui: &mut egui::Ui, label: &str, value: &mut f32, range: SliderRange) -> bool {
    ui.add(
        egui::Slider::new(value, range.min..=range.max)
            .step_by(range.step as f64)
            .text(label),
    )
    .changed()
}

fn checkbox_group(
    ui: &mut egui::Ui,
    values: &[String],
    checked: &[String],
    mut on_toggle: impl FnMut(String, bool),
) {
    if values.is_empty() {
        ui.weak("None available");
    }
    for value in values {
        let mut enabled = checked.contains(value);
        if ui.checkbox(&mut enabled, value.as_str()).changed() {
            on_toggle(value.clone(), enabled);
        }
    }
}

fn palette_editor(ui: &mut egui::Ui, attribute: NodeAttribute, palette: &Palette, actions: &mut Vec<Action>) {
    if palette.is_empty() {
        ui.weak("No values");
        return;
    }
    egui::Grid::new(("palette", attribute.name()))
        .num_columns(2)
        .show(ui, |ui| {
            for (key, color) in palette {
                let mut color32 = to_color32(*color);
                if ui.color_edit_button_srgba(&mut color32).changed() {
                    actions.push(Action::SetPaletteColor {
                        attribute,
                        key: key.clone(),
                        color: from_color32(color32),
                    });
                }
                ui.label(key);
                ui.end_row();
            }
        });
}

fn cluster_legend(ui: &mut egui::Ui, clusters: &[ClusterSummary], actions: &mut Vec<Action>) {
    for summary in clusters {
        ui.horizontal(|ui| {
            let (rect, _) = ui.allocate_exact_size(egui::Vec2::splat(SWATCH_SIZE), egui::Sense::hover());
            ui.painter().rect_filled(rect, 2.0, to_color32(summary.color));
            let label = ui.selectable_label(false, format!("Cluster {} ({})", summary.cluster, summary.size));
            if label.clicked() {
                actions.push(Action::HighlightCluster {
                    cluster: Some(summary.cluster),
                });
            }
        });
    }
}

/// Left-hand panel: filters, decoration, legend and settings.
pub fn show(
    ui: &mut egui::Ui,
    store: &Store,
    options: &FilterOptions,
    clusters: &[ClusterSummary],
    now: Duration,
) -> Vec<Action> {
    let mut actions = Vec::new();
    let draft = store.draft.get();

    ui.heading("Filters");
    ui.separator();

    let mut confidence = store.confidence.display_value();
    let slider = ui.add(
        egui::Slider::new(&mut confidence, 0.0..=1.0)
            .step_by(0.01)
            .text("Confidence"),
    );
    actions.extend(confidence_actions(
        confidence,
        slider.changed(),
        slider.dragged(),
        slider.drag_stopped(),
        now,
    ));

    ui.collapsing("Interaction sources", |ui| {
        let sources: Vec<String> = EDGE_SOURCES.iter().map(|s| s.to_string()).collect();
        checkbox_group(ui, &sources, &draft.edge_sources, |source, enabled| {
            actions.push(Action::SetEdgeSource { source, enabled });
        });
    });
    ui.collapsing("Analyses", |ui| {
        checkbox_group(ui, &options.analyses, &draft.analyses, |name, enabled| {
            actions.push(Action::SetAnalysis { name, enabled });
        });
    });
    ui.collapsing("Effects", |ui| {
        checkbox_group(ui, &options.effects, &draft.effects, |name, enabled| {
            actions.push(Action::SetEffect { name, enabled });
        });
    });

    ui.add_space(8.0);
    ui.heading("Graph");
    ui.separator();

    let counts = store.counts();
    ui.horizontal(|ui| {
        ui.label(format!(
            "{} genes, {} clusters, {} + {} edges",
            counts.nodes, counts.clusters, counts.intra_edges, counts.inter_edges
        ));
        if store.pipeline.is_loading() {
            ui.spinner();
        }
    });

    ui.horizontal(|ui| {
        if ui.button("Re-layout").clicked() {
            actions.push(Action::Relayout);
        }
        if ui.button("Clear selection").clicked() {
            actions.push(Action::View(cluster_sync::ViewEvent::ClearAll));
        }
        if ui.button("Export SVG").clicked() {
            actions.push(Action::ExportSvg);
        }
    });

    let mut ring = store.ring_key;
    egui::ComboBox::from_label("Rings")
        .selected_text(ring_label(ring))
        .show_ui(ui, |ui| {
            for key in [None, Some(RingKey::Source), Some(RingKey::Effect)] {
                ui.selectable_value(&mut ring, key, ring_label(key));
            }
        });
    if ring != store.ring_key {
        actions.push(Action::SetRingKey { key: ring });
    }

    let palettes: BTreeMap<NodeAttribute, Palette> = store.palettes();
    let empty = Palette::new();

    ui.collapsing("Clusters", |ui| {
        egui::ScrollArea::vertical()
            .id_salt("cluster_legend")
            .max_height(160.0)
            .show(ui, |ui| cluster_legend(ui, clusters, &mut actions));
        if ui.small_button("Show all").clicked() {
            actions.push(Action::HighlightCluster { cluster: None });
        }
    });

    ui.collapsing("Colors", |ui| {
        for attribute in NodeAttribute::ALL {
            ui.label(egui::RichText::new(attribute.name()).strong());
            let palette = palettes.get(&attribute).unwrap_or(&empty);
            palette_editor(ui, attribute, palette, &mut actions);
        }
        if ui.button("Reset colors").clicked() {
            actions.push(Action::ResetPalettes);
        }
    });

    ui.collapsing("Settings", |ui| {
        let mut settings = store.settings.clone();
        let mut changed = false;
        changed |= range_slider(ui, "Node radius", &mut settings.visuals.node_radius, NODE_RADIUS_RANGE);
        changed |= range_slider(ui, "Ring width", &mut settings.visuals.ring_width, RING_WIDTH_RANGE);
        changed |= range_slider(ui, "Label size", &mut settings.visuals.label_font_size, LABEL_FONT_RANGE);
        changed |= ui.checkbox(&mut settings.visuals.show_labels, "Show labels").changed();
        ui.separator();
        changed |= range_slider(ui, "Node spacing", &mut settings.layout.node_spacing, NODE_SPACING_RANGE);
        changed |= range_slider(ui, "Cluster gap", &mut settings.layout.cluster_gap, CLUSTER_GAP_RANGE);
        changed |= range_slider(ui, "Fit padding", &mut settings.layout.fit_padding, FIT_PADDING_RANGE);
        changed |= range_slider(
            ui,
            "Inter-cluster edges",
            &mut settings.layout.inter_edge_opacity,
            INTER_EDGE_OPACITY_RANGE,
        );
        if changed {
            actions.push(Action::SetSettings { settings });
        }
    });

    actions
}
