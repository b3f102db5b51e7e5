use cluster_sync::palette::{self, Palette};
use cluster_sync::views::{BarplotModel, EnrichmentBar};
use cluster_sync::ViewEvent;
use eframe::egui;
use egui_plot::{Bar, BarChart, Plot};

use crate::graph_state::to_color32;

const BAR_WIDTH: f64 = 0.7;
const ROW_HEIGHT: f32 = 22.0;
const MIN_PLOT_HEIGHT: f32 = 160.0;

// Color scale configuration constants
const COLOR_SCALE_MESH_POINTS: usize = 10;
const COLOR_SCALE_HEIGHT: f32 = 12.0;
const COLOR_SCALE_LABEL_HEIGHT: f32 = 15.0;

const HOVER_STROKE: egui::Stroke = egui::Stroke {
    width: 2.0,
    color: egui::Color32::from_rgb(40, 40, 40),
};
const HIGHLIGHT_STROKE: egui::Stroke = egui::Stroke {
    width: 2.5,
    color: egui::Color32::from_rgb(200, 60, 70),
};

/// Significance color for a score in `[0, max_score]`.
pub fn score_color(score: f64, max_score: f64) -> egui::Color32 {
    let t = if max_score > 0.0 {
        (score / max_score).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let c = colorous::VIRIDIS.eval_continuous(t);
    egui::Color32::from_rgb(c.r, c.g, c.b)
}

/// Plot row of bar `index`; the first bar sits at the top.
fn row_of(index: usize, count: usize) -> f64 {
    (count - 1 - index) as f64
}

/// Index of the bar under a plot coordinate.
pub fn bar_at(x: f64, y: f64, scores: &[f64]) -> Option<usize> {
    let count = scores.len();
    let row = y.round();
    if count == 0 || row < 0.0 || (y - row).abs() > BAR_WIDTH / 2.0 {
        return None;
    }
    let row = row as usize;
    if row >= count {
        return None;
    }
    let index = count - 1 - row;
    (x >= 0.0 && x <= scores[index]).then_some(index)
}

fn bar_stroke(model: &BarplotModel, index: usize) -> egui::Stroke {
    if model.is_bar_highlighted(index) {
        HIGHLIGHT_STROKE
    } else if model.hovered_bar() == Some(index) {
        HOVER_STROKE
    } else {
        egui::Stroke::NONE
    }
}

fn build_bars(model: &BarplotModel, cluster_palette: &Palette) -> Vec<Bar> {
    let count = model.bars().len();
    model
        .bars()
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let color = palette::lookup(cluster_palette, &bar.cluster.to_string());
            Bar::new(row_of(i, count), bar.score())
                .width(BAR_WIDTH)
                .name(tooltip(bar))
                .fill(to_color32(color))
                .stroke(bar_stroke(model, i))
        })
        .collect()
}

fn tooltip(bar: &EnrichmentBar) -> String {
    format!(
        "{}\ncluster {} | FDR {:.2e} | {} genes",
        bar.label(),
        bar.cluster,
        bar.fdr,
        bar.genes.len()
    )
}

/// Draw the enrichment bar chart. Hover changes are reported as view
/// events; the model itself is only changed by the selection bus.
pub fn show(ui: &mut egui::Ui, model: &BarplotModel, cluster_palette: &Palette) -> Vec<ViewEvent> {
    let mut events = Vec::new();
    if !model.is_rendered() {
        ui.label("No enrichment results for the current filter.");
        return events;
    }

    let count = model.bars().len();
    let labels: Vec<String> = model.bars().iter().map(EnrichmentBar::label).collect();
    let scores: Vec<f64> = model.bars().iter().map(EnrichmentBar::score).collect();
    let chart = BarChart::new("-log10(FDR)", build_bars(model, cluster_palette)).horizontal();

    let height = (count as f32 * ROW_HEIGHT).max(MIN_PLOT_HEIGHT);
    let hovered = Plot::new("enrichment_plot")
        .height(height)
        .allow_zoom(false)
        .allow_drag(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .show_grid([true, false])
        .y_axis_formatter(move |mark, _range| {
            let row = mark.value.round();
            if (mark.value - row).abs() > 1e-6 || row < 0.0 || row as usize >= count {
                return String::new();
            }
            labels[count - 1 - row as usize].clone()
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(chart);
            plot_ui
                .pointer_coordinate()
                .and_then(|p| bar_at(p.x, p.y, &scores))
        })
        .inner;

    if hovered != model.hovered_bar() {
        events.push(match hovered {
            Some(index) => ViewEvent::BarHovered(index),
            None => ViewEvent::BarUnhovered,
        });
    }

    ui.add_space(4.0);
    render_color_scale(ui, model.max_score(), hovered.map(|i| scores[i]));
    events
}

/// Horizontal gradient of the significance scale, with a marker at the
/// hovered bar's score.
fn render_color_scale(ui: &mut egui::Ui, max_score: f64, marker: Option<f64>) {
    if max_score <= 0.0 {
        return;
    }
    let scale_width = ui.available_width().min(320.0);

    ui.vertical(|ui| {
        ui.spacing_mut().item_spacing = egui::Vec2::splat(0.0);
        let (rect, _response) = ui.allocate_exact_size(
            egui::Vec2::new(scale_width, COLOR_SCALE_HEIGHT),
            egui::Sense::hover(),
        );

        let mut mesh = egui::Mesh::default();
        for i in 0..COLOR_SCALE_MESH_POINTS {
            let t = i as f32 / (COLOR_SCALE_MESH_POINTS - 1) as f32;
            let x = rect.min.x + t * scale_width;
            let color = score_color(t as f64 * max_score, max_score);
            mesh.colored_vertex(egui::pos2(x, rect.min.y), color);
            mesh.colored_vertex(egui::pos2(x, rect.max.y), color);
        }
        for i in 0..(COLOR_SCALE_MESH_POINTS - 1) {
            let base = (i * 2) as u32;
            mesh.add_triangle(base, base + 1, base + 2);
            mesh.add_triangle(base + 1, base + 3, base + 2);
        }
        ui.painter().add(egui::Shape::mesh(mesh));

        if let Some(score) = marker {
            let x = rect.min.x + (score / max_score).clamp(0.0, 1.0) as f32 * scale_width;
            ui.painter().line_segment(
                [egui::pos2(x, rect.min.y - 2.0), egui::pos2(x, rect.max.y + 2.0)],
                egui::Stroke::new(2.0, egui::Color32::BLACK),
            );
        }

        ui.allocate_space(egui::Vec2::new(scale_width, COLOR_SCALE_LABEL_HEIGHT));
        for pos in [0.0_f32, 0.5, 1.0] {
            ui.painter().text(
                egui::pos2(rect.min.x + pos * scale_width, rect.max.y + 2.0),
                egui::Align2::CENTER_TOP,
                format!("{:.1}", pos as f64 * max_score),
                egui::FontId::proportional(9.0),
                egui::Color32::DARK_GRAY,
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_sync::{BarplotCommands, Pathway};
    use rstest::rstest;

    fn model() -> BarplotModel {
        let pathway = |cluster: i64, id: &str, fdr: f64, genes: &[&str]| Pathway {
            cluster,
            pathway: format!("pathway {id}"),
            pathway_id: id.to_string(),
            source: String::from("KEGG"),
            fdr,
            genes: genes.iter().map(|g| g.to_string()).collect(),
        };
        let mut model = BarplotModel::default();
        model.set_pathways(&[
            pathway(1, "p1", 1e-4, &["g1", "g2"]),
            pathway(2, "p2", 1e-2, &["g3"]),
        ]);
        model
    }

    #[rstest]
    #[case(2.0, 1.0, Some(0))]
    #[case(1.5, 0.1, Some(1))]
    #[case(3.0, 0.0, None)]
    #[case(1.0, 0.5, None)]
    #[case(-0.5, 1.0, None)]
    #[case(1.0, 2.0, None)]
    fn test_bar_at(#[case] x: f64, #[case] y: f64, #[case] expected: Option<usize>) {
        assert_eq!(bar_at(x, y, &[4.0, 2.0]), expected);
    }

    #[test]
    fn test_bar_at_without_bars() {
        assert_eq!(bar_at(0.0, 0.0, &[]), None);
    }

    #[test]
    fn test_score_color_spans_viridis() {
        let low = colorous::VIRIDIS.eval_continuous(0.0);
        let high = colorous::VIRIDIS.eval_continuous(1.0);
        assert_eq!(score_color(0.0, 4.0), egui::Color32::from_rgb(low.r, low.g, low.b));
        assert_eq!(score_color(9.0, 4.0), egui::Color32::from_rgb(high.r, high.g, high.b));
        assert_eq!(score_color(1.0, 0.0), score_color(0.0, 4.0));
    }

    #[test]
    fn test_highlighted_bars_take_precedence_over_hover() {
        let mut model = model();
        model.set_hovered_bar(Some(0));
        assert_eq!(bar_stroke(&model, 0), HOVER_STROKE);
        assert_eq!(bar_stroke(&model, 1), egui::Stroke::NONE);

        model.highlight_gene(Some("g1"));
        assert_eq!(bar_stroke(&model, 0), HIGHLIGHT_STROKE);
    }

    #[test]
    fn test_first_bar_is_drawn_on_top() {
        assert_eq!(row_of(0, 3), 2.0);
        assert_eq!(row_of(2, 3), 0.0);
        assert_eq!(build_bars(&model(), &Palette::new()).len(), 2);
    }
}
