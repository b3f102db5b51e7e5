use cluster_sync::NodeDetail;
use cluster_sync::popover::{DetailState, PopoverController, place_panel};
use cluster_sync::surface::{Point, Rect, Size};
use eframe::egui;

const PANEL_SIZE: Size = Size::new(280.0, 140.0);
const PANEL_GAP: f32 = 8.0;

/// Shorten long descriptions; the full text is one click away.
fn summary(detail: &NodeDetail, max_chars: usize) -> String {
    let text = detail.description.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

/// Where the panel goes inside `screen`, in screen coordinates.
fn panel_origin(anchor: Rect, screen: egui::Rect) -> egui::Pos2 {
    let local = Rect::new(
        Point::new(anchor.min.x - screen.min.x, anchor.min.y - screen.min.y),
        Point::new(anchor.max.x - screen.min.x, anchor.max.y - screen.min.y),
    );
    let viewport = Size::new(screen.width(), screen.height());
    let placement = place_panel(local, PANEL_SIZE, viewport, PANEL_GAP);
    egui::pos2(
        screen.min.x + placement.origin.x,
        screen.min.y + placement.origin.y,
    )
}

/// Draw the node popover, if one is open. Returns true when the user
/// closed it.
pub fn show(ctx: &egui::Context, popover: &PopoverController) -> bool {
    let Some(open) = popover.current() else {
        return false;
    };
    let screen = ctx.input(|i| i.content_rect());
    let mut close = false;

    egui::Area::new(egui::Id::new("node_popover"))
        .order(egui::Order::Foreground)
        .fixed_pos(panel_origin(open.anchor, screen))
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.set_width(PANEL_SIZE.width);
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(&open.node_id).strong());
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("✕").clicked() {
                            close = true;
                        }
                    });
                });
                ui.separator();
                match &open.detail {
                    DetailState::Loading => {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label("Loading details…");
                        });
                    }
                    DetailState::Ready(detail) => {
                        if let Some(name) = &detail.name {
                            ui.label(name);
                        }
                        if let Some(length) = detail.length {
                            ui.label(format!("Length: {length} aa"));
                        }
                        ui.label(summary(detail, 240));
                        if detail.has_link() {
                            ui.hyperlink_to("More information", &detail.link);
                        }
                    }
                }
            });
        });

    close
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_truncates_on_char_boundary() {
        let detail = NodeDetail {
            description: String::from("äöü äöü äöü"),
            ..NodeDetail::placeholder()
        };
        assert_eq!(summary(&detail, 5), "äöü ä…");
        assert_eq!(summary(&detail, 50), "äöü äöü äöü");
    }

    #[test]
    fn test_panel_origin_is_offset_by_screen() {
        let screen = egui::Rect::from_min_size(egui::pos2(100.0, 50.0), egui::vec2(800.0, 600.0));
        let anchor = Rect::around(Point::new(500.0, 150.0), 10.0);
        let origin = panel_origin(anchor, screen);
        assert_eq!(origin.x, 500.0 - PANEL_SIZE.width / 2.0);
        assert_eq!(origin.y, 160.0 + PANEL_GAP);
    }
}
