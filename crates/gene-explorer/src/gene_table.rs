use cluster_sync::views::{GeneTableModel, SortOrder};
use cluster_sync::{GeneRecord, ViewEvent};
use eframe::egui::{self, Color32, RichText};
use egui_extras::{Column, TableBuilder};

const ROW_HEIGHT: f32 = 20.0;
const HEADER_HEIGHT: f32 = 22.0;
const SELECTED_FILL: Color32 = Color32::from_rgb(200, 60, 70);

/// What the user did to the table this frame.
#[derive(Debug, Default)]
pub struct TableOutput {
    pub events: Vec<ViewEvent>,
    pub sort_by: Option<String>,
    pub search: Option<String>,
}

fn header_text(column: &str, sort: Option<(&str, SortOrder)>) -> String {
    match sort {
        Some((current, SortOrder::Ascending)) if current == column => format!("{column} ⏶"),
        Some((current, SortOrder::Descending)) if current == column => format!("{column} ⏷"),
        _ => column.to_string(),
    }
}

/// Draw the gene index: a search box, sortable headers and one row per
/// visible gene. Clicking a row toggles it in the selection.
pub fn show(ui: &mut egui::Ui, model: &GeneTableModel) -> TableOutput {
    let mut out = TableOutput::default();

    ui.horizontal(|ui| {
        ui.label("Search:");
        let mut query = model.search().to_string();
        if ui.text_edit_singleline(&mut query).changed() {
            out.search = Some(query);
        }
        ui.label(format!("{} / {} genes", model.visible_rows().len(), model.rows().len()));
    });

    if model.rows().is_empty() {
        ui.label("Gene table not loaded.");
        return out;
    }

    let columns = model.columns();
    let rows: Vec<&GeneRecord> = model.visible_rows();
    let sort = model.sort();

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .sense(egui::Sense::click())
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .columns(Column::auto().at_least(60.0).clip(true), columns.len())
        .min_scrolled_height(0.0)
        .max_scroll_height(ui.available_height())
        .header(HEADER_HEIGHT, |mut header| {
            for column in &columns {
                header.col(|ui| {
                    let text = RichText::new(header_text(column, sort)).strong();
                    if ui.add(egui::Label::new(text).sense(egui::Sense::click())).clicked() {
                        out.sort_by = Some(column.clone());
                    }
                });
            }
        })
        .body(|body| {
            body.rows(ROW_HEIGHT, rows.len(), |mut row| {
                let record = rows[row.index()];
                let selected = model.is_selected(&record.id);
                row.set_selected(selected);
                for column in &columns {
                    row.col(|ui| {
                        let text = record.column_text(column);
                        if selected && column == "id" {
                            ui.label(RichText::new(text).color(SELECTED_FILL).strong());
                        } else {
                            ui.label(text);
                        }
                    });
                }
                let response = row.response();
                if response.clicked() {
                    out.events.push(ViewEvent::RowClicked(record.id.clone()));
                } else if response.hovered() && response.ctx.input(|i| i.pointer.delta() != egui::Vec2::ZERO) {
                    out.events.push(ViewEvent::RowHovered(record.id.clone()));
                }
            });
        });

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_marks_sorted_column() {
        assert_eq!(header_text("name", None), "name");
        assert_eq!(header_text("name", Some(("name", SortOrder::Ascending))), "name ⏶");
        assert_eq!(header_text("name", Some(("name", SortOrder::Descending))), "name ⏷");
        assert_eq!(header_text("id", Some(("name", SortOrder::Ascending))), "id");
    }
}
