use cluster_sync::NodeAttribute;
use cluster_sync::surface::Size;
use eframe::egui;
use std::time::Duration;

use crate::actions::Action;
use crate::state::State;
use crate::{barplot, control_panel, gene_table, graph_view, popover};

const SIDE_PANEL_WIDTH: f32 = 300.0;
const BAR_PANEL_WIDTH: f32 = 380.0;
const TABLE_HEIGHT: f32 = 220.0;

pub struct ExplorerApp {
    state: State,
    last_size: Option<Size>,
}

impl ExplorerApp {
    pub fn new(state: State) -> Self {
        Self {
            state,
            last_size: None,
        }
    }

    fn render_menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Export SVG").clicked() {
                        ui.close();
                        self.state.dispatch(Action::ExportSvg);
                    }
                    if ui.button("Reload gene table").clicked() {
                        ui.close();
                        self.state.dispatch(Action::ReloadGeneTable);
                    }
                });
                ui.menu_button("View", |ui| {
                    if ui.button("Re-layout").clicked() {
                        ui.close();
                        self.state.dispatch(Action::Relayout);
                    }
                    if ui.button("Clear selection").clicked() {
                        ui.close();
                        self.state
                            .dispatch(Action::View(cluster_sync::ViewEvent::ClearAll));
                    }
                });
            });
        });
    }

    fn render_control_panel(&mut self, ctx: &egui::Context, now: Duration) {
        let options = self
            .state
            .cache
            .filter_options
            .get(&self.state.store)
            .clone();
        let clusters = self.state.cache.clusters.get(&self.state.store).clone();

        egui::SidePanel::left("control_panel")
            .default_width(SIDE_PANEL_WIDTH)
            .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(8.0))
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let actions =
                        control_panel::show(ui, &self.state.store, &options, &clusters, now);
                    for action in actions {
                        self.state.dispatch(action);
                    }
                });
            });
    }

    fn render_barplot(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("barplot_panel")
            .default_width(BAR_PANEL_WIDTH)
            .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(8.0))
            .show(ctx, |ui| {
                ui.heading("Enrichment");
                ui.separator();
                let store = &self.state.store;
                let colors = store.bus.graph().palettes().get(NodeAttribute::Cluster);
                let events = barplot::show(ui, store.bus.barplot(), &colors);
                for event in events {
                    self.state.dispatch(Action::View(event));
                }
            });
    }

    fn render_gene_table(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("gene_table")
            .resizable(true)
            .default_height(TABLE_HEIGHT)
            .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(8.0))
            .show(ctx, |ui| {
                let output = gene_table::show(ui, self.state.store.bus.table());
                if let Some(query) = output.search {
                    self.state.dispatch(Action::SetSearch { query });
                }
                if let Some(column) = output.sort_by {
                    self.state.dispatch(Action::SortBy { column });
                }
                for event in output.events {
                    self.state.dispatch(Action::View(event));
                }
            });
    }

    fn render_graph(&mut self, ctx: &egui::Context, now: Duration) {
        egui::CentralPanel::default()
            .frame(egui::Frame::central_panel(&ctx.style()).inner_margin(8.0))
            .show(ctx, |ui| {
                let padding = self.state.store.settings.layout.fit_padding;
                let loading = self.state.store.pipeline.is_loading();
                let Some(surface) = self.state.store.bus.graph_mut().surface_mut() else {
                    ui.centered_and_justified(|ui| {
                        if loading {
                            ui.spinner();
                        } else {
                            ui.label("No genes match the current filter.");
                        }
                    });
                    return;
                };

                let response = graph_view::show(ui, surface, padding);
                if self.last_size != Some(response.size) {
                    self.last_size = Some(response.size);
                    self.state.dispatch(Action::ContainerResized {
                        size: response.size,
                        now,
                    });
                }
                if response.moved {
                    self.state.dispatch(Action::GraphMoved);
                }
                for event in response.events {
                    self.state.dispatch(Action::View(event));
                }
            });
    }

    fn render_error(&mut self, ctx: &egui::Context) {
        let Some(error) = self.state.store.error_message.clone() else {
            return;
        };
        let retry = self.state.store.retry_available;
        egui::Window::new("Error")
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(&error);
                ui.horizontal(|ui| {
                    if retry && ui.button("Retry").clicked() {
                        self.state.dispatch(Action::RetryFetch);
                    }
                    if ui.button("OK").clicked() {
                        self.state.dispatch(Action::ClearErrorMessage);
                    }
                });
            });
    }

    /// Wake up again when the next debounce timer is due.
    fn schedule_repaint(&self, ctx: &egui::Context, now: Duration) {
        let store = &self.state.store;
        let next = [
            store.confidence.due_in(now),
            store.bus.graph().next_deadline(now),
        ]
        .into_iter()
        .flatten()
        .min();
        if let Some(delay) = next {
            ctx.request_repaint_after(delay);
        }
    }
}

impl eframe::App for ExplorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Duration::from_secs_f64(ctx.input(|i| i.time));
        self.state.poll_service();
        self.state.dispatch(Action::Tick { now });

        self.render_menu_bar(ctx);
        self.render_control_panel(ctx, now);
        self.render_barplot(ctx);
        self.render_gene_table(ctx);
        self.render_graph(ctx, now);

        if popover::show(ctx, self.state.store.bus.popover()) {
            self.state.dispatch(Action::ClosePopover);
        }
        self.render_error(ctx);

        self.state.flush_actions();
        self.state.flush_effects();
        self.schedule_repaint(ctx, now);
    }
}
