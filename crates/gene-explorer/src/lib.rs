pub mod actions;
pub mod app;
pub mod barplot;
pub mod cache;
pub mod config;
pub mod control_panel;
pub mod effects;
pub mod gene_table;
pub mod graph_state;
pub mod graph_view;
pub mod layout_cluster;
pub mod layout_settings;
pub mod native;
pub mod node_shapes;
pub mod popover;
pub mod service;
pub mod state;
pub mod store;
pub mod versioned;
pub mod web;

use actions::Action;
use app::ExplorerApp;
use config::ExplorerConfig;
use service::DataService;
use state::State;
use store::Store;

/// Build the explorer and start loading the first graph.
pub fn create_app(cc: &eframe::CreationContext<'_>, config: ExplorerConfig) -> ExplorerApp {
    tracing::info!(service = %config.service.base_url, "starting gene explorer");
    let service = DataService::new(config.service.clone()).with_context(cc.egui_ctx.clone());
    let mut state = State::new(Store::new(&config), service);
    state.dispatch(Action::LoadInitial);
    ExplorerApp::new(state)
}
