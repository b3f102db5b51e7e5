use cluster_sync::model::{parse_gene_table, parse_node_detail};
use cluster_sync::popover::DetailTicket;
use cluster_sync::{FetchTicket, GeneRecord, GraphPayload, NodeDetail, SyncError};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;

use crate::config::ServiceConfig;

/// A completed request, delivered on the UI thread.
#[derive(Debug)]
pub enum ServiceReply {
    Graph {
        ticket: FetchTicket,
        result: Result<GraphPayload, SyncError>,
    },
    Detail {
        ticket: DetailTicket,
        result: Result<NodeDetail, SyncError>,
    },
    GeneTable(Result<Vec<GeneRecord>, SyncError>),
}

/// Client of the graph data service.
///
/// Requests run on ehttp's own threads (or the browser's fetch); their
/// results come back through a channel drained once per frame.
pub struct DataService {
    config: ServiceConfig,
    tx: Sender<ServiceReply>,
    rx: Receiver<ServiceReply>,
    ctx: Option<egui::Context>,
}

impl DataService {
    pub fn new(config: ServiceConfig) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            config,
            tx,
            rx,
            ctx: None,
        }
    }

    /// Repaint this context whenever a reply arrives.
    pub fn with_context(mut self, ctx: egui::Context) -> Self {
        self.ctx = Some(ctx);
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Replies received since the last call.
    pub fn drain(&self) -> Vec<ServiceReply> {
        self.rx.try_iter().collect()
    }

    pub fn fetch_graph(&self, ticket: FetchTicket) {
        let body = match ticket.filter.to_json() {
            Ok(body) => body,
            Err(err) => {
                self.deliver_now(ServiceReply::Graph {
                    ticket,
                    result: Err(err),
                });
                return;
            }
        };
        let url = self.config.graph_url();
        tracing::info!(ticket = ticket.id, %url, "fetching graph data");

        let mut request = ehttp::Request::post(url, body.into_bytes());
        request.headers.insert("Content-Type", "application/json");
        let reply = self.replier();
        ehttp::fetch(request, move |response| {
            let result = read_body(response).and_then(|bytes| GraphPayload::from_json(&bytes));
            reply(ServiceReply::Graph { ticket, result });
        });
    }

    pub fn fetch_detail(&self, ticket: DetailTicket) {
        let url = self.config.node_detail_url(&ticket.node_id);
        tracing::debug!(node = %ticket.node_id, %url, "fetching node detail");

        let reply = self.replier();
        ehttp::fetch(ehttp::Request::get(url), move |response| {
            let result = read_body(response).and_then(|bytes| parse_node_detail(&bytes));
            reply(ServiceReply::Detail { ticket, result });
        });
    }

    pub fn fetch_gene_table(&self) {
        let url = self.config.gene_table_url();
        tracing::info!(%url, "fetching gene table");

        let reply = self.replier();
        ehttp::fetch(ehttp::Request::get(url), move |response| {
            let result = read_body(response).and_then(|bytes| parse_gene_table(&bytes));
            reply(ServiceReply::GeneTable(result));
        });
    }

    fn replier(&self) -> impl Fn(ServiceReply) + Send + 'static {
        let tx = self.tx.clone();
        let ctx = self.ctx.clone();
        move |reply| {
            // The receiver only goes away with the app.
            if tx.send(reply).is_err() {
                tracing::debug!("reply dropped, app is shutting down");
                return;
            }
            if let Some(ctx) = &ctx {
                ctx.request_repaint();
            }
        }
    }

    fn deliver_now(&self, reply: ServiceReply) {
        (self.replier())(reply);
    }
}

fn read_body(response: ehttp::Result<ehttp::Response>) -> Result<Vec<u8>, SyncError> {
    let response = response.map_err(SyncError::FetchFailure)?;
    check_status(response.ok, response.status, &response.status_text)?;
    Ok(response.bytes)
}

/// Map a non-success HTTP status to a fetch failure.
pub fn check_status(ok: bool, status: u16, status_text: &str) -> Result<(), SyncError> {
    if ok {
        Ok(())
    } else {
        Err(SyncError::FetchFailure(format!("HTTP {status} {status_text}")))
    }
}
