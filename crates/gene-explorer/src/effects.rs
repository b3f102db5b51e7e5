use cluster_sync::FetchTicket;
use cluster_sync::popover::DetailTicket;
use std::path::PathBuf;

use crate::service::DataService;
use crate::store::Store;

/// Deferred effects that must run outside the main reducer (network and file IO)
#[derive(Debug, Clone)]
pub enum Effect {
    /// Request graph data for a committed filter
    FetchGraph(FetchTicket),
    /// Request the detail shown in the node popover
    FetchDetail(DetailTicket),
    /// Request the gene index behind the table
    FetchGeneTable,
    /// Ask for a destination and write the exported figure
    SaveSvg { file_name: String, svg: String },
}

#[derive(Debug, thiserror::Error)]
#[error("could not write {path}: {source}")]
pub struct SaveError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
}

#[cfg(not(target_arch = "wasm32"))]
fn save_svg(file_name: &str, svg: &str) -> Result<Option<PathBuf>, SaveError> {
    let Some(path) = rfd::FileDialog::new()
        .set_file_name(file_name)
        .add_filter("SVG", &["svg"])
        .save_file()
    else {
        return Ok(None);
    };
    std::fs::write(&path, svg).map_err(|source| SaveError {
        path: path.clone(),
        source,
    })?;
    Ok(Some(path))
}

#[cfg(target_arch = "wasm32")]
fn save_svg(file_name: &str, svg: &str) -> Result<Option<PathBuf>, SaveError> {
    use rfd::AsyncFileDialog;
    use wasm_bindgen_futures::spawn_local;

    let task = AsyncFileDialog::new()
        .set_file_name(file_name)
        .add_filter("SVG", &["svg"])
        .save_file();
    let bytes = svg.as_bytes().to_vec();

    spawn_local(async move {
        if let Some(handle) = task.await
            && let Err(err) = handle.write(&bytes).await
        {
            tracing::error!(error = %err, "svg download failed");
        }
    });
    Ok(None)
}

/// Execute a single effect against the store
pub fn run(store: &mut Store, service: &DataService, effect: Effect) {
    match effect {
        Effect::FetchGraph(ticket) => service.fetch_graph(ticket),
        Effect::FetchDetail(ticket) => service.fetch_detail(ticket),
        Effect::FetchGeneTable => service.fetch_gene_table(),
        Effect::SaveSvg { file_name, svg } => match save_svg(&file_name, &svg) {
            Ok(Some(path)) => tracing::info!(path = %path.display(), "figure exported"),
            Ok(None) => {}
            Err(e) => {
                tracing::error!(error = %e, "export failed");
                store.error_message = Some(e.to_string());
            }
        },
    }
}
