use std::fmt;

/// The two panels that make up an exported figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Graph,
    Barplot,
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Panel::Graph => write!(f, "graph"),
            Panel::Barplot => write!(f, "bar chart"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("graph has no nodes")]
    EmptyGraph,
    #[error("fetch failed: {0}")]
    FetchFailure(String),
    #[error("{0} panel is not rendered yet")]
    ExportNotReady(Panel),
    #[error("unsupported ring key: {0:?}")]
    UnsupportedRingKey(String),
    #[error("malformed svg: {0}")]
    MalformedSvg(String),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
