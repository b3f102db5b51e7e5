// Snapshot types shared by every view, plus the wire format of the
// graph data service.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::error::SyncError;

pub type NodeId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub cluster: i64,
    pub source_tags: BTreeSet<String>,
    pub effect_tags: BTreeSet<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, cluster: i64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            cluster,
            source_tags: BTreeSet::new(),
            effect_tags: BTreeSet::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_sources<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_effects<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.effect_tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    /// Classified by the data service; never re-derived here.
    pub is_intra_cluster: bool,
    pub confidence: f32,
    pub edge_source_tag: String,
}

impl Edge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        is_intra_cluster: bool,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            is_intra_cluster,
            confidence: 0.0,
            edge_source_tag: String::new(),
        }
    }
}

/// One row of the enrichment result.
#[derive(Debug, Clone, PartialEq)]
pub struct Pathway {
    pub cluster: i64,
    pub pathway: String,
    pub pathway_id: String,
    pub source: String,
    pub fdr: f64,
    pub genes: Vec<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct GraphPayload {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub enrichment: Vec<Pathway>,
}

/// On-demand detail shown in the node popover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDetail {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub length: Option<u64>,
}

impl NodeDetail {
    /// Substituted whenever the detail service cannot be reached.
    pub fn placeholder() -> Self {
        Self {
            description: String::from("N/A"),
            link: String::from("#"),
            name: None,
            length: None,
        }
    }

    pub fn has_link(&self) -> bool {
        !self.link.is_empty() && self.link != "#"
    }
}

/// A gene table row. Only `id` takes part in selection; every other
/// column is carried through for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneRecord {
    pub id: NodeId,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl GeneRecord {
    /// Text of a named column, `id` and `name` included.
    pub fn column_text(&self, column: &str) -> String {
        match column {
            "id" => self.id.clone(),
            "name" => self.name.clone(),
            other => match self.extra.get(other) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Null) | None => String::new(),
                Some(serde_json::Value::Array(items)) => items
                    .iter()
                    .map(|v| match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
                Some(value) => value.to_string(),
            },
        }
    }

    pub fn column_number(&self, column: &str) -> Option<f64> {
        self.extra.get(column).and_then(|v| v.as_f64())
    }
}

// ------------------------------------------------------------------
// Wire format
// ------------------------------------------------------------------

/// The service wraps nodes and edges in a `{"data": {...}}` envelope;
/// bare objects are accepted as well.
#[derive(Deserialize)]
#[serde(untagged)]
enum Wrapped<T> {
    Enveloped { data: T },
    Bare(T),
}

impl<T> Wrapped<T> {
    fn into_inner(self) -> T {
        match self {
            Wrapped::Enveloped { data } => data,
            Wrapped::Bare(inner) => inner,
        }
    }
}

#[derive(Deserialize)]
struct WireNode {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    cluster: Option<i64>,
    #[serde(default, alias = "sourceTags")]
    source: Vec<String>,
    #[serde(default, alias = "effectTags")]
    effect: Vec<String>,
}

#[derive(Deserialize)]
struct WireEdge {
    source: String,
    target: String,
    #[serde(default, alias = "isIntraCluster")]
    intra: bool,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default, rename = "edgeSource", alias = "edgeSourceTag")]
    edge_source: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePathway {
    cluster: i64,
    #[serde(default)]
    pathway: String,
    #[serde(default)]
    pathway_id: String,
    #[serde(default)]
    source: Option<String>,
    fdr: f64,
    #[serde(default)]
    genes: Vec<String>,
}

#[derive(Deserialize)]
struct WirePayload {
    #[serde(default)]
    nodes: Vec<Wrapped<WireNode>>,
    #[serde(default)]
    edges: Vec<Wrapped<WireEdge>>,
    #[serde(default)]
    enrichment: Vec<WirePathway>,
}

impl GraphPayload {
    /// Parse a graph-data response body.
    ///
    /// Nodes without a cluster are dropped with a warning, as are edges
    /// whose endpoints are not part of the snapshot.
    pub fn from_json(bytes: &[u8]) -> Result<Self, SyncError> {
        let wire: WirePayload = serde_json::from_slice(bytes)?;
        Ok(Self::from_wire(wire))
    }

    fn from_wire(wire: WirePayload) -> Self {
        let mut seen = HashSet::new();
        let mut nodes = Vec::with_capacity(wire.nodes.len());
        for node in wire.nodes.into_iter().map(Wrapped::into_inner) {
            let Some(cluster) = node.cluster else {
                tracing::warn!(
                    node = %node.id,
                    "node has no cluster, excluded from layout"
                );
                continue;
            };
            if !seen.insert(node.id.clone()) {
                tracing::warn!(node = %node.id, "duplicate node id dropped");
                continue;
            }
            nodes.push(Node {
                name: node.name.unwrap_or_else(|| node.id.clone()),
                id: node.id,
                cluster,
                source_tags: node.source.into_iter().collect(),
                effect_tags: node.effect.into_iter().collect(),
            });
        }

        let edges = wire
            .edges
            .into_iter()
            .map(Wrapped::into_inner)
            .filter(|e| {
                let known =
                    seen.contains(&e.source) && seen.contains(&e.target);
                if !known {
                    tracing::debug!(
                        source = %e.source,
                        target = %e.target,
                        "edge references unknown node, dropped"
                    );
                }
                known
            })
            .map(|e| Edge {
                source: e.source,
                target: e.target,
                is_intra_cluster: e.intra,
                confidence: e.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
                edge_source_tag: e.edge_source.unwrap_or_default(),
            })
            .collect();

        let enrichment = wire
            .enrichment
            .into_iter()
            .map(|p| Pathway {
                cluster: p.cluster,
                pathway: p.pathway,
                pathway_id: p.pathway_id,
                source: p
                    .source
                    .unwrap_or_else(|| String::from("Unknown")),
                fdr: p.fdr,
                genes: p.genes,
            })
            .collect();

        Self {
            nodes,
            edges,
            enrichment,
        }
    }
}

pub fn parse_node_detail(bytes: &[u8]) -> Result<NodeDetail, SyncError> {
    Ok(serde_json::from_slice(bytes)?)
}

pub fn parse_gene_table(bytes: &[u8]) -> Result<Vec<GeneRecord>, SyncError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "nodes": [
            {"data": {"id": "7227.FBpp1", "name": "Appl", "cluster": 0,
                      "source": ["AD", "PD", "AD"], "effect": ["enhancer"]}},
            {"data": {"id": "7227.FBpp2", "name": "Tau", "cluster": 0,
                      "source": ["AD"], "effect": []}},
            {"data": {"id": "7227.FBpp3", "name": "orphan"}},
            {"id": "7227.FBpp4", "cluster": 1}
        ],
        "edges": [
            {"data": {"source": "7227.FBpp1", "target": "7227.FBpp2", "intra": true}},
            {"data": {"source": "7227.FBpp1", "target": "7227.FBpp4", "intra": false,
                      "confidence": 0.8, "edgeSource": "textmining"}},
            {"data": {"source": "7227.FBpp1", "target": "7227.FBpp3", "intra": false}}
        ],
        "enrichment": [
            {"cluster": 0, "pathwayId": "GO:1", "pathway": "synapse",
             "source": null, "fdr": 0.001, "genes": ["7227.FBpp1"]}
        ]
    }"#;

    #[test]
    fn test_payload_unwraps_envelopes_and_drops_malformed_nodes() {
        let payload = GraphPayload::from_json(PAYLOAD.as_bytes()).unwrap();

        let ids: Vec<_> = payload.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["7227.FBpp1", "7227.FBpp2", "7227.FBpp4"]);

        let appl = &payload.nodes[0];
        assert_eq!(appl.name, "Appl");
        assert_eq!(appl.source_tags.len(), 2);

        // The bare node falls back to its id for the label
        assert_eq!(payload.nodes[2].name, "7227.FBpp4");
    }

    #[test]
    fn test_payload_drops_edges_to_excluded_nodes() {
        let payload = GraphPayload::from_json(PAYLOAD.as_bytes()).unwrap();

        assert_eq!(payload.edges.len(), 2);
        assert!(payload.edges[0].is_intra_cluster);
        assert!(!payload.edges[1].is_intra_cluster);
        assert!((payload.edges[1].confidence - 0.8).abs() < 1e-6);
        assert_eq!(payload.edges[1].edge_source_tag, "textmining");
        assert_eq!(payload.enrichment[0].source, "Unknown");
        assert_eq!(payload.enrichment[0].pathway_id, "GO:1");
    }

    #[test]
    fn test_gene_record_keeps_extra_columns() {
        let rows = parse_gene_table(
            br#"[{"id": "g1", "name": "Appl", "score": 2.5,
                  "models": ["AB42", "TauWT"], "link": "https://x"}]"#,
        )
        .unwrap();

        assert_eq!(rows[0].column_text("name"), "Appl");
        assert_eq!(rows[0].column_text("models"), "AB42, TauWT");
        assert_eq!(rows[0].column_number("score"), Some(2.5));
        assert_eq!(rows[0].column_text("missing"), "");
    }

    #[test]
    fn test_node_detail_tolerates_missing_fields() {
        let detail = parse_node_detail(br#"{"description": "kinase"}"#).unwrap();
        assert_eq!(detail.description, "kinase");
        assert!(!detail.has_link());
        assert!(!NodeDetail::placeholder().has_link());
    }
}
