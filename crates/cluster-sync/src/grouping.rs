use std::collections::{BTreeMap, HashMap, HashSet};

use crate::model::{Edge, Node, NodeId};

/// Partition of node ids into one non-empty group per cluster.
///
/// Groups are ordered by cluster id and members keep snapshot order, so
/// the same snapshot always produces the same grouping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterGrouping {
    groups: BTreeMap<i64, Vec<NodeId>>,
    cluster_of: HashMap<NodeId, i64>,
}

impl ClusterGrouping {
    pub fn from_nodes(nodes: &[Node]) -> Self {
        let mut grouping = Self::default();
        for node in nodes {
            grouping.insert(node.cluster, &node.id);
        }
        grouping
    }

    /// Accept a caller-supplied grouping, repaired against the snapshot:
    /// unknown ids are dropped, repeated ids keep their first group, and
    /// nodes the grouping forgot join the group of their own cluster.
    pub fn from_explicit(
        explicit: BTreeMap<i64, Vec<NodeId>>,
        nodes: &[Node],
    ) -> Self {
        let known: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        let mut grouping = Self::default();
        for (cluster, members) in explicit {
            for id in members {
                if !known.contains(id.as_str()) {
                    tracing::warn!(node = %id, cluster, "grouping names unknown node");
                    continue;
                }
                if grouping.cluster_of.contains_key(&id) {
                    tracing::warn!(node = %id, "node listed in two groups");
                    continue;
                }
                grouping.insert(cluster, &id);
            }
        }
        for node in nodes {
            if !grouping.cluster_of.contains_key(&node.id) {
                grouping.insert(node.cluster, &node.id);
            }
        }
        grouping
    }

    fn insert(&mut self, cluster: i64, id: &NodeId) {
        if self.cluster_of.contains_key(id) {
            return;
        }
        self.cluster_of.insert(id.clone(), cluster);
        self.groups.entry(cluster).or_default().push(id.clone());
    }

    pub fn groups(&self) -> impl Iterator<Item = (i64, &[NodeId])> {
        self.groups.iter().map(|(c, ids)| (*c, ids.as_slice()))
    }

    pub fn members(&self, cluster: i64) -> &[NodeId] {
        self.groups.get(&cluster).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cluster_of(&self, id: &str) -> Option<i64> {
        self.cluster_of.get(id).copied()
    }

    pub fn cluster_count(&self) -> usize {
        self.groups.len()
    }

    pub fn node_count(&self) -> usize {
        self.cluster_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Edges split by the service's intra/inter classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgePartition {
    pub intra: Vec<Edge>,
    pub inter: Vec<Edge>,
}

impl EdgePartition {
    pub fn split(edges: &[Edge]) -> Self {
        let (intra, inter) =
            edges.iter().cloned().partition(|e| e.is_intra_cluster);
        Self { intra, inter }
    }

    pub fn len(&self) -> usize {
        self.intra.len() + self.inter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
