// Headless state of the bar chart and the gene table. The app renders
// these; the selection bus drives them.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::commands::{BarplotCommands, TableCommands};
use crate::model::{GeneRecord, NodeId, Pathway};

/// Rows kept per (cluster, source) pair.
pub const DEFAULT_TOP_K: usize = 2;

/// Lower bound applied to FDR values before taking the logarithm.
const MIN_FDR: f64 = 1e-300;

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentBar {
    pub cluster: i64,
    pub pathway: String,
    pub pathway_id: String,
    pub source: String,
    pub fdr: f64,
    pub genes: Vec<NodeId>,
}

impl EnrichmentBar {
    /// Bar length, `-log10(fdr)`.
    pub fn score(&self) -> f64 {
        -self.fdr.max(MIN_FDR).log10()
    }

    pub fn label(&self) -> String {
        format!("{} ({})", self.pathway, self.source)
    }

    pub fn contains_gene(&self, id: &str) -> bool {
        self.genes.iter().any(|g| g == id)
    }
}

impl From<&Pathway> for EnrichmentBar {
    fn from(p: &Pathway) -> Self {
        Self {
            cluster: p.cluster,
            pathway: p.pathway.clone(),
            pathway_id: p.pathway_id.clone(),
            source: p.source.clone(),
            fdr: p.fdr,
            genes: p.genes.clone(),
        }
    }
}

fn by_fdr(a: &EnrichmentBar, b: &EnrichmentBar) -> Ordering {
    a.fdr
        .total_cmp(&b.fdr)
        .then_with(|| a.pathway_id.cmp(&b.pathway_id))
}

/// Pick the bars to show: the best `top_k` pathways of every source in
/// every cluster, clusters ascending, FDR ascending within a cluster.
pub fn rank_pathways(pathways: &[Pathway], top_k: usize) -> Vec<EnrichmentBar> {
    let mut by_source: BTreeMap<(i64, &str), Vec<EnrichmentBar>> = BTreeMap::new();
    for pathway in pathways {
        by_source
            .entry((pathway.cluster, pathway.source.as_str()))
            .or_default()
            .push(EnrichmentBar::from(pathway));
    }

    let mut by_cluster: BTreeMap<i64, Vec<EnrichmentBar>> = BTreeMap::new();
    for ((cluster, _), mut bars) in by_source {
        bars.sort_by(by_fdr);
        bars.truncate(top_k);
        by_cluster.entry(cluster).or_default().extend(bars);
    }

    by_cluster
        .into_values()
        .flat_map(|mut bars| {
            bars.sort_by(by_fdr);
            bars
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct BarplotModel {
    bars: Vec<EnrichmentBar>,
    top_k: usize,
    hovered: Option<usize>,
    highlighted_gene: Option<NodeId>,
}

impl Default for BarplotModel {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_K)
    }
}

impl BarplotModel {
    pub fn new(top_k: usize) -> Self {
        Self {
            bars: Vec::new(),
            top_k,
            hovered: None,
            highlighted_gene: None,
        }
    }

    /// Replace the data. Transient hover and highlight state is reset.
    pub fn set_pathways(&mut self, pathways: &[Pathway]) {
        self.bars = rank_pathways(pathways, self.top_k);
        self.hovered = None;
        self.highlighted_gene = None;
    }

    pub fn bars(&self) -> &[EnrichmentBar] {
        &self.bars
    }

    /// Whether there is anything to draw or export.
    pub fn is_rendered(&self) -> bool {
        !self.bars.is_empty()
    }

    pub fn hovered_bar(&self) -> Option<usize> {
        self.hovered
    }

    pub fn highlighted_gene(&self) -> Option<&str> {
        self.highlighted_gene.as_deref()
    }

    pub fn is_bar_highlighted(&self, index: usize) -> bool {
        match (&self.highlighted_gene, self.bars.get(index)) {
            (Some(gene), Some(bar)) => bar.contains_gene(gene),
            _ => false,
        }
    }

    pub fn max_score(&self) -> f64 {
        self.bars.iter().map(EnrichmentBar::score).fold(0.0, f64::max)
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn clear_marks(&mut self) {
        self.hovered = None;
        self.highlighted_gene = None;
    }
}

impl BarplotCommands for BarplotModel {
    fn highlight_gene(&mut self, id: Option<&str>) {
        self.highlighted_gene = id.map(str::to_string);
    }

    fn set_hovered_bar(&mut self, index: Option<usize>) {
        self.hovered = index.filter(|i| *i < self.bars.len());
    }

    fn bar(&self, index: usize) -> Option<(i64, Vec<NodeId>)> {
        self.bars.get(index).map(|b| (b.cluster, b.genes.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Default)]
pub struct GeneTableModel {
    rows: Vec<GeneRecord>,
    selected: BTreeSet<NodeId>,
    visible: Option<HashSet<NodeId>>,
    search: String,
    sort: Option<(String, SortOrder)>,
}

impl GeneTableModel {
    /// Replace the rows, keeping the selection of ids that still exist.
    pub fn set_rows(&mut self, rows: Vec<GeneRecord>) {
        let ids: HashSet<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        self.selected.retain(|id| ids.contains(id.as_str()));
        self.rows = rows;
    }

    pub fn rows(&self) -> &[GeneRecord] {
        &self.rows
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    pub fn sort(&self) -> Option<(&str, SortOrder)> {
        self.sort.as_ref().map(|(c, o)| (c.as_str(), *o))
    }

    /// Sort by `column`; sorting the same column again flips the order.
    pub fn sort_by(&mut self, column: &str) {
        self.sort = match self.sort.take() {
            Some((current, SortOrder::Ascending)) if current == column => {
                Some((current, SortOrder::Descending))
            }
            _ => Some((column.to_string(), SortOrder::Ascending)),
        };
    }

    /// Column names: `id`, `name`, then every extra key in first-seen
    /// order.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = vec![String::from("id"), String::from("name")];
        for row in &self.rows {
            for key in row.extra.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        columns
    }

    fn matches_search(&self, row: &GeneRecord) -> bool {
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        row.id.to_lowercase().contains(&needle)
            || row.name.to_lowercase().contains(&needle)
            || row
                .extra
                .keys()
                .any(|k| row.column_text(k).to_lowercase().contains(&needle))
    }

    /// Rows after the visibility filter, the text search and the sort.
    pub fn visible_rows(&self) -> Vec<&GeneRecord> {
        let mut rows: Vec<&GeneRecord> = self
            .rows
            .iter()
            .filter(|r| self.visible.as_ref().is_none_or(|v| v.contains(&r.id)))
            .filter(|r| self.matches_search(r))
            .collect();

        if let Some((column, order)) = &self.sort {
            rows.sort_by(|a, b| {
                let ordering = match (a.column_number(column), b.column_number(column)) {
                    (Some(x), Some(y)) => x.total_cmp(&y),
                    _ => a.column_text(column).cmp(&b.column_text(column)),
                };
                match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }
        rows
    }
}

impl TableCommands for GeneTableModel {
    fn toggle_row(&mut self, id: &str) -> Vec<NodeId> {
        if !self.selected.remove(id) {
            self.selected.insert(id.to_string());
        }
        self.selected_rows()
    }

    fn set_selected_rows(&mut self, ids: &[NodeId]) {
        self.selected = ids.iter().cloned().collect();
    }

    fn set_visible_rows(&mut self, ids: Option<&[NodeId]>) {
        self.visible = ids.map(|ids| ids.iter().cloned().collect());
    }

    fn selected_rows(&self) -> Vec<NodeId> {
        self.selected.iter().cloned().collect()
    }

    fn clear(&mut self) {
        self.selected.clear();
        self.visible = None;
    }
}
