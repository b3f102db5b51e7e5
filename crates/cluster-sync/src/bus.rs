use std::collections::BTreeSet;

use crate::commands::{BarplotCommands, GraphCommands, TableCommands};
use crate::error::SyncError;
use crate::model::{NodeDetail, NodeId};
use crate::popover::{DetailTicket, PopoverController};
use crate::surface::{Point, Rect};

/// Which view raised an event. Events raised in the same tick are
/// applied in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Initiator {
    Graph,
    Barplot,
    Table,
    ControlPanel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    NodeHovered(NodeId),
    NodeUnhovered,
    NodeClicked(NodeId),
    NodesBoxSelected(Vec<NodeId>),
    CanvasClicked,
    BarHovered(usize),
    BarUnhovered,
    RowClicked(NodeId),
    RowHovered(NodeId),
    /// Selection pushed in from outside the three views.
    SelectGenes(Vec<NodeId>),
    /// Cluster picked in the legend; `None` shows every cluster.
    ClusterHighlighted(Option<i64>),
    ClearAll,
}

impl ViewEvent {
    pub fn initiator(&self) -> Initiator {
        match self {
            ViewEvent::NodeHovered(_)
            | ViewEvent::NodeUnhovered
            | ViewEvent::NodeClicked(_)
            | ViewEvent::NodesBoxSelected(_)
            | ViewEvent::CanvasClicked => Initiator::Graph,
            ViewEvent::BarHovered(_) | ViewEvent::BarUnhovered => Initiator::Barplot,
            ViewEvent::RowClicked(_) | ViewEvent::RowHovered(_) => Initiator::Table,
            ViewEvent::SelectGenes(_)
            | ViewEvent::ClusterHighlighted(_)
            | ViewEvent::ClearAll => Initiator::ControlPanel,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected_node_ids: BTreeSet<NodeId>,
    pub hovered_cluster_id: Option<i64>,
    pub active_gene_id: Option<NodeId>,
}

/// Notifications for the application shell.
#[derive(Debug, Clone, PartialEq)]
pub enum Upward {
    SelectionChanged(Vec<NodeId>),
    /// Fetch the detail of a node and hand it back with `resolve_detail`.
    FetchDetail(DetailTicket),
}

/// Routes interaction events between the graph, the bar chart and the
/// gene table.
pub struct SelectionBus<G, B, T> {
    graph: G,
    barplot: B,
    table: T,
    popover: PopoverController,
    state: SelectionState,
    queue: Vec<ViewEvent>,
    /// Notifications raised outside `flush`, handed out by the next one.
    notices: Vec<Upward>,
}

impl<G, B, T> SelectionBus<G, B, T>
where
    G: GraphCommands,
    B: BarplotCommands,
    T: TableCommands,
{
    pub fn new(graph: G, barplot: B, table: T) -> Self {
        Self {
            graph,
            barplot,
            table,
            popover: PopoverController::new(),
            state: SelectionState::default(),
            queue: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub fn dispatch(&mut self, event: ViewEvent) {
        self.queue.push(event);
    }

    /// Apply the events of this tick in initiator order. Events from the
    /// same view keep their dispatch order.
    pub fn flush(&mut self) -> Vec<Upward> {
        let mut events = std::mem::take(&mut self.queue);
        events.sort_by_key(ViewEvent::initiator);
        let mut upward = std::mem::take(&mut self.notices);
        for event in events {
            tracing::trace!(?event, "selection event");
            self.apply(event, &mut upward);
        }
        upward
    }

    fn apply(&mut self, event: ViewEvent, upward: &mut Vec<Upward>) {
        match event {
            ViewEvent::NodeHovered(id) => {
                self.graph.hover_node(Some(id.as_str()));
                self.barplot.highlight_gene(Some(id.as_str()));
                self.state.active_gene_id = Some(id);
            }
            ViewEvent::NodeUnhovered => {
                self.graph.hover_node(None);
                self.barplot.highlight_gene(None);
                self.state.active_gene_id = None;
            }
            ViewEvent::NodeClicked(id) => {
                self.graph.highlight_cluster(None);
                self.state.hovered_cluster_id = None;
                match self.graph.select_node(Some(id.as_str())) {
                    Some(request) => {
                        let anchor = request
                            .anchor
                            .unwrap_or(Rect::around(Point::default(), 0.0));
                        let ticket = self.popover.open(request.node_id, anchor);
                        self.state.selected_node_ids = BTreeSet::from([id]);
                        upward.push(Upward::FetchDetail(ticket));
                    }
                    None => {
                        self.popover.close();
                        self.state.selected_node_ids.clear();
                    }
                }
                upward.push(self.selection_changed());
            }
            ViewEvent::NodesBoxSelected(ids) => {
                self.graph.highlight_cluster(None);
                self.graph.select_nodes(&ids);
                self.popover.close();
                self.state.hovered_cluster_id = None;
                self.state.selected_node_ids = ids.into_iter().collect();
                upward.push(self.selection_changed());
            }
            ViewEvent::CanvasClicked | ViewEvent::ClearAll => {
                self.graph.highlight_cluster(None);
                self.graph.select_node(None);
                self.graph.hover_node(None);
                self.barplot.set_hovered_bar(None);
                self.barplot.highlight_gene(None);
                self.table.clear();
                self.popover.close();
                self.state = SelectionState::default();
                upward.push(self.selection_changed());
            }
            ViewEvent::BarHovered(index) => {
                let Some((cluster, genes)) = self.barplot.bar(index) else {
                    return;
                };
                self.popover.close();
                self.graph.highlight_cluster(Some(cluster));
                self.graph.select_nodes(&genes);
                self.barplot.set_hovered_bar(Some(index));
                self.state.hovered_cluster_id = Some(cluster);
                self.state.selected_node_ids = genes.into_iter().collect();
            }
            ViewEvent::BarUnhovered => {
                self.graph.highlight_cluster(None);
                self.graph.select_nodes(&[]);
                self.barplot.set_hovered_bar(None);
                self.state.hovered_cluster_id = None;
                self.state.selected_node_ids.clear();
            }
            ViewEvent::RowClicked(id) => {
                let selected = self.table.toggle_row(&id);
                self.state.selected_node_ids = selected.iter().cloned().collect();
                upward.push(Upward::SelectionChanged(selected));
            }
            ViewEvent::RowHovered(id) => {
                self.state.active_gene_id = Some(id.clone());
                upward.push(Upward::SelectionChanged(vec![id]));
            }
            ViewEvent::SelectGenes(ids) => {
                self.graph.highlight_cluster(None);
                self.graph.select_nodes(&ids);
                self.barplot.highlight_gene(None);
                self.table.set_visible_rows(Some(ids.as_slice()));
                self.table.set_selected_rows(&ids);
                self.popover.close();
                self.state.hovered_cluster_id = None;
                self.state.selected_node_ids = ids.into_iter().collect();
            }
            ViewEvent::ClusterHighlighted(cluster) => {
                self.popover.close();
                self.graph.highlight_cluster(cluster);
                self.barplot.set_hovered_bar(None);
                self.table.set_selected_rows(&[]);
                self.state.hovered_cluster_id = cluster;
                self.state.selected_node_ids.clear();
                self.state.active_gene_id = None;
                upward.push(self.selection_changed());
            }
        }
    }

    /// Forget the selection before the views are filled from a new
    /// snapshot. The empty selection is reported by the next `flush`.
    pub fn reset_selection(&mut self) {
        self.graph.highlight_cluster(None);
        self.graph.select_node(None);
        self.graph.hover_node(None);
        self.barplot.set_hovered_bar(None);
        self.barplot.highlight_gene(None);
        self.table.clear();
        self.popover.close();
        if self.state != SelectionState::default() {
            tracing::debug!(selected = self.state.selected_node_ids.len(), "selection reset");
        }
        self.state = SelectionState::default();
        self.notices.push(Upward::SelectionChanged(Vec::new()));
    }

    fn selection_changed(&self) -> Upward {
        Upward::SelectionChanged(self.state.selected_node_ids.iter().cloned().collect())
    }

    /// Hand a fetched (or failed) node detail to the popover.
    pub fn resolve_detail(
        &mut self,
        ticket: &DetailTicket,
        result: Result<NodeDetail, SyncError>,
    ) -> bool {
        self.popover.resolve(ticket, result)
    }

    /// Follow the popover's node after the graph moved.
    pub fn reanchor_popover(&mut self) {
        let anchor = self
            .popover
            .node_id()
            .and_then(|id| self.graph.anchor_of(id));
        if let Some(anchor) = anchor {
            self.popover.reanchor(anchor);
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }

    pub fn barplot(&self) -> &B {
        &self.barplot
    }

    pub fn barplot_mut(&mut self) -> &mut B {
        &mut self.barplot
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut T {
        &mut self.table
    }

    pub fn popover(&self) -> &PopoverController {
        &self.popover
    }

    pub fn popover_mut(&mut self) -> &mut PopoverController {
        &mut self.popover
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::GraphLayoutCoordinator;
    use crate::model::{Edge, Node, Pathway};
    use crate::popover::DetailState;
    use crate::surface::{SceneSurfaceFactory, Size};
    use crate::views::{BarplotModel, GeneTableModel};

    type Bus = SelectionBus<
        GraphLayoutCoordinator<SceneSurfaceFactory>,
        BarplotModel,
        GeneTableModel,
    >;

    fn bus() -> Bus {
        let mut graph =
            GraphLayoutCoordinator::new(SceneSurfaceFactory::new(Size::new(600.0, 400.0)));
        graph
            .rebuild(
                vec![Node::new("g1", 1), Node::new("g2", 1), Node::new("g3", 2)],
                &[Edge::new("g1", "g2", true)],
                None,
            )
            .unwrap();

        let mut barplot = BarplotModel::default();
        barplot.set_pathways(&[Pathway {
            cluster: 1,
            pathway: "synapse".into(),
            pathway_id: "GO:1".into(),
            source: "GO".into(),
            fdr: 0.01,
            genes: vec!["g2".into()],
        }]);

        SelectionBus::new(graph, barplot, GeneTableModel::default())
    }

    fn node<'a>(bus: &'a Bus, id: &str) -> &'a crate::surface::SceneNode {
        bus.graph().surface().unwrap().node(id).unwrap()
    }

    #[test]
    fn test_node_hover_highlights_gene_in_barplot() {
        let mut bus = bus();
        bus.dispatch(ViewEvent::NodeHovered("g2".into()));
        bus.flush();

        assert!(node(&bus, "g2").hovered);
        assert!(bus.barplot().is_bar_highlighted(0));

        bus.dispatch(ViewEvent::NodeUnhovered);
        bus.flush();
        assert!(!node(&bus, "g2").hovered);
        assert_eq!(bus.barplot().highlighted_gene(), None);
    }

    #[test]
    fn test_node_click_opens_popover_and_emits_selection() {
        let mut bus = bus();
        bus.dispatch(ViewEvent::NodeClicked("g1".into()));
        let upward = bus.flush();

        let Upward::FetchDetail(ticket) = &upward[0] else {
            panic!("expected a detail fetch, got {upward:?}");
        };
        assert_eq!(ticket.node_id, "g1");
        assert_eq!(upward[1], Upward::SelectionChanged(vec!["g1".into()]));
        assert!(node(&bus, "g1").selected);

        assert!(bus.resolve_detail(ticket, Err(SyncError::FetchFailure("down".into()))));
        let open = bus.popover().current().unwrap();
        assert!(matches!(&open.detail, DetailState::Ready(d) if d.description == "N/A"));

        bus.dispatch(ViewEvent::CanvasClicked);
        bus.flush();
        assert!(!bus.popover().is_open());
        assert!(bus.state().selected_node_ids.is_empty());
    }

    #[test]
    fn test_box_select_never_opens_popover() {
        let mut bus = bus();
        bus.dispatch(ViewEvent::NodesBoxSelected(vec!["g1".into(), "g3".into()]));
        let upward = bus.flush();

        assert_eq!(
            upward,
            vec![Upward::SelectionChanged(vec!["g1".into(), "g3".into()])]
        );
        assert!(!bus.popover().is_open());
    }

    #[test]
    fn test_bar_hover_dims_cluster_and_selects_genes() {
        let mut bus = bus();
        bus.dispatch(ViewEvent::BarHovered(0));
        bus.flush();

        assert!(node(&bus, "g3").dimmed);
        assert!(!node(&bus, "g1").dimmed);
        assert!(node(&bus, "g2").selected);
        assert_eq!(bus.barplot().hovered_bar(), Some(0));
        assert_eq!(bus.state().hovered_cluster_id, Some(1));

        bus.dispatch(ViewEvent::BarUnhovered);
        bus.flush();
        assert!(!node(&bus, "g3").dimmed);
        assert!(!node(&bus, "g2").selected);
        assert_eq!(bus.barplot().hovered_bar(), None);
    }

    #[test]
    fn test_latest_highlight_reason_wins() {
        let mut bus = bus();
        bus.dispatch(ViewEvent::BarHovered(0));
        bus.flush();
        bus.dispatch(ViewEvent::NodeClicked("g3".into()));
        bus.flush();

        assert!(!node(&bus, "g1").dimmed);
        assert!(!node(&bus, "g2").selected);
        assert!(node(&bus, "g3").selected);
    }

    #[test]
    fn test_same_tick_events_follow_initiator_order() {
        let mut bus = bus();
        bus.dispatch(ViewEvent::ClearAll);
        bus.dispatch(ViewEvent::RowClicked("g2".into()));
        bus.dispatch(ViewEvent::NodeClicked("g1".into()));
        assert_eq!(bus.pending(), 3);

        let upward = bus.flush();
        let selections: Vec<_> = upward
            .iter()
            .filter_map(|u| match u {
                Upward::SelectionChanged(ids) => Some(ids.clone()),
                Upward::FetchDetail(_) => None,
            })
            .collect();

        assert_eq!(
            selections,
            vec![vec![String::from("g1")], vec![String::from("g2")], vec![]]
        );
        assert_eq!(bus.pending(), 0);
        assert!(bus.table().selected_rows().is_empty());
    }

    #[test]
    fn test_external_selection_reaches_every_view() {
        let mut bus = bus();
        bus.dispatch(ViewEvent::NodeHovered("g2".into()));
        bus.flush();
        bus.dispatch(ViewEvent::SelectGenes(vec!["g1".into(), "g3".into()]));
        let upward = bus.flush();

        assert!(upward.is_empty());
        assert!(node(&bus, "g1").selected);
        assert!(node(&bus, "g3").selected);
        assert_eq!(bus.barplot().highlighted_gene(), None);
        assert_eq!(bus.table().selected_rows(), vec!["g1", "g3"]);
    }

    #[test]
    fn test_reset_selection_before_rebuild() {
        let mut bus = bus();
        bus.dispatch(ViewEvent::NodeClicked("g1".into()));
        bus.flush();
        assert!(bus.popover().is_open());

        bus.reset_selection();
        bus.graph_mut()
            .rebuild(vec![Node::new("g5", 3)], &[], None)
            .unwrap();

        assert_eq!(bus.state(), &SelectionState::default());
        assert!(!bus.popover().is_open());
        assert!(!node(&bus, "g5").selected);
        assert_eq!(bus.flush(), vec![Upward::SelectionChanged(vec![])]);
        assert!(bus.flush().is_empty());
    }

    #[test]
    fn test_legend_highlight_replaces_selection() {
        let mut bus = bus();
        bus.dispatch(ViewEvent::NodeClicked("g1".into()));
        bus.flush();

        bus.dispatch(ViewEvent::ClusterHighlighted(Some(2)));
        let upward = bus.flush();

        assert_eq!(upward, vec![Upward::SelectionChanged(vec![])]);
        assert!(!bus.popover().is_open());
        assert!(!node(&bus, "g1").selected);
        assert!(node(&bus, "g1").dimmed);
        assert!(!node(&bus, "g3").dimmed);
        assert_eq!(bus.state().hovered_cluster_id, Some(2));
        assert!(bus.state().selected_node_ids.is_empty());

        bus.dispatch(ViewEvent::ClusterHighlighted(None));
        bus.flush();
        assert!(!node(&bus, "g1").dimmed);
        assert_eq!(bus.state().hovered_cluster_id, None);
    }

    #[test]
    fn test_reopening_popover_keeps_one_set_of_subscriptions() {
        let mut bus = bus();
        bus.dispatch(ViewEvent::NodeClicked("g1".into()));
        bus.flush();
        let live = bus.popover().live_subscriptions();
        bus.dispatch(ViewEvent::NodeClicked("g2".into()));
        bus.flush();
        bus.reanchor_popover();

        assert_eq!(bus.popover().live_subscriptions(), live);
        assert_eq!(bus.popover().node_id(), Some("g2"));
    }
}
