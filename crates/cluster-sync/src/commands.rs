// Commands each view accepts from the selection bus. Views never call
// one another directly.

use crate::coordinator::PopoverRequest;
use crate::model::NodeId;
use crate::surface::Rect;

pub trait GraphCommands {
    /// Dim every node outside `cluster`; `None` clears dimming. Clears
    /// any selection first.
    fn highlight_cluster(&mut self, cluster: Option<i64>);
    /// Select one node, or clear the selection. A selected node yields
    /// a request to open its detail popover.
    fn select_node(&mut self, id: Option<&str>) -> Option<PopoverRequest>;
    fn select_nodes(&mut self, ids: &[NodeId]);
    fn hover_node(&mut self, id: Option<&str>);
    fn anchor_of(&self, id: &str) -> Option<Rect>;
}

pub trait BarplotCommands {
    /// Emphasize the bars whose gene list contains `id`.
    fn highlight_gene(&mut self, id: Option<&str>);
    fn set_hovered_bar(&mut self, index: Option<usize>);
    /// Cluster and genes of the bar at `index`.
    fn bar(&self, index: usize) -> Option<(i64, Vec<NodeId>)>;
}

pub trait TableCommands {
    /// Flip one row in or out of the selection and return the result.
    fn toggle_row(&mut self, id: &str) -> Vec<NodeId>;
    fn set_selected_rows(&mut self, ids: &[NodeId]);
    /// Restrict the visible rows; `None` shows everything.
    fn set_visible_rows(&mut self, ids: Option<&[NodeId]>);
    fn selected_rows(&self) -> Vec<NodeId>;
    fn clear(&mut self);
}
