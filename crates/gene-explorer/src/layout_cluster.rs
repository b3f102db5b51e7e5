use eframe::egui;
use egui_graphs::{DisplayEdge, DisplayNode, Graph, Layout, LayoutState};
use petgraph::EdgeType;
use petgraph::graph::IndexType;
use serde::{Deserialize, Serialize};

/// Positions computed by the layout coordinator, pushed into the view
/// state before the next frame. Applied once, then left alone so the
/// user may drag nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutStateCluster {
    /// Node index and canvas position.
    pub positions: Vec<(usize, egui::Pos2)>,
    pub applied: bool,
}

impl LayoutStateCluster {
    pub fn pending(positions: Vec<(usize, egui::Pos2)>) -> Self {
        Self {
            positions,
            applied: false,
        }
    }
}

impl LayoutState for LayoutStateCluster {}

#[derive(Debug, Clone, Default)]
pub struct LayoutCluster {
    state: LayoutStateCluster,
}

impl Layout<LayoutStateCluster> for LayoutCluster {
    fn from_state(state: LayoutStateCluster) -> impl Layout<LayoutStateCluster> {
        Self { state }
    }

    fn next<N, E, Ty, Ix, Dn, De>(&mut self, g: &mut Graph<N, E, Ty, Ix, Dn, De>, _ui: &egui::Ui)
    where
        N: Clone,
        E: Clone,
        Ty: EdgeType,
        Ix: IndexType,
        Dn: DisplayNode<N, E, Ty, Ix>,
        De: DisplayEdge<N, E, Ty, Ix, Dn>,
    {
        if self.state.applied {
            return;
        }
        for (index, pos) in &self.state.positions {
            let idx = petgraph::stable_graph::NodeIndex::<Ix>::new(*index);
            if let Some(node) = g.node_mut(idx) {
                node.set_location(*pos);
            }
        }
        self.state.applied = true;
    }

    fn state(&self) -> LayoutStateCluster {
        self.state.clone()
    }
}
