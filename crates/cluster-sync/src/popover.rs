use crate::error::SyncError;
use crate::model::{NodeDetail, NodeId};
use crate::surface::{Point, Rect, Size};

/// Positioning hooks a popover keeps while open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    Pan,
    Zoom,
    Resize,
    NodeMove,
}

const POSITIONING: [Subscription; 4] = [
    Subscription::Pan,
    Subscription::Zoom,
    Subscription::Resize,
    Subscription::NodeMove,
];

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Loading,
    Ready(NodeDetail),
}

/// Identifies one detail request. Only the ticket of the open popover
/// may resolve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailTicket {
    pub id: u64,
    pub node_id: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPopover {
    pub node_id: NodeId,
    pub anchor: Rect,
    pub detail: DetailState,
    ticket: u64,
    subscriptions: Vec<Subscription>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PopoverState {
    #[default]
    Closed,
    Open(OpenPopover),
}

/// The single floating detail panel.
#[derive(Debug, Default)]
pub struct PopoverController {
    state: PopoverState,
    next_ticket: u64,
    live_subscriptions: usize,
}

impl PopoverController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a popover for `node_id`, closing any open one first.
    pub fn open(&mut self, node_id: impl Into<NodeId>, anchor: Rect) -> DetailTicket {
        self.close();
        self.next_ticket += 1;
        let node_id = node_id.into();
        self.live_subscriptions += POSITIONING.len();
        self.state = PopoverState::Open(OpenPopover {
            node_id: node_id.clone(),
            anchor,
            detail: DetailState::Loading,
            ticket: self.next_ticket,
            subscriptions: POSITIONING.to_vec(),
        });
        tracing::debug!(node = %node_id, "popover opened");
        DetailTicket {
            id: self.next_ticket,
            node_id,
        }
    }

    /// Deliver the detail for a ticket. Stale tickets are ignored and
    /// failures show the placeholder. Returns whether it was applied.
    pub fn resolve(&mut self, ticket: &DetailTicket, result: Result<NodeDetail, SyncError>) -> bool {
        let PopoverState::Open(open) = &mut self.state else {
            return false;
        };
        if open.ticket != ticket.id {
            tracing::debug!(node = %ticket.node_id, "stale node detail dropped");
            return false;
        }
        let detail = result.unwrap_or_else(|err| {
            tracing::warn!(node = %ticket.node_id, error = %err, "node detail unavailable");
            NodeDetail::placeholder()
        });
        open.detail = DetailState::Ready(detail);
        true
    }

    /// Move the panel after a pan, zoom, resize or node move.
    pub fn reanchor(&mut self, anchor: Rect) {
        if let PopoverState::Open(open) = &mut self.state {
            open.anchor = anchor;
        }
    }

    pub fn close(&mut self) {
        if let PopoverState::Open(open) = std::mem::take(&mut self.state) {
            self.live_subscriptions -= open.subscriptions.len();
            tracing::debug!(node = %open.node_id, "popover closed");
        }
    }

    pub fn state(&self) -> &PopoverState {
        &self.state
    }

    pub fn current(&self) -> Option<&OpenPopover> {
        match &self.state {
            PopoverState::Open(open) => Some(open),
            PopoverState::Closed => None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.current().is_some()
    }

    pub fn node_id(&self) -> Option<&str> {
        self.current().map(|o| o.node_id.as_str())
    }

    /// Positioning subscriptions currently held, across every popover
    /// ever opened.
    pub fn live_subscriptions(&self) -> usize {
        self.live_subscriptions
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub origin: Point,
    pub side: Side,
}

/// Top-left corner for a panel next to `anchor`.
///
/// The panel goes below the anchor unless it would leave the viewport
/// there and fits above; horizontally it is centered on the anchor and
/// shifted back inside the viewport.
pub fn place_panel(anchor: Rect, panel: Size, viewport: Size, gap: f32) -> Placement {
    let below = anchor.max.y + gap;
    let above = anchor.min.y - gap - panel.height;
    let fits_below = below + panel.height <= viewport.height;
    let fits_above = above >= 0.0;

    let side = if fits_below || !fits_above {
        if !fits_below && !fits_above && anchor.center().y > viewport.height / 2.0 {
            Side::Above
        } else {
            Side::Below
        }
    } else {
        Side::Above
    };
    let y = match side {
        Side::Below => below,
        Side::Above => above,
    };

    let max_x = (viewport.width - panel.width).max(0.0);
    let x = (anchor.center().x - panel.width / 2.0).clamp(0.0, max_x);

    Placement {
        origin: Point::new(x, y.max(0.0)),
        side,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(x: f32, y: f32) -> Rect {
        Rect::around(Point::new(x, y), 10.0)
    }

    #[test]
    fn test_reopen_disposes_previous_subscriptions() {
        let mut popover = PopoverController::new();
        popover.open("g1", anchor(50.0, 50.0));
        let per_popover = popover.live_subscriptions();
        assert!(per_popover > 0);

        for id in ["g2", "g3", "g4"] {
            popover.open(id, anchor(50.0, 50.0));
            assert_eq!(popover.live_subscriptions(), per_popover);
        }
        assert_eq!(popover.node_id(), Some("g4"));

        popover.close();
        assert_eq!(popover.live_subscriptions(), 0);
        assert!(!popover.is_open());
    }

    #[test]
    fn test_stale_detail_is_ignored() {
        let mut popover = PopoverController::new();
        let first = popover.open("g1", anchor(0.0, 0.0));
        let second = popover.open("g2", anchor(0.0, 0.0));

        let detail = NodeDetail {
            description: "kinase".into(),
            link: "https://example.org".into(),
            name: None,
            length: None,
        };
        assert!(!popover.resolve(&first, Ok(detail.clone())));
        assert_eq!(popover.current().unwrap().detail, DetailState::Loading);

        assert!(popover.resolve(&second, Ok(detail.clone())));
        assert_eq!(popover.current().unwrap().detail, DetailState::Ready(detail));
    }

    #[test]
    fn test_failed_detail_shows_placeholder() {
        let mut popover = PopoverController::new();
        let ticket = popover.open("g1", anchor(0.0, 0.0));

        popover.resolve(&ticket, Err(SyncError::FetchFailure("timeout".into())));

        let DetailState::Ready(detail) = &popover.current().unwrap().detail else {
            panic!("detail should be ready");
        };
        assert_eq!(detail.description, "N/A");
        assert_eq!(detail.link, "#");
    }

    #[test]
    fn test_resolve_after_close_is_ignored() {
        let mut popover = PopoverController::new();
        let ticket = popover.open("g1", anchor(0.0, 0.0));
        popover.close();
        assert!(!popover.resolve(&ticket, Ok(NodeDetail::placeholder())));
    }

    #[test]
    fn test_panel_prefers_below() {
        let placement = place_panel(
            anchor(200.0, 100.0),
            Size::new(100.0, 50.0),
            Size::new(400.0, 400.0),
            5.0,
        );
        assert_eq!(placement.side, Side::Below);
        assert_eq!(placement.origin, Point::new(150.0, 115.0));
    }

    #[test]
    fn test_panel_flips_above_near_bottom() {
        let placement = place_panel(
            anchor(200.0, 380.0),
            Size::new(100.0, 50.0),
            Size::new(400.0, 400.0),
            5.0,
        );
        assert_eq!(placement.side, Side::Above);
        assert_eq!(placement.origin.y, 370.0 - 5.0 - 50.0);
    }

    #[test]
    fn test_panel_shifts_inside_viewport() {
        let viewport = Size::new(400.0, 400.0);
        let panel = Size::new(100.0, 50.0);

        let left = place_panel(anchor(5.0, 100.0), panel, viewport, 5.0);
        assert_eq!(left.origin.x, 0.0);

        let right = place_panel(anchor(398.0, 100.0), panel, viewport, 5.0);
        assert_eq!(right.origin.x, 300.0);
    }
}
