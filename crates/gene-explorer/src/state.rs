use cluster_sync::Upward;

use crate::actions::{self, Action};
use crate::cache::Cache;
use crate::effects::{self, Effect};
use crate::service::{DataService, ServiceReply};
use crate::store::Store;

pub struct State {
    pub store: Store,
    pub cache: Cache,
    pub service: DataService,
    action_queue: Vec<Action>,
    effect_queue: Vec<Effect>,
}

impl State {
    pub fn new(store: Store, service: DataService) -> Self {
        Self {
            store,
            cache: Cache::new(),
            service,
            action_queue: Vec::new(),
            effect_queue: Vec::new(),
        }
    }

    pub fn dispatch(&mut self, action: Action) {
        self.action_queue.push(action);
    }

    /// Turn finished requests into actions.
    pub fn poll_service(&mut self) {
        for reply in self.service.drain() {
            self.dispatch(match reply {
                ServiceReply::Graph { ticket, result } => Action::GraphLoaded { ticket, result },
                ServiceReply::Detail { ticket, result } => Action::DetailLoaded { ticket, result },
                ServiceReply::GeneTable(result) => Action::GeneTableLoaded { result },
            });
        }
    }

    pub fn flush_actions(&mut self) {
        let actions = std::mem::take(&mut self.action_queue);
        for action in actions {
            let mut effects = actions::update(&mut self.store, action);
            self.effect_queue.append(&mut effects);
        }
        for upward in self.store.bus.flush() {
            match upward {
                Upward::FetchDetail(ticket) => self.effect_queue.push(Effect::FetchDetail(ticket)),
                Upward::SelectionChanged(ids) => {
                    tracing::debug!(selected = ids.len(), "selection changed");
                }
            }
        }
    }

    pub fn flush_effects(&mut self) {
        let effects = std::mem::take(&mut self.effect_queue);
        for effect in effects {
            effects::run(&mut self.store, &self.service, effect);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExplorerConfig;
    use cluster_sync::{GraphPayload, Node, SyncError, ViewEvent};

    fn state() -> State {
        let config = ExplorerConfig::default();
        State::new(Store::new(&config), DataService::new(config.service.clone()))
    }

    fn load(state: &mut State) {
        let ticket = state.store.commit_filter().unwrap();
        let payload = GraphPayload {
            nodes: vec![Node::new("g1", 1), Node::new("g2", 1), Node::new("g3", 2)],
            ..GraphPayload::default()
        };
        state.dispatch(Action::GraphLoaded {
            ticket,
            result: Ok(payload),
        });
        state.flush_actions();
    }

    #[test]
    fn test_node_click_queues_detail_fetch() {
        let mut state = state();
        load(&mut state);

        state.dispatch(Action::View(ViewEvent::NodeClicked(String::from("g2"))));
        state.flush_actions();

        assert!(matches!(
            state.effect_queue.as_slice(),
            [Effect::FetchDetail(ticket)] if ticket.node_id == "g2"
        ));
        assert!(state.store.bus.popover().is_open());
    }

    #[test]
    fn test_late_detail_for_closed_popover_is_ignored() {
        let mut state = state();
        load(&mut state);
        state.dispatch(Action::View(ViewEvent::NodeClicked(String::from("g1"))));
        state.flush_actions();
        let Some(Effect::FetchDetail(ticket)) = state.effect_queue.pop() else {
            panic!("no detail request");
        };

        state.dispatch(Action::View(ViewEvent::CanvasClicked));
        state.flush_actions();
        state.dispatch(Action::DetailLoaded {
            ticket,
            result: Err(SyncError::FetchFailure(String::from("HTTP 404"))),
        });
        state.flush_actions();

        assert!(!state.store.bus.popover().is_open());
        assert!(state.store.error_message.is_none());
    }
}
