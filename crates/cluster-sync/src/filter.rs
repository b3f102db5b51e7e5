use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::debounce::Debouncer;
use crate::error::SyncError;

/// STRING evidence channels selected by default.
pub const EDGE_SOURCES: [&str; 7] = [
    "coexpression",
    "database",
    "experimental",
    "fusion",
    "neighborhood",
    "phylogenetic",
    "textmining",
];

pub const DEFAULT_CONFIDENCE: f32 = 0.4;

/// Server-side query parameters. Empty `analyses` or `effects` mean no
/// restriction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterState {
    pub confidence: f32,
    pub edge_sources: Vec<String>,
    pub analyses: Vec<String>,
    pub effects: Vec<String>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            edge_sources: EDGE_SOURCES.iter().map(|s| s.to_string()).collect(),
            analyses: Vec::new(),
            effects: Vec::new(),
        }
    }
}

fn canon_set(values: &mut Vec<String>) {
    values.sort();
    values.dedup();
}

impl FilterState {
    /// Sets sorted and deduplicated.
    pub fn canonical(mut self) -> Self {
        canon_set(&mut self.edge_sources);
        canon_set(&mut self.analyses);
        canon_set(&mut self.effects);
        self
    }

    pub fn is_canonical(&self) -> bool {
        let sorted = |v: &[String]| v.windows(2).all(|w| w[0] < w[1]);
        sorted(&self.edge_sources) && sorted(&self.analyses) && sorted(&self.effects)
    }

    /// Equality of canonical forms, confidence compared bit for bit and
    /// every set element by element.
    pub fn same_query(&self, other: &FilterState) -> bool {
        let (a, b) = (self.clone().canonical(), other.clone().canonical());
        a.confidence.to_bits() == b.confidence.to_bits()
            && a.edge_sources == b.edge_sources
            && a.analyses == b.analyses
            && a.effects == b.effects
    }

    /// Stable string identifying the canonical form, used as a log key.
    pub fn fingerprint(&self) -> String {
        let canonical = self.clone().canonical();
        serde_json::to_string(&canonical)
            .unwrap_or_else(|_| format!("{:08x}", canonical.confidence.to_bits()))
    }

    pub fn to_json(&self) -> Result<String, SyncError> {
        Ok(serde_json::to_string(self)?)
    }
}

pub fn canonicalize(state: FilterState) -> FilterState {
    state.canonical()
}

/// A pending fetch for one committed filter.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub id: u64,
    pub filter: FilterState,
    cancelled: Arc<AtomicBool>,
}

impl FetchTicket {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

#[derive(Debug)]
pub enum Resolution<T> {
    Applied(T),
    /// Superseded by a newer fetch; discarded without error.
    Stale,
    Failed(SyncError),
}

/// Turns filter edits into fetches, making sure only the latest one is
/// ever applied.
#[derive(Debug, Default)]
pub struct FilterPipeline {
    committed: Option<FilterState>,
    in_flight: Option<FetchTicket>,
    next_id: u64,
    issued: usize,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a filter. Returns a ticket unless it matches the last
    /// committed filter.
    pub fn update(&mut self, raw: FilterState) -> Option<FetchTicket> {
        let canonical = raw.canonical();
        if self
            .committed
            .as_ref()
            .is_some_and(|current| current.same_query(&canonical))
        {
            tracing::debug!("filter unchanged, fetch skipped");
            return None;
        }
        self.committed = Some(canonical.clone());
        Some(self.issue(canonical))
    }

    fn issue(&mut self, filter: FilterState) -> FetchTicket {
        if let Some(previous) = self.in_flight.take() {
            previous.cancel();
            tracing::debug!(ticket = previous.id, "fetch superseded");
        }
        self.next_id += 1;
        self.issued += 1;
        let ticket = FetchTicket {
            id: self.next_id,
            filter,
            cancelled: Arc::new(AtomicBool::new(false)),
        };
        self.in_flight = Some(ticket.clone());
        ticket
    }

    /// Deliver the outcome of a fetch.
    pub fn resolve<T>(&mut self, ticket: &FetchTicket, result: Result<T, SyncError>) -> Resolution<T> {
        if ticket.is_cancelled() {
            tracing::debug!(ticket = ticket.id, "stale fetch result discarded");
            return Resolution::Stale;
        }
        if self.in_flight.as_ref().is_some_and(|t| t.id == ticket.id) {
            self.in_flight = None;
        }
        match result {
            Ok(value) => Resolution::Applied(value),
            Err(err) => {
                tracing::warn!(ticket = ticket.id, error = %err, "fetch failed");
                Resolution::Failed(err)
            }
        }
    }

    /// Fetch the committed filter again, after a failure.
    pub fn retry(&mut self) -> Option<FetchTicket> {
        let filter = self.committed.clone()?;
        Some(self.issue(filter))
    }

    pub fn in_flight(&self) -> Option<&FetchTicket> {
        self.in_flight.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn committed(&self) -> Option<&FilterState> {
        self.committed.as_ref()
    }

    /// Tickets handed out so far.
    pub fn issued_count(&self) -> usize {
        self.issued
    }
}

/// Confidence slider: the displayed value follows the drag, the
/// committed value only changes after release.
#[derive(Debug, Clone)]
pub struct ConfidenceControl {
    display_value: f32,
    committed_value: f32,
    commit: Debouncer<f32>,
}

impl ConfidenceControl {
    pub fn new(value: f32, commit_delay: Duration) -> Self {
        Self {
            display_value: value,
            committed_value: value,
            commit: Debouncer::new(commit_delay),
        }
    }

    pub fn drag(&mut self, value: f32) {
        self.display_value = value.clamp(0.0, 1.0);
    }

    pub fn release(&mut self, now: Duration) {
        self.commit.call(self.display_value, now);
    }

    /// The newly committed value, once the release has settled.
    pub fn poll(&mut self, now: Duration) -> Option<f32> {
        let value = self.commit.poll(now)?;
        self.committed_value = value;
        Some(value)
    }

    /// Sync with a filter applied elsewhere.
    pub fn reset(&mut self, value: f32) {
        self.commit.cancel();
        self.display_value = value;
        self.committed_value = value;
    }

    pub fn display_value(&self) -> f32 {
        self.display_value
    }

    pub fn committed_value(&self) -> f32 {
        self.committed_value
    }

    pub fn is_pending(&self) -> bool {
        self.commit.is_pending()
    }

    pub fn due_in(&self, now: Duration) -> Option<Duration> {
        self.commit.due_in(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn filter(sources: &[&str]) -> FilterState {
        FilterState {
            edge_sources: sources.iter().map(|s| s.to_string()).collect(),
            ..FilterState::default()
        }
    }

    #[test]
    fn test_defaults_match_service() {
        let state = FilterState::default();
        assert_eq!(state.confidence, 0.4);
        assert_eq!(state.edge_sources.len(), 7);
        assert!(state.is_canonical());
        assert!(state.analyses.is_empty());
    }

    #[test]
    fn test_serialized_keys_are_camel_case() {
        let json = filter(&["b", "a"]).canonical().to_json().unwrap();
        assert_eq!(
            json,
            r#"{"confidence":0.4,"edgeSources":["a","b"],"analyses":[],"effects":[]}"#
        );

        let parsed: FilterState = serde_json::from_str(r#"{"effects": ["enhancer"]}"#).unwrap();
        assert_eq!(parsed.confidence, DEFAULT_CONFIDENCE);
        assert_eq!(parsed.effects, vec!["enhancer"]);
    }

    #[test]
    fn test_canonical_resubmission_issues_no_fetch() {
        let mut pipeline = FilterPipeline::new();

        let ticket = pipeline.update(filter(&["b", "a", "a"])).unwrap();
        assert_eq!(ticket.filter.edge_sources, vec!["a", "b"]);
        assert!(pipeline.update(filter(&["a", "b"])).is_none());
        assert!(pipeline.update(filter(&["b", "a"])).is_none());

        assert_eq!(pipeline.issued_count(), 1);
    }

    #[test]
    fn test_comma_in_tag_is_a_distinct_query() {
        let mut pipeline = FilterPipeline::new();

        let split = pipeline.update(filter(&["a", "b"])).unwrap();
        let joined = pipeline.update(filter(&["a,b"])).unwrap();
        assert!(split.is_cancelled());
        assert_ne!(split.filter.fingerprint(), joined.filter.fingerprint());
        assert_eq!(pipeline.issued_count(), 2);

        let spread = FilterState {
            analyses: vec![String::from("x")],
            effects: vec![String::from("y")],
            ..FilterState::default()
        };
        let packed = FilterState {
            analyses: vec![String::from("x|y")],
            ..FilterState::default()
        };
        assert!(!spread.same_query(&packed));
    }

    #[test]
    fn test_confidence_compared_bitwise() {
        let a = FilterState { confidence: 0.5, ..FilterState::default() };
        let b = FilterState { confidence: 0.5000001, ..FilterState::default() };
        assert!(!a.same_query(&b));
        assert!(a.same_query(&a.clone()));
    }

    #[test]
    fn test_superseded_fetch_is_stale_even_if_it_resolves_last() {
        let mut pipeline = FilterPipeline::new();
        let first = pipeline.update(filter(&["a"])).unwrap();
        let second = pipeline.update(filter(&["b"])).unwrap();

        assert!(first.is_cancelled());
        assert!(matches!(pipeline.resolve(&second, Ok("B")), Resolution::Applied("B")));
        assert!(matches!(pipeline.resolve(&first, Ok("A")), Resolution::Stale));
        assert!(!pipeline.is_loading());
    }

    #[test]
    fn test_failure_then_retry() {
        let mut pipeline = FilterPipeline::new();
        let ticket = pipeline.update(filter(&["a"])).unwrap();

        let resolution: Resolution<()> =
            pipeline.resolve(&ticket, Err(SyncError::FetchFailure("503".into())));
        assert!(matches!(resolution, Resolution::Failed(SyncError::FetchFailure(_))));

        let retry = pipeline.retry().unwrap();
        assert_ne!(retry.id, ticket.id);
        assert_eq!(retry.filter, ticket.filter);
        assert!(pipeline.is_loading());
    }

    #[test]
    fn test_slider_commits_only_after_release() {
        let mut control = ConfidenceControl::new(0.4, Duration::from_millis(250));

        control.drag(0.55);
        control.drag(0.7);
        assert_eq!(control.display_value(), 0.7);
        assert_eq!(control.committed_value(), 0.4);
        assert_eq!(control.poll(Duration::from_secs(10)), None);

        control.release(Duration::from_millis(1000));
        assert_eq!(control.poll(Duration::from_millis(1100)), None);
        assert_eq!(control.poll(Duration::from_millis(1250)), Some(0.7));
        assert_eq!(control.committed_value(), 0.7);
    }

    proptest! {
        #[test]
        fn prop_canonicalization_is_idempotent(
            sources in prop::collection::vec("[a-z]{1,8}", 0..12),
            effects in prop::collection::vec("[a-z]{1,8}", 0..6),
            confidence in 0.0f32..=1.0,
        ) {
            let state = FilterState {
                confidence,
                edge_sources: sources,
                analyses: Vec::new(),
                effects,
            };
            let once = canonicalize(state);
            let twice = canonicalize(once.clone());
            prop_assert!(once.is_canonical());
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(once.fingerprint(), twice.fingerprint());
        }
    }
}
