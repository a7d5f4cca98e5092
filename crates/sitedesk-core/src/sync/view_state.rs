//! Per-view snapshot of every dashboard source.
//!
//! Each source slot holds the last known-good value, when it was written, and
//! the last error. Writes are atomic per source (one `DashMap` entry lock) and
//! ordered by request sequence number: a response from an earlier request
//! never overwrites the result of a later one, whatever order they complete in.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use sitedesk_types::error::FetchError;
use sitedesk_types::source::{Criticality, LoadPhase, SourceId};

/// A failed fetch as recorded in a slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceError {
    pub error: FetchError,
    pub phase: LoadPhase,
    pub at: DateTime<Utc>,
}

/// Read model of one source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSnapshot {
    pub id: SourceId,
    pub criticality: Criticality,
    pub value: Option<Value>,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_error: Option<SourceError>,
}

impl SourceSnapshot {
    /// The error to show the user. Background poll failures stay quiet.
    pub fn surfaced_error(&self) -> Option<&FetchError> {
        self.last_error
            .as_ref()
            .filter(|e| e.phase == LoadPhase::Initial)
            .map(|e| &e.error)
    }
}

/// Request sequence number for one fetch of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub source: SourceId,
    pub seq: u64,
}

/// What [`ViewState::apply_ticket`] did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    Applied,
    /// A later-issued request already wrote this slot.
    Superseded,
    /// The owning poller or view was stopped.
    Cancelled,
    UnknownSource,
}

/// Overall state of a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "sources", rename_all = "lowercase")]
pub enum ViewStatus {
    /// The initial load has not settled.
    Loading,
    Ready,
    /// Optional sources failed their initial load.
    Partial(Vec<SourceId>),
    /// A critical source failed its initial load.
    Degraded(Vec<SourceId>),
}

#[derive(Debug)]
struct Slot {
    criticality: Criticality,
    value: Option<Value>,
    last_updated: Option<DateTime<Utc>>,
    last_error: Option<SourceError>,
    /// Last sequence number handed out.
    issued: u64,
    /// Sequence number of the request that produced `value`.
    value_seq: u64,
    /// Sequence number of the request that produced `last_error`.
    error_seq: u64,
}

impl Slot {
    fn new(criticality: Criticality) -> Self {
        Self {
            criticality,
            value: None,
            last_updated: None,
            last_error: None,
            issued: 0,
            value_seq: 0,
            error_seq: 0,
        }
    }

    fn snapshot(&self, id: &SourceId) -> SourceSnapshot {
        SourceSnapshot {
            id: id.clone(),
            criticality: self.criticality,
            value: self.value.clone(),
            last_updated: self.last_updated,
            last_error: self.last_error.clone(),
        }
    }
}

struct Inner {
    id: Uuid,
    slots: DashMap<SourceId, Slot>,
    loading: AtomicBool,
    revision: watch::Sender<u64>,
}

/// State owned by one view instance. Cloning shares the same state with the
/// view's own aggregator and poller tasks; two views never share one.
#[derive(Clone)]
pub struct ViewState {
    inner: Arc<Inner>,
}

impl ViewState {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                id: Uuid::now_v7(),
                slots: DashMap::new(),
                loading: AtomicBool::new(false),
                revision,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Add a source slot, or update its criticality if it exists.
    pub fn register(&self, id: &SourceId, criticality: Criticality) {
        self.inner
            .slots
            .entry(id.clone())
            .and_modify(|slot| slot.criticality = criticality)
            .or_insert_with(|| Slot::new(criticality));
    }

    /// Allocate the next request sequence number for `id`. Unknown sources are
    /// registered as optional.
    pub fn issue(&self, id: &SourceId) -> Ticket {
        let mut slot = self
            .inner
            .slots
            .entry(id.clone())
            .or_insert_with(|| Slot::new(Criticality::Optional));
        slot.issued += 1;
        Ticket {
            source: id.clone(),
            seq: slot.issued,
        }
    }

    /// Apply an outcome as a brand-new request for `id`.
    pub fn apply(
        &self,
        id: &SourceId,
        outcome: Result<Value, FetchError>,
        phase: LoadPhase,
    ) -> ApplyResult {
        let ticket = self.issue(id);
        self.apply_ticket(&ticket, outcome, phase, None)
    }

    /// Apply the outcome of the request identified by `ticket`.
    ///
    /// - success: written unless a later-issued success already wrote the
    ///   value; clears `last_error` unless that error came from a later request;
    /// - failure: recorded in `last_error` unless a later-issued request
    ///   already settled; `value` and `last_updated` are untouched.
    ///
    /// `cancel` is checked while the slot lock is held, so nothing lands once
    /// the token is cancelled and [`fence`](Self::fence) has returned.
    pub fn apply_ticket(
        &self,
        ticket: &Ticket,
        outcome: Result<Value, FetchError>,
        phase: LoadPhase,
        cancel: Option<&CancellationToken>,
    ) -> ApplyResult {
        let Some(mut slot) = self.inner.slots.get_mut(&ticket.source) else {
            return ApplyResult::UnknownSource;
        };
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return ApplyResult::Cancelled;
        }

        match outcome {
            Ok(value) => {
                if ticket.seq <= slot.value_seq {
                    return ApplyResult::Superseded;
                }
                slot.value = Some(value);
                slot.value_seq = ticket.seq;
                slot.last_updated = Some(Utc::now());
                if ticket.seq > slot.error_seq {
                    slot.last_error = None;
                }
            }
            Err(error) => {
                if ticket.seq <= slot.value_seq || ticket.seq <= slot.error_seq {
                    return ApplyResult::Superseded;
                }
                slot.last_error = Some(SourceError {
                    error,
                    phase,
                    at: Utc::now(),
                });
                slot.error_seq = ticket.seq;
            }
        }
        // Notify before releasing the slot so `fence` also orders the bump.
        self.bump();
        drop(slot);

        ApplyResult::Applied
    }

    /// Wait out any write to `id` that is in progress.
    pub fn fence(&self, id: &SourceId) {
        drop(self.inner.slots.get_mut(id));
    }

    /// [`fence`](Self::fence) every source.
    pub fn fence_all(&self) {
        let ids: Vec<SourceId> = self.inner.slots.iter().map(|e| e.key().clone()).collect();
        for id in &ids {
            self.fence(id);
        }
    }

    pub fn set_loading(&self, loading: bool) {
        let previous = self.inner.loading.swap(loading, Ordering::SeqCst);
        if previous != loading {
            self.bump();
        }
    }

    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self, id: &SourceId) -> Option<SourceSnapshot> {
        self.inner.slots.get(id).map(|slot| slot.snapshot(id))
    }

    /// All sources, ordered by id.
    pub fn snapshots(&self) -> Vec<SourceSnapshot> {
        let mut all: Vec<SourceSnapshot> = self
            .inner
            .slots
            .iter()
            .map(|entry| entry.value().snapshot(entry.key()))
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn value(&self, id: &SourceId) -> Option<Value> {
        self.inner.slots.get(id).and_then(|slot| slot.value.clone())
    }

    /// Deserialize the value of `id` into `T`. `None` when absent or when the
    /// value does not have the expected shape.
    pub fn get_as<T: DeserializeOwned>(&self, id: &SourceId) -> Option<T> {
        let value = self.value(id)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(err) => {
                tracing::debug!(source = %id, error = %err, "source value has unexpected shape");
                None
            }
        }
    }

    pub fn surfaced_error(&self, id: &SourceId) -> Option<FetchError> {
        self.snapshot(id)
            .and_then(|s| s.surfaced_error().cloned())
    }

    pub fn status(&self) -> ViewStatus {
        if self.is_loading() {
            return ViewStatus::Loading;
        }

        let mut critical = Vec::new();
        let mut optional = Vec::new();
        for snapshot in self.snapshots() {
            if snapshot.surfaced_error().is_none() {
                continue;
            }
            match snapshot.criticality {
                Criticality::Critical => critical.push(snapshot.id),
                Criticality::Optional => optional.push(snapshot.id),
            }
        }

        if !critical.is_empty() {
            ViewStatus::Degraded(critical)
        } else if !optional.is_empty() {
            ViewStatus::Partial(optional)
        } else {
            ViewStatus::Ready
        }
    }

    /// Change notifications. The value is a revision counter bumped on every
    /// applied write and loading transition.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.inner.revision.borrow()
    }

    fn bump(&self) {
        self.inner.revision.send_modify(|rev| *rev += 1);
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ViewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewState")
            .field("id", &self.inner.id)
            .field("sources", &self.inner.slots.len())
            .field("loading", &self.is_loading())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn id(s: &str) -> SourceId {
        SourceId::new(s)
    }

    fn transport(msg: &str) -> FetchError {
        FetchError::Transport(msg.to_string())
    }

    #[test]
    fn success_overwrites_and_clears_error() {
        let view = ViewState::new();
        view.register(&id("stats"), Criticality::Critical);

        view.apply(&id("stats"), Err(transport("down")), LoadPhase::Initial);
        assert!(view.snapshot(&id("stats")).unwrap().last_error.is_some());

        view.apply(&id("stats"), Ok(json!(1)), LoadPhase::Poll);
        let snap = view.snapshot(&id("stats")).unwrap();
        assert_eq!(snap.value, Some(json!(1)));
        assert!(snap.last_updated.is_some());
        assert!(snap.last_error.is_none());
    }

    #[test]
    fn failure_keeps_value_and_timestamp() {
        let view = ViewState::new();
        view.apply(&id("stats"), Ok(json!({"visits": 5})), LoadPhase::Initial);
        let before = view.snapshot(&id("stats")).unwrap();

        view.apply(&id("stats"), Err(transport("502")), LoadPhase::Poll);
        let after = view.snapshot(&id("stats")).unwrap();
        assert_eq!(after.value, Some(json!({"visits": 5})));
        assert_eq!(after.last_updated, before.last_updated);
        assert_eq!(after.last_error.unwrap().error, transport("502"));
    }

    #[test]
    fn last_issued_wins_over_last_completed() {
        let view = ViewState::new();
        let a = view.issue(&id("active"));
        let b = view.issue(&id("active"));

        assert_eq!(
            view.apply_ticket(&b, Ok(json!("B")), LoadPhase::Poll, None),
            ApplyResult::Applied
        );
        assert_eq!(
            view.apply_ticket(&a, Ok(json!("A")), LoadPhase::Poll, None),
            ApplyResult::Superseded
        );
        assert_eq!(view.value(&id("active")), Some(json!("B")));
    }

    #[test]
    fn earlier_request_completing_first_is_replaced_by_later() {
        let view = ViewState::new();
        let a = view.issue(&id("active"));
        let b = view.issue(&id("active"));

        view.apply_ticket(&a, Ok(json!("A")), LoadPhase::Poll, None);
        assert_eq!(view.value(&id("active")), Some(json!("A")));
        view.apply_ticket(&b, Ok(json!("B")), LoadPhase::Poll, None);
        assert_eq!(view.value(&id("active")), Some(json!("B")));
    }

    #[test]
    fn stale_failure_does_not_mark_fresh_value_as_failed() {
        let view = ViewState::new();
        let a = view.issue(&id("messages"));
        let b = view.issue(&id("messages"));

        view.apply_ticket(&b, Ok(json!([1, 2])), LoadPhase::Poll, None);
        assert_eq!(
            view.apply_ticket(&a, Err(transport("late")), LoadPhase::Poll, None),
            ApplyResult::Superseded
        );
        assert!(view.snapshot(&id("messages")).unwrap().last_error.is_none());
    }

    #[test]
    fn older_success_after_newer_failure_keeps_the_newer_error() {
        let view = ViewState::new();
        let a = view.issue(&id("messages"));
        let b = view.issue(&id("messages"));

        view.apply_ticket(&b, Err(transport("newer")), LoadPhase::Poll, None);
        view.apply_ticket(&a, Ok(json!("A")), LoadPhase::Poll, None);

        let snap = view.snapshot(&id("messages")).unwrap();
        assert_eq!(snap.value, Some(json!("A")));
        assert_eq!(snap.last_error.unwrap().error, transport("newer"));
    }

    #[test]
    fn cancelled_token_blocks_writes() {
        let view = ViewState::new();
        let token = CancellationToken::new();
        let ticket = view.issue(&id("active"));
        token.cancel();

        assert_eq!(
            view.apply_ticket(&ticket, Ok(json!(1)), LoadPhase::Poll, Some(&token)),
            ApplyResult::Cancelled
        );
        assert_eq!(view.value(&id("active")), None);
    }

    #[test]
    fn no_revision_bump_after_fence() {
        let view = ViewState::new();
        let token = CancellationToken::new();
        view.register(&id("active"), Criticality::Optional);

        let writer = {
            let view = view.clone();
            let token = token.clone();
            std::thread::spawn(move || {
                while !token.is_cancelled() {
                    let ticket = view.issue(&id("active"));
                    view.apply_ticket(&ticket, Ok(json!(ticket.seq)), LoadPhase::Poll, Some(&token));
                }
            })
        };

        std::thread::sleep(std::time::Duration::from_millis(20));
        token.cancel();
        view.fence(&id("active"));
        let fenced = view.revision();
        writer.join().unwrap();

        assert_eq!(view.revision(), fenced);
    }

    #[test]
    fn unknown_ticket_source_is_reported() {
        let view = ViewState::new();
        let other = ViewState::new();
        let ticket = other.issue(&id("elsewhere"));
        assert_eq!(
            view.apply_ticket(&ticket, Ok(json!(1)), LoadPhase::Poll, None),
            ApplyResult::UnknownSource
        );
    }

    #[test]
    fn only_initial_errors_are_surfaced() {
        let view = ViewState::new();
        view.apply(&id("a"), Err(transport("x")), LoadPhase::Initial);
        view.apply(&id("b"), Err(transport("y")), LoadPhase::Poll);

        assert_eq!(view.surfaced_error(&id("a")), Some(transport("x")));
        assert_eq!(view.surfaced_error(&id("b")), None);
    }

    #[test]
    fn status_reflects_criticality_of_initial_failures() {
        let view = ViewState::new();
        view.register(&id("stats"), Criticality::Critical);
        view.register(&id("messages"), Criticality::Optional);

        view.set_loading(true);
        assert_eq!(view.status(), ViewStatus::Loading);
        view.set_loading(false);
        assert_eq!(view.status(), ViewStatus::Ready);

        view.apply(&id("messages"), Err(transport("x")), LoadPhase::Initial);
        assert_eq!(view.status(), ViewStatus::Partial(vec![id("messages")]));

        view.apply(&id("stats"), Err(transport("x")), LoadPhase::Initial);
        assert_eq!(view.status(), ViewStatus::Degraded(vec![id("stats")]));

        view.apply(&id("stats"), Ok(json!(1)), LoadPhase::Poll);
        view.apply(&id("messages"), Ok(json!([])), LoadPhase::Poll);
        assert_eq!(view.status(), ViewStatus::Ready);
    }

    #[test]
    fn get_as_reads_typed_values() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Stats {
            visits: u64,
        }

        let view = ViewState::new();
        view.apply(&id("stats"), Ok(json!({"visits": 9})), LoadPhase::Initial);
        view.apply(&id("list"), Ok(json!([1, 2])), LoadPhase::Initial);

        assert_eq!(view.get_as::<Stats>(&id("stats")), Some(Stats { visits: 9 }));
        assert_eq!(view.get_as::<Stats>(&id("list")), None);
        assert_eq!(view.get_as::<Stats>(&id("missing")), None);
    }

    #[test]
    fn applied_writes_bump_revision() {
        let view = ViewState::new();
        let rx = view.subscribe();
        let start = *rx.borrow();

        view.apply(&id("a"), Ok(json!(1)), LoadPhase::Initial);
        let a = view.issue(&id("a"));
        let b = view.issue(&id("a"));
        view.apply_ticket(&b, Ok(json!(2)), LoadPhase::Poll, None);
        view.apply_ticket(&a, Ok(json!(3)), LoadPhase::Poll, None);

        assert_eq!(*rx.borrow(), start + 2);
        assert_eq!(view.revision(), start + 2);
    }

    #[test]
    fn snapshots_are_sorted() {
        let view = ViewState::new();
        view.register(&id("b"), Criticality::Optional);
        view.register(&id("a"), Criticality::Optional);
        let ids: Vec<String> = view.snapshots().into_iter().map(|s| s.id.0).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
