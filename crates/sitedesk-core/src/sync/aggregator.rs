//! Initial concurrent load of every source in a view.

use std::time::Duration;

use futures_util::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use sitedesk_types::error::FetchError;
use sitedesk_types::source::{LoadPhase, SourceId};

use super::view_state::{ApplyResult, ViewState};
use crate::source::{fetch_with_timeout, SourceDescriptor};

/// Result of one source in an aggregate load.
#[derive(Debug, Clone, Serialize)]
pub struct SourceOutcome {
    pub id: SourceId,
    pub result: Result<Value, FetchError>,
    /// Whether the result was written into the view.
    pub applied: bool,
}

/// Per-source results of [`Aggregator::load_all`], in completion order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub outcomes: Vec<SourceOutcome>,
}

impl LoadReport {
    pub fn failed(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed().next().is_none()
    }

    pub fn get(&self, id: &SourceId) -> Option<&SourceOutcome> {
        self.outcomes.iter().find(|o| &o.id == id)
    }
}

/// Runs the initial load: every source fetched concurrently, each result
/// applied as soon as it settles, and one failure never holding up the rest.
#[derive(Debug, Clone)]
pub struct Aggregator {
    timeout: Duration,
}

impl Aggregator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn load_all(&self, view: &ViewState, sources: &[SourceDescriptor]) -> LoadReport {
        self.load_all_guarded(view, sources, &CancellationToken::new())
            .await
    }

    /// Like [`load_all`](Self::load_all), but results arriving after `cancel`
    /// fires are dropped instead of applied.
    pub async fn load_all_guarded(
        &self,
        view: &ViewState,
        sources: &[SourceDescriptor],
        cancel: &CancellationToken,
    ) -> LoadReport {
        view.set_loading(true);

        // Tickets are issued before any fetch starts, so a poll or refresh
        // started afterwards always outranks the initial load.
        let mut pending = FuturesUnordered::new();
        for descriptor in sources {
            view.register(descriptor.id(), descriptor.criticality);
            let ticket = view.issue(descriptor.id());
            let source = descriptor.source.clone();
            let timeout = self.timeout;
            pending.push(async move {
                let result = fetch_with_timeout(&source, timeout).await;
                (ticket, result)
            });
        }

        let mut report = LoadReport::default();
        while let Some((ticket, result)) = pending.next().await {
            if let Err(err) = &result {
                tracing::warn!(
                    view = %view.id(),
                    source = %ticket.source,
                    error = %err,
                    "initial load failed"
                );
            }
            let applied = view.apply_ticket(&ticket, result.clone(), LoadPhase::Initial, Some(cancel));
            report.outcomes.push(SourceOutcome {
                id: ticket.source,
                result,
                applied: applied == ApplyResult::Applied,
            });
        }

        view.set_loading(false);
        tracing::debug!(
            view = %view.id(),
            sources = report.outcomes.len(),
            failed = report.failed().count(),
            "initial load settled"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::fake::FakeSource;
    use crate::source::BoxDataSource;
    use crate::sync::view_state::ViewStatus;
    use serde_json::json;
    use sitedesk_types::source::{Criticality, Refresh};

    fn descriptor(fake: &FakeSource, criticality: Criticality) -> SourceDescriptor {
        SourceDescriptor::new(BoxDataSource::new(fake.clone()), Refresh::Once, criticality)
    }

    #[tokio::test]
    async fn all_sources_load() {
        let stats = FakeSource::new("visitor-stats");
        let messages = FakeSource::new("messages");
        stats.push_ready(Ok(json!({"visits": 10})));
        messages.push_ready(Ok(json!([])));

        let view = ViewState::new();
        let report = Aggregator::new(Duration::from_secs(5))
            .load_all(
                &view,
                &[
                    descriptor(&stats, Criticality::Critical),
                    descriptor(&messages, Criticality::Optional),
                ],
            )
            .await;

        assert!(report.all_succeeded());
        assert!(!view.is_loading());
        assert_eq!(view.status(), ViewStatus::Ready);
        assert_eq!(view.value(&"visitor-stats".into()), Some(json!({"visits": 10})));
    }

    #[tokio::test]
    async fn one_failure_does_not_block_the_others() {
        let stats = FakeSource::new("visitor-stats");
        let messages = FakeSource::new("messages");
        stats.push_ready(Ok(json!({"visits": 10})));
        messages.push_ready(Err(FetchError::Envelope("inbox unavailable".to_string())));

        let view = ViewState::new();
        let report = Aggregator::new(Duration::from_secs(5))
            .load_all(
                &view,
                &[
                    descriptor(&stats, Criticality::Critical),
                    descriptor(&messages, Criticality::Optional),
                ],
            )
            .await;

        assert!(!report.all_succeeded());
        assert_eq!(report.failed().count(), 1);
        assert!(report.get(&"visitor-stats".into()).unwrap().applied);
        assert_eq!(view.status(), ViewStatus::Partial(vec!["messages".into()]));
        assert_eq!(
            view.surfaced_error(&"messages".into()),
            Some(FetchError::Envelope("inbox unavailable".to_string()))
        );
    }

    #[tokio::test]
    async fn results_apply_as_each_source_settles() {
        let fast = FakeSource::new("fast");
        let slow = FakeSource::new("slow");
        fast.push_ready(Ok(json!("fast")));
        let gate = slow.push_gated();

        let view = ViewState::new();
        let mut revisions = view.subscribe();
        let sources = vec![
            descriptor(&fast, Criticality::Optional),
            descriptor(&slow, Criticality::Optional),
        ];
        let aggregator = Aggregator::new(Duration::from_secs(5));
        let load = {
            let view = view.clone();
            tokio::spawn(async move { aggregator.load_all(&view, &sources).await })
        };

        // Wait until the fast source is visible while the slow one is pending.
        loop {
            revisions.changed().await.unwrap();
            if view.value(&"fast".into()).is_some() {
                break;
            }
        }
        assert!(view.is_loading());
        assert_eq!(view.value(&"slow".into()), None);

        gate.send(Ok(json!("slow"))).unwrap();
        let report = load.await.unwrap();
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[0].id.as_str(), "fast");
        assert_eq!(view.value(&"slow".into()), Some(json!("slow")));
        assert!(!view.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_times_out_as_transport_failure() {
        let stuck = FakeSource::new("visitor-stats");
        let _gate = stuck.push_gated();

        let view = ViewState::new();
        let report = Aggregator::new(Duration::from_secs(10))
            .load_all(&view, &[descriptor(&stuck, Criticality::Critical)])
            .await;

        assert!(matches!(
            report.outcomes[0].result,
            Err(FetchError::Transport(_))
        ));
        assert_eq!(view.status(), ViewStatus::Degraded(vec!["visitor-stats".into()]));
    }

    #[tokio::test]
    async fn cancelled_load_applies_nothing() {
        let stats = FakeSource::new("visitor-stats");
        stats.push_ready(Ok(json!(1)));

        let view = ViewState::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = Aggregator::new(Duration::from_secs(5))
            .load_all_guarded(&view, &[descriptor(&stats, Criticality::Critical)], &cancel)
            .await;

        assert!(!report.outcomes[0].applied);
        assert_eq!(view.value(&"visitor-stats".into()), None);
    }
}
