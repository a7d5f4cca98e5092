//! A mounted dashboard view: initial load, live polling, teardown.

use std::collections::HashMap;
use std::time::Duration;

use sitedesk_types::source::{LoadPhase, SourceId};

use super::aggregator::{Aggregator, LoadReport};
use super::poller::{LivePoller, PollHandle};
use super::view_state::{ApplyResult, ViewState};
use crate::source::{fetch_with_timeout, SourceDescriptor};

/// One live instance of the dashboard. Owns its [`ViewState`] and every poll
/// loop it started; dropping it stops all of them.
pub struct MountedView {
    sources: Vec<SourceDescriptor>,
    poller: LivePoller,
    handles: HashMap<SourceId, PollHandle>,
    initial: LoadReport,
    fetch_timeout: Duration,
}

impl MountedView {
    /// Run the initial load for `sources`, then start a poll loop for every
    /// source with a refresh interval.
    pub async fn mount(sources: Vec<SourceDescriptor>, fetch_timeout: Duration) -> Self {
        let view = ViewState::new();
        let poller = LivePoller::new(view.clone(), fetch_timeout);

        let initial = Aggregator::new(fetch_timeout)
            .load_all_guarded(&view, &sources, poller.root_token())
            .await;

        let mut handles = HashMap::new();
        for descriptor in &sources {
            if let Some(period) = descriptor.poll_interval() {
                let handle = poller.start(descriptor.source.clone(), period);
                handles.insert(descriptor.id().clone(), handle);
            }
        }

        tracing::info!(
            view = %view.id(),
            sources = sources.len(),
            polling = handles.len(),
            "view mounted"
        );

        Self {
            sources,
            poller,
            handles,
            initial,
            fetch_timeout,
        }
    }

    pub fn view(&self) -> &ViewState {
        self.poller.view()
    }

    pub fn initial_report(&self) -> &LoadReport {
        &self.initial
    }

    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    /// Sources with a running poll loop.
    pub fn polling(&self) -> impl Iterator<Item = &SourceId> {
        self.handles.keys()
    }

    /// Fetch one source now, outside its poll schedule. Returns `None` for an
    /// unknown source.
    pub async fn refresh(&self, id: &SourceId) -> Option<ApplyResult> {
        let descriptor = self.sources.iter().find(|d| d.id() == id)?;
        let view = self.view();
        let ticket = view.issue(id);
        let token = self.poller.root_token();

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => return Some(ApplyResult::Cancelled),
            result = fetch_with_timeout(&descriptor.source, self.fetch_timeout) => result,
        };
        if let Err(err) = &result {
            tracing::warn!(source = %id, error = %err, "refresh failed");
        }
        Some(view.apply_ticket(&ticket, result, LoadPhase::Poll, Some(token)))
    }

    /// Stop one source's poll loop, leaving the rest running.
    pub fn stop_polling(&mut self, id: &SourceId) -> bool {
        match self.handles.remove(id) {
            Some(handle) => {
                self.poller.stop(handle);
                true
            }
            None => false,
        }
    }

    /// Tear the view down. No result is applied to the view after this
    /// returns.
    pub fn unmount(mut self) -> ViewState {
        for (_, handle) in self.handles.drain() {
            self.poller.stop(handle);
        }
        self.poller.stop_all();
        tracing::info!(view = %self.view().id(), "view unmounted");
        self.view().clone()
    }
}

impl Drop for MountedView {
    fn drop(&mut self) {
        self.poller.stop_all();
    }
}

impl std::fmt::Debug for MountedView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountedView")
            .field("view", self.view())
            .field("sources", &self.sources)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::fake::FakeSource;
    use crate::source::BoxDataSource;
    use crate::sync::view_state::ViewStatus;
    use serde_json::json;
    use sitedesk_types::error::FetchError;
    use sitedesk_types::source::{Criticality, Refresh};

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn descriptor(fake: &FakeSource, refresh: Refresh, criticality: Criticality) -> SourceDescriptor {
        SourceDescriptor::new(BoxDataSource::new(fake.clone()), refresh, criticality)
    }

    fn dashboard() -> (FakeSource, FakeSource, FakeSource, Vec<SourceDescriptor>) {
        let stats = FakeSource::new("visitor-stats");
        let active = FakeSource::new("active-visitors");
        let messages = FakeSource::new("messages");
        let sources = vec![
            descriptor(&stats, Refresh::Once, Criticality::Critical),
            descriptor(&active, Refresh::from_secs(Some(15)), Criticality::Optional),
            descriptor(&messages, Refresh::from_secs(Some(30)), Criticality::Optional),
        ];
        (stats, active, messages, sources)
    }

    #[tokio::test(start_paused = true)]
    async fn mount_loads_then_polls_interval_sources_only() {
        let (stats, active, messages, sources) = dashboard();
        let mounted = MountedView::mount(sources, Duration::from_secs(5)).await;

        assert!(mounted.initial_report().all_succeeded());
        assert_eq!(mounted.view().status(), ViewStatus::Ready);
        let mut polling: Vec<&str> = mounted.polling().map(SourceId::as_str).collect();
        polling.sort();
        assert_eq!(polling, vec!["active-visitors", "messages"]);

        tokio::time::sleep(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(stats.calls(), 1);
        assert_eq!(active.calls(), 3);
        assert_eq!(messages.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_critical_source_degrades_then_recovers_on_refresh() {
        let (stats, _active, _messages, sources) = dashboard();
        stats.push_ready(Err(FetchError::Transport("HTTP 503".to_string())));
        let mounted = MountedView::mount(sources, Duration::from_secs(5)).await;

        assert_eq!(
            mounted.view().status(),
            ViewStatus::Degraded(vec!["visitor-stats".into()])
        );

        let applied = mounted.refresh(&"visitor-stats".into()).await;
        assert_eq!(applied, Some(ApplyResult::Applied));
        assert_eq!(mounted.view().status(), ViewStatus::Ready);
        assert_eq!(mounted.refresh(&"nope".into()).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn later_refresh_beats_earlier_slow_poll() {
        let active = FakeSource::new("active-visitors");
        let sources = vec![descriptor(&active, Refresh::from_secs(Some(15)), Criticality::Optional)];
        let mounted = MountedView::mount(sources, Duration::from_secs(60)).await;

        // Poll A is issued at t=15 and hangs; refresh B is issued after it and
        // completes first. A's late response must not overwrite B.
        let poll_gate = active.push_gated();
        tokio::time::sleep(Duration::from_secs(15)).await;
        settle().await;

        active.push_ready(Ok(json!("B")));
        assert_eq!(
            mounted.refresh(&"active-visitors".into()).await,
            Some(ApplyResult::Applied)
        );
        poll_gate.send(Ok(json!("A"))).unwrap();
        settle().await;

        assert_eq!(mounted.view().value(&"active-visitors".into()), Some(json!("B")));
    }

    #[tokio::test(start_paused = true)]
    async fn unmount_drops_in_flight_results() {
        let (_stats, active, _messages, sources) = dashboard();
        let mounted = MountedView::mount(sources, Duration::from_secs(60)).await;

        let gate = active.push_gated();
        tokio::time::sleep(Duration::from_secs(15)).await;
        settle().await;

        let before = mounted.view().value(&"active-visitors".into());
        let view = mounted.unmount();
        let _ = gate.send(Ok(json!("late")));
        tokio::time::sleep(Duration::from_secs(120)).await;
        settle().await;

        assert_eq!(view.value(&"active-visitors".into()), before);
    }

    #[tokio::test(start_paused = true)]
    async fn two_mounts_are_independent() {
        let (_s1, a1, _m1, first) = dashboard();
        let (_s2, a2, _m2, second) = dashboard();
        let one = MountedView::mount(first, Duration::from_secs(5)).await;
        let two = MountedView::mount(second, Duration::from_secs(5)).await;
        assert_ne!(one.view().id(), two.view().id());

        drop(one);
        tokio::time::sleep(Duration::from_secs(15)).await;
        settle().await;

        assert_eq!(a1.calls(), 1, "only the initial load ran for the dropped view");
        assert_eq!(a2.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_polling_leaves_other_sources_running() {
        let (_stats, active, messages, sources) = dashboard();
        let mut mounted = MountedView::mount(sources, Duration::from_secs(5)).await;

        assert!(mounted.stop_polling(&"active-visitors".into()));
        assert!(!mounted.stop_polling(&"active-visitors".into()));

        tokio::time::sleep(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(active.calls(), 1);
        assert_eq!(messages.calls(), 2);
    }
}
