//! Periodic background refresh of individual sources.
//!
//! Every poller task holds a child of the owning view's root
//! [`CancellationToken`]. Stopping a handle cancels its token, aborts the
//! loop, and fences the source slot so no in-flight response lands afterwards.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use sitedesk_types::source::{LoadPhase, SourceId};

use super::view_state::{ApplyResult, ViewState};
use crate::source::{fetch_with_timeout, BoxDataSource};

/// Handle to one running poll loop. Dropping it cancels the loop.
#[derive(Debug)]
pub struct PollHandle {
    source: SourceId,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn source(&self) -> &SourceId {
        &self.source
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Starts and stops poll loops for one view.
#[derive(Debug)]
pub struct LivePoller {
    view: ViewState,
    root: CancellationToken,
    fetch_timeout: Duration,
}

impl LivePoller {
    pub fn new(view: ViewState, fetch_timeout: Duration) -> Self {
        Self {
            view,
            root: CancellationToken::new(),
            fetch_timeout,
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// The view-wide token. Cancelled by [`stop_all`](Self::stop_all).
    pub fn root_token(&self) -> &CancellationToken {
        &self.root
    }

    /// Fetch `source` every `period`, first tick one period from now. Ticks
    /// that arrive while a fetch is still in flight are skipped.
    ///
    /// A zero `period` cannot be polled; the returned handle is already
    /// stopped.
    pub fn start(&self, source: Arc<BoxDataSource>, period: Duration) -> PollHandle {
        let id = source.id().clone();
        let token = self.root.child_token();
        if period.is_zero() {
            tracing::warn!(view = %self.view.id(), source = %id, "zero poll period, poller not started");
            token.cancel();
            return PollHandle {
                source: id,
                token,
                task: None,
            };
        }
        let task = tokio::spawn(poll_loop(
            self.view.clone(),
            source,
            period,
            self.fetch_timeout,
            token.clone(),
        ));
        tracing::debug!(view = %self.view.id(), source = %id, period_ms = period.as_millis() as u64, "poller started");

        PollHandle {
            source: id,
            token,
            task: Some(task),
        }
    }

    /// Stop one loop. Once this returns, no response from it is applied.
    pub fn stop(&self, mut handle: PollHandle) {
        handle.token.cancel();
        if let Some(task) = handle.task.take() {
            task.abort();
        }
        self.view.fence(&handle.source);
        tracing::debug!(view = %self.view.id(), source = %handle.source, "poller stopped");
    }

    /// Stop every loop started by this poller, including fetches spawned for
    /// ad hoc refreshes.
    pub fn stop_all(&self) {
        self.root.cancel();
        self.view.fence_all();
    }

    pub fn is_stopped(&self) -> bool {
        self.root.is_cancelled()
    }
}

impl Drop for LivePoller {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

async fn poll_loop(
    view: ViewState,
    source: Arc<BoxDataSource>,
    period: Duration,
    fetch_timeout: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let in_flight = Arc::new(AtomicBool::new(false));

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if in_flight.swap(true, Ordering::SeqCst) {
            tracing::trace!(source = %source.id(), "previous poll still in flight, skipping tick");
            continue;
        }

        let ticket = view.issue(source.id());
        let view = view.clone();
        let source = source.clone();
        let token = token.clone();
        let in_flight = InFlight(in_flight.clone());
        tokio::spawn(async move {
            let _in_flight = in_flight;
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                result = fetch_with_timeout(&source, fetch_timeout) => Some(result),
            };
            if let Some(result) = result {
                if let Err(err) = &result {
                    tracing::warn!(source = %ticket.source, error = %err, "poll failed");
                }
                if view.apply_ticket(&ticket, result, LoadPhase::Poll, Some(&token))
                    == ApplyResult::Superseded
                {
                    tracing::debug!(source = %ticket.source, seq = ticket.seq, "poll result superseded");
                }
            }
        });
    }
}

/// Clears the in-flight flag when the fetch task ends, panics included.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
