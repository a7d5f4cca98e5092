//! Scripted data source for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::oneshot;

use sitedesk_types::error::FetchError;
use sitedesk_types::source::SourceId;

use super::DataSource;

type Outcome = Result<Value, FetchError>;

enum Step {
    Ready(Outcome),
    Gated(oneshot::Receiver<Outcome>),
    Panic,
}

/// Each fetch consumes the next scripted step. With the script empty it
/// returns `Ok(<call number>)`, so successive values are distinguishable.
#[derive(Clone)]
pub(crate) struct FakeSource {
    id: SourceId,
    script: Arc<Mutex<VecDeque<Step>>>,
    calls: Arc<AtomicUsize>,
}

impl FakeSource {
    pub(crate) fn new(id: &str) -> Self {
        Self {
            id: SourceId::new(id),
            script: Arc::default(),
            calls: Arc::default(),
        }
    }

    pub(crate) fn push_ready(&self, outcome: Outcome) {
        self.script.lock().unwrap().push_back(Step::Ready(outcome));
    }

    /// Queue a fetch that stays pending until the returned sender fires.
    /// Dropping the sender fails the fetch with a transport error.
    pub(crate) fn push_gated(&self) -> oneshot::Sender<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.script.lock().unwrap().push_back(Step::Gated(rx));
        tx
    }

    /// Queue a fetch that panics.
    pub(crate) fn push_panic(&self) {
        self.script.lock().unwrap().push_back(Step::Panic);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DataSource for FakeSource {
    fn id(&self) -> &SourceId {
        &self.id
    }

    async fn fetch(&self) -> Result<Value, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Ready(outcome)) => outcome,
            Some(Step::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(FetchError::Transport("gate dropped".to_string()))),
            Some(Step::Panic) => panic!("scripted fetch panic"),
            None => Ok(Value::from(call)),
        }
    }
}
