//! Live dashboard synchronization.
//!
//! - [`view_state`]: per-view snapshot with last-issued-wins writes
//! - [`aggregator`]: concurrent initial load
//! - [`poller`]: per-source interval refresh with cancellation
//! - [`view`]: mount/refresh/unmount lifecycle tying the three together

pub mod aggregator;
pub mod poller;
pub mod view;
pub mod view_state;

pub use aggregator::{Aggregator, LoadReport, SourceOutcome};
pub use poller::{LivePoller, PollHandle};
pub use view::MountedView;
pub use view_state::{ApplyResult, SourceError, SourceSnapshot, Ticket, ViewState, ViewStatus};
