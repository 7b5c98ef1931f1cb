//! Run-scoped pipeline primitives: stages, progress delivery and the run log.

mod log;
mod progress;
mod stage;

pub use log::{LogEntry, RunLog};
pub use progress::{EventLevel, ListenerGuard, ProgressBus, ProgressEvent, SubscriberId, Subscription};
pub use stage::{InvalidTransition, Stage, StageMachine};
