//! Progress events and the bus that fans them out to observers.
//!
//! Every subscriber owns an unbounded channel; `publish` pushes into each
//! channel under one lock, so each observer sees events in publish order.
//! A subscriber only sees events published after it subscribed.

use super::Stage;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::trace;

/// Severity of a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    #[default]
    Info,
    Warning,
    Error,
}

/// A progress notification from an in-flight run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub message: String,
    /// 0..=100, absent for indeterminate progress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<f32>,
    #[serde(default)]
    pub level: EventLevel,
    /// When the event was raised.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn info(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            percent: None,
            level: EventLevel::Info,
            timestamp: Utc::now(),
        }
    }

    pub fn warning(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            level: EventLevel::Warning,
            ..Self::info(stage, message)
        }
    }

    pub fn error(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            level: EventLevel::Error,
            ..Self::info(stage, message)
        }
    }

    /// Attach a percentage, clamped to 0..=100.
    pub fn with_percent(mut self, percent: f32) -> Self {
        self.percent = Some(if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) });
        self
    }

    pub fn is_warning(&self) -> bool {
        self.level == EventLevel::Warning
    }

    pub fn is_error(&self) -> bool {
        self.level == EventLevel::Error
    }
}

/// Handle identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: Vec<(SubscriberId, mpsc::UnboundedSender<ProgressEvent>)>,
}

/// Multi-observer progress bus. Cloning yields another handle to the same bus.
#[derive(Clone, Default)]
pub struct ProgressBus {
    registry: Arc<Mutex<Registry>>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new observer.
    ///
    /// Dropping the returned [`Subscription`] unsubscribes it.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = self.registry();
        let id = SubscriberId(registry.next_id);
        registry.next_id += 1;
        registry.subscribers.push((id, tx));
        trace!(subscriber = id.0, "progress subscriber added");

        Subscription {
            id,
            receiver: rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Remove an observer. Events already delivered stay readable.
    ///
    /// Returns false if the id was not registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        remove_subscriber(&mut self.registry(), id)
    }

    /// Deliver an event to every current observer. Returns the number reached.
    pub fn publish(&self, event: ProgressEvent) -> usize {
        let mut registry = self.registry();
        // Observers whose receiver is gone are pruned here.
        registry
            .subscribers
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
        registry.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry().subscribers.len()
    }

    /// Unsubscribe `id` when the returned guard is dropped.
    pub fn guard(&self, id: SubscriberId) -> ListenerGuard {
        ListenerGuard {
            bus: self.clone(),
            id,
        }
    }
}

fn remove_subscriber(registry: &mut Registry, id: SubscriberId) -> bool {
    let before = registry.subscribers.len();
    registry.subscribers.retain(|(sid, _)| *sid != id);
    before != registry.subscribers.len()
}

/// Receiving end of a bus subscription. Also a [`Stream`] of events.
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::UnboundedReceiver<ProgressEvent>,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next event. `None` once unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.receiver.recv().await
    }

    /// Next buffered event, if any.
    pub fn try_recv(&mut self) -> Option<ProgressEvent> {
        self.receiver.try_recv().ok()
    }

    /// Take every buffered event.
    pub fn drain(&mut self) -> Vec<ProgressEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

impl Stream for Subscription {
    type Item = ProgressEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
            remove_subscriber(&mut registry, self.id);
        }
    }
}

/// Unsubscribes a listener from the bus when dropped.
#[must_use = "the listener is unsubscribed as soon as the guard is dropped"]
pub struct ListenerGuard {
    bus: ProgressBus,
    id: SubscriberId,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}
