//! In-process broadcast of board changes.
//!
//! Delivery is best-effort and at-most-once: slow subscribers that fall more
//! than the channel capacity behind lose events, and emitting with no
//! subscribers is a no-op.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::*;

const DEFAULT_CAPACITY: usize = 256;

/// A named change event. Serializes as `{"event": "<name>", "data": ...}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum Event {
    #[serde(rename = "item:created")]
    ItemCreated(Item),
    #[serde(rename = "item:transitioned")]
    ItemTransitioned {
        item: Item,
        from: ItemStatus,
        to: ItemStatus,
    },
    #[serde(rename = "comment:added")]
    CommentAdded(Comment),
    #[serde(rename = "decision:added")]
    DecisionAdded(DecisionLog),
    #[serde(rename = "dependency:added")]
    DependencyAdded(Dependency),
    #[serde(rename = "dependency:removed")]
    DependencyRemoved(Dependency),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ItemCreated(_) => "item:created",
            Self::ItemTransitioned { .. } => "item:transitioned",
            Self::CommentAdded(_) => "comment:added",
            Self::DecisionAdded(_) => "decision:added",
            Self::DependencyAdded(_) => "dependency:added",
            Self::DependencyRemoved(_) => "dependency:removed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn emit(&self, event: Event) {
        let name = event.name();
        match self.tx.send(event) {
            Ok(receivers) => tracing::trace!(event = name, receivers, "Broadcast event"),
            Err(_) => tracing::trace!(event = name, "No subscribers for event"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
