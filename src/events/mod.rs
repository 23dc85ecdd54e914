// events/mod.rs
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::colour::{Hsl, Rgb};

/// Subscribers registered under this key receive every event.
pub const ALL_EVENTS: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttributeClass {
    Power,
    Colour,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Unknown,
    Syncing,
    Converged,
    Diverged,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    Polled {
        on: bool,
        colour: Option<Rgb>,
    },
    PollFailed {
        error: String,
    },
    Seeded {
        colour: Hsl,
    },
    Transition {
        attribute: AttributeClass,
        from: SyncState,
        to: SyncState,
    },
    Dispatched {
        command: String,
    },
    DispatchFailed {
        command: String,
        error: String,
    },
    QueueRejected {
        operation: String,
        capacity: usize,
    },
}

impl EngineEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::Polled { .. } => "polled",
            EngineEvent::PollFailed { .. } => "poll_failed",
            EngineEvent::Seeded { .. } => "seeded",
            EngineEvent::Transition { .. } => "transition",
            EngineEvent::Dispatched { .. } => "dispatched",
            EngineEvent::DispatchFailed { .. } => "dispatch_failed",
            EngineEvent::QueueRejected { .. } => "queue_rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TimedEvent {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: EngineEvent,
}

/// Where the engine and queue report what they did.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct EventBus {
    subscribers: DashMap<String, Vec<Box<dyn Fn(&TimedEvent) + Send + Sync>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
        }
    }

    pub fn publish(&self, event_type: &str, event: &TimedEvent) {
        if let Some(subscribers) = self.subscribers.get(event_type) {
            for callback in subscribers.iter() {
                (callback)(event);
            }
        }
    }

    pub fn subscribe<F: Fn(&TimedEvent) + Send + Sync + 'static>(
        &self,
        event_type: &str,
        callback: F,
    ) {
        self.subscribers
            .entry(event_type.to_string())
            .or_default()
            .push(Box::new(callback));
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: EngineEvent) {
        match &event {
            EngineEvent::PollFailed { error } => warn!(%error, "Status poll failed"),
            EngineEvent::DispatchFailed { command, error } => {
                warn!(%command, %error, "Dispatch failed")
            }
            EngineEvent::QueueRejected { operation, capacity } => {
                warn!(%operation, capacity, "Operation rejected, queue full")
            }
            EngineEvent::Transition { attribute, from, to } => {
                debug!(?attribute, ?from, ?to, "Sync state changed")
            }
            EngineEvent::Dispatched { command } => info!(%command, "Dispatched"),
            other => debug!(event = ?other, "Engine event"),
        }

        let timed = TimedEvent {
            at: Utc::now(),
            event,
        };
        self.publish(timed.event.kind(), &timed);
        self.publish(ALL_EVENTS, &timed);
    }
}
