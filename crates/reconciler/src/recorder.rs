//! Event recording for reconciled objects.

use std::fmt;

use async_trait::async_trait;
use resume_core::ObjectRef;
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Normal,
    Warning,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("Normal"),
            Self::Warning => f.write_str("Warning"),
        }
    }
}

/// A human-facing note about something that happened to an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub object: ObjectRef,
    pub event_type: EventType,
    pub reason: String,
    pub message: String,
}

impl Event {
    pub fn normal(object: ObjectRef, reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            object,
            event_type: EventType::Normal,
            reason: reason.into(),
            message: message.into(),
        }
    }

    pub fn warning(object: ObjectRef, reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            object,
            event_type: EventType::Warning,
            reason: reason.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait EventRecorder: Send + Sync {
    async fn record(&self, event: Event);
}

/// Writes events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRecorder;

#[async_trait]
impl EventRecorder for TracingRecorder {
    async fn record(&self, event: Event) {
        match event.event_type {
            EventType::Normal => info!(
                kind = %event.object.gvk.kind,
                object = %event.object.key,
                reason = %event.reason,
                "{}",
                event.message
            ),
            EventType::Warning => warn!(
                kind = %event.object.gvk.kind,
                object = %event.object.key,
                reason = %event.reason,
                "{}",
                event.message
            ),
        }
    }
}

/// Keeps events in memory for inspection.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    events: RwLock<Vec<Event>>,
}

impl MemoryRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<Event> {
        self.events.read().await.clone()
    }

    pub async fn reasons(&self) -> Vec<String> {
        self.events
            .read()
            .await
            .iter()
            .map(|e| e.reason.clone())
            .collect()
    }
}

#[async_trait]
impl EventRecorder for MemoryRecorder {
    async fn record(&self, event: Event) {
        self.events.write().await.push(event);
    }
}
