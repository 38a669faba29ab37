//! In-process progress bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`ProgressBus`] is shared via `Arc<ProgressBus>`. Each orchestrated
//! operation publishes through its own [`OperationProgress`] handle, so
//! subscribers can tell concurrent operations apart by id.

use std::sync::Arc;

use brandcfg_core::progress::{ProgressEvent, ProgressSink, ProgressStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// OperationEvent
// ---------------------------------------------------------------------------

/// A progress event tagged with the operation that emitted it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationEvent {
    pub operation_id: Uuid,

    #[serde(flatten)]
    pub event: ProgressEvent,

    /// When the event was published (UTC).
    pub timestamp: DateTime<Utc>,
}

impl OperationEvent {
    /// Whether this is the last event the operation will publish.
    pub fn is_terminal(&self) -> bool {
        self.event.status != ProgressStatus::Running
    }
}

// ---------------------------------------------------------------------------
// ProgressBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out progress bus.
pub struct ProgressBus {
    sender: broadcast::Sender<OperationEvent>,
}

impl ProgressBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, operation_id: Uuid, event: ProgressEvent) {
        tracing::trace!(
            %operation_id,
            percentage = ?event.percentage,
            text = %event.text,
            "Progress",
        );
        // Ignore the SendError: it only means there are zero receivers.
        let _ = self.sender.send(OperationEvent {
            operation_id,
            event,
            timestamp: Utc::now(),
        });
    }

    /// Subscribe to the events of every operation.
    pub fn subscribe(&self) -> broadcast::Receiver<OperationEvent> {
        self.sender.subscribe()
    }

    /// A sink publishing under a fresh operation id.
    pub fn start_operation(self: &Arc<Self>) -> OperationProgress {
        OperationProgress {
            bus: Arc::clone(self),
            operation_id: Uuid::now_v7(),
        }
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// OperationProgress
// ---------------------------------------------------------------------------

/// [`ProgressSink`] publishing every event under one operation id.
#[derive(Clone)]
pub struct OperationProgress {
    bus: Arc<ProgressBus>,
    operation_id: Uuid,
}

impl OperationProgress {
    pub fn new(bus: Arc<ProgressBus>, operation_id: Uuid) -> Self {
        Self { bus, operation_id }
    }

    pub fn operation_id(&self) -> Uuid {
        self.operation_id
    }
}

impl ProgressSink for OperationProgress {
    fn emit(&self, event: ProgressEvent) {
        self.bus.publish(self.operation_id, event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
