//! Progress reporting for long-running orchestrated operations.
//!
//! Producers push [`ProgressEvent`]s into a [`ProgressSink`]; delivery to
//! browsers or task tables is the sink implementation's business.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Lifecycle state carried by each event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Running,
    Success,
    Failed,
}

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// `None` marks a raw log line with no milestone attached.
    pub percentage: Option<u8>,
    pub status: ProgressStatus,
    pub text: String,
    pub detail: String,
}

impl ProgressEvent {
    /// A milestone of a running operation. Values above 100 are clamped.
    pub fn running(percentage: u8, text: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            percentage: Some(percentage.min(100)),
            status: ProgressStatus::Running,
            text: text.into(),
            detail: detail.into(),
        }
    }

    pub fn success(text: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            percentage: Some(100),
            status: ProgressStatus::Success,
            text: text.into(),
            detail: detail.into(),
        }
    }

    /// A failure notice. Failures carry percentage `0`.
    pub fn failed(text: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            percentage: Some(0),
            status: ProgressStatus::Failed,
            text: text.into(),
            detail: detail.into(),
        }
    }

    /// A raw output line.
    pub fn log(line: impl Into<String>) -> Self {
        Self {
            percentage: None,
            status: ProgressStatus::Running,
            text: line.into(),
            detail: String::new(),
        }
    }
}

/// Fire-and-forget receiver of progress events.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl ProgressSink for mpsc::UnboundedSender<ProgressEvent> {
    fn emit(&self, event: ProgressEvent) {
        // A dropped receiver only means nobody is watching.
        let _ = self.send(event);
    }
}

/// Adapts a closure into a [`ProgressSink`].
pub struct FnSink<F>(pub F);

impl<F> ProgressSink for FnSink<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        (self.0)(event)
    }
}

/// Emit `event` if a sink is attached.
pub fn emit(sink: Option<&dyn ProgressSink>, event: ProgressEvent) {
    if let Some(sink) = sink {
        sink.emit(event);
    }
}
